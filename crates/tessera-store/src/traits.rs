//! The store contracts the decision engine is written against.

use tessera_types::{
    AttributeName, AttributeType, CachedPolicyDecision, CachedResourceDecision, Condition,
    PolicyName, PolicyRecord, ResourceName, ResourceRecord, Timestamp, UserId, UserRecord,
};

use crate::error::Result;

/// Read/write contract used by the authorization engine.
///
/// Every call is an independent single-key operation. Implementations need
/// not offer cross-key atomicity; the invalidation protocol does not rely on
/// it.
///
/// Cached decisions are stamped with a [`now`](Self::now) reading taken
/// before their inputs were read. For that stamp to be sound, a definition
/// write stamped earlier than a `now` result must be visible to every read
/// issued after that result was returned.
pub trait DecisionStore: Send + Sync {
    /// Reads the clock that stamps definition writes.
    fn now(&self) -> Result<Timestamp>;

    fn user(&self, user: &UserId) -> Result<Option<UserRecord>>;

    fn user_updated_at(&self, user: &UserId) -> Result<Option<Timestamp>>;

    fn attribute_type(&self, name: &AttributeName) -> Result<Option<AttributeType>>;

    fn user_attribute(&self, user: &UserId, name: &AttributeName) -> Result<Option<String>>;

    fn policy(&self, name: &PolicyName) -> Result<Option<PolicyRecord>>;

    fn policy_updated_at(&self, name: &PolicyName) -> Result<Option<Timestamp>>;

    fn resource_policies(&self, name: &ResourceName) -> Result<Option<ResourceRecord>>;

    fn resource_updated_at(&self, name: &ResourceName) -> Result<Option<Timestamp>>;

    fn cached_policy_decision(
        &self,
        user: &UserId,
        policy: &PolicyName,
    ) -> Result<Option<CachedPolicyDecision>>;

    /// Caches a policy decision computed from reads that began at
    /// `computed_at`. An entry with a newer stamp is kept.
    fn set_cached_policy_decision(
        &self,
        user: &UserId,
        policy: &PolicyName,
        allowed: bool,
        computed_at: Timestamp,
    ) -> Result<()>;

    /// Drops the cached decision of `policy` for every user. Returns how many
    /// entries were removed.
    fn evict_cached_policy_decisions(&self, policy: &PolicyName) -> Result<usize>;

    fn cached_resource_decision(
        &self,
        user: &UserId,
        resource: &ResourceName,
    ) -> Result<Option<CachedResourceDecision>>;

    /// Caches a resource decision computed from reads that began at
    /// `computed_at`. An entry with a newer stamp is kept.
    fn set_cached_resource_decision(
        &self,
        user: &UserId,
        resource: &ResourceName,
        granting_policy: Option<&PolicyName>,
        computed_at: Timestamp,
    ) -> Result<()>;
}

/// Write side owned by definition management.
///
/// Implementations carry the invalidation obligations the engine relies on:
/// - any user attribute change bumps the user's `updated_at`;
/// - replacing a policy's conditions bumps its `updated_at` **and** evicts
///   every cached decision of that policy;
/// - changing a resource's policy list bumps the resource's `updated_at`.
pub trait DefinitionWriter {
    fn define_attribute(&self, name: &AttributeName, attribute_type: AttributeType)
    -> Result<()>;

    /// Replaces all attributes of `user`, creating the user if needed.
    fn put_user(
        &self,
        user: &UserId,
        attributes: Vec<(AttributeName, String)>,
    ) -> Result<Timestamp>;

    /// Merges `attributes` into `user`, creating the user if needed. The
    /// batch is validated as a whole and bumps `updated_at` once.
    fn set_user_attributes(
        &self,
        user: &UserId,
        attributes: Vec<(AttributeName, String)>,
    ) -> Result<Timestamp>;

    fn set_user_attribute(
        &self,
        user: &UserId,
        name: &AttributeName,
        value: &str,
    ) -> Result<Timestamp>;

    fn remove_user_attribute(&self, user: &UserId, name: &AttributeName) -> Result<Timestamp>;

    /// Creates or replaces the condition set of `policy`.
    fn put_policy(&self, policy: &PolicyName, conditions: Vec<Condition>) -> Result<Timestamp>;

    /// Creates or replaces the policy list of `resource`.
    fn put_resource(&self, resource: &ResourceName, policies: Vec<PolicyName>)
    -> Result<Timestamp>;
}
