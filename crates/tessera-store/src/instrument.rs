//! Call-counting wrapper around any [`DecisionStore`].
//!
//! Used to assert how much store traffic a decision costs: the cached fast
//! path must not read attributes, and a failing condition must stop the
//! conjunction. A one-shot hook can run just before a chosen operation,
//! which lets tests interleave definition writes with a request.

use std::fmt;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use tessera_types::{
    AttributeName, AttributeType, CachedPolicyDecision, CachedResourceDecision, PolicyName,
    PolicyRecord, ResourceName, ResourceRecord, Timestamp, UserId, UserRecord,
};

use crate::error::Result;
use crate::traits::DecisionStore;

/// One operation of the [`DecisionStore`] contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum StoreOp {
    Now,
    User,
    UserUpdatedAt,
    AttributeType,
    UserAttribute,
    Policy,
    PolicyUpdatedAt,
    ResourcePolicies,
    ResourceUpdatedAt,
    CachedPolicyDecision,
    SetCachedPolicyDecision,
    EvictCachedPolicyDecisions,
    CachedResourceDecision,
    SetCachedResourceDecision,
}

impl StoreOp {
    pub const COUNT: usize = 14;

    pub const ALL: [StoreOp; StoreOp::COUNT] = [
        StoreOp::Now,
        StoreOp::User,
        StoreOp::UserUpdatedAt,
        StoreOp::AttributeType,
        StoreOp::UserAttribute,
        StoreOp::Policy,
        StoreOp::PolicyUpdatedAt,
        StoreOp::ResourcePolicies,
        StoreOp::ResourceUpdatedAt,
        StoreOp::CachedPolicyDecision,
        StoreOp::SetCachedPolicyDecision,
        StoreOp::EvictCachedPolicyDecisions,
        StoreOp::CachedResourceDecision,
        StoreOp::SetCachedResourceDecision,
    ];

    pub fn is_write(self) -> bool {
        matches!(
            self,
            StoreOp::SetCachedPolicyDecision
                | StoreOp::EvictCachedPolicyDecisions
                | StoreOp::SetCachedResourceDecision
        )
    }
}

type Hook<S> = Box<dyn FnOnce(&S) + Send>;

/// Wraps a store and counts every call per [`StoreOp`].
pub struct CountingStore<S> {
    inner: S,
    counts: [AtomicU64; StoreOp::COUNT],
    hook: Mutex<Option<(StoreOp, Hook<S>)>>,
}

impl<S> CountingStore<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            counts: Default::default(),
            hook: Mutex::new(None),
        }
    }

    /// Runs `hook` against the inner store right before the next call of
    /// `op` is forwarded. Replaces any hook that has not fired yet.
    pub fn before_next<F>(&self, op: StoreOp, hook: F)
    where
        F: FnOnce(&S) + Send + 'static,
    {
        if let Ok(mut slot) = self.hook.lock() {
            *slot = Some((op, Box::new(hook)));
        }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    pub fn count(&self, op: StoreOp) -> u64 {
        self.counts[op as usize].load(Ordering::Relaxed)
    }

    /// Total number of write operations issued.
    pub fn writes(&self) -> u64 {
        StoreOp::ALL
            .iter()
            .filter(|op| op.is_write())
            .map(|op| self.count(*op))
            .sum()
    }

    pub fn reset(&self) {
        for counter in &self.counts {
            counter.store(0, Ordering::Relaxed);
        }
    }

    fn record(&self, op: StoreOp) {
        self.counts[op as usize].fetch_add(1, Ordering::Relaxed);

        let hook = match self.hook.lock() {
            Ok(mut slot) if slot.as_ref().is_some_and(|(target, _)| *target == op) => slot.take(),
            _ => None,
        };
        // Lock released before the hook runs, so it may call back into us.
        if let Some((_, hook)) = hook {
            hook(&self.inner);
        }
    }
}

impl<S> fmt::Debug for CountingStore<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for op in StoreOp::ALL {
            let n = self.count(op);
            if n > 0 {
                map.entry(&op, &n);
            }
        }
        map.finish()
    }
}

impl<S: DecisionStore> DecisionStore for CountingStore<S> {
    fn now(&self) -> Result<Timestamp> {
        self.record(StoreOp::Now);
        self.inner.now()
    }

    fn user(&self, user: &UserId) -> Result<Option<UserRecord>> {
        self.record(StoreOp::User);
        self.inner.user(user)
    }

    fn user_updated_at(&self, user: &UserId) -> Result<Option<Timestamp>> {
        self.record(StoreOp::UserUpdatedAt);
        self.inner.user_updated_at(user)
    }

    fn attribute_type(&self, name: &AttributeName) -> Result<Option<AttributeType>> {
        self.record(StoreOp::AttributeType);
        self.inner.attribute_type(name)
    }

    fn user_attribute(&self, user: &UserId, name: &AttributeName) -> Result<Option<String>> {
        self.record(StoreOp::UserAttribute);
        self.inner.user_attribute(user, name)
    }

    fn policy(&self, name: &PolicyName) -> Result<Option<PolicyRecord>> {
        self.record(StoreOp::Policy);
        self.inner.policy(name)
    }

    fn policy_updated_at(&self, name: &PolicyName) -> Result<Option<Timestamp>> {
        self.record(StoreOp::PolicyUpdatedAt);
        self.inner.policy_updated_at(name)
    }

    fn resource_policies(&self, name: &ResourceName) -> Result<Option<ResourceRecord>> {
        self.record(StoreOp::ResourcePolicies);
        self.inner.resource_policies(name)
    }

    fn resource_updated_at(&self, name: &ResourceName) -> Result<Option<Timestamp>> {
        self.record(StoreOp::ResourceUpdatedAt);
        self.inner.resource_updated_at(name)
    }

    fn cached_policy_decision(
        &self,
        user: &UserId,
        policy: &PolicyName,
    ) -> Result<Option<CachedPolicyDecision>> {
        self.record(StoreOp::CachedPolicyDecision);
        self.inner.cached_policy_decision(user, policy)
    }

    fn set_cached_policy_decision(
        &self,
        user: &UserId,
        policy: &PolicyName,
        allowed: bool,
        computed_at: Timestamp,
    ) -> Result<()> {
        self.record(StoreOp::SetCachedPolicyDecision);
        self.inner
            .set_cached_policy_decision(user, policy, allowed, computed_at)
    }

    fn evict_cached_policy_decisions(&self, policy: &PolicyName) -> Result<usize> {
        self.record(StoreOp::EvictCachedPolicyDecisions);
        self.inner.evict_cached_policy_decisions(policy)
    }

    fn cached_resource_decision(
        &self,
        user: &UserId,
        resource: &ResourceName,
    ) -> Result<Option<CachedResourceDecision>> {
        self.record(StoreOp::CachedResourceDecision);
        self.inner.cached_resource_decision(user, resource)
    }

    fn set_cached_resource_decision(
        &self,
        user: &UserId,
        resource: &ResourceName,
        granting_policy: Option<&PolicyName>,
        computed_at: Timestamp,
    ) -> Result<()> {
        self.record(StoreOp::SetCachedResourceDecision);
        self.inner
            .set_cached_resource_decision(user, resource, granting_policy, computed_at)
    }
}
