//! In-memory reference store.
//!
//! Holds definitions and cached decisions behind two independent locks, so a
//! definition write and a decision write never wait on each other. Each
//! method touches a single key, matching what a remote key-value store would
//! offer.
//!
//! Definition writes take their stamp while holding the definitions lock. A
//! write stamped before some `now()` result therefore still holds the lock
//! at that point, and any later read waits for it to land.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tessera_types::{
    AttributeName, AttributeType, CachedPolicyDecision, CachedResourceDecision, Condition,
    PolicyName, PolicyRecord, ResourceName, ResourceRecord, Timestamp, UserId, UserRecord,
};
use tracing::debug;

use crate::clock::{Clock, LogicalClock};
use crate::error::{DefinitionError, Result, StoreError};
use crate::traits::{DecisionStore, DefinitionWriter};

#[derive(Debug, Default)]
struct Definitions {
    attributes: HashMap<AttributeName, AttributeType>,
    users: HashMap<UserId, UserRecord>,
    policies: HashMap<PolicyName, PolicyRecord>,
    resources: HashMap<ResourceName, ResourceRecord>,
}

impl Definitions {
    fn validate_value(&self, name: &AttributeName, value: &str) -> Result<()> {
        let attribute_type = self
            .attributes
            .get(name)
            .copied()
            .ok_or_else(|| DefinitionError::UnknownAttribute(name.clone()))?;

        if attribute_type.accepts(value) {
            Ok(())
        } else {
            Err(DefinitionError::InvalidValue {
                name: name.clone(),
                attribute_type,
                value: value.to_string(),
            }
            .into())
        }
    }
}

/// Cached decisions, grouped by policy/resource so a whole policy can be
/// evicted in one step.
#[derive(Debug, Default)]
struct Decisions {
    policies: HashMap<PolicyName, HashMap<UserId, CachedPolicyDecision>>,
    resources: HashMap<ResourceName, HashMap<UserId, CachedResourceDecision>>,
}

/// Thread-safe in-memory implementation of both store contracts.
pub struct MemoryStore {
    definitions: RwLock<Definitions>,
    decisions: RwLock<Decisions>,
    clock: Arc<dyn Clock>,
    available: AtomicBool,
}

impl MemoryStore {
    /// Creates an empty store stamped by a [`LogicalClock`].
    pub fn new() -> Self {
        Self::with_clock(Arc::new(LogicalClock::new()))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            definitions: RwLock::new(Definitions::default()),
            decisions: RwLock::new(Decisions::default()),
            clock,
            available: AtomicBool::new(true),
        }
    }

    /// Simulates loss of connectivity: while unavailable every call fails
    /// with [`StoreError::Unavailable`].
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Number of cached decisions currently held, policy and resource level.
    pub fn cached_decision_counts(&self) -> Result<(usize, usize)> {
        let decisions = self.read_decisions()?;
        let policies = decisions.policies.values().map(HashMap::len).sum();
        let resources = decisions.resources.values().map(HashMap::len).sum();
        Ok((policies, resources))
    }

    fn check_available(&self) -> Result<()> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(StoreError::Unavailable(
                "in-memory store marked unavailable".to_string(),
            ))
        }
    }

    fn read_definitions(&self) -> Result<RwLockReadGuard<'_, Definitions>> {
        self.check_available()?;
        self.definitions
            .read()
            .map_err(|_| StoreError::Poisoned("definitions"))
    }

    fn write_definitions(&self) -> Result<RwLockWriteGuard<'_, Definitions>> {
        self.check_available()?;
        self.definitions
            .write()
            .map_err(|_| StoreError::Poisoned("definitions"))
    }

    fn read_decisions(&self) -> Result<RwLockReadGuard<'_, Decisions>> {
        self.check_available()?;
        self.decisions
            .read()
            .map_err(|_| StoreError::Poisoned("decisions"))
    }

    fn write_decisions(&self) -> Result<RwLockWriteGuard<'_, Decisions>> {
        self.check_available()?;
        self.decisions
            .write()
            .map_err(|_| StoreError::Poisoned("decisions"))
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryStore")
            .field("available", &self.available.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

impl DecisionStore for MemoryStore {
    fn now(&self) -> Result<Timestamp> {
        self.check_available()?;
        Ok(self.clock.now())
    }

    fn user(&self, user: &UserId) -> Result<Option<UserRecord>> {
        Ok(self.read_definitions()?.users.get(user).cloned())
    }

    fn user_updated_at(&self, user: &UserId) -> Result<Option<Timestamp>> {
        Ok(self
            .read_definitions()?
            .users
            .get(user)
            .map(|u| u.updated_at))
    }

    fn attribute_type(&self, name: &AttributeName) -> Result<Option<AttributeType>> {
        Ok(self.read_definitions()?.attributes.get(name).copied())
    }

    fn user_attribute(&self, user: &UserId, name: &AttributeName) -> Result<Option<String>> {
        Ok(self
            .read_definitions()?
            .users
            .get(user)
            .and_then(|u| u.attributes.get(name).cloned()))
    }

    fn policy(&self, name: &PolicyName) -> Result<Option<PolicyRecord>> {
        Ok(self.read_definitions()?.policies.get(name).cloned())
    }

    fn policy_updated_at(&self, name: &PolicyName) -> Result<Option<Timestamp>> {
        Ok(self
            .read_definitions()?
            .policies
            .get(name)
            .map(|p| p.updated_at))
    }

    fn resource_policies(&self, name: &ResourceName) -> Result<Option<ResourceRecord>> {
        Ok(self.read_definitions()?.resources.get(name).cloned())
    }

    fn resource_updated_at(&self, name: &ResourceName) -> Result<Option<Timestamp>> {
        Ok(self
            .read_definitions()?
            .resources
            .get(name)
            .map(|r| r.updated_at))
    }

    fn cached_policy_decision(
        &self,
        user: &UserId,
        policy: &PolicyName,
    ) -> Result<Option<CachedPolicyDecision>> {
        Ok(self
            .read_decisions()?
            .policies
            .get(policy)
            .and_then(|by_user| by_user.get(user).copied()))
    }

    fn set_cached_policy_decision(
        &self,
        user: &UserId,
        policy: &PolicyName,
        allowed: bool,
        computed_at: Timestamp,
    ) -> Result<()> {
        let mut decisions = self.write_decisions()?;
        let by_user = decisions.policies.entry(policy.clone()).or_default();
        if by_user
            .get(user)
            .is_some_and(|existing| existing.computed_at.is_newer_than(computed_at))
        {
            return Ok(());
        }
        by_user.insert(
            user.clone(),
            CachedPolicyDecision {
                allowed,
                computed_at,
            },
        );
        Ok(())
    }

    fn evict_cached_policy_decisions(&self, policy: &PolicyName) -> Result<usize> {
        let removed = self
            .write_decisions()?
            .policies
            .remove(policy)
            .map_or(0, |by_user| by_user.len());
        Ok(removed)
    }

    fn cached_resource_decision(
        &self,
        user: &UserId,
        resource: &ResourceName,
    ) -> Result<Option<CachedResourceDecision>> {
        Ok(self
            .read_decisions()?
            .resources
            .get(resource)
            .and_then(|by_user| by_user.get(user).cloned()))
    }

    fn set_cached_resource_decision(
        &self,
        user: &UserId,
        resource: &ResourceName,
        granting_policy: Option<&PolicyName>,
        computed_at: Timestamp,
    ) -> Result<()> {
        let mut decisions = self.write_decisions()?;
        let by_user = decisions.resources.entry(resource.clone()).or_default();
        if by_user
            .get(user)
            .is_some_and(|existing| existing.computed_at.is_newer_than(computed_at))
        {
            return Ok(());
        }
        by_user.insert(
            user.clone(),
            CachedResourceDecision {
                granting_policy: granting_policy.cloned(),
                computed_at,
            },
        );
        Ok(())
    }
}

impl DefinitionWriter for MemoryStore {
    fn define_attribute(&self, name: &AttributeName, attribute_type: AttributeType) -> Result<()> {
        let mut definitions = self.write_definitions()?;
        match definitions.attributes.get(name) {
            Some(existing) if *existing != attribute_type => {
                Err(DefinitionError::AttributeTypeConflict {
                    name: name.clone(),
                    existing: *existing,
                }
                .into())
            }
            Some(_) => Ok(()),
            None => {
                definitions.attributes.insert(name.clone(), attribute_type);
                Ok(())
            }
        }
    }

    fn put_user(
        &self,
        user: &UserId,
        attributes: Vec<(AttributeName, String)>,
    ) -> Result<Timestamp> {
        let mut definitions = self.write_definitions()?;
        for (name, value) in &attributes {
            definitions.validate_value(name, value)?;
        }

        let updated_at = self.clock.now();
        definitions.users.insert(
            user.clone(),
            UserRecord {
                attributes: attributes.into_iter().collect::<BTreeMap<_, _>>(),
                updated_at,
            },
        );
        Ok(updated_at)
    }

    fn set_user_attributes(
        &self,
        user: &UserId,
        attributes: Vec<(AttributeName, String)>,
    ) -> Result<Timestamp> {
        let mut definitions = self.write_definitions()?;
        for (name, value) in &attributes {
            definitions.validate_value(name, value)?;
        }

        let updated_at = self.clock.now();
        let record = definitions
            .users
            .entry(user.clone())
            .or_insert_with(|| UserRecord {
                attributes: BTreeMap::new(),
                updated_at,
            });
        record.attributes.extend(attributes);
        record.updated_at = updated_at;
        Ok(updated_at)
    }

    fn set_user_attribute(
        &self,
        user: &UserId,
        name: &AttributeName,
        value: &str,
    ) -> Result<Timestamp> {
        self.set_user_attributes(user, vec![(name.clone(), value.to_string())])
    }

    fn remove_user_attribute(&self, user: &UserId, name: &AttributeName) -> Result<Timestamp> {
        let mut definitions = self.write_definitions()?;
        let updated_at = self.clock.now();
        if let Some(record) = definitions.users.get_mut(user) {
            record.attributes.remove(name);
            record.updated_at = updated_at;
        }
        Ok(updated_at)
    }

    fn put_policy(&self, policy: &PolicyName, conditions: Vec<Condition>) -> Result<Timestamp> {
        if conditions.is_empty() {
            return Err(DefinitionError::EmptyPolicy(policy.clone()).into());
        }

        let updated_at = {
            let mut definitions = self.write_definitions()?;
            for condition in &conditions {
                let attribute_type = definitions
                    .attributes
                    .get(&condition.attribute)
                    .copied()
                    .ok_or_else(|| DefinitionError::UnknownAttribute(condition.attribute.clone()))?;
                if !attribute_type.allows(condition.operator) {
                    return Err(DefinitionError::OperatorNotAllowed {
                        name: condition.attribute.clone(),
                        attribute_type,
                        operator: condition.operator,
                    }
                    .into());
                }
            }

            let updated_at = self.clock.now();
            definitions.policies.insert(
                policy.clone(),
                PolicyRecord {
                    conditions,
                    updated_at,
                },
            );
            updated_at
        };

        // Timestamp bump and eviction are separate single-key writes; either
        // one alone forces recomputation.
        let evicted = self.evict_cached_policy_decisions(policy)?;
        debug!(policy = %policy, %updated_at, evicted, "Policy conditions replaced");
        Ok(updated_at)
    }

    fn put_resource(
        &self,
        resource: &ResourceName,
        policies: Vec<PolicyName>,
    ) -> Result<Timestamp> {
        if policies.is_empty() {
            return Err(DefinitionError::EmptyResource.into());
        }

        let mut definitions = self.write_definitions()?;
        if let Some(missing) = policies
            .iter()
            .find(|p| !definitions.policies.contains_key(*p))
        {
            return Err(DefinitionError::UnknownPolicy(missing.clone()).into());
        }

        let updated_at = self.clock.now();
        definitions.resources.insert(
            resource.clone(),
            ResourceRecord {
                policies,
                updated_at,
            },
        );
        debug!(resource = %resource, %updated_at, "Resource bindings replaced");
        Ok(updated_at)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use proptest::prelude::*;
    use test_case::test_case;
    use tessera_types::Operator;

    fn store_with_x() -> MemoryStore {
        let store = MemoryStore::new();
        store
            .define_attribute(&"x".into(), AttributeType::Integer)
            .unwrap();
        store
    }

    #[test]
    fn redefining_attribute_with_same_type_is_idempotent() {
        let store = store_with_x();
        assert!(
            store
                .define_attribute(&"x".into(), AttributeType::Integer)
                .is_ok()
        );
    }

    #[test]
    fn redefining_attribute_with_other_type_is_rejected() {
        let store = store_with_x();
        let err = store
            .define_attribute(&"x".into(), AttributeType::String)
            .unwrap_err();
        assert!(matches!(
            err,
            StoreError::Definition(DefinitionError::AttributeTypeConflict { .. })
        ));
    }

    #[test]
    fn user_values_are_validated_against_type() {
        let store = store_with_x();
        let err = store
            .put_user(&"u1".into(), vec![("x".into(), "nine".to_string())])
            .unwrap_err();
        assert!(matches!(
            err,
            StoreError::Definition(DefinitionError::InvalidValue { .. })
        ));

        let err = store
            .put_user(&"u1".into(), vec![("y".into(), "1".to_string())])
            .unwrap_err();
        assert_eq!(
            err,
            StoreError::Definition(DefinitionError::UnknownAttribute("y".into()))
        );
    }

    #[test]
    fn every_user_write_bumps_updated_at() {
        let store = store_with_x();
        let user = UserId::new("u1");
        let t1 = store
            .put_user(&user, vec![("x".into(), "1".to_string())])
            .unwrap();
        let t2 = store.set_user_attribute(&user, &"x".into(), "2").unwrap();
        let t3 = store.remove_user_attribute(&user, &"x".into()).unwrap();

        assert!(t2.is_newer_than(t1));
        assert!(t3.is_newer_than(t2));
        assert_eq!(store.user_updated_at(&user).unwrap(), Some(t3));
        assert_eq!(store.user_attribute(&user, &"x".into()).unwrap(), None);
    }

    #[test]
    fn policy_operator_must_match_attribute_type() {
        let store = store_with_x();
        let err = store
            .put_policy(
                &"p".into(),
                vec![Condition::new("x", Operator::StartsWith, "1")],
            )
            .unwrap_err();
        assert!(matches!(
            err,
            StoreError::Definition(DefinitionError::OperatorNotAllowed { .. })
        ));
    }

    #[test]
    fn empty_policy_and_resource_are_rejected() {
        let store = store_with_x();
        assert!(store.put_policy(&"p".into(), vec![]).is_err());
        assert_eq!(
            store.put_resource(&"r".into(), vec![]).unwrap_err(),
            StoreError::Definition(DefinitionError::EmptyResource)
        );
    }

    #[test]
    fn resource_must_reference_defined_policies() {
        let store = store_with_x();
        let err = store
            .put_resource(&"r".into(), vec!["ghost".into()])
            .unwrap_err();
        assert_eq!(
            err,
            StoreError::Definition(DefinitionError::UnknownPolicy("ghost".into()))
        );
    }

    #[test]
    fn replacing_policy_bumps_and_evicts() {
        let store = store_with_x();
        let policy = PolicyName::new("p");
        let t1 = store
            .put_policy(&policy, vec![Condition::new("x", Operator::Equals, "1")])
            .unwrap();
        let now = store.now().unwrap();
        store
            .set_cached_policy_decision(&"u1".into(), &policy, true, now)
            .unwrap();
        store
            .set_cached_policy_decision(&"u2".into(), &policy, false, now)
            .unwrap();
        assert_eq!(store.cached_decision_counts().unwrap(), (2, 0));

        let t2 = store
            .put_policy(&policy, vec![Condition::new("x", Operator::Equals, "2")])
            .unwrap();

        assert!(t2.is_newer_than(t1));
        assert_eq!(store.policy_updated_at(&policy).unwrap(), Some(t2));
        assert_eq!(
            store.cached_policy_decision(&"u1".into(), &policy).unwrap(),
            None
        );
        assert_eq!(store.cached_decision_counts().unwrap(), (0, 0));
    }

    #[test]
    fn now_reads_the_store_clock() {
        let clock = Arc::new(ManualClock::new(Timestamp::new(42)));
        let store = MemoryStore::with_clock(clock.clone());
        assert_eq!(store.now().unwrap(), Timestamp::new(42));

        clock.advance();
        assert_eq!(store.now().unwrap(), Timestamp::new(43));
    }

    #[test]
    fn cached_decision_keeps_given_stamp() {
        let store = MemoryStore::new();
        store
            .set_cached_resource_decision(&"u".into(), &"r".into(), None, Timestamp::new(7))
            .unwrap();

        let cached = store
            .cached_resource_decision(&"u".into(), &"r".into())
            .unwrap()
            .unwrap();
        assert_eq!(cached.computed_at, Timestamp::new(7));
        assert_eq!(cached.granting_policy, None);
    }

    #[test]
    fn older_decision_does_not_replace_newer() {
        let store = MemoryStore::new();
        let user = UserId::new("u");
        let policy = PolicyName::new("p");

        store
            .set_cached_policy_decision(&user, &policy, true, Timestamp::new(9))
            .unwrap();
        store
            .set_cached_policy_decision(&user, &policy, false, Timestamp::new(5))
            .unwrap();
        let cached = store.cached_policy_decision(&user, &policy).unwrap().unwrap();
        assert!(cached.allowed);
        assert_eq!(cached.computed_at, Timestamp::new(9));

        store
            .set_cached_resource_decision(&user, &"r".into(), Some(&policy), Timestamp::new(9))
            .unwrap();
        store
            .set_cached_resource_decision(&user, &"r".into(), None, Timestamp::new(8))
            .unwrap();
        let cached = store
            .cached_resource_decision(&user, &"r".into())
            .unwrap()
            .unwrap();
        assert_eq!(cached.granting_policy, Some(policy));
    }

    #[test]
    fn user_record_returns_attributes_and_stamp() {
        let store = store_with_x();
        let user = UserId::new("u1");
        assert_eq!(store.user(&user).unwrap(), None);

        let stamp = store
            .put_user(&user, vec![("x".into(), "4".to_string())])
            .unwrap();
        let record = store.user(&user).unwrap().unwrap();
        assert_eq!(record.updated_at, stamp);
        assert_eq!(record.attributes.get(&AttributeName::from("x")).map(String::as_str), Some("4"));
    }

    #[test]
    fn batch_attribute_write_merges_and_bumps_once() {
        let store = store_with_x();
        store
            .define_attribute(&"dept".into(), AttributeType::String)
            .unwrap();
        let user = UserId::new("u1");
        store
            .put_user(&user, vec![("x".into(), "1".to_string())])
            .unwrap();

        let stamp = store
            .set_user_attributes(&user, vec![("dept".into(), "eng".to_string())])
            .unwrap();
        assert_eq!(store.user_updated_at(&user).unwrap(), Some(stamp));
        assert_eq!(store.user_attribute(&user, &"x".into()).unwrap(), Some("1".to_string()));
        assert_eq!(
            store.user_attribute(&user, &"dept".into()).unwrap(),
            Some("eng".to_string())
        );

        // One bad value rejects the whole batch.
        let err = store
            .set_user_attributes(
                &user,
                vec![("x".into(), "2".to_string()), ("dept".into(), "ops".to_string()), ("y".into(), "0".to_string())],
            )
            .unwrap_err();
        assert_eq!(err, StoreError::Definition(DefinitionError::UnknownAttribute("y".into())));
        assert_eq!(store.user_attribute(&user, &"x".into()).unwrap(), Some("1".to_string()));
        assert_eq!(store.user_updated_at(&user).unwrap(), Some(stamp));
    }

    #[test]
    fn unavailable_store_fails_every_call() {
        let store = store_with_x();
        store.set_available(false);

        assert!(matches!(
            store.user_updated_at(&"u".into()),
            Err(StoreError::Unavailable(_))
        ));
        assert!(matches!(store.now(), Err(StoreError::Unavailable(_))));
        assert!(matches!(
            store.set_cached_policy_decision(&"u".into(), &"p".into(), true, Timestamp::new(1)),
            Err(StoreError::Unavailable(_))
        ));

        store.set_available(true);
        assert!(store.user_updated_at(&"u".into()).is_ok());
    }

    #[test_case(AttributeType::Integer, " -12 ", true)]
    #[test_case(AttributeType::Integer, "1.5", false)]
    #[test_case(AttributeType::Boolean, "TRUE", true)]
    #[test_case(AttributeType::Boolean, "1", false)]
    #[test_case(AttributeType::String, "", true)]
    fn user_value_validation(ty: AttributeType, value: &str, accepted: bool) {
        let store = MemoryStore::new();
        store.define_attribute(&"a".into(), ty).unwrap();
        let result = store.set_user_attribute(&"u".into(), &"a".into(), value);
        assert_eq!(result.is_ok(), accepted);
    }

    proptest! {
        /// Property: with the logical clock, a read stamp taken after any
        /// sequence of definition writes is newer than every one of them.
        #[test]
        fn prop_read_stamp_follows_definition_writes(
            values in proptest::collection::vec(-100i64..100, 1..20),
        ) {
            let store = store_with_x();
            let user = UserId::new("u");
            let mut latest = Timestamp::EPOCH;
            for value in values {
                let stamp = store
                    .set_user_attribute(&user, &"x".into(), &value.to_string())
                    .unwrap();
                prop_assert!(stamp.is_newer_than(latest));
                latest = stamp;
            }

            let computed_at = store.now().unwrap();
            prop_assert!(computed_at.is_newer_than(latest));
            prop_assert_eq!(store.user_updated_at(&user).unwrap(), Some(latest));
        }
    }
}
