//! Policy evaluation: a conjunction of conditions with a cached outcome.

use std::collections::HashMap;

use tessera_store::DecisionStore;
use tessera_types::{AttributeName, AttributeType, PolicyName, Timestamp, UserId};
use tracing::{debug, trace, warn};

use crate::condition;
use crate::error::Result;
use crate::freshness::fresh_policy_decision;

/// Evaluates whether a user satisfies every condition of a policy.
///
/// A fresh cached decision is returned without touching conditions or
/// attributes. Otherwise the conjunction is recomputed, stopping at the first
/// failing condition, and the outcome is written back to the cache stamped
/// with the time the recomputation started reading.
#[derive(Debug)]
pub struct PolicyEvaluator<'s, S: DecisionStore + ?Sized> {
    store: &'s S,
}

impl<'s, S: DecisionStore + ?Sized> PolicyEvaluator<'s, S> {
    pub fn new(store: &'s S) -> Self {
        Self { store }
    }

    /// Returns whether `user` satisfies `policy`.
    ///
    /// An unknown policy or user yields `false`, and that outcome is cached
    /// like any other.
    pub fn evaluate_policy(&self, user: &UserId, policy: &PolicyName) -> Result<bool> {
        let user_updated_at = self
            .store
            .user_updated_at(user)?
            .unwrap_or(Timestamp::EPOCH);

        if let Some(cached) = fresh_policy_decision(self.store, user, policy, user_updated_at)? {
            trace!(user = %user, policy = %policy, allowed = cached.allowed, "Policy decision cache hit");
            return Ok(cached.allowed);
        }

        // Stamped before the reads: a write landing mid-evaluation is newer.
        let computed_at = self.store.now()?;
        let allowed = self.compute(user, policy)?;
        self.store
            .set_cached_policy_decision(user, policy, allowed, computed_at)?;
        debug!(
            user = %user,
            policy = %policy,
            allowed,
            %computed_at,
            "Policy decision recomputed"
        );
        Ok(allowed)
    }

    fn compute(&self, user: &UserId, policy: &PolicyName) -> Result<bool> {
        let Some(record) = self.store.policy(policy)? else {
            warn!(policy = %policy, "Policy not defined; denying");
            return Ok(false);
        };

        let mut lookup = AttributeLookup::new(self.store, user);
        for condition in &record.conditions {
            let (attribute_type, value) = lookup.resolve(&condition.attribute)?;
            if !condition::evaluate(condition, attribute_type, value) {
                trace!(user = %user, policy = %policy, failed = %condition, "Conjunction short-circuited");
                return Ok(false);
            }
        }
        Ok(true)
    }
}

/// Memoizes attribute types and user values for the duration of one policy
/// evaluation.
struct AttributeLookup<'s, 'c, S: DecisionStore + ?Sized> {
    store: &'s S,
    user: &'c UserId,
    types: HashMap<&'c AttributeName, Option<AttributeType>>,
    values: HashMap<&'c AttributeName, Option<String>>,
}

impl<'s, 'c, S: DecisionStore + ?Sized> AttributeLookup<'s, 'c, S> {
    fn new(store: &'s S, user: &'c UserId) -> Self {
        Self {
            store,
            user,
            types: HashMap::new(),
            values: HashMap::new(),
        }
    }

    fn resolve(&mut self, name: &'c AttributeName) -> Result<(Option<AttributeType>, Option<&str>)> {
        if !self.values.contains_key(name) {
            let value = self.store.user_attribute(self.user, name)?;
            self.values.insert(name, value);
        }
        if !self.types.contains_key(name) {
            let attribute_type = self.store.attribute_type(name)?;
            self.types.insert(name, attribute_type);
        }

        let attribute_type = self.types.get(name).copied().flatten();
        let value = self.values.get(name).and_then(Option::as_deref);
        Ok((attribute_type, value))
    }
}
