//! Resource authorization: a disjunction of policies, first match wins.

use tessera_store::DecisionStore;
use tessera_types::{PolicyName, ResourceName, UserId};
use tracing::debug;

use crate::error::Result;
use crate::policy::PolicyEvaluator;

/// Finds the first policy bound to a resource that the user satisfies.
#[derive(Debug)]
pub struct ResourceAuthorizer<'s, S: DecisionStore + ?Sized> {
    store: &'s S,
    policies: PolicyEvaluator<'s, S>,
}

impl<'s, S: DecisionStore + ?Sized> ResourceAuthorizer<'s, S> {
    pub fn new(store: &'s S) -> Self {
        Self {
            store,
            policies: PolicyEvaluator::new(store),
        }
    }

    /// Evaluates the resource's policies in binding order.
    ///
    /// On the first satisfied policy, caches a resource decision naming it and
    /// returns it; later policies are never evaluated. Returns `None` when no
    /// policy grants access. The negative outcome is NOT cached here; callers
    /// that want it cached must write it themselves.
    pub fn authorize_resource(
        &self,
        user: &UserId,
        resource: &ResourceName,
    ) -> Result<Option<PolicyName>> {
        let computed_at = self.store.now()?;
        let policies = self
            .store
            .resource_policies(resource)?
            .map(|record| record.policies)
            .unwrap_or_default();

        if policies.is_empty() {
            debug!(resource = %resource, "Resource has no bound policies");
        }

        for policy in policies {
            if self.policies.evaluate_policy(user, &policy)? {
                self.store.set_cached_resource_decision(
                    user,
                    resource,
                    Some(&policy),
                    computed_at,
                )?;
                debug!(
                    user = %user,
                    resource = %resource,
                    policy = %policy,
                    %computed_at,
                    "Resource granted"
                );
                return Ok(Some(policy));
            }
        }

        Ok(None)
    }
}
