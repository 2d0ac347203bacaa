//! Freshness checks for cached decisions.
//!
//! A cached decision is trustworthy only if its `computed_at` is strictly
//! newer than the `updated_at` of every entity it depends on. Ties are stale.

use tessera_store::DecisionStore;
use tessera_types::{CachedPolicyDecision, PolicyName, Timestamp, UserId};

use crate::error::Result;

/// Returns whether `computed_at` is strictly newer than every dependency.
pub fn is_fresh(computed_at: Timestamp, dependencies: impl IntoIterator<Item = Timestamp>) -> bool {
    dependencies
        .into_iter()
        .all(|updated_at| computed_at.is_newer_than(updated_at))
}

/// Returns the cached decision of `policy` for `user` if it is still fresh
/// against the policy's `updated_at` and `user_updated_at`.
///
/// Reads the policy timestamp only when a cached decision exists. Never reads
/// conditions or attributes.
pub(crate) fn fresh_policy_decision<S: DecisionStore + ?Sized>(
    store: &S,
    user: &UserId,
    policy: &PolicyName,
    user_updated_at: Timestamp,
) -> Result<Option<CachedPolicyDecision>> {
    let Some(cached) = store.cached_policy_decision(user, policy)? else {
        return Ok(None);
    };

    let policy_updated_at = store
        .policy_updated_at(policy)?
        .unwrap_or(Timestamp::EPOCH);

    if is_fresh(cached.computed_at, [policy_updated_at, user_updated_at]) {
        Ok(Some(cached))
    } else {
        Ok(None)
    }
}
