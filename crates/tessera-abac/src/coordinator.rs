//! The request entry point: cached fast paths plus staleness-driven
//! recomputation.

use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use tessera_store::DecisionStore;
use tessera_types::{NegativeCacheMode, PolicyName, ResourceName, Timestamp, UserId};
use tracing::{debug, error, info, warn};

use crate::error::Result;
use crate::freshness::{fresh_policy_decision, is_fresh};
use crate::resource::ResourceAuthorizer;

// ============================================================================
// Decision
// ============================================================================

/// Where an authorization answer came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum DecisionSource {
    /// Fresh cached grant whose granting policy decision is also fresh.
    CachedGrant,
    /// Fresh cached denial.
    CachedDenial,
    /// Computed from current definitions in this request.
    Recomputed,
}

impl fmt::Display for DecisionSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DecisionSource::CachedGrant => "cached-grant",
            DecisionSource::CachedDenial => "cached-denial",
            DecisionSource::Recomputed => "recomputed",
        };
        f.write_str(s)
    }
}

/// The outcome of an authorization request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Decision {
    pub allowed: bool,
    /// The first bound policy the user satisfied, if any.
    pub granting_policy: Option<PolicyName>,
    pub source: DecisionSource,
}

impl Decision {
    fn granted(policy: PolicyName, source: DecisionSource) -> Self {
        Self {
            allowed: true,
            granting_policy: Some(policy),
            source,
        }
    }

    fn denied(source: DecisionSource) -> Self {
        Self {
            allowed: false,
            granting_policy: None,
            source,
        }
    }
}

// ============================================================================
// Coordinator
// ============================================================================

/// Tunables for [`StalenessCoordinator`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthorizerOptions {
    /// How far a cached denial is trusted.
    pub negative_cache: NegativeCacheMode,
    /// Log every decision at info (grant) or warn (deny) level.
    pub audit: bool,
}

impl Default for AuthorizerOptions {
    fn default() -> Self {
        Self {
            negative_cache: NegativeCacheMode::default(),
            audit: true,
        }
    }
}

/// Answers "may this user access this resource?" with as little store
/// traffic as the cached state allows.
///
/// Holds no per-request state; any number of threads may share one
/// coordinator, and any number of coordinators may share one store.
pub struct StalenessCoordinator<S: DecisionStore + ?Sized> {
    store: Arc<S>,
    options: AuthorizerOptions,
}

impl<S: DecisionStore + ?Sized> StalenessCoordinator<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            options: AuthorizerOptions::default(),
        }
    }

    pub fn with_options(mut self, options: AuthorizerOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_negative_cache(mut self, mode: NegativeCacheMode) -> Self {
        self.options.negative_cache = mode;
        self
    }

    /// Disables audit logging (for testing).
    pub fn without_audit(mut self) -> Self {
        self.options.audit = false;
        self
    }

    /// Returns whether `user` may access `resource`.
    ///
    /// Store failures propagate; there is no fallback answer.
    pub fn is_authorized(&self, user: &UserId, resource: &ResourceName) -> Result<bool> {
        self.authorize(user, resource).map(|decision| decision.allowed)
    }

    /// Like [`is_authorized`](Self::is_authorized), but reports the granting
    /// policy and whether the answer was served from cache.
    pub fn authorize(&self, user: &UserId, resource: &ResourceName) -> Result<Decision> {
        let decision = match self.decide(user, resource) {
            Ok(decision) => decision,
            Err(e) => {
                error!(user = %user, resource = %resource, error = %e, "Authorization failed closed");
                return Err(e);
            }
        };

        if self.options.audit {
            if decision.allowed {
                info!(
                    user = %user,
                    resource = %resource,
                    policy = ?decision.granting_policy.as_ref().map(PolicyName::as_str),
                    source = %decision.source,
                    "Resource access granted"
                );
            } else {
                warn!(
                    user = %user,
                    resource = %resource,
                    source = %decision.source,
                    "Resource access denied"
                );
            }
        }

        Ok(decision)
    }

    fn decide(&self, user: &UserId, resource: &ResourceName) -> Result<Decision> {
        let store = &*self.store;

        let user_updated_at = store.user_updated_at(user)?.unwrap_or(Timestamp::EPOCH);
        let resource_updated_at = store
            .resource_updated_at(resource)?
            .unwrap_or(Timestamp::EPOCH);

        if let Some(cached) = store.cached_resource_decision(user, resource)?
            && is_fresh(cached.computed_at, [resource_updated_at, user_updated_at])
        {
            match cached.granting_policy {
                Some(policy) => {
                    match fresh_policy_decision(store, user, &policy, user_updated_at)? {
                        Some(decision) if decision.allowed => {
                            return Ok(Decision::granted(policy, DecisionSource::CachedGrant));
                        }
                        _ => debug!(
                            user = %user,
                            resource = %resource,
                            policy = %policy,
                            "Granting policy decision stale; recomputing"
                        ),
                    }
                }
                None => {
                    if self.denial_still_valid(resource, cached.computed_at)? {
                        return Ok(Decision::denied(DecisionSource::CachedDenial));
                    }
                    debug!(
                        user = %user,
                        resource = %resource,
                        "Bound policy changed since denial; recomputing"
                    );
                }
            }
        }

        self.recompute(user, resource)
    }

    /// Whether a fresh cached denial can be served under the configured
    /// [`NegativeCacheMode`].
    fn denial_still_valid(&self, resource: &ResourceName, computed_at: Timestamp) -> Result<bool> {
        match self.options.negative_cache {
            NegativeCacheMode::TrustResource => Ok(true),
            NegativeCacheMode::VerifyPolicies => {
                let Some(record) = self.store.resource_policies(resource)? else {
                    return Ok(true);
                };
                for policy in &record.policies {
                    let updated_at = self
                        .store
                        .policy_updated_at(policy)?
                        .unwrap_or(Timestamp::EPOCH);
                    if !computed_at.is_newer_than(updated_at) {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
        }
    }

    fn recompute(&self, user: &UserId, resource: &ResourceName) -> Result<Decision> {
        let store = &*self.store;
        // The denial covers every read the authorizer makes, so its stamp
        // must precede them.
        let computed_at = store.now()?;
        match ResourceAuthorizer::new(store).authorize_resource(user, resource)? {
            Some(policy) => Ok(Decision::granted(policy, DecisionSource::Recomputed)),
            None => {
                store.set_cached_resource_decision(user, resource, None, computed_at)?;
                debug!(user = %user, resource = %resource, %computed_at, "Denial cached");
                Ok(Decision::denied(DecisionSource::Recomputed))
            }
        }
    }
}

impl<S: DecisionStore + ?Sized> Clone for StalenessCoordinator<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            options: self.options,
        }
    }
}

impl<S: DecisionStore + ?Sized> fmt::Debug for StalenessCoordinator<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StalenessCoordinator")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}
