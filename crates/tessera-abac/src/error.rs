//! Authorization error types.

use tessera_store::StoreError;
use thiserror::Error;

/// Error type for authorization requests.
///
/// Only store failures surface here. Invalid operators, missing attributes
/// and unknown definitions deny instead.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthzError {
    /// The store failed; the request fails closed.
    #[error("authorization store failure: {0}")]
    Store(#[from] StoreError),
}

/// Result type for authorization operations.
pub type Result<T> = std::result::Result<T, AuthzError>;
