//! Store error types.

use tessera_types::{AttributeName, AttributeType, Operator, PolicyName};
use thiserror::Error;

/// Error surfaced by a [`DecisionStore`](crate::DecisionStore) or
/// [`DefinitionWriter`](crate::DefinitionWriter).
///
/// Authorization fails closed on any of these.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// The backing store cannot be reached.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// A writer panicked while holding an internal lock.
    #[error("store lock poisoned: {0}")]
    Poisoned(&'static str),

    /// A definition write was rejected.
    #[error("invalid definition: {0}")]
    Definition(#[from] DefinitionError),
}

/// Validation failure on the definition write side.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DefinitionError {
    #[error("attribute '{0}' is not defined")]
    UnknownAttribute(AttributeName),

    #[error("attribute '{name}' is already defined as {existing}")]
    AttributeTypeConflict {
        name: AttributeName,
        existing: AttributeType,
    },

    #[error("value '{value}' is not a valid {attribute_type} for attribute '{name}'")]
    InvalidValue {
        name: AttributeName,
        attribute_type: AttributeType,
        value: String,
    },

    #[error("operator '{operator}' is not allowed for {attribute_type} attribute '{name}'")]
    OperatorNotAllowed {
        name: AttributeName,
        attribute_type: AttributeType,
        operator: Operator,
    },

    #[error("policy '{0}' must have at least one condition")]
    EmptyPolicy(PolicyName),

    #[error("resource must be bound to at least one policy")]
    EmptyResource,

    #[error("policy '{0}' is not defined")]
    UnknownPolicy(PolicyName),
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
