//! # tessera-types: Core types for `Tessera`
//!
//! This crate contains the value types shared across the `Tessera` system:
//! - Entity names ([`UserId`], [`AttributeName`], [`PolicyName`], [`ResourceName`])
//! - Logical time ([`Timestamp`])
//! - Condition vocabulary ([`AttributeType`], [`Operator`], [`Condition`])
//! - Definition records ([`UserRecord`], [`PolicyRecord`], [`ResourceRecord`])
//! - Cached decisions ([`CachedPolicyDecision`], [`CachedResourceDecision`])
//! - Engine knobs ([`NegativeCacheMode`])

use std::{
    borrow::Borrow,
    collections::BTreeMap,
    fmt::Display,
    str::FromStr,
    time::{SystemTime, UNIX_EPOCH},
};

use serde::{Deserialize, Serialize};

// ============================================================================
// Entity Names - string newtypes
// ============================================================================

macro_rules! name_type {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl Borrow<str> for $name {
            fn borrow(&self) -> &str {
                &self.0
            }
        }
    };
}

name_type!(
    /// Identifier of a user whose attributes drive access decisions.
    UserId
);
name_type!(
    /// Name of a typed attribute definition (e.g. `clearance`, `department`).
    AttributeName
);
name_type!(
    /// Name of a policy: a conjunction of attribute conditions.
    PolicyName
);
name_type!(
    /// Name of a protected resource: a disjunction of policies.
    ResourceName
);

// ============================================================================
// Timestamp - Copy (8-byte logical marker)
// ============================================================================

/// Logical timestamp used to order definition writes against cached decisions.
///
/// Only strict comparability matters. The in-memory store can stamp with a
/// plain counter; a deployment backed by a shared store may stamp with
/// wall-clock nanoseconds, in which case two writes can share a value. Equal
/// values are always treated as "not newer".
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(transparent)]
pub struct Timestamp(u64);

impl Timestamp {
    /// The zero timestamp. Absent entities compare as this value.
    pub const EPOCH: Timestamp = Timestamp(0);

    pub fn new(value: u64) -> Self {
        Self(value)
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }

    /// Nanoseconds since the Unix epoch. A clock set before 1970 yields `EPOCH`.
    pub fn now() -> Self {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |d| d.as_nanos() as u64);
        Self(nanos)
    }

    /// Creates a wall-clock timestamp ensuring monotonicity: `max(now, last + 1)`.
    pub fn now_monotonic(last: Option<Timestamp>) -> Self {
        let now = Self::now();
        match last {
            Some(prev) if now.0 <= prev.0 => prev.next(),
            _ => now,
        }
    }

    /// The smallest timestamp strictly greater than `self`.
    pub fn next(self) -> Self {
        Timestamp(self.0.saturating_add(1))
    }

    /// Strict comparison. A tie is not newer.
    pub fn is_newer_than(self, other: Timestamp) -> bool {
        self.0 > other.0
    }
}

impl Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for Timestamp {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl From<Timestamp> for u64 {
    fn from(ts: Timestamp) -> Self {
        ts.0
    }
}

// ============================================================================
// Condition vocabulary
// ============================================================================

/// Error returned when parsing the textual form of an operator.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("unknown operator '{0}'")]
    UnknownOperator(String),
}

/// Declared type of an attribute. Never changes once a policy references it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttributeType {
    Integer,
    String,
    Boolean,
}

impl AttributeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AttributeType::Integer => "integer",
            AttributeType::String => "string",
            AttributeType::Boolean => "boolean",
        }
    }

    /// Operators that are meaningful for this type.
    pub fn allowed_operators(&self) -> &'static [Operator] {
        match self {
            AttributeType::Integer => &[Operator::GreaterThan, Operator::LessThan, Operator::Equals],
            AttributeType::String => &[Operator::Equals, Operator::StartsWith],
            AttributeType::Boolean => &[Operator::Equals],
        }
    }

    pub fn allows(&self, operator: Operator) -> bool {
        self.allowed_operators().contains(&operator)
    }

    /// Returns whether `value` is a well-formed literal of this type.
    pub fn accepts(&self, value: &str) -> bool {
        match self {
            AttributeType::Integer => parse_integer(value).is_some(),
            AttributeType::String => true,
            AttributeType::Boolean => parse_boolean(value).is_some(),
        }
    }
}

impl Display for AttributeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Comparison operator of a condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operator {
    #[serde(rename = ">")]
    GreaterThan,
    #[serde(rename = "<")]
    LessThan,
    #[serde(rename = "=")]
    Equals,
    #[serde(rename = "starts_with")]
    StartsWith,
}

impl Operator {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operator::GreaterThan => ">",
            Operator::LessThan => "<",
            Operator::Equals => "=",
            Operator::StartsWith => "starts_with",
        }
    }
}

impl Display for Operator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Operator {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            ">" => Ok(Operator::GreaterThan),
            "<" => Ok(Operator::LessThan),
            "=" => Ok(Operator::Equals),
            "starts_with" => Ok(Operator::StartsWith),
            _ => Err(ParseError::UnknownOperator(s.to_string())),
        }
    }
}

/// Parses an integer literal, ignoring surrounding whitespace.
pub fn parse_integer(value: &str) -> Option<i64> {
    value.trim().parse().ok()
}

/// Parses a boolean literal (`true`/`false`, ASCII case-insensitive).
pub fn parse_boolean(value: &str) -> Option<bool> {
    let value = value.trim();
    if value.eq_ignore_ascii_case("true") {
        Some(true)
    } else if value.eq_ignore_ascii_case("false") {
        Some(false)
    } else {
        None
    }
}

/// A single typed predicate: `<attribute> <operator> <value>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Condition {
    pub attribute: AttributeName,
    pub operator: Operator,
    pub value: String,
}

impl Condition {
    pub fn new(
        attribute: impl Into<AttributeName>,
        operator: Operator,
        value: impl Into<String>,
    ) -> Self {
        Self {
            attribute: attribute.into(),
            operator,
            value: value.into(),
        }
    }
}

impl Display for Condition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {} {}", self.attribute, self.operator, self.value)
    }
}

// ============================================================================
// Definition records
// ============================================================================

/// A user's attribute values and the time they last changed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    pub attributes: BTreeMap<AttributeName, String>,
    pub updated_at: Timestamp,
}

/// A policy's ordered conditions and the time they were last replaced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyRecord {
    pub conditions: Vec<Condition>,
    pub updated_at: Timestamp,
}

/// A resource's ordered policy bindings and the time they last changed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceRecord {
    pub policies: Vec<PolicyName>,
    pub updated_at: Timestamp,
}

// ============================================================================
// Cached decisions
// ============================================================================

/// Cached outcome of one policy for one user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedPolicyDecision {
    pub allowed: bool,
    pub computed_at: Timestamp,
}

/// Cached outcome of one resource for one user.
///
/// `granting_policy` is `None` when no bound policy was satisfied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedResourceDecision {
    pub granting_policy: Option<PolicyName>,
    pub computed_at: Timestamp,
}

// ============================================================================
// Engine knobs
// ============================================================================

/// How a cached negative resource decision is trusted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NegativeCacheMode {
    /// Trust the cached denial when neither the user nor the resource binding
    /// changed since it was recorded. Policies loosened in the meantime are
    /// not noticed until the user or resource changes.
    #[default]
    TrustResource,
    /// Additionally read `updated_at` of every bound policy and recompute if
    /// any of them is not older than the cached denial.
    VerifyPolicies,
}

impl NegativeCacheMode {
    pub fn as_str(self) -> &'static str {
        match self {
            NegativeCacheMode::TrustResource => "trust-resource",
            NegativeCacheMode::VerifyPolicies => "verify-policies",
        }
    }
}

impl Display for NegativeCacheMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Tests
// ============================================================================
