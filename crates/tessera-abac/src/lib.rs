//! # tessera-abac: Attribute-Based Access Control with cached decisions
//!
//! Decides whether a user may access a resource. Users carry typed
//! attributes, policies are conjunctions of conditions over those attributes,
//! and resources are guarded by an ordered disjunction of policies.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │  StalenessCoordinator                        │
//! │  ├─ Fresh cached grant  → true (no writes)   │
//! │  ├─ Fresh cached denial → false              │
//! │  └─ Anything stale      → recompute          │
//! └─────────────────┬───────────────────────────┘
//!                   │
//!                   ▼
//! ┌─────────────────────────────────────────────┐
//! │  ResourceAuthorizer                          │
//! │  └─ First satisfied policy wins and is       │
//! │     recorded as the granting policy          │
//! └─────────────────┬───────────────────────────┘
//!                   │
//!                   ▼
//! ┌─────────────────────────────────────────────┐
//! │  PolicyEvaluator                             │
//! │  ├─ Fresh cached policy decision → reuse     │
//! │  └─ Otherwise AND of conditions, stopping    │
//! │     at the first failure                     │
//! └─────────────────┬───────────────────────────┘
//!                   │
//!                   ▼
//! ┌─────────────────────────────────────────────┐
//! │  condition::evaluate                         │
//! │  Integer {>,<,=}  String {=,starts_with}     │
//! │  Boolean {=}      anything else → false      │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! A cached decision is fresh only if its `computed_at` is strictly newer
//! than the `updated_at` of every entity it was derived from. Recomputed
//! decisions are stamped with a store clock reading taken before their
//! inputs are read, so a definition write that races a recomputation always
//! leaves the result stale. Correctness depends on definition writers
//! bumping those timestamps; see [`tessera_store::DefinitionWriter`].
//!
//! ## Examples
//!
//! ```
//! use std::sync::Arc;
//! use tessera_abac::StalenessCoordinator;
//! use tessera_store::{DefinitionWriter, MemoryStore};
//! use tessera_types::{AttributeType, Condition, Operator};
//!
//! let store = Arc::new(MemoryStore::new());
//! store.define_attribute(&"clearance".into(), AttributeType::Integer)?;
//! store.put_user(&"alice".into(), vec![("clearance".into(), "3".into())])?;
//! store.put_policy(
//!     &"cleared".into(),
//!     vec![Condition::new("clearance", Operator::GreaterThan, "2")],
//! )?;
//! store.put_resource(&"vault".into(), vec!["cleared".into()])?;
//!
//! let authz = StalenessCoordinator::new(store).without_audit();
//! assert!(authz.is_authorized(&"alice".into(), &"vault".into())?);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod condition;
mod coordinator;
mod error;
pub mod freshness;
mod policy;
mod resource;


pub use coordinator::{AuthorizerOptions, Decision, DecisionSource, StalenessCoordinator};
pub use error::{AuthzError, Result};
pub use policy::PolicyEvaluator;
pub use resource::ResourceAuthorizer;
