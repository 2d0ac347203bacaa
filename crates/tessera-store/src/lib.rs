//! # tessera-store: Decision store contract
//!
//! The authorization engine keeps no state between requests. Everything it
//! reads or caches goes through [`DecisionStore`]; definition management
//! writes through [`DefinitionWriter`], which carries the invalidation
//! obligations (timestamp bumps and eager eviction).
//!
//! This crate also provides:
//! - [`MemoryStore`]: a thread-safe in-memory implementation of both traits
//! - [`Clock`] implementations: [`LogicalClock`], [`WallClock`], [`ManualClock`]
//! - [`CountingStore`]: per-operation call counters for tests and diagnostics

mod clock;
mod error;
mod instrument;
mod memory;
mod traits;

pub use clock::{Clock, LogicalClock, ManualClock, WallClock};
pub use error::{DefinitionError, Result, StoreError};
pub use instrument::{CountingStore, StoreOp};
pub use memory::MemoryStore;
pub use traits::{DecisionStore, DefinitionWriter};
