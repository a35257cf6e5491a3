//! Developer tooling: read-only world inspection.
//!
//! # Invariants
//! - Tools never mutate the world; all queries are read-only.

mod inspector;

pub use inspector::{EntityInfo, WorldInspector, WorldSummary};
