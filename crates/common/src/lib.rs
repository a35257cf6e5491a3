//! Shared value types for the tableau engine.
//!
//! # Invariants
//! - Everything in this crate is a pure value: cloning is cheap and no type
//!   here holds behavior or handles.
//! - `Address` ordering and equality derive solely from its segments.

pub mod address;
pub mod camera;
pub mod value;

pub use address::{Address, AddressParseError, WILDCARD};
pub use camera::Camera;
pub use value::{Value, ValueKind};
