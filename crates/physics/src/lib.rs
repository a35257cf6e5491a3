//! Physics adapter: integrator-agnostic message consumption.
//!
//! # Invariants
//! - The integrator owns body state; the core only learns of it through
//!   propagate-physics hooks reading positions back.
//! - Collision reports flow back through the caller, never directly into
//!   the event engine.

mod integrator;

pub use integrator::{Body, BoxIntegrator, Integrator};
