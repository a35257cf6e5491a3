//! Rendering adapter: renderer-agnostic message consumption.
//!
//! # Invariants
//! - A renderer cannot mutate world truth; it only drains messages.
//! - Frame content derives entirely from the message batch and the camera.

mod renderer;

pub use renderer::{DebugTextRenderer, Renderer};
