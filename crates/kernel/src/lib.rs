//! Tableau kernel: the simulation core — simulant hierarchy, composed
//! behavior, events, tasks, and the world aggregate that binds them.
//!
//! # Invariants
//! - One tick-keyed clock; every scheduled behavior keys off it.
//! - Subscriber and task dispatch order is deterministic.
//! - All state mutations flow through explicit world operations.

pub mod dispatch;
pub mod error;
pub mod event;
pub mod message;
pub mod plugin;
pub mod simulant;
pub mod task;
pub mod world;
pub mod xtension;

pub use dispatch::{
    Components, EntityDispatcher, Facet, GameDispatcher, GroupDispatcher, ScreenDispatcher,
    StandardDispatcher,
};
pub use error::KernelError;
pub use event::{Event, EventData, Handling, Outcome, SubscriptionKey, channels};
pub use message::{
    AudioMessage, BodyShape, CollisionData, PhysicsMessage, RenderDescriptor, RenderMessage,
};
pub use plugin::{NoPlugin, Plugin};
pub use simulant::{
    Entity, Game, Group, Screen, SimulantRef, Simulants, Transition, TransitionKind,
    TransitionState, ViewKind,
};
pub use world::{Interactivity, World, WorldConfig};
pub use xtension::{FieldDefault, Xtension};
