//! Outbound message queues: the core's only boundary with subsystems.
//!
//! The core appends; an external audio player / renderer / physics
//! integrator drains once per tick. Fire-and-forget, no return values, and
//! therefore no shared mutable state with the subsystems.

use crate::simulant::ViewKind;
use glam::Vec2;
use serde::{Deserialize, Serialize};
use tableau_common::Address;

/// Message to the audio subsystem.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AudioMessage {
    PlaySound { asset: String, volume: f32 },
    PlaySong { asset: String, volume: f32 },
    FadeOutSong { ticks: u64 },
    StopSong,
}

/// One drawable produced by a dispatcher or facet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderDescriptor {
    pub position: Vec2,
    pub size: Vec2,
    pub rotation: f32,
    /// Lower depth draws first (further back).
    pub depth: f32,
    pub view: ViewKind,
    pub asset: String,
    pub color: [f32; 4],
}

/// Message to the render subsystem.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RenderMessage {
    Descriptors(Vec<RenderDescriptor>),
    HintPackageUse(String),
    HintPackageDisuse(String),
}

/// Collision shape of a physics body.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum BodyShape {
    Box { size: Vec2 },
    Circle { radius: f32 },
}

/// Message to the physics subsystem.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PhysicsMessage {
    CreateBody {
        address: Address,
        shape: BodyShape,
        position: Vec2,
        density: f32,
        restitution: f32,
    },
    DestroyBody {
        address: Address,
    },
    SetPosition {
        address: Address,
        position: Vec2,
    },
    ApplyImpulse {
        address: Address,
        impulse: Vec2,
    },
    SetGravity {
        gravity: Vec2,
    },
}

/// Collision report published back into the event engine by the integrator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollisionData {
    pub normal: Vec2,
    pub speed: f32,
    /// Address of the simulant collided with.
    pub collidee: Address,
}

/// The three outbound FIFO queues, appended by the core, drained by
/// subsystems once per tick.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MessageQueues {
    audio: Vec<AudioMessage>,
    render: Vec<RenderMessage>,
    physics: Vec<PhysicsMessage>,
}

impl MessageQueues {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enqueue_audio(&mut self, message: AudioMessage) {
        self.audio.push(message);
    }

    pub fn enqueue_render(&mut self, message: RenderMessage) {
        self.render.push(message);
    }

    pub fn enqueue_physics(&mut self, message: PhysicsMessage) {
        self.physics.push(message);
    }

    pub fn drain_audio(&mut self) -> Vec<AudioMessage> {
        std::mem::take(&mut self.audio)
    }

    pub fn drain_render(&mut self) -> Vec<RenderMessage> {
        std::mem::take(&mut self.render)
    }

    pub fn drain_physics(&mut self) -> Vec<PhysicsMessage> {
        std::mem::take(&mut self.physics)
    }

    pub fn audio_len(&self) -> usize {
        self.audio.len()
    }

    pub fn render_len(&self) -> usize {
        self.render.len()
    }

    pub fn physics_len(&self) -> usize {
        self.physics.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drain_preserves_fifo_order() {
        let mut queues = MessageQueues::new();
        queues.enqueue_audio(AudioMessage::PlaySound {
            asset: "bounce".into(),
            volume: 1.0,
        });
        queues.enqueue_audio(AudioMessage::StopSong);

        let drained = queues.drain_audio();
        assert_eq!(drained.len(), 2);
        assert!(matches!(drained[0], AudioMessage::PlaySound { .. }));
        assert!(matches!(drained[1], AudioMessage::StopSong));
        assert_eq!(queues.audio_len(), 0);
    }

    #[test]
    fn queues_are_independent() {
        let mut queues = MessageQueues::new();
        queues.enqueue_physics(PhysicsMessage::SetGravity {
            gravity: Vec2::new(0.0, -9.8),
        });
        assert_eq!(queues.physics_len(), 1);
        assert_eq!(queues.render_len(), 0);
        assert!(queues.drain_render().is_empty());
        assert_eq!(queues.drain_physics().len(), 1);
    }
}
