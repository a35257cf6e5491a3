//! Audio adapter: player-agnostic message consumption.
//!
//! # Invariants
//! - A player cannot mutate world truth; it only drains messages.
//! - Song playback state lives in the player, never in the core.

mod player;

pub use player::{AudioPlayer, NullAudioPlayer, SongState};
