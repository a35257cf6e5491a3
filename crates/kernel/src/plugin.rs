//! Startup registration point for engine extensions.
//!
//! A plugin supplies, once at world construction, the dispatchers, facets,
//! and overlay routing rules merged into the world's component registries
//! before the world is first used. Unknown or duplicate names are fatal at
//! startup: they indicate a configuration mismatch that cannot be safely
//! simulated.

use crate::dispatch::{
    EntityDispatcher, Facet, GameDispatcher, GroupDispatcher, ScreenDispatcher,
};
use std::sync::Arc;
use tableau_assets::OverlayRoute;

/// External registration contract, consumed by `World::make`.
pub trait Plugin {
    /// Optional game dispatcher; the standard no-op one is used otherwise.
    fn game_dispatcher(&self) -> Option<(String, Arc<dyn GameDispatcher>)> {
        None
    }

    fn screen_dispatchers(&self) -> Vec<(String, Arc<dyn ScreenDispatcher>)> {
        Vec::new()
    }

    fn group_dispatchers(&self) -> Vec<(String, Arc<dyn GroupDispatcher>)> {
        Vec::new()
    }

    fn entity_dispatchers(&self) -> Vec<(String, Arc<dyn EntityDispatcher>)> {
        Vec::new()
    }

    fn facets(&self) -> Vec<(String, Arc<dyn Facet>)> {
        Vec::new()
    }

    fn overlay_routes(&self) -> Vec<OverlayRoute> {
        Vec::new()
    }
}

/// The empty plugin: standard dispatchers only.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoPlugin;

impl Plugin for NoPlugin {}
