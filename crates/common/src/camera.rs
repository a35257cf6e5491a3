use glam::Vec2;
use serde::{Deserialize, Serialize};

/// 2D view configuration held in the world state.
///
/// Renderers read this to place the eye; the core only stores and moves it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Camera {
    /// World-space center of the view.
    pub eye_center: Vec2,
    /// World-space extent of the view.
    pub eye_size: Vec2,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            eye_center: Vec2::ZERO,
            eye_size: Vec2::new(960.0, 544.0),
        }
    }
}

impl Camera {
    /// Lower-left corner of the view rectangle.
    pub fn view_min(&self) -> Vec2 {
        self.eye_center - self.eye_size * 0.5
    }

    /// Upper-right corner of the view rectangle.
    pub fn view_max(&self) -> Vec2 {
        self.eye_center + self.eye_size * 0.5
    }

    /// Whether a rectangle at `position` with `size` intersects the view.
    pub fn sees(&self, position: Vec2, size: Vec2) -> bool {
        let min = self.view_min();
        let max = self.view_max();
        position.x + size.x >= min.x
            && position.x <= max.x
            && position.y + size.y >= min.y
            && position.y <= max.y
    }
}
