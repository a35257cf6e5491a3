use std::collections::BTreeSet;
use tableau_common::Camera;
use tableau_kernel::message::{RenderDescriptor, RenderMessage};
use tableau_kernel::simulant::ViewKind;

/// Renderer-agnostic interface. All renderers implement this trait.
///
/// The renderer consumes one tick's drained message batch plus the camera
/// and produces output. It never reaches back into the world — the message
/// queue is the only channel between the core and a renderer.
pub trait Renderer {
    /// The output type produced by this renderer.
    type Output;

    /// Process one tick's message batch.
    fn render(&mut self, messages: Vec<RenderMessage>, camera: &Camera) -> Self::Output;
}

/// Debug text renderer standing in for a GPU backend.
///
/// Produces a human-readable frame listing: descriptors sorted back to
/// front, camera-culled for `Relative` views. Useful for CLI output,
/// logging, and testing the render interface. The trait is stable; swap in
/// a GPU implementation without changing consumers.
#[derive(Debug, Default)]
pub struct DebugTextRenderer {
    /// Packages hinted as in-use, tracked for load/unload visibility.
    hinted_packages: BTreeSet<String>,
}

impl DebugTextRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn hinted_packages(&self) -> impl Iterator<Item = &str> {
        self.hinted_packages.iter().map(String::as_str)
    }
}

impl Renderer for DebugTextRenderer {
    type Output = String;

    fn render(&mut self, messages: Vec<RenderMessage>, camera: &Camera) -> String {
        let mut descriptors: Vec<RenderDescriptor> = Vec::new();
        for message in messages {
            match message {
                RenderMessage::Descriptors(batch) => descriptors.extend(batch),
                RenderMessage::HintPackageUse(package) => {
                    if self.hinted_packages.insert(package.clone()) {
                        tracing::debug!(%package, "package hinted in use");
                    }
                }
                RenderMessage::HintPackageDisuse(package) => {
                    if self.hinted_packages.remove(&package) {
                        tracing::debug!(%package, "package hinted out of use");
                    }
                }
            }
        }

        // Back to front: deeper descriptors print (and would draw) first.
        descriptors.sort_by(|a, b| a.depth.total_cmp(&b.depth));

        let mut out = String::new();
        out.push_str(&format!(
            "=== Frame (camera center=({:.1}, {:.1}) size=({:.0}, {:.0})) ===\n",
            camera.eye_center.x, camera.eye_center.y, camera.eye_size.x, camera.eye_size.y
        ));
        let visible: Vec<&RenderDescriptor> = descriptors
            .iter()
            .filter(|d| d.view == ViewKind::Absolute || camera.sees(d.position, d.size))
            .collect();
        out.push_str(&format!("Descriptors: {}\n", visible.len()));
        for descriptor in visible {
            out.push_str(&format!(
                "  [{}] pos=({:.2}, {:.2}) size=({:.2}, {:.2}) depth={:.1} rot={:.2}\n",
                descriptor.asset,
                descriptor.position.x,
                descriptor.position.y,
                descriptor.size.x,
                descriptor.size.y,
                descriptor.depth,
                descriptor.rotation
            ));
        }
        out
    }
}
