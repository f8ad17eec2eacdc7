//! Interactive visualization of isosurfaces
//!
//! This crate turns [`IsoPipeline`](isoviz_filters::IsoPipeline) outputs into
//! an interactive window using wgpu, winit and egui:
//! - Surface layers colored through transfer functions
//! - Sliders for isovalue, gradient window and clip planes
//! - A scalar bar legend
//! - Orbit, pan and zoom camera controls

pub mod camera;
pub mod controls;
pub mod scalar_bar;
pub mod scene;
pub mod viewer;

pub use camera::*;
pub use controls::*;
pub use scalar_bar::*;
pub use scene::*;
pub use viewer::*;

use isoviz_core::Result;

/// Show a scene in an interactive window, blocking until it is closed
pub fn show(scene: SceneState, config: ViewerConfig) -> Result<()> {
    InteractiveViewer::new(scene, config).run()
}
