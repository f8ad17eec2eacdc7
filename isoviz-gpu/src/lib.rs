//! # isoviz GPU
//!
//! wgpu device management and rendering of isosurface meshes.
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use isoviz_gpu::{GpuMesh, MeshRenderConfig, MeshRenderer};
//! use isoviz_core::TriangleMesh;
//! use std::sync::Arc;
//!
//! async fn example(window: Arc<winit::window::Window>, mesh: &TriangleMesh) -> isoviz_core::Result<()> {
//!     let mut renderer = MeshRenderer::new(window, MeshRenderConfig::default()).await?;
//!     renderer.set_meshes(&[GpuMesh::from_triangle_mesh(mesh, |_| [1.0, 0.5, 0.0], 1.0)]);
//!     renderer.render()
//! }
//! ```

pub mod device;
pub mod mesh;

pub use device::GpuContext;
pub use mesh::*;
