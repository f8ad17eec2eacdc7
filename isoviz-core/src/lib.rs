//! Core data structures for isoviz
//!
//! This crate provides the fundamental types shared by the loaders, the
//! geometry filters and the viewer: scalar volumes, triangle meshes carrying
//! per-vertex scalars, clip planes, the gradient clip range and color
//! transfer functions.

pub mod point;
pub mod mesh;
pub mod volume;
pub mod plane;
pub mod range;
pub mod color;
pub mod traits;
pub mod error;

pub use point::*;
pub use mesh::*;
pub use volume::*;
pub use plane::*;
pub use range::*;
pub use color::*;
pub use traits::*;
pub use error::*;

/// Re-export commonly used types from nalgebra
pub use nalgebra::{Point3, Vector3, Matrix4};
