//! # isoviz filters
//!
//! Geometry filters turning scalar volumes into clipped, scalar-colored
//! surfaces: marching-cubes contouring, probing a second volume onto a
//! surface, plane and scalar clipping, gradient magnitude, and the cached
//! [`IsoPipeline`] that chains them.

pub mod clip;
pub mod contour;
pub mod gradient;
pub mod pipeline;
pub mod probe;

// Re-export commonly used items
pub use clip::*;
pub use contour::*;
pub use gradient::*;
pub use pipeline::*;
pub use probe::*;
