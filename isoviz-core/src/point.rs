//! Point types and related functionality

use nalgebra::{Point3, Vector3};

/// A 3D point with floating point coordinates
pub type Point3f = Point3<f32>;

/// A 3D vector with floating point components
pub type Vector3f = Vector3<f32>;

/// Linear interpolation between two points
pub fn lerp_point(a: &Point3f, b: &Point3f, t: f32) -> Point3f {
    Point3f::new(
        a.x + t * (b.x - a.x),
        a.y + t * (b.y - a.y),
        a.z + t * (b.z - a.z),
    )
}

/// Linear interpolation between two normals, renormalized.
///
/// Falls back to `a` when the blend degenerates to zero length.
pub fn lerp_normal(a: &Vector3f, b: &Vector3f, t: f32) -> Vector3f {
    let blended = a + (b - a) * t;
    let norm = blended.norm();
    if norm > 1e-12 {
        blended / norm
    } else {
        *a
    }
}
