//! Clip planes

use crate::{Point3f, Vector3f};
use serde::{Deserialize, Serialize};

/// An implicit plane. Points with `normal · (p - origin) >= 0` lie on the
/// kept side.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Plane {
    pub origin: Point3f,
    pub normal: Vector3f,
}

impl Plane {
    pub fn new(origin: Point3f, normal: Vector3f) -> Self {
        Self { origin, normal }
    }

    /// Signed plane function at `p` (not divided by the normal length)
    #[inline]
    pub fn evaluate(&self, p: &Point3f) -> f32 {
        self.normal.dot(&(p - self.origin))
    }

    /// Check if `p` is on the kept side
    #[inline]
    pub fn keeps(&self, p: &Point3f) -> bool {
        self.evaluate(p) >= 0.0
    }
}

/// Which axis a clip offset belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    pub const ALL: [Axis; 3] = [Axis::X, Axis::Y, Axis::Z];

    pub fn index(self) -> usize {
        match self {
            Axis::X => 0,
            Axis::Y => 1,
            Axis::Z => 2,
        }
    }

    pub fn unit(self) -> Vector3f {
        match self {
            Axis::X => Vector3f::x(),
            Axis::Y => Vector3f::y(),
            Axis::Z => Vector3f::z(),
        }
    }
}

/// Three axis-aligned clip offsets. Each offset `c` removes everything with
/// a coordinate below `c` on its axis.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct AxisClipPlanes {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl AxisClipPlanes {
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    pub fn get(&self, axis: Axis) -> f32 {
        match axis {
            Axis::X => self.x,
            Axis::Y => self.y,
            Axis::Z => self.z,
        }
    }

    pub fn set(&mut self, axis: Axis, offset: f32) {
        match axis {
            Axis::X => self.x = offset,
            Axis::Y => self.y = offset,
            Axis::Z => self.z = offset,
        }
    }

    /// Plane for a single axis, origin on that axis at the offset
    pub fn plane(&self, axis: Axis) -> Plane {
        let mut origin = Point3f::origin();
        origin[axis.index()] = self.get(axis);
        Plane::new(origin, axis.unit())
    }

    /// The x, y and z planes in clip order
    pub fn planes(&self) -> [Plane; 3] {
        [self.plane(Axis::X), self.plane(Axis::Y), self.plane(Axis::Z)]
    }

    /// Check if `p` survives all three planes
    pub fn keeps(&self, p: &Point3f) -> bool {
        p.x >= self.x && p.y >= self.y && p.z >= self.z
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plane_keeps_positive_side() {
        let plane = Plane::new(Point3f::new(1.0, 0.0, 0.0), Vector3f::x());
        assert!(plane.keeps(&Point3f::new(1.0, 5.0, 5.0)));
        assert!(plane.keeps(&Point3f::new(2.0, 0.0, 0.0)));
        assert!(!plane.keeps(&Point3f::new(0.5, 0.0, 0.0)));
    }

    #[test]
    fn test_axis_planes() {
        let clip = AxisClipPlanes::new(1.0, 2.0, 3.0);
        let [px, py, pz] = clip.planes();
        assert_eq!(px.origin, Point3f::new(1.0, 0.0, 0.0));
        assert_eq!(py.origin, Point3f::new(0.0, 2.0, 0.0));
        assert_eq!(pz.origin, Point3f::new(0.0, 0.0, 3.0));
        assert_eq!(pz.normal, Vector3f::z());

        let p = Point3f::new(1.5, 2.5, 2.9);
        assert_eq!(clip.keeps(&p), clip.planes().iter().all(|pl| pl.keeps(&p)));
        assert!(!clip.keeps(&p));
    }

    #[test]
    fn test_set_by_axis() {
        let mut clip = AxisClipPlanes::default();
        clip.set(Axis::Y, 4.0);
        assert_eq!(clip.get(Axis::Y), 4.0);
        assert_eq!(clip.x, 0.0);
    }
}
