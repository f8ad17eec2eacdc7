//! Core traits for isoviz

use crate::{mesh::*, point::*, volume::*};

/// Trait for drawable/renderable objects
pub trait Drawable {
    /// Get the bounding box of the object
    fn bounding_box(&self) -> (Point3f, Point3f);

    /// Get the center point of the object
    fn center(&self) -> Point3f {
        let (min, max) = self.bounding_box();
        Point3f::from((min.coords + max.coords) * 0.5)
    }
}

/// A scalar field that can be evaluated at arbitrary world positions
pub trait ScalarField {
    /// Field value at `position`, `None` outside the field's domain
    fn sample_at(&self, position: &Point3f) -> Option<f32>;

    /// Min and max of the field's values
    fn value_range(&self) -> (f32, f32);
}

impl Drawable for TriangleMesh {
    fn bounding_box(&self) -> (Point3f, Point3f) {
        let mut iter = self.vertices.iter();
        let first = match iter.next() {
            Some(p) => *p,
            None => return (Point3f::origin(), Point3f::origin()),
        };

        iter.fold((first, first), |(mut min, mut max), p| {
            min.x = min.x.min(p.x);
            min.y = min.y.min(p.y);
            min.z = min.z.min(p.z);

            max.x = max.x.max(p.x);
            max.y = max.y.max(p.y);
            max.z = max.z.max(p.z);
            (min, max)
        })
    }
}

impl Drawable for ImageVolume {
    fn bounding_box(&self) -> (Point3f, Point3f) {
        self.bounds()
    }
}

impl ScalarField for ImageVolume {
    fn sample_at(&self, position: &Point3f) -> Option<f32> {
        self.sample(position)
    }

    fn value_range(&self) -> (f32, f32) {
        self.scalar_range()
    }
}
