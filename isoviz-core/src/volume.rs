//! Rectilinear scalar volumes (image data)

use crate::{Error, Point3f, Result};
use serde::{Deserialize, Serialize};

/// A scalar field sampled on a regular 3D lattice.
///
/// Samples are stored with x varying fastest, then y, then z. The `origin`
/// is the world position of sample `(0, 0, 0)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageVolume {
    /// Number of samples along x, y and z
    pub dimensions: [usize; 3],
    /// World position of the first sample
    pub origin: Point3f,
    /// Distance between neighbouring samples along each axis
    pub spacing: [f32; 3],
    /// Sample values, `dimensions[0] * dimensions[1] * dimensions[2]` long
    pub values: Vec<f32>,
}

impl ImageVolume {
    /// Create a volume from raw samples, validating the sample count
    pub fn new(
        dimensions: [usize; 3],
        origin: Point3f,
        spacing: [f32; 3],
        values: Vec<f32>,
    ) -> Result<Self> {
        let expected = dimensions.iter().product::<usize>();
        if values.len() != expected {
            return Err(Error::InvalidData(format!(
                "Volume {:?} needs {} samples, got {}",
                dimensions,
                expected,
                values.len()
            )));
        }
        if spacing.iter().any(|s| !s.is_finite() || *s == 0.0) {
            return Err(Error::InvalidData(format!(
                "Volume spacing must be finite and non-zero, got {:?}",
                spacing
            )));
        }

        Ok(Self {
            dimensions,
            origin,
            spacing,
            values,
        })
    }

    /// Create a volume filled with zeros
    pub fn zeros(dimensions: [usize; 3], origin: Point3f, spacing: [f32; 3]) -> Self {
        Self {
            dimensions,
            origin,
            spacing,
            values: vec![0.0; dimensions.iter().product()],
        }
    }

    /// Build a volume by evaluating `f` at every sample position
    pub fn from_fn<F>(dimensions: [usize; 3], origin: Point3f, spacing: [f32; 3], f: F) -> Self
    where
        F: Fn(Point3f) -> f32,
    {
        let mut volume = Self::zeros(dimensions, origin, spacing);
        for k in 0..dimensions[2] {
            for j in 0..dimensions[1] {
                for i in 0..dimensions[0] {
                    let index = volume.index(i, j, k);
                    volume.values[index] = f(volume.point(i, j, k));
                }
            }
        }
        volume
    }

    /// Total number of samples
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Check if the volume holds no samples
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Flat index of sample `(i, j, k)`
    #[inline]
    pub fn index(&self, i: usize, j: usize, k: usize) -> usize {
        i + self.dimensions[0] * (j + self.dimensions[1] * k)
    }

    /// Sample value at lattice coordinates (with bounds checking)
    pub fn get_value(&self, i: usize, j: usize, k: usize) -> Option<f32> {
        if i < self.dimensions[0] && j < self.dimensions[1] && k < self.dimensions[2] {
            Some(self.values[self.index(i, j, k)])
        } else {
            None
        }
    }

    /// Sample value at lattice coordinates; panics when out of range
    #[inline]
    pub fn value(&self, i: usize, j: usize, k: usize) -> f32 {
        self.values[self.index(i, j, k)]
    }

    /// World position of sample `(i, j, k)`
    #[inline]
    pub fn point(&self, i: usize, j: usize, k: usize) -> Point3f {
        Point3f::new(
            self.origin.x + i as f32 * self.spacing[0],
            self.origin.y + j as f32 * self.spacing[1],
            self.origin.z + k as f32 * self.spacing[2],
        )
    }

    /// Min and max sample value, `(0, 0)` for an empty volume.
    ///
    /// NaN samples are ignored.
    pub fn scalar_range(&self) -> (f32, f32) {
        let mut range: Option<(f32, f32)> = None;
        for &v in self.values.iter().filter(|v| !v.is_nan()) {
            range = Some(match range {
                Some((lo, hi)) => (lo.min(v), hi.max(v)),
                None => (v, v),
            });
        }
        range.unwrap_or((0.0, 0.0))
    }

    /// Axis-aligned world bounds `(min, max)` of the lattice
    pub fn bounds(&self) -> (Point3f, Point3f) {
        let last = [
            self.dimensions[0].saturating_sub(1),
            self.dimensions[1].saturating_sub(1),
            self.dimensions[2].saturating_sub(1),
        ];
        let a = self.origin;
        let b = self.point(last[0], last[1], last[2]);
        (
            Point3f::new(a.x.min(b.x), a.y.min(b.y), a.z.min(b.z)),
            Point3f::new(a.x.max(b.x), a.y.max(b.y), a.z.max(b.z)),
        )
    }

    /// Continuous lattice coordinates of a world position
    #[inline]
    pub fn world_to_lattice(&self, position: &Point3f) -> [f32; 3] {
        [
            (position.x - self.origin.x) / self.spacing[0],
            (position.y - self.origin.y) / self.spacing[1],
            (position.z - self.origin.z) / self.spacing[2],
        ]
    }

    /// Trilinearly interpolated value at a world position.
    ///
    /// Returns `None` outside the lattice. Positions within a small tolerance
    /// of the boundary are clamped onto it so that surface points produced
    /// on the outermost cells still sample.
    pub fn sample(&self, position: &Point3f) -> Option<f32> {
        const TOLERANCE: f32 = 1e-4;

        let lattice = self.world_to_lattice(position);
        let mut base = [0usize; 3];
        let mut frac = [0.0f32; 3];

        for axis in 0..3 {
            let n = self.dimensions[axis];
            if n == 0 {
                return None;
            }
            let upper = (n - 1) as f32;
            let g = lattice[axis];
            if !g.is_finite() || g < -TOLERANCE || g > upper + TOLERANCE {
                return None;
            }
            let g = g.clamp(0.0, upper);
            if n == 1 {
                base[axis] = 0;
                frac[axis] = 0.0;
                continue;
            }
            let cell = (g.floor() as usize).min(n - 2);
            base[axis] = cell;
            frac[axis] = g - cell as f32;
        }

        let step = |axis: usize| usize::from(self.dimensions[axis] > 1);
        let (x0, y0, z0) = (base[0], base[1], base[2]);
        let (x1, y1, z1) = (x0 + step(0), y0 + step(1), z0 + step(2));
        let (fx, fy, fz) = (frac[0], frac[1], frac[2]);

        let v000 = self.value(x0, y0, z0);
        let v100 = self.value(x1, y0, z0);
        let v010 = self.value(x0, y1, z0);
        let v110 = self.value(x1, y1, z0);
        let v001 = self.value(x0, y0, z1);
        let v101 = self.value(x1, y0, z1);
        let v011 = self.value(x0, y1, z1);
        let v111 = self.value(x1, y1, z1);

        let v00 = v000 * (1.0 - fx) + v100 * fx;
        let v10 = v010 * (1.0 - fx) + v110 * fx;
        let v01 = v001 * (1.0 - fx) + v101 * fx;
        let v11 = v011 * (1.0 - fx) + v111 * fx;

        let v0 = v00 * (1.0 - fy) + v10 * fy;
        let v1 = v01 * (1.0 - fy) + v11 * fy;

        Some(v0 * (1.0 - fz) + v1 * fz)
    }

    /// Central-difference gradient at a lattice sample.
    ///
    /// One-sided differences are used on the boundary; axes with a single
    /// sample contribute zero.
    pub fn gradient_at(&self, i: usize, j: usize, k: usize) -> [f32; 3] {
        let idx = [i, j, k];
        let mut gradient = [0.0f32; 3];
        for axis in 0..3 {
            let n = self.dimensions[axis];
            if n < 2 {
                continue;
            }
            let at = |offset: usize| {
                let mut c = idx;
                c[axis] = offset;
                self.value(c[0], c[1], c[2])
            };
            let c = idx[axis];
            let (lo, hi) = (c.saturating_sub(1), (c + 1).min(n - 1));
            let span = (hi - lo) as f32 * self.spacing[axis];
            gradient[axis] = (at(hi) - at(lo)) / span;
        }
        gradient
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn linear_volume() -> ImageVolume {
        ImageVolume::from_fn([4, 3, 5], Point3f::new(1.0, -1.0, 0.5), [0.5, 1.0, 2.0], |p| {
            2.0 * p.x - p.y + 0.5 * p.z
        })
    }

    #[test]
    fn test_new_rejects_wrong_length() {
        let result = ImageVolume::new([2, 2, 2], Point3f::origin(), [1.0; 3], vec![0.0; 7]);
        assert!(result.is_err());
    }

    #[test]
    fn test_new_rejects_zero_spacing() {
        let result = ImageVolume::new([1, 1, 1], Point3f::origin(), [1.0, 0.0, 1.0], vec![0.0]);
        assert!(result.is_err());
    }

    #[test]
    fn test_index_is_x_fastest() {
        let volume = ImageVolume::zeros([3, 4, 5], Point3f::origin(), [1.0; 3]);
        assert_eq!(volume.index(1, 0, 0), 1);
        assert_eq!(volume.index(0, 1, 0), 3);
        assert_eq!(volume.index(0, 0, 1), 12);
    }

    #[test]
    fn test_bounds_and_range() {
        let volume = linear_volume();
        let (min, max) = volume.bounds();
        assert_relative_eq!(min, Point3f::new(1.0, -1.0, 0.5));
        assert_relative_eq!(max, Point3f::new(2.5, 1.0, 8.5));

        let (lo, hi) = volume.scalar_range();
        assert_relative_eq!(lo, 2.0 * 1.0 - 1.0 + 0.25);
        assert_relative_eq!(hi, 2.0 * 2.5 + 1.0 + 4.25);
    }

    #[test]
    fn test_sample_reproduces_linear_field() {
        let volume = linear_volume();
        let p = Point3f::new(1.7, 0.2, 3.3);
        let expected = 2.0 * p.x - p.y + 0.5 * p.z;
        assert_relative_eq!(volume.sample(&p).unwrap(), expected, epsilon = 1e-4);

        let (_, max) = volume.bounds();
        let at_max = 2.0 * max.x - max.y + 0.5 * max.z;
        assert_relative_eq!(volume.sample(&max).unwrap(), at_max, epsilon = 1e-4);
    }

    #[test]
    fn test_sample_outside_is_none() {
        let volume = linear_volume();
        assert!(volume.sample(&Point3f::new(0.0, 0.0, 1.0)).is_none());
        assert!(volume.sample(&Point3f::new(1.5, 0.0, 9.0)).is_none());
    }

    #[test]
    fn test_gradient_of_linear_field() {
        let volume = linear_volume();
        for &(i, j, k) in &[(0, 0, 0), (1, 1, 2), (3, 2, 4)] {
            let g = volume.gradient_at(i, j, k);
            assert_relative_eq!(g[0], 2.0, epsilon = 1e-4);
            assert_relative_eq!(g[1], -1.0, epsilon = 1e-4);
            assert_relative_eq!(g[2], 0.5, epsilon = 1e-4);
        }
    }

    #[test]
    fn test_scalar_range_ignores_nan() {
        let volume =
            ImageVolume::new([3, 1, 1], Point3f::origin(), [1.0; 3], vec![f32::NAN, 2.0, -1.0])
                .unwrap();
        assert_eq!(volume.scalar_range(), (-1.0, 2.0));
    }
}
