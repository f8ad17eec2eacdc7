//! Gradient magnitude of a scalar volume

use isoviz_core::ImageVolume;
use rayon::prelude::*;

/// Compute `|∇f|` at every sample.
///
/// Interior samples use central differences, boundary samples one-sided
/// differences, both divided by the physical spacing.
pub fn gradient_magnitude(volume: &ImageVolume) -> ImageVolume {
    let [nx, ny, nz] = volume.dimensions;
    let layer = nx * ny;

    let mut output = ImageVolume::zeros(volume.dimensions, volume.origin, volume.spacing);
    if layer == 0 {
        return output;
    }

    output
        .values
        .par_chunks_mut(layer)
        .enumerate()
        .for_each(|(k, slice)| {
            for j in 0..ny {
                for i in 0..nx {
                    let [gx, gy, gz] = volume.gradient_at(i, j, k);
                    slice[i + nx * j] = (gx * gx + gy * gy + gz * gz).sqrt();
                }
            }
        });

    debug_assert_eq!(output.values.len(), nx * ny * nz);
    log::debug!("Gradient magnitude of {:?} volume", volume.dimensions);
    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use isoviz_core::Point3f;

    #[test]
    fn test_linear_field_has_constant_magnitude() {
        let volume = ImageVolume::from_fn([4, 5, 3], Point3f::new(1.0, 2.0, 3.0), [0.5, 2.0, 1.0], |p| {
            3.0 * p.x + 4.0 * p.z
        });
        let gradient = gradient_magnitude(&volume);

        assert_eq!(gradient.dimensions, volume.dimensions);
        assert_eq!(gradient.origin, volume.origin);
        for &g in &gradient.values {
            assert_relative_eq!(g, 5.0, epsilon = 1e-4);
        }
    }

    #[test]
    fn test_quadratic_field_interior() {
        let volume = ImageVolume::from_fn([5, 1, 1], Point3f::origin(), [1.0; 3], |p| p.x * p.x);
        let gradient = gradient_magnitude(&volume);
        // Central differences are exact for a quadratic in the interior
        assert_relative_eq!(gradient.value(2, 0, 0), 4.0);
        // One-sided at the ends
        assert_relative_eq!(gradient.value(0, 0, 0), 1.0);
        assert_relative_eq!(gradient.value(4, 0, 0), 7.0);
    }
}
