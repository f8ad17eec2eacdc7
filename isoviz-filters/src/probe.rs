//! Resampling a scalar field onto surface points

use isoviz_core::{ScalarField, TriangleMesh};
use rayon::prelude::*;

/// Replace the vertex scalars of `mesh` with values of `source` sampled at
/// each vertex. Vertices outside the source get `0`.
///
/// Geometry, connectivity and normals are passed through unchanged.
pub fn probe<F>(mesh: &TriangleMesh, source: &F) -> TriangleMesh
where
    F: ScalarField + Sync + ?Sized,
{
    let samples: Vec<Option<f32>> = mesh
        .vertices
        .par_iter()
        .map(|p| source.sample_at(p))
        .collect();

    let outside = samples.iter().filter(|s| s.is_none()).count();
    if outside > 0 {
        log::debug!("Probe: {} of {} points outside the source", outside, samples.len());
    }

    let mut result = mesh.clone();
    result.scalars = Some(samples.into_iter().map(|s| s.unwrap_or(0.0)).collect());
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use isoviz_core::{ImageVolume, Point3f};

    #[test]
    fn test_probe_linear_field_and_outside_points() {
        let source = ImageVolume::from_fn([5, 5, 5], Point3f::origin(), [0.5; 3], |p| {
            3.0 * p.x + p.y - 2.0 * p.z + 1.0
        });
        let mut mesh = TriangleMesh::from_vertices_and_faces(
            vec![
                Point3f::new(0.3, 1.1, 0.7),
                Point3f::new(2.0, 2.0, 2.0),
                Point3f::new(2.5, 0.0, 0.0),
            ],
            vec![[0, 1, 2]],
        );
        mesh.set_scalars(vec![9.0; 3]);

        let probed = probe(&mesh, &source);
        let scalars = probed.scalars.as_ref().unwrap();
        assert_relative_eq!(scalars[0], 3.0 * 0.3 + 1.1 - 1.4 + 1.0, epsilon = 1e-4);
        assert_relative_eq!(scalars[1], 6.0 + 2.0 - 4.0 + 1.0, epsilon = 1e-4);
        assert_eq!(scalars[2], 0.0);
        assert_eq!(probed.vertices, mesh.vertices);
        assert_eq!(probed.faces, mesh.faces);
    }

    #[test]
    fn test_probe_empty_mesh() {
        let source = ImageVolume::zeros([2, 2, 2], Point3f::origin(), [1.0; 3]);
        let probed = probe(&TriangleMesh::new(), &source);
        assert_eq!(probed.scalars, Some(Vec::new()));
    }
}
