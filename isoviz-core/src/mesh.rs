//! Mesh data structures and functionality

use crate::point::*;
use serde::{Deserialize, Serialize};

/// A triangle mesh with optional per-vertex normals and scalars.
///
/// Scalars play the role of the "active point scalars" of a polygonal
/// dataset: contouring fills them with the contour value, probing replaces
/// them with resampled values, and both scalar clipping and color mapping
/// read them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TriangleMesh {
    pub vertices: Vec<Point3f>,
    pub faces: Vec<[usize; 3]>,
    pub normals: Option<Vec<Vector3f>>,
    pub scalars: Option<Vec<f32>>,
}

impl TriangleMesh {
    /// Create a new empty mesh
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a mesh from vertices and faces
    pub fn from_vertices_and_faces(vertices: Vec<Point3f>, faces: Vec<[usize; 3]>) -> Self {
        Self {
            vertices,
            faces,
            normals: None,
            scalars: None,
        }
    }

    /// Get the number of vertices
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// Get the number of faces
    pub fn face_count(&self) -> usize {
        self.faces.len()
    }

    /// Check if the mesh is empty
    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty() || self.faces.is_empty()
    }

    /// Add a vertex to the mesh
    pub fn add_vertex(&mut self, vertex: Point3f) -> usize {
        let index = self.vertices.len();
        self.vertices.push(vertex);
        index
    }

    /// Add a face to the mesh
    pub fn add_face(&mut self, face: [usize; 3]) {
        self.faces.push(face);
    }

    /// Calculate face normals
    pub fn calculate_face_normals(&self) -> Vec<Vector3f> {
        self.faces
            .iter()
            .map(|face| {
                let v0 = self.vertices[face[0]];
                let v1 = self.vertices[face[1]];
                let v2 = self.vertices[face[2]];

                let edge1 = v1 - v0;
                let edge2 = v2 - v0;

                edge1.cross(&edge2).try_normalize(1e-12).unwrap_or_else(Vector3f::z)
            })
            .collect()
    }

    /// Set vertex normals; ignored when the length does not match
    pub fn set_normals(&mut self, normals: Vec<Vector3f>) {
        if normals.len() == self.vertices.len() {
            self.normals = Some(normals);
        }
    }

    /// Set vertex scalars; ignored when the length does not match
    pub fn set_scalars(&mut self, scalars: Vec<f32>) {
        if scalars.len() == self.vertices.len() {
            self.scalars = Some(scalars);
        }
    }

    /// Scalar value of a vertex, if the mesh carries scalars
    pub fn scalar(&self, index: usize) -> Option<f32> {
        self.scalars.as_ref().and_then(|s| s.get(index).copied())
    }

    /// Min and max of the vertex scalars
    pub fn scalar_range(&self) -> Option<(f32, f32)> {
        let scalars = self.scalars.as_ref()?;
        let mut iter = scalars.iter().copied();
        let first = iter.next()?;
        Some(iter.fold((first, first), |(lo, hi), s| (lo.min(s), hi.max(s))))
    }

    /// Append another mesh, offsetting its face indices.
    ///
    /// Attributes survive only when both meshes carry them (an empty `self`
    /// adopts the attributes of `other`).
    pub fn append(&mut self, other: TriangleMesh) {
        if self.vertices.is_empty() {
            *self = other;
            return;
        }

        let offset = self.vertices.len();
        self.normals = match (self.normals.take(), other.normals) {
            (Some(mut a), Some(b)) => {
                a.extend(b);
                Some(a)
            }
            _ => None,
        };
        self.scalars = match (self.scalars.take(), other.scalars) {
            (Some(mut a), Some(b)) => {
                a.extend(b);
                Some(a)
            }
            _ => None,
        };
        self.vertices.extend(other.vertices);
        self.faces.extend(
            other
                .faces
                .into_iter()
                .map(|[a, b, c]| [a + offset, b + offset, c + offset]),
        );
    }

    /// Clear the mesh
    pub fn clear(&mut self) {
        self.vertices.clear();
        self.faces.clear();
        self.normals = None;
        self.scalars = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn triangle(offset: f32, scalar: f32) -> TriangleMesh {
        let mut mesh = TriangleMesh::from_vertices_and_faces(
            vec![
                Point3f::new(offset, 0.0, 0.0),
                Point3f::new(offset + 1.0, 0.0, 0.0),
                Point3f::new(offset, 1.0, 0.0),
            ],
            vec![[0, 1, 2]],
        );
        mesh.set_scalars(vec![scalar; 3]);
        mesh
    }

    #[test]
    fn test_append_offsets_faces() {
        let mut mesh = triangle(0.0, 1.0);
        mesh.append(triangle(5.0, 2.0));

        assert_eq!(mesh.vertex_count(), 6);
        assert_eq!(mesh.faces[1], [3, 4, 5]);
        assert_eq!(mesh.scalar_range(), Some((1.0, 2.0)));
    }

    #[test]
    fn test_append_drops_mismatched_attributes() {
        let mut mesh = triangle(0.0, 1.0);
        let mut other = triangle(1.0, 1.0);
        other.scalars = None;
        mesh.append(other);
        assert!(mesh.scalars.is_none());
    }

    #[test]
    fn test_set_scalars_length_mismatch_ignored() {
        let mut mesh = triangle(0.0, 1.0);
        mesh.set_scalars(vec![0.0]);
        assert_eq!(mesh.scalar(0), Some(1.0));
    }

    #[test]
    fn test_face_normal_points_along_z() {
        let mesh = triangle(0.0, 0.0);
        let normals = mesh.calculate_face_normals();
        assert_eq!(normals[0], Vector3f::new(0.0, 0.0, 1.0));
    }
}
