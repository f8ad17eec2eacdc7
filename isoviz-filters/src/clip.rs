//! Clipping triangle meshes by implicit planes and by scalar value
//!
//! Both clips evaluate a signed function per vertex and keep the region where
//! it is `>= 0`. Triangles that straddle the boundary are cut along it; the
//! new vertices are interpolated from the edge end points and shared by the
//! triangles on both sides of the edge.

use isoviz_core::{lerp_normal, lerp_point, Error, Plane, Result, TriangleMesh};
use std::collections::HashMap;

/// Keep the part of `mesh` on the positive side of `plane`
pub fn clip_by_plane(mesh: &TriangleMesh, plane: &Plane) -> TriangleMesh {
    let distances: Vec<f32> = mesh.vertices.iter().map(|p| plane.evaluate(p)).collect();
    clip_by_values(mesh, &distances)
}

/// Keep the part of `mesh` whose scalars are `>= value`, or `<= value` when
/// `inside_out` is set.
///
/// Cut points get exactly `value` as their scalar.
pub fn clip_by_scalar(mesh: &TriangleMesh, value: f32, inside_out: bool) -> Result<TriangleMesh> {
    let scalars = mesh
        .scalars
        .as_ref()
        .ok_or_else(|| Error::Algorithm("scalar clip needs point scalars".to_string()))?;
    let distances: Vec<f32> = scalars
        .iter()
        .map(|&s| if inside_out { value - s } else { s - value })
        .collect();
    Ok(clip_by_values(mesh, &distances))
}

/// Clip against an arbitrary per-vertex signed function.
///
/// `values` must hold one entry per vertex; vertices with `values[i] >= 0`
/// are kept.
pub fn clip_by_values(mesh: &TriangleMesh, values: &[f32]) -> TriangleMesh {
    debug_assert_eq!(values.len(), mesh.vertices.len());
    let mut clipper = Clipper::new(mesh, values);

    for face in &mesh.faces {
        let inside = face.map(|i| values[i] >= 0.0);
        match inside.iter().filter(|&&k| k).count() {
            0 => {}
            3 => {
                let tri = face.map(|i| clipper.keep(i));
                clipper.output.faces.push(tri);
            }
            _ => clipper.cut(face, &inside),
        }
    }

    compact(clipper.output)
}

/// Drop vertices no face refers to
fn compact(mesh: TriangleMesh) -> TriangleMesh {
    let mut used = vec![false; mesh.vertices.len()];
    for &i in mesh.faces.iter().flatten() {
        used[i] = true;
    }
    if used.iter().all(|&u| u) {
        return mesh;
    }

    let mut remap = vec![usize::MAX; used.len()];
    let mut next = 0;
    for (i, _) in used.iter().enumerate().filter(|(_, u)| **u) {
        remap[i] = next;
        next += 1;
    }

    let pick = |i: &usize| used[*i];
    TriangleMesh {
        vertices: mesh
            .vertices
            .iter()
            .enumerate()
            .filter(|(i, _)| pick(i))
            .map(|(_, v)| *v)
            .collect(),
        faces: mesh.faces.iter().map(|f| f.map(|i| remap[i])).collect(),
        normals: mesh.normals.map(|n| {
            n.into_iter()
                .enumerate()
                .filter(|(i, _)| pick(i))
                .map(|(_, v)| v)
                .collect()
        }),
        scalars: mesh.scalars.map(|s| {
            s.into_iter()
                .enumerate()
                .filter(|(i, _)| pick(i))
                .map(|(_, v)| v)
                .collect()
        }),
    }
}

struct Clipper<'a> {
    mesh: &'a TriangleMesh,
    values: &'a [f32],
    output: TriangleMesh,
    kept: Vec<Option<usize>>,
    cut_points: HashMap<(usize, usize), usize>,
}

impl<'a> Clipper<'a> {
    fn new(mesh: &'a TriangleMesh, values: &'a [f32]) -> Self {
        let mut output = TriangleMesh::new();
        if mesh.normals.is_some() {
            output.normals = Some(Vec::new());
        }
        if mesh.scalars.is_some() {
            output.scalars = Some(Vec::new());
        }
        Self {
            mesh,
            values,
            output,
            kept: vec![None; mesh.vertices.len()],
            cut_points: HashMap::new(),
        }
    }

    /// Output index of an original vertex, copying it on first use
    fn keep(&mut self, index: usize) -> usize {
        if let Some(out) = self.kept[index] {
            return out;
        }
        let out = self.output.add_vertex(self.mesh.vertices[index]);
        if let (Some(dst), Some(src)) = (self.output.normals.as_mut(), self.mesh.normals.as_ref()) {
            dst.push(src[index]);
        }
        if let (Some(dst), Some(src)) = (self.output.scalars.as_mut(), self.mesh.scalars.as_ref()) {
            dst.push(src[index]);
        }
        self.kept[index] = Some(out);
        out
    }

    /// Output index of the boundary crossing on edge `(a, b)`
    fn cut_point(&mut self, a: usize, b: usize) -> usize {
        // Interpolate from the lower index so both neighbours get the same point
        let (lo, hi) = if a < b { (a, b) } else { (b, a) };
        if let Some(&out) = self.cut_points.get(&(lo, hi)) {
            return out;
        }

        let (d0, d1) = (self.values[lo], self.values[hi]);
        // A crossing exactly on an end point is that end point
        if d0 == 0.0 {
            return self.keep(lo);
        }
        if d1 == 0.0 {
            return self.keep(hi);
        }
        let t = if (d0 - d1).abs() > f32::EPSILON {
            (d0 / (d0 - d1)).clamp(0.0, 1.0)
        } else {
            0.5
        };

        let out = self.output.add_vertex(lerp_point(
            &self.mesh.vertices[lo],
            &self.mesh.vertices[hi],
            t,
        ));
        if let (Some(dst), Some(src)) = (self.output.normals.as_mut(), self.mesh.normals.as_ref()) {
            dst.push(lerp_normal(&src[lo], &src[hi], t));
        }
        if let (Some(dst), Some(src)) = (self.output.scalars.as_mut(), self.mesh.scalars.as_ref()) {
            dst.push(src[lo] + t * (src[hi] - src[lo]));
        }
        self.cut_points.insert((lo, hi), out);
        out
    }

    /// Clip one straddling triangle and fan-triangulate what remains
    fn cut(&mut self, face: &[usize; 3], inside: &[bool; 3]) {
        let mut polygon: Vec<usize> = Vec::with_capacity(4);
        let push = |polygon: &mut Vec<usize>, index: usize| {
            if polygon.last() != Some(&index) {
                polygon.push(index);
            }
        };
        for e in 0..3 {
            let (a, b) = (face[e], face[(e + 1) % 3]);
            if inside[e] {
                let kept = self.keep(a);
                push(&mut polygon, kept);
            }
            if inside[e] != inside[(e + 1) % 3] {
                let cut = self.cut_point(a, b);
                push(&mut polygon, cut);
            }
        }
        if polygon.len() > 1 && polygon.first() == polygon.last() {
            polygon.pop();
        }

        for k in 1..polygon.len().saturating_sub(1) {
            let tri = [polygon[0], polygon[k], polygon[k + 1]];
            if tri[0] != tri[1] && tri[1] != tri[2] && tri[0] != tri[2] {
                self.output.faces.push(tri);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use isoviz_core::{Point3f, Vector3f};

    /// Two triangles forming the unit square in z = 0, scalars = x
    fn square() -> TriangleMesh {
        let mut mesh = TriangleMesh::from_vertices_and_faces(
            vec![
                Point3f::new(0.0, 0.0, 0.0),
                Point3f::new(1.0, 0.0, 0.0),
                Point3f::new(1.0, 1.0, 0.0),
                Point3f::new(0.0, 1.0, 0.0),
            ],
            vec![[0, 1, 2], [0, 2, 3]],
        );
        mesh.set_scalars(vec![0.0, 1.0, 1.0, 0.0]);
        mesh.set_normals(vec![Vector3f::z(); 4]);
        mesh
    }

    fn area(mesh: &TriangleMesh) -> f32 {
        mesh.faces
            .iter()
            .map(|f| {
                let (a, b, c) = (mesh.vertices[f[0]], mesh.vertices[f[1]], mesh.vertices[f[2]]);
                (b - a).cross(&(c - a)).norm() * 0.5
            })
            .sum()
    }

    #[test]
    fn test_plane_clip_keeps_positive_side() {
        let plane = Plane::new(Point3f::new(0.25, 0.0, 0.0), Vector3f::x());
        let clipped = clip_by_plane(&square(), &plane);

        assert_relative_eq!(area(&clipped), 0.75, epsilon = 1e-5);
        assert!(clipped.vertices.iter().all(|p| p.x >= 0.25 - 1e-6));
        assert_eq!(clipped.normals.as_ref().unwrap().len(), clipped.vertex_count());
        assert!(clipped.faces.iter().flatten().all(|&i| i < clipped.vertex_count()));
    }

    #[test]
    fn test_cut_points_are_shared() {
        let plane = Plane::new(Point3f::new(0.5, 0.0, 0.0), Vector3f::x());
        let clipped = clip_by_plane(&square(), &plane);
        // Kept: (1,0) and (1,1); cut: bottom edge, diagonal, top edge
        assert_eq!(clipped.vertex_count(), 5);
    }

    #[test]
    fn test_plane_clip_all_or_nothing() {
        let keep_all = Plane::new(Point3f::new(-1.0, 0.0, 0.0), Vector3f::x());
        assert_eq!(clip_by_plane(&square(), &keep_all), square());

        let drop_all = Plane::new(Point3f::new(2.0, 0.0, 0.0), Vector3f::x());
        let empty = clip_by_plane(&square(), &drop_all);
        assert!(empty.is_empty());
        assert_eq!(empty.vertex_count(), 0);
    }

    #[test]
    fn test_scalar_clip_bounds() {
        let above = clip_by_scalar(&square(), 0.4, false).unwrap();
        let scalars = above.scalars.as_ref().unwrap();
        assert!(scalars.iter().all(|&s| s >= 0.4 - 1e-6));
        assert_relative_eq!(area(&above), 0.6, epsilon = 1e-5);

        let below = clip_by_scalar(&square(), 0.4, true).unwrap();
        assert!(below.scalars.as_ref().unwrap().iter().all(|&s| s <= 0.4 + 1e-6));
        assert_relative_eq!(area(&below), 0.4, epsilon = 1e-5);
    }

    #[test]
    fn test_scalar_clip_needs_scalars() {
        let mut mesh = square();
        mesh.scalars = None;
        assert!(clip_by_scalar(&mesh, 0.5, false).is_err());
    }

    #[test]
    fn test_cut_point_scalar_is_clip_value() {
        let clipped = clip_by_scalar(&square(), 0.3, false).unwrap();
        let min = clipped.scalar_range().unwrap().0;
        assert_relative_eq!(min, 0.3, epsilon = 1e-6);
    }
}
