//! Discrete per-vertex curvature.
//!
//! The estimate is the mean dihedral angle around a vertex: for every incident
//! edge shared by exactly two faces, take the angle between the two face normals,
//! sum, and divide by the vertex valence.
//!
//! Boundary and wire edges contribute nothing, and neither does an edge next to a
//! degenerate face. Vertices of valence below 2 get zero. Every value lies in
//! `[0, π]`.
//!
//! # Example
//!
//! ```
//! use quadmesh::algo::curvature::compute_curvature;
//! use quadmesh::mesh::{primitives, VertexId};
//!
//! let cube = primitives::quad_cube().unwrap();
//! let field = compute_curvature(&cube, true);
//! // Three right-angle creases meet at each corner.
//! let c = field.get(VertexId::new(0));
//! assert!((c - std::f64::consts::FRAC_PI_2).abs() < 1e-12);
//! ```

use nalgebra::Vector3;
use rayon::prelude::*;

use crate::mesh::{FaceId, Mesh, VertexId};

/// Curvature values indexed by vertex handle.
///
/// Dead vertex slots hold zero.
#[derive(Debug, Clone, Default)]
pub struct CurvatureField {
    values: Vec<f64>,
}

impl CurvatureField {
    /// Curvature at a vertex (zero for handles outside the field).
    #[inline]
    pub fn get(&self, v: VertexId) -> f64 {
        self.values.get(v.index()).copied().unwrap_or(0.0)
    }

    /// All values, one per vertex slot.
    #[inline]
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Number of vertex slots covered.
    #[inline]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Check if empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Largest value (zero for an empty field).
    pub fn max(&self) -> f64 {
        self.values.iter().copied().fold(0.0, f64::max)
    }

    /// Mean over the live vertices of `mesh`.
    pub fn mean(&self, mesh: &Mesh) -> f64 {
        if mesh.num_vertices() == 0 {
            return 0.0;
        }
        mesh.vertex_ids().map(|v| self.get(v)).sum::<f64>() / mesh.num_vertices() as f64
    }

    /// Mean of the two endpoint values of an edge.
    #[inline]
    pub fn edge_mean(&self, a: VertexId, b: VertexId) -> f64 {
        0.5 * (self.get(a) + self.get(b))
    }
}

/// Compute the dihedral-angle curvature of every live vertex.
///
/// Face normals and per-vertex sums run on rayon when `parallel` is set; the
/// result is the same either way.
pub fn compute_curvature(mesh: &Mesh, parallel: bool) -> CurvatureField {
    let face_normal = |i: usize| -> Option<Vector3<f64>> {
        let f = FaceId::new(i);
        if mesh.is_face_alive(f) {
            mesh.face_normal(f).ok()
        } else {
            None
        }
    };
    let normals: Vec<Option<Vector3<f64>>> = if parallel {
        (0..mesh.face_slots()).into_par_iter().map(face_normal).collect()
    } else {
        (0..mesh.face_slots()).map(face_normal).collect()
    };

    let vertex_value = |i: usize| -> f64 {
        let v = VertexId::new(i);
        if mesh.is_vertex_alive(v) {
            vertex_curvature(mesh, v, &normals)
        } else {
            0.0
        }
    };
    let values = if parallel {
        (0..mesh.vertex_slots()).into_par_iter().map(vertex_value).collect()
    } else {
        (0..mesh.vertex_slots()).map(vertex_value).collect()
    };

    CurvatureField { values }
}

fn vertex_curvature(mesh: &Mesh, v: VertexId, normals: &[Option<Vector3<f64>>]) -> f64 {
    let edges = mesh.vertex_edges(v);
    if edges.len() < 2 {
        return 0.0;
    }
    let total: f64 = edges
        .iter()
        .filter_map(|&e| match *mesh.edge_faces(e) {
            [f0, f1] => {
                let n0 = normals[f0.index()]?;
                let n1 = normals[f1.index()]?;
                Some(n0.dot(&n1).clamp(-1.0, 1.0).acos())
            }
            _ => None,
        })
        .sum();
    total / edges.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::primitives;
    use std::f64::consts::{FRAC_PI_2, PI};

    #[test]
    fn test_flat_grid_has_zero_curvature() {
        let mesh = primitives::triangle_grid(3, 1.0).unwrap();
        let field = compute_curvature(&mesh, true);
        for v in mesh.vertex_ids() {
            assert!(field.get(v).abs() < 1e-12);
        }
    }

    #[test]
    fn test_quad_cube_corners() {
        let mesh = primitives::quad_cube().unwrap();
        let field = compute_curvature(&mesh, false);
        for v in mesh.vertex_ids() {
            assert!((field.get(v) - FRAC_PI_2).abs() < 1e-12);
        }
        assert!((field.mean(&mesh) - FRAC_PI_2).abs() < 1e-12);
    }

    #[test]
    fn test_curvature_is_bounded() {
        for mesh in [
            primitives::tetrahedron().unwrap(),
            primitives::triangle_cube().unwrap(),
            primitives::uv_sphere(1.0, 6, 4).unwrap(),
        ] {
            let field = compute_curvature(&mesh, true);
            for v in mesh.vertex_ids() {
                let c = field.get(v);
                assert!((0.0..=PI).contains(&c), "curvature {} out of range", c);
            }
            assert!(field.max() <= PI);
        }
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let mesh = primitives::uv_sphere(1.0, 12, 8).unwrap();
        let a = compute_curvature(&mesh, true);
        let b = compute_curvature(&mesh, false);
        assert_eq!(a.values(), b.values());
    }

    #[test]
    fn test_low_valence_is_zero() {
        let mut mesh = primitives::quad_cube().unwrap();
        let lonely = mesh.add_vertex(nalgebra::Point3::new(3.0, 0.0, 0.0));
        let field = compute_curvature(&mesh, true);
        assert_eq!(field.get(lonely), 0.0);
        assert_eq!(field.len(), mesh.vertex_slots());
    }
}
