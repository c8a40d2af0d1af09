//! # quadmesh
//!
//! A quad-dominant remeshing engine.
//!
//! quadmesh takes an arbitrary polygonal surface mesh and turns it into a
//! quad-dominant mesh with controllable density, smoothness and topological
//! regularity. It is built from a connectivity-aware polygon store, curvature
//! estimation, local topological edits that keep the mesh valid, and
//! double-buffered geometric smoothing.
//!
//! ## Features
//!
//! - **Polygon mesh store**: triangles, quads and n-gons with O(1) adjacency queries
//!   and type-safe, never-reused handles
//! - **Topological edits**: edge subdivision, edge collapse, triangle-pair merging,
//!   decimation and Catmull-Clark subdivision
//! - **Remeshing pipelines**: adaptive, uniform, optimizing and quad remeshing with
//!   progress reporting and cooperative cancellation
//! - **Per-vertex density**: steer refinement with a density map
//!
//! ## Quick Start
//!
//! ```
//! use quadmesh::prelude::*;
//! use quadmesh::algo::remesh::{remesh_quad, QuadRemeshOptions};
//!
//! let mut mesh = quadmesh::mesh::primitives::uv_sphere(1.0, 16, 10).unwrap();
//! let report = remesh_quad(&mut mesh, &QuadRemeshOptions::new(2.0)).unwrap();
//!
//! println!("Faces: {} ({} quads)", mesh.num_faces(), mesh.num_quads());
//! println!("Split {} edges, merged {} pairs", report.split, report.merged);
//! assert!(mesh.is_valid());
//! ```
//!
//! ## Building Meshes Programmatically
//!
//! ```
//! use quadmesh::prelude::*;
//! use nalgebra::Point3;
//!
//! let vertices = vec![
//!     Point3::new(0.0, 0.0, 0.0),
//!     Point3::new(1.0, 0.0, 0.0),
//!     Point3::new(0.5, 1.0, 0.0),
//!     Point3::new(0.5, 0.5, 1.0),
//! ];
//!
//! let faces = vec![
//!     [0, 2, 1],  // bottom
//!     [0, 1, 3],  // front
//!     [1, 2, 3],  // right
//!     [2, 0, 3],  // left
//! ];
//!
//! let mesh: Mesh = build_from_triangles(&vertices, &faces).unwrap();
//! assert_eq!(mesh.num_vertices(), 4);
//! assert_eq!(mesh.num_faces(), 4);
//! ```
//!
//! ## Mesh Traversal
//!
//! ```
//! use quadmesh::prelude::*;
//! # let mesh = quadmesh::mesh::primitives::quad_cube().unwrap();
//! // Iterate over neighbors of a vertex
//! let v = VertexId::new(0);
//! for neighbor in mesh.vertex_neighbors(v) {
//!     println!("Neighbor: {:?}", neighbor);
//! }
//!
//! // Iterate over faces around a vertex
//! for face in mesh.vertex_faces(v) {
//!     println!("Adjacent face: {:?} with {} corners", face, mesh.face(face).len());
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod algo;
pub mod error;
pub mod mesh;

pub use error::{EngineError, Result};

/// Prelude module for convenient imports.
///
/// This module re-exports the most commonly used types and functions:
///
/// ```
/// use quadmesh::prelude::*;
/// ```
pub mod prelude {
    pub use crate::algo::{CancelToken, Progress, RemeshControl};
    pub use crate::error::{EngineError, Result};
    pub use crate::mesh::{
        build_from_polygons, build_from_quads, build_from_triangles, to_face_vertex, EdgeId,
        Face, FaceId, Mesh, Vertex, VertexId,
    };
}

// Re-export nalgebra types for convenience
pub use nalgebra;

#[cfg(test)]
mod tests {
    use super::prelude::*;
    use nalgebra::Point3;

    #[test]
    fn test_tetrahedron() {
        let vertices = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.5, 1.0, 0.0),
            Point3::new(0.5, 0.5, 1.0),
        ];

        let faces = vec![
            [0, 2, 1], // bottom
            [0, 1, 3], // front
            [1, 2, 3], // right
            [2, 0, 3], // left
        ];

        let mesh: Mesh = build_from_triangles(&vertices, &faces).unwrap();

        assert_eq!(mesh.num_vertices(), 4);
        assert_eq!(mesh.num_faces(), 4);
        assert_eq!(mesh.num_edges(), 6);
        assert!(mesh.is_valid());

        // Closed mesh: no boundary vertices
        for v in mesh.vertex_ids() {
            assert!(!mesh.is_boundary_vertex(v), "vertex {:?} should not be on boundary", v);
        }
    }

    #[test]
    fn test_mixed_polygons() {
        let vertices = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(1.0, 1.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
            Point3::new(2.0, 0.5, 0.0),
        ];
        let faces: Vec<Vec<usize>> = vec![vec![0, 1, 2, 3], vec![1, 4, 2]];
        let mesh = build_from_polygons(&vertices, &faces).unwrap();

        assert_eq!(mesh.num_quads(), 1);
        assert_eq!(mesh.num_triangles(), 1);
        assert!(mesh.is_valid());
    }
}
