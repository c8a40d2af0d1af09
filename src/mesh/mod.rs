//! Core mesh data structures.
//!
//! This module provides the polygon mesh store and related types for
//! representing and editing quad-dominant surface meshes.
//!
//! # Overview
//!
//! The primary type is [`Mesh`], which keeps vertices, edges and faces in slot
//! arrays with the adjacency needed for constant-time local queries. Faces may
//! have any number of corners ≥ 3, so triangles, quads and larger polygons live
//! side by side.
//!
//! # Index Types
//!
//! Mesh elements are identified by type-safe index wrappers:
//! - [`VertexId`] - Identifies a vertex
//! - [`EdgeId`] - Identifies an undirected edge
//! - [`FaceId`] - Identifies a face
//!
//! Removing an element leaves a tombstone; ids are never reused, so a stale id
//! reports itself dead instead of naming a different element.
//!
//! # Construction
//!
//! Meshes are typically constructed from face-vertex lists or from
//! [`primitives`]:
//!
//! ```
//! use quadmesh::mesh::{build_from_quads, Mesh};
//! use nalgebra::Point3;
//!
//! let vertices = vec![
//!     Point3::new(0.0, 0.0, 0.0),
//!     Point3::new(1.0, 0.0, 0.0),
//!     Point3::new(1.0, 1.0, 0.0),
//!     Point3::new(0.0, 1.0, 0.0),
//! ];
//! let faces = vec![[0, 1, 2, 3]];
//!
//! let mesh: Mesh = build_from_quads(&vertices, &faces).unwrap();
//! assert!(mesh.is_quad_mesh());
//! ```

mod builder;
mod geometry;
mod index;
pub mod primitives;
mod store;

pub use builder::{build_from_polygons, build_from_quads, build_from_triangles, to_face_vertex};
pub use geometry::{mesh_bounds, Bounds, DEGENERATE_AREA};
pub use index::{EdgeId, FaceId, VertexId};
pub use store::{Edge, Face, Mesh, Vertex};
