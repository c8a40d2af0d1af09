//! Mesh construction utilities.
//!
//! This module converts between [`Mesh`] and the plain face-vertex lists a host
//! application hands over: a position array plus faces given as index lists.

use nalgebra::Point3;

use super::index::VertexId;
use super::store::Mesh;
use crate::error::{EngineError, Result};

/// Build a mesh from vertices and polygon faces of any size (≥ 3).
///
/// # Arguments
/// * `vertices` - List of vertex positions
/// * `faces` - List of faces, each an ordered list of vertex indices
///
/// # Returns
/// A mesh, or an error if the input is empty, references missing vertices,
/// repeats a vertex within a face, or would give an edge more than two faces.
///
/// # Example
/// ```
/// use quadmesh::mesh::build_from_polygons;
/// use nalgebra::Point3;
///
/// let vertices = vec![
///     Point3::new(0.0, 0.0, 0.0),
///     Point3::new(1.0, 0.0, 0.0),
///     Point3::new(1.0, 1.0, 0.0),
///     Point3::new(0.0, 1.0, 0.0),
///     Point3::new(0.5, 1.5, 0.0),
/// ];
/// let faces = vec![vec![0, 1, 2, 3], vec![3, 2, 4]];
///
/// let mesh = build_from_polygons(&vertices, &faces).unwrap();
/// assert_eq!(mesh.num_faces(), 2);
/// assert_eq!(mesh.num_edges(), 6);
/// ```
pub fn build_from_polygons<F: AsRef<[usize]>>(
    vertices: &[Point3<f64>],
    faces: &[F],
) -> Result<Mesh> {
    if vertices.is_empty() || faces.is_empty() {
        return Err(EngineError::EmptyMesh);
    }

    // Validate indices up front so the error names the input face.
    for (fi, face) in faces.iter().enumerate() {
        let face = face.as_ref();
        if face.len() < 3 {
            return Err(EngineError::InvalidMesh(format!(
                "face {} has {} vertices (need at least 3)",
                fi,
                face.len()
            )));
        }
        for (i, &vi) in face.iter().enumerate() {
            if vi >= vertices.len() {
                return Err(EngineError::InvalidMesh(format!(
                    "face {} references invalid vertex index {}",
                    fi, vi
                )));
            }
            if face[..i].contains(&vi) {
                return Err(EngineError::InvalidMesh(format!(
                    "face {} is degenerate (repeats vertex {})",
                    fi, vi
                )));
            }
        }
    }

    let mut mesh = Mesh::with_capacity(vertices.len(), faces.len());
    let ids: Vec<VertexId> = vertices.iter().map(|&p| mesh.add_vertex(p)).collect();

    let mut cycle = Vec::new();
    for (fi, face) in faces.iter().enumerate() {
        cycle.clear();
        cycle.extend(face.as_ref().iter().map(|&vi| ids[vi]));
        mesh.add_face(&cycle).map_err(|e| {
            EngineError::InvalidMesh(format!("face {} is non-manifold: {}", fi, e))
        })?;
    }

    Ok(mesh)
}

/// Build a mesh from vertices and triangle faces.
///
/// # Example
/// ```
/// use quadmesh::mesh::build_from_triangles;
/// use nalgebra::Point3;
///
/// let vertices = vec![
///     Point3::new(0.0, 0.0, 0.0),
///     Point3::new(1.0, 0.0, 0.0),
///     Point3::new(0.5, 1.0, 0.0),
/// ];
/// let mesh = build_from_triangles(&vertices, &[[0, 1, 2]]).unwrap();
/// assert_eq!(mesh.num_vertices(), 3);
/// assert_eq!(mesh.num_faces(), 1);
/// ```
pub fn build_from_triangles(vertices: &[Point3<f64>], faces: &[[usize; 3]]) -> Result<Mesh> {
    build_from_polygons(vertices, faces)
}

/// Build a mesh from vertices and quad faces (counter-clockwise).
pub fn build_from_quads(vertices: &[Point3<f64>], faces: &[[usize; 4]]) -> Result<Mesh> {
    build_from_polygons(vertices, faces)
}

/// Convert a mesh back to a dense face-vertex representation.
///
/// Returns `(vertices, faces)`. Removed elements are skipped and the remaining
/// vertices renumbered in handle order; isolated vertices are kept.
pub fn to_face_vertex(mesh: &Mesh) -> (Vec<Point3<f64>>, Vec<Vec<usize>>) {
    let mut remap = vec![usize::MAX; mesh.vertex_slots()];
    let mut vertices = Vec::with_capacity(mesh.num_vertices());
    for (v, vertex) in mesh.vertices() {
        remap[v.index()] = vertices.len();
        vertices.push(vertex.position);
    }

    let faces = mesh
        .faces()
        .map(|(_, face)| face.vertices().iter().map(|v| remap[v.index()]).collect())
        .collect();

    (vertices, faces)
}
