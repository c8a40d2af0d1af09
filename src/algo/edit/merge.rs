//! Triangle-pair merging.

use std::collections::HashSet;

use tracing::debug;

use super::MergeReport;
use crate::error::{EngineError, Result};
use crate::mesh::{FaceId, Mesh, VertexId};

/// One pass of triangle-to-quad merging.
///
/// The pass remembers every face it has consumed so a triangle is never merged
/// twice, even if a caller retries with a stale handle.
#[derive(Debug, Default)]
pub struct MergePass {
    consumed: HashSet<FaceId>,
    merged: usize,
}

impl MergePass {
    /// Start a new pass.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of merges performed so far.
    pub fn merged(&self) -> usize {
        self.merged
    }

    /// Whether `f` was consumed by an earlier merge of this pass.
    pub fn is_consumed(&self, f: FaceId) -> bool {
        self.consumed.contains(&f)
    }

    /// Check whether `a` and `b` can be merged, returning the resulting quad.
    ///
    /// For triangle `(u, v, x)` sharing side `u → v` with triangle `(v, u, y)`,
    /// the quad is `[u, y, v, x]`.
    pub fn check(&self, mesh: &Mesh, a: FaceId, b: FaceId) -> Result<[VertexId; 4]> {
        if a == b {
            return Err(EngineError::invalid_edit(format!(
                "cannot merge face {:?} with itself",
                a
            )));
        }
        for f in [a, b] {
            if self.consumed.contains(&f) {
                return Err(EngineError::invalid_edit(format!(
                    "face {:?} was already merged in this pass",
                    f
                )));
            }
        }
        let (fa, fb) = match (mesh.try_face(a), mesh.try_face(b)) {
            (Some(fa), Some(fb)) => (fa, fb),
            _ => {
                return Err(EngineError::invalid_edit(format!(
                    "faces {:?} and {:?} must both be alive",
                    a, b
                )))
            }
        };
        if !fa.is_triangle() || !fb.is_triangle() {
            return Err(EngineError::invalid_edit(format!(
                "faces {:?} and {:?} must both be triangles",
                a, b
            )));
        }

        let shared: Vec<(VertexId, VertexId)> = fa
            .sides()
            .filter(|&(p, q)| fb.vertices().contains(&p) && fb.vertices().contains(&q))
            .collect();
        let (u, v) = match shared.as_slice() {
            [side] => *side,
            _ => {
                return Err(EngineError::invalid_edit(format!(
                    "faces {:?} and {:?} must share exactly one edge",
                    a, b
                )))
            }
        };
        let lists_both = mesh.find_edge(u, v).is_some_and(|e| {
            let faces = mesh.edge_faces(e);
            faces.len() == 2 && faces.contains(&a) && faces.contains(&b)
        });
        if !lists_both {
            return Err(EngineError::invalid_edit(format!(
                "shared edge of {:?} and {:?} does not list exactly those faces",
                a, b
            )));
        }
        if !fb.has_directed_side(v, u) {
            return Err(EngineError::invalid_edit(format!(
                "faces {:?} and {:?} are wound inconsistently",
                a, b
            )));
        }

        let opposite = |cycle: &[VertexId]| cycle.iter().copied().find(|&w| w != u && w != v);
        match (opposite(fa.vertices()), opposite(fb.vertices())) {
            (Some(x), Some(y)) if x != y => Ok([u, y, v, x]),
            _ => Err(EngineError::invalid_edit(format!(
                "faces {:?} and {:?} have the same opposite corner",
                a, b
            ))),
        }
    }

    /// Merge two adjacent triangles into one quad and remove their shared edge.
    ///
    /// Fails with [`EngineError::InvalidEdit`], leaving the mesh untouched, unless
    /// both faces are live, distinct, unconsumed triangles sharing exactly one
    /// edge (listing exactly those two faces), with distinct opposite corners and
    /// consistent winding.
    ///
    /// # Example
    /// ```
    /// use quadmesh::algo::edit::MergePass;
    /// use quadmesh::mesh::build_from_triangles;
    /// use nalgebra::Point3;
    ///
    /// let vertices = vec![
    ///     Point3::new(0.0, 0.0, 0.0),
    ///     Point3::new(1.0, 0.0, 0.0),
    ///     Point3::new(1.0, 1.0, 0.0),
    ///     Point3::new(0.0, 1.0, 0.0),
    /// ];
    /// let mut mesh = build_from_triangles(&vertices, &[[0, 1, 2], [0, 2, 3]]).unwrap();
    /// let faces: Vec<_> = mesh.face_ids().collect();
    ///
    /// let mut pass = MergePass::new();
    /// pass.merge(&mut mesh, faces[0], faces[1]).unwrap();
    /// assert_eq!(mesh.num_quads(), 1);
    /// assert_eq!(mesh.num_triangles(), 0);
    /// ```
    pub fn merge(&mut self, mesh: &mut Mesh, a: FaceId, b: FaceId) -> Result<FaceId> {
        let quad = self.check(mesh, a, b)?;
        let [u, _, v, _] = quad;

        let tri_a = mesh.remove_face(a)?;
        let tri_b = mesh.remove_face(b)?;
        if let Some(e) = mesh.find_edge(u, v) {
            mesh.remove_edge(e)?;
        }
        let merged = match mesh.add_face(&quad) {
            Ok(f) => f,
            Err(err) => {
                // Put the pair back; the shared edge is recreated by add_face.
                mesh.add_face(tri_a.vertices())?;
                mesh.add_face(tri_b.vertices())?;
                return Err(err);
            }
        };

        self.consumed.insert(a);
        self.consumed.insert(b);
        self.merged += 1;
        Ok(merged)
    }
}

/// Merge adjacent triangle pairs into quads.
///
/// Triangles are visited in handle order. Each one is merged with the first
/// eligible neighbour found across its sides, in side order. Triangles that
/// find no partner are counted as skipped.
///
/// # Example
/// ```
/// use quadmesh::algo::edit::convert_to_quads;
/// use quadmesh::mesh::primitives;
///
/// let mut mesh = primitives::triangle_grid(1, 1.0).unwrap();
/// let report = convert_to_quads(&mut mesh);
/// assert_eq!(report.merged, 1);
/// assert!(mesh.is_quad_mesh());
/// ```
pub fn convert_to_quads(mesh: &mut Mesh) -> MergeReport {
    let mut pass = MergePass::new();
    let mut report = MergeReport::default();

    let triangles: Vec<FaceId> = mesh
        .faces()
        .filter(|(_, f)| f.is_triangle())
        .map(|(id, _)| id)
        .collect();

    for t in triangles {
        if pass.is_consumed(t) || !mesh.is_face_alive(t) {
            continue;
        }
        let partners: Vec<FaceId> = mesh
            .face_edges(t)
            .into_iter()
            .filter_map(|e| mesh.edge_faces(e).iter().copied().find(|&g| g != t))
            .collect();
        let merged = partners
            .into_iter()
            .any(|g| pass.merge(mesh, t, g).is_ok());
        if !merged {
            report.skipped += 1;
        }
    }
    report.merged = pass.merged();

    debug!(
        merged = report.merged,
        skipped = report.skipped,
        quads = mesh.num_quads(),
        "converted triangles to quads"
    );
    report
}
