//! Edge subdivision.

use std::collections::{HashMap, HashSet};

use tracing::{debug, trace, warn};

use super::SubdivideReport;
use crate::error::Result;
use crate::mesh::{EdgeId, FaceId, Mesh, Vertex, VertexId};

type SideKey = (VertexId, VertexId);

#[inline]
fn side_key(a: VertexId, b: VertexId) -> SideKey {
    if a < b {
        (a, b)
    } else {
        (b, a)
    }
}

/// Split every listed edge at its midpoint.
///
/// Each split edge gets one new vertex. A midpoint is hidden only when both
/// endpoints are hidden, and carries the mean endpoint density when both
/// endpoints have one. Faces around split edges are rebuilt as follows (corners
/// `a, b, c, d` in face order, `m_xy` the midpoint of side `xy`):
///
/// | face | split sides | result |
/// |---|---|---|
/// | triangle | ab | `[a, m, c]`, `[m, b, c]` |
/// | triangle | ab, bc | `[m_ab, b, m_bc]`, `[a, m_ab, m_bc, c]` |
/// | triangle | all | four triangles |
/// | quad | ab | `[m, b, c]`, `[a, m, c, d]` |
/// | quad | ab, cd | `[a, m_ab, m_cd, d]`, `[m_ab, b, c, m_cd]` |
/// | quad | ab, bc | `[m_ab, b, m_bc]`, `[a, m_ab, m_bc, d]`, `[m_bc, c, d]` |
/// | quad | ab, bc, cd | centre `z`: `[m_ab, b, m_bc, z]`, `[z, m_bc, c, m_cd]`, `[a, m_ab, z]`, `[z, m_cd, d, a]` |
/// | quad | all | centre `z`, four quads |
/// | n ≥ 5 | any | midpoints inserted into the cycle |
///
/// Wire edges become two wire edges. Dead and repeated handles are skipped.
///
/// The rebuild is planned before the mesh is touched. When the rebuilt faces
/// would give some edge more than two faces (two faces already sharing two
/// sides, for instance), every requested edge on the faces involved is skipped
/// and the rest of the batch is planned again. If a rebuilt face is rejected
/// anyway, the mesh is restored to its state before the call and the error is
/// returned.
///
/// # Example
/// ```
/// use quadmesh::algo::edit::subdivide_edges;
/// use quadmesh::mesh::primitives;
///
/// let mut mesh = primitives::triangle_cube().unwrap();
/// let e = mesh.edge_ids().next().unwrap();
/// let report = subdivide_edges(&mut mesh, &[e]).unwrap();
/// assert_eq!(report.split, 1);
/// assert_eq!(mesh.num_faces(), 14);
/// ```
pub fn subdivide_edges(mesh: &mut Mesh, edges: &[EdgeId]) -> Result<SubdivideReport> {
    let mut report = SubdivideReport::default();
    let mut seen = HashSet::with_capacity(edges.len());
    let mut targets: Vec<EdgeId> = edges
        .iter()
        .copied()
        .filter(|&e| {
            let keep = mesh.is_edge_alive(e) && seen.insert(e);
            if !keep {
                report.skipped += 1;
            }
            keep
        })
        .collect();

    let plan = loop {
        if targets.is_empty() {
            return Ok(report);
        }
        match plan_split(mesh, &targets) {
            Ok(plan) => break plan,
            Err(conflicts) => {
                trace!(edges = conflicts.len(), "split would overload an edge, skipping");
                report.skipped += conflicts.len();
                targets.retain(|e| !conflicts.contains(e));
            }
        }
    };

    let backup = mesh.clone();
    match apply_split(mesh, plan) {
        Ok(created) => {
            report.split = targets.len();
            report.faces_created = created;
            debug!(
                split = report.split,
                skipped = report.skipped,
                faces_created = created,
                "subdivided edges"
            );
            Ok(report)
        }
        Err(err) => {
            *mesh = backup;
            warn!(error = %err, "edge subdivision rolled back");
            Err(err)
        }
    }
}

/// Vertices a plan will insert, with the handles they will receive.
///
/// Slots are appended and never reused, so the next handle is always
/// `vertex_slots() + pending`.
struct PendingVertices<'a> {
    mesh: &'a Mesh,
    vertices: Vec<Vertex>,
}

impl<'a> PendingVertices<'a> {
    fn new(mesh: &'a Mesh) -> Self {
        Self {
            mesh,
            vertices: Vec::new(),
        }
    }

    /// Queue a vertex averaging `corners` and return its future handle.
    fn average(&mut self, corners: &[VertexId]) -> VertexId {
        let id = VertexId::new(self.mesh.vertex_slots() + self.vertices.len());
        self.vertices.push(self.mesh.averaged_vertex(corners));
        id
    }
}

/// Everything needed to apply one batch, computed without touching the mesh.
struct SplitPlan {
    targets: Vec<EdgeId>,
    vertices: Vec<Vertex>,
    /// Faces around split edges, removed before the rebuild.
    faces: Vec<FaceId>,
    rebuilt: Vec<Vec<VertexId>>,
    wires: Vec<(VertexId, VertexId, VertexId)>,
}

/// Plan a batch, or return the requested edges that have to be dropped for the
/// rebuild to stay manifold.
fn plan_split(
    mesh: &Mesh,
    targets: &[EdgeId],
) -> std::result::Result<SplitPlan, HashSet<EdgeId>> {
    let mut pending = PendingVertices::new(mesh);
    let mut midpoints: HashMap<SideKey, VertexId> = HashMap::with_capacity(targets.len());
    let mut wires = Vec::new();
    let mut faces = Vec::new();

    for &e in targets {
        let [a, b] = mesh.edge_vertices(e);
        let m = pending.average(&[a, b]);
        midpoints.insert(side_key(a, b), m);
        let incident = mesh.edge_faces(e);
        if incident.is_empty() {
            wires.push((a, m, b));
        }
        faces.extend_from_slice(incident);
    }
    faces.sort_unstable();
    faces.dedup();

    let mut rebuilt = Vec::with_capacity(2 * faces.len());
    let mut sources = Vec::with_capacity(2 * faces.len());
    for &f in &faces {
        for polygon in rebuild_face(&mut pending, mesh.face_vertices(f), &midpoints) {
            rebuilt.push(polygon);
            sources.push(f);
        }
    }

    // Face count per resulting side: rebuilt faces plus untouched ones.
    let touched: HashSet<FaceId> = faces.iter().copied().collect();
    let mut users: HashMap<SideKey, Vec<usize>> = HashMap::new();
    for (k, polygon) in rebuilt.iter().enumerate() {
        let n = polygon.len();
        for i in 0..n {
            users
                .entry(side_key(polygon[i], polygon[(i + 1) % n]))
                .or_default()
                .push(k);
        }
    }
    let requested: HashSet<EdgeId> = targets.iter().copied().collect();
    let mut conflicts = HashSet::new();
    for (&(a, b), polygons) in &users {
        let kept = mesh.find_edge(a, b).map_or(0, |e| {
            mesh.edge_faces(e)
                .iter()
                .filter(|&f| !touched.contains(f))
                .count()
        });
        if polygons.len() + kept > 2 {
            for &k in polygons {
                conflicts.extend(
                    mesh.face_edges(sources[k])
                        .into_iter()
                        .filter(|e| requested.contains(e)),
                );
            }
        }
    }
    if !conflicts.is_empty() {
        return Err(conflicts);
    }

    Ok(SplitPlan {
        targets: targets.to_vec(),
        vertices: pending.vertices,
        faces,
        rebuilt,
        wires,
    })
}

fn apply_split(mesh: &mut Mesh, plan: SplitPlan) -> Result<usize> {
    let SplitPlan {
        targets,
        vertices,
        faces,
        rebuilt,
        wires,
    } = plan;

    for vertex in vertices {
        mesh.insert_vertex(vertex);
    }
    for f in faces {
        mesh.remove_face(f)?;
    }
    for e in targets {
        mesh.remove_edge(e)?;
    }
    for polygon in &rebuilt {
        mesh.add_face(polygon)?;
    }
    for (a, m, b) in wires {
        mesh.add_edge(a, m)?;
        mesh.add_edge(m, b)?;
    }
    Ok(rebuilt.len())
}

fn rebuild_face(
    pending: &mut PendingVertices<'_>,
    cycle: &[VertexId],
    midpoints: &HashMap<SideKey, VertexId>,
) -> Vec<Vec<VertexId>> {
    let n = cycle.len();
    let mids: Vec<Option<VertexId>> = (0..n)
        .map(|i| midpoints.get(&side_key(cycle[i], cycle[(i + 1) % n])).copied())
        .collect();
    let split: Vec<usize> = (0..n).filter(|&i| mids[i].is_some()).collect();

    // Rotate so the canonical pattern starts at corner `r`.
    let corner = |r: usize, k: usize| cycle[(r + k) % n];
    let mid = |r: usize, k: usize| mids[(r + k) % n].unwrap_or(VertexId::INVALID);

    match (n, split.len()) {
        (_, 0) => vec![cycle.to_vec()],
        (3, 1) => {
            let r = split[0];
            let (a, b, c, m) = (corner(r, 0), corner(r, 1), corner(r, 2), mid(r, 0));
            vec![vec![a, m, c], vec![m, b, c]]
        }
        (3, 2) => {
            let unsplit = (0..3).find(|i| !split.contains(i)).unwrap_or(2);
            let r = (unsplit + 1) % 3;
            let (a, b, c) = (corner(r, 0), corner(r, 1), corner(r, 2));
            let (m_ab, m_bc) = (mid(r, 0), mid(r, 1));
            vec![vec![m_ab, b, m_bc], vec![a, m_ab, m_bc, c]]
        }
        (3, 3) => {
            let (a, b, c) = (cycle[0], cycle[1], cycle[2]);
            let (m_ab, m_bc, m_ca) = (mid(0, 0), mid(0, 1), mid(0, 2));
            vec![
                vec![a, m_ab, m_ca],
                vec![m_ab, b, m_bc],
                vec![m_ca, m_bc, c],
                vec![m_ab, m_bc, m_ca],
            ]
        }
        (4, 1) => {
            let r = split[0];
            let (a, b, c, d) = (corner(r, 0), corner(r, 1), corner(r, 2), corner(r, 3));
            let m = mid(r, 0);
            vec![vec![m, b, c], vec![a, m, c, d]]
        }
        (4, 2) if (split[1] - split[0]) == 2 => {
            let r = split[0];
            let (a, b, c, d) = (corner(r, 0), corner(r, 1), corner(r, 2), corner(r, 3));
            let (m_ab, m_cd) = (mid(r, 0), mid(r, 2));
            vec![vec![a, m_ab, m_cd, d], vec![m_ab, b, c, m_cd]]
        }
        (4, 2) => {
            // Adjacent sides; (0, 3) wraps around to start at side 3.
            let r = if split == [0, 3] { 3 } else { split[0] };
            let (a, b, c, d) = (corner(r, 0), corner(r, 1), corner(r, 2), corner(r, 3));
            let (m_ab, m_bc) = (mid(r, 0), mid(r, 1));
            vec![vec![m_ab, b, m_bc], vec![a, m_ab, m_bc, d], vec![m_bc, c, d]]
        }
        (4, 3) => {
            let unsplit = (0..4).find(|i| !split.contains(i)).unwrap_or(3);
            let r = (unsplit + 1) % 4;
            let (a, b, c, d) = (corner(r, 0), corner(r, 1), corner(r, 2), corner(r, 3));
            let (m_ab, m_bc, m_cd) = (mid(r, 0), mid(r, 1), mid(r, 2));
            let z = pending.average(&[a, b, c, d]);
            vec![
                vec![m_ab, b, m_bc, z],
                vec![z, m_bc, c, m_cd],
                vec![a, m_ab, z],
                vec![z, m_cd, d, a],
            ]
        }
        (4, 4) => {
            let (a, b, c, d) = (cycle[0], cycle[1], cycle[2], cycle[3]);
            let (m_ab, m_bc, m_cd, m_da) = (mid(0, 0), mid(0, 1), mid(0, 2), mid(0, 3));
            let z = pending.average(&[a, b, c, d]);
            vec![
                vec![a, m_ab, z, m_da],
                vec![m_ab, b, m_bc, z],
                vec![z, m_bc, c, m_cd],
                vec![m_da, z, m_cd, d],
            ]
        }
        _ => {
            let mut polygon = Vec::with_capacity(n + split.len());
            for i in 0..n {
                polygon.push(cycle[i]);
                if let Some(m) = mids[i] {
                    polygon.push(m);
                }
            }
            vec![polygon]
        }
    }
}
