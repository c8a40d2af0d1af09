//! Edge collapse.

use std::collections::{HashMap, HashSet};

use tracing::{debug, trace, warn};

use super::CollapseReport;
use crate::error::Result;
use crate::mesh::{EdgeId, FaceId, Mesh, VertexId};

/// Collapses stop once the mesh is down to this many live vertices.
const MIN_VERTICES: usize = 4;

/// Collapse each listed edge into its first endpoint.
///
/// Collapses run one at a time against the current mesh. The survivor (the
/// edge's first endpoint) moves to the edge midpoint and takes over the other
/// endpoint's connections; the other endpoint is removed. Triangles on the edge
/// disappear and larger faces lose one corner.
///
/// An edge is skipped (and counted) when:
/// - it is dead, for example because an earlier collapse removed it;
/// - it is a wire edge;
/// - one of its endpoints already survived a collapse in this batch;
/// - the link condition fails (the endpoints share a neighbour that is not the
///   opposite corner of one of the edge's triangles);
/// - one of its triangles has both other sides on the boundary;
/// - an edge would end up with more than two faces, or a face would become
///   degenerate;
/// - two faces would end up sharing more than one edge;
/// - the mesh has only four live vertices left.
///
/// If a rebuilt face is nevertheless rejected, the whole batch is rolled back
/// and the error is returned.
///
/// # Example
/// ```
/// use quadmesh::algo::edit::collapse_short_edges;
/// use quadmesh::mesh::{primitives, VertexId};
///
/// let mut mesh = primitives::triangle_grid(3, 3.0).unwrap();
/// // An interior edge between two triangles.
/// let e = mesh.find_edge(VertexId::new(5), VertexId::new(6)).unwrap();
/// let report = collapse_short_edges(&mut mesh, &[e]).unwrap();
/// assert_eq!(report.collapsed, 1);
/// assert_eq!(mesh.num_faces(), 16);
/// assert!(mesh.is_valid());
/// ```
pub fn collapse_short_edges(mesh: &mut Mesh, edges: &[EdgeId]) -> Result<CollapseReport> {
    collapse_edges_while(mesh, edges, |_| true)
}

/// [`collapse_short_edges`], stopping before the next edge once `proceed`
/// returns false. Edges not reached are not counted.
pub(crate) fn collapse_edges_while<F>(
    mesh: &mut Mesh,
    edges: &[EdgeId],
    mut proceed: F,
) -> Result<CollapseReport>
where
    F: FnMut(&Mesh) -> bool,
{
    let mut report = CollapseReport::default();
    if edges.is_empty() {
        return Ok(report);
    }

    let backup = mesh.clone();
    let mut survivors = HashSet::new();
    for &e in edges {
        if !proceed(mesh) {
            break;
        }
        let plan = match plan_collapse(mesh, e, &survivors) {
            Ok(plan) => plan,
            Err(reason) => {
                trace!(edge = %e, reason, "collapse skipped");
                report.skipped += 1;
                continue;
            }
        };
        let keep = plan.keep;
        if let Err(err) = apply_collapse(mesh, plan) {
            *mesh = backup;
            warn!(error = %err, "edge collapse rolled back");
            return Err(err);
        }
        survivors.insert(keep);
        report.collapsed += 1;
    }

    debug!(
        collapsed = report.collapsed,
        skipped = report.skipped,
        "collapsed edges"
    );
    Ok(report)
}

/// A face after the collapse: one of the rebuilt cycles, or an untouched face.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
enum FaceRef {
    Rebuilt(usize),
    Kept(FaceId),
}

/// Everything needed to apply one collapse, computed without touching the mesh.
struct CollapsePlan {
    keep: VertexId,
    removed: VertexId,
    /// Faces around either endpoint, removed before the rebuild.
    faces: Vec<FaceId>,
    /// Replacement cycles for the faces that survive.
    rebuilt: Vec<Vec<VertexId>>,
    /// Wire neighbours of `removed` that must stay connected to `keep`.
    wires: Vec<VertexId>,
    /// Neighbours of `keep` joined by wire edges before the collapse.
    keep_wires: HashSet<VertexId>,
}

fn plan_collapse(
    mesh: &Mesh,
    e: EdgeId,
    survivors: &HashSet<VertexId>,
) -> std::result::Result<CollapsePlan, &'static str> {
    let edge = mesh.try_edge(e).ok_or("dead edge")?;
    if edge.face_count() == 0 {
        return Err("wire edge");
    }
    if mesh.num_vertices() <= MIN_VERTICES {
        return Err("mesh too small");
    }
    let [keep, removed] = edge.vertices();
    if survivors.contains(&keep) || survivors.contains(&removed) {
        return Err("endpoint already collapsed in this batch");
    }

    // Link condition.
    let mut opposite = HashSet::new();
    for &f in edge.faces() {
        let face = mesh.face(f);
        if face.is_triangle() {
            if let Some(&c) = face.vertices().iter().find(|&&v| v != keep && v != removed) {
                opposite.insert(c);
                let sides = [mesh.find_edge(keep, c), mesh.find_edge(removed, c)];
                if sides
                    .iter()
                    .all(|s| s.is_some_and(|s| mesh.edge(s).face_count() <= 1))
                {
                    return Err("triangle would leave a dangling edge");
                }
            }
        }
    }
    let keep_neighbors: HashSet<VertexId> = mesh.vertex_neighbors(keep).collect();
    let common: HashSet<VertexId> = mesh
        .vertex_neighbors(removed)
        .filter(|n| keep_neighbors.contains(n))
        .collect();
    if common != opposite {
        return Err("link condition");
    }

    // Rebuild every face touching either endpoint.
    let mut faces = mesh.vertex_faces(keep);
    faces.extend(mesh.vertex_faces(removed));
    faces.sort_unstable();
    faces.dedup();

    let on_edge: HashSet<FaceId> = edge.faces().iter().copied().collect();
    let mut rebuilt = Vec::with_capacity(faces.len());
    for &f in &faces {
        let cycle = mesh.face_vertices(f);
        if !on_edge.contains(&f) {
            if cycle.contains(&keep) && cycle.contains(&removed) {
                return Err("endpoints share a face off the edge");
            }
        } else if cycle.len() == 3 {
            continue;
        }
        let mut next: Vec<VertexId> = Vec::with_capacity(cycle.len());
        for &v in cycle {
            let v = if v == removed { keep } else { v };
            if !next.contains(&v) {
                next.push(v);
            }
        }
        if next.len() < 3 {
            return Err("face would degenerate");
        }
        rebuilt.push(next);
    }

    // Faces per resulting edge: rebuilt ones plus untouched neighbours.
    let touched: HashSet<FaceId> = faces.iter().copied().collect();
    let mut users: HashMap<(VertexId, VertexId), Vec<FaceRef>> = HashMap::new();
    for (k, cycle) in rebuilt.iter().enumerate() {
        let n = cycle.len();
        for i in 0..n {
            let (a, b) = (cycle[i], cycle[(i + 1) % n]);
            users
                .entry(if a < b { (a, b) } else { (b, a) })
                .or_default()
                .push(FaceRef::Rebuilt(k));
        }
    }
    let mut shared: HashMap<(FaceRef, FaceRef), usize> = HashMap::new();
    for (&(a, b), owners) in users.iter_mut() {
        if let Some(existing) = mesh.find_edge(a, b) {
            owners.extend(
                mesh.edge_faces(existing)
                    .iter()
                    .filter(|&f| !touched.contains(f))
                    .map(|&f| FaceRef::Kept(f)),
            );
        }
        match owners.as_slice() {
            [] | [_] => {}
            &[x, y] => *shared.entry((x.min(y), x.max(y))).or_insert(0) += 1,
            _ => return Err("an edge would gain a third face"),
        }
    }
    // Two faces on two common sides fold onto each other around a valence-2
    // vertex.
    if shared.values().any(|&count| count > 1) {
        return Err("two faces would share more than one edge");
    }

    let wire_neighbors = |v: VertexId| -> Vec<VertexId> {
        mesh.vertex_edges(v)
            .iter()
            .filter(|&&x| mesh.edge(x).face_count() == 0)
            .filter_map(|&x| mesh.edge(x).other(v))
            .collect()
    };
    let wires = wire_neighbors(removed)
        .into_iter()
        .filter(|&w| w != keep)
        .collect();
    let keep_wires = wire_neighbors(keep).into_iter().collect();

    Ok(CollapsePlan {
        keep,
        removed,
        faces,
        rebuilt,
        wires,
        keep_wires,
    })
}

fn apply_collapse(mesh: &mut Mesh, plan: CollapsePlan) -> Result<()> {
    let CollapsePlan {
        keep,
        removed,
        faces,
        rebuilt,
        wires,
        mut keep_wires,
    } = plan;

    let midpoint = nalgebra::center(mesh.position(keep), mesh.position(removed));
    for f in faces {
        mesh.remove_face(f)?;
    }
    for e in mesh.vertex_edges(removed).to_vec() {
        mesh.remove_edge(e)?;
    }
    mesh.remove_vertex(removed)?;
    mesh.set_position(keep, midpoint);

    for cycle in &rebuilt {
        mesh.add_face(cycle)?;
    }
    for w in wires {
        mesh.add_edge(keep, w)?;
        keep_wires.insert(w);
    }

    // Sides of deleted triangles that no face uses any more.
    let stale: Vec<EdgeId> = mesh
        .vertex_edges(keep)
        .iter()
        .copied()
        .filter(|&e| {
            let edge = mesh.edge(e);
            edge.face_count() == 0 && edge.other(keep).is_some_and(|n| !keep_wires.contains(&n))
        })
        .collect();
    for e in stale {
        mesh.remove_edge(e)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::{build_from_polygons, primitives};
    use nalgebra::Point3;

    #[test]
    fn test_collapse_interior_edge() {
        let mut mesh = primitives::triangle_grid(3, 3.0).unwrap();
        let (v, e, f) = (mesh.num_vertices(), mesh.num_edges(), mesh.num_faces());
        let edge = mesh.find_edge(VertexId::new(5), VertexId::new(6)).unwrap();

        let report = collapse_short_edges(&mut mesh, &[edge]).unwrap();
        assert_eq!(report, CollapseReport { collapsed: 1, skipped: 0 });
        assert_eq!(mesh.num_vertices(), v - 1);
        assert_eq!(mesh.num_edges(), e - 3);
        assert_eq!(mesh.num_faces(), f - 2);
        assert!(mesh.is_valid());
        // The edge was first walked as 6 -> 5, so 6 survives.
        assert!(!mesh.is_vertex_alive(VertexId::new(5)));
        assert_eq!(*mesh.position(VertexId::new(6)), Point3::new(1.5, 1.0, 0.0));
        assert!((mesh.surface_area() - 9.0).abs() < 1e-12);
    }

    #[test]
    fn test_survivor_is_not_collapsed_twice() {
        let mut mesh = primitives::triangle_grid(4, 4.0).unwrap();
        let first = mesh.find_edge(VertexId::new(6), VertexId::new(7)).unwrap();
        let second = mesh.find_edge(VertexId::new(6), VertexId::new(11)).unwrap();

        let report = collapse_short_edges(&mut mesh, &[first, second]).unwrap();
        assert_eq!(report.collapsed, 1);
        assert_eq!(report.skipped, 1);
        assert!(mesh.is_valid());
    }

    #[test]
    fn test_dead_and_wire_edges_are_skipped() {
        let mut mesh = primitives::triangle_grid(3, 3.0).unwrap();
        let loose = mesh.add_vertex(Point3::new(9.0, 0.0, 0.0));
        let wire = mesh.add_edge(VertexId::new(0), loose).unwrap();

        let report = collapse_short_edges(&mut mesh, &[wire, EdgeId::new(500)]).unwrap();
        assert_eq!(report.skipped, 2);
        assert!(mesh.is_edge_alive(wire));
    }

    #[test]
    fn test_tetrahedron_is_too_small() {
        let mut mesh = primitives::tetrahedron().unwrap();
        let all: Vec<EdgeId> = mesh.edge_ids().collect();
        let report = collapse_short_edges(&mut mesh, &all).unwrap();
        assert_eq!(report.collapsed, 0);
        assert_eq!(report.skipped, 6);
        assert_eq!(mesh.num_faces(), 4);
    }

    #[test]
    fn test_link_condition_on_closed_mesh() {
        // Collapses go on until the octahedron is down to four vertices.
        let vertices = vec![
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(-1.0, 0.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
            Point3::new(0.0, -1.0, 0.0),
            Point3::new(0.0, 0.0, 1.0),
            Point3::new(0.0, 0.0, -1.0),
        ];
        let faces = [
            [0, 2, 4],
            [2, 1, 4],
            [1, 3, 4],
            [3, 0, 4],
            [2, 0, 5],
            [1, 2, 5],
            [3, 1, 5],
            [0, 3, 5],
        ];
        let mut mesh = build_from_polygons(&vertices, &faces).unwrap();
        let all: Vec<EdgeId> = mesh.edge_ids().collect();
        let report = collapse_short_edges(&mut mesh, &all).unwrap();

        assert!(report.collapsed >= 1);
        assert_eq!(report.collapsed + report.skipped, all.len());
        assert!(mesh.is_valid());
        assert_eq!(mesh.euler_characteristic(), 2);
        assert!(mesh.edge_ids().all(|e| mesh.edge(e).is_interior()));
    }

    #[test]
    fn test_quad_loses_a_corner() {
        let mut mesh = primitives::quad_grid(3, 3.0).unwrap();
        let f = mesh.num_faces();
        let edge = mesh.find_edge(VertexId::new(5), VertexId::new(6)).unwrap();

        let report = collapse_short_edges(&mut mesh, &[edge]).unwrap();
        assert_eq!(report.collapsed, 1);
        assert_eq!(mesh.num_faces(), f);
        assert_eq!(mesh.num_triangles(), 2);
        assert!(mesh.is_valid());
    }

    #[test]
    fn test_collapse_never_folds_triangle_onto_quad() {
        // Collapsing 0-1 would turn triangle 1-3-2 into 0-3-2, which shares
        // both 0-2 and 0-3 with quad 0-2-4-3.
        let vertices = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
            Point3::new(0.0, -1.0, 0.0),
            Point3::new(-1.0, 0.0, 0.0),
        ];
        let faces = [vec![0, 1, 2], vec![1, 0, 3], vec![0, 2, 4, 3], vec![1, 3, 2]];
        let mut mesh = build_from_polygons(&vertices, &faces).unwrap();
        let edge = mesh.find_edge(VertexId::new(0), VertexId::new(1)).unwrap();

        let report = collapse_short_edges(&mut mesh, &[edge]).unwrap();
        assert_eq!(report, CollapseReport { collapsed: 0, skipped: 1 });
        assert_eq!(mesh.num_vertices(), 5);
        assert_eq!(mesh.num_faces(), 4);
        assert!(mesh.is_valid());
    }

    #[test]
    fn test_mixed_grid_collapses_stay_unfolded() {
        let mut mesh = primitives::triangle_grid(4, 4.0).unwrap();
        crate::algo::edit::convert_to_quads(&mut mesh);
        for _ in 0..3 {
            let edges: Vec<EdgeId> = mesh.edge_ids().collect();
            collapse_short_edges(&mut mesh, &edges).unwrap();
            assert!(mesh.is_valid());

            // No two faces share more than one edge.
            let mut pairs = HashSet::new();
            for (_, edge) in mesh.edges() {
                if let [f, g] = *edge.faces() {
                    assert!(pairs.insert((f.min(g), f.max(g))), "{:?} and {:?} fold", f, g);
                }
            }
        }
    }

    #[test]
    fn test_boundary_ear_is_skipped() {
        // Triangle 0-1-3 hangs off the strip with two boundary sides at 3.
        let vertices = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.5, 1.0, 0.0),
            Point3::new(0.5, -1.0, 0.0),
            Point3::new(1.5, 1.0, 0.0),
        ];
        let faces = [[0, 1, 2], [1, 0, 3], [1, 4, 2]];
        let mut mesh = build_from_polygons(&vertices, &faces).unwrap();
        let edge = mesh.find_edge(VertexId::new(0), VertexId::new(1)).unwrap();

        let report = collapse_short_edges(&mut mesh, &[edge]).unwrap();
        assert_eq!(report.skipped, 1);
        assert_eq!(mesh.num_faces(), 3);
    }
}
