//! Catmull-Clark subdivision for polygon meshes.

use std::collections::HashMap;

use nalgebra::{Point3, Vector3};
use rayon::prelude::*;
use tracing::debug;

use crate::algo::Progress;
use crate::error::{EngineError, Result};
use crate::mesh::{EdgeId, FaceId, Mesh, Vertex, VertexId};

use super::SubdivideOptions;

/// Performs Catmull-Clark subdivision.
///
/// # Vertex Rules
///
/// - **Face point**: centroid of the face corners
/// - **Edge point**: `(v0 + v1 + f0 + f1) / 4` for an interior edge, the
///   midpoint for a boundary edge
/// - **Interior vertex**: `(Q + 2R + (n - 3)S) / n` where:
///   - Q = average of adjacent face points
///   - R = average of adjacent edge midpoints
///   - S = original position
///   - n = number of adjacent faces
/// - **Boundary vertex** with exactly two boundary neighbours `l`, `r`:
///   `(l + r) / 8 + 3S / 4`; other boundary vertices stay fixed
///
/// Wire edges are dropped. Vertices without faces are carried over unchanged,
/// and original vertices keep their hidden flag and density.
///
/// The mesh is only replaced once the subdivided mesh is complete, so a failure
/// leaves it untouched.
///
/// # Errors
/// * [`EngineError::EmptyMesh`] if the mesh has no vertices or no faces
pub fn subdivide_smooth(mesh: &mut Mesh, options: &SubdivideOptions) -> Result<()> {
    subdivide_smooth_with_progress(mesh, options, &Progress::none())
}

/// Catmull-Clark subdivision with progress reporting.
pub fn subdivide_smooth_with_progress(
    mesh: &mut Mesh,
    options: &SubdivideOptions,
    progress: &Progress,
) -> Result<()> {
    if mesh.is_empty() || mesh.num_faces() == 0 {
        return Err(EngineError::EmptyMesh);
    }

    for iter in 0..options.iterations {
        progress.report(iter, options.iterations, "Catmull-Clark subdivision");
        *mesh = subdivide_once(mesh, options.parallel)?;
        debug!(
            iteration = iter + 1,
            faces = mesh.num_faces(),
            vertices = mesh.num_vertices(),
            "catmull-clark iteration"
        );
    }
    progress.report(options.iterations, options.iterations, "Catmull-Clark subdivision");
    Ok(())
}

/// Perform one iteration, returning the refined mesh.
fn subdivide_once(mesh: &Mesh, parallel: bool) -> Result<Mesh> {
    // Step 1: Face points
    let face_points: HashMap<FaceId, Point3<f64>> = mesh
        .face_ids()
        .map(|f| (f, mesh.face_centroid(f)))
        .collect();

    // Step 2: Edge points (wire edges get none)
    let edge_points: HashMap<EdgeId, Point3<f64>> = mesh
        .edges()
        .filter(|(_, edge)| edge.face_count() > 0)
        .map(|(e, edge)| {
            let [a, b] = edge.vertices();
            let pos = match *edge.faces() {
                [f0, f1] => Point3::from(
                    (mesh.position(a).coords
                        + mesh.position(b).coords
                        + face_points[&f0].coords
                        + face_points[&f1].coords)
                        / 4.0,
                ),
                _ => mesh.edge_midpoint(e),
            };
            (e, pos)
        })
        .collect();

    // Step 3: Updated original vertices
    let update = |i: usize| -> Option<Point3<f64>> {
        let v = VertexId::new(i);
        mesh.try_vertex(v)?;
        Some(vertex_point(mesh, v, &face_points))
    };
    let updated: Vec<Option<Point3<f64>>> = if parallel {
        (0..mesh.vertex_slots()).into_par_iter().map(update).collect()
    } else {
        (0..mesh.vertex_slots()).map(update).collect()
    };

    // Step 4: Connectivity
    let mut out = Mesh::with_capacity(
        mesh.num_vertices() + mesh.num_faces() + edge_points.len(),
        mesh.num_faces() * 4,
    );
    let mut remap = vec![VertexId::INVALID; mesh.vertex_slots()];
    for (v, vertex) in mesh.vertices() {
        let position = updated[v.index()].unwrap_or(vertex.position);
        remap[v.index()] = out.insert_vertex(Vertex {
            position,
            ..vertex.clone()
        });
    }

    let mut edge_vertex: HashMap<EdgeId, VertexId> = HashMap::with_capacity(edge_points.len());
    for (e, edge) in mesh.edges() {
        if let Some(&pos) = edge_points.get(&e) {
            let mut vertex = mesh.averaged_vertex(&edge.vertices());
            vertex.position = pos;
            edge_vertex.insert(e, out.insert_vertex(vertex));
        }
    }

    for (f, face) in mesh.faces() {
        let mut vertex = mesh.averaged_vertex(face.vertices());
        vertex.position = face_points[&f];
        let fp = out.insert_vertex(vertex);

        let corners = face.vertices();
        let n = corners.len();
        let edge_point = |a: VertexId, b: VertexId| -> Result<VertexId> {
            mesh.find_edge(a, b)
                .and_then(|e| edge_vertex.get(&e).copied())
                .ok_or_else(|| {
                    EngineError::InvalidMesh(format!("face {:?} side ({:?}, {:?}) has no edge", f, a, b))
                })
        };
        for i in 0..n {
            let prev = corners[(i + n - 1) % n];
            let cur = corners[i];
            let next = corners[(i + 1) % n];
            let quad = [
                remap[cur.index()],
                edge_point(cur, next)?,
                fp,
                edge_point(prev, cur)?,
            ];
            out.add_face(&quad)?;
        }
    }

    Ok(out)
}

fn vertex_point(
    mesh: &Mesh,
    v: VertexId,
    face_points: &HashMap<FaceId, Point3<f64>>,
) -> Point3<f64> {
    let pos = *mesh.position(v);
    let edges: Vec<EdgeId> = mesh
        .vertex_edges(v)
        .iter()
        .copied()
        .filter(|&e| mesh.edge(e).face_count() > 0)
        .collect();
    let faces = mesh.vertex_faces(v);
    if faces.is_empty() {
        return pos;
    }

    let boundary_neighbors: Vec<VertexId> = edges
        .iter()
        .filter(|&&e| mesh.edge(e).is_boundary())
        .filter_map(|&e| mesh.edge(e).other(v))
        .collect();
    if !boundary_neighbors.is_empty() {
        return match boundary_neighbors.as_slice() {
            [l, r] => Point3::from(
                (mesh.position(*l).coords + mesh.position(*r).coords) * (1.0 / 8.0)
                    + pos.coords * (3.0 / 4.0),
            ),
            _ => pos,
        };
    }

    // Q = average of adjacent face points
    let n = faces.len() as f64;
    let q: Vector3<f64> = faces.iter().map(|f| face_points[f].coords).sum::<Vector3<f64>>() / n;

    // R = average of adjacent edge midpoints
    let r: Vector3<f64> = edges
        .iter()
        .map(|&e| mesh.edge_midpoint(e).coords)
        .sum::<Vector3<f64>>()
        / edges.len() as f64;

    Point3::from((q + r * 2.0 + pos.coords * (n - 3.0)) / n)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::{build_from_polygons, build_from_quads, primitives};

    fn create_single_quad() -> Mesh {
        let vertices = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(1.0, 1.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
        ];
        build_from_quads(&vertices, &[[0, 1, 2, 3]]).unwrap()
    }

    fn create_two_quads() -> Mesh {
        // Two quads sharing an edge
        let vertices = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(1.0, 1.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
            Point3::new(2.0, 0.0, 0.0),
            Point3::new(2.0, 1.0, 0.0),
        ];
        build_from_quads(&vertices, &[[0, 1, 2, 3], [1, 4, 5, 2]]).unwrap()
    }

    fn centroid(mesh: &Mesh) -> Vector3<f64> {
        mesh.vertex_ids()
            .map(|v| mesh.position(v).coords)
            .sum::<Vector3<f64>>()
            / mesh.num_vertices() as f64
    }

    #[test]
    fn test_single_quad() {
        let mut mesh = create_single_quad();
        subdivide_smooth(&mut mesh, &SubdivideOptions::new(1)).unwrap();

        // 4 original + 1 face point + 4 edge points = 9
        assert_eq!(mesh.num_faces(), 4);
        assert_eq!(mesh.num_vertices(), 9);
        assert!(mesh.is_valid());
        assert!(mesh.is_quad_mesh());
        // Corners follow the boundary rule: (l + r) / 8 + 3S / 4.
        let p = mesh.position(VertexId::new(0));
        assert!((p - Point3::new(0.125, 0.125, 0.0)).norm() < 1e-10);
        // The face point is the centroid.
        assert!((mesh.position(VertexId::new(8)) - Point3::new(0.5, 0.5, 0.0)).norm() < 1e-10);
    }

    #[test]
    fn test_two_quads() {
        let mut mesh = create_two_quads();
        subdivide_smooth(&mut mesh, &SubdivideOptions::new(1)).unwrap();

        // 6 original + 7 edge points + 2 face points = 15
        assert_eq!(mesh.num_faces(), 8);
        assert_eq!(mesh.num_vertices(), 15);
        assert!(mesh.is_valid());
        assert!(mesh.is_quad_mesh());
    }

    #[test]
    fn test_interior_edge_point() {
        let mut mesh = create_two_quads();
        subdivide_smooth(&mut mesh, &SubdivideOptions::new(1).sequential()).unwrap();
        // Shared edge (1, 2): ((1,0) + (1,1) + (0.5,0.5) + (1.5,0.5)) / 4.
        let expected = Point3::new(1.0, 0.5, 0.0);
        assert!(mesh
            .vertex_ids()
            .any(|v| (mesh.position(v) - expected).norm() < 1e-10));
    }

    #[test]
    fn test_quadruples_faces_and_keeps_euler() {
        let mut mesh = primitives::quad_cube().unwrap();
        subdivide_smooth(&mut mesh, &SubdivideOptions::new(1)).unwrap();
        assert_eq!(mesh.num_faces(), 24);
        assert_eq!(mesh.euler_characteristic(), 2);

        subdivide_smooth(&mut mesh, &SubdivideOptions::new(1)).unwrap();
        assert_eq!(mesh.num_faces(), 96);
        assert!(mesh.is_valid());
        assert!(mesh.is_quad_mesh());
    }

    #[test]
    fn test_triangles_become_quads() {
        let mut mesh = primitives::tetrahedron().unwrap();
        subdivide_smooth(&mut mesh, &SubdivideOptions::new(1)).unwrap();
        assert_eq!(mesh.num_faces(), 12);
        assert!(mesh.is_quad_mesh());
        assert_eq!(mesh.euler_characteristic(), 2);
    }

    #[test]
    fn test_pentagon() {
        let vertices: Vec<Point3<f64>> = (0..5)
            .map(|k| {
                let a = std::f64::consts::TAU * k as f64 / 5.0;
                Point3::new(a.cos(), a.sin(), 0.0)
            })
            .collect();
        let mut mesh = build_from_polygons(&vertices, &[[0, 1, 2, 3, 4]]).unwrap();
        subdivide_smooth(&mut mesh, &SubdivideOptions::new(1)).unwrap();
        assert_eq!(mesh.num_faces(), 5);
        assert!(mesh.is_quad_mesh());
    }

    #[test]
    fn test_closed_mesh_stays_centred() {
        let mut mesh = primitives::quad_cube().unwrap();
        let before = centroid(&mesh);
        subdivide_smooth(&mut mesh, &SubdivideOptions::new(2)).unwrap();
        assert!((centroid(&mesh) - before).norm() < 1e-10);
    }

    #[test]
    fn test_attributes_and_isolated_vertices_carry_over() {
        let mut mesh = primitives::quad_cube().unwrap();
        mesh.set_density(VertexId::new(0), Some(3.0));
        mesh.set_hidden(VertexId::new(1), true);
        let loose = mesh.add_vertex(Point3::new(5.0, 5.0, 5.0));
        let wire_end = mesh.add_vertex(Point3::new(6.0, 5.0, 5.0));
        mesh.add_edge(loose, wire_end).unwrap();

        subdivide_smooth(&mut mesh, &SubdivideOptions::new(1)).unwrap();
        assert_eq!(mesh.density(VertexId::new(0)), Some(3.0));
        assert!(mesh.is_hidden(VertexId::new(1)));
        assert_eq!(*mesh.position(VertexId::new(8)), Point3::new(5.0, 5.0, 5.0));
        assert_eq!(mesh.valence(VertexId::new(8)), 0);
        assert!(mesh.is_valid());
    }

    #[test]
    fn test_zero_iterations_and_empty() {
        let mut mesh = primitives::quad_cube().unwrap();
        subdivide_smooth(&mut mesh, &SubdivideOptions::new(0)).unwrap();
        assert_eq!(mesh.num_faces(), 6);

        let mut empty = Mesh::new();
        assert!(matches!(
            subdivide_smooth(&mut empty, &SubdivideOptions::new(1)),
            Err(EngineError::EmptyMesh)
        ));
    }
}
