//! Connectivity-aware polygon mesh store.
//!
//! The store keeps three slot arrays (vertices, edges, faces) plus the adjacency
//! needed for constant-time local queries:
//!
//! - each vertex has a list of incident edges (maintained by the mesh),
//! - each edge knows its two endpoints and its zero, one or two faces,
//! - each face is an ordered cycle of vertices,
//! - a hash map resolves the edge joining two vertices.
//!
//! # Removal
//!
//! Removing an element tombstones its slot. Handles are never reused, so any
//! handle held across an edit either still names the same element or reports
//! itself dead through [`Mesh::is_vertex_alive`] and friends.

use std::collections::HashMap;

use nalgebra::Point3;

use super::index::{EdgeId, FaceId, VertexId};
use crate::error::{EngineError, Result};

/// A vertex of the mesh.
#[derive(Debug, Clone, PartialEq)]
pub struct Vertex {
    /// The 3D position of this vertex.
    pub position: Point3<f64>,

    /// Hidden vertices are neither moved nor used as smoothing neighbours.
    pub hidden: bool,

    /// Optional per-vertex density used by density-driven refinement.
    pub density: Option<f64>,
}

impl Vertex {
    /// Create a new visible vertex at the given position.
    pub fn new(position: Point3<f64>) -> Self {
        Self {
            position,
            hidden: false,
            density: None,
        }
    }

    /// Create a new vertex from coordinates.
    pub fn from_coords(x: f64, y: f64, z: f64) -> Self {
        Self::new(Point3::new(x, y, z))
    }
}

/// An undirected edge with up to two incident faces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edge {
    vertices: [VertexId; 2],
    faces: [FaceId; 2],
    face_count: u8,
}

impl Edge {
    fn new(a: VertexId, b: VertexId) -> Self {
        Self {
            vertices: [a, b],
            faces: [FaceId::INVALID; 2],
            face_count: 0,
        }
    }

    /// The two endpoints, in creation order.
    #[inline]
    pub fn vertices(&self) -> [VertexId; 2] {
        self.vertices
    }

    /// The incident faces (zero, one or two).
    #[inline]
    pub fn faces(&self) -> &[FaceId] {
        &self.faces[..self.face_count as usize]
    }

    /// Number of incident faces.
    #[inline]
    pub fn face_count(&self) -> usize {
        self.face_count as usize
    }

    /// Whether `v` is one of the endpoints.
    #[inline]
    pub fn contains(&self, v: VertexId) -> bool {
        self.vertices[0] == v || self.vertices[1] == v
    }

    /// The endpoint opposite to `v`, if `v` is an endpoint.
    #[inline]
    pub fn other(&self, v: VertexId) -> Option<VertexId> {
        if self.vertices[0] == v {
            Some(self.vertices[1])
        } else if self.vertices[1] == v {
            Some(self.vertices[0])
        } else {
            None
        }
    }

    /// An edge with exactly one incident face.
    #[inline]
    pub fn is_boundary(&self) -> bool {
        self.face_count == 1
    }

    /// An edge with exactly two incident faces.
    #[inline]
    pub fn is_interior(&self) -> bool {
        self.face_count == 2
    }

    fn attach(&mut self, f: FaceId) {
        debug_assert!(self.face_count < 2);
        self.faces[self.face_count as usize] = f;
        self.face_count += 1;
    }

    fn detach(&mut self, f: FaceId) {
        let n = self.face_count as usize;
        if let Some(pos) = self.faces[..n].iter().position(|&x| x == f) {
            self.faces[pos] = self.faces[n - 1];
            self.faces[n - 1] = FaceId::INVALID;
            self.face_count -= 1;
        }
    }
}

/// A polygonal face: an ordered cycle of at least three vertices.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Face {
    vertices: Vec<VertexId>,
}

impl Face {
    /// The vertex cycle.
    #[inline]
    pub fn vertices(&self) -> &[VertexId] {
        &self.vertices
    }

    /// Number of corners.
    #[inline]
    pub fn len(&self) -> usize {
        self.vertices.len()
    }

    /// Faces always have at least three corners; provided for clippy.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    /// Three corners.
    #[inline]
    pub fn is_triangle(&self) -> bool {
        self.vertices.len() == 3
    }

    /// Four corners.
    #[inline]
    pub fn is_quad(&self) -> bool {
        self.vertices.len() == 4
    }

    /// Consecutive corner pairs `(v[i], v[i + 1])`, wrapping around.
    pub fn sides(&self) -> impl Iterator<Item = (VertexId, VertexId)> + '_ {
        let n = self.vertices.len();
        (0..n).map(move |i| (self.vertices[i], self.vertices[(i + 1) % n]))
    }

    /// Whether the face walks from `a` directly to `b`.
    pub fn has_directed_side(&self, a: VertexId, b: VertexId) -> bool {
        self.sides().any(|(x, y)| x == a && y == b)
    }
}

#[inline]
fn edge_key(a: VertexId, b: VertexId) -> (VertexId, VertexId) {
    if a < b {
        (a, b)
    } else {
        (b, a)
    }
}

/// A polygon mesh with explicit vertices, edges and faces.
///
/// Every edge references two distinct live vertices and at most two faces; every
/// face is a cycle of at least three distinct live vertices whose sides are
/// existing edges. All mutators keep these invariants or fail without changes.
#[derive(Debug, Clone, Default)]
pub struct Mesh {
    pub(crate) vertices: Vec<Option<Vertex>>,
    pub(crate) vertex_edges: Vec<Vec<EdgeId>>,
    pub(crate) edges: Vec<Option<Edge>>,
    pub(crate) faces: Vec<Option<Face>>,
    edge_lookup: HashMap<(VertexId, VertexId), EdgeId>,
    live_vertices: usize,
    live_edges: usize,
    live_faces: usize,
}

impl Mesh {
    /// Create a new empty mesh.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a mesh with pre-allocated capacity.
    pub fn with_capacity(num_vertices: usize, num_faces: usize) -> Self {
        // Closed quad-dominant surfaces have roughly two edges per face.
        let num_edges = num_faces * 2 + num_faces / 2;
        Self {
            vertices: Vec::with_capacity(num_vertices),
            vertex_edges: Vec::with_capacity(num_vertices),
            edges: Vec::with_capacity(num_edges),
            faces: Vec::with_capacity(num_faces),
            edge_lookup: HashMap::with_capacity(num_edges),
            ..Self::default()
        }
    }

    // ==================== Counts ====================

    /// Number of live vertices.
    #[inline]
    pub fn num_vertices(&self) -> usize {
        self.live_vertices
    }

    /// Number of live edges.
    #[inline]
    pub fn num_edges(&self) -> usize {
        self.live_edges
    }

    /// Number of live faces.
    #[inline]
    pub fn num_faces(&self) -> usize {
        self.live_faces
    }

    /// Number of vertex slots, including tombstones.
    ///
    /// Per-vertex buffers indexed by [`VertexId::index`] must have this length.
    #[inline]
    pub fn vertex_slots(&self) -> usize {
        self.vertices.len()
    }

    /// Number of face slots, including tombstones.
    #[inline]
    pub fn face_slots(&self) -> usize {
        self.faces.len()
    }

    /// A mesh with no live vertices.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.live_vertices == 0
    }

    // ==================== Liveness ====================

    /// Whether `v` names a live vertex.
    #[inline]
    pub fn is_vertex_alive(&self, v: VertexId) -> bool {
        self.vertices.get(v.index()).is_some_and(Option::is_some)
    }

    /// Whether `e` names a live edge.
    #[inline]
    pub fn is_edge_alive(&self, e: EdgeId) -> bool {
        self.edges.get(e.index()).is_some_and(Option::is_some)
    }

    /// Whether `f` names a live face.
    #[inline]
    pub fn is_face_alive(&self, f: FaceId) -> bool {
        self.faces.get(f.index()).is_some_and(Option::is_some)
    }

    // ==================== Accessors ====================

    /// Get a vertex by handle, or `None` if it was removed.
    #[inline]
    pub fn try_vertex(&self, v: VertexId) -> Option<&Vertex> {
        self.vertices.get(v.index()).and_then(Option::as_ref)
    }

    /// Get a vertex by handle.
    ///
    /// # Panics
    /// Panics if the vertex has been removed.
    #[inline]
    pub fn vertex(&self, v: VertexId) -> &Vertex {
        match self.try_vertex(v) {
            Some(vertex) => vertex,
            None => panic!("vertex {:?} is not alive", v),
        }
    }

    /// Get a mutable vertex by handle.
    ///
    /// # Panics
    /// Panics if the vertex has been removed.
    #[inline]
    pub fn vertex_mut(&mut self, v: VertexId) -> &mut Vertex {
        match self.vertices.get_mut(v.index()).and_then(Option::as_mut) {
            Some(vertex) => vertex,
            None => panic!("vertex {:?} is not alive", v),
        }
    }

    /// Get an edge by handle, or `None` if it was removed.
    #[inline]
    pub fn try_edge(&self, e: EdgeId) -> Option<&Edge> {
        self.edges.get(e.index()).and_then(Option::as_ref)
    }

    /// Get an edge by handle.
    ///
    /// # Panics
    /// Panics if the edge has been removed.
    #[inline]
    pub fn edge(&self, e: EdgeId) -> &Edge {
        match self.try_edge(e) {
            Some(edge) => edge,
            None => panic!("edge {:?} is not alive", e),
        }
    }

    /// Get a face by handle, or `None` if it was removed.
    #[inline]
    pub fn try_face(&self, f: FaceId) -> Option<&Face> {
        self.faces.get(f.index()).and_then(Option::as_ref)
    }

    /// Get a face by handle.
    ///
    /// # Panics
    /// Panics if the face has been removed.
    #[inline]
    pub fn face(&self, f: FaceId) -> &Face {
        match self.try_face(f) {
            Some(face) => face,
            None => panic!("face {:?} is not alive", f),
        }
    }

    /// Get the position of a vertex.
    #[inline]
    pub fn position(&self, v: VertexId) -> &Point3<f64> {
        &self.vertex(v).position
    }

    /// Set the position of a vertex.
    #[inline]
    pub fn set_position(&mut self, v: VertexId, pos: Point3<f64>) {
        self.vertex_mut(v).position = pos;
    }

    /// Whether a vertex is hidden.
    #[inline]
    pub fn is_hidden(&self, v: VertexId) -> bool {
        self.vertex(v).hidden
    }

    /// Hide or reveal a vertex.
    #[inline]
    pub fn set_hidden(&mut self, v: VertexId, hidden: bool) {
        self.vertex_mut(v).hidden = hidden;
    }

    /// The density attached to a vertex, if any.
    #[inline]
    pub fn density(&self, v: VertexId) -> Option<f64> {
        self.vertex(v).density
    }

    /// Attach (or clear) a density value.
    #[inline]
    pub fn set_density(&mut self, v: VertexId, density: Option<f64>) {
        self.vertex_mut(v).density = density;
    }

    // ==================== Topology Queries ====================

    /// Incident edges of a vertex.
    #[inline]
    pub fn vertex_edges(&self, v: VertexId) -> &[EdgeId] {
        self.vertex_edges
            .get(v.index())
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Number of incident edges.
    #[inline]
    pub fn valence(&self, v: VertexId) -> usize {
        self.vertex_edges(v).len()
    }

    /// Vertices sharing an edge with `v`.
    pub fn vertex_neighbors(&self, v: VertexId) -> impl Iterator<Item = VertexId> + '_ {
        self.vertex_edges(v)
            .iter()
            .filter_map(move |&e| self.edge(e).other(v))
    }

    /// Faces incident to `v`, each listed once, in ascending handle order.
    pub fn vertex_faces(&self, v: VertexId) -> Vec<FaceId> {
        let mut faces: Vec<FaceId> = self
            .vertex_edges(v)
            .iter()
            .flat_map(|&e| self.edge(e).faces().iter().copied())
            .collect();
        faces.sort_unstable();
        faces.dedup();
        faces
    }

    /// Endpoints of an edge.
    #[inline]
    pub fn edge_vertices(&self, e: EdgeId) -> [VertexId; 2] {
        self.edge(e).vertices()
    }

    /// Faces incident to an edge.
    #[inline]
    pub fn edge_faces(&self, e: EdgeId) -> &[FaceId] {
        self.edge(e).faces()
    }

    /// The edge joining `a` and `b`, if any.
    #[inline]
    pub fn find_edge(&self, a: VertexId, b: VertexId) -> Option<EdgeId> {
        self.edge_lookup.get(&edge_key(a, b)).copied()
    }

    /// Vertex cycle of a face.
    #[inline]
    pub fn face_vertices(&self, f: FaceId) -> &[VertexId] {
        self.face(f).vertices()
    }

    /// Edges of a face, in cycle order (edge `i` joins corner `i` and `i + 1`).
    pub fn face_edges(&self, f: FaceId) -> Vec<EdgeId> {
        self.face(f)
            .sides()
            .filter_map(|(a, b)| self.find_edge(a, b))
            .collect()
    }

    /// Check if an edge has exactly one incident face.
    #[inline]
    pub fn is_boundary_edge(&self, e: EdgeId) -> bool {
        self.edge(e).is_boundary()
    }

    /// Check if a vertex is on the boundary (or isolated).
    pub fn is_boundary_vertex(&self, v: VertexId) -> bool {
        let edges = self.vertex_edges(v);
        edges.is_empty() || edges.iter().any(|&e| self.edge(e).face_count() < 2)
    }

    // ==================== Iteration ====================

    /// Iterate over live vertex handles.
    pub fn vertex_ids(&self) -> impl Iterator<Item = VertexId> + '_ {
        self.vertices
            .iter()
            .enumerate()
            .filter(|(_, v)| v.is_some())
            .map(|(i, _)| VertexId::new(i))
    }

    /// Iterate over live vertices with their handles.
    pub fn vertices(&self) -> impl Iterator<Item = (VertexId, &Vertex)> + '_ {
        self.vertices
            .iter()
            .enumerate()
            .filter_map(|(i, v)| v.as_ref().map(|v| (VertexId::new(i), v)))
    }

    /// Iterate over live edge handles.
    pub fn edge_ids(&self) -> impl Iterator<Item = EdgeId> + '_ {
        self.edges
            .iter()
            .enumerate()
            .filter(|(_, e)| e.is_some())
            .map(|(i, _)| EdgeId::new(i))
    }

    /// Iterate over live edges with their handles.
    pub fn edges(&self) -> impl Iterator<Item = (EdgeId, &Edge)> + '_ {
        self.edges
            .iter()
            .enumerate()
            .filter_map(|(i, e)| e.as_ref().map(|e| (EdgeId::new(i), e)))
    }

    /// Iterate over live face handles.
    pub fn face_ids(&self) -> impl Iterator<Item = FaceId> + '_ {
        self.faces
            .iter()
            .enumerate()
            .filter(|(_, f)| f.is_some())
            .map(|(i, _)| FaceId::new(i))
    }

    /// Iterate over live faces with their handles.
    pub fn faces(&self) -> impl Iterator<Item = (FaceId, &Face)> + '_ {
        self.faces
            .iter()
            .enumerate()
            .filter_map(|(i, f)| f.as_ref().map(|f| (FaceId::new(i), f)))
    }

    // ==================== Classification ====================

    /// Check if all faces are triangles.
    pub fn is_triangle_mesh(&self) -> bool {
        self.faces().all(|(_, f)| f.is_triangle())
    }

    /// Check if all faces are quads.
    pub fn is_quad_mesh(&self) -> bool {
        self.faces().all(|(_, f)| f.is_quad())
    }

    /// Number of triangle faces.
    pub fn num_triangles(&self) -> usize {
        self.faces().filter(|(_, f)| f.is_triangle()).count()
    }

    /// Number of quad faces.
    pub fn num_quads(&self) -> usize {
        self.faces().filter(|(_, f)| f.is_quad()).count()
    }

    /// Fraction of faces that are quads (0 for a mesh without faces).
    pub fn quad_ratio(&self) -> f64 {
        if self.live_faces == 0 {
            return 0.0;
        }
        self.num_quads() as f64 / self.live_faces as f64
    }

    /// Euler characteristic `V - E + F` over live elements.
    pub fn euler_characteristic(&self) -> i64 {
        self.live_vertices as i64 - self.live_edges as i64 + self.live_faces as i64
    }

    // ==================== Insertion ====================

    /// Add a new visible vertex and return its handle.
    pub fn add_vertex(&mut self, position: Point3<f64>) -> VertexId {
        self.insert_vertex(Vertex::new(position))
    }

    /// Add a fully specified vertex and return its handle.
    pub fn insert_vertex(&mut self, vertex: Vertex) -> VertexId {
        let id = VertexId::new(self.vertices.len());
        self.vertices.push(Some(vertex));
        self.vertex_edges.push(Vec::new());
        self.live_vertices += 1;
        id
    }

    /// Return the edge joining `a` and `b`, creating it if needed.
    pub fn add_edge(&mut self, a: VertexId, b: VertexId) -> Result<EdgeId> {
        if a == b {
            return Err(EngineError::invalid_edit(format!(
                "edge endpoints must differ ({:?})",
                a
            )));
        }
        for v in [a, b] {
            if !self.is_vertex_alive(v) {
                return Err(EngineError::invalid_edit(format!("vertex {:?} is not alive", v)));
            }
        }
        Ok(self.ensure_edge(a, b))
    }

    fn ensure_edge(&mut self, a: VertexId, b: VertexId) -> EdgeId {
        if let Some(e) = self.find_edge(a, b) {
            return e;
        }
        let id = EdgeId::new(self.edges.len());
        self.edges.push(Some(Edge::new(a, b)));
        self.edge_lookup.insert(edge_key(a, b), id);
        self.vertex_edges[a.index()].push(id);
        self.vertex_edges[b.index()].push(id);
        self.live_edges += 1;
        id
    }

    /// Add a face from a vertex cycle, creating missing edges.
    ///
    /// Fails without modifying the mesh if the cycle has fewer than three
    /// vertices, repeats a vertex, names a dead vertex, or would give an
    /// existing edge a third face.
    pub fn add_face(&mut self, cycle: &[VertexId]) -> Result<FaceId> {
        self.check_face(cycle)?;

        let id = FaceId::new(self.faces.len());
        let n = cycle.len();
        for i in 0..n {
            let e = self.ensure_edge(cycle[i], cycle[(i + 1) % n]);
            if let Some(edge) = self.edges[e.index()].as_mut() {
                edge.attach(id);
            }
        }
        self.faces.push(Some(Face {
            vertices: cycle.to_vec(),
        }));
        self.live_faces += 1;
        Ok(id)
    }

    /// Check whether [`Mesh::add_face`] would accept `cycle`.
    pub fn check_face(&self, cycle: &[VertexId]) -> Result<()> {
        let n = cycle.len();
        if n < 3 {
            return Err(EngineError::invalid_edit(format!(
                "face needs at least 3 vertices, got {}",
                n
            )));
        }
        for (i, &v) in cycle.iter().enumerate() {
            if !self.is_vertex_alive(v) {
                return Err(EngineError::invalid_edit(format!("vertex {:?} is not alive", v)));
            }
            if cycle[..i].contains(&v) {
                return Err(EngineError::invalid_edit(format!(
                    "face repeats vertex {:?}",
                    v
                )));
            }
        }
        for i in 0..n {
            let (a, b) = (cycle[i], cycle[(i + 1) % n]);
            if let Some(e) = self.find_edge(a, b) {
                if self.edge(e).face_count() >= 2 {
                    return Err(EngineError::invalid_edit(format!(
                        "edge {:?} ({:?}, {:?}) already has two faces",
                        e, a, b
                    )));
                }
            }
        }
        Ok(())
    }

    // ==================== Removal ====================

    /// Remove a face, detaching it from its edges. Edges are kept.
    pub fn remove_face(&mut self, f: FaceId) -> Result<Face> {
        let face = match self.faces.get_mut(f.index()).and_then(Option::take) {
            Some(face) => face,
            None => {
                return Err(EngineError::invalid_edit(format!("face {:?} is not alive", f)));
            }
        };
        for (a, b) in face.sides() {
            if let Some(e) = self.find_edge(a, b) {
                if let Some(edge) = self.edges[e.index()].as_mut() {
                    edge.detach(f);
                }
            }
        }
        self.live_faces -= 1;
        Ok(face)
    }

    /// Remove an edge that has no incident faces.
    pub fn remove_edge(&mut self, e: EdgeId) -> Result<()> {
        let edge = self
            .try_edge(e)
            .ok_or_else(|| EngineError::invalid_edit(format!("edge {:?} is not alive", e)))?;
        if edge.face_count() > 0 {
            return Err(EngineError::invalid_edit(format!(
                "edge {:?} still has {} face(s)",
                e,
                edge.face_count()
            )));
        }
        let [a, b] = edge.vertices();
        self.edges[e.index()] = None;
        self.edge_lookup.remove(&edge_key(a, b));
        self.vertex_edges[a.index()].retain(|&x| x != e);
        self.vertex_edges[b.index()].retain(|&x| x != e);
        self.live_edges -= 1;
        Ok(())
    }

    /// Remove a vertex that has no incident edges.
    pub fn remove_vertex(&mut self, v: VertexId) -> Result<Vertex> {
        if !self.is_vertex_alive(v) {
            return Err(EngineError::invalid_edit(format!("vertex {:?} is not alive", v)));
        }
        if !self.vertex_edges[v.index()].is_empty() {
            return Err(EngineError::invalid_edit(format!(
                "vertex {:?} still has {} edge(s)",
                v,
                self.vertex_edges[v.index()].len()
            )));
        }
        self.live_vertices -= 1;
        self.vertices[v.index()]
            .take()
            .ok_or_else(|| EngineError::invalid_edit(format!("vertex {:?} is not alive", v)))
    }

    // ==================== Validation ====================

    /// Check every cross-reference, returning the first inconsistency found.
    pub fn validate(&self) -> Result<()> {
        let broken = |msg: String| Err(EngineError::InvalidMesh(msg));

        if self.vertices().count() != self.live_vertices
            || self.edges().count() != self.live_edges
            || self.faces().count() != self.live_faces
        {
            return broken("live element counters are out of sync".into());
        }
        if self.vertex_edges.len() != self.vertices.len() {
            return broken("vertex adjacency table has the wrong length".into());
        }

        for (i, slot) in self.vertices.iter().enumerate() {
            let v = VertexId::new(i);
            if slot.is_none() && !self.vertex_edges[i].is_empty() {
                return broken(format!("dead vertex {:?} still has edges", v));
            }
            for &e in &self.vertex_edges[i] {
                match self.try_edge(e) {
                    Some(edge) if edge.contains(v) => {}
                    _ => return broken(format!("vertex {:?} lists foreign edge {:?}", v, e)),
                }
            }
        }

        for (e, edge) in self.edges() {
            let [a, b] = edge.vertices();
            if a == b || !self.is_vertex_alive(a) || !self.is_vertex_alive(b) {
                return broken(format!("edge {:?} has invalid endpoints", e));
            }
            if !self.vertex_edges[a.index()].contains(&e)
                || !self.vertex_edges[b.index()].contains(&e)
            {
                return broken(format!("edge {:?} missing from endpoint adjacency", e));
            }
            if self.find_edge(a, b) != Some(e) {
                return broken(format!("edge {:?} missing from lookup", e));
            }
            let faces = edge.faces();
            if faces.len() == 2 && faces[0] == faces[1] {
                return broken(format!("edge {:?} lists the same face twice", e));
            }
            for &f in faces {
                match self.try_face(f) {
                    Some(face) if face.sides().any(|(x, y)| edge_key(x, y) == edge_key(a, b)) => {}
                    _ => return broken(format!("edge {:?} lists foreign face {:?}", e, f)),
                }
            }
        }
        if self.edge_lookup.len() != self.live_edges {
            return broken("edge lookup has stale entries".into());
        }

        for (f, face) in self.faces() {
            let verts = face.vertices();
            if verts.len() < 3 {
                return broken(format!("face {:?} has fewer than 3 vertices", f));
            }
            for (i, &v) in verts.iter().enumerate() {
                if !self.is_vertex_alive(v) {
                    return broken(format!("face {:?} references dead vertex {:?}", f, v));
                }
                if verts[..i].contains(&v) {
                    return broken(format!("face {:?} repeats vertex {:?}", f, v));
                }
            }
            for (a, b) in face.sides() {
                match self.find_edge(a, b) {
                    Some(e) if self.edge(e).faces().contains(&f) => {}
                    _ => {
                        return broken(format!("face {:?} side ({:?}, {:?}) has no edge", f, a, b))
                    }
                }
            }
        }

        Ok(())
    }

    /// Check if the mesh is valid (all connectivity is consistent).
    pub fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }

    // ==================== Compaction ====================

    /// A dense copy of the mesh with tombstones removed.
    ///
    /// Vertex attributes, wire edges and face winding are preserved; handles are
    /// renumbered in ascending order of their old values.
    pub fn compacted(&self) -> Mesh {
        let mut out = Mesh::with_capacity(self.live_vertices, self.live_faces);
        let mut remap = vec![VertexId::INVALID; self.vertices.len()];
        for (v, vertex) in self.vertices() {
            remap[v.index()] = out.insert_vertex(vertex.clone());
        }
        for (_, edge) in self.edges() {
            let [a, b] = edge.vertices();
            out.ensure_edge(remap[a.index()], remap[b.index()]);
        }
        for (_, face) in self.faces() {
            let cycle: Vec<VertexId> = face.vertices().iter().map(|v| remap[v.index()]).collect();
            // The source mesh satisfies the same invariants.
            let _ = out.add_face(&cycle);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quad_strip() -> (Mesh, [VertexId; 6]) {
        let mut mesh = Mesh::new();
        let v = [
            mesh.add_vertex(Point3::new(0.0, 0.0, 0.0)),
            mesh.add_vertex(Point3::new(1.0, 0.0, 0.0)),
            mesh.add_vertex(Point3::new(1.0, 1.0, 0.0)),
            mesh.add_vertex(Point3::new(0.0, 1.0, 0.0)),
            mesh.add_vertex(Point3::new(2.0, 0.0, 0.0)),
            mesh.add_vertex(Point3::new(2.0, 1.0, 0.0)),
        ];
        mesh.add_face(&[v[0], v[1], v[2], v[3]]).unwrap();
        mesh.add_face(&[v[1], v[4], v[5], v[2]]).unwrap();
        (mesh, v)
    }

    #[test]
    fn test_empty_mesh() {
        let mesh = Mesh::new();
        assert_eq!(mesh.num_vertices(), 0);
        assert_eq!(mesh.num_edges(), 0);
        assert_eq!(mesh.num_faces(), 0);
        assert!(mesh.is_empty());
        assert!(mesh.is_valid());
    }

    #[test]
    fn test_add_faces_shares_edges() {
        let (mesh, v) = quad_strip();
        assert_eq!(mesh.num_vertices(), 6);
        assert_eq!(mesh.num_edges(), 7);
        assert_eq!(mesh.num_faces(), 2);
        assert!(mesh.is_valid());
        assert!(mesh.is_quad_mesh());

        let shared = mesh.find_edge(v[2], v[1]).unwrap();
        assert_eq!(mesh.edge_faces(shared).len(), 2);
        assert!(!mesh.is_boundary_edge(shared));
        assert_eq!(mesh.valence(v[1]), 3);
        assert_eq!(mesh.vertex_faces(v[1]).len(), 2);
        assert!(mesh.is_boundary_vertex(v[1]));
    }

    #[test]
    fn test_third_face_on_edge_is_rejected() {
        let (mut mesh, v) = quad_strip();
        let extra = mesh.add_vertex(Point3::new(1.0, 0.5, 1.0));
        let before_edges = mesh.num_edges();

        let err = mesh.add_face(&[v[1], v[2], extra]).unwrap_err();
        assert!(matches!(err, EngineError::InvalidEdit(_)));
        assert_eq!(mesh.num_edges(), before_edges);
        assert!(mesh.is_valid());
    }

    #[test]
    fn test_bad_cycles_are_rejected() {
        let (mut mesh, v) = quad_strip();
        assert!(mesh.add_face(&[v[0], v[1]]).is_err());
        assert!(mesh.add_face(&[v[0], v[4], v[0]]).is_err());
        assert!(mesh.add_face(&[v[0], v[4], VertexId::new(99)]).is_err());
        assert!(mesh.is_valid());
    }

    #[test]
    fn test_remove_face_then_edge_then_vertex() {
        let (mut mesh, v) = quad_strip();
        let f = mesh.face_ids().nth(1).unwrap();
        mesh.remove_face(f).unwrap();
        assert!(!mesh.is_face_alive(f));
        assert_eq!(mesh.num_faces(), 1);

        // The vertex still has edges, so it cannot go yet.
        assert!(mesh.remove_vertex(v[4]).is_err());

        for e in mesh.vertex_edges(v[4]).to_vec() {
            mesh.remove_edge(e).unwrap();
        }
        mesh.remove_vertex(v[4]).unwrap();
        assert!(!mesh.is_vertex_alive(v[4]));
        assert_eq!(mesh.num_vertices(), 5);
        assert!(mesh.is_valid());

        // Handles are not reused.
        let fresh = mesh.add_vertex(Point3::origin());
        assert_ne!(fresh, v[4]);
    }

    #[test]
    fn test_remove_edge_with_faces_fails() {
        let (mut mesh, v) = quad_strip();
        let e = mesh.find_edge(v[0], v[1]).unwrap();
        assert!(mesh.remove_edge(e).is_err());
        assert!(mesh.is_edge_alive(e));
    }

    #[test]
    fn test_compacted_preserves_attributes() {
        let (mut mesh, v) = quad_strip();
        mesh.set_density(v[5], Some(2.5));
        mesh.set_hidden(v[3], true);
        let f = mesh.face_ids().next().unwrap();
        mesh.remove_face(f).unwrap();
        for (a, b) in [(0, 1), (3, 0), (2, 3)] {
            let e = mesh.find_edge(v[a], v[b]).unwrap();
            mesh.remove_edge(e).unwrap();
        }
        mesh.remove_vertex(v[0]).unwrap();
        mesh.remove_vertex(v[3]).unwrap();

        let dense = mesh.compacted();
        assert!(dense.is_valid());
        assert_eq!(dense.vertex_slots(), 4);
        assert_eq!(dense.num_faces(), 1);
        assert_eq!(dense.density(VertexId::new(3)), Some(2.5));
    }

    #[test]
    fn test_euler_characteristic_of_open_strip() {
        let (mesh, _) = quad_strip();
        assert_eq!(mesh.euler_characteristic(), 1);
    }
}
