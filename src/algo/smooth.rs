//! Mesh smoothing.
//!
//! - [`laplacian_smooth`]: move vertices toward the centroid of their visible
//!   neighbours.
//! - [`optimize_topology`]: gently relax extraordinary vertices (valence ≠ 4).
//!
//! Both are double-buffered: a pass reads a snapshot of every position and
//! writes a fresh buffer that replaces the old one once the pass is done. The
//! outcome does not depend on vertex order, so the parallel and sequential paths
//! produce identical results.
//!
//! # Example
//!
//! ```
//! use quadmesh::algo::smooth::{laplacian_smooth, SmoothOptions};
//! use quadmesh::mesh::primitives;
//!
//! let mut mesh = primitives::uv_sphere(1.0, 8, 6).unwrap();
//! let options = SmoothOptions::default().with_iterations(5).with_factor(0.3);
//! laplacian_smooth(&mut mesh, &options).unwrap();
//! ```

use nalgebra::{Point3, Vector3};
use rayon::prelude::*;
use tracing::debug;

use crate::error::{EngineError, Result};
use crate::mesh::{Mesh, VertexId};

use super::Progress;

/// Pull applied to extraordinary vertices by [`optimize_topology`].
pub const EXTRAORDINARY_PULL: f64 = 0.1;

/// Options for Laplacian smoothing.
#[derive(Debug, Clone)]
pub struct SmoothOptions {
    /// Fraction of the way each vertex moves toward its neighbour centroid
    /// (0.0 to 1.0).
    pub factor: f64,

    /// Number of smoothing passes.
    pub iterations: usize,

    /// Keep boundary vertices fixed (default: false).
    pub preserve_boundary: bool,

    /// Whether to use parallel execution (default: true).
    pub parallel: bool,
}

impl Default for SmoothOptions {
    fn default() -> Self {
        Self {
            factor: 0.5,
            iterations: 1,
            preserve_boundary: false,
            parallel: true,
        }
    }
}

impl SmoothOptions {
    /// Create options with the given factor and number of passes.
    pub fn new(factor: f64, iterations: usize) -> Self {
        Self {
            factor,
            iterations,
            ..Self::default()
        }
    }

    /// Set the smoothing factor.
    pub fn with_factor(mut self, factor: f64) -> Self {
        self.factor = factor;
        self
    }

    /// Set the number of passes.
    pub fn with_iterations(mut self, iterations: usize) -> Self {
        self.iterations = iterations;
        self
    }

    /// Pin (or release) boundary vertices.
    pub fn with_preserve_boundary(mut self, preserve: bool) -> Self {
        self.preserve_boundary = preserve;
        self
    }

    /// Set whether to use parallel execution.
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Create options for single-threaded execution.
    pub fn sequential(mut self) -> Self {
        self.parallel = false;
        self
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if !self.factor.is_finite() {
            return Err(EngineError::invalid_param("factor", self.factor, "must be finite"));
        }
        if !(0.0..=1.0).contains(&self.factor) {
            return Err(EngineError::invalid_param(
                "factor",
                self.factor,
                "must be in [0, 1]",
            ));
        }
        Ok(())
    }
}

/// Performs Laplacian smoothing on a mesh.
///
/// Every visible vertex with at least one edge moves toward the mean of its
/// visible neighbours: `new = old + factor * (mean - old)`. Hidden vertices
/// never move and are ignored as neighbours. A vertex whose neighbours are all
/// hidden stays put. Returns the number of vertices eligible to move.
///
/// # Errors
/// * [`EngineError::EmptyMesh`] if the mesh has no vertices
/// * [`EngineError::InvalidParameter`] if `factor` is outside `[0, 1]` or not finite
pub fn laplacian_smooth(mesh: &mut Mesh, options: &SmoothOptions) -> Result<usize> {
    laplacian_smooth_with_progress(mesh, options, &Progress::none())
}

/// [`laplacian_smooth`] reporting once per pass.
pub fn laplacian_smooth_with_progress(
    mesh: &mut Mesh,
    options: &SmoothOptions,
    progress: &Progress,
) -> Result<usize> {
    if mesh.is_empty() {
        return Err(EngineError::EmptyMesh);
    }
    options.validate()?;

    let movable = movable_mask(mesh, options.preserve_boundary);
    let moved = if options.iterations == 0 {
        0
    } else {
        movable.iter().filter(|&&m| m).count()
    };
    for iter in 0..options.iterations {
        progress.report(iter, options.iterations, "Laplacian smoothing");
        let next = smoothed_positions(mesh, &movable, options.factor, options.parallel, true);
        apply_positions(mesh, next);
    }
    progress.report(options.iterations, options.iterations, "Laplacian smoothing");

    debug!(
        factor = options.factor,
        iterations = options.iterations,
        moved,
        "laplacian smoothing done"
    );
    Ok(moved)
}

/// Relax extraordinary vertices toward the mean of their neighbours.
///
/// Every visible vertex with valence ≥ 1 and ≠ 4 moves toward the mean of all
/// its neighbours (hidden ones included) by [`EXTRAORDINARY_PULL`]. Returns the
/// number of vertices moved.
pub fn optimize_topology(mesh: &mut Mesh, parallel: bool) -> Result<usize> {
    if mesh.is_empty() {
        return Err(EngineError::EmptyMesh);
    }

    let movable: Vec<bool> = (0..mesh.vertex_slots())
        .map(|i| {
            let v = VertexId::new(i);
            mesh.is_vertex_alive(v) && !mesh.is_hidden(v) && {
                let valence = mesh.valence(v);
                valence >= 1 && valence != 4
            }
        })
        .collect();
    let moved = movable.iter().filter(|&&m| m).count();

    let next = smoothed_positions(mesh, &movable, EXTRAORDINARY_PULL, parallel, false);
    apply_positions(mesh, next);

    debug!(moved, "relaxed extraordinary vertices");
    Ok(moved)
}

/// Per-slot flag: live, visible, has at least one edge, and not a pinned
/// boundary vertex.
fn movable_mask(mesh: &Mesh, preserve_boundary: bool) -> Vec<bool> {
    (0..mesh.vertex_slots())
        .map(|i| {
            let v = VertexId::new(i);
            mesh.is_vertex_alive(v)
                && !mesh.is_hidden(v)
                && mesh.valence(v) > 0
                && !(preserve_boundary && mesh.is_boundary_vertex(v))
        })
        .collect()
}

/// One double-buffered averaging pass. Dead slots come back as `None`.
fn smoothed_positions(
    mesh: &Mesh,
    movable: &[bool],
    factor: f64,
    parallel: bool,
    visible_neighbours_only: bool,
) -> Vec<Option<Point3<f64>>> {
    let step = |i: usize| -> Option<Point3<f64>> {
        let v = VertexId::new(i);
        let pos = mesh.try_vertex(v)?.position;
        if !movable[i] {
            return Some(pos);
        }
        Some(relax_vertex(mesh, v, pos, factor, visible_neighbours_only))
    };
    if parallel {
        (0..mesh.vertex_slots()).into_par_iter().map(step).collect()
    } else {
        (0..mesh.vertex_slots()).map(step).collect()
    }
}

fn relax_vertex(
    mesh: &Mesh,
    v: VertexId,
    pos: Point3<f64>,
    factor: f64,
    visible_neighbours_only: bool,
) -> Point3<f64> {
    let mut sum = Vector3::zeros();
    let mut count = 0usize;
    for n in mesh.vertex_neighbors(v) {
        if visible_neighbours_only && mesh.is_hidden(n) {
            continue;
        }
        sum += mesh.position(n).coords;
        count += 1;
    }
    if count == 0 {
        return pos;
    }
    let centroid = Point3::from(sum / count as f64);
    pos + (centroid - pos) * factor
}

fn apply_positions(mesh: &mut Mesh, positions: Vec<Option<Point3<f64>>>) {
    for (i, pos) in positions.into_iter().enumerate() {
        if let Some(pos) = pos {
            mesh.set_position(VertexId::new(i), pos);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::{build_from_triangles, primitives};

    fn create_fan() -> Mesh {
        // Centre vertex 0 lifted above a flat hexagon.
        let mut vertices = vec![Point3::new(0.0, 0.0, 1.0)];
        for k in 0..6 {
            let a = std::f64::consts::TAU * k as f64 / 6.0;
            vertices.push(Point3::new(a.cos(), a.sin(), 0.0));
        }
        let faces: Vec<[usize; 3]> = (0..6).map(|k| [0, 1 + k, 1 + (k + 1) % 6]).collect();
        build_from_triangles(&vertices, &faces).unwrap()
    }

    fn positions(mesh: &Mesh) -> Vec<Point3<f64>> {
        mesh.vertex_ids().map(|v| *mesh.position(v)).collect()
    }

    #[test]
    fn test_zero_factor_is_identity() {
        let mut mesh = primitives::uv_sphere(1.0, 8, 5).unwrap();
        let before = positions(&mesh);
        laplacian_smooth(&mut mesh, &SmoothOptions::new(0.0, 7)).unwrap();
        assert_eq!(positions(&mesh), before);
    }

    #[test]
    fn test_centre_vertex_moves_toward_ring() {
        let mut mesh = create_fan();
        let options = SmoothOptions::new(0.5, 1).with_preserve_boundary(true);
        laplacian_smooth(&mut mesh, &options).unwrap();

        // The ring centroid is the origin, so z halves.
        let centre = mesh.position(VertexId::new(0));
        assert!((centre.z - 0.5).abs() < 1e-10);
        assert!(centre.x.abs() < 1e-10 && centre.y.abs() < 1e-10);
        // Boundary pinned.
        assert!((mesh.position(VertexId::new(1)).x - 1.0).abs() < 1e-10);
    }

    #[test]
    fn test_hidden_vertices_are_fixed_and_ignored() {
        let mut mesh = create_fan();
        for k in 1..=6 {
            mesh.set_hidden(VertexId::new(k), true);
        }
        let before = positions(&mesh);
        laplacian_smooth(&mut mesh, &SmoothOptions::new(1.0, 3)).unwrap();
        // All neighbours of the centre are hidden and the ring never moves.
        assert_eq!(positions(&mesh), before);
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let mut a = primitives::uv_sphere(1.0, 10, 7).unwrap();
        let v = VertexId::new(5);
        let bumped = Point3::from(a.position(v).coords * 1.3);
        a.set_position(v, bumped);
        let mut b = a.clone();

        laplacian_smooth(&mut a, &SmoothOptions::new(0.4, 4)).unwrap();
        laplacian_smooth(&mut b, &SmoothOptions::new(0.4, 4).sequential()).unwrap();
        assert_eq!(positions(&a), positions(&b));
    }

    #[test]
    fn test_invalid_factor_and_empty_mesh() {
        let mut mesh = create_fan();
        for bad in [-0.1, 1.5, f64::NAN, f64::INFINITY] {
            let err = laplacian_smooth(&mut mesh, &SmoothOptions::new(bad, 1)).unwrap_err();
            assert!(matches!(err, EngineError::InvalidParameter { name: "factor", .. }));
        }
        let mut empty = Mesh::new();
        assert!(matches!(
            laplacian_smooth(&mut empty, &SmoothOptions::default()),
            Err(EngineError::EmptyMesh)
        ));
    }

    #[test]
    fn test_optimize_topology_moves_extraordinary_only() {
        // Interior vertices of a quad grid have valence 4.
        let mut mesh = primitives::quad_grid(3, 3.0).unwrap();
        let interior = VertexId::new(5);
        assert_eq!(mesh.valence(interior), 4);
        let before = *mesh.position(interior);

        let moved = optimize_topology(&mut mesh, true).unwrap();
        assert_eq!(*mesh.position(interior), before);
        // 4 corners (valence 2) and 8 edge vertices (valence 3).
        assert_eq!(moved, 12);

        // A corner moves 10% toward the mean of its two neighbours.
        let corner = mesh.position(VertexId::new(0));
        assert!((corner.x - 0.05).abs() < 1e-10);
        assert!((corner.y - 0.05).abs() < 1e-10);
    }
}
