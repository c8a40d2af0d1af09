//! Uniform remeshing around a target edge length.

use tracing::debug;

use super::{ensure_non_empty, RemeshReport, Stage, StageRunner};
use crate::algo::edit::{collapse_short_edges, subdivide_edges};
use crate::algo::RemeshControl;
use crate::error::{ensure_positive, Result};
use crate::mesh::{EdgeId, Mesh};

/// Edges longer than this multiple of the target are split.
const SPLIT_FACTOR: f64 = 1.5;

/// Interior edges shorter than this multiple of the target are collapsed.
const COLLAPSE_FACTOR: f64 = 0.5;

/// Options for uniform remeshing.
#[derive(Debug, Clone)]
pub struct UniformOptions {
    /// Desired edge length. Must be finite and > 0.
    pub target_edge_length: f64,
}

impl Default for UniformOptions {
    fn default() -> Self {
        Self::new(1.0)
    }
}

impl UniformOptions {
    /// Create options with the given target edge length.
    pub fn new(target_edge_length: f64) -> Self {
        Self { target_edge_length }
    }
}

/// Pull edge lengths toward a target.
///
/// One pass splits every edge longer than `1.5 × target` at its midpoint. The
/// post-split edge set is then scanned for edges shorter than `0.5 × target`
/// with two incident faces, which are collapsed one at a time. Unsafe collapses
/// are skipped and counted.
///
/// # Errors
/// * [`EngineError::EmptyMesh`](crate::EngineError::EmptyMesh) if the mesh has no faces
/// * [`EngineError::InvalidParameter`](crate::EngineError::InvalidParameter) if the
///   target is not finite or not `> 0`
/// * [`EngineError::StageFailed`](crate::EngineError::StageFailed) if an edit batch fails
pub fn uniform_remesh(mesh: &mut Mesh, options: &UniformOptions) -> Result<RemeshReport> {
    uniform_remesh_with_control(mesh, options, &RemeshControl::new())
}

/// [`uniform_remesh`] with progress reporting and cancellation.
pub fn uniform_remesh_with_control(
    mesh: &mut Mesh,
    options: &UniformOptions,
    control: &RemeshControl,
) -> Result<RemeshReport> {
    ensure_non_empty(mesh)?;
    ensure_positive("target_edge_length", options.target_edge_length)?;

    let target = options.target_edge_length;
    let mut runner = StageRunner::new("uniform", control, 1);
    runner.run(Stage::DensityRefinement, mesh, |mesh, report| {
        equalize(mesh, target, report)
    })?;
    Ok(runner.finish(mesh))
}

fn equalize(mesh: &mut Mesh, target: f64, report: &mut RemeshReport) -> Result<()> {
    let high = target * SPLIT_FACTOR;
    let low = target * COLLAPSE_FACTOR;

    let long: Vec<EdgeId> = mesh.edge_ids().filter(|&e| mesh.edge_length(e) > high).collect();
    if !long.is_empty() {
        let split = subdivide_edges(mesh, &long)?;
        report.split += split.split;
        report.skipped += split.skipped;
    }

    let short: Vec<EdgeId> = mesh
        .edges()
        .filter(|(e, edge)| edge.face_count() == 2 && mesh.edge_length(*e) < low)
        .map(|(e, _)| e)
        .collect();
    if !short.is_empty() {
        let collapse = collapse_short_edges(mesh, &short)?;
        report.collapsed += collapse.collapsed;
        report.skipped += collapse.skipped;
    }

    debug!(
        target,
        long = long.len(),
        short = short.len(),
        "uniform pass"
    );
    Ok(())
}
