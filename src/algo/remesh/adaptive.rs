//! Curvature-driven adaptive refinement.

use tracing::debug;

use super::{ensure_non_empty, RemeshReport, Stage, StageRunner};
use crate::algo::curvature::compute_curvature;
use crate::algo::density::local_density;
use crate::algo::edit::subdivide_edges;
use crate::algo::smooth::{laplacian_smooth, SmoothOptions};
use crate::algo::RemeshControl;
use crate::error::{ensure_positive, Result};
use crate::mesh::{EdgeId, Mesh};

/// Curvature an edge must exceed at density 1.0 to be subdivided.
const BASE_THRESHOLD: f64 = 0.5;

/// Strength of the relaxation passes that follow subdivision.
const RELAX_FACTOR: f64 = 0.3;

/// Options for adaptive remeshing.
#[derive(Debug, Clone)]
pub struct AdaptiveOptions {
    /// Global density multiplier (default: 1.0). Must be finite and > 0.
    pub density: f64,

    /// Number of relaxation passes after subdivision (default: 5).
    pub iterations: usize,

    /// Whether to use parallel execution (default: true).
    pub parallel: bool,
}

impl Default for AdaptiveOptions {
    fn default() -> Self {
        Self::new(1.0)
    }
}

impl AdaptiveOptions {
    /// Create options with the given density.
    pub fn new(density: f64) -> Self {
        Self {
            density,
            iterations: 5,
            parallel: true,
        }
    }

    /// Set the number of relaxation passes.
    pub fn with_iterations(mut self, iterations: usize) -> Self {
        self.iterations = iterations;
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

    pub(super) fn validate(&self) -> Result<()> {
        ensure_positive("density", self.density)
    }
}

/// Refine a mesh where it is curved, then relax it.
///
/// # Errors
/// * [`EngineError::EmptyMesh`](crate::EngineError::EmptyMesh) if the mesh has no faces
/// * [`EngineError::InvalidParameter`](crate::EngineError::InvalidParameter) if the
///   density is not finite or not `> 0`
/// * [`EngineError::StageFailed`](crate::EngineError::StageFailed) if refinement fails
pub fn adaptive_remesh(mesh: &mut Mesh, options: &AdaptiveOptions) -> Result<RemeshReport> {
    adaptive_remesh_with_control(mesh, options, &RemeshControl::new())
}

/// [`adaptive_remesh`] with progress reporting and cancellation.
pub fn adaptive_remesh_with_control(
    mesh: &mut Mesh,
    options: &AdaptiveOptions,
    control: &RemeshControl,
) -> Result<RemeshReport> {
    ensure_non_empty(mesh)?;
    options.validate()?;

    let mut runner = StageRunner::new("adaptive", control, 1);
    runner.run(Stage::DensityRefinement, mesh, |mesh, report| {
        refine(mesh, options, report)
    })?;
    Ok(runner.finish(mesh))
}

/// Subdivide curved edges and relax the result. Shared by every pipeline that
/// refines adaptively.
pub(super) fn refine(
    mesh: &mut Mesh,
    options: &AdaptiveOptions,
    report: &mut RemeshReport,
) -> Result<()> {
    let selected = curved_edges(mesh, options.density, options.parallel);
    debug!(
        density = options.density,
        selected = selected.len(),
        edges = mesh.num_edges(),
        "selected edges for refinement"
    );

    if !selected.is_empty() {
        let split = subdivide_edges(mesh, &selected)?;
        report.split += split.split;
        report.skipped += split.skipped;
    }

    let smooth = SmoothOptions::new(RELAX_FACTOR, options.iterations).with_parallel(options.parallel);
    let movable = laplacian_smooth(mesh, &smooth)?;
    report.moved += movable * options.iterations;
    Ok(())
}

/// Edges whose mean endpoint curvature exceeds the density-scaled threshold.
fn curved_edges(mesh: &Mesh, density: f64, parallel: bool) -> Vec<EdgeId> {
    let curvature = compute_curvature(mesh, parallel);
    mesh.edges()
        .filter(|(_, edge)| {
            let [a, b] = edge.vertices();
            let threshold = BASE_THRESHOLD / (density * local_density(mesh, a, b));
            curvature.edge_mean(a, b) > threshold
        })
        .map(|(e, _)| e)
        .collect()
}
