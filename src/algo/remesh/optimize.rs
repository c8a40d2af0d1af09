//! Adaptive refinement followed by extraordinary-vertex relaxation.

use super::adaptive::{refine, AdaptiveOptions};
use super::{ensure_non_empty, RemeshReport, Stage, StageRunner};
use crate::algo::smooth::optimize_topology;
use crate::algo::RemeshControl;
use crate::error::Result;
use crate::mesh::Mesh;

/// Options for [`optimize_remesh`].
#[derive(Debug, Clone)]
pub struct OptimizeOptions {
    /// Global density multiplier (default: 1.0). Must be finite and > 0.
    pub density: f64,

    /// Relaxation passes over extraordinary vertices (default: 3).
    pub topology_passes: usize,

    /// Whether to use parallel execution (default: true).
    pub parallel: bool,
}

impl Default for OptimizeOptions {
    fn default() -> Self {
        Self::new(1.0)
    }
}

impl OptimizeOptions {
    /// Create options with the given density.
    pub fn new(density: f64) -> Self {
        Self {
            density,
            topology_passes: 3,
            parallel: true,
        }
    }

    /// Set the number of extraordinary-vertex relaxation passes.
    pub fn with_topology_passes(mut self, passes: usize) -> Self {
        self.topology_passes = passes;
        self
    }

    /// Set whether to use parallel execution.
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    fn adaptive(&self) -> AdaptiveOptions {
        AdaptiveOptions::new(self.density).with_parallel(self.parallel)
    }
}

/// Refine adaptively, then pull extraordinary vertices toward their neighbours
/// so the result deforms more evenly.
///
/// # Errors
/// * [`EngineError::EmptyMesh`](crate::EngineError::EmptyMesh) if the mesh has no faces
/// * [`EngineError::InvalidParameter`](crate::EngineError::InvalidParameter) for a bad density
/// * [`EngineError::StageFailed`](crate::EngineError::StageFailed) if a stage fails
pub fn optimize_remesh(mesh: &mut Mesh, options: &OptimizeOptions) -> Result<RemeshReport> {
    optimize_remesh_with_control(mesh, options, &RemeshControl::new())
}

/// [`optimize_remesh`] with progress reporting and cancellation.
pub fn optimize_remesh_with_control(
    mesh: &mut Mesh,
    options: &OptimizeOptions,
    control: &RemeshControl,
) -> Result<RemeshReport> {
    ensure_non_empty(mesh)?;
    let adaptive = options.adaptive();
    adaptive.validate()?;

    let mut runner = StageRunner::new("optimize", control, 2);
    runner.run(Stage::DensityRefinement, mesh, |mesh, report| {
        refine(mesh, &adaptive, report)
    })?;
    runner.run(Stage::Smoothing, mesh, |mesh, report| {
        for _ in 0..options.topology_passes {
            report.moved += optimize_topology(mesh, options.parallel)?;
        }
        Ok(())
    })?;
    Ok(runner.finish(mesh))
}
