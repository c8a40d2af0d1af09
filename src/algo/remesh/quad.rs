//! The quad remeshing entry point.

use super::adaptive::{refine, AdaptiveOptions};
use super::{ensure_non_empty, RemeshReport, Stage, StageRunner};
use crate::algo::edit::convert_to_quads;
use crate::algo::smooth::{laplacian_smooth, SmoothOptions};
use crate::algo::RemeshControl;
use crate::error::{ensure_positive, Result};
use crate::mesh::Mesh;

/// Options for [`remesh_quad`].
#[derive(Debug, Clone)]
pub struct QuadRemeshOptions {
    /// Global density multiplier (default: 1.0). Must be finite and > 0.
    pub density: f64,

    /// Whether to run the final smoothing stage (default: true).
    pub use_smooth: bool,

    /// Strength of the final smoothing (default: 0.5).
    pub smooth_factor: f64,

    /// Passes of final smoothing (default: 2).
    pub smooth_iterations: usize,

    /// Relaxation passes inside adaptive refinement (default: 5).
    pub refine_iterations: usize,

    /// Whether to use parallel execution (default: true).
    pub parallel: bool,
}

impl Default for QuadRemeshOptions {
    fn default() -> Self {
        Self::new(1.0)
    }
}

impl QuadRemeshOptions {
    /// Create options with the given density.
    pub fn new(density: f64) -> Self {
        Self {
            density,
            use_smooth: true,
            smooth_factor: 0.5,
            smooth_iterations: 2,
            refine_iterations: 5,
            parallel: true,
        }
    }

    /// Enable or disable the final smoothing stage.
    pub fn with_smooth(mut self, use_smooth: bool) -> Self {
        self.use_smooth = use_smooth;
        self
    }

    /// Set the final smoothing strength and pass count.
    pub fn with_smoothing(mut self, factor: f64, iterations: usize) -> Self {
        self.smooth_factor = factor;
        self.smooth_iterations = iterations;
        self
    }

    /// Set the relaxation passes used during refinement.
    pub fn with_refine_iterations(mut self, iterations: usize) -> Self {
        self.refine_iterations = iterations;
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

    fn smooth(&self) -> SmoothOptions {
        SmoothOptions::new(self.smooth_factor, self.smooth_iterations).with_parallel(self.parallel)
    }

    fn adaptive(&self) -> AdaptiveOptions {
        AdaptiveOptions::new(self.density)
            .with_iterations(self.refine_iterations)
            .with_parallel(self.parallel)
    }
}

/// Remesh toward quad-dominant topology, in place.
///
/// Stages:
/// 1. [`Stage::TriangleToQuad`]: one [`convert_to_quads`] pass
/// 2. [`Stage::DensityRefinement`]: adaptive refinement at `density`
/// 3. [`Stage::Smoothing`]: Laplacian smoothing, only when `use_smooth` is set
///
/// # Errors
/// * [`EngineError::EmptyMesh`](crate::EngineError::EmptyMesh) if the mesh has no
///   faces; the mesh is not touched
/// * [`EngineError::InvalidParameter`](crate::EngineError::InvalidParameter) for a bad
///   density or smoothing factor
/// * [`EngineError::StageFailed`](crate::EngineError::StageFailed) if a stage fails
pub fn remesh_quad(mesh: &mut Mesh, options: &QuadRemeshOptions) -> Result<RemeshReport> {
    remesh_quad_with_control(mesh, options, &RemeshControl::new())
}

/// [`remesh_quad`] with progress reporting and cancellation.
pub fn remesh_quad_with_control(
    mesh: &mut Mesh,
    options: &QuadRemeshOptions,
    control: &RemeshControl,
) -> Result<RemeshReport> {
    ensure_non_empty(mesh)?;
    ensure_positive("density", options.density)?;
    let smooth = options.smooth();
    if options.use_smooth {
        smooth.validate()?;
    }
    let adaptive = options.adaptive();

    let stages = if options.use_smooth { 3 } else { 2 };
    let mut runner = StageRunner::new("quad", control, stages);
    runner.run(Stage::TriangleToQuad, mesh, |mesh, report| {
        let merge = convert_to_quads(mesh);
        report.merged += merge.merged;
        report.skipped += merge.skipped;
        Ok(())
    })?;
    runner.run(Stage::DensityRefinement, mesh, |mesh, report| {
        refine(mesh, &adaptive, report)
    })?;
    if options.use_smooth {
        runner.run(Stage::Smoothing, mesh, |mesh, report| {
            report.moved += laplacian_smooth(mesh, &smooth)? * smooth.iterations;
            Ok(())
        })?;
    }
    Ok(runner.finish(mesh))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algo::progress::{CancelToken, Progress};
    use crate::error::EngineError;
    use crate::mesh::primitives;

    #[test]
    fn test_flat_grid_gains_quads() {
        let mut mesh = primitives::triangle_grid(4, 1.0).unwrap();
        let report = remesh_quad(&mut mesh, &QuadRemeshOptions::new(1.0)).unwrap();

        assert!(report.merged > 0);
        assert_eq!(report.split, 0);
        assert_eq!(mesh.num_quads(), report.merged);
        assert_eq!(mesh.num_triangles() + 2 * report.merged, 32);
        assert_eq!(
            report.stages,
            vec![
                Stage::Start,
                Stage::TriangleToQuad,
                Stage::DensityRefinement,
                Stage::Smoothing,
                Stage::Done
            ]
        );
    }

    #[test]
    fn test_without_smoothing() {
        let mut mesh = primitives::triangle_grid(2, 1.0).unwrap();
        let options = QuadRemeshOptions::new(1.0).with_smooth(false);
        let report = remesh_quad(&mut mesh, &options).unwrap();
        assert!(!report.completed(Stage::Smoothing));
        assert_eq!(report.last_stage(), Stage::Done);
    }

    #[test]
    fn test_sphere_is_quad_dominant() {
        let mut mesh = primitives::uv_sphere(1.0, 16, 10).unwrap();
        remesh_quad(&mut mesh, &QuadRemeshOptions::new(1.0)).unwrap();
        assert!(mesh.quad_ratio() > 0.5);
        assert!(mesh.is_valid());
    }

    #[test]
    fn test_repeated_runs_on_mixed_meshes() {
        // Alternating uniform and quad remeshing keeps producing mixed
        // triangle/quad neighbourhoods for the next run to split and collapse.
        use crate::algo::remesh::{uniform_remesh, UniformOptions};

        let shapes = [
            primitives::uv_sphere(1.0, 14, 9).unwrap(),
            primitives::triangle_grid(8, 1.0).unwrap(),
        ];
        for shape in shapes {
            let mut mesh = shape;
            for (target, density) in [(0.4, 1.0), (0.3, 2.0), (0.5, 1.5)] {
                uniform_remesh(&mut mesh, &UniformOptions::new(target)).unwrap();
                assert!(mesh.is_valid());
                remesh_quad(&mut mesh, &QuadRemeshOptions::new(density)).unwrap();
                assert!(mesh.is_valid());
            }
        }
    }

    #[test]
    fn test_empty_mesh_is_untouched() {
        let mut mesh = Mesh::new();
        let err = remesh_quad(&mut mesh, &QuadRemeshOptions::default()).unwrap_err();
        assert!(matches!(err, EngineError::EmptyMesh));
        assert!(mesh.is_empty());
    }

    #[test]
    fn test_invalid_parameters() {
        let mut mesh = primitives::triangle_cube().unwrap();
        let err = remesh_quad(&mut mesh, &QuadRemeshOptions::new(0.0)).unwrap_err();
        assert!(matches!(err, EngineError::InvalidParameter { .. }));

        let options = QuadRemeshOptions::new(1.0).with_smoothing(1.5, 2);
        let err = remesh_quad(&mut mesh, &options).unwrap_err();
        assert!(matches!(err, EngineError::InvalidParameter { .. }));
        assert_eq!(mesh.num_triangles(), 12);
    }

    #[test]
    fn test_cancel_before_start_leaves_mesh() {
        let cancel = CancelToken::new();
        cancel.cancel();
        let control = RemeshControl::new().with_cancel(cancel);
        let mut mesh = primitives::triangle_cube().unwrap();

        let err = remesh_quad_with_control(&mut mesh, &QuadRemeshOptions::new(1.0), &control)
            .unwrap_err();
        assert!(matches!(
            err,
            EngineError::Cancelled {
                last_completed: Stage::Start
            }
        ));
        assert_eq!(mesh.num_triangles(), 12);
    }

    #[test]
    fn test_cancel_between_stages() {
        let cancel = CancelToken::new();
        let trigger = cancel.clone();
        // Cancel as soon as refinement starts; the next checkpoint stops the run.
        let progress = Progress::new(move |_, _, message| {
            if message == Stage::DensityRefinement.name() {
                trigger.cancel();
            }
        });
        let control = RemeshControl::new().with_progress(progress).with_cancel(cancel);

        let mut mesh = primitives::triangle_grid(4, 1.0).unwrap();
        let err = remesh_quad_with_control(&mut mesh, &QuadRemeshOptions::new(1.0), &control)
            .unwrap_err();
        assert_eq!(err.last_completed_stage(), Some(Stage::DensityRefinement));
        // The quad conversion is kept.
        assert!(mesh.num_quads() > 0);
        assert!(mesh.is_valid());
    }
}
