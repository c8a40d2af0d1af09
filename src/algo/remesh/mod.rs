//! Quad-dominant remeshing pipelines.
//!
//! Each pipeline runs a fixed sequence of [`Stage`]s on a caller-owned mesh:
//!
//! ```text
//! Start → TriangleToQuad (optional) → DensityRefinement → Smoothing (optional) → Done
//! ```
//!
//! - [`adaptive_remesh`]: subdivide edges in curved regions, then relax
//! - [`uniform_remesh`]: split long edges and collapse short ones around a target length
//! - [`optimize_remesh`]: adaptive refinement followed by extraordinary-vertex relaxation
//! - [`remesh_quad`]: merge triangles into quads, refine, then optionally smooth
//!
//! # Adaptive Refinement
//!
//! An edge is subdivided when the mean curvature of its endpoints exceeds
//!
//! ```text
//! 0.5 / (density × local)
//! ```
//!
//! where `local` is the mean per-vertex density of the endpoints (1.0 when
//! unset, see [`apply_density_map`](crate::algo::density::apply_density_map)).
//! Raising the density lowers the threshold and refines more.
//!
//! # Control and Failure
//!
//! Every pipeline has a `*_with_control` variant taking a [`RemeshControl`]. The
//! cancel token is checked before each stage, and a cancelled run returns
//! [`EngineError::Cancelled`] with the mesh left as the last completed stage
//! produced it. Parameters and an empty mesh are rejected before any stage runs.
//! A failure inside a stage comes back as [`EngineError::StageFailed`]; stages
//! that already completed are not rolled back.
//!
//! # Example
//!
//! ```
//! use quadmesh::algo::remesh::{remesh_quad, QuadRemeshOptions, Stage};
//! use quadmesh::mesh::primitives;
//!
//! let mut mesh = primitives::uv_sphere(1.0, 12, 8).unwrap();
//! let report = remesh_quad(&mut mesh, &QuadRemeshOptions::new(1.5)).unwrap();
//!
//! assert!(report.merged > 0);
//! assert_eq!(report.last_stage(), Stage::Done);
//! assert!(mesh.is_valid());
//! ```

mod adaptive;
mod optimize;
mod quad;
mod uniform;

pub use adaptive::{adaptive_remesh, adaptive_remesh_with_control, AdaptiveOptions};
pub use optimize::{optimize_remesh, optimize_remesh_with_control, OptimizeOptions};
pub use quad::{remesh_quad, remesh_quad_with_control, QuadRemeshOptions};
pub use uniform::{uniform_remesh, uniform_remesh_with_control, UniformOptions};

use std::fmt;

use tracing::{debug, info};

use crate::algo::RemeshControl;
use crate::error::{EngineError, Result};
use crate::mesh::Mesh;

/// A step of a remeshing pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    /// Inputs validated, nothing changed yet.
    Start,
    /// Adjacent triangles merged into quads.
    TriangleToQuad,
    /// Edges split or collapsed according to curvature, density or length.
    DensityRefinement,
    /// Final geometric smoothing or relaxation.
    Smoothing,
    /// The pipeline finished.
    Done,
}

impl Stage {
    /// Human-readable stage name, also used as the progress message.
    pub fn name(self) -> &'static str {
        match self {
            Stage::Start => "start",
            Stage::TriangleToQuad => "triangle to quad",
            Stage::DensityRefinement => "density refinement",
            Stage::Smoothing => "smoothing",
            Stage::Done => "done",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// What a pipeline run did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemeshReport {
    /// Stages that ran to completion, in order. Always starts with
    /// [`Stage::Start`].
    pub stages: Vec<Stage>,
    /// Triangle pairs merged into quads.
    pub merged: usize,
    /// Edges split.
    pub split: usize,
    /// Edges collapsed.
    pub collapsed: usize,
    /// Elements an edit pass declined to touch.
    pub skipped: usize,
    /// Vertex moves performed by smoothing passes, summed over passes.
    pub moved: usize,
}

impl RemeshReport {
    /// The last completed stage.
    pub fn last_stage(&self) -> Stage {
        self.stages.last().copied().unwrap_or(Stage::Start)
    }

    /// Whether `stage` ran to completion.
    pub fn completed(&self, stage: Stage) -> bool {
        self.stages.contains(&stage)
    }
}

/// Drives a pipeline through its stages, handling cancellation, progress and
/// error wrapping.
pub(crate) struct StageRunner<'a> {
    name: &'static str,
    control: &'a RemeshControl,
    total: usize,
    report: RemeshReport,
}

impl<'a> StageRunner<'a> {
    /// `total` counts the stages that will run between `Start` and `Done`.
    pub(crate) fn new(name: &'static str, control: &'a RemeshControl, total: usize) -> Self {
        info!(pipeline = name, stages = total, "remesh started");
        Self {
            name,
            control,
            total,
            report: RemeshReport {
                stages: vec![Stage::Start],
                ..RemeshReport::default()
            },
        }
    }

    /// Run one stage unless cancellation was requested.
    pub(crate) fn run<F>(&mut self, stage: Stage, mesh: &mut Mesh, body: F) -> Result<()>
    where
        F: FnOnce(&mut Mesh, &mut RemeshReport) -> Result<()>,
    {
        let last_completed = self.report.last_stage();
        if self.control.is_cancelled() {
            info!(pipeline = self.name, %last_completed, "remesh cancelled");
            return Err(EngineError::Cancelled { last_completed });
        }

        let done = self.report.stages.len() - 1;
        self.control.progress.report(done, self.total, stage.name());

        body(mesh, &mut self.report).map_err(|source| EngineError::StageFailed {
            stage,
            last_completed,
            source: Box::new(source),
        })?;

        self.report.stages.push(stage);
        debug!(
            pipeline = self.name,
            %stage,
            faces = mesh.num_faces(),
            vertices = mesh.num_vertices(),
            "stage complete"
        );
        Ok(())
    }

    /// Mark the run as done and hand back the report.
    pub(crate) fn finish(mut self, mesh: &Mesh) -> RemeshReport {
        self.control.progress.report(self.total, self.total, Stage::Done.name());
        self.report.stages.push(Stage::Done);
        info!(
            pipeline = self.name,
            faces = mesh.num_faces(),
            quads = mesh.num_quads(),
            split = self.report.split,
            collapsed = self.report.collapsed,
            merged = self.report.merged,
            "remesh finished"
        );
        self.report
    }
}

/// Reject meshes with nothing to remesh.
pub(crate) fn ensure_non_empty(mesh: &Mesh) -> Result<()> {
    if mesh.is_empty() || mesh.num_faces() == 0 {
        return Err(EngineError::EmptyMesh);
    }
    Ok(())
}
