//! Error types for quadmesh.
//!
//! This module defines all error types used throughout the engine.

use thiserror::Error;

use crate::algo::remesh::Stage;

/// Result type alias using [`EngineError`].
pub type Result<T> = std::result::Result<T, EngineError>;

/// Errors that can occur while editing or remeshing a mesh.
#[derive(Error, Debug)]
pub enum EngineError {
    /// The mesh has no vertices or no faces to operate on.
    #[error("mesh has no vertices or faces")]
    EmptyMesh,

    /// A zero-length edge or zero-area face was found where a non-degenerate
    /// value is required.
    #[error("degenerate geometry: {0}")]
    DegenerateGeometry(String),

    /// The preconditions of an edit operation do not hold.
    #[error("invalid edit: {0}")]
    InvalidEdit(String),

    /// Invalid parameter value.
    #[error("invalid parameter: {name} = {value} ({reason})")]
    InvalidParameter {
        /// Parameter name.
        name: &'static str,
        /// The invalid value (as string).
        value: String,
        /// Reason the value is invalid.
        reason: &'static str,
    },

    /// The mesh handed in (or built from input) is not a valid surface mesh.
    #[error("invalid mesh: {0}")]
    InvalidMesh(String),

    /// The caller cancelled the pipeline between two stages.
    #[error("pipeline cancelled after stage {last_completed}")]
    Cancelled {
        /// The last stage that ran to completion.
        last_completed: Stage,
    },

    /// A pipeline stage failed after earlier stages had completed.
    #[error("stage {stage} failed (last completed stage: {last_completed})")]
    StageFailed {
        /// The stage that failed.
        stage: Stage,
        /// The last stage that ran to completion.
        last_completed: Stage,
        /// The underlying failure.
        #[source]
        source: Box<EngineError>,
    },
}

impl EngineError {
    /// Create an invalid parameter error.
    pub fn invalid_param<T: std::fmt::Display>(
        name: &'static str,
        value: T,
        reason: &'static str,
    ) -> Self {
        EngineError::InvalidParameter {
            name,
            value: value.to_string(),
            reason,
        }
    }

    /// Create an invalid edit error.
    pub fn invalid_edit(message: impl Into<String>) -> Self {
        EngineError::InvalidEdit(message.into())
    }

    /// The innermost error, looking through [`EngineError::StageFailed`] wrappers.
    pub fn root(&self) -> &EngineError {
        match self {
            EngineError::StageFailed { source, .. } => source.root(),
            other => other,
        }
    }

    /// The last pipeline stage that completed before this error, if the error
    /// came out of a pipeline.
    pub fn last_completed_stage(&self) -> Option<Stage> {
        match self {
            EngineError::Cancelled { last_completed } => Some(*last_completed),
            EngineError::StageFailed { last_completed, .. } => Some(*last_completed),
            _ => None,
        }
    }
}

/// Check that a user-supplied scalar is finite and strictly positive.
pub(crate) fn ensure_positive(name: &'static str, value: f64) -> Result<()> {
    if !value.is_finite() {
        return Err(EngineError::invalid_param(name, value, "must be finite"));
    }
    if value <= 0.0 {
        return Err(EngineError::invalid_param(name, value, "must be > 0"));
    }
    Ok(())
}
