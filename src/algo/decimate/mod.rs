//! Mesh decimation (simplification).
//!
//! Faces are removed by greedy rounds of edge collapses. Each round ranks the
//! candidate edges by
//!
//! ```text
//! cost = (mean endpoint curvature + ε) × area of the incident faces
//! ```
//!
//! and collapses the cheapest first, so small faces in flat regions go before
//! large or strongly curved ones.
//!
//! # Example
//!
//! ```
//! use quadmesh::algo::decimate::{decimate, DecimateOptions};
//! use quadmesh::mesh::primitives;
//!
//! let mut mesh = primitives::triangle_grid(8, 1.0).unwrap();
//! let before = mesh.num_faces();
//!
//! // Aim for half the original faces.
//! let ran = decimate(&mut mesh, &DecimateOptions::with_target_ratio(0.5)).unwrap();
//! assert!(ran);
//! assert!(mesh.num_faces() < before);
//! ```

mod greedy;

pub use greedy::{decimate, decimate_with_progress};

/// Options for mesh decimation.
#[derive(Debug, Clone)]
pub struct DecimateOptions {
    /// Target ratio of faces to keep, strictly between 0.0 and 1.0.
    /// Values outside that range make decimation a no-op.
    pub target_ratio: f64,

    /// Whether to preserve the boundary (default: true).
    ///
    /// When set, edges touching a boundary vertex are never collapsed.
    pub preserve_boundary: bool,

    /// Upper bound on the number of collapse rounds.
    pub max_rounds: usize,

    /// Whether to compute curvature in parallel (default: true).
    pub parallel: bool,
}

impl Default for DecimateOptions {
    fn default() -> Self {
        Self {
            target_ratio: 0.5,
            preserve_boundary: true,
            max_rounds: 32,
            parallel: true,
        }
    }
}

impl DecimateOptions {
    /// Create options to reduce to a ratio of the original face count.
    pub fn with_target_ratio(ratio: f64) -> Self {
        Self {
            target_ratio: ratio,
            ..Self::default()
        }
    }

    /// Set whether to preserve boundary edges.
    pub fn with_preserve_boundary(mut self, preserve: bool) -> Self {
        self.preserve_boundary = preserve;
        self
    }

    /// Set the maximum number of collapse rounds.
    pub fn with_max_rounds(mut self, rounds: usize) -> Self {
        self.max_rounds = rounds;
        self
    }

    /// Set whether to use parallel execution.
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Compute the target number of faces given the original count.
    pub fn compute_target(&self, original_faces: usize) -> usize {
        ((original_faces as f64) * self.target_ratio).round() as usize
    }
}
