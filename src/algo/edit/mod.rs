//! Local topological edits.
//!
//! - [`subdivide_edges`]: split edges at their midpoints and rebuild the faces
//!   around them
//! - [`collapse_short_edges`]: merge each edge's endpoints into one vertex
//! - [`MergePass`] / [`convert_to_quads`]: fuse pairs of adjacent triangles into
//!   quads
//!
//! Every batch leaves the mesh valid whether it succeeds or fails. Elements that
//! cannot be edited (dead handles, topologically unsafe configurations) are
//! skipped and counted in the returned report instead of aborting the batch.

mod collapse;
mod merge;
mod split;

pub use collapse::collapse_short_edges;
pub(crate) use collapse::collapse_edges_while;
pub use merge::{convert_to_quads, MergePass};
pub use split::subdivide_edges;

/// Outcome of [`subdivide_edges`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SubdivideReport {
    /// Edges split.
    pub split: usize,
    /// Dead or duplicate handles ignored, plus edges left whole because
    /// splitting them would give an edge a third face.
    pub skipped: usize,
    /// Faces added while rebuilding the neighbourhood of split edges.
    pub faces_created: usize,
}

/// Outcome of [`collapse_short_edges`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CollapseReport {
    /// Edges collapsed.
    pub collapsed: usize,
    /// Edges left alone because collapsing them was unsafe or impossible.
    pub skipped: usize,
}

/// Outcome of [`convert_to_quads`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeReport {
    /// Triangle pairs fused into quads.
    pub merged: usize,
    /// Triangles left without an eligible partner.
    pub skipped: usize,
}
