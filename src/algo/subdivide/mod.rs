//! Smooth subdivision.
//!
//! # Catmull-Clark Subdivision
//!
//! Catmull-Clark subdivision (Catmull & Clark, 1978) is an approximating
//! scheme that works on arbitrary polygons. Each iteration:
//!
//! 1. Creates a face point at each face centroid
//! 2. Creates an edge point per edge from its endpoints and adjacent face points
//! 3. Moves original vertices by a weighted average of their neighbourhood
//! 4. Splits every n-gon into n quads
//!
//! After one iteration the mesh is all quads; from then on each iteration
//! quadruples the face count.
//!
//! # Example
//!
//! ```
//! use quadmesh::algo::subdivide::{subdivide_smooth, SubdivideOptions};
//! use quadmesh::mesh::primitives;
//!
//! let mut mesh = primitives::quad_cube().unwrap();
//! subdivide_smooth(&mut mesh, &SubdivideOptions::new(2)).unwrap();
//! assert_eq!(mesh.num_faces(), 6 * 16);
//! ```
//!
//! # References
//!
//! - Catmull, E. & Clark, J. (1978). "Recursively generated B-spline surfaces
//!   on arbitrary topological meshes." Computer-Aided Design, 10(6), 350-355.

mod catmull_clark;

pub use catmull_clark::{subdivide_smooth, subdivide_smooth_with_progress};

/// Options for subdivision.
#[derive(Debug, Clone)]
pub struct SubdivideOptions {
    /// Number of subdivision iterations.
    pub iterations: usize,

    /// Whether to use parallel execution (default: true).
    pub parallel: bool,
}

impl Default for SubdivideOptions {
    fn default() -> Self {
        Self::new(1)
    }
}

impl SubdivideOptions {
    /// Create options with the specified number of iterations.
    pub fn new(iterations: usize) -> Self {
        Self {
            iterations,
            parallel: true,
        }
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
}
