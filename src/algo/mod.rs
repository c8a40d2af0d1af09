//! Mesh processing algorithms.
//!
//! This module contains the editing and remeshing algorithms, including:
//!
//! - **Curvature**: Per-vertex dihedral-angle curvature
//! - **Editing**: Edge subdivision, edge collapse, triangle-pair merging
//! - **Smoothing**: Laplacian smoothing, extraordinary-vertex relaxation
//! - **Decimation**: Curvature-weighted greedy edge collapse
//! - **Subdivision**: Catmull-Clark subdivision
//! - **Remeshing**: Adaptive, uniform, optimizing and quad pipelines
//! - **Density**: Per-vertex density maps that steer refinement

pub mod curvature;
pub mod decimate;
pub mod density;
pub mod edit;
pub mod progress;
pub mod remesh;
pub mod smooth;
pub mod subdivide;

pub use progress::{CancelToken, Progress, RemeshControl};
