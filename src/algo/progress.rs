//! Progress reporting and cooperative cancellation for remeshing pipelines.
//!
//! Pipelines report through a [`Progress`] callback and check a [`CancelToken`]
//! between stages. Both travel together in a [`RemeshControl`].
//!
//! # Example
//!
//! ```
//! use quadmesh::algo::progress::{CancelToken, Progress, RemeshControl};
//!
//! let progress = Progress::new(|current, total, message| {
//!     println!("[{}/{}] {}", current, total, message);
//! });
//! let cancel = CancelToken::new();
//! let control = RemeshControl::new().with_progress(progress).with_cancel(cancel.clone());
//!
//! // From another thread, or from the progress callback's owner:
//! cancel.cancel();
//! assert!(control.is_cancelled());
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// A progress callback that receives updates during long-running operations.
///
/// The callback receives:
/// - `current`: Current step (0-based)
/// - `total`: Total number of steps
/// - `message`: Description of the current operation
pub struct Progress {
    callback: Box<dyn Fn(usize, usize, &str) + Send + Sync>,
}

impl Progress {
    /// Create a new progress reporter with the given callback.
    pub fn new<F>(callback: F) -> Self
    where
        F: Fn(usize, usize, &str) + Send + Sync + 'static,
    {
        Self {
            callback: Box::new(callback),
        }
    }

    /// Report progress.
    #[inline]
    pub fn report(&self, current: usize, total: usize, message: &str) {
        (self.callback)(current, total, message);
    }

    /// Create a no-op progress reporter that discards all updates.
    pub fn none() -> Self {
        Self::new(|_, _, _| {})
    }
}

impl Default for Progress {
    fn default() -> Self {
        Self::none()
    }
}

impl std::fmt::Debug for Progress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Progress").finish_non_exhaustive()
    }
}

/// Shared cancellation flag.
///
/// Clones share the same flag. Pipelines only look at it between stages, so a
/// stage that is already running always finishes.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    /// Create a token that is not cancelled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    /// Whether cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Progress callback plus cancellation token for a pipeline run.
#[derive(Debug, Default)]
pub struct RemeshControl {
    /// Receives one report per completed stage.
    pub progress: Progress,

    /// Checked at every stage boundary.
    pub cancel: CancelToken,
}

impl RemeshControl {
    /// A control that never cancels and discards progress.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the progress callback.
    pub fn with_progress(mut self, progress: Progress) -> Self {
        self.progress = progress;
        self
    }

    /// Set the cancellation token.
    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Whether the run should stop at the next checkpoint.
    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}
