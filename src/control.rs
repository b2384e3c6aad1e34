//! Cooperative cancellation and progress reporting for long-running analyses

use std::fmt::Debug;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use thiserror::Error;

/// Returned from a checkpoint once cancellation has been requested
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("analysis was cancelled")]
pub struct Cancelled;

/// Shared cancellation flag. Clones observe the same flag.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    /// Token that is not cancelled
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. In-flight work stops at its next checkpoint.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Whether any clone has been cancelled
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

type ProgressFn<'a> = Box<dyn Fn(&str, f64) + Send + Sync + 'a>;

/// Control handle passed to every analysis entry point
pub struct AnalysisControl<'a> {
    token: CancellationToken,
    progress: Option<ProgressFn<'a>>,
}

impl Debug for AnalysisControl<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnalysisControl")
            .field("token", &self.token)
            .field("progress", &self.progress.is_some())
            .finish()
    }
}

impl Default for AnalysisControl<'_> {
    fn default() -> Self {
        Self::new(CancellationToken::new())
    }
}

impl<'a> AnalysisControl<'a> {
    /// Control observing `token`, without progress reporting
    pub fn new(token: CancellationToken) -> Self {
        Self {
            token,
            progress: None,
        }
    }

    /// Report progress to `callback` as `(step description, percent complete)`
    pub fn with_progress(mut self, callback: impl Fn(&str, f64) + Send + Sync + 'a) -> Self {
        self.progress = Some(Box::new(callback));
        self
    }

    /// Token checked at every checkpoint
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    /// Forward a progress update. `percent` is clamped to `[0, 100]`.
    pub fn report(&self, step: &str, percent: f64) {
        if let Some(progress) = &self.progress {
            progress(step, percent.clamp(0.0, 100.0));
        }
    }

    /// Fail if cancellation has been requested
    pub fn checkpoint(&self) -> Result<(), Cancelled> {
        if self.token.is_cancelled() {
            Err(Cancelled)
        } else {
            Ok(())
        }
    }
}
