//! Execution context threaded through every stage and task.
//!
//! There is no process-wide ambient state: orchestration, service manager
//! and framework operations all take a `&PipelineContext` explicitly.

use crate::cancellation::CancellationToken;
use crate::errors::{PackflowError, Result};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use uuid::Uuid;

/// The context for one pipeline run.
///
/// Cloning is cheap; clones share the same cancellation token.
#[derive(Debug, Clone)]
pub struct PipelineContext {
    /// The unique ID for this run.
    run_id: Uuid,
    /// When the run started.
    started_at: DateTime<Utc>,
    /// Shared cancellation signal.
    cancellation: Arc<CancellationToken>,
}

impl Default for PipelineContext {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineContext {
    /// Creates a new context with a fresh run ID and cancellation token.
    #[must_use]
    pub fn new() -> Self {
        Self::with_cancellation(Arc::new(CancellationToken::new()))
    }

    /// Creates a context that observes an existing cancellation token.
    #[must_use]
    pub fn with_cancellation(cancellation: Arc<CancellationToken>) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            started_at: Utc::now(),
            cancellation,
        }
    }

    /// Returns the run ID.
    #[must_use]
    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// Returns when the run started.
    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Returns the cancellation token.
    #[must_use]
    pub fn cancellation(&self) -> &Arc<CancellationToken> {
        &self.cancellation
    }

    /// Requests cancellation of the run.
    pub fn cancel(&self, reason: impl Into<String>) {
        self.cancellation.cancel(reason);
    }

    /// Checks if the run is cancelled.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }

    /// Returns `Err(Cancelled)` if cancellation was requested.
    pub fn check_cancelled(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(self.cancelled_error())
        } else {
            Ok(())
        }
    }

    /// Builds the error reported when work is abandoned due to cancellation.
    #[must_use]
    pub fn cancelled_error(&self) -> PackflowError {
        PackflowError::cancelled(
            self.cancellation
                .reason()
                .unwrap_or_else(|| "context cancelled".to_string()),
        )
    }

    /// Completes once the run is cancelled.
    pub async fn cancelled(&self) {
        self.cancellation.cancelled().await;
    }
}
