//! The producer-side handle passed to a task's work function.

use super::progress::{ProgressReporter, ProgressSlot};
use crate::errors::{PackflowError, Result};
use tokio::sync::watch;

pub(crate) type OutcomeSender<R> = watch::Sender<Option<Result<R>>>;

/// Handle through which a work function reports progress and its outcome.
///
/// [`set_result`](Self::set_result) and [`set_error`](Self::set_error)
/// consume the context, so a task can only ever be completed once. A
/// context dropped without either call completes the task with
/// [`PackflowError::TaskAbandoned`].
pub struct TaskContext<R, P> {
    slot: ProgressSlot<P>,
    outcome: Option<OutcomeSender<R>>,
}

impl<R, P> TaskContext<R, P> {
    pub(crate) fn new(slot: ProgressSlot<P>, outcome: OutcomeSender<R>) -> Self {
        Self {
            slot,
            outcome: Some(outcome),
        }
    }

    /// Emits a progress notification.
    pub fn set_progress(&self, progress: P) {
        if let Some(tx) = self.slot.lock().as_ref() {
            let _ = tx.send(progress);
        }
    }

    /// Returns a reporter that can be moved into nested futures.
    #[must_use]
    pub fn reporter(&self) -> ProgressReporter<P> {
        ProgressReporter::new(self.slot.clone())
    }

    /// Completes the task successfully.
    pub fn set_result(mut self, result: R) {
        self.finish(Ok(result));
    }

    /// Completes the task with an error.
    pub fn set_error(mut self, error: PackflowError) {
        self.finish(Err(error));
    }

    /// Completes the task from a `Result`.
    pub fn complete(self, outcome: Result<R>) {
        match outcome {
            Ok(result) => self.set_result(result),
            Err(error) => self.set_error(error),
        }
    }

    fn finish(&mut self, outcome: Result<R>) {
        if let Some(tx) = self.outcome.take() {
            // Outcome and stream closure happen under the same lock, so any
            // consumer that sees the stream end can also see the outcome.
            let mut slot = self.slot.lock();
            tx.send_replace(Some(outcome));
            slot.take();
        }
    }
}

impl<R, P> Drop for TaskContext<R, P> {
    fn drop(&mut self) {
        if self.outcome.is_some() {
            tracing::warn!("Task work function finished without reporting an outcome");
            self.finish(Err(PackflowError::TaskAbandoned));
        }
    }
}

impl<R, P> std::fmt::Debug for TaskContext<R, P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskContext")
            .field("finished", &self.outcome.is_none())
            .finish()
    }
}
