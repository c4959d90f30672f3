//! Asynchronous tasks that stream progress and produce one outcome.
//!
//! A [`ProgressTask<R, P>`] runs a work function on its own Tokio task. While
//! it runs, the work function emits any number of `P` notifications; it then
//! finishes with exactly one terminal outcome, `Ok(R)` or
//! `Err(PackflowError)`.
//!
//! The outcome lives in a write-once watch cell and progress travels over
//! an unbounded channel, so a caller can drain [`ProgressTask::progress`] on
//! one task while another awaits [`ProgressTask::wait`]: neither side ever
//! blocks the other and no notification is lost.
//!
//! ```rust,ignore
//! let task = ProgressTask::spawn(|progress| async move {
//!     progress.report("compiling".to_string());
//!     Ok(42)
//! });
//!
//! let mut stream = task.progress();
//! tokio::spawn(async move {
//!     while let Some(message) = stream.next().await {
//!         println!("{message}");
//!     }
//! });
//!
//! assert_eq!(task.wait().await?, 42);
//! ```

mod context;
mod progress;

pub use context::TaskContext;
pub use progress::{ProgressReporter, ProgressStream};

use crate::errors::{PackflowError, Result};
use parking_lot::Mutex;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};

/// A unit of asynchronous work with a progress stream and a single outcome.
pub struct ProgressTask<R, P> {
    progress: Mutex<Option<mpsc::UnboundedReceiver<P>>>,
    outcome: watch::Receiver<Option<Result<R>>>,
}

impl<R, P> ProgressTask<R, P>
where
    R: Send + Sync + 'static,
    P: Send + 'static,
{
    /// Starts `work` on a new Tokio task.
    ///
    /// The work function receives a [`TaskContext`] and must finish it with
    /// `set_result` or `set_error`. Must be called from within a Tokio
    /// runtime.
    pub fn run<F, Fut>(work: F) -> Self
    where
        F: FnOnce(TaskContext<R, P>) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let (task, context) = Self::channel();
        tokio::spawn(async move { work(context).await });
        task
    }

    /// Starts a work function that returns its outcome as a `Result`.
    ///
    /// Lets the body use `?` while still reporting progress.
    pub fn spawn<F, Fut>(work: F) -> Self
    where
        F: FnOnce(ProgressReporter<P>) -> Fut + Send + 'static,
        Fut: Future<Output = Result<R>> + Send + 'static,
    {
        Self::run(move |context| async move {
            let outcome = work(context.reporter()).await;
            context.complete(outcome);
        })
    }

    /// Creates a task that has already succeeded.
    pub fn completed(result: R) -> Self {
        let (task, context) = Self::channel();
        context.set_result(result);
        task
    }

    /// Creates a task that has already failed.
    pub fn failed(error: PackflowError) -> Self {
        let (task, context) = Self::channel();
        context.set_error(error);
        task
    }

    fn channel() -> (Self, TaskContext<R, P>) {
        let (progress_tx, progress_rx) = mpsc::unbounded_channel();
        let (outcome_tx, outcome_rx) = watch::channel(None);
        let context = TaskContext::new(Arc::new(Mutex::new(Some(progress_tx))), outcome_tx);
        let task = Self {
            progress: Mutex::new(Some(progress_rx)),
            outcome: outcome_rx,
        };
        (task, context)
    }
}

impl<R, P> ProgressTask<R, P> {
    /// Takes the progress stream.
    ///
    /// The stream has a single consumer: later calls return a stream that is
    /// already exhausted.
    pub fn progress(&self) -> ProgressStream<P> {
        let rx = self.progress.lock().take();
        if rx.is_none() {
            tracing::debug!("Progress stream already taken");
        }
        ProgressStream::new(rx)
    }

    /// Returns true once the terminal outcome has been written.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        self.outcome.borrow().is_some()
    }
}

impl<R, P> ProgressTask<R, P>
where
    R: Clone,
{
    /// Waits for the terminal outcome.
    ///
    /// Safe to call repeatedly and concurrently; every call yields the same
    /// outcome.
    pub async fn wait(&self) -> Result<R> {
        let mut rx = self.outcome.clone();
        let outcome = match rx.wait_for(Option::is_some).await {
            Ok(value) => value.clone(),
            Err(_) => None,
        };
        outcome.unwrap_or(Err(PackflowError::TaskAbandoned))
    }
}

impl<R, P> std::fmt::Debug for ProgressTask<R, P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgressTask")
            .field("terminal", &self.is_terminal())
            .finish()
    }
}
