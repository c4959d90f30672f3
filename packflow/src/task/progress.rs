//! Progress delivery halves of a [`ProgressTask`](super::ProgressTask).

use futures::Stream;
use parking_lot::Mutex;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::sync::mpsc;
use tracing::trace;

/// The producer slot shared by a task's context and its reporters.
///
/// `None` once the task has reached its terminal outcome.
pub(crate) type ProgressSlot<P> = Arc<Mutex<Option<mpsc::UnboundedSender<P>>>>;

/// Emits progress notifications for a running task.
///
/// Reporters are cheap to clone. Reports made after the task has finished
/// are discarded.
pub struct ProgressReporter<P> {
    slot: ProgressSlot<P>,
}

impl<P> Clone for ProgressReporter<P> {
    fn clone(&self) -> Self {
        Self {
            slot: self.slot.clone(),
        }
    }
}

impl<P> ProgressReporter<P> {
    pub(crate) fn new(slot: ProgressSlot<P>) -> Self {
        Self { slot }
    }

    /// Sends a progress notification.
    pub fn report(&self, progress: P) {
        match self.slot.lock().as_ref() {
            // A dropped consumer just means nobody is watching.
            Some(tx) => {
                let _ = tx.send(progress);
            }
            None => trace!("Discarding progress reported after task completion"),
        }
    }

    /// Returns true once the owning task has finished.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.slot.lock().is_none()
    }
}

impl<P> std::fmt::Debug for ProgressReporter<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgressReporter")
            .field("closed", &self.is_closed())
            .finish()
    }
}

/// A finite stream of progress notifications.
///
/// Yields notifications in emission order and ends exactly when the task
/// reaches its terminal outcome.
pub struct ProgressStream<P> {
    rx: Option<mpsc::UnboundedReceiver<P>>,
}

impl<P> ProgressStream<P> {
    pub(crate) fn new(rx: Option<mpsc::UnboundedReceiver<P>>) -> Self {
        Self { rx }
    }

    /// Receives the next notification, or `None` once the task is finished.
    pub async fn recv(&mut self) -> Option<P> {
        match self.rx.as_mut() {
            Some(rx) => rx.recv().await,
            None => None,
        }
    }
}

impl<P> Stream for ProgressStream<P> {
    type Item = P;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<P>> {
        match self.rx.as_mut() {
            Some(rx) => rx.poll_recv(cx),
            None => Poll::Ready(None),
        }
    }
}

impl<P> std::fmt::Debug for ProgressStream<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgressStream")
            .field("attached", &self.rx.is_some())
            .finish()
    }
}
