//! Progress sink trait and implementations.

use crate::framework::ServicePackageResult;
use serde::Serialize;
use std::fmt;
use tracing::{debug, error, info, trace, warn, Level};

/// How a service's step ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StepOutcome {
    /// The step completed.
    Done,
    /// The step failed and the run stops.
    Failed,
    /// The service was not selected.
    Skipped,
}

impl fmt::Display for StepOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Done => write!(f, "done"),
            Self::Failed => write!(f, "failed"),
            Self::Skipped => write!(f, "skipped"),
        }
    }
}

/// Receives what the pipeline is doing, service by service.
///
/// Sinks render progress for a person; they must never fail the run.
/// Events for one service always arrive as `stage_started`, any number of
/// `progress`, then `stage_finished`.
pub trait ProgressSink: Send + Sync {
    /// A service's step began.
    fn stage_started(&self, service: &str, message: &str);

    /// A sub-step of the running service.
    fn progress(&self, service: &str, message: &str);

    /// A service's step ended.
    fn stage_finished(&self, service: &str, message: &str, outcome: StepOutcome);

    /// A service produced its package.
    fn package_reported(&self, _service: &str, _result: &ServicePackageResult) {}
}

/// A sink that discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpProgressSink;

impl ProgressSink for NoOpProgressSink {
    fn stage_started(&self, _service: &str, _message: &str) {}

    fn progress(&self, _service: &str, _message: &str) {}

    fn stage_finished(&self, _service: &str, _message: &str, _outcome: StepOutcome) {}
}

/// A sink that renders events through `tracing`.
///
/// Failures are always logged at warn level regardless of the configured
/// level.
#[derive(Debug, Clone)]
pub struct LoggingProgressSink {
    level: Level,
}

impl Default for LoggingProgressSink {
    fn default() -> Self {
        Self { level: Level::INFO }
    }
}

impl LoggingProgressSink {
    /// Creates a sink logging at `level`.
    #[must_use]
    pub fn new(level: Level) -> Self {
        Self { level }
    }

    /// Creates a debug-level sink.
    #[must_use]
    pub fn debug() -> Self {
        Self::new(Level::DEBUG)
    }

    fn log(&self, service: &str, message: &str) {
        match self.level {
            Level::TRACE => trace!(service = %service, "{message}"),
            Level::DEBUG => debug!(service = %service, "{message}"),
            Level::INFO => info!(service = %service, "{message}"),
            Level::WARN => warn!(service = %service, "{message}"),
            _ => error!(service = %service, "{message}"),
        }
    }
}

impl ProgressSink for LoggingProgressSink {
    fn stage_started(&self, service: &str, message: &str) {
        self.log(service, message);
    }

    fn progress(&self, service: &str, message: &str) {
        self.log(service, &format!("Packaging service {service} ({message})"));
    }

    fn stage_finished(&self, service: &str, message: &str, outcome: StepOutcome) {
        match outcome {
            StepOutcome::Failed => warn!(service = %service, outcome = %outcome, "{message}"),
            _ => self.log(service, &format!("{message}: {outcome}")),
        }
    }

    fn package_reported(&self, service: &str, result: &ServicePackageResult) {
        self.log(service, &result.to_string());
    }
}

/// One event recorded by [`CollectingProgressSink`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SinkEvent {
    /// `stage_started`.
    Started {
        /// The service.
        service: String,
        /// The step message.
        message: String,
    },
    /// `progress`.
    Progress {
        /// The service.
        service: String,
        /// The sub-step message.
        message: String,
    },
    /// `stage_finished`.
    Finished {
        /// The service.
        service: String,
        /// The step message.
        message: String,
        /// How the step ended.
        outcome: StepOutcome,
    },
    /// `package_reported`.
    Packaged {
        /// The service.
        service: String,
        /// The package result.
        result: ServicePackageResult,
    },
}

impl SinkEvent {
    /// Returns the service the event belongs to.
    #[must_use]
    pub fn service(&self) -> &str {
        match self {
            Self::Started { service, .. }
            | Self::Progress { service, .. }
            | Self::Finished { service, .. }
            | Self::Packaged { service, .. } => service,
        }
    }
}

/// A sink that records every event, for tests.
#[derive(Debug, Default)]
pub struct CollectingProgressSink {
    events: parking_lot::RwLock<Vec<SinkEvent>>,
}

impl CollectingProgressSink {
    /// Creates an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns all recorded events in arrival order.
    #[must_use]
    pub fn events(&self) -> Vec<SinkEvent> {
        self.events.read().clone()
    }

    /// Returns each finished step as `(service, outcome)`.
    #[must_use]
    pub fn outcomes(&self) -> Vec<(String, StepOutcome)> {
        self.events
            .read()
            .iter()
            .filter_map(|event| match event {
                SinkEvent::Finished { service, outcome, .. } => Some((service.clone(), *outcome)),
                _ => None,
            })
            .collect()
    }

    /// Returns the progress messages recorded for `service`.
    #[must_use]
    pub fn progress_for(&self, service: &str) -> Vec<String> {
        self.events
            .read()
            .iter()
            .filter_map(|event| match event {
                SinkEvent::Progress { service: s, message } if s == service => Some(message.clone()),
                _ => None,
            })
            .collect()
    }

    /// Returns the number of recorded events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.read().len()
    }

    /// Returns true if nothing was recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.read().is_empty()
    }

    /// Clears all recorded events.
    pub fn clear(&self) {
        self.events.write().clear();
    }

    fn push(&self, event: SinkEvent) {
        self.events.write().push(event);
    }
}

impl ProgressSink for CollectingProgressSink {
    fn stage_started(&self, service: &str, message: &str) {
        self.push(SinkEvent::Started {
            service: service.to_string(),
            message: message.to_string(),
        });
    }

    fn progress(&self, service: &str, message: &str) {
        self.push(SinkEvent::Progress {
            service: service.to_string(),
            message: message.to_string(),
        });
    }

    fn stage_finished(&self, service: &str, message: &str, outcome: StepOutcome) {
        self.push(SinkEvent::Finished {
            service: service.to_string(),
            message: message.to_string(),
            outcome,
        });
    }

    fn package_reported(&self, service: &str, result: &ServicePackageResult) {
        self.push(SinkEvent::Packaged {
            service: service.to_string(),
            result: result.clone(),
        });
    }
}
