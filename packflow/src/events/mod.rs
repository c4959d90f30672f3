//! Presentation sinks for pipeline progress.
//!
//! The pipeline reports each service's step and its progress messages to a
//! [`ProgressSink`]. Sinks are passed to the pipeline explicitly; there is no
//! process-wide sink.

mod sink;

pub use sink::{
    CollectingProgressSink, LoggingProgressSink, NoOpProgressSink, ProgressSink, SinkEvent, StepOutcome,
};
