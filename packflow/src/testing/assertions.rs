//! Assertion helpers for package runs.

use crate::errors::{PackflowError, ServiceStage};
use crate::events::{CollectingProgressSink, StepOutcome};

/// Asserts that `error` is attributed to `service` and `stage`.
///
/// # Panics
///
/// Panics if the error is not a `ServiceStage` error for that service and stage.
pub fn assert_stage_failure(error: &PackflowError, service: &str, stage: ServiceStage) {
    match error {
        PackflowError::ServiceStage {
            service: actual_service,
            stage: actual_stage,
            ..
        } => {
            assert_eq!(actual_service, service, "error attributed to the wrong service");
            assert_eq!(*actual_stage, stage, "error attributed to the wrong stage");
        }
        other => panic!("Expected a {stage} failure for '{service}', got: {other}"),
    }
}

/// Asserts the sink's finished steps, in order.
///
/// # Panics
///
/// Panics if the recorded outcomes differ.
pub fn assert_outcomes(sink: &CollectingProgressSink, expected: &[(&str, StepOutcome)]) {
    let actual = sink.outcomes();
    let expected: Vec<(String, StepOutcome)> = expected
        .iter()
        .map(|(service, outcome)| ((*service).to_string(), *outcome))
        .collect();
    assert_eq!(actual, expected, "unexpected step outcomes");
}
