//! Project-level package runs.
//!
//! This module provides:
//! - Target selection
//! - The sequential, fail-fast package pipeline
//! - Result aggregation and the JSON report

mod options;
mod output;
mod runner;
mod selection;

#[cfg(test)]
mod integration_tests;

pub use options::PackageOptions;
pub use output::{JsonFormatter, OutputFormat, OutputFormatter, PackageResults, PackageSnapshot};
pub use runner::{PackagePipeline, PackageRunResult, PACKAGED_MESSAGE};
pub use selection::resolve_target;
