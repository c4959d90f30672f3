//! # Packflow
//!
//! Multi-stage build and package orchestration for multi-service projects.
//!
//! Packflow drives each service of a project through its build ecosystem's
//! stages (initialize, restore, build, package) while streaming
//! human-readable progress to the caller:
//!
//! - **Progress tasks**: asynchronous work with a progress stream and exactly
//!   one terminal outcome
//! - **Framework services**: one plugin per build ecosystem, chosen once per
//!   service by language
//! - **Fail-fast pipeline**: services run in stable order and the first
//!   failure stops the run
//! - **Cancellation**: cooperative, with child processes killed on abort
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use packflow::prelude::*;
//! use std::sync::Arc;
//!
//! let project = ProjectConfig::from_json_str(&std::fs::read_to_string("packflow.json")?, ".")?;
//! let services = Arc::new(ServiceManager::new(FrameworkRegistry::with_defaults()));
//!
//! let pipeline = PackagePipeline::new(services).with_sink(Arc::new(LoggingProgressSink::default()));
//! let result = pipeline
//!     .run(&PipelineContext::new(), &project, &PackageOptions::new().with_target("api"))
//!     .await?;
//!
//! for (service, package) in result.results.iter() {
//!     println!("{service}: {package}");
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod cancellation;
pub mod context;
pub mod errors;
pub mod events;
pub mod framework;
pub mod observability;
pub mod pipeline;
pub mod project;
pub mod service;
pub mod task;
pub mod testing;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::cancellation::CancellationToken;
    pub use crate::context::PipelineContext;
    pub use crate::errors::{PackflowError, Result, ServiceStage};
    pub use crate::events::{
        CollectingProgressSink, LoggingProgressSink, NoOpProgressSink, ProgressSink, StepOutcome,
    };
    pub use crate::framework::{
        maven::MavenProject, ExternalTool, FrameworkRegistry, FrameworkRequirements, FrameworkService,
        ServiceBuildResult, ServicePackageResult, ServiceProgress, ServiceRestoreResult, StageTask,
    };
    pub use crate::observability::{init_tracing, LoggingConfig};
    pub use crate::pipeline::{
        JsonFormatter, OutputFormat, OutputFormatter, PackageOptions, PackagePipeline, PackageResults,
        PackageRunResult, PackageSnapshot,
    };
    pub use crate::project::{ProjectConfig, ServiceConfig, ServiceLanguage};
    pub use crate::service::ServiceManager;
    pub use crate::task::{ProgressReporter, ProgressStream, ProgressTask, TaskContext};
}
