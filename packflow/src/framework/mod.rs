//! Framework services: one build-ecosystem plugin per language.
//!
//! Every ecosystem exposes the same four stages. Restore, build and package
//! return a [`ProgressTask`] even when the underlying tool does all three at
//! once, so callers deal with a single execution shape.

pub mod maven;
mod registry;
mod results;
mod staging;
mod tools;

pub use registry::{FrameworkFactory, FrameworkRegistry};
pub use results::{ServiceBuildResult, ServicePackageResult, ServiceProgress, ServiceRestoreResult};
pub use staging::{copy_into_staging, find_single_artifact, validate_package_output, StagingDir};
pub use tools::{ensure_all_installed, ExternalTool};

use crate::context::PipelineContext;
use crate::errors::Result;
use crate::project::ServiceConfig;
use crate::task::ProgressTask;
use async_trait::async_trait;
use std::sync::Arc;

/// A stage task reporting [`ServiceProgress`].
pub type StageTask<R> = ProgressTask<R, ServiceProgress>;

/// Which earlier stages must run before packaging.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameworkPackageRequirements {
    /// Restore must run before package.
    pub require_restore: bool,
    /// Build must run before package.
    pub require_build: bool,
}

/// Stage requirements declared by a framework.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameworkRequirements {
    /// Requirements of the package stage.
    pub package: FrameworkPackageRequirements,
}

impl FrameworkRequirements {
    /// Requires restore and build before packaging.
    #[must_use]
    pub fn restore_and_build() -> Self {
        Self {
            package: FrameworkPackageRequirements {
                require_restore: true,
                require_build: true,
            },
        }
    }

    /// Packaging performs restore and build implicitly.
    #[must_use]
    pub fn package_only() -> Self {
        Self::default()
    }
}

/// A build ecosystem's implementation of the service lifecycle.
#[async_trait]
pub trait FrameworkService: Send + Sync {
    /// Returns the framework's display name.
    fn name(&self) -> &str;

    /// Declares which stages the orchestrator must run before packaging.
    fn requirements(&self) -> FrameworkRequirements;

    /// Tools that must be installed before any stage runs.
    fn required_external_tools(&self) -> Vec<Arc<dyn ExternalTool>>;

    /// Binds the framework to a service.
    async fn initialize(&self, ctx: &PipelineContext, service: &ServiceConfig) -> Result<()>;

    /// Resolves external dependencies.
    fn restore(&self, ctx: &PipelineContext, service: &ServiceConfig) -> StageTask<ServiceRestoreResult>;

    /// Compiles the service.
    fn build(
        &self,
        ctx: &PipelineContext,
        service: &ServiceConfig,
        restore_output: Option<ServiceRestoreResult>,
    ) -> StageTask<ServiceBuildResult>;

    /// Produces a deployable artifact in a fresh staging directory.
    fn package(
        &self,
        ctx: &PipelineContext,
        service: &ServiceConfig,
        build_output: Option<ServiceBuildResult>,
    ) -> StageTask<ServicePackageResult>;
}
