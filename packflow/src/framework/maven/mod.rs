//! Java services built with Maven.
//!
//! Maven resolves dependencies and compiles as part of `package`, so the
//! framework asks for no earlier stages before packaging.

mod cli;

pub use cli::{JavacCli, MavenCli, ProcessJavacCli, ProcessMavenCli, MIN_JAVAC_VERSION};

#[cfg(test)]
pub use cli::{MockJavacCli, MockMavenCli};

use super::{
    copy_into_staging, find_single_artifact, validate_package_output, ExternalTool, FrameworkRequirements,
    FrameworkService, ServiceBuildResult, ServicePackageResult, ServiceProgress, ServiceRestoreResult, StageTask,
    StagingDir,
};
use crate::context::PipelineContext;
use crate::errors::{PackflowError, Result};
use crate::project::ServiceConfig;
use crate::task::ProgressTask;
use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

/// The conventional package name App Service expects for Java apps.
pub const APP_SERVICE_JAVA_PACKAGE_NAME: &str = "app.jar";

const STAGING_PREFIX: &str = "packflow";
const DEFAULT_OUTPUT_DIR: &str = "target";
const ARTIFACT_EXTENSION: &str = "jar";

/// A Maven project.
#[derive(Clone)]
pub struct MavenProject {
    maven: Arc<dyn MavenCli>,
    javac: Arc<dyn JavacCli>,
}

impl MavenProject {
    /// Creates a Maven project over the given tool adapters.
    pub fn new(maven: Arc<dyn MavenCli>, javac: Arc<dyn JavacCli>) -> Self {
        Self { maven, javac }
    }

    /// Creates a Maven project that runs the real `mvn` and `javac`.
    #[must_use]
    pub fn with_process_tools() -> Self {
        Self::new(Arc::new(ProcessMavenCli::new()), Arc::new(ProcessJavacCli))
    }
}

impl std::fmt::Debug for MavenProject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MavenProject").finish_non_exhaustive()
    }
}

/// Turns an adapter failure into a pipeline error.
///
/// A failure caused by cancellation is reported as such rather than as a
/// tool error.
fn tool_error(ctx: &PipelineContext, operation: &str, path: &Path, err: &anyhow::Error) -> PackflowError {
    if ctx.is_cancelled() {
        return ctx.cancelled_error();
    }
    PackflowError::tool_invocation(operation, path, format!("{err:#}"))
}

#[async_trait]
impl FrameworkService for MavenProject {
    fn name(&self) -> &str {
        "maven"
    }

    fn requirements(&self) -> FrameworkRequirements {
        FrameworkRequirements::package_only()
    }

    fn required_external_tools(&self) -> Vec<Arc<dyn ExternalTool>> {
        vec![
            Arc::new(MavenTool(self.maven.clone())),
            Arc::new(JavacTool(self.javac.clone())),
        ]
    }

    async fn initialize(&self, _ctx: &PipelineContext, service: &ServiceConfig) -> Result<()> {
        self.maven.set_path(&service.path(), &service.project_path);
        Ok(())
    }

    fn restore(&self, ctx: &PipelineContext, service: &ServiceConfig) -> StageTask<ServiceRestoreResult> {
        let maven = self.maven.clone();
        let ctx = ctx.clone();
        let service_path = service.path();

        ProgressTask::spawn(move |progress| async move {
            progress.report(ServiceProgress::new("Resolving maven dependencies"));
            maven
                .resolve_dependencies(&ctx, &service_path)
                .await
                .map_err(|e| tool_error(&ctx, "resolving maven dependencies", &service_path, &e))?;
            Ok(ServiceRestoreResult::default())
        })
    }

    fn build(
        &self,
        ctx: &PipelineContext,
        service: &ServiceConfig,
        restore_output: Option<ServiceRestoreResult>,
    ) -> StageTask<ServiceBuildResult> {
        let maven = self.maven.clone();
        let ctx = ctx.clone();
        let service_path = service.path();

        ProgressTask::spawn(move |progress| async move {
            progress.report(ServiceProgress::new("Compiling maven project"));
            maven
                .compile(&ctx, &service_path)
                .await
                .map_err(|e| tool_error(&ctx, "compiling maven project", &service_path, &e))?;
            Ok(ServiceBuildResult::new(restore_output, service_path))
        })
    }

    fn package(
        &self,
        ctx: &PipelineContext,
        service: &ServiceConfig,
        build_output: Option<ServiceBuildResult>,
    ) -> StageTask<ServicePackageResult> {
        let maven = self.maven.clone();
        let ctx = ctx.clone();
        let service_path = service.path();
        let output_path = service.output_path.clone();

        ProgressTask::spawn(move |progress| async move {
            let staging = StagingDir::create(STAGING_PREFIX)?;

            progress.report(ServiceProgress::new("Packaging maven project"));
            maven
                .package(&ctx, &service_path)
                .await
                .map_err(|e| tool_error(&ctx, "packaging maven project", &service_path, &e))?;

            let source_root = build_output
                .as_ref()
                .map(|build| build.build_output_path.clone())
                .filter(|path| !path.as_os_str().is_empty())
                .unwrap_or_else(|| service_path.clone());
            let source_dir = source_root.join(output_path.as_deref().unwrap_or(DEFAULT_OUTPUT_DIR));

            let artifact = find_single_artifact(&source_dir, ARTIFACT_EXTENSION).await?;
            debug!(artifact = %artifact.display(), "Found package artifact");

            progress.report(ServiceProgress::new("Copying deployment package"));
            copy_into_staging(&artifact, staging.path(), APP_SERVICE_JAVA_PACKAGE_NAME).await?;
            validate_package_output(staging.path()).await?;

            Ok(ServicePackageResult::new(build_output, staging.persist()))
        })
    }
}

struct MavenTool(Arc<dyn MavenCli>);

#[async_trait]
impl ExternalTool for MavenTool {
    fn name(&self) -> &str {
        "Maven"
    }

    fn install_url(&self) -> &str {
        "https://maven.apache.org"
    }

    async fn check_installed(&self, ctx: &PipelineContext) -> Result<()> {
        self.0.check_installed(ctx).await.map_err(|e| PackflowError::ToolMissing {
            tool: self.name().to_string(),
            install_url: self.install_url().to_string(),
            message: format!("{e:#}"),
        })
    }
}

struct JavacTool(Arc<dyn JavacCli>);

#[async_trait]
impl ExternalTool for JavacTool {
    fn name(&self) -> &str {
        "javac"
    }

    fn install_url(&self) -> &str {
        "https://www.microsoft.com/openjdk/download"
    }

    async fn check_installed(&self, ctx: &PipelineContext) -> Result<()> {
        self.0.check_installed(ctx).await.map_err(|e| PackflowError::ToolMissing {
            tool: self.name().to_string(),
            install_url: self.install_url().to_string(),
            message: format!("{e:#}"),
        })
    }
}
