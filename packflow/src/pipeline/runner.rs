//! Sequential package runs across a project's services.

use super::selection::{is_selected, resolve_target};
use super::{JsonFormatter, OutputFormat, OutputFormatter, PackageOptions, PackageResults, PackageSnapshot};
use crate::context::PipelineContext;
use crate::errors::Result;
use crate::events::{NoOpProgressSink, ProgressSink, StepOutcome};
use crate::framework::{ensure_all_installed, ServicePackageResult, StageTask};
use crate::project::{ProjectConfig, ServiceConfig};
use crate::service::ServiceManager;
use futures::StreamExt;
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tokio::task::JoinHandle;
use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;

/// Header reported after a successful run.
pub const PACKAGED_MESSAGE: &str = "Your app has been packaged!";

/// Outcome of a successful package run.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageRunResult {
    /// The run this result belongs to.
    pub run_id: Uuid,
    /// Results of the packaged services, in run order.
    pub results: PackageResults,
    /// Summary message.
    pub message: String,
    /// Wall-clock duration in milliseconds.
    pub duration_ms: f64,
}

/// Packages a project's services one after another.
///
/// Every service is announced to the sink in stable order. Unselected
/// services are reported as skipped without being invoked. The first
/// failure stops the run and no results are returned.
pub struct PackagePipeline {
    services: Arc<ServiceManager>,
    sink: Arc<dyn ProgressSink>,
    formatter: Option<Arc<dyn OutputFormatter>>,
}

impl PackagePipeline {
    /// Creates a pipeline that reports nothing.
    #[must_use]
    pub fn new(services: Arc<ServiceManager>) -> Self {
        Self {
            services,
            sink: Arc::new(NoOpProgressSink),
            formatter: None,
        }
    }

    /// Sets the progress sink.
    #[must_use]
    pub fn with_sink(mut self, sink: Arc<dyn ProgressSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Sets the formatter used for JSON output.
    ///
    /// Without one, JSON reports go to standard output.
    #[must_use]
    pub fn with_formatter(mut self, formatter: Arc<dyn OutputFormatter>) -> Self {
        self.formatter = Some(formatter);
        self
    }

    /// Packages the selected services of `project`.
    pub async fn run(
        &self,
        ctx: &PipelineContext,
        project: &ProjectConfig,
        options: &PackageOptions,
    ) -> Result<PackageRunResult> {
        let span = info_span!("package", run_id = %ctx.run_id(), project = %project.name);
        self.execute(ctx, project, options).instrument(span).await
    }

    async fn execute(
        &self,
        ctx: &PipelineContext,
        project: &ProjectConfig,
        options: &PackageOptions,
    ) -> Result<PackageRunResult> {
        let start = Instant::now();
        let target = resolve_target(project, options)?;
        let services = project.services_stable();

        let selected: Vec<&ServiceConfig> = services
            .iter()
            .copied()
            .filter(|service| is_selected(target.as_deref(), service))
            .collect();

        // Frameworks locate their tools from the service paths bound here.
        ctx.check_cancelled()?;
        for service in &selected {
            self.services.initialize(ctx, service).await?;
        }
        self.ensure_tools(ctx, &selected).await?;

        let mut results = PackageResults::new();
        for service in services {
            ctx.check_cancelled()?;

            let step = format!("Packaging service {}", service.name);
            self.sink.stage_started(&service.name, &step);

            if !is_selected(target.as_deref(), service) {
                self.sink.stage_finished(&service.name, &step, StepOutcome::Skipped);
                continue;
            }

            match self.package_service(ctx, service).await {
                Ok(result) => {
                    self.sink.stage_finished(&service.name, &step, StepOutcome::Done);
                    self.sink.package_reported(&service.name, &result);
                    info!(
                        service = %service.name,
                        package_path = %result.package_path.display(),
                        "Packaged service"
                    );
                    results.insert(service.name.clone(), result);
                }
                Err(e) => {
                    self.sink.stage_finished(&service.name, &step, StepOutcome::Failed);
                    warn!(service = %service.name, error = %e, "Packaging failed");
                    return Err(e);
                }
            }
        }

        if options.output == OutputFormat::Json {
            let snapshot = PackageSnapshot::new(results.clone());
            match &self.formatter {
                Some(formatter) => formatter.format(&snapshot)?,
                None => JsonFormatter::stdout().format(&snapshot)?,
            }
        }

        Ok(PackageRunResult {
            run_id: ctx.run_id(),
            results,
            message: PACKAGED_MESSAGE.to_string(),
            duration_ms: start.elapsed().as_secs_f64() * 1000.0,
        })
    }

    async fn ensure_tools(&self, ctx: &PipelineContext, services: &[&ServiceConfig]) -> Result<()> {
        let mut tools = Vec::new();
        for service in services {
            tools.extend(self.services.required_external_tools(service)?);
        }
        ensure_all_installed(ctx, &tools).await
    }

    async fn package_service(&self, ctx: &PipelineContext, service: &ServiceConfig) -> Result<ServicePackageResult> {
        let task = self.services.package(ctx, service, None);
        let observer = self.observe(&task, &service.name);

        let outcome = task.wait().await;
        if let Err(e) = observer.await {
            warn!(service = %service.name, error = %e, "Progress observer failed");
        }
        outcome
    }

    /// Forwards a task's progress to the sink until the stream closes.
    fn observe(&self, task: &StageTask<ServicePackageResult>, service: &str) -> JoinHandle<()> {
        let mut stream = task.progress();
        let sink = self.sink.clone();
        let service = service.to_string();

        tokio::spawn(async move {
            while let Some(progress) = stream.next().await {
                debug!(service = %service, message = %progress.message, "Service progress");
                sink.progress(&service, &progress.message);
            }
        })
    }
}

impl std::fmt::Debug for PackagePipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PackagePipeline")
            .field("services", &self.services)
            .field("has_formatter", &self.formatter.is_some())
            .finish_non_exhaustive()
    }
}
