//! Mock frameworks and tools for testing.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::context::PipelineContext;
use crate::errors::{PackflowError, Result, ServiceStage};
use crate::framework::{
    ExternalTool, FrameworkRequirements, FrameworkService, ServiceBuildResult, ServicePackageResult,
    ServiceProgress, ServiceRestoreResult, StageTask,
};
use crate::project::ServiceConfig;
use crate::task::ProgressTask;

/// A framework that records every stage call and never touches the disk.
///
/// Each stage reports the configured progress messages prefixed with the
/// stage name, e.g. `"build: compiling"`. Failures are configured per
/// service and stage. Package results point at `/packages/<service>`.
#[derive(Debug)]
pub struct MockFrameworkService {
    name: String,
    requirements: FrameworkRequirements,
    progress: Vec<String>,
    failures: Mutex<HashMap<(String, ServiceStage), PackflowError>>,
    calls: Mutex<Vec<(String, ServiceStage)>>,
    tools: Vec<Arc<StaticTool>>,
}

impl MockFrameworkService {
    /// Creates a mock that needs no earlier stages and always succeeds.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            requirements: FrameworkRequirements::package_only(),
            progress: Vec::new(),
            failures: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
            tools: Vec::new(),
        }
    }

    /// Sets the stage requirements.
    #[must_use]
    pub fn with_requirements(mut self, requirements: FrameworkRequirements) -> Self {
        self.requirements = requirements;
        self
    }

    /// Sets the progress messages every stage reports.
    #[must_use]
    pub fn with_progress<I, S>(mut self, messages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.progress = messages.into_iter().map(Into::into).collect();
        self
    }

    /// Adds a required tool.
    #[must_use]
    pub fn with_tool(mut self, tool: Arc<StaticTool>) -> Self {
        self.tools.push(tool);
        self
    }

    /// Makes `stage` fail with `error` for `service`.
    #[must_use]
    pub fn failing_at(self, service: impl Into<String>, stage: ServiceStage, error: PackflowError) -> Self {
        self.failures.lock().insert((service.into(), stage), error);
        self
    }

    /// Returns every `(service, stage)` call in order.
    #[must_use]
    pub fn calls(&self) -> Vec<(String, ServiceStage)> {
        self.calls.lock().clone()
    }

    /// Returns the stages called for `service`, in order.
    #[must_use]
    pub fn stages_for(&self, service: &str) -> Vec<ServiceStage> {
        self.calls
            .lock()
            .iter()
            .filter(|(s, _)| s == service)
            .map(|(_, stage)| *stage)
            .collect()
    }

    /// Returns the services packaged, in order.
    #[must_use]
    pub fn packaged(&self) -> Vec<String> {
        self.calls
            .lock()
            .iter()
            .filter(|(_, stage)| *stage == ServiceStage::Package)
            .map(|(service, _)| service.clone())
            .collect()
    }

    /// Clears recorded calls.
    pub fn reset(&self) {
        self.calls.lock().clear();
    }

    fn record(&self, service: &ServiceConfig, stage: ServiceStage) -> Option<PackflowError> {
        self.calls.lock().push((service.name.clone(), stage));
        self.failures.lock().get(&(service.name.clone(), stage)).cloned()
    }

    fn stage_task<R>(&self, service: &ServiceConfig, stage: ServiceStage, result: R) -> StageTask<R>
    where
        R: Send + Sync + 'static,
    {
        let failure = self.record(service, stage);
        let messages: Vec<ServiceProgress> = self
            .progress
            .iter()
            .map(|message| ServiceProgress::new(format!("{stage}: {message}")))
            .collect();

        ProgressTask::spawn(move |progress| async move {
            for message in messages {
                progress.report(message);
                tokio::task::yield_now().await;
            }
            match failure {
                Some(error) => Err(error),
                None => Ok(result),
            }
        })
    }
}

#[async_trait]
impl FrameworkService for MockFrameworkService {
    fn name(&self) -> &str {
        &self.name
    }

    fn requirements(&self) -> FrameworkRequirements {
        self.requirements
    }

    fn required_external_tools(&self) -> Vec<Arc<dyn ExternalTool>> {
        self.tools
            .iter()
            .map(|tool| tool.clone() as Arc<dyn ExternalTool>)
            .collect()
    }

    async fn initialize(&self, _ctx: &PipelineContext, service: &ServiceConfig) -> Result<()> {
        match self.record(service, ServiceStage::Initialize) {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    fn restore(&self, _ctx: &PipelineContext, service: &ServiceConfig) -> StageTask<ServiceRestoreResult> {
        self.stage_task(service, ServiceStage::Restore, ServiceRestoreResult::default())
    }

    fn build(
        &self,
        _ctx: &PipelineContext,
        service: &ServiceConfig,
        restore_output: Option<ServiceRestoreResult>,
    ) -> StageTask<ServiceBuildResult> {
        let result = ServiceBuildResult::new(restore_output, service.path());
        self.stage_task(service, ServiceStage::Build, result)
    }

    fn package(
        &self,
        _ctx: &PipelineContext,
        service: &ServiceConfig,
        build_output: Option<ServiceBuildResult>,
    ) -> StageTask<ServicePackageResult> {
        let package_path = PathBuf::from("/packages").join(&service.name);
        let result = ServicePackageResult::new(build_output, package_path);
        self.stage_task(service, ServiceStage::Package, result)
    }
}

/// An external tool whose installation state is fixed.
#[derive(Debug)]
pub struct StaticTool {
    name: String,
    installed: bool,
    checks: AtomicUsize,
}

impl StaticTool {
    /// A tool that is installed.
    #[must_use]
    pub fn installed(name: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            name: name.into(),
            installed: true,
            checks: AtomicUsize::new(0),
        })
    }

    /// A tool that is missing.
    #[must_use]
    pub fn missing(name: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            name: name.into(),
            installed: false,
            checks: AtomicUsize::new(0),
        })
    }

    /// Number of times the tool was checked.
    #[must_use]
    pub fn check_count(&self) -> usize {
        self.checks.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ExternalTool for StaticTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn install_url(&self) -> &str {
        "https://example.com/install"
    }

    async fn check_installed(&self, _ctx: &PipelineContext) -> Result<()> {
        self.checks.fetch_add(1, Ordering::SeqCst);
        if self.installed {
            Ok(())
        } else {
            Err(PackflowError::ToolMissing {
                tool: self.name.clone(),
                install_url: self.install_url().to_string(),
                message: "not found on PATH".to_string(),
            })
        }
    }
}
