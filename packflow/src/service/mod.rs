//! Drives a service through its framework's stages.
//!
//! [`ServiceManager`] resolves and initializes the framework for each
//! service once, then runs Restore, Build and Package in the order the
//! framework asks for. Inner stage progress is forwarded into a single outer task so a
//! caller observes one stream per service.

use crate::context::PipelineContext;
use crate::errors::{PackflowError, Result, ServiceStage};
use crate::framework::{
    ExternalTool, FrameworkRegistry, FrameworkService, ServiceBuildResult, ServicePackageResult, ServiceProgress,
    ServiceRestoreResult, StageTask,
};
use crate::project::ServiceConfig;
use crate::task::{ProgressReporter, ProgressTask};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::{debug, instrument};

/// A resolved framework and its one-time initialization.
#[derive(Clone)]
struct Resolved {
    framework: Arc<dyn FrameworkService>,
    initialized: Arc<OnceCell<()>>,
}

/// Runs service lifecycle stages through the registered frameworks.
pub struct ServiceManager {
    registry: FrameworkRegistry,
    frameworks: Mutex<HashMap<(String, String), Resolved>>,
}

impl ServiceManager {
    /// Creates a manager over the given registry.
    #[must_use]
    pub fn new(registry: FrameworkRegistry) -> Self {
        Self {
            registry,
            frameworks: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the framework for a service, creating it on first use.
    pub fn framework(&self, service: &ServiceConfig) -> Result<Arc<dyn FrameworkService>> {
        Ok(self.resolve(service)?.framework)
    }

    fn resolve(&self, service: &ServiceConfig) -> Result<Resolved> {
        let key = (service.project_name.clone(), service.name.clone());
        let mut frameworks = self.frameworks.lock();
        if let Some(resolved) = frameworks.get(&key) {
            return Ok(resolved.clone());
        }

        let framework = self.registry.resolve(service)?;
        debug!(service = %service.name, framework = framework.name(), "Resolved framework");
        let resolved = Resolved {
            framework,
            initialized: Arc::new(OnceCell::new()),
        };
        frameworks.insert(key, resolved.clone());
        Ok(resolved)
    }

    /// Binds the service's framework to the service.
    ///
    /// Runs at most once per service; later calls return immediately. A
    /// failed initialization is retried on the next call.
    pub async fn initialize(&self, ctx: &PipelineContext, service: &ServiceConfig) -> Result<()> {
        let resolved = self.resolve(service)?;
        initialize_once(ctx, &resolved, service).await
    }

    /// Tools the service's framework needs.
    pub fn required_external_tools(&self, service: &ServiceConfig) -> Result<Vec<Arc<dyn ExternalTool>>> {
        Ok(self.framework(service)?.required_external_tools())
    }

    /// Restores the service's dependencies.
    pub fn restore(&self, ctx: &PipelineContext, service: &ServiceConfig) -> StageTask<ServiceRestoreResult> {
        match self.framework(service) {
            Ok(framework) => attribute(framework.restore(ctx, service), service, ServiceStage::Restore),
            Err(e) => ProgressTask::failed(e),
        }
    }

    /// Builds the service.
    pub fn build(
        &self,
        ctx: &PipelineContext,
        service: &ServiceConfig,
        restore_output: Option<ServiceRestoreResult>,
    ) -> StageTask<ServiceBuildResult> {
        match self.framework(service) {
            Ok(framework) => attribute(
                framework.build(ctx, service, restore_output),
                service,
                ServiceStage::Build,
            ),
            Err(e) => ProgressTask::failed(e),
        }
    }

    /// Packages the service.
    ///
    /// Without a `build_output`, initializes the framework if that has not
    /// happened yet and runs restore and build first when the framework
    /// requires them. Progress from every
    /// stage arrives on the returned task in stage order.
    pub fn package(
        &self,
        ctx: &PipelineContext,
        service: &ServiceConfig,
        build_output: Option<ServiceBuildResult>,
    ) -> StageTask<ServicePackageResult> {
        let resolved = match self.resolve(service) {
            Ok(resolved) => resolved,
            Err(e) => return ProgressTask::failed(e),
        };
        let ctx = ctx.clone();
        let service = service.clone();

        ProgressTask::spawn(move |progress| async move {
            run_package(&ctx, &resolved, &service, build_output, &progress).await
        })
    }
}

impl std::fmt::Debug for ServiceManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceManager")
            .field("registry", &self.registry)
            .field("resolved", &self.frameworks.lock().len())
            .finish()
    }
}

async fn initialize_once(ctx: &PipelineContext, resolved: &Resolved, service: &ServiceConfig) -> Result<()> {
    resolved
        .initialized
        .get_or_try_init(|| async {
            debug!(service = %service.name, "Initializing framework");
            resolved.framework.initialize(ctx, service).await
        })
        .await
        .map(|_| ())
        .map_err(|e| e.in_stage(&service.name, ServiceStage::Initialize))
}

#[instrument(skip_all, fields(service = %service.name))]
async fn run_package(
    ctx: &PipelineContext,
    resolved: &Resolved,
    service: &ServiceConfig,
    build_output: Option<ServiceBuildResult>,
    progress: &ProgressReporter<ServiceProgress>,
) -> Result<ServicePackageResult> {
    let name = service.name.as_str();
    let framework = resolved.framework.as_ref();

    let build_output = match build_output {
        Some(build) => Some(build),
        None => {
            initialize_once(ctx, resolved, service).await?;

            let requirements = framework.requirements().package;
            let restore_output = if requirements.require_restore {
                ctx.check_cancelled().map_err(|e| e.in_stage(name, ServiceStage::Restore))?;
                debug!("Running restore before package");
                let task = framework.restore(ctx, service);
                Some(forward(task, progress).await.map_err(|e| e.in_stage(name, ServiceStage::Restore))?)
            } else {
                None
            };

            if requirements.require_build {
                ctx.check_cancelled().map_err(|e| e.in_stage(name, ServiceStage::Build))?;
                debug!("Running build before package");
                let task = framework.build(ctx, service, restore_output);
                Some(forward(task, progress).await.map_err(|e| e.in_stage(name, ServiceStage::Build))?)
            } else {
                None
            }
        }
    };

    ctx.check_cancelled().map_err(|e| e.in_stage(name, ServiceStage::Package))?;
    let task = framework.package(ctx, service, build_output);
    forward(task, progress)
        .await
        .map_err(|e| e.in_stage(name, ServiceStage::Package))
}

/// Relays an inner task's progress and returns its outcome.
async fn forward<R>(task: StageTask<R>, progress: &ProgressReporter<ServiceProgress>) -> Result<R>
where
    R: Clone + Send + Sync + 'static,
{
    let mut stream = task.progress();
    while let Some(message) = stream.recv().await {
        progress.report(message);
    }
    task.wait().await
}

/// Wraps a stage task so its error names the service and stage.
fn attribute<R>(task: StageTask<R>, service: &ServiceConfig, stage: ServiceStage) -> StageTask<R>
where
    R: Clone + Send + Sync + 'static,
{
    let name = service.name.clone();
    ProgressTask::spawn(move |progress| async move {
        forward(task, &progress)
            .await
            .map_err(|e: PackflowError| e.in_stage(name, stage))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::framework::FrameworkRequirements;
    use crate::project::{ProjectConfig, ServiceLanguage};
    use crate::testing::MockFrameworkService;
    use futures::StreamExt;
    use pretty_assertions::assert_eq;

    fn api() -> ServiceConfig {
        ProjectConfig::new("shop", "/work/shop")
            .with_service(ServiceConfig::new("api", "src/api", ServiceLanguage::Java))
            .get_service("api")
            .unwrap()
            .clone()
    }

    fn manager(framework: &Arc<MockFrameworkService>) -> ServiceManager {
        let framework = framework.clone();
        ServiceManager::new(
            FrameworkRegistry::new().with_framework(ServiceLanguage::Java, move |_| {
                framework.clone() as Arc<dyn FrameworkService>
            }),
        )
    }

    #[tokio::test]
    async fn test_package_only_framework_skips_restore_and_build() {
        let framework = Arc::new(MockFrameworkService::new("mock").with_progress(["Packaging"]));
        let manager = manager(&framework);

        let task = manager.package(&PipelineContext::new(), &api(), None);
        let messages: Vec<String> = task.progress().map(|p| p.message).collect::<Vec<_>>().await;
        task.wait().await.unwrap();

        assert_eq!(messages, vec!["package: Packaging".to_string()]);
        assert_eq!(
            framework.stages_for("api"),
            vec![ServiceStage::Initialize, ServiceStage::Package]
        );
    }

    #[tokio::test]
    async fn test_package_runs_required_stages_in_order() {
        let framework = Arc::new(
            MockFrameworkService::new("mock")
                .with_requirements(FrameworkRequirements::restore_and_build())
                .with_progress(["step"]),
        );
        let manager = manager(&framework);

        let task = manager.package(&PipelineContext::new(), &api(), None);
        let messages: Vec<String> = task.progress().map(|p| p.message).collect::<Vec<_>>().await;
        let result = task.wait().await.unwrap();

        assert_eq!(
            messages,
            vec![
                "restore: step".to_string(),
                "build: step".to_string(),
                "package: step".to_string(),
            ]
        );
        assert_eq!(
            framework.stages_for("api"),
            vec![
                ServiceStage::Initialize,
                ServiceStage::Restore,
                ServiceStage::Build,
                ServiceStage::Package,
            ]
        );
        let build = result.build.unwrap();
        assert!(build.restore.is_some());
    }

    #[tokio::test]
    async fn test_package_with_build_output_skips_earlier_stages() {
        let framework = Arc::new(
            MockFrameworkService::new("mock").with_requirements(FrameworkRequirements::restore_and_build()),
        );
        let manager = manager(&framework);
        let build = ServiceBuildResult::new(None, "/work/shop/src/api");

        let result = manager
            .package(&PipelineContext::new(), &api(), Some(build.clone()))
            .wait()
            .await
            .unwrap();

        assert_eq!(result.build, Some(build));
        assert_eq!(framework.stages_for("api"), vec![ServiceStage::Package]);
    }

    #[tokio::test]
    async fn test_inner_failure_names_stage() {
        let framework = Arc::new(
            MockFrameworkService::new("mock")
                .with_requirements(FrameworkRequirements::restore_and_build())
                .failing_at("api", ServiceStage::Build, PackflowError::TaskAbandoned),
        );
        let manager = manager(&framework);

        let err = manager.package(&PipelineContext::new(), &api(), None).wait().await.unwrap_err();
        match err {
            PackflowError::ServiceStage { service, stage, .. } => {
                assert_eq!(service, "api");
                assert_eq!(stage, ServiceStage::Build);
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(!framework.stages_for("api").contains(&ServiceStage::Package));
    }

    #[tokio::test]
    async fn test_cancelled_before_package() {
        let framework = Arc::new(MockFrameworkService::new("mock"));
        let manager = manager(&framework);
        let ctx = PipelineContext::new();
        ctx.cancel("stop");

        let err = manager.package(&ctx, &api(), None).wait().await.unwrap_err();
        assert!(err.is_cancelled());
        assert!(!framework.stages_for("api").contains(&ServiceStage::Package));
    }

    #[tokio::test]
    async fn test_direct_stage_calls_are_attributed() {
        let framework = Arc::new(MockFrameworkService::new("mock").failing_at(
            "api",
            ServiceStage::Restore,
            PackflowError::cancelled("x"),
        ));
        let manager = manager(&framework);
        let ctx = PipelineContext::new();

        let err = manager.restore(&ctx, &api()).wait().await.unwrap_err();
        assert!(matches!(err, PackflowError::ServiceStage { stage: ServiceStage::Restore, .. }));

        let build = manager.build(&ctx, &api(), None).wait().await.unwrap();
        assert_eq!(build.restore, None);
    }

    #[tokio::test]
    async fn test_framework_resolved_once_per_service() {
        let created = Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let counter = created.clone();
        let manager = ServiceManager::new(FrameworkRegistry::new().with_framework(
            ServiceLanguage::Java,
            move |_| {
                counter.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
                Arc::new(MockFrameworkService::new("mock")) as Arc<dyn FrameworkService>
            },
        ));

        let ctx = PipelineContext::new();
        manager.initialize(&ctx, &api()).await.unwrap();
        manager.required_external_tools(&api()).unwrap();
        manager.package(&ctx, &api(), None).wait().await.unwrap();

        assert_eq!(created.load(std::sync::atomic::Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_initialize_runs_once_per_service() {
        let framework = Arc::new(MockFrameworkService::new("mock"));
        let manager = manager(&framework);
        let ctx = PipelineContext::new();

        manager.initialize(&ctx, &api()).await.unwrap();
        manager.initialize(&ctx, &api()).await.unwrap();
        manager.package(&ctx, &api(), None).wait().await.unwrap();

        assert_eq!(
            framework.stages_for("api"),
            vec![ServiceStage::Initialize, ServiceStage::Package]
        );
    }

    #[tokio::test]
    async fn test_failed_initialize_is_retried() {
        let framework = Arc::new(MockFrameworkService::new("mock").failing_at(
            "api",
            ServiceStage::Initialize,
            PackflowError::TaskAbandoned,
        ));
        let manager = manager(&framework);
        let ctx = PipelineContext::new();

        let err = manager.initialize(&ctx, &api()).await.unwrap_err();
        assert!(matches!(err, PackflowError::ServiceStage { stage: ServiceStage::Initialize, .. }));

        let err = manager.package(&ctx, &api(), None).wait().await.unwrap_err();
        assert!(matches!(err, PackflowError::ServiceStage { stage: ServiceStage::Initialize, .. }));
        assert_eq!(
            framework.stages_for("api"),
            vec![ServiceStage::Initialize, ServiceStage::Initialize]
        );
    }

    #[tokio::test]
    async fn test_unsupported_language_fails_task() {
        let manager = ServiceManager::new(FrameworkRegistry::new());
        let err = manager.package(&PipelineContext::new(), &api(), None).wait().await.unwrap_err();
        assert!(matches!(err, PackflowError::UnsupportedLanguage { .. }));
    }
}
