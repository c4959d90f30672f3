//! End-to-end package runs through the Maven framework with fake tools.

use async_trait::async_trait;
use packflow::framework::maven::{JavacCli, MavenCli, ProcessMavenCli};
use packflow::prelude::*;
use packflow::testing::{assert_outcomes, assert_stage_failure, SharedBuffer};
use parking_lot::Mutex;
use pretty_assertions::assert_eq;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Writes the configured jars into `target/` when packaging.
#[derive(Default)]
struct FakeMaven {
    jars: Vec<String>,
    goals: Mutex<Vec<(String, PathBuf)>>,
}

impl FakeMaven {
    fn producing(jars: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            jars: jars.iter().map(ToString::to_string).collect(),
            goals: Mutex::new(Vec::new()),
        })
    }

    fn goals(&self) -> Vec<(String, PathBuf)> {
        self.goals.lock().clone()
    }
}

#[async_trait]
impl MavenCli for FakeMaven {
    fn set_path(&self, _service_path: &Path, _project_path: &Path) {}

    async fn check_installed(&self, _ctx: &PipelineContext) -> anyhow::Result<()> {
        Ok(())
    }

    async fn resolve_dependencies(&self, _ctx: &PipelineContext, project_path: &Path) -> anyhow::Result<()> {
        self.goals.lock().push(("dependency:resolve".to_string(), project_path.to_path_buf()));
        Ok(())
    }

    async fn compile(&self, _ctx: &PipelineContext, project_path: &Path) -> anyhow::Result<()> {
        self.goals.lock().push(("compile".to_string(), project_path.to_path_buf()));
        Ok(())
    }

    async fn package(&self, _ctx: &PipelineContext, project_path: &Path) -> anyhow::Result<()> {
        self.goals.lock().push(("package".to_string(), project_path.to_path_buf()));
        let target = project_path.join("target");
        std::fs::create_dir_all(&target)?;
        for jar in &self.jars {
            std::fs::write(target.join(jar), jar.as_bytes())?;
        }
        Ok(())
    }
}

struct FakeJavac;

#[async_trait]
impl JavacCli for FakeJavac {
    async fn check_installed(&self, _ctx: &PipelineContext) -> anyhow::Result<()> {
        Ok(())
    }
}

fn project(root: &Path) -> ProjectConfig {
    ProjectConfig::from_json_str(
        r#"{
            "name": "shop",
            "services": {
                "web": { "project": "src/web", "language": "java" },
                "api": { "project": "src/api", "language": "java" }
            }
        }"#,
        root,
    )
    .unwrap()
}

fn pipeline(maven: Arc<FakeMaven>, sink: Arc<CollectingProgressSink>) -> PackagePipeline {
    let registry = FrameworkRegistry::new().with_framework(ServiceLanguage::Java, move |_| {
        Arc::new(MavenProject::new(maven.clone(), Arc::new(FakeJavac))) as Arc<dyn FrameworkService>
    });
    PackagePipeline::new(Arc::new(ServiceManager::new(registry))).with_sink(sink)
}

fn cleanup(result: &PackageRunResult) {
    for (_, package) in result.results.iter() {
        let _ = std::fs::remove_dir_all(&package.package_path);
    }
}

#[tokio::test]
async fn packages_every_service_into_app_jar() {
    let root = tempfile::tempdir().unwrap();
    let project = project(root.path());
    let maven = FakeMaven::producing(&["service-1.0.jar"]);
    let sink = Arc::new(CollectingProgressSink::new());

    let result = pipeline(maven.clone(), sink.clone())
        .run(&PipelineContext::new(), &project, &PackageOptions::new())
        .await
        .unwrap();

    assert_eq!(result.results.names(), vec!["api", "web"]);
    for (_, package) in result.results.iter() {
        let jar = package.package_path.join("app.jar");
        assert_eq!(std::fs::read(jar).unwrap(), b"service-1.0.jar");
    }

    assert_eq!(
        sink.progress_for("api"),
        vec!["Packaging maven project".to_string(), "Copying deployment package".to_string()]
    );
    assert_outcomes(&sink, &[("api", StepOutcome::Done), ("web", StepOutcome::Done)]);

    let goals: Vec<String> = maven.goals().into_iter().map(|(goal, _)| goal).collect();
    assert_eq!(goals, vec!["package".to_string(), "package".to_string()]);
    cleanup(&result);
}

#[tokio::test]
async fn ambiguous_jars_fail_the_run() {
    let root = tempfile::tempdir().unwrap();
    let project = project(root.path());
    let maven = FakeMaven::producing(&["app.jar", "app-sources.jar"]);
    let sink = Arc::new(CollectingProgressSink::new());

    let err = pipeline(maven, sink.clone())
        .run(&PipelineContext::new(), &project, &PackageOptions::new())
        .await
        .unwrap_err();

    assert_stage_failure(&err, "api", ServiceStage::Package);
    assert!(err.to_string().contains("app-sources.jar, app.jar"));
    assert_outcomes(&sink, &[("api", StepOutcome::Failed)]);
}

#[tokio::test]
async fn target_packages_one_service_and_reports_json() {
    let root = tempfile::tempdir().unwrap();
    let project = project(root.path());
    let maven = FakeMaven::producing(&["web.jar"]);
    let sink = Arc::new(CollectingProgressSink::new());
    let buffer = SharedBuffer::new();

    let result = pipeline(maven.clone(), sink.clone())
        .with_formatter(Arc::new(JsonFormatter::new(buffer.clone())))
        .run(
            &PipelineContext::new(),
            &project,
            &PackageOptions::new().with_target("web").with_output(OutputFormat::Json),
        )
        .await
        .unwrap();

    assert_eq!(result.results.names(), vec!["web"]);
    assert_eq!(maven.goals(), vec![("package".to_string(), root.path().join("src/web"))]);
    assert_outcomes(&sink, &[("api", StepOutcome::Skipped), ("web", StepOutcome::Done)]);

    let report: serde_json::Value = serde_json::from_str(&buffer.contents()).unwrap();
    let package_path = result.results.get("web").unwrap().package_path.clone();
    assert_eq!(report["services"]["web"]["packagePath"], package_path.display().to_string());
    assert!(report["services"].get("api").is_none());
    cleanup(&result);
}

#[tokio::test]
async fn unknown_target_touches_nothing() {
    let root = tempfile::tempdir().unwrap();
    let project = project(root.path());
    let maven = FakeMaven::producing(&["x.jar"]);
    let sink = Arc::new(CollectingProgressSink::new());

    let err = pipeline(maven.clone(), sink.clone())
        .run(&PipelineContext::new(), &project, &PackageOptions::new().with_target("missing"))
        .await
        .unwrap_err();

    assert!(matches!(err, PackflowError::ServiceNotFound { .. }));
    assert!(maven.goals().is_empty());
    assert!(sink.is_empty());
}

#[cfg(unix)]
fn write_wrapper(root: &Path, package_script: &str) {
    use std::os::unix::fs::PermissionsExt;

    let script = format!(
        "#!/bin/sh\ncase \"$1\" in\n  --version) echo \"Apache Maven (wrapper)\" ;;\n  package) {package_script} ;;\nesac\n"
    );
    let wrapper = root.join("mvnw");
    std::fs::write(&wrapper, script).unwrap();
    std::fs::set_permissions(&wrapper, std::fs::Permissions::from_mode(0o755)).unwrap();
}

#[cfg(unix)]
fn wrapper_pipeline(root: &Path) -> (ProjectConfig, PackagePipeline) {
    let project = ProjectConfig::new("shop", root)
        .with_service(ServiceConfig::new("api", "src/api", ServiceLanguage::Java));
    std::fs::create_dir_all(root.join("src/api")).unwrap();

    let registry = FrameworkRegistry::new().with_framework(ServiceLanguage::Java, |_| {
        Arc::new(MavenProject::new(Arc::new(ProcessMavenCli::new()), Arc::new(FakeJavac))) as Arc<dyn FrameworkService>
    });
    (project, PackagePipeline::new(Arc::new(ServiceManager::new(registry))))
}

#[cfg(unix)]
#[tokio::test]
async fn project_wrapper_satisfies_maven_check() {
    let root = tempfile::tempdir().unwrap();
    write_wrapper(
        root.path(),
        "mkdir -p target && printf wrapped > target/api-1.0.jar",
    );
    let (project, pipeline) = wrapper_pipeline(root.path());

    let result = pipeline
        .run(&PipelineContext::new(), &project, &PackageOptions::new())
        .await
        .unwrap();

    let package = result.results.get("api").unwrap();
    assert_eq!(std::fs::read(package.package_path.join("app.jar")).unwrap(), b"wrapped");
    cleanup(&result);
}

#[cfg(unix)]
#[tokio::test]
async fn cancelling_during_package_stops_promptly() {
    let root = tempfile::tempdir().unwrap();
    write_wrapper(root.path(), "sleep 5");
    let (project, pipeline) = wrapper_pipeline(root.path());

    let ctx = PipelineContext::new();
    let canceller = ctx.clone();
    tokio::spawn(async move {
        tokio::time::sleep(std::time::Duration::from_millis(200)).await;
        canceller.cancel("interrupted");
    });

    let started = std::time::Instant::now();
    let err = pipeline
        .run(&ctx, &project, &PackageOptions::new())
        .await
        .unwrap_err();

    assert!(err.is_cancelled(), "unexpected error: {err}");
    assert!(started.elapsed() < std::time::Duration::from_secs(4));
}
