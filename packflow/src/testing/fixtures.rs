//! Test fixtures for package runs.

use parking_lot::Mutex;
use std::io::Write;
use std::sync::Arc;

use super::MockFrameworkService;
use crate::context::PipelineContext;
use crate::errors::Result;
use crate::events::CollectingProgressSink;
use crate::framework::{FrameworkRegistry, FrameworkService};
use crate::pipeline::{PackageOptions, PackagePipeline, PackageRunResult};
use crate::project::{ProjectConfig, ServiceConfig, ServiceLanguage};
use crate::service::ServiceManager;

/// A project of Java services wired to one shared mock framework.
#[derive(Debug)]
pub struct TestFixture {
    /// The project; service `name` lives at `src/<name>`.
    pub project: ProjectConfig,
    /// The framework every service resolves to.
    pub framework: Arc<MockFrameworkService>,
    /// Sink used by [`pipeline`](Self::pipeline).
    pub sink: Arc<CollectingProgressSink>,
    /// The service manager.
    pub services: Arc<ServiceManager>,
}

impl TestFixture {
    /// Creates a fixture with a default mock framework.
    #[must_use]
    pub fn new(names: &[&str]) -> Self {
        Self::with_framework(names, MockFrameworkService::new("mock"))
    }

    /// Creates a fixture around `framework`.
    #[must_use]
    pub fn with_framework(names: &[&str], framework: MockFrameworkService) -> Self {
        let project = names.iter().fold(
            ProjectConfig::new("fixture", "/workspace/fixture"),
            |project, name| project.with_service(ServiceConfig::new(*name, format!("src/{name}"), ServiceLanguage::Java)),
        );

        let framework = Arc::new(framework);
        let shared = framework.clone();
        let registry = FrameworkRegistry::new().with_framework(ServiceLanguage::Java, move |_| {
            shared.clone() as Arc<dyn FrameworkService>
        });

        Self {
            project,
            framework,
            sink: Arc::new(CollectingProgressSink::new()),
            services: Arc::new(ServiceManager::new(registry)),
        }
    }

    /// Builds a pipeline reporting to the fixture's sink.
    #[must_use]
    pub fn pipeline(&self) -> PackagePipeline {
        PackagePipeline::new(self.services.clone()).with_sink(self.sink.clone())
    }

    /// Runs the pipeline with a fresh context.
    pub async fn run(&self, options: &PackageOptions) -> Result<PackageRunResult> {
        self.pipeline()
            .run(&PipelineContext::new(), &self.project, options)
            .await
    }
}

/// An in-memory writer whose clones share one buffer.
#[derive(Debug, Clone, Default)]
pub struct SharedBuffer {
    bytes: Arc<Mutex<Vec<u8>>>,
}

impl SharedBuffer {
    /// Creates an empty buffer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns everything written so far.
    #[must_use]
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.bytes.lock()).into_owned()
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.bytes.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}
