//! Maps service languages to framework implementations.

use super::maven::MavenProject;
use super::FrameworkService;
use crate::errors::{PackflowError, Result};
use crate::project::{ServiceConfig, ServiceLanguage};
use std::collections::HashMap;
use std::sync::Arc;

/// Builds the framework instance for one service.
pub type FrameworkFactory = Arc<dyn Fn(&ServiceConfig) -> Arc<dyn FrameworkService> + Send + Sync>;

/// Registry of framework factories keyed by language.
///
/// A framework is created once per service when the service is first
/// resolved, never chosen by inspecting values at runtime.
#[derive(Clone, Default)]
pub struct FrameworkRegistry {
    factories: HashMap<ServiceLanguage, FrameworkFactory>,
}

impl FrameworkRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry with the built-in frameworks.
    ///
    /// Java services are built with Maven through the process-backed CLIs.
    #[must_use]
    pub fn with_defaults() -> Self {
        Self::new().with_framework(ServiceLanguage::Java, |_| {
            Arc::new(MavenProject::with_process_tools()) as Arc<dyn FrameworkService>
        })
    }

    /// Registers a factory for a language, replacing any previous one.
    pub fn register<F>(&mut self, language: ServiceLanguage, factory: F)
    where
        F: Fn(&ServiceConfig) -> Arc<dyn FrameworkService> + Send + Sync + 'static,
    {
        self.factories.insert(language, Arc::new(factory));
    }

    /// Registers a factory for a language.
    #[must_use]
    pub fn with_framework<F>(mut self, language: ServiceLanguage, factory: F) -> Self
    where
        F: Fn(&ServiceConfig) -> Arc<dyn FrameworkService> + Send + Sync + 'static,
    {
        self.register(language, factory);
        self
    }

    /// Returns true if a factory exists for the language.
    #[must_use]
    pub fn supports(&self, language: &ServiceLanguage) -> bool {
        self.factories.contains_key(language)
    }

    /// Creates the framework for a service.
    pub fn resolve(&self, service: &ServiceConfig) -> Result<Arc<dyn FrameworkService>> {
        self.factories
            .get(&service.language)
            .map(|factory| factory(service))
            .ok_or_else(|| PackflowError::UnsupportedLanguage {
                service: service.name.clone(),
                language: service.language.to_string(),
            })
    }
}

impl std::fmt::Debug for FrameworkRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut languages: Vec<String> = self.factories.keys().map(ToString::to_string).collect();
        languages.sort();
        f.debug_struct("FrameworkRegistry")
            .field("languages", &languages)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_support_java_only() {
        let registry = FrameworkRegistry::with_defaults();
        assert!(registry.supports(&ServiceLanguage::Java));
        assert!(!registry.supports(&ServiceLanguage::Python));
    }

    #[test]
    fn test_resolve_java_service() {
        let registry = FrameworkRegistry::with_defaults();
        let service = ServiceConfig::new("api", "src/api", ServiceLanguage::Java);

        let framework = registry.resolve(&service).unwrap();
        assert_eq!(framework.name(), "maven");
    }

    #[test]
    fn test_resolve_unsupported_language() {
        let registry = FrameworkRegistry::with_defaults();
        let service = ServiceConfig::new("web", "src/web", ServiceLanguage::TypeScript);

        match registry.resolve(&service) {
            Err(PackflowError::UnsupportedLanguage { service, language }) => {
                assert_eq!(service, "web");
                assert_eq!(language, "ts");
            }
            Err(other) => panic!("unexpected error: {other:?}"),
            Ok(_) => panic!("expected an error"),
        }
    }
}
