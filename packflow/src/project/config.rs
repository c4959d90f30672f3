//! Configuration types for projects and their services.

use crate::errors::{PackflowError, Result};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// The build ecosystem a service belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ServiceLanguage {
    /// Java, built with Maven.
    #[serde(rename = "java")]
    Java,
    /// .NET.
    #[serde(rename = "dotnet")]
    DotNet,
    /// Python.
    #[serde(rename = "py", alias = "python")]
    Python,
    /// JavaScript.
    #[serde(rename = "js", alias = "javascript")]
    JavaScript,
    /// TypeScript.
    #[serde(rename = "ts", alias = "typescript")]
    TypeScript,
}

impl fmt::Display for ServiceLanguage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Java => write!(f, "java"),
            Self::DotNet => write!(f, "dotnet"),
            Self::Python => write!(f, "py"),
            Self::JavaScript => write!(f, "js"),
            Self::TypeScript => write!(f, "ts"),
        }
    }
}

/// One deployable unit within a project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Service name, unique within the project.
    #[serde(skip)]
    pub name: String,
    /// Path of the service relative to the project root.
    #[serde(rename = "project")]
    pub relative_path: String,
    /// Build output directory relative to the service path.
    #[serde(default, rename = "dist", skip_serializing_if = "Option::is_none")]
    pub output_path: Option<String>,
    /// The service's build ecosystem.
    pub language: ServiceLanguage,
    /// Name of the owning project.
    #[serde(skip)]
    pub project_name: String,
    /// Root path of the owning project.
    #[serde(skip)]
    pub project_path: PathBuf,
}

impl ServiceConfig {
    /// Creates a new service configuration.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        relative_path: impl Into<String>,
        language: ServiceLanguage,
    ) -> Self {
        Self {
            name: name.into(),
            relative_path: relative_path.into(),
            output_path: None,
            language,
            project_name: String::new(),
            project_path: PathBuf::new(),
        }
    }

    /// Sets the build output directory.
    #[must_use]
    pub fn with_output_path(mut self, output_path: impl Into<String>) -> Self {
        self.output_path = Some(output_path.into());
        self
    }

    /// Returns the absolute path of the service.
    #[must_use]
    pub fn path(&self) -> PathBuf {
        self.project_path.join(&self.relative_path)
    }
}

/// A project: a named root directory and its services.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProjectConfig {
    /// Project name.
    pub name: String,
    /// Project root directory.
    #[serde(skip)]
    pub path: PathBuf,
    /// Services keyed by name, in declaration order.
    services: IndexMap<String, ServiceConfig>,
}

#[derive(Deserialize)]
struct ProjectFile {
    name: String,
    #[serde(default)]
    services: IndexMap<String, ServiceConfig>,
}

impl ProjectConfig {
    /// Creates an empty project rooted at `path`.
    #[must_use]
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            services: IndexMap::new(),
        }
    }

    /// Parses a JSON project description rooted at `path`.
    ///
    /// The `services` object maps service names to their configuration.
    pub fn from_json_str(json: &str, path: impl Into<PathBuf>) -> Result<Self> {
        let file: ProjectFile =
            serde_json::from_str(json).map_err(|e| PackflowError::Config(e.to_string()))?;

        let mut project = Self::new(file.name, path);
        for (name, mut service) in file.services {
            service.name = name;
            project = project.with_service(service);
        }
        Ok(project)
    }

    /// Adds a service, binding it to this project.
    ///
    /// A service with the same name is replaced in place.
    #[must_use]
    pub fn with_service(mut self, mut service: ServiceConfig) -> Self {
        service.project_name.clone_from(&self.name);
        service.project_path.clone_from(&self.path);

        self.services.insert(service.name.clone(), service);
        self
    }

    /// Returns the services in declaration order.
    pub fn services(&self) -> impl Iterator<Item = &ServiceConfig> {
        self.services.values()
    }

    /// Number of services.
    #[must_use]
    pub fn len(&self) -> usize {
        self.services.len()
    }

    /// Returns the services in a stable, name-sorted order.
    ///
    /// Every run over the same project visits services in the same order.
    #[must_use]
    pub fn services_stable(&self) -> Vec<&ServiceConfig> {
        let mut services: Vec<&ServiceConfig> = self.services.values().collect();
        services.sort_by(|a, b| a.name.cmp(&b.name));
        services
    }

    /// Looks up a service by name.
    #[must_use]
    pub fn get_service(&self, name: &str) -> Option<&ServiceConfig> {
        self.services.get(name)
    }

    /// Finds the service whose directory is `dir`.
    #[must_use]
    pub fn service_at(&self, dir: &Path) -> Option<&ServiceConfig> {
        self.services.values().find(|s| s.path() == dir)
    }

    /// Returns true if the project has no services.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sample() -> ProjectConfig {
        ProjectConfig::new("shop", "/work/shop")
            .with_service(ServiceConfig::new("web", "src/web", ServiceLanguage::JavaScript))
            .with_service(ServiceConfig::new("api", "src/api", ServiceLanguage::Java))
    }

    #[test]
    fn test_services_stable_sorted_by_name() {
        let project = sample();
        let names: Vec<&str> = project.services_stable().iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["api", "web"]);
    }

    #[test]
    fn test_service_bound_to_project() {
        let project = sample();
        let api = project.get_service("api").unwrap();

        assert_eq!(api.project_name, "shop");
        assert_eq!(api.path(), PathBuf::from("/work/shop/src/api"));
        assert!(project.get_service("missing").is_none());
    }

    #[test]
    fn test_with_service_replaces_same_name() {
        let project = sample().with_service(
            ServiceConfig::new("api", "svc/api", ServiceLanguage::Java).with_output_path("build"),
        );

        assert_eq!(project.len(), 2);
        let api = project.get_service("api").unwrap();
        assert_eq!(api.relative_path, "svc/api");
        assert_eq!(api.output_path.as_deref(), Some("build"));
    }

    #[test]
    fn test_replacing_service_keeps_its_position() {
        let project = sample().with_service(ServiceConfig::new("web", "apps/web", ServiceLanguage::TypeScript));
        let names: Vec<&str> = project.services().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["web", "api"]);
    }

    #[test]
    fn test_service_at_directory() {
        let project = sample();
        let found = project.service_at(Path::new("/work/shop/src/web")).unwrap();
        assert_eq!(found.name, "web");
        assert!(project.service_at(Path::new("/work/shop")).is_none());
    }

    #[test]
    fn test_from_json_str() {
        let json = r#"{
            "name": "shop",
            "services": {
                "web": { "project": "src/web", "language": "ts" },
                "api": { "project": "src/api", "language": "java", "dist": "out" }
            }
        }"#;

        let project = ProjectConfig::from_json_str(json, "/repo").unwrap();
        assert_eq!(project.name, "shop");
        assert_eq!(project.len(), 2);

        let declared: Vec<&str> = project.services().map(|s| s.name.as_str()).collect();
        assert_eq!(declared, vec!["web", "api"]);

        let api = project.get_service("api").unwrap();
        assert_eq!(api.language, ServiceLanguage::Java);
        assert_eq!(api.output_path.as_deref(), Some("out"));
        assert_eq!(api.path(), PathBuf::from("/repo/src/api"));
    }

    #[test]
    fn test_from_json_str_without_services() {
        let project = ProjectConfig::from_json_str(r#"{"name": "empty"}"#, "/repo").unwrap();
        assert!(project.is_empty());
    }

    #[test]
    fn test_from_json_str_rejects_unknown_language() {
        let json = r#"{"name": "x", "services": {"a": {"project": ".", "language": "cobol"}}}"#;
        assert!(ProjectConfig::from_json_str(json, "/repo").is_err());
    }

    #[test]
    fn test_serialize_round_shape() {
        let value = serde_json::to_value(sample()).unwrap();
        assert_eq!(value["name"], "shop");
        assert_eq!(value["services"]["api"]["language"], "java");
        assert_eq!(value["services"]["web"]["project"], "src/web");
    }
}
