//! Error types for packflow.
//!
//! Every failure a pipeline run can surface is a [`PackflowError`]. The type
//! is `Clone` so a task's terminal outcome can be read any number of times.

use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

/// A stage in a service's build lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceStage {
    /// Binds the framework to a service configuration.
    Initialize,
    /// Resolves external dependencies.
    Restore,
    /// Compiles the service.
    Build,
    /// Produces the deployable artifact.
    Package,
}

impl fmt::Display for ServiceStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Initialize => write!(f, "initialize"),
            Self::Restore => write!(f, "restore"),
            Self::Build => write!(f, "build"),
            Self::Package => write!(f, "package"),
        }
    }
}

/// The main error type for packflow operations.
#[derive(Debug, Clone, Error)]
pub enum PackflowError {
    /// The requested target service does not exist in the project.
    #[error("service name '{name}' doesn't exist")]
    ServiceNotFound {
        /// The requested service name.
        name: String,
    },

    /// A target was requested but the project declares no services.
    #[error("project '{project}' does not contain any services")]
    NoServices {
        /// The project name.
        project: String,
    },

    /// The selection arguments contradict each other.
    #[error("invalid service selection: {0}")]
    InvalidSelection(String),

    /// The project configuration could not be parsed.
    #[error("invalid project configuration: {0}")]
    Config(String),

    /// No framework is registered for the service's language.
    #[error("service '{service}' uses unsupported language '{language}'")]
    UnsupportedLanguage {
        /// The service name.
        service: String,
        /// The declared language.
        language: String,
    },

    /// An external tool exited abnormally or could not be started.
    #[error("{operation} in {}: {message}", path.display())]
    ToolInvocation {
        /// What was being attempted.
        operation: String,
        /// The working path.
        path: PathBuf,
        /// The underlying failure.
        message: String,
    },

    /// A required external tool is not installed.
    #[error("required external tool '{tool}' is missing ({message}); see {install_url}")]
    ToolMissing {
        /// The tool name.
        tool: String,
        /// Where to get it.
        install_url: String,
        /// Why the check failed.
        message: String,
    },

    /// No candidate artifact was found in the output directory.
    #[error("no {} files found in {}", extension.to_uppercase(), dir.display())]
    NoArtifacts {
        /// The searched directory.
        dir: PathBuf,
        /// The artifact file extension.
        extension: String,
    },

    /// More than one candidate artifact was found in the output directory.
    #[error(
        "multiple {ext} files found in {}: {}. Only a single runnable {ext} file is expected",
        dir.display(),
        candidates.join(", "),
        ext = extension.to_uppercase()
    )]
    MultipleArtifacts {
        /// The searched directory.
        dir: PathBuf,
        /// The artifact file extension.
        extension: String,
        /// The candidate file names.
        candidates: Vec<String>,
    },

    /// The staging directory ended up empty.
    #[error("package output in {} is empty", dir.display())]
    EmptyPackage {
        /// The staging directory.
        dir: PathBuf,
    },

    /// The staging location could not be created or written.
    #[error("{operation}: {message}")]
    Staging {
        /// What was being attempted.
        operation: String,
        /// The underlying failure.
        message: String,
    },

    /// The run was cancelled.
    #[error("operation cancelled: {0}")]
    Cancelled(String),

    /// A task's work function finished without producing an outcome.
    #[error("task finished without producing a result")]
    TaskAbandoned,

    /// A failure attributed to a specific service and stage.
    #[error("failed {stage} for service '{service}': {source}")]
    ServiceStage {
        /// The service name.
        service: String,
        /// The stage that was executing.
        stage: ServiceStage,
        /// The underlying error.
        #[source]
        source: Box<PackflowError>,
    },

    /// The aggregated report could not be written.
    #[error("package result could not be displayed: {0}")]
    Output(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(Arc<std::io::Error>),
}

impl From<std::io::Error> for PackflowError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(Arc::new(err))
    }
}

impl PackflowError {
    /// Creates a service not found error.
    #[must_use]
    pub fn service_not_found(name: impl Into<String>) -> Self {
        Self::ServiceNotFound { name: name.into() }
    }

    /// Creates a tool invocation error.
    #[must_use]
    pub fn tool_invocation(
        operation: impl Into<String>,
        path: impl AsRef<Path>,
        message: impl fmt::Display,
    ) -> Self {
        Self::ToolInvocation {
            operation: operation.into(),
            path: path.as_ref().to_path_buf(),
            message: message.to_string(),
        }
    }

    /// Creates a staging error.
    #[must_use]
    pub fn staging(operation: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Staging {
            operation: operation.into(),
            message: message.to_string(),
        }
    }

    /// Creates a cancellation error.
    #[must_use]
    pub fn cancelled(reason: impl Into<String>) -> Self {
        Self::Cancelled(reason.into())
    }

    /// Attributes this error to a service and stage.
    ///
    /// Errors that are already attributed are returned unchanged so nested
    /// stage runners don't stack prefixes.
    #[must_use]
    pub fn in_stage(self, service: impl Into<String>, stage: ServiceStage) -> Self {
        match self {
            Self::ServiceStage { .. } => self,
            other => Self::ServiceStage {
                service: service.into(),
                stage,
                source: Box::new(other),
            },
        }
    }

    /// Returns the innermost error, looking through stage attribution.
    #[must_use]
    pub fn root(&self) -> &Self {
        match self {
            Self::ServiceStage { source, .. } => source.root(),
            other => other,
        }
    }

    /// Returns true if the root cause is a cancellation.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(self.root(), Self::Cancelled(_))
    }

    /// Returns a short machine-readable name for the error kind.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ServiceNotFound { .. } => "ServiceNotFound",
            Self::NoServices { .. } => "NoServices",
            Self::InvalidSelection(_) => "InvalidSelection",
            Self::Config(_) => "Config",
            Self::UnsupportedLanguage { .. } => "UnsupportedLanguage",
            Self::ToolInvocation { .. } => "ToolInvocation",
            Self::ToolMissing { .. } => "ToolMissing",
            Self::NoArtifacts { .. } => "NoArtifacts",
            Self::MultipleArtifacts { .. } => "MultipleArtifacts",
            Self::EmptyPackage { .. } => "EmptyPackage",
            Self::Staging { .. } => "Staging",
            Self::Cancelled(_) => "Cancelled",
            Self::TaskAbandoned => "TaskAbandoned",
            Self::ServiceStage { .. } => "ServiceStage",
            Self::Output(_) => "Output",
            Self::Io(_) => "Io",
        }
    }

    /// Converts to a dictionary representation.
    #[must_use]
    pub fn to_dict(&self) -> HashMap<String, serde_json::Value> {
        let mut map = HashMap::new();
        map.insert("type".to_string(), serde_json::json!(self.kind()));

        match self {
            Self::ServiceNotFound { name } => {
                map.insert("name".to_string(), serde_json::json!(name));
            }
            Self::ToolInvocation { operation, path, .. } => {
                map.insert("operation".to_string(), serde_json::json!(operation));
                map.insert("path".to_string(), serde_json::json!(path));
            }
            Self::ToolMissing { tool, .. } => {
                map.insert("tool".to_string(), serde_json::json!(tool));
            }
            Self::NoArtifacts { dir, .. } | Self::EmptyPackage { dir } => {
                map.insert("dir".to_string(), serde_json::json!(dir));
            }
            Self::MultipleArtifacts { dir, candidates, .. } => {
                map.insert("dir".to_string(), serde_json::json!(dir));
                map.insert("candidates".to_string(), serde_json::json!(candidates));
            }
            Self::ServiceStage { service, stage, source } => {
                map.insert("service".to_string(), serde_json::json!(service));
                map.insert("stage".to_string(), serde_json::json!(stage));
                let inner: serde_json::Map<String, serde_json::Value> =
                    source.to_dict().into_iter().collect();
                map.insert("cause".to_string(), serde_json::Value::Object(inner));
            }
            _ => {}
        }

        map.insert("message".to_string(), serde_json::json!(self.to_string()));
        map
    }
}

/// Result alias used across the crate.
pub type Result<T, E = PackflowError> = std::result::Result<T, E>;
