//! Options for a package run.

use super::OutputFormat;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// What to package and how to report it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageOptions {
    /// Package only this service.
    #[serde(default)]
    pub target: Option<String>,
    /// Package every service, ignoring the working directory.
    #[serde(default)]
    pub all: bool,
    /// Machine-readable report format.
    #[serde(default)]
    pub output: OutputFormat,
    /// Working directory; a service rooted here becomes the default target.
    #[serde(default)]
    pub cwd: Option<PathBuf>,
}

impl PackageOptions {
    /// Creates options that package every service.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Packages only `service`.
    #[must_use]
    pub fn with_target(mut self, service: impl Into<String>) -> Self {
        self.target = Some(service.into());
        self
    }

    /// Sets the all-services flag.
    #[must_use]
    pub fn with_all(mut self, all: bool) -> Self {
        self.all = all;
        self
    }

    /// Sets the report format.
    #[must_use]
    pub fn with_output(mut self, output: OutputFormat) -> Self {
        self.output = output;
        self
    }

    /// Sets the working directory.
    #[must_use]
    pub fn with_cwd(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }
}
