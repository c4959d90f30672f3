//! Progress messages and stage outcome records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

/// A human-readable description of a stage's current sub-step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceProgress {
    /// What the stage is doing.
    pub message: String,
    /// When the step began.
    pub timestamp: DateTime<Utc>,
}

impl ServiceProgress {
    /// Creates a progress message stamped with the current time.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            timestamp: Utc::now(),
        }
    }
}

impl fmt::Display for ServiceProgress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// Outcome of the restore stage.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceRestoreResult {
    /// Framework-specific details.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub details: BTreeMap<String, String>,
}

/// Outcome of the build stage.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceBuildResult {
    /// The restore output the build consumed, if a restore ran.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub restore: Option<ServiceRestoreResult>,
    /// Where the build placed its output.
    pub build_output_path: PathBuf,
    /// Framework-specific details.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub details: BTreeMap<String, String>,
}

impl ServiceBuildResult {
    /// Creates a build result.
    #[must_use]
    pub fn new(restore: Option<ServiceRestoreResult>, build_output_path: impl Into<PathBuf>) -> Self {
        Self {
            restore,
            build_output_path: build_output_path.into(),
            details: BTreeMap::new(),
        }
    }
}

/// Outcome of the package stage.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServicePackageResult {
    /// The build output that was packaged, if a build ran.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub build: Option<ServiceBuildResult>,
    /// Location of the materialized package.
    pub package_path: PathBuf,
    /// Framework-specific details.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub details: BTreeMap<String, String>,
}

impl ServicePackageResult {
    /// Creates a package result.
    #[must_use]
    pub fn new(build: Option<ServiceBuildResult>, package_path: impl Into<PathBuf>) -> Self {
        Self {
            build,
            package_path: package_path.into(),
            details: BTreeMap::new(),
        }
    }

    /// Adds a detail entry.
    #[must_use]
    pub fn with_detail(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.details.insert(key.into(), value.into());
        self
    }
}

impl fmt::Display for ServicePackageResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Package Output: {}", self.package_path.display())
    }
}
