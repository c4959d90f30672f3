//! Aggregated results and the machine-readable report.

use crate::errors::{PackflowError, Result};
use crate::framework::ServicePackageResult;
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::io::Write;

/// Package results keyed by service name, in the order services ran.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct PackageResults {
    entries: IndexMap<String, ServicePackageResult>,
}

impl PackageResults {
    /// Creates an empty result set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a service's result, replacing any earlier one in place.
    pub fn insert(&mut self, service: impl Into<String>, result: ServicePackageResult) {
        self.entries.insert(service.into(), result);
    }

    /// Looks up a service's result.
    #[must_use]
    pub fn get(&self, service: &str) -> Option<&ServicePackageResult> {
        self.entries.get(service)
    }

    /// Service names in insertion order.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.entries.keys().map(String::as_str).collect()
    }

    /// Iterates over `(service, result)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ServicePackageResult)> {
        self.entries.iter().map(|(name, result)| (name.as_str(), result))
    }

    /// Number of results.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if no service was packaged.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// The report emitted after a successful run.
#[derive(Debug, Clone, Serialize)]
pub struct PackageSnapshot {
    /// When the report was produced.
    pub timestamp: DateTime<Utc>,
    /// Results of every packaged service.
    pub services: PackageResults,
}

impl PackageSnapshot {
    /// Stamps `services` with the current time.
    #[must_use]
    pub fn new(services: PackageResults) -> Self {
        Self {
            timestamp: Utc::now(),
            services,
        }
    }
}

/// Machine-readable output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// No report.
    #[default]
    None,
    /// Pretty-printed JSON.
    Json,
}

/// Writes the final report.
pub trait OutputFormatter: Send + Sync {
    /// The format this formatter produces.
    fn kind(&self) -> OutputFormat;

    /// Writes `snapshot`.
    fn format(&self, snapshot: &PackageSnapshot) -> Result<()>;
}

/// Writes reports as pretty JSON.
pub struct JsonFormatter {
    writer: Mutex<Box<dyn Write + Send>>,
}

impl JsonFormatter {
    /// Creates a formatter writing to `writer`.
    pub fn new(writer: impl Write + Send + 'static) -> Self {
        Self {
            writer: Mutex::new(Box::new(writer)),
        }
    }

    /// Creates a formatter writing to standard output.
    #[must_use]
    pub fn stdout() -> Self {
        Self::new(std::io::stdout())
    }
}

impl std::fmt::Debug for JsonFormatter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JsonFormatter").finish_non_exhaustive()
    }
}

impl OutputFormatter for JsonFormatter {
    fn kind(&self) -> OutputFormat {
        OutputFormat::Json
    }

    fn format(&self, snapshot: &PackageSnapshot) -> Result<()> {
        let mut writer = self.writer.lock();
        serde_json::to_writer_pretty(&mut *writer, snapshot).map_err(|e| PackflowError::Output(e.to_string()))?;
        writeln!(writer).map_err(|e| PackflowError::Output(e.to_string()))?;
        writer.flush().map_err(|e| PackflowError::Output(e.to_string()))
    }
}
