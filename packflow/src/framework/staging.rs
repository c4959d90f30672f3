//! Staging directories and artifact discovery.

use crate::errors::{PackflowError, Result};
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::debug;

/// A freshly created staging directory for one package operation.
///
/// The directory is removed when dropped unless it was handed over with
/// [`persist`](Self::persist), so a failed package stage leaves nothing
/// behind.
#[derive(Debug)]
pub struct StagingDir {
    dir: TempDir,
}

impl StagingDir {
    /// Creates a new, empty staging directory under the system temp dir.
    pub fn create(prefix: &str) -> Result<Self> {
        let dir = tempfile::Builder::new()
            .prefix(prefix)
            .tempdir()
            .map_err(|e| PackflowError::staging("creating staging directory", e))?;

        debug!(path = %dir.path().display(), "Created staging directory");
        Ok(Self { dir })
    }

    /// Returns the staging path.
    #[must_use]
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Keeps the directory and returns its path.
    #[must_use]
    pub fn persist(self) -> PathBuf {
        self.dir.keep()
    }
}

/// Finds the single file in `dir` with the given extension.
///
/// Only direct children are considered and directories are ignored. Zero or
/// several candidates is an error; several candidates are listed by name.
pub async fn find_single_artifact(dir: &Path, extension: &str) -> Result<PathBuf> {
    let operation = || format!("discovering {} files in {}", extension.to_uppercase(), dir.display());

    let mut entries = tokio::fs::read_dir(dir)
        .await
        .map_err(|e| PackflowError::staging(operation(), e))?;

    let mut matches = Vec::new();
    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| PackflowError::staging(operation(), e))?
    {
        let file_type = entry
            .file_type()
            .await
            .map_err(|e| PackflowError::staging(operation(), e))?;
        if file_type.is_dir() {
            continue;
        }

        let path = entry.path();
        if path.extension().is_some_and(|ext| ext == extension) {
            matches.push(entry.file_name().to_string_lossy().into_owned());
        }
    }
    matches.sort();

    match matches.len() {
        0 => Err(PackflowError::NoArtifacts {
            dir: dir.to_path_buf(),
            extension: extension.to_string(),
        }),
        1 => Ok(dir.join(&matches[0])),
        _ => Err(PackflowError::MultipleArtifacts {
            dir: dir.to_path_buf(),
            extension: extension.to_string(),
            candidates: matches,
        }),
    }
}

/// Copies `source` into `staging` under `file_name`.
pub async fn copy_into_staging(source: &Path, staging: &Path, file_name: &str) -> Result<PathBuf> {
    let destination = staging.join(file_name);
    tokio::fs::copy(source, &destination)
        .await
        .map_err(|e| PackflowError::staging("copying to staging directory failed", e))?;
    debug!(
        source = %source.display(),
        destination = %destination.display(),
        "Copied artifact into staging"
    );
    Ok(destination)
}

/// Fails if the staging directory is missing or empty.
pub async fn validate_package_output(staging: &Path) -> Result<()> {
    let mut entries = tokio::fs::read_dir(staging)
        .await
        .map_err(|e| PackflowError::staging(format!("reading package output {}", staging.display()), e))?;

    match entries.next_entry().await {
        Ok(Some(_)) => Ok(()),
        Ok(None) => Err(PackflowError::EmptyPackage {
            dir: staging.to_path_buf(),
        }),
        Err(e) => Err(PackflowError::staging(
            format!("reading package output {}", staging.display()),
            e,
        )),
    }
}
