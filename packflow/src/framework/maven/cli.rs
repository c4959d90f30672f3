//! Adapters over the `mvn` and `javac` command-line tools.

use crate::context::PipelineContext;
use anyhow::{anyhow, bail, Context as _};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tracing::debug;

/// Oldest JDK release able to build supported projects.
pub const MIN_JAVAC_VERSION: u32 = 17;

/// The Maven command-line interface.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MavenCli: Send + Sync {
    /// Records the service and project roots, used to locate a wrapper script.
    fn set_path(&self, service_path: &Path, project_path: &Path);

    /// Fails if Maven cannot be run.
    async fn check_installed(&self, ctx: &PipelineContext) -> anyhow::Result<()>;

    /// Runs `dependency:resolve` in `project_path`.
    async fn resolve_dependencies(&self, ctx: &PipelineContext, project_path: &Path) -> anyhow::Result<()>;

    /// Runs `compile` in `project_path`.
    async fn compile(&self, ctx: &PipelineContext, project_path: &Path) -> anyhow::Result<()>;

    /// Runs `package` in `project_path`, skipping tests.
    async fn package(&self, ctx: &PipelineContext, project_path: &Path) -> anyhow::Result<()>;
}

/// The Java compiler.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait JavacCli: Send + Sync {
    /// Fails unless a supported `javac` is on the path.
    async fn check_installed(&self, ctx: &PipelineContext) -> anyhow::Result<()>;
}

/// [`MavenCli`] backed by child processes.
///
/// Prefers an `mvnw` wrapper found between the service directory and the
/// project root, falling back to `mvn` on the path.
#[derive(Debug, Default)]
pub struct ProcessMavenCli {
    roots: Mutex<Option<(PathBuf, PathBuf)>>,
}

impl ProcessMavenCli {
    /// Creates an adapter that runs `mvn` until a path is set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn executable(&self) -> PathBuf {
        self.roots
            .lock()
            .as_ref()
            .and_then(|(service, project)| find_wrapper(service, project))
            .unwrap_or_else(|| PathBuf::from("mvn"))
    }

    async fn run_goal(&self, ctx: &PipelineContext, project_path: &Path, args: &[&str]) -> anyhow::Result<()> {
        let mvn = self.executable();
        run_command(ctx, &mvn, args, project_path)
            .await
            .with_context(|| format!("running mvn {}", args.join(" ")))?;
        Ok(())
    }
}

#[async_trait]
impl MavenCli for ProcessMavenCli {
    fn set_path(&self, service_path: &Path, project_path: &Path) {
        *self.roots.lock() = Some((service_path.to_path_buf(), project_path.to_path_buf()));
    }

    async fn check_installed(&self, ctx: &PipelineContext) -> anyhow::Result<()> {
        let mvn = self.executable();
        let cwd = self
            .roots
            .lock()
            .as_ref()
            .map_or_else(|| PathBuf::from("."), |(service, _)| service.clone());
        run_command(ctx, &mvn, &["--version"], &cwd)
            .await
            .with_context(|| format!("checking {}", mvn.display()))?;
        Ok(())
    }

    async fn resolve_dependencies(&self, ctx: &PipelineContext, project_path: &Path) -> anyhow::Result<()> {
        self.run_goal(ctx, project_path, &["dependency:resolve"]).await
    }

    async fn compile(&self, ctx: &PipelineContext, project_path: &Path) -> anyhow::Result<()> {
        self.run_goal(ctx, project_path, &["compile"]).await
    }

    async fn package(&self, ctx: &PipelineContext, project_path: &Path) -> anyhow::Result<()> {
        self.run_goal(ctx, project_path, &["package", "-DskipTests"]).await
    }
}

/// [`JavacCli`] that runs `javac -version`.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessJavacCli;

#[async_trait]
impl JavacCli for ProcessJavacCli {
    async fn check_installed(&self, ctx: &PipelineContext) -> anyhow::Result<()> {
        let output = run_command(ctx, OsStr::new("javac"), &["-version"], Path::new("."))
            .await
            .context("checking javac")?;

        let version = parse_javac_version(&output)
            .ok_or_else(|| anyhow!("unrecognized javac version output: {}", output.trim()))?;
        if version < MIN_JAVAC_VERSION {
            bail!("javac {version} found, {MIN_JAVAC_VERSION} or later is required");
        }
        Ok(())
    }
}

/// Looks for a Maven wrapper from `service_path` up to `project_path`.
fn find_wrapper(service_path: &Path, project_path: &Path) -> Option<PathBuf> {
    let name = if cfg!(windows) { "mvnw.cmd" } else { "mvnw" };

    let mut dir = Some(service_path);
    while let Some(current) = dir {
        let candidate = current.join(name);
        if candidate.is_file() {
            return Some(candidate);
        }
        if current == project_path || !current.starts_with(project_path) {
            break;
        }
        dir = current.parent();
    }
    None
}

/// Extracts the major version from `javac -version` output.
///
/// Handles both `javac 17.0.2` and the legacy `javac 1.8.0_292` form.
fn parse_javac_version(output: &str) -> Option<u32> {
    let version = output
        .lines()
        .find_map(|line| line.trim().strip_prefix("javac "))?
        .trim();

    let mut parts = version.split(['.', '_', '-', '+']);
    let major: u32 = parts.next()?.parse().ok()?;
    if major == 1 {
        parts.next()?.parse().ok()
    } else {
        Some(major)
    }
}

/// Runs a program to completion and returns its combined output.
///
/// The child is killed if the context is cancelled first.
pub(crate) async fn run_command(
    ctx: &PipelineContext,
    program: impl AsRef<OsStr>,
    args: &[&str],
    cwd: &Path,
) -> anyhow::Result<String> {
    let program = program.as_ref();
    let mut command = Command::new(program);
    command
        .args(args)
        .current_dir(cwd)
        .stdin(Stdio::null())
        .kill_on_drop(true);

    debug!(
        program = %program.to_string_lossy(),
        args = ?args,
        cwd = %cwd.display(),
        "Running external command"
    );

    let output = tokio::select! {
        output = command.output() => output
            .with_context(|| format!("failed to start {}", program.to_string_lossy()))?,
        () = ctx.cancelled() => bail!("{} was cancelled", program.to_string_lossy()),
    };

    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    if !output.status.success() {
        bail!(
            "{} exited with {}: {}",
            program.to_string_lossy(),
            output.status,
            stderr.trim()
        );
    }

    Ok(format!("{stdout}{stderr}"))
}
