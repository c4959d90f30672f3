//! External tool requirements.

use crate::context::PipelineContext;
use crate::errors::Result;
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::debug;

/// An external program a framework shells out to.
#[async_trait]
pub trait ExternalTool: Send + Sync {
    /// Returns the tool's display name.
    fn name(&self) -> &str;

    /// Returns where the tool can be installed from.
    fn install_url(&self) -> &str;

    /// Fails with `ToolMissing` if the tool is not usable.
    async fn check_installed(&self, ctx: &PipelineContext) -> Result<()>;
}

/// Checks every tool once, in order, failing on the first missing one.
///
/// Tools shared by several services are identified by name.
pub async fn ensure_all_installed(
    ctx: &PipelineContext,
    tools: &[Arc<dyn ExternalTool>],
) -> Result<()> {
    let mut checked = HashSet::new();
    for tool in tools {
        if !checked.insert(tool.name().to_string()) {
            continue;
        }
        ctx.check_cancelled()?;
        debug!(tool = tool.name(), "Checking external tool");
        tool.check_installed(ctx).await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::PackflowError;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FakeTool {
        name: &'static str,
        installed: bool,
        checks: AtomicUsize,
    }

    impl FakeTool {
        fn new(name: &'static str, installed: bool) -> Arc<Self> {
            Arc::new(Self {
                name,
                installed,
                checks: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl ExternalTool for FakeTool {
        fn name(&self) -> &str {
            self.name
        }

        fn install_url(&self) -> &str {
            "https://example.invalid/install"
        }

        async fn check_installed(&self, _ctx: &PipelineContext) -> Result<()> {
            self.checks.fetch_add(1, Ordering::SeqCst);
            if self.installed {
                Ok(())
            } else {
                Err(PackflowError::ToolMissing {
                    tool: self.name.to_string(),
                    install_url: self.install_url().to_string(),
                    message: "not on PATH".to_string(),
                })
            }
        }
    }

    #[tokio::test]
    async fn test_shared_tools_checked_once() {
        let maven = FakeTool::new("maven", true);
        let tools: Vec<Arc<dyn ExternalTool>> = vec![maven.clone(), maven.clone()];

        ensure_all_installed(&PipelineContext::new(), &tools).await.unwrap();
        assert_eq!(maven.checks.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_missing_tool_fails() {
        let javac = FakeTool::new("javac", false);
        let later = FakeTool::new("later", true);
        let tools: Vec<Arc<dyn ExternalTool>> = vec![javac, later.clone()];

        let err = ensure_all_installed(&PipelineContext::new(), &tools).await.unwrap_err();
        assert!(matches!(err, PackflowError::ToolMissing { ref tool, .. } if tool == "javac"));
        assert_eq!(later.checks.load(Ordering::SeqCst), 0);
    }
}
