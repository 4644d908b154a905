// # Restart Trigger Trait
//
// Opaque external action that makes the proxy pick up rewritten files.
// Invoked at most once per pass that changed at least one file.

use async_trait::async_trait;

use crate::error::Result;

/// Trait for restart actions
///
/// Failure is logged by the reconciler and never fatal: the configuration
/// on disk is already correct even if the proxy has not reloaded it yet.
#[async_trait]
pub trait RestartTrigger: Send + Sync {
    /// Restart (or reload) the dependent process
    async fn restart(&self) -> Result<()>;

    /// Identifier of the restarted target, for logs
    fn target(&self) -> &str;
}
