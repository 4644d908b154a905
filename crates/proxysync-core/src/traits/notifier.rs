// # Notifier Trait
//
// Outbound notification for passes that rewrote configuration files.

use async_trait::async_trait;

use crate::engine::ReconciliationResult;
use crate::error::Result;

/// Trait for pass notifications
///
/// Called after the restart step of a pass with `mutated_files > 0`.
/// Errors are logged and ignored.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver a summary of a pass
    async fn notify(&self, result: &ReconciliationResult) -> Result<()>;
}
