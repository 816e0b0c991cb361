//! Nominee notification seam.

use async_trait::async_trait;
use deadlock_vault::NomineeNotice;
use tracing::info;

/// Delivers "you have been asked to help unlock a vault" messages.
///
/// Delivery is best-effort: a failure is logged by the caller and never
/// undoes the lifecycle transition that produced the notice.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, notice: &NomineeNotice) -> anyhow::Result<()>;
}

/// Writes each notice as a structured log event.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, notice: &NomineeNotice) -> anyhow::Result<()> {
        info!(
            nominee = %notice.nominee_email,
            vault_id = %notice.vault_id,
            vault_name = %notice.vault_name,
            owner_id = %notice.owner_id,
            "nominee notified of unlock request"
        );
        Ok(())
    }
}
