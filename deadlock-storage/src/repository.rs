//! The repository seam the escrow service persists vaults through.

use crate::error::StorageResult;
use async_trait::async_trait;
use deadlock_vault::Vault;

/// Atomic per-vault load and save.
///
/// Implementations never need cross-vault transactions; callers serialize
/// access to a single vault themselves.
#[async_trait]
pub trait VaultRepository: Send + Sync {
    /// Loads a vault, or `None` if no record exists.
    async fn load(&self, vault_id: &str) -> StorageResult<Option<Vault>>;

    /// Inserts or replaces the record for `vault.vault_id`.
    async fn save(&self, vault: &Vault) -> StorageResult<()>;

    /// Ids of every stored vault.
    async fn list_ids(&self) -> StorageResult<Vec<String>>;
}
