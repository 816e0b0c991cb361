//! In-process vault store.

use crate::error::StorageResult;
use crate::repository::VaultRepository;
use async_trait::async_trait;
use deadlock_vault::Vault;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Vault repository held in memory. Cloning shares the same map.
#[derive(Clone, Default)]
pub struct MemoryVaultStore {
    vaults: Arc<RwLock<HashMap<String, Vault>>>,
}

impl MemoryVaultStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.vaults.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.vaults.read().await.is_empty()
    }
}

#[async_trait]
impl VaultRepository for MemoryVaultStore {
    async fn load(&self, vault_id: &str) -> StorageResult<Option<Vault>> {
        Ok(self.vaults.read().await.get(vault_id).cloned())
    }

    async fn save(&self, vault: &Vault) -> StorageResult<()> {
        self.vaults
            .write()
            .await
            .insert(vault.vault_id.clone(), vault.clone());
        Ok(())
    }

    async fn list_ids(&self) -> StorageResult<Vec<String>> {
        let mut ids: Vec<String> = self.vaults.read().await.keys().cloned().collect();
        ids.sort();
        Ok(ids)
    }
}
