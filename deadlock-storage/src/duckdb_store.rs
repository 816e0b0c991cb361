//! DuckDB-backed vault store.
//!
//! Each vault is one row in the `vaults` table: the full record as a JSON
//! document plus a few plain columns for inspection.

use crate::error::{StorageError, StorageResult};
use crate::repository::VaultRepository;
use async_trait::async_trait;
use deadlock_vault::Vault;
use duckdb::{params, Connection};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::debug;

/// Vault repository persisted in a DuckDB database.
#[derive(Clone)]
pub struct DuckDbVaultStore {
    conn: Arc<Mutex<Connection>>,
}

impl DuckDbVaultStore {
    /// Opens or creates a store at the given path.
    pub fn open(path: &Path) -> StorageResult<Self> {
        let conn = crate::open_duckdb_with_wal_recovery(path, "128MB", 1)?;
        initialize_vault_schema(&conn)?;
        debug!(path = %path.display(), "opened vault store");
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Opens an in-memory store (for testing).
    pub fn open_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        initialize_vault_schema(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn lock(&self) -> StorageResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| StorageError::Lock(e.to_string()))
    }
}

fn initialize_vault_schema(conn: &Connection) -> StorageResult<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS vaults (
            vault_id VARCHAR PRIMARY KEY,
            owner_id VARCHAR NOT NULL,
            status VARCHAR NOT NULL,
            data_json TEXT NOT NULL,
            updated_at BIGINT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_vaults_status ON vaults(status);
        "#,
    )?;
    Ok(())
}

#[async_trait]
impl VaultRepository for DuckDbVaultStore {
    async fn load(&self, vault_id: &str) -> StorageResult<Option<Vault>> {
        let conn = self.lock()?;
        let result = conn.query_row(
            "SELECT data_json FROM vaults WHERE vault_id = ?",
            params![vault_id],
            |row| row.get::<_, String>(0),
        );

        match result {
            Ok(data_json) => Ok(Some(serde_json::from_str(&data_json)?)),
            Err(duckdb::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn save(&self, vault: &Vault) -> StorageResult<()> {
        let data_json = serde_json::to_string(vault)?;
        let conn = self.lock()?;
        conn.execute(
            r#"
            INSERT OR REPLACE INTO vaults (vault_id, owner_id, status, data_json, updated_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
            params![
                vault.vault_id,
                vault.owner_id,
                vault.status.as_str(),
                data_json,
                vault.updated_at.timestamp_millis(),
            ],
        )?;
        Ok(())
    }

    async fn list_ids(&self) -> StorageResult<Vec<String>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare("SELECT vault_id FROM vaults ORDER BY vault_id")?;
        let ids = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ids)
    }
}
