//! Vault persistence for DEADLOCK.
//!
//! The escrow service talks to storage only through [`VaultRepository`].
//! Two implementations ship here:
//!
//! - [`MemoryVaultStore`]: a shared in-process map, for tests and embedding
//! - [`DuckDbVaultStore`]: one JSON document per vault in a DuckDB table

mod duckdb_store;
mod error;
mod memory;
mod repository;

pub use duckdb_store::DuckDbVaultStore;
pub use error::{StorageError, StorageResult};
pub use memory::MemoryVaultStore;
pub use repository::VaultRepository;

use duckdb::Connection;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Opens the vault database, discarding a stale write-ahead log if needed.
///
/// A crash can leave `<db>.wal` behind in a state DuckDB refuses to replay.
/// When the first open fails and that file exists, it is deleted and the open
/// retried once. Memory and thread limits are applied to the returned
/// connection.
pub fn open_duckdb_with_wal_recovery(
    path: &Path,
    memory_limit: &str,
    threads: u32,
) -> StorageResult<Connection> {
    let conn = match Connection::open(path) {
        Ok(conn) => conn,
        Err(open_err) => {
            let wal_path = wal_path_for(path);
            if !wal_path.exists() || std::fs::remove_file(&wal_path).is_err() {
                return Err(open_err.into());
            }
            warn!(
                wal = %wal_path.display(),
                error = %open_err,
                "discarded stale vault WAL after failed open"
            );
            Connection::open(path)?
        }
    };
    apply_resource_limits(&conn, memory_limit, threads)?;
    Ok(conn)
}

/// `vaults.duckdb` becomes `vaults.duckdb.wal`; a bare path gains `.wal`.
fn wal_path_for(path: &Path) -> PathBuf {
    let extension = match path.extension() {
        Some(ext) => format!("{}.wal", ext.to_string_lossy()),
        None => "wal".to_string(),
    };
    path.with_extension(extension)
}

fn apply_resource_limits(conn: &Connection, memory_limit: &str, threads: u32) -> StorageResult<()> {
    conn.execute_batch(&format!(
        "SET memory_limit = '{memory_limit}'; SET threads = {threads};"
    ))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wal_path_keeps_database_extension() {
        assert_eq!(
            wal_path_for(Path::new("/tmp/vaults.duckdb")),
            PathBuf::from("/tmp/vaults.duckdb.wal")
        );
        assert_eq!(wal_path_for(Path::new("vaults")), PathBuf::from("vaults.wal"));
    }
}
