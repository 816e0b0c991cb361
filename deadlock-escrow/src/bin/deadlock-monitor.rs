//! Standalone dead-man-switch monitor.
//!
//! Opens the vault database named by `DEADLOCK_DB_PATH` (default
//! `deadlock.duckdb`) and sweeps it until interrupted.

use anyhow::Context;
use deadlock_escrow::{
    create_monitor, EnvKeyProvider, EscrowConfig, EscrowService, LogNotifier,
};
use deadlock_storage::DuckDbVaultStore;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

const DB_PATH_ENV: &str = "DEADLOCK_DB_PATH";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .try_init();

    let config = EscrowConfig::from_env().context("loading escrow configuration")?;
    let db_path = std::env::var(DB_PATH_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("deadlock.duckdb"));

    let store = DuckDbVaultStore::open(&db_path)
        .with_context(|| format!("opening vault store at {}", db_path.display()))?;
    let keys = EnvKeyProvider::new(config.escrow_key_env.clone());
    let interval = config.sweep_interval();

    let service = Arc::new(EscrowService::new(
        Arc::new(store),
        Arc::new(LogNotifier),
        Arc::new(keys),
        config,
    ));

    let (handle, monitor) = create_monitor(service, interval);
    let task = tokio::spawn(monitor.run());
    info!(db = %db_path.display(), "deadlock monitor running");

    tokio::signal::ctrl_c().await.context("waiting for shutdown signal")?;
    handle.stop().await?;
    task.await.context("monitor task panicked")?;
    Ok(())
}
