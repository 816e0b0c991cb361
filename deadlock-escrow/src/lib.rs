//! Escrow orchestration for DEADLOCK.
//!
//! [`EscrowService`] is the single writer of vault records. It enforces the
//! configured nominee policy, seals client-split shares under the operator's
//! escrow key, gates their release on the vault lifecycle and drives the
//! periodic dead-man sweep that [`DeadManMonitor`] schedules.
//!
//! # Collaborators
//!
//! - [`VaultRepository`](deadlock_storage::VaultRepository): persistence
//! - [`Notifier`]: nominee delivery, best-effort
//! - [`EscrowKeyProvider`]: the fragment sealing key
//! - [`Clock`]: wall time

pub mod clock;
pub mod config;
mod error;
pub mod keys;
pub mod locks;
pub mod monitor;
pub mod notifier;
pub mod service;

pub use clock::{Clock, SystemClock};
pub use config::{EscrowConfig, MONITOR_INTERVAL_ENV};
pub use error::{EscrowError, EscrowResult};
pub use keys::{EnvKeyProvider, EscrowKeyProvider, StaticKeyProvider};
pub use locks::{VaultGuard, VaultLocks};
pub use monitor::{create_monitor, DeadManMonitor, MonitorCommand, MonitorHandle};
pub use notifier::{LogNotifier, Notifier};
pub use service::{EscrowService, ReleasedShare, StoreFragments, StoreReceipt, SweepReport};
