#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use deadlock_crypto::EscrowKey;
use deadlock_escrow::{Clock, EscrowConfig, EscrowService, Notifier, StaticKeyProvider};
use deadlock_storage::{MemoryVaultStore, StorageError, StorageResult, VaultRepository};
use deadlock_vault::{NewVault, NomineeNotice, Vault};
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 1, 10, 8, 0, 0).unwrap()
}

pub fn new_vault() -> NewVault {
    NewVault {
        owner_id: "owner-1".into(),
        vault_name: "Master key".into(),
        nominees: vec![
            "alice@example.com".into(),
            "Bob@Example.com".into(),
            "carol@example.com".into(),
        ],
        threshold: 3,
        trigger_time: None,
        check_in_policy: None,
    }
}

// ── Clock ────────────────────────────────────────────────────────

#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Arc<Self> {
        Arc::new(Self {
            now: Mutex::new(start),
        })
    }

    pub fn set(&self, at: DateTime<Utc>) {
        *self.now.lock().unwrap() = at;
    }

    /// Moves to `days` after the start of the test timeline.
    pub fn set_day(&self, days: i64) {
        self.set(t0() + Duration::days(days));
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }
}

// ── Notifiers ────────────────────────────────────────────────────

#[derive(Default)]
pub struct RecordingNotifier {
    sent: tokio::sync::Mutex<Vec<NomineeNotice>>,
}

impl RecordingNotifier {
    pub async fn sent(&self) -> Vec<NomineeNotice> {
        self.sent.lock().await.clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, notice: &NomineeNotice) -> anyhow::Result<()> {
        self.sent.lock().await.push(notice.clone());
        Ok(())
    }
}

#[derive(Default)]
pub struct FailingNotifier {
    attempts: AtomicUsize,
}

impl FailingNotifier {
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Notifier for FailingNotifier {
    async fn notify(&self, _notice: &NomineeNotice) -> anyhow::Result<()> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        anyhow::bail!("mail relay unavailable")
    }
}

// ── Repository ───────────────────────────────────────────────────

/// Memory store that can be told to fail loads for some ids or all saves.
#[derive(Default)]
pub struct FlakyRepository {
    inner: MemoryVaultStore,
    broken: Mutex<HashSet<String>>,
    fail_saves: AtomicBool,
}

impl FlakyRepository {
    pub fn break_vault(&self, vault_id: &str) {
        self.broken.lock().unwrap().insert(vault_id.to_string());
    }

    pub fn fail_saves(&self, fail: bool) {
        self.fail_saves.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl VaultRepository for FlakyRepository {
    async fn load(&self, vault_id: &str) -> StorageResult<Option<Vault>> {
        if self.broken.lock().unwrap().contains(vault_id) {
            return Err(StorageError::Lock("simulated outage".into()));
        }
        self.inner.load(vault_id).await
    }

    async fn save(&self, vault: &Vault) -> StorageResult<()> {
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(StorageError::Lock("simulated write failure".into()));
        }
        self.inner.save(vault).await
    }

    async fn list_ids(&self) -> StorageResult<Vec<String>> {
        self.inner.list_ids().await
    }
}

// ── Harness ──────────────────────────────────────────────────────

pub struct Harness {
    pub service: Arc<EscrowService>,
    pub clock: Arc<ManualClock>,
    pub notifier: Arc<RecordingNotifier>,
    pub store: MemoryVaultStore,
    pub key: EscrowKey,
}

pub fn harness() -> Harness {
    let clock = ManualClock::new(t0());
    let notifier = Arc::new(RecordingNotifier::default());
    let store = MemoryVaultStore::new();
    let key = EscrowKey::generate();

    let service = EscrowService::new(
        Arc::new(store.clone()),
        notifier.clone(),
        Arc::new(StaticKeyProvider::new(key.clone())),
        EscrowConfig::default(),
    )
    .with_clock(clock.clone());

    Harness {
        service: Arc::new(service),
        clock,
        notifier,
        store,
        key,
    }
}
