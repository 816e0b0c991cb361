//! Escrow orchestrator.
//!
//! Composes the vault lifecycle, the fragment envelope and the repository.
//! Every mutating operation is one load–mutate–persist unit under the
//! vault's lock. Notifications go out after the save and never roll it back.

use crate::clock::{Clock, SystemClock};
use crate::config::EscrowConfig;
use crate::error::{EscrowError, EscrowResult};
use crate::keys::EscrowKeyProvider;
use crate::locks::VaultLocks;
use crate::notifier::Notifier;
use chrono::{DateTime, Utc};
use deadlock_crypto::{open_with_key, seal_with_key};
use deadlock_storage::VaultRepository;
use deadlock_vault::{
    ApprovalsView, NewVault, NomineeNotice, SealedFragment, Transition, Vault, VaultSummary,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Client-split shares submitted for escrow, in nominee order.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreFragments {
    /// Opaque encoded shares; share `i` belongs to nominee `i + 1`.
    pub shares: Vec<String>,
    pub threshold: usize,
    pub total_shares: usize,
}

/// Acknowledgement of a stored fragment set.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreReceipt {
    pub vault_id: String,
    pub shares_stored: usize,
    pub updated_at: DateTime<Utc>,
}

/// A fragment handed back to its nominee.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReleasedShare {
    pub vault_id: String,
    /// Email of the receiving nominee.
    pub nominee: String,
    pub share: String,
}

impl std::fmt::Debug for ReleasedShare {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReleasedShare")
            .field("vault_id", &self.vault_id)
            .field("nominee", &self.nominee)
            .field("share", &"[REDACTED]")
            .finish()
    }
}

/// Result of one pass over every stored vault.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SweepReport {
    pub scanned: usize,
    pub updated: usize,
    pub failed: usize,
    pub evaluated_at: DateTime<Utc>,
}

/// The only writer of vault records.
pub struct EscrowService {
    repository: Arc<dyn VaultRepository>,
    notifier: Arc<dyn Notifier>,
    keys: Arc<dyn EscrowKeyProvider>,
    clock: Arc<dyn Clock>,
    locks: VaultLocks,
    config: EscrowConfig,
}

impl EscrowService {
    pub fn new(
        repository: Arc<dyn VaultRepository>,
        notifier: Arc<dyn Notifier>,
        keys: Arc<dyn EscrowKeyProvider>,
        config: EscrowConfig,
    ) -> Self {
        Self {
            repository,
            notifier,
            keys,
            clock: Arc::new(SystemClock),
            locks: VaultLocks::new(),
            config,
        }
    }

    /// Replaces the system clock.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn config(&self) -> &EscrowConfig {
        &self.config
    }

    pub fn locks(&self) -> &VaultLocks {
        &self.locks
    }

    async fn load_required(&self, vault_id: &str) -> EscrowResult<Vault> {
        self.repository
            .load(vault_id)
            .await?
            .ok_or_else(|| EscrowError::vault_not_found(vault_id))
    }

    async fn dispatch(&self, notices: &[NomineeNotice]) {
        for notice in notices {
            if let Err(e) = self.notifier.notify(notice).await {
                warn!(
                    vault_id = %notice.vault_id,
                    nominee = %notice.nominee_email,
                    "nominee notification failed: {e:#}"
                );
            }
        }
    }

    // ── Owner actions ────────────────────────────────────────────

    /// Creates a vault after enforcing the configured nominee policy.
    pub async fn create_vault(&self, mut new: NewVault) -> EscrowResult<VaultSummary> {
        if new.nominees.len() != self.config.required_nominees {
            return Err(EscrowError::Validation(format!(
                "exactly {} nominees are required",
                self.config.required_nominees
            )));
        }
        if new.threshold != self.config.required_threshold {
            return Err(EscrowError::Validation(format!(
                "threshold must be {}",
                self.config.required_threshold
            )));
        }
        new.check_in_policy = new.check_in_policy.or(Some(self.config.default_policy));

        let vault = Vault::create(new, self.clock.now())?;
        self.repository.save(&vault).await?;

        info!(vault_id = %vault.vault_id, owner_id = %vault.owner_id, "vault created");
        Ok(vault.summary())
    }

    pub async fn dashboard(&self, vault_id: &str) -> EscrowResult<VaultSummary> {
        Ok(self.load_required(vault_id).await?.summary())
    }

    pub async fn approvals(&self, vault_id: &str) -> EscrowResult<ApprovalsView> {
        Ok(self.load_required(vault_id).await?.approvals_view())
    }

    pub async fn check_in(&self, vault_id: &str) -> EscrowResult<VaultSummary> {
        let _guard = self.locks.acquire(vault_id).await;
        let mut vault = self.load_required(vault_id).await?;

        vault.check_in(self.clock.now())?;
        self.repository.save(&vault).await?;

        info!(vault_id, next_due = %vault.dead_man.next_check_in_due_at, "owner checked in");
        Ok(vault.summary())
    }

    pub async fn request_unlock(&self, vault_id: &str, reason: &str) -> EscrowResult<VaultSummary> {
        let guard = self.locks.acquire(vault_id).await;
        let mut vault = self.load_required(vault_id).await?;

        let notices = vault.request_unlock(reason, self.clock.now());
        self.repository.save(&vault).await?;
        drop(guard);

        info!(vault_id, notified = notices.len(), "unlock requested");
        self.dispatch(&notices).await;
        Ok(vault.summary())
    }

    // ── Nominee actions ──────────────────────────────────────────

    /// Records an approval from the nominee named by id or email.
    pub async fn approve_unlock(&self, vault_id: &str, nominee: &str) -> EscrowResult<VaultSummary> {
        let _guard = self.locks.acquire(vault_id).await;
        let mut vault = self.load_required(vault_id).await?;

        let outcome = vault.approve(nominee, self.clock.now())?;
        self.repository.save(&vault).await?;

        if outcome.unlocked {
            info!(vault_id, approvals = outcome.approved_count, "vault unlocked");
        } else {
            debug!(
                vault_id,
                nominee_id = outcome.nominee_id,
                approvals = outcome.approved_count,
                "unlock approval recorded"
            );
        }
        Ok(vault.summary())
    }

    // ── Fragments ────────────────────────────────────────────────

    /// Seals and stores a complete fragment set, replacing any previous one.
    ///
    /// Nothing is written unless every share seals.
    pub async fn store_fragments(
        &self,
        vault_id: &str,
        request: StoreFragments,
    ) -> EscrowResult<StoreReceipt> {
        let _guard = self.locks.acquire(vault_id).await;
        let mut vault = self.load_required(vault_id).await?;
        self.validate_fragments(&vault, &request)?;

        let key = self.keys.escrow_key()?;
        let now = self.clock.now();

        let fragments = request
            .shares
            .iter()
            .zip(vault.nominees.iter())
            .map(|(share, nominee)| -> EscrowResult<SealedFragment> {
                Ok(SealedFragment {
                    share_id: nominee.id,
                    encrypted_share: seal_with_key(share.as_bytes(), &key)?,
                    stored_at: now,
                })
            })
            .collect::<EscrowResult<Vec<_>>>()?;

        let shares_stored = fragments.len();
        vault.replace_fragments(fragments, now);
        self.repository.save(&vault).await?;

        info!(vault_id, shares_stored, "fragments escrowed");
        Ok(StoreReceipt {
            vault_id: vault.vault_id,
            shares_stored,
            updated_at: now,
        })
    }

    fn validate_fragments(&self, vault: &Vault, request: &StoreFragments) -> EscrowResult<()> {
        let required = self.config.required_nominees;
        if request.shares.len() != required {
            return Err(EscrowError::Validation(format!(
                "exactly {required} encrypted shares are required"
            )));
        }
        if request.threshold != self.config.required_threshold || request.total_shares != required
        {
            return Err(EscrowError::Validation(format!(
                "{}-of-{required} secret sharing is required",
                self.config.required_threshold
            )));
        }
        if request.total_shares != vault.nominees.len()
            || request.threshold != usize::from(vault.threshold)
        {
            return Err(EscrowError::Validation(format!(
                "vault expects {}-of-{} shares",
                vault.threshold,
                vault.nominees.len()
            )));
        }
        if let Some(index) = request.shares.iter().position(|s| s.trim().is_empty()) {
            return Err(EscrowError::Validation(format!(
                "share {} is empty",
                index + 1
            )));
        }
        Ok(())
    }

    /// Unseals the fragment belonging to `nominee` (id or email).
    ///
    /// Allowed once nominees have been notified; may be repeated.
    pub async fn release_fragment(
        &self,
        vault_id: &str,
        nominee: &str,
    ) -> EscrowResult<ReleasedShare> {
        let _guard = self.locks.acquire(vault_id).await;
        let mut vault = self.load_required(vault_id).await?;

        if !vault.can_release_fragments() {
            return Err(EscrowError::State(format!(
                "nominee shares are unavailable while the vault is {}",
                vault.status
            )));
        }
        if !vault.fragments_complete() {
            return Err(EscrowError::State(
                "encrypted shares are not fully stored".to_string(),
            ));
        }

        let (nominee_id, email) = {
            let nominee = vault.find_nominee(nominee)?;
            (nominee.id, nominee.email.clone())
        };
        let fragment = vault
            .fragment_for(nominee_id)
            .ok_or_else(|| EscrowError::NotFound {
                kind: "share",
                id: nominee_id.to_string(),
            })?;

        let key = self.keys.escrow_key()?;
        let plaintext = open_with_key(&fragment.encrypted_share, &key)?;
        let share = String::from_utf8(plaintext.to_vec())
            .map_err(|_| EscrowError::Crypto("released share is not valid UTF-8".to_string()))?;

        vault.mark_share_released(nominee_id, self.clock.now());
        self.repository.save(&vault).await?;

        info!(vault_id, nominee_id, "fragment released");
        Ok(ReleasedShare {
            vault_id: vault.vault_id,
            nominee: email,
            share,
        })
    }

    // ── Sweep ────────────────────────────────────────────────────

    /// Evaluates every stored vault once.
    ///
    /// A failing vault is logged and counted; the sweep moves on.
    pub async fn evaluate_all(&self) -> EscrowResult<SweepReport> {
        let now = self.clock.now();
        let ids = self.repository.list_ids().await?;

        let mut updated = 0;
        let mut failed = 0;
        for vault_id in &ids {
            match self.evaluate_one(vault_id, now).await {
                Ok(true) => updated += 1,
                Ok(false) => {}
                Err(e) => {
                    failed += 1;
                    error!(vault_id = %vault_id, "dead-man evaluation failed: {e}");
                }
            }
        }

        let report = SweepReport {
            scanned: ids.len(),
            updated,
            failed,
            evaluated_at: now,
        };
        if updated > 0 || failed > 0 {
            info!(scanned = report.scanned, updated, failed, "dead-man sweep finished");
        } else {
            debug!(scanned = report.scanned, "dead-man sweep finished");
        }
        Ok(report)
    }

    async fn evaluate_one(&self, vault_id: &str, now: DateTime<Utc>) -> EscrowResult<bool> {
        let guard = self.locks.acquire(vault_id).await;
        let Some(mut vault) = self.repository.load(vault_id).await? else {
            return Ok(false);
        };

        let transition = vault.evaluate(now)?;
        if !transition.is_changed() {
            return Ok(false);
        }
        self.repository.save(&vault).await?;
        drop(guard);

        match &transition {
            Transition::MissedCheckIn { missed_count } => {
                info!(vault_id, missed_count, "check-in missed");
            }
            Transition::GraceStarted {
                missed_count,
                grace_ends_at,
            } => {
                warn!(vault_id, missed_count, grace_ends_at = %grace_ends_at, "grace period started");
            }
            Transition::NomineesNotified { notices } => {
                warn!(vault_id, notified = notices.len(), "grace period expired, nominees notified");
            }
            Transition::Unchanged => {}
        }
        self.dispatch(transition.notices()).await;
        Ok(true)
    }
}
