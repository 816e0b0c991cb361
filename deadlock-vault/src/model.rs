//! Persisted vault records and their read projections.
//!
//! Records serialize with camelCase keys and snake_case status strings so a
//! stored vault reads the same regardless of which backend wrote it.

use crate::error::{VaultError, VaultResult};
use chrono::{DateTime, Duration, Utc};
use deadlock_crypto::KeyedEnvelope;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Reason recorded on an unlock request opened by grace-period expiry.
pub const DEAD_MAN_REASON: &str = "Dead man switch triggered";

/// Upper bound for the check-in interval and the grace period.
pub const MAX_POLICY_DAYS: u32 = 36_500;

/// Lifecycle position of a vault.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VaultStatus {
    Active,
    MissedCheckin,
    GracePeriod,
    NomineesNotified,
    Unlocked,
}

impl VaultStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::MissedCheckin => "missed_checkin",
            Self::GracePeriod => "grace_period",
            Self::NomineesNotified => "nominees_notified",
            Self::Unlocked => "unlocked",
        }
    }
}

impl fmt::Display for VaultStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A nominee's vote on the current unlock request.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NomineeStatus {
    Pending,
    Approved,
}

/// A trusted party holding one fragment and one approval vote.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Nominee {
    /// Stable 1-based index; equals the id of the nominee's fragment.
    pub id: u8,
    /// Trimmed, lower-cased address, unique within the vault.
    pub email: String,
    pub status: NomineeStatus,
    pub approved_at: Option<DateTime<Utc>>,
    pub notified_at: Option<DateTime<Utc>>,
    pub share_released_at: Option<DateTime<Utc>>,
}

impl Nominee {
    pub(crate) fn new(id: u8, email: String) -> Self {
        Self {
            id,
            email,
            status: NomineeStatus::Pending,
            approved_at: None,
            notified_at: None,
            share_released_at: None,
        }
    }

    pub fn is_approved(&self) -> bool {
        self.status == NomineeStatus::Approved
    }

    /// Whether `reference` names this nominee by id or by email.
    pub fn matches(&self, reference: &str) -> bool {
        let reference = reference.trim();
        reference == self.id.to_string() || normalize_email(reference) == self.email
    }
}

/// Canonical form used for nominee emails.
pub fn normalize_email(raw: &str) -> String {
    raw.trim().to_lowercase()
}

/// Check-in cadence for a vault.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckInPolicy {
    pub interval_days: u32,
    pub grace_period_days: u32,
    pub max_missed_check_ins: u32,
}

impl Default for CheckInPolicy {
    fn default() -> Self {
        Self {
            interval_days: 14,
            grace_period_days: 30,
            max_missed_check_ins: 2,
        }
    }
}

impl CheckInPolicy {
    pub fn interval(&self) -> Duration {
        Duration::days(i64::from(self.interval_days))
    }

    pub fn grace_period(&self) -> Duration {
        Duration::days(i64::from(self.grace_period_days))
    }
}

/// `at + delta`, or a validation error when the result leaves chrono's range.
pub(crate) fn shift(at: DateTime<Utc>, delta: Duration) -> VaultResult<DateTime<Utc>> {
    at.checked_add_signed(delta).ok_or_else(|| {
        VaultError::Validation(format!("check-in schedule overflows the calendar at {at}"))
    })
}

/// Dead-man-switch bookkeeping.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeadManState {
    pub missed_count: u32,
    pub last_check_in_at: DateTime<Utc>,
    pub next_check_in_due_at: DateTime<Utc>,
    pub grace_started_at: Option<DateTime<Utc>>,
    pub grace_ends_at: Option<DateTime<Utc>>,
    pub nominees_notified_at: Option<DateTime<Utc>>,
    /// Time of the last evaluation that changed the vault.
    #[serde(default)]
    pub last_evaluated_at: Option<DateTime<Utc>>,
}

impl DeadManState {
    /// Fresh state after creation or a check-in at `now`.
    pub fn starting_at(now: DateTime<Utc>, policy: &CheckInPolicy) -> VaultResult<Self> {
        Ok(Self {
            missed_count: 0,
            last_check_in_at: now,
            next_check_in_due_at: shift(now, policy.interval())?,
            grace_started_at: None,
            grace_ends_at: None,
            nominees_notified_at: None,
            last_evaluated_at: None,
        })
    }
}

/// Open or completed request to release the vault.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnlockRequest {
    pub requested_at: DateTime<Utc>,
    pub reason: String,
    pub approvals_required: u8,
    pub approved_count: u8,
    pub completed_at: Option<DateTime<Utc>>,
}

/// One share sealed under the escrow key.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SealedFragment {
    /// Id of the nominee this fragment belongs to.
    pub share_id: u8,
    pub encrypted_share: KeyedEnvelope,
    pub stored_at: DateTime<Utc>,
}

/// The escrowed fragment set of a vault. Holds either every fragment or none.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShareSet {
    pub threshold: u8,
    pub total_shares: u8,
    pub fragments: Vec<SealedFragment>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// A vault record.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Vault {
    pub vault_id: String,
    pub owner_id: String,
    pub vault_name: String,
    pub nominees: Vec<Nominee>,
    pub threshold: u8,
    /// Owner-provided hint, stored verbatim.
    pub trigger_time: Option<String>,
    pub status: VaultStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub check_in_policy: CheckInPolicy,
    pub dead_man: DeadManState,
    pub check_ins: Vec<DateTime<Utc>>,
    pub last_check_in: DateTime<Utc>,
    pub unlock_request: Option<UnlockRequest>,
    pub shares: ShareSet,
}

/// Input for creating a vault.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewVault {
    pub owner_id: String,
    pub vault_name: String,
    /// Nominee emails in fragment order.
    pub nominees: Vec<String>,
    pub threshold: usize,
    #[serde(default)]
    pub trigger_time: Option<String>,
    /// Falls back to [`CheckInPolicy::default`] when absent.
    #[serde(default)]
    pub check_in_policy: Option<CheckInPolicy>,
}

/// Message handed to the notifier for one nominee.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NomineeNotice {
    pub nominee_email: String,
    pub vault_id: String,
    pub vault_name: String,
    pub owner_id: String,
}

// ── Projections ──────────────────────────────────────────────────

/// Approval tally shown on the dashboard.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApprovalTally {
    pub approved: usize,
    pub required: u8,
    /// Emails of nominees that have not approved.
    pub pending: Vec<String>,
    pub nominees: Vec<Nominee>,
}

/// Owner dashboard view of a vault.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VaultSummary {
    pub vault_id: String,
    pub owner_id: String,
    pub vault_name: String,
    pub status: VaultStatus,
    pub threshold: u8,
    pub trigger_time: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub last_check_in: DateTime<Utc>,
    pub check_in_count: usize,
    pub check_in_policy: CheckInPolicy,
    pub dead_man: DeadManState,
    pub unlock_request: Option<UnlockRequest>,
    pub shares_stored: usize,
    pub approvals: ApprovalTally,
}

/// Nominee-facing view of the current unlock request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApprovalsView {
    pub vault_id: String,
    pub vault_name: String,
    pub status: VaultStatus,
    pub threshold: u8,
    pub unlock_request: Option<UnlockRequest>,
    pub nominees: Vec<Nominee>,
}

impl Vault {
    pub fn summary(&self) -> VaultSummary {
        VaultSummary {
            vault_id: self.vault_id.clone(),
            owner_id: self.owner_id.clone(),
            vault_name: self.vault_name.clone(),
            status: self.status,
            threshold: self.threshold,
            trigger_time: self.trigger_time.clone(),
            created_at: self.created_at,
            updated_at: self.updated_at,
            last_check_in: self.last_check_in,
            check_in_count: self.check_ins.len(),
            check_in_policy: self.check_in_policy,
            dead_man: self.dead_man.clone(),
            unlock_request: self.unlock_request.clone(),
            shares_stored: self.shares.fragments.len(),
            approvals: ApprovalTally {
                approved: self.nominees.iter().filter(|n| n.is_approved()).count(),
                required: self.threshold,
                pending: self
                    .nominees
                    .iter()
                    .filter(|n| !n.is_approved())
                    .map(|n| n.email.clone())
                    .collect(),
                nominees: self.nominees.clone(),
            },
        }
    }

    pub fn approvals_view(&self) -> ApprovalsView {
        ApprovalsView {
            vault_id: self.vault_id.clone(),
            vault_name: self.vault_name.clone(),
            status: self.status,
            threshold: self.threshold,
            unlock_request: self.unlock_request.clone(),
            nominees: self.nominees.clone(),
        }
    }

    pub(crate) fn notice_for(&self, nominee: &Nominee) -> NomineeNotice {
        NomineeNotice {
            nominee_email: nominee.email.clone(),
            vault_id: self.vault_id.clone(),
            vault_name: self.vault_name.clone(),
            owner_id: self.owner_id.clone(),
        }
    }
}
