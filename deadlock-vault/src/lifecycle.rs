//! Dead-man-switch state machine.
//!
//! ```text
//! ACTIVE ──missed──▶ MISSED_CHECKIN ──max missed──▶ GRACE_PERIOD
//!                                                        │ grace ends
//!                                                        ▼
//!                     UNLOCKED ◀──quorum── NOMINEES_NOTIFIED
//! ```
//!
//! Every method takes `now` explicitly and touches only the vault record.
//! Side effects such as notifying nominees are returned to the caller.

use crate::error::{VaultError, VaultResult};
use crate::model::{
    normalize_email, shift, CheckInPolicy, DeadManState, NewVault, Nominee, NomineeNotice,
    NomineeStatus, SealedFragment, ShareSet, UnlockRequest, Vault, VaultStatus, DEAD_MAN_REASON,
    MAX_POLICY_DAYS,
};
use chrono::{DateTime, Utc};
use deadlock_crypto::{MAX_SHARES, MIN_SHARES};
use std::collections::HashSet;

/// Outcome of one periodic evaluation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Transition {
    Unchanged,
    MissedCheckIn {
        missed_count: u32,
    },
    GraceStarted {
        missed_count: u32,
        grace_ends_at: DateTime<Utc>,
    },
    NomineesNotified {
        /// Nominees notified for the first time by this transition.
        notices: Vec<NomineeNotice>,
    },
}

impl Transition {
    pub fn is_changed(&self) -> bool {
        !matches!(self, Self::Unchanged)
    }

    /// Notifications the caller owes after persisting the vault.
    pub fn notices(&self) -> &[NomineeNotice] {
        match self {
            Self::NomineesNotified { notices } => notices,
            _ => &[],
        }
    }
}

/// Result of a successful approval.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ApprovalOutcome {
    pub nominee_id: u8,
    pub approved_count: u8,
    pub unlocked: bool,
}

impl CheckInPolicy {
    pub fn validate(&self) -> VaultResult<()> {
        if self.interval_days == 0 || self.grace_period_days == 0 || self.max_missed_check_ins == 0
        {
            return Err(VaultError::Validation(
                "check-in interval, grace period and max missed check-ins must be positive"
                    .to_string(),
            ));
        }
        if self.interval_days > MAX_POLICY_DAYS || self.grace_period_days > MAX_POLICY_DAYS {
            return Err(VaultError::Validation(format!(
                "check-in interval and grace period must not exceed {MAX_POLICY_DAYS} days"
            )));
        }
        Ok(())
    }
}

fn normalize_nominees(raw: &[String]) -> VaultResult<Vec<Nominee>> {
    if raw.len() < MIN_SHARES || raw.len() > MAX_SHARES {
        return Err(VaultError::Validation(format!(
            "between {MIN_SHARES} and {MAX_SHARES} nominees are required, got {}",
            raw.len()
        )));
    }

    let mut seen = HashSet::with_capacity(raw.len());
    raw.iter()
        .enumerate()
        .map(|(index, email)| {
            let email = normalize_email(email);
            if email.is_empty() {
                return Err(VaultError::Validation(format!(
                    "nominee {} has an empty email",
                    index + 1
                )));
            }
            if !seen.insert(email.clone()) {
                return Err(VaultError::Validation(format!(
                    "duplicate nominee email: {email}"
                )));
            }
            // Bounded by MAX_SHARES above.
            Ok(Nominee::new((index + 1) as u8, email))
        })
        .collect()
}

impl Vault {
    /// Builds a new ACTIVE vault with a fresh v4 id.
    pub fn create(new: NewVault, now: DateTime<Utc>) -> VaultResult<Self> {
        let owner_id = new.owner_id.trim().to_string();
        let vault_name = new.vault_name.trim().to_string();
        if owner_id.is_empty() {
            return Err(VaultError::Validation("owner id is required".to_string()));
        }
        if vault_name.is_empty() {
            return Err(VaultError::Validation("vault name is required".to_string()));
        }

        let nominees = normalize_nominees(&new.nominees)?;
        if new.threshold < MIN_SHARES || new.threshold > nominees.len() {
            return Err(VaultError::Validation(format!(
                "threshold must be between {MIN_SHARES} and {}, got {}",
                nominees.len(),
                new.threshold
            )));
        }
        let check_in_policy = new.check_in_policy.unwrap_or_default();
        check_in_policy.validate()?;

        let threshold = new.threshold as u8;
        let total_shares = nominees.len() as u8;

        Ok(Self {
            vault_id: uuid::Uuid::new_v4().to_string(),
            owner_id,
            vault_name,
            nominees,
            threshold,
            trigger_time: new.trigger_time,
            status: VaultStatus::Active,
            created_at: now,
            updated_at: now,
            check_in_policy,
            dead_man: DeadManState::starting_at(now, &check_in_policy)?,
            check_ins: Vec::new(),
            last_check_in: now,
            unlock_request: None,
            shares: ShareSet {
                threshold,
                total_shares,
                fragments: Vec::new(),
                updated_at: None,
            },
        })
    }

    /// Owner proof of life. Resets the switch from any state.
    ///
    /// Nominees lose their votes and their notification stamps, so a later
    /// grace expiry notifies everyone again.
    pub fn check_in(&mut self, now: DateTime<Utc>) -> VaultResult<()> {
        let dead_man = DeadManState::starting_at(now, &self.check_in_policy)?;

        self.last_check_in = now;
        self.check_ins.push(now);
        self.status = VaultStatus::Active;
        self.unlock_request = None;
        self.dead_man = dead_man;
        for nominee in &mut self.nominees {
            nominee.status = NomineeStatus::Pending;
            nominee.approved_at = None;
            nominee.notified_at = None;
        }
        self.updated_at = now;
        Ok(())
    }

    /// Advances the switch by at most one step.
    ///
    /// A second call at or before the last state-changing evaluation is a
    /// no-op, as is any call on an unlocked vault. A schedule that runs past
    /// the representable calendar is an error and leaves the vault untouched.
    pub fn evaluate(&mut self, now: DateTime<Utc>) -> VaultResult<Transition> {
        if self.status == VaultStatus::Unlocked {
            return Ok(Transition::Unchanged);
        }
        if self.dead_man.last_evaluated_at.is_some_and(|at| now <= at) {
            return Ok(Transition::Unchanged);
        }

        let transition = match self.status {
            VaultStatus::Active | VaultStatus::MissedCheckin
                if now > self.dead_man.next_check_in_due_at =>
            {
                self.record_missed_check_in(now)?
            }
            VaultStatus::GracePeriod
                if self.dead_man.grace_ends_at.is_some_and(|ends| now >= ends) =>
            {
                self.expire_grace_period(now)
            }
            _ => Transition::Unchanged,
        };

        if transition.is_changed() {
            self.dead_man.last_evaluated_at = Some(now);
            self.updated_at = now;
        }
        Ok(transition)
    }

    fn record_missed_check_in(&mut self, now: DateTime<Utc>) -> VaultResult<Transition> {
        let policy = self.check_in_policy;
        let missed_count = self.dead_man.missed_count.saturating_add(1);
        let next_due = shift(self.dead_man.next_check_in_due_at, policy.interval())?;
        let grace_ends_at = if missed_count >= policy.max_missed_check_ins {
            Some(shift(now, policy.grace_period())?)
        } else {
            None
        };

        let dead_man = &mut self.dead_man;
        dead_man.missed_count = missed_count;
        dead_man.next_check_in_due_at = next_due;

        let Some(grace_ends_at) = grace_ends_at else {
            self.status = VaultStatus::MissedCheckin;
            return Ok(Transition::MissedCheckIn { missed_count });
        };

        dead_man.grace_started_at = Some(now);
        dead_man.grace_ends_at = Some(grace_ends_at);
        self.status = VaultStatus::GracePeriod;

        Ok(Transition::GraceStarted {
            missed_count,
            grace_ends_at,
        })
    }

    fn expire_grace_period(&mut self, now: DateTime<Utc>) -> Transition {
        self.status = VaultStatus::NomineesNotified;
        self.dead_man.nominees_notified_at = Some(now);
        let notices = self.mark_unnotified(now);

        self.unlock_request = Some(UnlockRequest {
            requested_at: now,
            reason: DEAD_MAN_REASON.to_string(),
            approvals_required: self.threshold,
            approved_count: self.approved_count(),
            completed_at: None,
        });

        Transition::NomineesNotified { notices }
    }

    /// Stamps `notified_at` on nominees that lack it and returns their notices.
    fn mark_unnotified(&mut self, now: DateTime<Utc>) -> Vec<NomineeNotice> {
        let mut notified = Vec::new();
        for nominee in &mut self.nominees {
            if nominee.notified_at.is_none() {
                nominee.notified_at = Some(now);
                notified.push(nominee.clone());
            }
        }
        notified.iter().map(|n| self.notice_for(n)).collect()
    }

    /// Owner-triggered unlock. Opens a fresh request with every vote reset.
    ///
    /// Returns notices for nominees who had never been notified.
    pub fn request_unlock(&mut self, reason: &str, now: DateTime<Utc>) -> Vec<NomineeNotice> {
        self.status = VaultStatus::NomineesNotified;
        self.unlock_request = Some(UnlockRequest {
            requested_at: now,
            reason: reason.to_string(),
            approvals_required: self.threshold,
            approved_count: 0,
            completed_at: None,
        });
        for nominee in &mut self.nominees {
            nominee.status = NomineeStatus::Pending;
            nominee.approved_at = None;
        }
        let notices = self.mark_unnotified(now);
        self.dead_man.nominees_notified_at.get_or_insert(now);
        self.updated_at = now;
        notices
    }

    /// Records a nominee's approval, unlocking the vault at quorum.
    pub fn approve(&mut self, reference: &str, now: DateTime<Utc>) -> VaultResult<ApprovalOutcome> {
        if self.unlock_request.is_none() {
            return Err(VaultError::NoOpenUnlockRequest);
        }

        let nominee = self
            .nominees
            .iter_mut()
            .find(|n| n.matches(reference))
            .ok_or_else(|| VaultError::NomineeNotFound(reference.trim().to_string()))?;
        if nominee.is_approved() {
            return Err(VaultError::AlreadyApproved(nominee.email.clone()));
        }
        nominee.status = NomineeStatus::Approved;
        nominee.approved_at = Some(now);
        let nominee_id = nominee.id;

        let approved_count = self.approved_count();
        let unlocked = approved_count >= self.threshold;
        if let Some(request) = self.unlock_request.as_mut() {
            request.approved_count = approved_count;
            if unlocked {
                request.completed_at = Some(now);
            }
        }
        if unlocked {
            self.status = VaultStatus::Unlocked;
        }
        self.updated_at = now;

        Ok(ApprovalOutcome {
            nominee_id,
            approved_count,
            unlocked,
        })
    }

    pub fn approved_count(&self) -> u8 {
        // At most MAX_SHARES nominees.
        self.nominees.iter().filter(|n| n.is_approved()).count() as u8
    }

    /// Fragments may only leave escrow once nominees have been notified.
    pub fn can_release_fragments(&self) -> bool {
        matches!(
            self.status,
            VaultStatus::NomineesNotified | VaultStatus::Unlocked
        )
    }

    pub fn find_nominee(&self, reference: &str) -> VaultResult<&Nominee> {
        self.nominees
            .iter()
            .find(|n| n.matches(reference))
            .ok_or_else(|| VaultError::NomineeNotFound(reference.trim().to_string()))
    }

    /// Whether one sealed fragment is stored per nominee.
    pub fn fragments_complete(&self) -> bool {
        !self.nominees.is_empty() && self.shares.fragments.len() == self.nominees.len()
    }

    pub fn fragment_for(&self, nominee_id: u8) -> Option<&SealedFragment> {
        self.shares.fragments.iter().find(|f| f.share_id == nominee_id)
    }

    /// Replaces the whole fragment set.
    pub fn replace_fragments(&mut self, fragments: Vec<SealedFragment>, now: DateTime<Utc>) {
        self.shares = ShareSet {
            threshold: self.threshold,
            total_shares: self.nominees.len() as u8,
            fragments,
            updated_at: Some(now),
        };
        self.updated_at = now;
    }

    pub fn mark_share_released(&mut self, nominee_id: u8, now: DateTime<Utc>) {
        if let Some(nominee) = self.nominees.iter_mut().find(|n| n.id == nominee_id) {
            nominee.share_released_at = Some(now);
        }
        self.updated_at = now;
    }
}
