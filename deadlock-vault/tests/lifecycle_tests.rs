use chrono::{DateTime, Duration, TimeZone, Utc};
use deadlock_vault::{
    CheckInPolicy, NewVault, NomineeStatus, Transition, Vault, VaultError, VaultStatus,
    DEAD_MAN_REASON,
};
use pretty_assertions::assert_eq;

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 1, 9, 30, 0).unwrap()
}

fn day(n: i64) -> DateTime<Utc> {
    t0() + Duration::days(n)
}

fn three_of_three() -> Vault {
    Vault::create(
        NewVault {
            owner_id: "owner-42".into(),
            vault_name: "Estate".into(),
            nominees: vec![
                "alice@example.com".into(),
                "bob@example.com".into(),
                "carol@example.com".into(),
            ],
            threshold: 3,
            trigger_time: Some("2030-01-01".into()),
            check_in_policy: Some(CheckInPolicy {
                interval_days: 14,
                grace_period_days: 30,
                max_missed_check_ins: 2,
            }),
        },
        t0(),
    )
    .unwrap()
}

/// Drives a fresh vault through grace expiry.
fn notified_vault() -> Vault {
    let mut vault = three_of_three();
    vault.evaluate(day(29)).unwrap();
    vault.evaluate(day(43)).unwrap();
    vault.evaluate(day(73)).unwrap();
    assert_eq!(vault.status, VaultStatus::NomineesNotified);
    vault
}

// ── Dead-man timeline ────────────────────────────────────────────

#[test]
fn missed_check_ins_then_grace_then_notification() {
    let mut vault = three_of_three();

    let first = vault.evaluate(day(29)).unwrap();
    assert_eq!(first, Transition::MissedCheckIn { missed_count: 1 });
    assert_eq!(vault.status, VaultStatus::MissedCheckin);
    assert_eq!(vault.dead_man.missed_count, 1);
    assert_eq!(vault.dead_man.next_check_in_due_at, day(28));

    let second = vault.evaluate(day(43)).unwrap();
    assert_eq!(
        second,
        Transition::GraceStarted {
            missed_count: 2,
            grace_ends_at: day(73),
        }
    );
    assert_eq!(vault.status, VaultStatus::GracePeriod);
    assert_eq!(vault.dead_man.grace_started_at, Some(day(43)));
    assert_eq!(vault.dead_man.grace_ends_at, Some(day(73)));

    assert_eq!(vault.evaluate(day(72)).unwrap(), Transition::Unchanged);

    let third = vault.evaluate(day(73)).unwrap();
    assert_eq!(third.notices().len(), 3);
    assert_eq!(vault.status, VaultStatus::NomineesNotified);
    assert_eq!(vault.dead_man.nominees_notified_at, Some(day(73)));

    let request = vault.unlock_request.as_ref().unwrap();
    assert_eq!(request.approvals_required, 3);
    assert_eq!(request.approved_count, 0);
    assert_eq!(request.reason, DEAD_MAN_REASON);
    assert_eq!(request.requested_at, day(73));
    assert!(vault.nominees.iter().all(|n| n.notified_at == Some(day(73))));
}

#[test]
fn notices_carry_vault_identity() {
    let mut vault = three_of_three();
    vault.evaluate(day(29)).unwrap();
    vault.evaluate(day(43)).unwrap();
    let transition = vault.evaluate(day(73)).unwrap();

    let notice = &transition.notices()[1];
    assert_eq!(notice.nominee_email, "bob@example.com");
    assert_eq!(notice.vault_id, vault.vault_id);
    assert_eq!(notice.vault_name, "Estate");
    assert_eq!(notice.owner_id, "owner-42");
}

#[test]
fn one_missed_period_per_evaluation() {
    let mut vault = three_of_three();
    // Far past several due dates: still only one step.
    vault.evaluate(day(100)).unwrap();
    assert_eq!(vault.dead_man.missed_count, 1);
    assert_eq!(vault.status, VaultStatus::MissedCheckin);
}

#[test]
fn unlocked_vault_is_terminal_for_evaluation() {
    let mut vault = notified_vault();
    for reference in ["1", "2", "3"] {
        vault.approve(reference, day(74)).unwrap();
    }
    let snapshot = vault.clone();
    assert_eq!(vault.evaluate(day(500)).unwrap(), Transition::Unchanged);
    assert_eq!(vault, snapshot);
}

#[test]
fn grace_expiry_skips_already_notified_nominees() {
    let mut vault = three_of_three();
    vault.nominees[0].notified_at = Some(day(1));
    vault.evaluate(day(29)).unwrap();
    vault.evaluate(day(43)).unwrap();
    let transition = vault.evaluate(day(73)).unwrap();

    let emails: Vec<_> = transition
        .notices()
        .iter()
        .map(|n| n.nominee_email.as_str())
        .collect();
    assert_eq!(emails, ["bob@example.com", "carol@example.com"]);
    assert_eq!(vault.nominees[0].notified_at, Some(day(1)));
}

#[test]
fn grace_expiry_seeds_count_from_prior_approvals() {
    let mut vault = three_of_three();
    vault.evaluate(day(29)).unwrap();
    vault.evaluate(day(43)).unwrap();
    vault.nominees[1].status = NomineeStatus::Approved;
    vault.nominees[1].approved_at = Some(day(50));

    vault.evaluate(day(73)).unwrap();
    assert_eq!(vault.unlock_request.unwrap().approved_count, 1);
}

#[test]
fn oversized_policy_is_rejected_at_creation() {
    let input = NewVault {
        owner_id: "owner-42".into(),
        vault_name: "Estate".into(),
        nominees: vec!["alice@example.com".into(), "bob@example.com".into()],
        threshold: 2,
        trigger_time: None,
        check_in_policy: Some(CheckInPolicy {
            interval_days: 14,
            grace_period_days: 1_000_000_000,
            max_missed_check_ins: 2,
        }),
    };
    assert!(matches!(
        Vault::create(input, t0()),
        Err(VaultError::Validation(_))
    ));
}

#[test]
fn stored_policy_past_calendar_fails_without_mutation() {
    let mut vault = three_of_three();
    vault.check_in_policy.grace_period_days = 1_000_000_000;
    vault.evaluate(day(29)).unwrap();
    let snapshot = vault.clone();

    assert!(matches!(
        vault.evaluate(day(43)),
        Err(VaultError::Validation(_))
    ));
    assert_eq!(vault, snapshot);

    vault.check_in_policy.interval_days = u32::MAX;
    let snapshot = vault.clone();
    assert!(vault.check_in(day(44)).is_err());
    assert_eq!(vault, snapshot);
}

// ── Approvals ────────────────────────────────────────────────────

#[test]
fn quorum_unlocks_vault() {
    let mut vault = notified_vault();

    let first = vault.approve("1", day(74)).unwrap();
    assert_eq!(first.approved_count, 1);
    assert!(!first.unlocked);

    let second = vault.approve("bob@example.com", day(75)).unwrap();
    assert_eq!(second.approved_count, 2);
    assert_eq!(vault.status, VaultStatus::NomineesNotified);
    assert_eq!(vault.unlock_request.as_ref().unwrap().approved_count, 2);
    assert!(vault.unlock_request.as_ref().unwrap().completed_at.is_none());

    let third = vault.approve("3", day(76)).unwrap();
    assert!(third.unlocked);
    assert_eq!(third.nominee_id, 3);
    assert_eq!(vault.status, VaultStatus::Unlocked);
    assert_eq!(vault.unlock_request.as_ref().unwrap().completed_at, Some(day(76)));
    assert_eq!(vault.nominees[2].approved_at, Some(day(76)));
}

#[test]
fn double_approval_is_rejected() {
    let mut vault = notified_vault();
    vault.approve("2", day(74)).unwrap();
    assert_eq!(
        vault.approve("BOB@example.com", day(75)),
        Err(VaultError::AlreadyApproved("bob@example.com".into()))
    );
}

#[test]
fn unknown_nominee_is_not_found() {
    let mut vault = notified_vault();
    assert_eq!(
        vault.approve("mallory@example.com", day(74)),
        Err(VaultError::NomineeNotFound("mallory@example.com".into()))
    );
    assert!(matches!(
        vault.approve("9", day(74)),
        Err(VaultError::NomineeNotFound(_))
    ));
}

// ── Check-in ─────────────────────────────────────────────────────

#[test]
fn check_in_mid_grace_resets_everything() {
    let mut vault = three_of_three();
    vault.evaluate(day(29)).unwrap();
    vault.evaluate(day(43)).unwrap();
    assert_eq!(vault.status, VaultStatus::GracePeriod);

    vault.check_in(day(50)).unwrap();

    assert_eq!(vault.status, VaultStatus::Active);
    assert_eq!(vault.dead_man.missed_count, 0);
    assert_eq!(vault.dead_man.last_check_in_at, day(50));
    assert_eq!(vault.dead_man.next_check_in_due_at, day(64));
    assert!(vault.dead_man.grace_started_at.is_none());
    assert!(vault.dead_man.grace_ends_at.is_none());
    assert!(vault.dead_man.last_evaluated_at.is_none());
    assert!(vault.unlock_request.is_none());
    assert_eq!(vault.check_ins, vec![day(50)]);
    assert_eq!(vault.last_check_in, day(50));
}

#[test]
fn check_in_after_approvals_resets_votes() {
    let mut vault = notified_vault();
    vault.approve("1", day(74)).unwrap();
    vault.approve("2", day(74)).unwrap();

    vault.check_in(day(75)).unwrap();

    assert_eq!(vault.status, VaultStatus::Active);
    assert!(vault.unlock_request.is_none());
    for nominee in &vault.nominees {
        assert_eq!(nominee.status, NomineeStatus::Pending);
        assert!(nominee.approved_at.is_none());
        assert!(nominee.notified_at.is_none());
    }
}

#[test]
fn grace_expiry_after_check_in_notifies_again() {
    let mut vault = notified_vault();
    vault.check_in(day(75)).unwrap();

    vault.evaluate(day(90)).unwrap();
    vault.evaluate(day(104)).unwrap();
    assert_eq!(vault.status, VaultStatus::GracePeriod);
    let transition = vault.evaluate(day(134)).unwrap();

    assert_eq!(vault.status, VaultStatus::NomineesNotified);
    assert_eq!(transition.notices().len(), 3);
    assert!(vault.nominees.iter().all(|n| n.notified_at == Some(day(134))));
}

#[test]
fn check_in_from_unlocked_is_honored() {
    let mut vault = notified_vault();
    for reference in ["1", "2", "3"] {
        vault.approve(reference, day(74)).unwrap();
    }
    vault.check_in(day(80)).unwrap();
    assert_eq!(vault.status, VaultStatus::Active);
    assert!(!vault.can_release_fragments());
}

// ── Manual unlock ────────────────────────────────────────────────

#[test]
fn manual_unlock_notifies_everyone_once() {
    let mut vault = three_of_three();
    let notices = vault.request_unlock("travelling", day(3));

    assert_eq!(notices.len(), 3);
    assert_eq!(vault.status, VaultStatus::NomineesNotified);
    assert_eq!(vault.dead_man.nominees_notified_at, Some(day(3)));
    let request = vault.unlock_request.as_ref().unwrap();
    assert_eq!(request.reason, "travelling");
    assert_eq!(request.approved_count, 0);

    let again = vault.request_unlock("again", day(4));
    assert!(again.is_empty());
    assert_eq!(vault.dead_man.nominees_notified_at, Some(day(3)));
    assert!(vault.nominees.iter().all(|n| n.notified_at == Some(day(3))));
}

#[test]
fn manual_unlock_resets_prior_votes() {
    let mut vault = notified_vault();
    vault.approve("1", day(74)).unwrap();

    vault.request_unlock("", day(75));

    assert_eq!(vault.approved_count(), 0);
    assert_eq!(vault.unlock_request.unwrap().approved_count, 0);
}

#[test]
fn release_gate_follows_status() {
    let mut vault = three_of_three();
    assert!(!vault.can_release_fragments());
    vault.evaluate(day(29)).unwrap();
    assert!(!vault.can_release_fragments());
    vault.request_unlock("", day(30));
    assert!(vault.can_release_fragments());
}

// ── Projections ──────────────────────────────────────────────────

#[test]
fn summary_reports_tally() {
    let mut vault = notified_vault();
    vault.approve("2", day(74)).unwrap();
    vault.check_ins.push(day(1));

    let summary = vault.summary();
    assert_eq!(summary.status, VaultStatus::NomineesNotified);
    assert_eq!(summary.approvals.approved, 1);
    assert_eq!(summary.approvals.required, 3);
    assert_eq!(
        summary.approvals.pending,
        vec!["alice@example.com".to_string(), "carol@example.com".to_string()]
    );
    assert_eq!(summary.check_in_count, 1);
    assert_eq!(summary.shares_stored, 0);
    assert_eq!(summary.trigger_time.as_deref(), Some("2030-01-01"));
}

#[test]
fn record_uses_camel_case_keys() {
    let vault = notified_vault();
    let json = serde_json::to_value(&vault).unwrap();

    assert_eq!(json["status"], "nominees_notified");
    assert_eq!(json["checkInPolicy"]["maxMissedCheckIns"], 2);
    assert_eq!(json["deadMan"]["missedCount"], 2);
    assert_eq!(json["unlockRequest"]["approvalsRequired"], 3);
    assert_eq!(json["shares"]["totalShares"], 3);
    assert_eq!(json["nominees"][0]["status"], "pending");

    let back: Vault = serde_json::from_value(json).unwrap();
    assert_eq!(back, vault);
}

#[test]
fn approvals_view_lists_nominees() {
    let vault = notified_vault();
    let view = vault.approvals_view();
    assert_eq!(view.vault_id, vault.vault_id);
    assert_eq!(view.nominees.len(), 3);
    assert_eq!(view.threshold, 3);
    assert!(view.unlock_request.is_some());
}
