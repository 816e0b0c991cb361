//! Vault records and the dead-man-switch lifecycle.
//!
//! A [`Vault`] holds the owner's nominees, the check-in policy, the
//! dead-man-switch bookkeeping and the escrowed fragment set. The lifecycle
//! methods ([`Vault::check_in`], [`Vault::evaluate`], [`Vault::request_unlock`],
//! [`Vault::approve`]) are plain state transitions over the record: they take
//! the current time as an argument and perform no I/O.

mod error;
pub mod lifecycle;
pub mod model;

pub use error::{VaultError, VaultResult};
pub use lifecycle::{ApprovalOutcome, Transition};
pub use model::{
    normalize_email, ApprovalTally, ApprovalsView, CheckInPolicy, DeadManState, NewVault, Nominee,
    NomineeNotice, NomineeStatus, SealedFragment, ShareSet, UnlockRequest, Vault, VaultStatus,
    VaultSummary, DEAD_MAN_REASON, MAX_POLICY_DAYS,
};
