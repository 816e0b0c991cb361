//! Vault error types.

use thiserror::Error;

/// Result type for vault lifecycle operations.
pub type VaultResult<T> = Result<T, VaultError>;

/// Errors raised by vault construction and lifecycle actions.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VaultError {
    #[error("invalid vault: {0}")]
    Validation(String),

    #[error("nominee not found: {0}")]
    NomineeNotFound(String),

    #[error("no active unlock request")]
    NoOpenUnlockRequest,

    #[error("nominee already approved: {0}")]
    AlreadyApproved(String),
}
