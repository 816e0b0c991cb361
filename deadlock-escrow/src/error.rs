//! Escrow error taxonomy.
//!
//! Lower-level errors are mapped by variant into the small closed set a
//! caller can act on.

use deadlock_crypto::CryptoError;
use deadlock_storage::StorageError;
use deadlock_vault::VaultError;
use thiserror::Error;

/// Result type for escrow operations.
pub type EscrowResult<T> = Result<T, EscrowError>;

/// Errors returned by [`crate::EscrowService`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EscrowError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    #[error("invalid state: {0}")]
    State(String),

    #[error("crypto error: {0}")]
    Crypto(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("storage error: {0}")]
    Storage(String),
}

impl EscrowError {
    pub fn vault_not_found(vault_id: &str) -> Self {
        Self::NotFound {
            kind: "vault",
            id: vault_id.to_string(),
        }
    }

    /// Whether the caller can fix this by changing the request.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::Validation(_) | Self::NotFound { .. } | Self::State(_)
        )
    }
}

impl From<CryptoError> for EscrowError {
    fn from(err: CryptoError) -> Self {
        match err {
            CryptoError::Config(msg) => Self::Config(msg),
            CryptoError::Validation(msg) => Self::Validation(msg),
            other => Self::Crypto(other.to_string()),
        }
    }
}

impl From<VaultError> for EscrowError {
    fn from(err: VaultError) -> Self {
        match err {
            VaultError::Validation(msg) => Self::Validation(msg),
            VaultError::NomineeNotFound(id) => Self::NotFound {
                kind: "nominee",
                id,
            },
            state @ (VaultError::NoOpenUnlockRequest | VaultError::AlreadyApproved(_)) => {
                Self::State(state.to_string())
            }
        }
    }
}

impl From<StorageError> for EscrowError {
    fn from(err: StorageError) -> Self {
        Self::Storage(err.to_string())
    }
}
