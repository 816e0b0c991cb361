//! Error types for the crypto layer.

use thiserror::Error;

/// Result type for crypto operations.
pub type CryptoResult<T> = Result<T, CryptoError>;

/// Errors that can occur while splitting, sealing or opening secrets.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CryptoError {
    /// Caller supplied malformed input (share counts, thresholds, lengths).
    #[error("invalid input: {0}")]
    Validation(String),

    /// A field operation was asked for a value outside its domain.
    #[error("field domain error: {0}")]
    Domain(String),

    #[error("encryption failed: {0}")]
    Encryption(String),

    /// Authentication tag did not verify. No plaintext is ever returned
    /// alongside this error.
    #[error("decryption failed: {0}")]
    Decryption(String),

    #[error("key derivation failed: {0}")]
    KeyDerivation(String),

    #[error("encoding error: {0}")]
    Encoding(String),

    #[error("invalid key length: expected {expected}, got {actual}")]
    InvalidKeyLength { expected: usize, actual: usize },

    /// Escrow key missing or malformed.
    #[error("invalid configuration: {0}")]
    Config(String),
}
