//! Escrow key providers.

use deadlock_crypto::{CryptoResult, EscrowKey};

/// Source of the operator-held key that seals fragments.
pub trait EscrowKeyProvider: Send + Sync {
    /// Returns the key, or `CryptoError::Config` if it is missing or malformed.
    fn escrow_key(&self) -> CryptoResult<EscrowKey>;
}

/// Reads the key from an environment variable on every call.
#[derive(Debug, Clone)]
pub struct EnvKeyProvider {
    var: String,
}

impl EnvKeyProvider {
    pub fn new(var: impl Into<String>) -> Self {
        Self { var: var.into() }
    }

    pub fn var(&self) -> &str {
        &self.var
    }
}

impl EscrowKeyProvider for EnvKeyProvider {
    fn escrow_key(&self) -> CryptoResult<EscrowKey> {
        EscrowKey::from_env(&self.var)
    }
}

/// Holds a fixed key in memory.
#[derive(Debug, Clone)]
pub struct StaticKeyProvider {
    key: EscrowKey,
}

impl StaticKeyProvider {
    pub fn new(key: EscrowKey) -> Self {
        Self { key }
    }
}

impl EscrowKeyProvider for StaticKeyProvider {
    fn escrow_key(&self) -> CryptoResult<EscrowKey> {
        Ok(self.key.clone())
    }
}
