//! Key material: the operator-held escrow key and passphrase-derived keys.

use crate::encoding::b64_decode;
use crate::error::{CryptoError, CryptoResult};
use rand::RngCore;
use sha2::Sha256;
use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

/// AES-256 key size in bytes.
pub const KEY_SIZE: usize = 32;

/// PBKDF2 salt size in bytes.
pub const SALT_SIZE: usize = 16;

/// PBKDF2-HMAC-SHA256 iteration count for passphrase envelopes.
pub const PBKDF2_ITERATIONS: u32 = 210_000;

/// Largest iteration count accepted from a stored envelope.
pub const MAX_PBKDF2_ITERATIONS: u32 = 10 * PBKDF2_ITERATIONS;

/// Environment variable holding the escrow key.
pub const ESCROW_KEY_ENV: &str = "MASTER_SHARE_ENCRYPTION_KEY";

/// Operator-provisioned 32-byte key sealing escrowed fragments.
///
/// Never derived from a passphrase. Wiped on drop; `Debug` never prints it.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct EscrowKey([u8; KEY_SIZE]);

impl EscrowKey {
    pub fn from_bytes(bytes: [u8; KEY_SIZE]) -> Self {
        Self(bytes)
    }

    /// Generates a fresh random key (provisioning and tests).
    pub fn generate() -> Self {
        let mut bytes = [0u8; KEY_SIZE];
        rand::rng().fill_bytes(&mut bytes);
        Self(bytes)
    }

    /// Parses a key given as 64 hex characters or as base64 of 32 bytes.
    pub fn parse(raw: &str) -> CryptoResult<Self> {
        let normalized = raw.trim();
        if normalized.is_empty() {
            return Err(CryptoError::Config("escrow key is empty".to_string()));
        }

        let decoded = Zeroizing::new(
            if normalized.len() == KEY_SIZE * 2 && normalized.chars().all(|c| c.is_ascii_hexdigit())
            {
                hex::decode(normalized).map_err(|e| CryptoError::Config(e.to_string()))?
            } else {
                b64_decode("escrow key", normalized)
                    .map_err(|e| CryptoError::Config(e.to_string()))?
            },
        );

        let bytes = <[u8; KEY_SIZE]>::try_from(decoded.as_slice()).map_err(|_| {
            CryptoError::Config(format!(
                "escrow key must be {KEY_SIZE} bytes (base64 or 64-char hex), got {}",
                decoded.len()
            ))
        })?;

        Ok(Self(bytes))
    }

    /// Reads and parses the key from an environment variable.
    ///
    /// A missing variable is a configuration error, reported on this call.
    pub fn from_env(var: &str) -> CryptoResult<Self> {
        let raw = Zeroizing::new(std::env::var(var).map_err(|_| {
            CryptoError::Config(format!("{var} is required for share encryption"))
        })?);
        Self::parse(&raw)
    }

    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.0
    }

    /// Hex form, for provisioning output.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Debug for EscrowKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("EscrowKey([REDACTED])")
    }
}

/// Derives an AES-256 key from a passphrase with PBKDF2-HMAC-SHA256.
pub fn derive_passphrase_key(
    passphrase: &str,
    salt: &[u8],
    iterations: u32,
) -> CryptoResult<Zeroizing<[u8; KEY_SIZE]>> {
    if iterations == 0 {
        return Err(CryptoError::KeyDerivation(
            "iteration count must be positive".to_string(),
        ));
    }

    let mut key = Zeroizing::new([0u8; KEY_SIZE]);
    pbkdf2::pbkdf2_hmac::<Sha256>(passphrase.as_bytes(), salt, iterations, &mut key[..]);
    Ok(key)
}

/// Random salt for a new passphrase envelope.
pub(crate) fn random_salt() -> [u8; SALT_SIZE] {
    let mut salt = [0u8; SALT_SIZE];
    rand::rng().fill_bytes(&mut salt);
    salt
}
