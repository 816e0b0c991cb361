//! AES-256-GCM envelopes.
//!
//! Two record shapes share the cipher:
//!
//! - [`PassphraseEnvelope`]: client-side protection of the master secret.
//!   The key is derived with PBKDF2-HMAC-SHA256 from a passphrase and a fresh
//!   salt; `cipherText` carries the GCM tag appended.
//! - [`KeyedEnvelope`]: server-side escrow of a share under the operator's
//!   [`EscrowKey`]; the tag is stored in its own `authTag` field.
//!
//! Both serialize with camelCase keys and base64 binary fields so records
//! written by other implementations open here unchanged.

use crate::encoding::{b64_decode, b64_decode_fixed, b64_encode};
use crate::error::{CryptoError, CryptoResult};
use crate::key::{
    derive_passphrase_key, random_salt, EscrowKey, MAX_PBKDF2_ITERATIONS, PBKDF2_ITERATIONS,
    SALT_SIZE,
};
use aes_gcm::aead::{Aead, AeadInPlace, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce, Tag};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

/// GCM nonce size in bytes.
pub const IV_SIZE: usize = 12;

/// GCM authentication tag size in bytes.
pub const TAG_SIZE: usize = 16;

/// Algorithm label written into passphrase envelopes.
pub const ALGORITHM_AES_GCM: &str = "AES-GCM";

/// KDF label written into passphrase envelopes.
pub const KDF_PBKDF2_SHA256: &str = "PBKDF2-SHA256";

fn default_iterations() -> u32 {
    PBKDF2_ITERATIONS
}

/// Passphrase-sealed secret.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PassphraseEnvelope {
    pub algorithm: String,
    pub kdf: String,
    #[serde(default = "default_iterations")]
    pub iterations: u32,
    /// Base64 PBKDF2 salt (16 bytes).
    pub salt: String,
    /// Base64 GCM nonce (12 bytes).
    pub iv: String,
    /// Base64 ciphertext with the 16-byte tag appended.
    pub cipher_text: String,
}

/// Fragment sealed under the escrow key.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyedEnvelope {
    /// Base64 ciphertext without the tag.
    pub cipher_text: String,
    /// Base64 GCM nonce (12 bytes).
    pub iv: String,
    /// Base64 GCM tag (16 bytes).
    pub auth_tag: String,
}

fn random_iv() -> [u8; IV_SIZE] {
    let mut iv = [0u8; IV_SIZE];
    rand::rng().fill_bytes(&mut iv);
    iv
}

fn cipher_for(key: &[u8]) -> CryptoResult<Aes256Gcm> {
    Aes256Gcm::new_from_slice(key).map_err(|_| CryptoError::InvalidKeyLength {
        expected: crate::key::KEY_SIZE,
        actual: key.len(),
    })
}

/// Seals `plaintext` under a key derived from `passphrase`.
pub fn seal_with_passphrase(plaintext: &[u8], passphrase: &str) -> CryptoResult<PassphraseEnvelope> {
    if plaintext.is_empty() || passphrase.is_empty() {
        return Err(CryptoError::Validation(
            "plaintext and passphrase are required".to_string(),
        ));
    }

    let salt = random_salt();
    let iv = random_iv();
    let key = derive_passphrase_key(passphrase, &salt, PBKDF2_ITERATIONS)?;

    let cipher_text = cipher_for(&key[..])?
        .encrypt(Nonce::from_slice(&iv), plaintext)
        .map_err(|e| CryptoError::Encryption(format!("passphrase seal failed: {e}")))?;

    Ok(PassphraseEnvelope {
        algorithm: ALGORITHM_AES_GCM.to_string(),
        kdf: KDF_PBKDF2_SHA256.to_string(),
        iterations: PBKDF2_ITERATIONS,
        salt: b64_encode(&salt),
        iv: b64_encode(&iv),
        cipher_text: b64_encode(&cipher_text),
    })
}

/// Opens a passphrase envelope. Fails closed on a bad tag.
pub fn open_with_passphrase(
    envelope: &PassphraseEnvelope,
    passphrase: &str,
) -> CryptoResult<Zeroizing<Vec<u8>>> {
    if passphrase.is_empty() {
        return Err(CryptoError::Validation("passphrase is required".to_string()));
    }
    if envelope.algorithm != ALGORITHM_AES_GCM {
        return Err(CryptoError::Validation(format!(
            "unsupported algorithm: {}",
            envelope.algorithm
        )));
    }
    if envelope.kdf != KDF_PBKDF2_SHA256 {
        return Err(CryptoError::Validation(format!(
            "unsupported kdf: {}",
            envelope.kdf
        )));
    }
    if envelope.iterations == 0 || envelope.iterations > MAX_PBKDF2_ITERATIONS {
        return Err(CryptoError::Validation(format!(
            "iteration count must be between 1 and {MAX_PBKDF2_ITERATIONS}, got {}",
            envelope.iterations
        )));
    }

    let salt = b64_decode_fixed::<SALT_SIZE>("salt", &envelope.salt)?;
    let iv = b64_decode_fixed::<IV_SIZE>("iv", &envelope.iv)?;
    let cipher_text = b64_decode("cipherText", &envelope.cipher_text)?;
    if cipher_text.len() < TAG_SIZE {
        return Err(CryptoError::Validation(
            "cipherText is shorter than the authentication tag".to_string(),
        ));
    }

    let key = derive_passphrase_key(passphrase, &salt, envelope.iterations)?;

    cipher_for(&key[..])?
        .decrypt(Nonce::from_slice(&iv), cipher_text.as_slice())
        .map(Zeroizing::new)
        .map_err(|_| {
            CryptoError::Decryption("wrong passphrase or tampered envelope".to_string())
        })
}

/// Seals `plaintext` under the escrow key, keeping the tag separate.
pub fn seal_with_key(plaintext: &[u8], key: &EscrowKey) -> CryptoResult<KeyedEnvelope> {
    let iv = random_iv();
    let mut buffer = plaintext.to_vec();

    let tag = cipher_for(key.as_bytes())?
        .encrypt_in_place_detached(Nonce::from_slice(&iv), b"", &mut buffer)
        .map_err(|e| CryptoError::Encryption(format!("fragment seal failed: {e}")))?;

    Ok(KeyedEnvelope {
        cipher_text: b64_encode(&buffer),
        iv: b64_encode(&iv),
        auth_tag: b64_encode(tag.as_slice()),
    })
}

/// Opens a fragment sealed with [`seal_with_key`]. Fails closed on a bad tag.
pub fn open_with_key(envelope: &KeyedEnvelope, key: &EscrowKey) -> CryptoResult<Zeroizing<Vec<u8>>> {
    let iv = b64_decode_fixed::<IV_SIZE>("iv", &envelope.iv)?;
    let tag = b64_decode_fixed::<TAG_SIZE>("authTag", &envelope.auth_tag)?;
    let mut buffer = Zeroizing::new(b64_decode("cipherText", &envelope.cipher_text)?);

    cipher_for(key.as_bytes())?
        .decrypt_in_place_detached(
            Nonce::from_slice(&iv),
            b"",
            &mut buffer,
            Tag::from_slice(&tag),
        )
        .map_err(|_| {
            CryptoError::Decryption("wrong escrow key or tampered fragment".to_string())
        })?;

    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keyed_envelope_fields_have_expected_sizes() {
        let key = EscrowKey::generate();
        let envelope = seal_with_key(b"share-payload", &key).unwrap();

        assert_eq!(b64_decode("iv", &envelope.iv).unwrap().len(), IV_SIZE);
        assert_eq!(b64_decode("authTag", &envelope.auth_tag).unwrap().len(), TAG_SIZE);
        assert_eq!(
            b64_decode("cipherText", &envelope.cipher_text).unwrap().len(),
            b"share-payload".len()
        );
    }

    #[test]
    fn passphrase_envelope_labels() {
        let envelope = seal_with_passphrase(b"master", "pw").unwrap();
        assert_eq!(envelope.algorithm, "AES-GCM");
        assert_eq!(envelope.kdf, "PBKDF2-SHA256");
        assert_eq!(envelope.iterations, 210_000);
        assert_eq!(b64_decode("salt", &envelope.salt).unwrap().len(), SALT_SIZE);
        assert_eq!(
            b64_decode("cipherText", &envelope.cipher_text).unwrap().len(),
            b"master".len() + TAG_SIZE
        );
    }

    #[test]
    fn truncated_iv_is_rejected_before_decrypting() {
        let key = EscrowKey::generate();
        let mut envelope = seal_with_key(b"x", &key).unwrap();
        envelope.iv = b64_encode(&[0u8; 8]);
        assert!(matches!(open_with_key(&envelope, &key), Err(CryptoError::Validation(_))));
    }
}
