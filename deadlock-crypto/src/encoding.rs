//! Base64 helpers shared by share and envelope records.

use crate::error::{CryptoError, CryptoResult};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;

pub(crate) fn b64_encode(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

/// Decodes a base64 field, naming the field in the error.
pub(crate) fn b64_decode(field: &str, value: &str) -> CryptoResult<Vec<u8>> {
    STANDARD
        .decode(value.trim())
        .map_err(|e| CryptoError::Encoding(format!("{field} is not valid base64: {e}")))
}

/// Decodes a base64 field that must have an exact length.
pub(crate) fn b64_decode_fixed<const N: usize>(field: &str, value: &str) -> CryptoResult<[u8; N]> {
    let bytes = b64_decode(field, value)?;
    <[u8; N]>::try_from(bytes.as_slice()).map_err(|_| {
        CryptoError::Validation(format!(
            "{field} must be {N} bytes, got {}",
            bytes.len()
        ))
    })
}

/// Serde adapter storing `Vec<u8>` as a base64 string.
pub(crate) mod base64_bytes {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD
            .decode(encoded.trim())
            .map_err(serde::de::Error::custom)
    }
}
