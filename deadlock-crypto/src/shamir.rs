//! Threshold secret splitting over GF(256).
//!
//! Each byte of the secret gets its own random polynomial of degree `k - 1`
//! whose constant term is that byte. Share `i` holds the evaluations at
//! `x = i` for `i` in `1..=n`; `x = 0` is never handed out. Any `k` shares
//! determine every polynomial uniquely, any `k - 1` reveal nothing about the
//! secret.
//!
//! The engine is fully general (`2 <= k <= n <= 255`). Business rules such as
//! "exactly 3-of-3" belong to the escrow layer.

use crate::encoding::{b64_decode, b64_encode, base64_bytes};
use crate::error::{CryptoError, CryptoResult};
use crate::gf256;
use rand::{CryptoRng, RngCore};
use serde::{Deserialize, Serialize};
use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

/// Smallest meaningful threshold and share count.
pub const MIN_SHARES: usize = 2;
/// Share ids are nonzero field elements, so at most 255 shares exist.
pub const MAX_SHARES: usize = 255;

/// Bytes preceding the payload in [`Share::encode`]: id, threshold, total.
const ENCODED_HEADER_LEN: usize = 3;

/// One fragment of a split secret. The payload is wiped on drop.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Share {
    /// Evaluation point, `1..=total_shares`.
    pub id: u8,
    /// Number of shares needed to reconstruct (`k`).
    pub threshold: u8,
    /// Number of shares produced by the split (`n`).
    pub total_shares: u8,
    #[serde(with = "base64_bytes")]
    bytes: Vec<u8>,
}

impl Share {
    /// Builds a share from its parts.
    pub fn new(id: u8, threshold: u8, total_shares: u8, bytes: Vec<u8>) -> Self {
        Self {
            id,
            threshold,
            total_shares,
            bytes,
        }
    }

    /// Share payload, one byte per secret byte.
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Payload length, equal to the secret length.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Compact text form: base64 of `[id, threshold, total, payload..]`.
    ///
    /// This is the opaque string a client hands to the escrow service.
    pub fn encode(&self) -> String {
        let mut raw = Zeroizing::new(Vec::with_capacity(ENCODED_HEADER_LEN + self.bytes.len()));
        raw.extend_from_slice(&[self.id, self.threshold, self.total_shares]);
        raw.extend_from_slice(&self.bytes);
        b64_encode(&raw)
    }

    /// Parses the form produced by [`Share::encode`].
    pub fn decode(encoded: &str) -> CryptoResult<Self> {
        let raw = Zeroizing::new(b64_decode("share", encoded)?);
        if raw.len() <= ENCODED_HEADER_LEN {
            return Err(CryptoError::Validation(
                "encoded share is too short".to_string(),
            ));
        }

        let (id, threshold, total_shares) = (raw[0], raw[1], raw[2]);
        if id == 0 || id > total_shares {
            return Err(CryptoError::Validation(format!(
                "share id {id} outside 1..={total_shares}"
            )));
        }
        validate_parameters(usize::from(total_shares), usize::from(threshold))?;

        Ok(Self::new(
            id,
            threshold,
            total_shares,
            raw[ENCODED_HEADER_LEN..].to_vec(),
        ))
    }
}

impl fmt::Debug for Share {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Share")
            .field("id", &self.id)
            .field("threshold", &self.threshold)
            .field("total_shares", &self.total_shares)
            .field("len", &self.bytes.len())
            .finish()
    }
}

fn validate_parameters(total_shares: usize, threshold: usize) -> CryptoResult<()> {
    if !(MIN_SHARES..=MAX_SHARES).contains(&total_shares) {
        return Err(CryptoError::Validation(format!(
            "total shares must be between {MIN_SHARES} and {MAX_SHARES}, got {total_shares}"
        )));
    }
    if threshold < MIN_SHARES || threshold > total_shares {
        return Err(CryptoError::Validation(format!(
            "threshold must be between {MIN_SHARES} and {total_shares}, got {threshold}"
        )));
    }
    Ok(())
}

/// Splits `secret` into `total_shares` shares, any `threshold` of which
/// reconstruct it. Coefficients come from the thread-local CSPRNG.
pub fn split(secret: &[u8], total_shares: usize, threshold: usize) -> CryptoResult<Vec<Share>> {
    split_with_rng(secret, total_shares, threshold, &mut rand::rng())
}

/// Same as [`split`] with a caller-provided cryptographic RNG.
pub fn split_with_rng<R>(
    secret: &[u8],
    total_shares: usize,
    threshold: usize,
    rng: &mut R,
) -> CryptoResult<Vec<Share>>
where
    R: CryptoRng + ?Sized,
{
    validate_parameters(total_shares, threshold)?;
    if secret.is_empty() {
        return Err(CryptoError::Validation("secret must not be empty".to_string()));
    }

    // Both fit in u8 after validation.
    let n = total_shares as u8;
    let k = threshold as u8;

    let mut shares: Vec<Share> = (1..=n)
        .map(|id| Share::new(id, k, n, Vec::with_capacity(secret.len())))
        .collect();

    let mut coefficients = Zeroizing::new(vec![0u8; threshold]);
    for &secret_byte in secret {
        coefficients[0] = secret_byte;
        rng.fill_bytes(&mut coefficients[1..]);

        for share in shares.iter_mut() {
            share.bytes.push(evaluate(&coefficients, share.id));
        }
    }

    Ok(shares)
}

/// Horner evaluation of `c0 + c1*x + ... + c(k-1)*x^(k-1)`.
fn evaluate(coefficients: &[u8], x: u8) -> u8 {
    coefficients
        .iter()
        .rev()
        .fold(0u8, |acc, &c| gf256::add(gf256::mul(acc, x), c))
}

/// Reconstructs the secret from at least `threshold` shares.
///
/// Only the first `threshold` shares are used; which subset is supplied does
/// not change the result.
pub fn combine(shares: &[Share]) -> CryptoResult<Vec<u8>> {
    let first = shares
        .first()
        .ok_or_else(|| CryptoError::Validation("at least one share is required".to_string()))?;

    let threshold = usize::from(first.threshold);
    let len = first.bytes.len();

    let mut seen = [false; 256];
    for share in shares {
        if share.id == 0 {
            return Err(CryptoError::Validation("share id 0 is not valid".to_string()));
        }
        if share.threshold != first.threshold {
            return Err(CryptoError::Validation(format!(
                "share {} has threshold {}, expected {}",
                share.id, share.threshold, first.threshold
            )));
        }
        if share.bytes.len() != len {
            return Err(CryptoError::Validation(format!(
                "share {} has length {}, expected {len}",
                share.id,
                share.bytes.len()
            )));
        }
        if std::mem::replace(&mut seen[usize::from(share.id)], true) {
            return Err(CryptoError::Validation(format!(
                "duplicate share id {}",
                share.id
            )));
        }
    }

    if threshold < MIN_SHARES {
        return Err(CryptoError::Validation(format!(
            "threshold must be at least {MIN_SHARES}, got {threshold}"
        )));
    }
    if shares.len() < threshold {
        return Err(CryptoError::Validation(format!(
            "need {threshold} shares, got {}",
            shares.len()
        )));
    }
    if len == 0 {
        return Err(CryptoError::Validation("shares carry no payload".to_string()));
    }

    let subset = &shares[..threshold];
    let weights = lagrange_weights_at_zero(subset)?;

    let secret = (0..len)
        .map(|position| {
            subset
                .iter()
                .zip(weights.iter())
                .fold(0u8, |acc, (share, &weight)| {
                    gf256::add(acc, gf256::mul(share.bytes[position], weight))
                })
        })
        .collect();

    Ok(secret)
}

/// Basis weights `L_i(0) = prod_{j != i} x_j / (x_i - x_j)`; subtraction is XOR.
fn lagrange_weights_at_zero(shares: &[Share]) -> CryptoResult<Vec<u8>> {
    shares
        .iter()
        .map(|si| {
            shares
                .iter()
                .filter(|sj| sj.id != si.id)
                .try_fold(1u8, |acc, sj| {
                    let term = gf256::div(sj.id, gf256::add(si.id, sj.id))?;
                    Ok(gf256::mul(acc, term))
                })
        })
        .collect()
}
