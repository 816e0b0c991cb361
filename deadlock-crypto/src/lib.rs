//! Cryptographic core for DEADLOCK.
//!
//! Provides the three primitives the escrow protocol is built on:
//! - GF(256) field arithmetic ([`gf256`])
//! - Threshold secret splitting and reconstruction ([`shamir`])
//! - AES-256-GCM envelopes, passphrase-derived and fixed-key ([`envelope`])
//!
//! # Architecture
//!
//! The owner's master secret never reaches the server in the clear:
//!
//! 1. **Client side**: the secret is protected at rest with a
//!    [`PassphraseEnvelope`] and split into `n` [`Share`]s.
//! 2. **Server side**: every share is sealed into a [`KeyedEnvelope`] under
//!    the operator's [`EscrowKey`] and released only when the vault's
//!    lifecycle allows it.
//!
//! Recovering the secret requires `k` released shares and [`combine`].

mod encoding;
pub mod envelope;
mod error;
pub mod gf256;
pub mod key;
pub mod shamir;

pub use envelope::{
    open_with_key, open_with_passphrase, seal_with_key, seal_with_passphrase, KeyedEnvelope,
    PassphraseEnvelope, IV_SIZE, TAG_SIZE,
};
pub use error::{CryptoError, CryptoResult};
pub use key::{
    derive_passphrase_key, EscrowKey, ESCROW_KEY_ENV, KEY_SIZE, MAX_PBKDF2_ITERATIONS,
    PBKDF2_ITERATIONS, SALT_SIZE,
};
pub use shamir::{combine, split, split_with_rng, Share, MAX_SHARES, MIN_SHARES};
