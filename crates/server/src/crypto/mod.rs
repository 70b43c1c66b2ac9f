//! Field-level encryption primitives.
//!
//! This module is intentionally free of storage and HTTP dependencies. It
//! provides the cipher, the searchable hash, and the [`Crypto`] context that
//! carries the process key into both.
//!
//! # Ciphertext format
//!
//! ```text
//! enc:<hex(nonce)>:<hex(ciphertext+tag)>
//! ```
//!
//! AES-256-GCM, 12-byte nonce, 16-byte tag, no associated data. The envelope
//! carries no key version, so rotating the key requires re-encrypting every
//! row under the new key in one go.

pub mod cipher;
pub mod hash;
pub mod key;

pub use cipher::{Envelope, KEY_LEN};
pub use key::{Crypto, EncryptionKey};

use thiserror::Error;

/// Errors produced by the crypto layer.
#[derive(Debug, Error)]
pub enum CryptoError {
    /// The key is missing, not hex, or not [`KEY_LEN`] bytes. Fatal at startup.
    #[error("invalid encryption configuration: {0}")]
    Configuration(String),

    /// The context was used before a key was installed.
    #[error("encryption key not initialized")]
    Uninitialized,

    /// The value carries the envelope prefix but is not a well-formed envelope.
    #[error("malformed envelope: {0}")]
    Format(&'static str),

    /// AEAD authentication failed: wrong key, truncated, or tampered data.
    #[error("decryption failed")]
    Decryption,

    /// The AEAD refused to seal (unreachable with a valid key).
    #[error("encryption failed")]
    Encryption,
}
