//! Keyed, normalised digests for equality lookups over encrypted columns.

use hmac::{Hmac, Mac};
use sha2::Sha256;

use super::CryptoError;

type HmacSha256 = Hmac<Sha256>;

/// Length of a searchable hash in hex characters (HMAC-SHA256 output).
pub const HASH_HEX_LEN: usize = 64;

/// Canonical form fed to the MAC: surrounding whitespace trimmed, lower-cased.
pub fn normalize(input: &str) -> String {
    input.trim().to_lowercase()
}

/// Compute `hex(HMAC-SHA256(key, normalize(input)))`.
///
/// The empty string maps to the empty string so that absent data never
/// produces a digest. Any other input, including whitespace-only input that
/// normalises to `""`, yields a full [`HASH_HEX_LEN`]-character digest.
///
/// # Errors
///
/// Returns [`CryptoError::Configuration`] if the MAC rejects the key.
pub fn searchable_hash(key: &[u8], input: &str) -> Result<String, CryptoError> {
    if input.is_empty() {
        return Ok(String::new());
    }

    let mut mac = HmacSha256::new_from_slice(key)
        .map_err(|_| CryptoError::Configuration("invalid hash key".into()))?;
    mac.update(normalize(input).as_bytes());

    Ok(hex::encode(mac.finalize().into_bytes()))
}
