//! AES-256-GCM encryption and decryption of individual string fields.
//!
//! Every call draws a fresh 96-bit nonce from the OS CSPRNG, so sealing the
//! same plaintext twice yields two different envelopes. Equality lookups must
//! go through [`super::hash`], never through envelope comparison.

use aes_gcm::{
    aead::{rand_core::RngCore, Aead, KeyInit, OsRng},
    Aes256Gcm, Nonce,
};

use super::CryptoError;

/// Byte length of an AES-256 key (32 bytes = 256 bits).
pub const KEY_LEN: usize = 32;

/// Byte length of an AES-GCM nonce (12 bytes = 96 bits).
pub const NONCE_LEN: usize = 12;

/// Byte length of the GCM authentication tag appended to the ciphertext.
pub const TAG_LEN: usize = 16;

/// Literal tag that marks a stored value as encrypted.
///
/// Values without it are legacy plaintext and pass through [`open`] untouched.
pub const ENVELOPE_PREFIX: &str = "enc:";

/// A parsed ciphertext envelope.
///
/// The string representation is `enc:<hex(nonce)>:<hex(ciphertext+tag)>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    /// Raw nonce bytes.
    pub nonce: [u8; NONCE_LEN],
    /// Raw ciphertext + authentication tag bytes.
    pub ciphertext: Vec<u8>,
}

impl Envelope {
    /// Encode this value to its canonical string representation.
    pub fn to_string_repr(&self) -> String {
        format!(
            "{}{}:{}",
            ENVELOPE_PREFIX,
            hex::encode(self.nonce),
            hex::encode(&self.ciphertext),
        )
    }

    /// Returns `true` if `s` carries the envelope prefix.
    pub fn is_envelope(s: &str) -> bool {
        s.starts_with(ENVELOPE_PREFIX)
    }

    /// Parse an envelope string back into an [`Envelope`].
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::Format`] if the prefix is missing, the remainder
    /// does not split into exactly two `:`-separated parts, either part is not
    /// hex, or the nonce is not [`NONCE_LEN`] bytes.
    pub fn parse(s: &str) -> Result<Self, CryptoError> {
        let body = s
            .strip_prefix(ENVELOPE_PREFIX)
            .ok_or(CryptoError::Format("missing envelope prefix"))?;

        let parts: Vec<&str> = body.split(':').collect();
        if parts.len() != 2 {
            return Err(CryptoError::Format("invalid encrypted data format"));
        }

        let nonce_bytes =
            hex::decode(parts[0]).map_err(|_| CryptoError::Format("invalid nonce"))?;
        if nonce_bytes.len() != NONCE_LEN {
            return Err(CryptoError::Format("invalid nonce length"));
        }
        let mut nonce = [0u8; NONCE_LEN];
        nonce.copy_from_slice(&nonce_bytes);

        let ciphertext =
            hex::decode(parts[1]).map_err(|_| CryptoError::Format("invalid ciphertext"))?;

        Ok(Self { nonce, ciphertext })
    }
}

/// Seal `plaintext` under `key` with a fresh random nonce and no associated data.
///
/// # Errors
///
/// Returns [`CryptoError::Configuration`] if `key` is not [`KEY_LEN`] bytes.
/// Returns [`CryptoError::Encryption`] on an internal AEAD error (unreachable
/// with a valid key and nonce).
pub fn seal(plaintext: &[u8], key: &[u8]) -> Result<Envelope, CryptoError> {
    let cipher = build_cipher(key)?;

    let mut nonce_bytes = [0u8; NONCE_LEN];
    OsRng.fill_bytes(&mut nonce_bytes);
    let nonce = Nonce::from_slice(&nonce_bytes);

    let ciphertext = cipher
        .encrypt(nonce, plaintext)
        .map_err(|_| CryptoError::Encryption)?;

    Ok(Envelope {
        nonce: nonce_bytes,
        ciphertext,
    })
}

/// Open an [`Envelope`] back to plaintext bytes.
///
/// # Errors
///
/// Returns [`CryptoError::Configuration`] if `key` is not [`KEY_LEN`] bytes.
/// Returns [`CryptoError::Decryption`] if authentication fails (wrong key,
/// truncated or tampered data). No partial plaintext is ever returned.
pub fn open(envelope: &Envelope, key: &[u8]) -> Result<Vec<u8>, CryptoError> {
    let cipher = build_cipher(key)?;
    let nonce = Nonce::from_slice(&envelope.nonce);
    cipher
        .decrypt(nonce, envelope.ciphertext.as_ref())
        .map_err(|_| CryptoError::Decryption)
}

fn build_cipher(key: &[u8]) -> Result<Aes256Gcm, CryptoError> {
    if key.len() != KEY_LEN {
        return Err(CryptoError::Configuration(format!(
            "encryption key must be {KEY_LEN} bytes, got {}",
            key.len()
        )));
    }
    Aes256Gcm::new_from_slice(key)
        .map_err(|_| CryptoError::Configuration("invalid encryption key".into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn random_key() -> Vec<u8> {
        let mut key = vec![0u8; KEY_LEN];
        OsRng.fill_bytes(&mut key);
        key
    }

    #[test]
    fn seal_open_round_trip() {
        let key = random_key();
        let envelope = seal(b"Hola Keda!", &key).unwrap();
        assert_eq!(envelope.ciphertext.len(), b"Hola Keda!".len() + TAG_LEN);
        assert_eq!(open(&envelope, &key).unwrap(), b"Hola Keda!");
    }

    #[test]
    fn wrong_key_fails_open() {
        let envelope = seal(b"secret", &random_key()).unwrap();
        assert!(matches!(
            open(&envelope, &random_key()),
            Err(CryptoError::Decryption)
        ));
    }

    #[test]
    fn invalid_key_length_rejected() {
        assert!(matches!(
            seal(b"x", &[0u8; 16]),
            Err(CryptoError::Configuration(_))
        ));
    }

    #[test]
    fn string_repr_round_trip() {
        let envelope = seal(b"hello", &random_key()).unwrap();
        let s = envelope.to_string_repr();
        assert!(s.starts_with("enc:"));
        assert_eq!(Envelope::parse(&s).unwrap(), envelope);
    }

    #[test]
    fn parse_rejects_missing_separator() {
        assert!(matches!(
            Envelope::parse("enc:00112233445566778899aabb"),
            Err(CryptoError::Format(_))
        ));
    }

    #[test]
    fn parse_rejects_extra_separator() {
        assert!(matches!(
            Envelope::parse("enc:00112233445566778899aabb:00:11"),
            Err(CryptoError::Format(_))
        ));
    }

    #[test]
    fn parse_rejects_bad_hex() {
        assert!(matches!(
            Envelope::parse("enc:zz112233445566778899aabb:00"),
            Err(CryptoError::Format(_))
        ));
        assert!(matches!(
            Envelope::parse("enc:00112233445566778899aabb:not-hex"),
            Err(CryptoError::Format(_))
        ));
    }

    #[test]
    fn parse_rejects_short_nonce() {
        assert!(matches!(
            Envelope::parse("enc:0011:aabbcc"),
            Err(CryptoError::Format(_))
        ));
    }

    #[test]
    fn tampered_ciphertext_fails_auth() {
        let key = random_key();
        let mut envelope = seal(b"tamper me", &key).unwrap();
        envelope.ciphertext[0] ^= 0xFF;
        assert!(matches!(open(&envelope, &key), Err(CryptoError::Decryption)));
    }

    #[test]
    fn truncated_ciphertext_fails_auth() {
        let key = random_key();
        let mut envelope = seal(b"truncate me", &key).unwrap();
        envelope.ciphertext.truncate(envelope.ciphertext.len() - 1);
        assert!(matches!(open(&envelope, &key), Err(CryptoError::Decryption)));
    }

    #[test]
    fn opens_gcm_reference_vector() {
        // AES-256-GCM reference case: zero key, zero IV, 16 zero bytes of plaintext.
        let envelope = Envelope::parse(
            "enc:000000000000000000000000:\
             cea7403d4d606b6e074ec5d3baf39d18d0d1c8a799996bf0265b98b5d48ab919",
        )
        .unwrap();
        let plaintext = open(&envelope, &[0u8; KEY_LEN]).unwrap();
        assert_eq!(plaintext, vec![0u8; 16]);
    }
}
