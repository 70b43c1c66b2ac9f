//! [`Crypto`]: the handle through which every component reaches the process key.

use std::sync::{Arc, OnceLock};

use super::{cipher, hash, CryptoError, Envelope, KEY_LEN};

/// Fixed-size key buffer that holds exactly [`KEY_LEN`] bytes.
///
/// When this type is dropped, the memory is overwritten with zeroes.
pub struct EncryptionKey(Box<[u8; KEY_LEN]>);

impl EncryptionKey {
    /// Parse a 64-character hex string into a key.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::Configuration`] if `key_hex` is empty, not valid
    /// hex, or does not decode to exactly [`KEY_LEN`] bytes.
    pub fn from_hex(key_hex: &str) -> Result<Self, CryptoError> {
        if key_hex.is_empty() {
            return Err(CryptoError::Configuration(
                "encryption key is not set".into(),
            ));
        }
        let mut raw = hex::decode(key_hex.trim()).map_err(|e| {
            CryptoError::Configuration(format!("encryption key must be a valid hex string: {e}"))
        })?;
        if raw.len() != KEY_LEN {
            raw.iter_mut().for_each(|b| *b = 0);
            return Err(CryptoError::Configuration(format!(
                "encryption key must be {KEY_LEN} bytes ({} hex characters) for AES-256",
                KEY_LEN * 2
            )));
        }
        let mut buf = Box::new([0u8; KEY_LEN]);
        buf.copy_from_slice(&raw);
        raw.iter_mut().for_each(|b| *b = 0);
        Ok(Self(buf))
    }

    /// Raw key bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0[..]
    }
}

impl Drop for EncryptionKey {
    fn drop(&mut self) {
        self.0.iter_mut().for_each(|b| *b = 0);
    }
}

impl std::fmt::Debug for EncryptionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("EncryptionKey([REDACTED])")
    }
}

/// Cloneable handle to the process encryption key.
///
/// The key moves from unset to set exactly once, before the server accepts
/// traffic. After that every clone reads the same immutable key without
/// locking, so the cipher and hash operations are safe to call from any
/// number of concurrent requests.
#[derive(Clone, Debug, Default)]
pub struct Crypto {
    key: Arc<OnceLock<EncryptionKey>>,
}

impl Crypto {
    /// Create a context with no key installed.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a context and install the key from `key_hex` in one step.
    ///
    /// # Errors
    ///
    /// See [`Crypto::initialize`].
    pub fn from_hex(key_hex: &str) -> Result<Self, CryptoError> {
        let crypto = Self::new();
        crypto.initialize(key_hex)?;
        Ok(crypto)
    }

    /// Install the process key.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::Configuration`] if the key is malformed or a key
    /// has already been installed in this context.
    pub fn initialize(&self, key_hex: &str) -> Result<(), CryptoError> {
        let key = EncryptionKey::from_hex(key_hex)?;
        self.key
            .set(key)
            .map_err(|_| CryptoError::Configuration("encryption key already initialized".into()))
    }

    /// Returns `true` once a key has been installed.
    pub fn is_initialized(&self) -> bool {
        self.key.get().is_some()
    }

    /// Borrow the installed key.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::Uninitialized`] before [`Crypto::initialize`].
    pub fn key(&self) -> Result<&EncryptionKey, CryptoError> {
        self.key.get().ok_or(CryptoError::Uninitialized)
    }

    /// Encrypt `plaintext` into an `enc:` envelope.
    ///
    /// The empty string is returned as-is: "no value" never becomes an envelope.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::Uninitialized`] if no key is installed.
    pub fn encrypt(&self, plaintext: &str) -> Result<String, CryptoError> {
        if plaintext.is_empty() {
            return Ok(String::new());
        }
        let key = self.key()?;
        let envelope = cipher::seal(plaintext.as_bytes(), key.as_bytes())?;
        Ok(envelope.to_string_repr())
    }

    /// Decrypt an `enc:` envelope.
    ///
    /// Input without the prefix is legacy plaintext and comes back unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::Format`] for a malformed envelope,
    /// [`CryptoError::Decryption`] when authentication fails, and
    /// [`CryptoError::Uninitialized`] if no key is installed.
    pub fn decrypt(&self, input: &str) -> Result<String, CryptoError> {
        if !Envelope::is_envelope(input) {
            return Ok(input.to_owned());
        }
        let envelope = Envelope::parse(input)?;
        let key = self.key()?;
        let plaintext = cipher::open(&envelope, key.as_bytes())?;
        String::from_utf8(plaintext).map_err(|_| CryptoError::Decryption)
    }

    /// Searchable hash of `input` under the process key.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::Uninitialized`] if no key is installed.
    pub fn hash(&self, input: &str) -> Result<String, CryptoError> {
        if input.is_empty() {
            return Ok(String::new());
        }
        hash::searchable_hash(self.key()?.as_bytes(), input)
    }
}
