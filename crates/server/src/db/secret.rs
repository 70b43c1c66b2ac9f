//! Transparent field types: plaintext in memory, envelopes at rest.
//!
//! Conversion happens only when a [`super::Record`] is encoded to or decoded
//! from its row, through a [`FieldCodec`]. Business logic handles plain
//! strings and never sees an envelope.

use serde::{Serialize, Serializer};

use super::StorageError;
use crate::crypto::{Crypto, CryptoError};

/// Conversion between plaintext and the stored representation of a column.
pub trait FieldCodec: Send + Sync {
    /// Plaintext → stored text. `""` must map to `""`.
    fn encode(&self, plain: &str) -> Result<String, CryptoError>;

    /// Stored text → plaintext. Legacy plaintext passes through unchanged.
    fn decode(&self, stored: &str) -> Result<String, CryptoError>;

    /// Searchable hash written to the companion `*_hash` column.
    fn lookup_hash(&self, plain: &str) -> Result<String, CryptoError>;
}

impl FieldCodec for Crypto {
    fn encode(&self, plain: &str) -> Result<String, CryptoError> {
        self.encrypt(plain)
    }

    fn decode(&self, stored: &str) -> Result<String, CryptoError> {
        self.decrypt(stored)
    }

    fn lookup_hash(&self, plain: &str) -> Result<String, CryptoError> {
        self.hash(plain)
    }
}

/// Location of a field, carried into storage errors.
#[derive(Debug, Clone, Copy)]
pub struct FieldRef<'a> {
    pub table: &'static str,
    pub column: &'static str,
    pub id: &'a str,
}

impl<'a> FieldRef<'a> {
    pub fn new(table: &'static str, column: &'static str, id: &'a str) -> Self {
        Self { table, column, id }
    }

    fn encode_error(self, source: CryptoError) -> StorageError {
        StorageError::Encode {
            table: self.table,
            column: self.column,
            id: self.id.to_owned(),
            source,
        }
    }

    fn decode_error(self, source: CryptoError) -> StorageError {
        StorageError::Decode {
            table: self.table,
            column: self.column,
            id: self.id.to_owned(),
            source,
        }
    }
}

/// A sensitive string held as plaintext in memory.
///
/// Two values are equal when their plaintexts are equal; envelopes never
/// take part in comparisons. `Debug` never prints the value. JSON
/// serialisation emits the plaintext, since API responses are the one place
/// the owner is meant to see it.
#[derive(Clone, Default, PartialEq, Eq, Hash)]
pub struct SecretString(String);

impl SecretString {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_inner(self) -> String {
        self.0
    }

    /// Write path: plaintext → stored text.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Encode`] naming the field; the caller must not
    /// write the row.
    pub fn seal(&self, codec: &dyn FieldCodec, at: FieldRef<'_>) -> Result<String, StorageError> {
        codec.encode(&self.0).map_err(|e| at.encode_error(e))
    }

    /// Read path: stored text → plaintext.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Decode`] naming the field when the stored value
    /// is a malformed envelope or fails authentication.
    pub fn open(stored: &str, codec: &dyn FieldCodec, at: FieldRef<'_>) -> Result<Self, StorageError> {
        codec
            .decode(stored)
            .map(Self)
            .map_err(|e| at.decode_error(e))
    }
}

impl From<&str> for SecretString {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for SecretString {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl std::fmt::Debug for SecretString {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.0.is_empty() {
            f.write_str("SecretString(\"\")")
        } else {
            f.write_str("SecretString([REDACTED])")
        }
    }
}

impl Serialize for SecretString {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

/// A [`SecretString`] paired with its searchable hash.
///
/// The only constructors compute the hash from the plaintext they are given,
/// so a value of this type can never carry a stale hash.
#[derive(Clone, Default)]
pub struct IndexedSecret {
    value: SecretString,
    hash: String,
}

impl IndexedSecret {
    /// Build from plaintext, hashing it under `codec`.
    ///
    /// # Errors
    ///
    /// Returns the codec's error if hashing is not possible (no key installed).
    pub fn new(codec: &dyn FieldCodec, plain: impl Into<String>) -> Result<Self, CryptoError> {
        let value = SecretString::new(plain);
        let hash = codec.lookup_hash(value.as_str())?;
        Ok(Self { value, hash })
    }

    pub fn value(&self) -> &SecretString {
        &self.value
    }

    pub fn as_str(&self) -> &str {
        self.value.as_str()
    }

    pub fn is_empty(&self) -> bool {
        self.value.is_empty()
    }

    /// Hash of the current plaintext.
    pub fn hash(&self) -> &str {
        &self.hash
    }

    /// Write path: returns `(stored value, hash column)`.
    ///
    /// The hash is recomputed from the plaintext being written rather than
    /// copied, so the two columns always describe the same value.
    pub fn seal(
        &self,
        codec: &dyn FieldCodec,
        at: FieldRef<'_>,
        hash_column: &'static str,
    ) -> Result<(String, String), StorageError> {
        let stored = self.value.seal(codec, at)?;
        let hash = codec
            .lookup_hash(self.value.as_str())
            .map_err(|e| FieldRef { column: hash_column, ..at }.encode_error(e))?;
        Ok((stored, hash))
    }

    /// Read path: opens the value and recomputes its hash.
    ///
    /// A stale or missing hash column in a legacy row does not leak into the
    /// in-memory value; the next write repairs the column.
    pub fn open(
        stored: &str,
        codec: &dyn FieldCodec,
        at: FieldRef<'_>,
        hash_column: &'static str,
    ) -> Result<Self, StorageError> {
        let value = SecretString::open(stored, codec, at)?;
        let hash = codec
            .lookup_hash(value.as_str())
            .map_err(|e| FieldRef { column: hash_column, ..at }.decode_error(e))?;
        Ok(Self { value, hash })
    }
}

impl PartialEq for IndexedSecret {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}

impl Eq for IndexedSecret {}

impl std::fmt::Debug for IndexedSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IndexedSecret")
            .field("value", &self.value)
            .field("hash", &self.hash)
            .finish()
    }
}

impl Serialize for IndexedSecret {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.value.serialize(serializer)
    }
}
