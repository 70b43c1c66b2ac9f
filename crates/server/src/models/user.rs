use aes_gcm::aead::{rand_core::RngCore, OsRng};
use serde::Serialize;

use crate::crypto::CryptoError;
use crate::db::{
    rows::UserRow, FieldCodec, FieldRef, IndexedSecret, Record, SecretString, StorageError,
    Timestamps,
};

/// Palette members are coloured from, so their transactions are easy to tell apart.
pub const USER_COLORS: [&str; 10] = [
    "#EF4444", // red
    "#F59E0B", // amber
    "#10B981", // emerald
    "#3B82F6", // blue
    "#6366F1", // indigo
    "#8B5CF6", // violet
    "#EC4899", // pink
    "#06B6D4", // cyan
    "#F97316", // orange
    "#84CC16", // lime
];

pub fn random_color() -> String {
    let idx = OsRng.next_u32() as usize % USER_COLORS.len();
    USER_COLORS[idx].to_owned()
}

/// A household member who has logged in at least once.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct User {
    pub id: String,
    pub household_id: String,
    pub email: IndexedSecret,
    pub name: SecretString,
    #[serde(skip)]
    pub google_id: String,
    pub picture_url: String,
    pub color: String,
    #[serde(flatten)]
    pub timestamps: Timestamps,
}

impl User {
    /// Build a new member; the email hash is computed here.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::Uninitialized`] if the codec has no key.
    pub fn new(
        codec: &dyn FieldCodec,
        id: impl Into<String>,
        household_id: impl Into<String>,
        email: &str,
        name: &str,
    ) -> Result<Self, CryptoError> {
        Ok(Self {
            id: id.into(),
            household_id: household_id.into(),
            email: IndexedSecret::new(codec, email)?,
            name: SecretString::new(name),
            google_id: String::new(),
            picture_url: String::new(),
            color: String::new(),
            timestamps: Timestamps::default(),
        })
    }

    pub fn set_email(&mut self, codec: &dyn FieldCodec, email: &str) -> Result<(), CryptoError> {
        self.email = IndexedSecret::new(codec, email)?;
        Ok(())
    }

    pub fn is_deleted(&self) -> bool {
        self.timestamps.is_deleted()
    }
}

impl Record for User {
    type Row = UserRow;

    fn id(&self) -> &str {
        &self.id
    }

    fn timestamps_mut(&mut self) -> &mut Timestamps {
        &mut self.timestamps
    }

    fn to_row(&self, codec: &dyn FieldCodec) -> Result<UserRow, StorageError> {
        let id = self.id.as_str();
        let at = |column| FieldRef::new(Self::TABLE, column, id);
        let (email, email_hash) = self.email.seal(codec, at("email"), "email_hash")?;
        Ok(UserRow {
            id: self.id.clone(),
            household_id: self.household_id.clone(),
            email,
            email_hash,
            name: self.name.seal(codec, at("name"))?,
            google_id: self.google_id.clone(),
            picture_url: self.picture_url.clone(),
            color: self.color.clone(),
            timestamps: self.timestamps.clone(),
        })
    }

    fn from_row(row: &UserRow, codec: &dyn FieldCodec) -> Result<Self, StorageError> {
        let id = row.id.as_str();
        let at = |column| FieldRef::new(Self::TABLE, column, id);
        Ok(Self {
            id: row.id.clone(),
            household_id: row.household_id.clone(),
            email: IndexedSecret::open(&row.email, codec, at("email"), "email_hash")?,
            name: SecretString::open(&row.name, codec, at("name"))?,
            google_id: row.google_id.clone(),
            picture_url: row.picture_url.clone(),
            color: row.color.clone(),
            timestamps: row.timestamps.clone(),
        })
    }
}
