use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::crypto::CryptoError;
use crate::db::{
    rows::TransactionRow, FieldCodec, FieldRef, IndexedSecret, Record, StorageError, Timestamps,
};

use super::User;

/// The member who recorded a transaction, as shown next to it in the app.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransactionUser {
    pub id: String,
    pub name: String,
    pub color: String,
    pub picture_url: String,
}

impl From<&User> for TransactionUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.clone(),
            name: user.name.as_str().to_owned(),
            color: user.color.clone(),
            picture_url: user.picture_url.clone(),
        }
    }
}

/// A single expense.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Transaction {
    pub id: String,
    pub household_id: String,
    pub account_id: String,
    pub category_id: String,
    pub user_id: String,
    pub amount: f64,
    pub date: DateTime<Utc>,
    /// Free text. Hashed so identical notes can be grouped into suggestions.
    pub note: IndexedSecret,
    #[serde(flatten)]
    pub timestamps: Timestamps,
    /// Filled in by the repository on reads; never stored.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<TransactionUser>,
}

impl Transaction {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        codec: &dyn FieldCodec,
        id: impl Into<String>,
        household_id: impl Into<String>,
        account_id: impl Into<String>,
        category_id: impl Into<String>,
        user_id: impl Into<String>,
        amount: f64,
        date: DateTime<Utc>,
        note: &str,
    ) -> Result<Self, CryptoError> {
        Ok(Self {
            id: id.into(),
            household_id: household_id.into(),
            account_id: account_id.into(),
            category_id: category_id.into(),
            user_id: user_id.into(),
            amount,
            date,
            note: IndexedSecret::new(codec, note)?,
            timestamps: Timestamps::default(),
            user: None,
        })
    }

    pub fn set_note(&mut self, codec: &dyn FieldCodec, note: &str) -> Result<(), CryptoError> {
        self.note = IndexedSecret::new(codec, note)?;
        Ok(())
    }
}

impl Record for Transaction {
    type Row = TransactionRow;

    fn id(&self) -> &str {
        &self.id
    }

    fn timestamps_mut(&mut self) -> &mut Timestamps {
        &mut self.timestamps
    }

    fn to_row(&self, codec: &dyn FieldCodec) -> Result<TransactionRow, StorageError> {
        let (note, note_hash) = self.note.seal(
            codec,
            FieldRef::new(Self::TABLE, "note", &self.id),
            "note_hash",
        )?;
        Ok(TransactionRow {
            id: self.id.clone(),
            household_id: self.household_id.clone(),
            account_id: self.account_id.clone(),
            category_id: self.category_id.clone(),
            user_id: self.user_id.clone(),
            amount: self.amount,
            date: self.date,
            note,
            note_hash,
            timestamps: self.timestamps.clone(),
        })
    }

    fn from_row(row: &TransactionRow, codec: &dyn FieldCodec) -> Result<Self, StorageError> {
        Ok(Self {
            id: row.id.clone(),
            household_id: row.household_id.clone(),
            account_id: row.account_id.clone(),
            category_id: row.category_id.clone(),
            user_id: row.user_id.clone(),
            amount: row.amount,
            date: row.date,
            note: IndexedSecret::open(
                &row.note,
                codec,
                FieldRef::new(Self::TABLE, "note", &row.id),
                "note_hash",
            )?,
            timestamps: row.timestamps.clone(),
            user: None,
        })
    }
}
