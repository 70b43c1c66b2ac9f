use std::str::FromStr;

use aes_gcm::aead::{rand_core::RngCore, OsRng};
use serde::{Deserialize, Serialize};

use crate::crypto::CryptoError;
use crate::db::{
    rows::InvitationRow, FieldCodec, FieldRef, IndexedSecret, Record, StorageError, Timestamps,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvitationStatus {
    Pending,
    Accepted,
}

impl InvitationStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            InvitationStatus::Pending => "pending",
            InvitationStatus::Accepted => "accepted",
        }
    }
}

impl FromStr for InvitationStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(InvitationStatus::Pending),
            "accepted" => Ok(InvitationStatus::Accepted),
            other => Err(format!("unknown invitation status: {other}")),
        }
    }
}

/// An emailed invitation to join a household.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Invitation {
    pub id: String,
    pub household_id: String,
    /// Six lowercase hex characters, typed in at login.
    pub code: String,
    pub email: IndexedSecret,
    pub status: InvitationStatus,
    #[serde(flatten)]
    pub timestamps: Timestamps,
}

impl Invitation {
    /// New pending invitation with a freshly generated code.
    pub fn new(
        codec: &dyn FieldCodec,
        id: impl Into<String>,
        household_id: impl Into<String>,
        email: &str,
    ) -> Result<Self, CryptoError> {
        Ok(Self {
            id: id.into(),
            household_id: household_id.into(),
            code: generate_code(),
            email: IndexedSecret::new(codec, email)?,
            status: InvitationStatus::Pending,
            timestamps: Timestamps::default(),
        })
    }

    pub fn is_pending(&self) -> bool {
        self.status == InvitationStatus::Pending
    }

    pub fn accept(&mut self) {
        self.status = InvitationStatus::Accepted;
    }
}

/// 3 random bytes, hex encoded.
pub fn generate_code() -> String {
    let mut b = [0u8; 3];
    OsRng.fill_bytes(&mut b);
    hex::encode(b)
}

impl Record for Invitation {
    type Row = InvitationRow;

    fn id(&self) -> &str {
        &self.id
    }

    fn timestamps_mut(&mut self) -> &mut Timestamps {
        &mut self.timestamps
    }

    fn to_row(&self, codec: &dyn FieldCodec) -> Result<InvitationRow, StorageError> {
        let (email, email_hash) = self.email.seal(
            codec,
            FieldRef::new(Self::TABLE, "email", &self.id),
            "email_hash",
        )?;
        Ok(InvitationRow {
            id: self.id.clone(),
            household_id: self.household_id.clone(),
            code: self.code.clone(),
            email,
            email_hash,
            status: self.status,
            timestamps: self.timestamps.clone(),
        })
    }

    fn from_row(row: &InvitationRow, codec: &dyn FieldCodec) -> Result<Self, StorageError> {
        Ok(Self {
            id: row.id.clone(),
            household_id: row.household_id.clone(),
            code: row.code.clone(),
            email: IndexedSecret::open(
                &row.email,
                codec,
                FieldRef::new(Self::TABLE, "email", &row.id),
                "email_hash",
            )?,
            status: row.status,
            timestamps: row.timestamps.clone(),
        })
    }
}
