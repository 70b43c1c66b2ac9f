//! Stored shape of every table.
//!
//! Columns documented as *encrypted* hold `enc:` envelopes (or the empty
//! string). Legacy rows written before encryption was introduced may still
//! hold plaintext there until the migration rewrites them. `*_hash` columns
//! are plain and used for exact-match lookups.
//!
//! Field names match column names; `stored_row!` derives the column list,
//! the binding order and the `SELECT` mapping from them.

use chrono::{DateTime, Utc};
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use rusqlite::Row;

use super::{StoredRow, Timestamps};
use crate::models::{AccountKind, InvitationStatus};

#[derive(Debug, Clone)]
pub struct HouseholdRow {
    pub id: String,
    /// Encrypted.
    pub name: String,
    pub timestamps: Timestamps,
}

#[derive(Debug, Clone)]
pub struct UserRow {
    pub id: String,
    pub household_id: String,
    /// Encrypted.
    pub email: String,
    pub email_hash: String,
    /// Encrypted.
    pub name: String,
    pub google_id: String,
    pub picture_url: String,
    pub color: String,
    pub timestamps: Timestamps,
}

#[derive(Debug, Clone)]
pub struct InvitationRow {
    pub id: String,
    pub household_id: String,
    pub code: String,
    /// Encrypted.
    pub email: String,
    pub email_hash: String,
    pub status: InvitationStatus,
    pub timestamps: Timestamps,
}

#[derive(Debug, Clone)]
pub struct AccountRow {
    pub id: String,
    pub household_id: String,
    pub kind: AccountKind,
    /// Encrypted.
    pub name: String,
    pub brand: Option<String>,
    pub bank: Option<String>,
    pub timestamps: Timestamps,
}

#[derive(Debug, Clone)]
pub struct CategoryRow {
    pub id: String,
    pub household_id: String,
    /// Encrypted.
    pub name: String,
    pub monthly_budget: f64,
    pub is_active: bool,
    pub timestamps: Timestamps,
}

#[derive(Debug, Clone)]
pub struct TransactionRow {
    pub id: String,
    pub household_id: String,
    pub account_id: String,
    pub category_id: String,
    pub user_id: String,
    pub amount: f64,
    pub date: DateTime<Utc>,
    /// Encrypted.
    pub note: String,
    pub note_hash: String,
    pub timestamps: Timestamps,
}

macro_rules! stored_row {
    ($row:ident in $table:literal, $scope:ident { $($field:ident),+ $(,)? }) => {
        impl StoredRow for $row {
            const TABLE: &'static str = $table;
            const COLUMNS: &'static [&'static str] =
                &[$(stringify!($field),)+ "created_at", "updated_at", "deleted_at"];

            fn id(&self) -> &str {
                &self.id
            }
            fn household_id(&self) -> Option<&str> {
                stored_row!(@household self, $scope)
            }
            fn timestamps(&self) -> &Timestamps {
                &self.timestamps
            }
            fn timestamps_mut(&mut self) -> &mut Timestamps {
                &mut self.timestamps
            }
            fn from_sql(row: &Row<'_>) -> rusqlite::Result<Self> {
                Ok(Self {
                    $($field: row.get(stringify!($field))?,)+
                    timestamps: Timestamps::from_sql(row)?,
                })
            }
            fn values(&self) -> Vec<&dyn ToSql> {
                let mut values: Vec<&dyn ToSql> = vec![$(&self.$field as &dyn ToSql),+];
                values.extend(self.timestamps.values());
                values
            }
        }
    };
    (@household $self:ident, global) => {
        None
    };
    (@household $self:ident, scoped) => {
        Some(&$self.household_id)
    };
}

stored_row!(HouseholdRow in "households", global { id, name });
stored_row!(UserRow in "users", scoped {
    id, household_id, email, email_hash, name, google_id, picture_url, color,
});
stored_row!(InvitationRow in "invitations", scoped {
    id, household_id, code, email, email_hash, status,
});
stored_row!(AccountRow in "accounts", scoped {
    id, household_id, kind, name, brand, bank,
});
stored_row!(CategoryRow in "categories", scoped {
    id, household_id, name, monthly_budget, is_active,
});
stored_row!(TransactionRow in "transactions", scoped {
    id, household_id, account_id, category_id, user_id, amount, date, note, note_hash,
});

impl ToSql for AccountKind {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(self.as_str().into())
    }
}

impl FromSql for AccountKind {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|e: String| FromSqlError::Other(e.into()))
    }
}

impl ToSql for InvitationStatus {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(self.as_str().into())
    }
}

impl FromSql for InvitationStatus {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|e: String| FromSqlError::Other(e.into()))
    }
}
