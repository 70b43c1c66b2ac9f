//! Embedded SQLite store and the repository that guards its boundary.
//!
//! # Layout
//!
//! - [`rows`] holds the *stored* shape of every table: sensitive columns are
//!   `enc:` envelopes in `TEXT` columns, companion `*_hash` columns are plain,
//!   indexed lowercase hex.
//! - [`secret`] holds the transparent field types and the [`FieldCodec`] that
//!   converts between plaintext and stored text.
//! - [`repo::Repository`] is the only code that turns rows into entities and
//!   back. Handlers never see a row.
//!
//! # Invariants
//!
//! - No plaintext for an encrypted column is ever written into a row.
//! - Every write recomputes hash columns from the plaintext being written.
//! - Soft-deleted rows (`deleted_at` set) are invisible to normal queries but
//!   are still visited by the encryption migration.

pub mod repo;
pub mod rows;
pub mod secret;

pub use repo::Repository;
pub use secret::{FieldCodec, FieldRef, IndexedSecret, SecretString};

use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Utc};
use rusqlite::types::ToSql;
use rusqlite::{params_from_iter, Connection, OptionalExtension, Params, Row};
use serde::Serialize;
use thiserror::Error;
use tracing::debug;

use crate::crypto::CryptoError;

/// Errors produced by the storage layer.
#[derive(Debug, Error)]
pub enum StorageError {
    /// A field could not be converted to its stored form; nothing was written.
    #[error("failed to encode {table}.{column} for row {id}")]
    Encode {
        table: &'static str,
        column: &'static str,
        id: String,
        #[source]
        source: CryptoError,
    },

    /// A stored value could not be converted back to plaintext.
    #[error("failed to decode {table}.{column} for row {id}")]
    Decode {
        table: &'static str,
        column: &'static str,
        id: String,
        #[source]
        source: CryptoError,
    },

    /// A lookup value could not be hashed.
    #[error("failed to hash lookup value for {table}.{column}")]
    Lookup {
        table: &'static str,
        column: &'static str,
        #[source]
        source: CryptoError,
    },

    /// An insert collided with an existing primary key.
    #[error("{table} row {id} already exists")]
    Duplicate { table: &'static str, id: String },

    /// The addressed row does not exist.
    #[error("{table} row {id} not found")]
    NotFound { table: &'static str, id: String },

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),
}

/// Bookkeeping columns carried by every table.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Timestamps {
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Timestamps {
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    pub(crate) fn from_sql(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
            deleted_at: row.get("deleted_at")?,
        })
    }

    /// `created_at`, `updated_at`, `deleted_at`, in that order.
    pub(crate) fn values(&self) -> [&dyn ToSql; 3] {
        [&self.created_at, &self.updated_at, &self.deleted_at]
    }
}

/// Behaviour shared by every stored row type.
///
/// `COLUMNS` starts with `id` and ends with the [`Timestamps`] columns;
/// [`StoredRow::values`] binds in the same order.
pub trait StoredRow: Sized + Send + Sync + 'static {
    const TABLE: &'static str;

    const COLUMNS: &'static [&'static str];

    fn id(&self) -> &str;

    /// Owning household, for tables scoped to one. Households themselves return `None`.
    fn household_id(&self) -> Option<&str>;

    fn timestamps(&self) -> &Timestamps;

    fn timestamps_mut(&mut self) -> &mut Timestamps;

    fn from_sql(row: &Row<'_>) -> rusqlite::Result<Self>;

    fn values(&self) -> Vec<&dyn ToSql>;

    fn is_live(&self) -> bool {
        !self.timestamps().is_deleted()
    }
}

/// An entity that can be persisted through the [`Repository`].
///
/// `to_row` and `from_row` are the explicit persistence boundary: they are
/// the only place sensitive fields are sealed or opened.
pub trait Record: Sized + Send + Sync {
    type Row: StoredRow;

    /// Table name used in errors and migration reports.
    const TABLE: &'static str = <Self::Row as StoredRow>::TABLE;

    fn id(&self) -> &str;

    fn timestamps_mut(&mut self) -> &mut Timestamps;

    /// Encode into the stored shape, sealing sensitive columns and
    /// recomputing their hash columns.
    fn to_row(&self, codec: &dyn FieldCodec) -> Result<Self::Row, StorageError>;

    /// Decode a stored row, opening sensitive columns.
    fn from_row(row: &Self::Row, codec: &dyn FieldCodec) -> Result<Self, StorageError>;
}

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS households (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    deleted_at TEXT
);

CREATE TABLE IF NOT EXISTS users (
    id TEXT PRIMARY KEY,
    household_id TEXT NOT NULL,
    email TEXT NOT NULL,
    email_hash TEXT NOT NULL DEFAULT '',
    name TEXT NOT NULL,
    google_id TEXT NOT NULL DEFAULT '',
    picture_url TEXT NOT NULL DEFAULT '',
    color TEXT NOT NULL DEFAULT '',
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    deleted_at TEXT
);
CREATE INDEX IF NOT EXISTS idx_users_email_hash ON users(email_hash);
CREATE INDEX IF NOT EXISTS idx_users_household ON users(household_id);

CREATE TABLE IF NOT EXISTS invitations (
    id TEXT PRIMARY KEY,
    household_id TEXT NOT NULL,
    code TEXT NOT NULL,
    email TEXT NOT NULL,
    email_hash TEXT NOT NULL DEFAULT '',
    status TEXT NOT NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    deleted_at TEXT
);
CREATE INDEX IF NOT EXISTS idx_invitations_email_hash ON invitations(email_hash);
CREATE INDEX IF NOT EXISTS idx_invitations_code ON invitations(code);
CREATE INDEX IF NOT EXISTS idx_invitations_household ON invitations(household_id);

CREATE TABLE IF NOT EXISTS accounts (
    id TEXT PRIMARY KEY,
    household_id TEXT NOT NULL,
    kind TEXT NOT NULL,
    name TEXT NOT NULL,
    brand TEXT,
    bank TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    deleted_at TEXT
);
CREATE INDEX IF NOT EXISTS idx_accounts_household ON accounts(household_id);

CREATE TABLE IF NOT EXISTS categories (
    id TEXT PRIMARY KEY,
    household_id TEXT NOT NULL,
    name TEXT NOT NULL,
    monthly_budget REAL NOT NULL DEFAULT 0,
    is_active INTEGER NOT NULL DEFAULT 1,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    deleted_at TEXT
);
CREATE INDEX IF NOT EXISTS idx_categories_household ON categories(household_id);

CREATE TABLE IF NOT EXISTS transactions (
    id TEXT PRIMARY KEY,
    household_id TEXT NOT NULL,
    account_id TEXT NOT NULL,
    category_id TEXT NOT NULL,
    user_id TEXT NOT NULL,
    amount REAL NOT NULL,
    date TEXT NOT NULL,
    note TEXT NOT NULL DEFAULT '',
    note_hash TEXT NOT NULL DEFAULT '',
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    deleted_at TEXT
);
CREATE INDEX IF NOT EXISTS idx_transactions_household_date ON transactions(household_id, date DESC);
CREATE INDEX IF NOT EXISTS idx_transactions_category ON transactions(category_id);
CREATE INDEX IF NOT EXISTS idx_transactions_note_hash ON transactions(note_hash);
"#;

fn initialize_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(SCHEMA)
}

/// Shared handle to the SQLite connection.
///
/// Clones share one connection. Every call locks it for the duration of a
/// single statement (or a short group of them) and never across an `.await`.
#[derive(Clone, Debug)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Open or create the database file at `path` and ensure the schema exists.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let path = path.as_ref();
        let conn = Connection::open(path)?;
        initialize_schema(&conn)?;
        debug!(path = %path.display(), "database opened");
        Ok(Self::from_connection(conn))
    }

    /// A private in-memory database (for tests).
    pub fn open_in_memory() -> Result<Self, StorageError> {
        let conn = Connection::open_in_memory()?;
        initialize_schema(&conn)?;
        Ok(Self::from_connection(conn))
    }

    fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Arc::new(Mutex::new(conn)),
        }
    }

    /// Run `f` with the connection locked.
    ///
    /// A panic while the lock was held cannot leave a statement half-applied,
    /// so a poisoned lock is recovered rather than propagated.
    pub fn with_conn<T>(
        &self,
        f: impl FnOnce(&Connection) -> Result<T, StorageError>,
    ) -> Result<T, StorageError> {
        let conn = self.conn.lock().unwrap_or_else(PoisonError::into_inner);
        f(&conn)
    }

    /// Rows of `R` matching `filter` (a `WHERE`/`ORDER BY` tail), soft-deleted included
    /// unless the filter excludes them.
    pub fn select<R: StoredRow>(
        &self,
        filter: &str,
        params: impl Params,
    ) -> Result<Vec<R>, StorageError> {
        let sql = select_sql::<R>(filter);
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(params, R::from_sql)?
                .collect::<rusqlite::Result<Vec<R>>>()?;
            Ok(rows)
        })
    }

    /// First row of `R` matching `filter`, if any.
    pub fn select_one<R: StoredRow>(
        &self,
        filter: &str,
        params: impl Params,
    ) -> Result<Option<R>, StorageError> {
        let sql = select_sql::<R>(&format!("{filter} LIMIT 1"));
        self.with_conn(|conn| {
            let row = conn.query_row(&sql, params, R::from_sql).optional()?;
            Ok(row)
        })
    }

    /// Row by primary key, soft-deleted included.
    pub fn get<R: StoredRow>(&self, id: &str) -> Result<Option<R>, StorageError> {
        self.select_one("WHERE id = ?1", [id])
    }

    /// Write a row whose id must be free.
    ///
    /// # Errors
    ///
    /// [`StorageError::Duplicate`] if any row, soft-deleted or not, has the id.
    pub fn insert<R: StoredRow>(&self, row: &R) -> Result<(), StorageError> {
        let sql = format!(
            "INSERT OR IGNORE INTO {} ({}) VALUES ({})",
            R::TABLE,
            R::COLUMNS.join(", "),
            placeholders(R::COLUMNS.len()),
        );
        let written = self.with_conn(|conn| Ok(conn.execute(&sql, params_from_iter(row.values()))?))?;
        if written == 0 {
            return Err(StorageError::Duplicate {
                table: R::TABLE,
                id: row.id().to_owned(),
            });
        }
        Ok(())
    }

    /// Overwrite every column of a live row.
    ///
    /// # Errors
    ///
    /// [`StorageError::NotFound`] if the id is absent or soft-deleted.
    pub fn update<R: StoredRow>(&self, row: &R) -> Result<(), StorageError> {
        let assignments = R::COLUMNS
            .iter()
            .enumerate()
            .skip(1)
            .map(|(i, col)| format!("{col} = ?{}", i + 1))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "UPDATE {} SET {assignments} WHERE id = ?1 AND deleted_at IS NULL",
            R::TABLE
        );
        let written = self.with_conn(|conn| Ok(conn.execute(&sql, params_from_iter(row.values()))?))?;
        if written == 0 {
            return Err(StorageError::NotFound {
                table: R::TABLE,
                id: row.id().to_owned(),
            });
        }
        Ok(())
    }

    /// Insert or replace by primary key, whatever is stored.
    pub fn put<R: StoredRow>(&self, row: &R) -> Result<(), StorageError> {
        let sql = format!(
            "INSERT OR REPLACE INTO {} ({}) VALUES ({})",
            R::TABLE,
            R::COLUMNS.join(", "),
            placeholders(R::COLUMNS.len()),
        );
        self.with_conn(|conn| {
            conn.execute(&sql, params_from_iter(row.values()))?;
            Ok(())
        })
    }
}

fn select_sql<R: StoredRow>(filter: &str) -> String {
    format!("SELECT {} FROM {} {filter}", R::COLUMNS.join(", "), R::TABLE)
}

fn placeholders(n: usize) -> String {
    (1..=n).map(|i| format!("?{i}")).collect::<Vec<_>>().join(", ")
}
