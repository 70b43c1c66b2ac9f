//! [`Repository`]: typed access to the store through the field codec.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use rusqlite::params;

use super::rows::{InvitationRow, TransactionRow, UserRow};
use super::{Database, Record, StorageError};
use crate::crypto::Crypto;
use crate::models::{
    new_id, Account, AccountKind, Household, Invitation, InvitationStatus, Transaction,
    TransactionUser, User,
};

/// Half-open `[start, end)` date range.
pub type Period = (DateTime<Utc>, DateTime<Utc>);

/// The persistence boundary.
///
/// Every entity going in is encoded with [`Record::to_row`] and every row
/// coming out is decoded with [`Record::from_row`], both under the one
/// [`Crypto`] context the repository was built with. Sensitive values are
/// only ever searched through their hash columns.
#[derive(Clone, Debug)]
pub struct Repository {
    db: Database,
    crypto: Crypto,
}

impl Repository {
    pub fn new(db: Database, crypto: Crypto) -> Self {
        Self { db, crypto }
    }

    pub fn crypto(&self) -> &Crypto {
        &self.crypto
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    fn decode_all<E: Record>(&self, rows: Vec<E::Row>) -> Result<Vec<E>, StorageError> {
        rows.iter().map(|r| E::from_row(r, &self.crypto)).collect()
    }

    /// Insert a new record, stamping its creation time.
    ///
    /// # Errors
    ///
    /// [`StorageError::Duplicate`] if the id is taken (soft-deleted rows
    /// included), or an encode error, in which case nothing is written.
    pub async fn insert<E: Record>(&self, entity: &mut E) -> Result<(), StorageError> {
        let now = Utc::now();
        let ts = entity.timestamps_mut();
        ts.created_at = now;
        ts.updated_at = now;
        ts.deleted_at = None;
        let row = entity.to_row(&self.crypto)?;
        self.db.insert(&row)
    }

    /// Write back a record that already exists and is not deleted.
    pub async fn update<E: Record>(&self, entity: &mut E) -> Result<(), StorageError> {
        entity.timestamps_mut().updated_at = Utc::now();
        let row = entity.to_row(&self.crypto)?;
        self.db.update(&row)
    }

    /// Insert or replace regardless of what is stored.
    pub async fn upsert<E: Record>(&self, entity: &mut E) -> Result<(), StorageError> {
        let now = Utc::now();
        let ts = entity.timestamps_mut();
        if ts.created_at == DateTime::<Utc>::default() {
            ts.created_at = now;
        }
        ts.updated_at = now;
        let row = entity.to_row(&self.crypto)?;
        self.db.put(&row)
    }

    /// Live record by primary key.
    pub async fn find<E: Record>(&self, id: &str) -> Result<Option<E>, StorageError> {
        let row: Option<E::Row> = self
            .db
            .select_one("WHERE id = ?1 AND deleted_at IS NULL", [id])?;
        row.map(|r| E::from_row(&r, &self.crypto)).transpose()
    }

    /// Live record by primary key, only if it belongs to `household_id`.
    pub async fn find_in_household<E: Record>(
        &self,
        household_id: &str,
        id: &str,
    ) -> Result<Option<E>, StorageError> {
        let row: Option<E::Row> = self.db.select_one(
            "WHERE id = ?1 AND household_id = ?2 AND deleted_at IS NULL",
            [id, household_id],
        )?;
        row.map(|r| E::from_row(&r, &self.crypto)).transpose()
    }

    /// Live records of `household_id`, oldest first.
    pub async fn list_in_household<E: Record>(
        &self,
        household_id: &str,
    ) -> Result<Vec<E>, StorageError> {
        let rows: Vec<E::Row> = self.db.select(
            "WHERE household_id = ?1 AND deleted_at IS NULL ORDER BY created_at, id",
            [household_id],
        )?;
        self.decode_all(rows)
    }

    /// Mark a live record of `household_id` as deleted.
    pub async fn soft_delete<E: Record>(
        &self,
        household_id: &str,
        id: &str,
    ) -> Result<(), StorageError> {
        let sql = format!(
            "UPDATE {} SET deleted_at = ?3, updated_at = ?3 \
             WHERE id = ?1 AND household_id = ?2 AND deleted_at IS NULL",
            E::TABLE
        );
        let now = Utc::now();
        let written = self
            .db
            .with_conn(|conn| Ok(conn.execute(&sql, params![id, household_id, now])?))?;
        if written == 0 {
            return Err(StorageError::NotFound {
                table: E::TABLE,
                id: id.to_owned(),
            });
        }
        Ok(())
    }

    fn lookup_hash(
        &self,
        table: &'static str,
        column: &'static str,
        value: &str,
    ) -> Result<String, StorageError> {
        self.crypto
            .hash(value)
            .map_err(|source| StorageError::Lookup {
                table,
                column,
                source,
            })
    }

    // -----------------------------------------------------------------------
    // Households
    // -----------------------------------------------------------------------

    /// Insert a household together with its mandatory cash account.
    pub async fn create_household(&self, household: &mut Household) -> Result<Account, StorageError> {
        self.insert(household).await?;
        let mut cash = Account::cash(new_id(), household.id.clone());
        self.insert(&mut cash).await?;
        Ok(cash)
    }

    // -----------------------------------------------------------------------
    // Users and invitations (hash lookups)
    // -----------------------------------------------------------------------

    /// User whose email matches case- and whitespace-insensitively.
    ///
    /// Soft-deleted users are returned only when `include_deleted` is set;
    /// a live match is preferred over a deleted one.
    pub async fn find_user_by_email(
        &self,
        email: &str,
        include_deleted: bool,
    ) -> Result<Option<User>, StorageError> {
        if email.trim().is_empty() {
            return Ok(None);
        }
        let hash = self.lookup_hash(User::TABLE, "email_hash", email)?;
        let filter = if include_deleted {
            "WHERE email_hash = ?1 ORDER BY deleted_at IS NOT NULL, created_at"
        } else {
            "WHERE email_hash = ?1 AND deleted_at IS NULL ORDER BY created_at"
        };
        let row: Option<UserRow> = self.db.select_one(filter, [&hash])?;
        row.map(|r| User::from_row(&r, &self.crypto)).transpose()
    }

    pub async fn find_pending_invitation_by_email(
        &self,
        household_id: &str,
        email: &str,
    ) -> Result<Option<Invitation>, StorageError> {
        if email.trim().is_empty() {
            return Ok(None);
        }
        let hash = self.lookup_hash(Invitation::TABLE, "email_hash", email)?;
        let row: Option<InvitationRow> = self.db.select_one(
            "WHERE household_id = ?1 AND email_hash = ?2 AND status = ?3 AND deleted_at IS NULL \
             ORDER BY created_at",
            params![household_id, hash, InvitationStatus::Pending],
        )?;
        row.map(|r| Invitation::from_row(&r, &self.crypto)).transpose()
    }

    /// Pending invitation carrying `code`, in any household.
    pub async fn find_pending_invitation_by_code(
        &self,
        code: &str,
    ) -> Result<Option<Invitation>, StorageError> {
        let code = code.trim().to_ascii_lowercase();
        if code.is_empty() {
            return Ok(None);
        }
        let row: Option<InvitationRow> = self.db.select_one(
            "WHERE code = ?1 AND status = ?2 AND deleted_at IS NULL ORDER BY created_at",
            params![code, InvitationStatus::Pending],
        )?;
        row.map(|r| Invitation::from_row(&r, &self.crypto)).transpose()
    }

    pub async fn pending_invitations(
        &self,
        household_id: &str,
    ) -> Result<Vec<Invitation>, StorageError> {
        let rows: Vec<InvitationRow> = self.db.select(
            "WHERE household_id = ?1 AND status = ?2 AND deleted_at IS NULL ORDER BY created_at, id",
            params![household_id, InvitationStatus::Pending],
        )?;
        self.decode_all(rows)
    }

    // -----------------------------------------------------------------------
    // Accounts
    // -----------------------------------------------------------------------

    pub async fn count_cash_accounts(&self, household_id: &str) -> Result<usize, StorageError> {
        self.db.with_conn(|conn| {
            let count = conn.query_row(
                "SELECT COUNT(*) FROM accounts \
                 WHERE household_id = ?1 AND kind = ?2 AND deleted_at IS NULL",
                params![household_id, AccountKind::Cash],
                |row| row.get(0),
            )?;
            Ok(count)
        })
    }

    // -----------------------------------------------------------------------
    // Transactions
    // -----------------------------------------------------------------------

    /// Transactions of a household, newest first, each with its author attached.
    ///
    /// Ordered by `date` descending, then creation time descending.
    pub async fn transactions(
        &self,
        household_id: &str,
        period: Option<Period>,
    ) -> Result<Vec<Transaction>, StorageError> {
        const ORDER: &str = "ORDER BY date DESC, created_at DESC";
        let rows: Vec<TransactionRow> = match period {
            Some((start, end)) => self.db.select(
                &format!(
                    "WHERE household_id = ?1 AND deleted_at IS NULL AND date >= ?2 AND date < ?3 {ORDER}"
                ),
                params![household_id, start, end],
            )?,
            None => self.db.select(
                &format!("WHERE household_id = ?1 AND deleted_at IS NULL {ORDER}"),
                [household_id],
            )?,
        };

        let mut authors: HashMap<String, Option<TransactionUser>> = HashMap::new();
        let mut out = Vec::with_capacity(rows.len());
        for row in &rows {
            let mut tx = Transaction::from_row(row, &self.crypto)?;
            if !authors.contains_key(&row.user_id) {
                let author = self
                    .find::<User>(&row.user_id)
                    .await?
                    .map(|u| TransactionUser::from(&u));
                authors.insert(row.user_id.clone(), author);
            }
            tx.user = authors.get(&row.user_id).cloned().flatten();
            out.push(tx);
        }
        Ok(out)
    }

    /// Fill in [`Transaction::user`] from the users table.
    pub async fn attach_author(&self, tx: &mut Transaction) -> Result<(), StorageError> {
        tx.user = self
            .find::<User>(&tx.user_id)
            .await?
            .map(|u| TransactionUser::from(&u));
        Ok(())
    }

    /// Sum of live transaction amounts in a category over `period`.
    pub async fn spent_in_category(
        &self,
        household_id: &str,
        category_id: &str,
        period: Period,
    ) -> Result<f64, StorageError> {
        let (start, end) = period;
        self.db.with_conn(|conn| {
            let spent = conn.query_row(
                "SELECT COALESCE(SUM(amount), 0.0) FROM transactions \
                 WHERE household_id = ?1 AND category_id = ?2 AND deleted_at IS NULL \
                 AND date >= ?3 AND date < ?4",
                params![household_id, category_id, start, end],
                |row| row.get(0),
            )?;
            Ok(spent)
        })
    }

    /// Distinct non-empty notes used in a category, most recently used first.
    ///
    /// Notes are grouped by `note_hash`, so variants differing only in case or
    /// surrounding whitespace collapse into one entry showing the latest text.
    /// Recency is the creation time, ties broken by transaction date.
    pub async fn suggested_notes(
        &self,
        household_id: &str,
        category_id: &str,
        limit: usize,
    ) -> Result<Vec<String>, StorageError> {
        let rows: Vec<TransactionRow> = self.db.select(
            "WHERE household_id = ?1 AND category_id = ?2 AND deleted_at IS NULL \
             AND note_hash <> '' ORDER BY created_at DESC, date DESC",
            [household_id, category_id],
        )?;

        let mut seen = HashSet::new();
        rows.iter()
            .filter(|r| seen.insert(r.note_hash.as_str()))
            .take(limit)
            .map(|r| Transaction::from_row(r, &self.crypto).map(|t| t.note.as_str().to_owned()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone};

    use super::*;
    use crate::migration::migrate_to_encryption;
    use crate::models::Category;

    const TEST_KEY: &str = "0123456789abcdef0123456789abcdef0123456789abcdef0123456789abcdef";

    fn repo() -> Repository {
        Repository::new(
            Database::open_in_memory().unwrap(),
            Crypto::from_hex(TEST_KEY).unwrap(),
        )
    }

    fn stored_user(repo: &Repository, id: &str) -> UserRow {
        repo.database().get(id).unwrap().unwrap()
    }

    fn day(d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, d, 12, 0, 0).unwrap()
    }

    async fn add_tx(repo: &Repository, id: &str, category: &str, date: DateTime<Utc>, note: &str, amount: f64) {
        let mut tx = Transaction::new(
            repo.crypto(),
            id,
            "hh-1",
            "acc-1",
            category,
            "u-1",
            amount,
            date,
            note,
        )
        .unwrap();
        repo.insert(&mut tx).await.unwrap();
    }

    #[tokio::test]
    async fn insert_stores_envelope_and_matching_hash() {
        let repo = repo();
        let mut user = User::new(repo.crypto(), "u-1", "hh-1", "Ana@Example.com", "Ana").unwrap();
        repo.insert(&mut user).await.unwrap();

        let row = stored_user(&repo, "u-1");
        assert!(row.email.starts_with("enc:"));
        let plain = repo.crypto().decrypt(&row.email).unwrap();
        assert_eq!(plain, "Ana@Example.com");
        assert_eq!(row.email_hash, repo.crypto().hash(&plain).unwrap());
    }

    #[tokio::test]
    async fn update_recomputes_hash_column() {
        let repo = repo();
        let mut user = User::new(repo.crypto(), "u-1", "hh-1", "old@example.com", "Ana").unwrap();
        repo.insert(&mut user).await.unwrap();

        user.set_email(repo.crypto(), "new@example.com").unwrap();
        repo.update(&mut user).await.unwrap();

        let row = stored_user(&repo, "u-1");
        let plain = repo.crypto().decrypt(&row.email).unwrap();
        assert_eq!(plain, "new@example.com");
        assert_eq!(row.email_hash, repo.crypto().hash(&plain).unwrap());
    }

    #[tokio::test]
    async fn duplicate_insert_is_rejected() {
        let repo = repo();
        let mut a = Category::new("c-1", "hh-1", "Food", 100.0);
        repo.insert(&mut a).await.unwrap();
        let mut b = Category::new("c-1", "hh-1", "Other", 5.0);
        let err = repo.insert(&mut b).await.unwrap_err();
        assert!(matches!(err, StorageError::Duplicate { table: "categories", .. }));
    }

    #[tokio::test]
    async fn update_of_missing_record_is_not_found() {
        let repo = repo();
        let mut c = Category::new("c-1", "hh-1", "Food", 100.0);
        assert!(matches!(
            repo.update(&mut c).await.unwrap_err(),
            StorageError::NotFound { .. }
        ));
    }

    #[tokio::test]
    async fn soft_delete_hides_record_and_respects_household() {
        let repo = repo();
        let mut c = Category::new("c-1", "hh-1", "Food", 100.0);
        repo.insert(&mut c).await.unwrap();

        assert!(repo.soft_delete::<Category>("hh-2", "c-1").await.is_err());
        repo.soft_delete::<Category>("hh-1", "c-1").await.unwrap();

        assert!(repo.find::<Category>("c-1").await.unwrap().is_none());
        assert!(repo.list_in_household::<Category>("hh-1").await.unwrap().is_empty());
        assert!(repo.soft_delete::<Category>("hh-1", "c-1").await.is_err());
    }

    #[tokio::test]
    async fn find_in_household_scopes_by_owner() {
        let repo = repo();
        let mut c = Category::new("c-1", "hh-1", "Food", 100.0);
        repo.insert(&mut c).await.unwrap();
        assert!(repo.find_in_household::<Category>("hh-1", "c-1").await.unwrap().is_some());
        assert!(repo.find_in_household::<Category>("hh-2", "c-1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn user_lookup_by_email_ignores_case_and_spaces() {
        let repo = repo();
        let mut user = User::new(repo.crypto(), "u-1", "hh-1", "ana@example.com", "Ana").unwrap();
        repo.insert(&mut user).await.unwrap();

        let found = repo.find_user_by_email(" ANA@example.com ", false).await.unwrap();
        assert_eq!(found.unwrap().id, "u-1");
        assert!(repo.find_user_by_email("", false).await.unwrap().is_none());

        repo.soft_delete::<User>("hh-1", "u-1").await.unwrap();
        assert!(repo.find_user_by_email("ana@example.com", false).await.unwrap().is_none());
        let deleted = repo.find_user_by_email("ana@example.com", true).await.unwrap().unwrap();
        assert!(deleted.is_deleted());
    }

    #[tokio::test]
    async fn invitation_lookups() {
        let repo = repo();
        let mut inv = Invitation::new(repo.crypto(), "i-1", "hh-1", "bob@example.com").unwrap();
        repo.insert(&mut inv).await.unwrap();

        let by_email = repo
            .find_pending_invitation_by_email("hh-1", "Bob@Example.com")
            .await
            .unwrap();
        assert_eq!(by_email.unwrap().id, "i-1");
        assert!(repo
            .find_pending_invitation_by_email("hh-2", "bob@example.com")
            .await
            .unwrap()
            .is_none());

        let by_code = repo.find_pending_invitation_by_code(&inv.code).await.unwrap();
        assert_eq!(by_code.unwrap().email.as_str(), "bob@example.com");

        inv.accept();
        repo.update(&mut inv).await.unwrap();
        assert!(repo.find_pending_invitation_by_code(&inv.code).await.unwrap().is_none());
        assert!(repo.pending_invitations("hh-1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn create_household_adds_one_cash_account() {
        let repo = repo();
        let mut hh = Household::new("hh-1", "Casa");
        let cash = repo.create_household(&mut hh).await.unwrap();
        assert_eq!(cash.kind, AccountKind::Cash);
        assert_eq!(repo.count_cash_accounts("hh-1").await.unwrap(), 1);
        let stored = repo.find::<Household>("hh-1").await.unwrap().unwrap();
        assert_eq!(stored.name.as_str(), "Casa");
    }

    #[tokio::test]
    async fn transactions_are_filtered_ordered_and_authored() {
        let repo = repo();
        let mut user = User::new(repo.crypto(), "u-1", "hh-1", "ana@example.com", "Ana").unwrap();
        user.color = "#EF4444".into();
        repo.insert(&mut user).await.unwrap();

        add_tx(&repo, "t-1", "c-1", day(5), "Pan", 10.0).await;
        add_tx(&repo, "t-2", "c-1", day(20), "Leche", 20.0).await;
        add_tx(&repo, "t-3", "c-1", day(5) - Duration::days(30), "Old", 30.0).await;

        let march = (day(1) - Duration::hours(12), day(1) - Duration::hours(12) + Duration::days(31));
        let txs = repo.transactions("hh-1", Some(march)).await.unwrap();
        let ids: Vec<_> = txs.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, ["t-2", "t-1"]);
        let author = txs[0].user.as_ref().unwrap();
        assert_eq!(author.name, "Ana");
        assert_eq!(author.color, "#EF4444");

        assert_eq!(repo.transactions("hh-1", None).await.unwrap().len(), 3);
        assert_eq!(repo.spent_in_category("hh-1", "c-1", march).await.unwrap(), 30.0);
    }

    #[tokio::test]
    async fn suggested_notes_group_by_hash_latest_first() {
        let repo = repo();
        add_tx(&repo, "t-1", "c-1", day(1), "Coffee", 1.0).await;
        add_tx(&repo, "t-2", "c-1", day(2), "Bread", 1.0).await;
        add_tx(&repo, "t-3", "c-1", day(3), "coffee ", 1.0).await;
        add_tx(&repo, "t-4", "c-1", day(4), "", 1.0).await;
        add_tx(&repo, "t-5", "c-2", day(5), "Elsewhere", 1.0).await;

        let notes = repo.suggested_notes("hh-1", "c-1", 50).await.unwrap();
        assert_eq!(notes, ["coffee ", "Bread"]);
        assert_eq!(repo.suggested_notes("hh-1", "c-1", 1).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn email_hash_column_is_what_lookups_match() {
        let repo = repo();
        let mut user = User::new(repo.crypto(), "u-1", "hh-1", "ana@example.com", "Ana").unwrap();
        repo.insert(&mut user).await.unwrap();

        // Lookups go through the indexed hash column, not the envelope.
        repo.database()
            .with_conn(|conn| {
                conn.execute("UPDATE users SET email_hash = 'stale' WHERE id = 'u-1'", [])?;
                Ok(())
            })
            .unwrap();
        assert!(repo.find_user_by_email("ana@example.com", true).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn users_survive_a_restart_on_the_same_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("keda.db");

        {
            let repo = Repository::new(
                Database::open(&path).unwrap(),
                Crypto::from_hex(TEST_KEY).unwrap(),
            );
            let mut user =
                User::new(repo.crypto(), "u-1", "hh-1", "Ana@Example.com", "Ana").unwrap();
            repo.insert(&mut user).await.unwrap();
        }

        let restarted = Repository::new(
            Database::open(&path).unwrap(),
            Crypto::from_hex(TEST_KEY).unwrap(),
        );
        let report = migrate_to_encryption(&restarted).await.unwrap();
        assert!(report.is_clean());
        assert_eq!(report.migrated_in("users"), 1);

        let user = restarted
            .find_user_by_email("ana@example.com", true)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(user.id, "u-1");
        assert_eq!(user.name.as_str(), "Ana");
    }
}
