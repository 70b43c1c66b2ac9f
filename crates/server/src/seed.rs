//! Demo data for test mode.
//!
//! Every record has a fixed id and is only inserted when that id is free, so
//! seeding on each start leaves earlier edits alone.

use chrono::{Duration, Utc};
use tracing::info;

use crate::db::{Record, Repository, StorageError};
use crate::models::{user::random_color, Account, AccountKind, Category, Household, Transaction, User};

pub const DEMO_HOUSEHOLD_NAME: &str = "Familia Demo";

const WALLET: &str = "account-wallet";
const BANK: &str = "account-bank";
const GROCERIES: &str = "cat-groceries";
const UTILITIES: &str = "cat-utilities";
const ENTERTAINMENT: &str = "cat-entertainment";
const TRANSPORT: &str = "cat-transport";

/// `(id, email, name, google id, picture)`
const USERS: [(&str, &str, &str, &str, &str); 3] = [
    (
        "test-user-id",
        "demo@keda.app",
        "Demo User",
        "google-id-1",
        "https://lh3.googleusercontent.com/a-/ALV-UjWqgX8g_Xg_Xg_Xg_Xg_Xg_Xg_Xg_Xg=s96-c",
    ),
    ("user-2", "partner@keda.app", "Partner", "google-id-2", ""),
    ("user-3", "kid@keda.app", "Kid", "google-id-3", ""),
];

/// `(id, name, monthly budget)`
const CATEGORIES: [(&str, &str, f64); 4] = [
    (GROCERIES, "Supermarket", 500.0),
    (UTILITIES, "Utilities", 150.0),
    (ENTERTAINMENT, "Entertainment", 100.0),
    (TRANSPORT, "Transport", 80.0),
];

/// `(id, account, category, user, amount, days ago, note)`
const TRANSACTIONS: [(&str, &str, &str, &str, f64, i64, &str); 5] = [
    ("tx-1", WALLET, GROCERIES, "test-user-id", 45.50, 0, "Weekly grocery shopping"),
    ("tx-2", BANK, UTILITIES, "test-user-id", 30.00, 0, "Electricity"),
    ("tx-3", WALLET, TRANSPORT, "user-2", 5.00, 1, "Uber"),
    ("tx-4", BANK, GROCERIES, "user-2", 12.30, 1, "Weekly grocery shopping"),
    ("tx-5", WALLET, ENTERTAINMENT, "user-3", 15.00, 3, "Movies"),
];

/// Insert unless the id is taken; `true` when a row was written.
async fn insert_new<E: Record>(repo: &Repository, entity: &mut E) -> Result<bool, StorageError> {
    match repo.insert(entity).await {
        Ok(()) => Ok(true),
        Err(StorageError::Duplicate { .. }) => Ok(false),
        Err(e) => Err(e),
    }
}

/// Populate `household_id` with demo members, accounts, categories and
/// transactions. Returns how many records were created.
///
/// # Errors
///
/// Fails on the first record that cannot be encoded.
pub async fn seed_demo_data(repo: &Repository, household_id: &str) -> Result<usize, StorageError> {
    let codec = repo.crypto();
    let mut created = 0;

    for (id, email, name, google_id, picture) in USERS {
        let mut user = User::new(codec, id, household_id, email, name).map_err(|source| {
            StorageError::Lookup {
                table: User::TABLE,
                column: "email_hash",
                source,
            }
        })?;
        user.google_id = google_id.to_owned();
        user.picture_url = picture.to_owned();
        user.color = random_color();
        created += usize::from(insert_new(repo, &mut user).await?);
    }

    let mut household = Household::new(household_id, DEMO_HOUSEHOLD_NAME);
    created += usize::from(insert_new(repo, &mut household).await?);

    let mut wallet = Account::cash(WALLET, household_id);
    created += usize::from(insert_new(repo, &mut wallet).await?);
    let mut bank = Account {
        kind: AccountKind::Bank,
        name: "ACME Bank".into(),
        ..Account::cash(BANK, household_id)
    };
    created += usize::from(insert_new(repo, &mut bank).await?);

    for (id, name, budget) in CATEGORIES {
        let mut category = Category::new(id, household_id, name, budget);
        created += usize::from(insert_new(repo, &mut category).await?);
    }

    let now = Utc::now();
    for (id, account, category, user, amount, days_ago, note) in TRANSACTIONS {
        let date = now - Duration::days(days_ago);
        let mut tx = Transaction::new(codec, id, household_id, account, category, user, amount, date, note)
            .map_err(|source| StorageError::Lookup {
                table: Transaction::TABLE,
                column: "note_hash",
                source,
            })?;
        created += usize::from(insert_new(repo, &mut tx).await?);
    }

    info!(household_id, created, "demo data seeded");
    Ok(created)
}
