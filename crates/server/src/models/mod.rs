//! Household budgeting entities.
//!
//! Sensitive attributes are [`SecretString`](crate::db::SecretString) or, when
//! they must support equality lookups, [`IndexedSecret`](crate::db::IndexedSecret).
//! Each entity implements [`Record`](crate::db::Record), which is where those
//! fields are sealed and opened.

pub mod account;
pub mod category;
pub mod household;
pub mod invitation;
pub mod transaction;
pub mod user;

pub use account::{Account, AccountKind};
pub use category::Category;
pub use household::Household;
pub use invitation::{Invitation, InvitationStatus};
pub use transaction::{Transaction, TransactionUser};
pub use user::User;

/// Fresh primary key for a new record.
pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Use the client-supplied id when present and non-blank, otherwise mint one.
pub fn id_or_new(id: Option<String>) -> String {
    id.filter(|s| !s.trim().is_empty()).unwrap_or_else(new_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_or_new_keeps_supplied_id() {
        assert_eq!(id_or_new(Some("cat-1".into())), "cat-1");
    }

    #[test]
    fn id_or_new_replaces_blank_id() {
        let id = id_or_new(Some("  ".into()));
        assert!(uuid::Uuid::parse_str(&id).is_ok());
        assert!(uuid::Uuid::parse_str(&id_or_new(None)).is_ok());
    }
}
