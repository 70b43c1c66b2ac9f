//! Shared application state injected into every Axum handler.

use std::sync::Arc;

use crate::auth::{IdentityVerifier, TokenSigner};
use crate::config::Config;
use crate::db::Repository;
use crate::mailer::Mailer;

/// Application state shared across all request handlers.
///
/// All fields are cheaply cloneable (`Arc`-wrapped or already `Arc`-backed) so
/// that Axum can clone the state for each request without copying expensive data.
#[derive(Clone)]
pub struct AppState {
    /// Encrypted store access.
    pub repo: Repository,
    /// Session token issuer/verifier.
    pub tokens: TokenSigner,
    pub verifier: Arc<dyn IdentityVerifier>,
    pub mailer: Arc<dyn Mailer>,
    pub test_mode: bool,
    /// Household the test-mode token is bound to.
    pub test_household_id: Arc<str>,
}

impl AppState {
    pub fn new(
        repo: Repository,
        tokens: TokenSigner,
        verifier: Arc<dyn IdentityVerifier>,
        mailer: Arc<dyn Mailer>,
    ) -> Self {
        Self {
            repo,
            tokens,
            verifier,
            mailer,
            test_mode: false,
            test_household_id: Arc::from("test-household-id"),
        }
    }

    /// Enable test mode bound to `household_id`.
    pub fn with_test_mode(mut self, household_id: &str) -> Self {
        self.test_mode = true;
        self.test_household_id = Arc::from(household_id);
        self
    }

    /// State for the configured process.
    pub fn from_config(
        cfg: &Config,
        repo: Repository,
        verifier: Arc<dyn IdentityVerifier>,
        mailer: Arc<dyn Mailer>,
    ) -> Self {
        let state = Self::new(repo, TokenSigner::new(&cfg.jwt_secret), verifier, mailer);
        if cfg.test_mode {
            state.with_test_mode(&cfg.test_household_id)
        } else {
            state
        }
    }
}
