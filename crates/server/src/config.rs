//! Configuration loading and validation for the Keda server.
//!
//! All values are read from environment variables at startup. The process will
//! exit with a clear error message if any required variable is missing or invalid.

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::crypto::EncryptionKey;

/// Validated server configuration.
#[derive(Clone, Deserialize)]
pub struct Config {
    /// 64 hex characters (32 bytes) for field encryption and hashing. **Required.**
    pub encryption_key: String,

    /// Secret that signs session tokens. **Required.**
    pub jwt_secret: String,

    /// Expected audience of Google ID tokens. Empty disables the audience check.
    #[serde(default)]
    pub google_client_id: String,

    /// SQLite database file, created on first start.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    #[serde(default = "default_listen_address")]
    pub listen_address: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Base URL of the web app, used in invitation links.
    #[serde(default = "default_app_url")]
    pub app_url: String,

    /// Enables `/auth/test-login`, the dummy bearer token and demo data.
    #[serde(default)]
    pub test_mode: bool,

    #[serde(default = "default_test_household_id")]
    pub test_household_id: String,

    /// Sender address for invitation mail.
    #[serde(default = "default_smtp_from")]
    pub smtp_from: String,

    /// Tracing log level (e.g. `"info"`, `"debug"`).
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// OTLP/gRPC collector endpoint. Spans are only exported when set.
    #[serde(default)]
    pub otel_exporter_otlp_endpoint: Option<String>,
}

fn default_database_path() -> String {
    "keda.db".into()
}
fn default_listen_address() -> String {
    "0.0.0.0".into()
}
fn default_port() -> u16 {
    8090
}
fn default_app_url() -> String {
    "http://localhost:8080".into()
}
fn default_test_household_id() -> String {
    "test-household-id".into()
}
fn default_smtp_from() -> String {
    "noreply@keda.local".into()
}
fn default_log_level() -> String {
    "info".into()
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("encryption_key", &"[REDACTED]")
            .field("jwt_secret", &"[REDACTED]")
            .field("google_client_id", &self.google_client_id)
            .field("database_path", &self.database_path)
            .field("listen_address", &self.listen_address)
            .field("port", &self.port)
            .field("app_url", &self.app_url)
            .field("test_mode", &self.test_mode)
            .field("test_household_id", &self.test_household_id)
            .field("smtp_from", &self.smtp_from)
            .field("log_level", &self.log_level)
            .field("otel_exporter_otlp_endpoint", &self.otel_exporter_otlp_endpoint)
            .finish()
    }
}

impl Config {
    /// Load and validate configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if any required variable is absent or cannot be parsed.
    pub fn from_env() -> Result<Self> {
        Self::load(config::Environment::default())
    }

    fn load(env: config::Environment) -> Result<Self> {
        let cfg = config::Config::builder()
            .add_source(env)
            .build()
            .context("failed to build configuration from environment")?;

        let c: Config = cfg
            .try_deserialize()
            .context("failed to deserialise configuration")?;

        c.validate()?;
        Ok(c)
    }

    /// `listen_address:port`.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.listen_address, self.port)
    }

    /// Validate all fields, returning a descriptive error on the first failure.
    fn validate(&self) -> Result<()> {
        ensure_non_empty(&self.encryption_key, "ENCRYPTION_KEY")?;
        EncryptionKey::from_hex(&self.encryption_key).context("ENCRYPTION_KEY is invalid")?;
        ensure_non_empty(&self.jwt_secret, "JWT_SECRET")?;
        ensure_non_empty(&self.database_path, "DATABASE_PATH")?;
        if self.port == 0 {
            anyhow::bail!("PORT must be > 0");
        }
        if self.test_mode {
            ensure_non_empty(&self.test_household_id, "TEST_HOUSEHOLD_ID")?;
        }
        Ok(())
    }
}

fn ensure_non_empty(value: &str, name: &str) -> Result<()> {
    if value.trim().is_empty() {
        anyhow::bail!("{name} is required and must not be empty");
    }
    Ok(())
}
