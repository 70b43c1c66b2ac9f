//! `keda-server` binary entry point.
//!
//! Startup sequence:
//! 1. Load and validate [`Config`] from environment variables.
//! 2. Initialise the telemetry pipeline (tracing, optional OTLP export).
//! 3. Initialise the encryption context from `ENCRYPTION_KEY` and open the
//!    database at `DATABASE_PATH`.
//! 4. Re-encrypt stored rows; refuse to start if any row fails.
//! 5. Seed demo data when running in test mode.
//! 6. Build the Axum router and start the HTTP server.

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{error, info, warn};

use keda_server::auth::GoogleVerifier;
use keda_server::config::Config;
use keda_server::crypto::Crypto;
use keda_server::db::{Database, Repository};
use keda_server::mailer::LogMailer;
use keda_server::server::{self, state::AppState};
use keda_server::{migration, seed, telemetry};

#[tokio::main]
async fn main() -> Result<()> {
    // -----------------------------------------------------------------------
    // 1. Configuration
    // -----------------------------------------------------------------------
    let cfg = Config::from_env().map_err(|e| {
        // Telemetry is not yet up; write to stderr directly.
        eprintln!("ERROR: configuration invalid: {e:#}");
        e
    })?;

    // -----------------------------------------------------------------------
    // 2. Telemetry
    // -----------------------------------------------------------------------
    telemetry::init_telemetry(cfg.otel_exporter_otlp_endpoint.as_deref(), &cfg.log_level)?;
    info!(
        version = env!("CARGO_PKG_VERSION"),
        port = cfg.port,
        test_mode = cfg.test_mode,
        "keda-server starting"
    );
    if cfg.google_client_id.trim().is_empty() {
        warn!("GOOGLE_CLIENT_ID is not set; ID token audience is not checked");
    }

    // -----------------------------------------------------------------------
    // 3. Encryption context
    // -----------------------------------------------------------------------
    let crypto = Crypto::new();
    crypto
        .initialize(&cfg.encryption_key)
        .context("failed to initialise encryption")?;
    let db = Database::open(&cfg.database_path)
        .with_context(|| format!("failed to open database at {}", cfg.database_path))?;
    let repo = Repository::new(db, crypto);

    // -----------------------------------------------------------------------
    // 4. Data migration
    // -----------------------------------------------------------------------
    let report = migration::migrate_to_encryption(&repo)
        .await
        .context("encryption migration failed")?;
    if !report.is_clean() {
        for failure in &report.failures {
            error!(table = failure.table, id = %failure.id, error = %failure.error, "row failed migration");
        }
        anyhow::bail!("{} rows could not be migrated", report.failures.len());
    }
    info!(rows = report.total_migrated(), "encryption migration complete");

    // -----------------------------------------------------------------------
    // 5. Demo data
    // -----------------------------------------------------------------------
    if cfg.test_mode {
        seed::seed_demo_data(&repo, &cfg.test_household_id)
            .await
            .context("failed to seed demo data")?;
    }

    // -----------------------------------------------------------------------
    // 6. HTTP server
    // -----------------------------------------------------------------------
    let verifier = GoogleVerifier::new(cfg.google_client_id.clone())
        .context("failed to build Google identity client")?;
    let mailer = LogMailer::new(cfg.smtp_from.clone(), cfg.app_url.clone());
    let state = AppState::from_config(&cfg, repo, Arc::new(verifier), Arc::new(mailer));
    let router = server::router::build(state);

    let addr = cfg.bind_address();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!(addr = %addr, "listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    telemetry::shutdown();
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "failed to listen for shutdown signal");
    }
    info!("shutting down");
}
