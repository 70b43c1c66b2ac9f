//! Keda household budgeting backend.
//!
//! Sensitive columns are sealed with AES-256-GCM at the persistence boundary
//! ([`db`]) and looked up through keyed hashes ([`crypto`]). The REST surface
//! lives in [`server`].

pub mod auth;
pub mod config;
pub mod crypto;
pub mod db;
pub mod error;
pub mod mailer;
pub mod migration;
pub mod models;
pub mod seed;
pub mod server;
pub mod telemetry;
