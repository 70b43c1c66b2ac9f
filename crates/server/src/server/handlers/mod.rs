//! Axum request handlers for all service endpoints.
//!
//! Every handler under `/households/:household_id` receives the caller's
//! [`Session`](crate::auth::Session); the household it acts on is always the
//! session's, which the guard has already matched against the URL.

pub mod accounts;
pub mod auth;
pub mod categories;
pub mod households;
pub mod reports;
pub mod transactions;

use axum::{http::StatusCode, response::IntoResponse, Json};
use chrono::{DateTime, Datelike, Months, NaiveDate, TimeZone, Utc};
use common::protocol::{ErrorResponse, HealthResponse};

use crate::db::repo::Period;
use crate::error::ApiError;

pub(crate) const MONTH_FORMAT_ERROR: &str = "Invalid month format. Use YYYY-MM";

/// `GET /health`: liveness check.
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".into(),
    })
}

/// Catch-all 404 handler.
pub async fn not_found() -> impl IntoResponse {
    let err = ErrorResponse::new("not_found", "the requested resource does not exist");
    (StatusCode::NOT_FOUND, Json(err))
}

/// `[first of month, first of next month)` for a `YYYY-MM` string.
///
/// chrono accepts unpadded or signed fields ("2024-1", "+2024-01"), so only
/// input that formats back to itself is taken.
pub(crate) fn parse_month(month: &str) -> Result<Period, ApiError> {
    NaiveDate::parse_from_str(&format!("{month}-01"), "%Y-%m-%d")
        .ok()
        .filter(|first| first.format("%Y-%m").to_string() == month)
        .and_then(month_from)
        .ok_or_else(|| ApiError::bad_request(MONTH_FORMAT_ERROR))
}

/// Calendar month (UTC) containing `now`.
pub(crate) fn current_month(now: DateTime<Utc>) -> Period {
    NaiveDate::from_ymd_opt(now.year(), now.month(), 1)
        .and_then(month_from)
        .unwrap_or((now, now))
}

/// Calendar month (UTC) before the one containing `now`.
pub(crate) fn previous_month(now: DateTime<Utc>) -> Period {
    NaiveDate::from_ymd_opt(now.year(), now.month(), 1)
        .and_then(|first| first.checked_sub_months(Months::new(1)))
        .and_then(month_from)
        .unwrap_or((now, now))
}

fn month_from(first: NaiveDate) -> Option<Period> {
    let next = first.checked_add_months(Months::new(1))?;
    let start = Utc.from_utc_datetime(&first.and_hms_opt(0, 0, 0)?);
    let end = Utc.from_utc_datetime(&next.and_hms_opt(0, 0, 0)?);
    Some((start, end))
}
