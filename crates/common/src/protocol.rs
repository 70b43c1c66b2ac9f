//! Request and response bodies exchanged over the public REST API.
//!
//! Entity payloads (households, users, accounts, ...) are serialised by the
//! server crate straight from its models; this module holds the bodies that
//! are not a single stored record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Authentication
// ---------------------------------------------------------------------------

/// Request body for `POST /auth/google`.
///
/// Mobile clients send an `id_token`; the web client only has an
/// `access_token`. Either one is enough.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GoogleLoginRequest {
    #[serde(default)]
    pub id_token: String,
    #[serde(default)]
    pub access_token: String,
    /// Code from a pending invitation; joins the inviting household on first login.
    #[serde(default)]
    pub invite_code: String,
}

/// Request body for `POST /auth/test-login` (test mode only).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestLoginRequest {
    pub email: String,
    pub name: String,
    #[serde(default)]
    pub invite_code: String,
}

// ---------------------------------------------------------------------------
// Households & members
// ---------------------------------------------------------------------------

/// Request body for `POST /households`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateHouseholdRequest {
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
}

/// Request body for `POST /households/:household_id/invitations`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvitationRequest {
    pub email: String,
}

/// One row of `GET /households/:household_id/members`.
///
/// Active users and pending invitations share this shape; `status` tells them
/// apart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemberResponse {
    pub id: String,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub picture_url: String,
    #[serde(default)]
    pub color: String,
    /// `"active"` or `"pending"`.
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub invite_code: Option<String>,
}

// ---------------------------------------------------------------------------
// Categories, accounts, transactions
// ---------------------------------------------------------------------------

fn default_true() -> bool {
    true
}

/// Request body for creating or updating a category.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryRequest {
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub monthly_budget: f64,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

/// Request body for creating or updating an account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountRequest {
    #[serde(default)]
    pub id: Option<String>,
    /// `"cash"`, `"bank"` or `"card"`.
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub brand: Option<String>,
    #[serde(default)]
    pub bank: Option<String>,
}

/// Request body for creating or updating a transaction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionRequest {
    #[serde(default)]
    pub id: Option<String>,
    pub account_id: String,
    pub category_id: String,
    pub amount: f64,
    pub date: DateTime<Utc>,
    /// Free-text note. Older clients still send it as `description`.
    #[serde(default, alias = "description")]
    pub note: String,
}

/// Query string accepted by the month-filtered list endpoints.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MonthQuery {
    /// `YYYY-MM`; absent means "no filter" (or "current month" for sync).
    #[serde(default)]
    pub month: Option<String>,
}

// ---------------------------------------------------------------------------
// Reports
// ---------------------------------------------------------------------------

/// Per-category line of a [`MonthlySummary`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategorySummary {
    pub id: String,
    pub name: String,
    pub budget: f64,
    pub spent: f64,
    pub remaining: f64,
}

/// Response body for `GET /households/:household_id/summary/:month`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlySummary {
    pub month: String,
    pub total_budget: f64,
    pub total_spent: f64,
    pub categories: Vec<CategorySummary>,
}

/// A single budget adjustment suggested from last month's spending.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Suggestion {
    pub category_id: String,
    pub category: String,
    /// `"increase"` or `"decrease"`.
    pub action: String,
    pub amount: f64,
}

/// Response body for `GET /households/:household_id/recommendations`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecommendationsResponse {
    pub suggestions: Vec<Suggestion>,
}

// ---------------------------------------------------------------------------
// Generic responses
// ---------------------------------------------------------------------------

/// Standard error response body returned on any non-2xx status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Short machine-readable error code (e.g. `"bad_request"`).
    pub code: String,
    /// Human-readable description safe to expose to callers.
    pub message: String,
}

impl ErrorResponse {
    /// Construct an [`ErrorResponse`] from a code and message.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }
}

/// Body returned by delete-style endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Response body for `GET /health`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Always `"ok"` once the process is serving.
    pub status: String,
}
