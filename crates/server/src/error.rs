//! Mapping of internal failures onto HTTP responses.

use axum::{
    extract::{rejection::JsonRejection, FromRequest},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use common::{protocol::ErrorResponse, ServiceError};
use serde::Serialize;
use tracing::error;

use crate::auth::{TokenError, VerifyError};
use crate::crypto::CryptoError;
use crate::db::StorageError;

/// Error type returned by every handler.
///
/// Client errors keep their message; server-side faults are logged here and
/// reach the caller only as a generic `internal_error`.
#[derive(Debug)]
pub struct ApiError(pub ServiceError);

pub type ApiResult<T> = Result<T, ApiError>;

impl ApiError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self(ServiceError::BadRequest(msg.into()))
    }

    pub fn unauthorized(msg: impl Into<String>) -> Self {
        Self(ServiceError::Unauthorized(msg.into()))
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self(ServiceError::Forbidden(msg.into()))
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self(ServiceError::NotFound(msg.into()))
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self(ServiceError::Conflict(msg.into()))
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self(ServiceError::Internal(msg.into()))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.0.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        if status.is_server_error() {
            error!(error = %self.0, "request failed");
        }
        let body = ErrorResponse::new(self.0.code(), self.0.public_message());
        (status, Json(body)).into_response()
    }
}

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        Self(err)
    }
}

impl From<CryptoError> for ApiError {
    fn from(err: CryptoError) -> Self {
        Self(ServiceError::EncryptionFailure(err.to_string()))
    }
}

impl From<StorageError> for ApiError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound { table, .. } => {
                Self::not_found(format!("{} not found", singular(table)))
            }
            StorageError::Duplicate { table, .. } => {
                Self::conflict(format!("{} already exists", singular(table)))
            }
            StorageError::Encode { .. } | StorageError::Decode { .. } | StorageError::Lookup { .. } => {
                Self(ServiceError::EncryptionFailure(error_chain(&err)))
            }
            StorageError::Database(_) => Self(ServiceError::Internal(error_chain(&err))),
        }
    }
}

impl From<TokenError> for ApiError {
    fn from(_: TokenError) -> Self {
        Self::unauthorized("Invalid or expired token")
    }
}

impl From<VerifyError> for ApiError {
    fn from(err: VerifyError) -> Self {
        match err {
            VerifyError::Transport(_) => {
                Self(ServiceError::Unavailable("identity provider unavailable".into()))
            }
            _ => Self::unauthorized("No valid token provided"),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::bad_request(rejection.body_text())
    }
}

fn singular(table: &str) -> &str {
    match table {
        "households" => "Household",
        "users" => "User",
        "invitations" => "Invitation",
        "accounts" => "Account",
        "categories" => "Category",
        "transactions" => "Transaction",
        other => other,
    }
}

/// `outer: inner: ...` rendering of an error and its sources.
fn error_chain(err: &dyn std::error::Error) -> String {
    let mut out = err.to_string();
    let mut source = err.source();
    while let Some(inner) = source {
        out.push_str(": ");
        out.push_str(&inner.to_string());
        source = inner.source();
    }
    out
}

/// `Json` extractor whose rejection is rendered as an [`ErrorResponse`].
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct AppJson<T>(pub T);

impl<T: Serialize> IntoResponse for AppJson<T> {
    fn into_response(self) -> Response {
        Json(self.0).into_response()
    }
}
