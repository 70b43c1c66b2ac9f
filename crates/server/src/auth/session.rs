//! Guard for every `/households/:household_id/...` route.

use std::collections::HashMap;

use axum::{
    async_trait,
    extract::{FromRequestParts, Path, Request, State},
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
    middleware::Next,
    response::Response,
};
use tracing::debug;

use crate::error::ApiError;
use crate::models::User;
use crate::server::state::AppState;

/// Bearer token accepted in test mode without verification.
pub const TEST_MODE_TOKEN: &str = "test-mode-dummy-token";

/// User the test-mode token authenticates as.
pub const TEST_USER_ID: &str = "test-user-id";

/// The authenticated caller, attached to the request by [`require_session`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub user_id: String,
    pub household_id: String,
}

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for Session {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Session>()
            .cloned()
            .ok_or_else(|| ApiError::unauthorized("Authorization header required"))
    }
}

/// Authenticate the caller and check they may act on the household in the URL.
///
/// Rejections, in the order they are checked:
/// missing header (401), not `Bearer <token>` (401), bad or expired token
/// (401), user gone or removed (401), user moved to another household (403),
/// URL names a different household (403).
pub async fn require_session(
    State(state): State<AppState>,
    Path(params): Path<HashMap<String, String>>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let session = authenticate(&state, req.headers()).await?;

    if let Some(url_household) = params.get("household_id") {
        if *url_household != session.household_id {
            debug!(user_id = %session.user_id, "household mismatch");
            return Err(ApiError::forbidden("Access denied to this household"));
        }
    }

    req.extensions_mut().insert(session);
    Ok(next.run(req).await)
}

async fn authenticate(state: &AppState, headers: &HeaderMap) -> Result<Session, ApiError> {
    let header = headers
        .get(AUTHORIZATION)
        .ok_or_else(|| ApiError::unauthorized("Authorization header required"))?;
    let token = header
        .to_str()
        .ok()
        .and_then(|v| v.strip_prefix("Bearer "))
        .filter(|t| !t.is_empty())
        .ok_or_else(|| ApiError::unauthorized("Invalid authorization format"))?;

    if state.test_mode && token == TEST_MODE_TOKEN {
        return Ok(Session {
            user_id: TEST_USER_ID.to_owned(),
            household_id: state.test_household_id.to_string(),
        });
    }

    let claims = state.tokens.verify(token)?;

    let user = state
        .repo
        .find::<User>(&claims.user_id)
        .await?
        .ok_or_else(|| ApiError::unauthorized("User no longer exists or access revoked"))?;

    if user.household_id != claims.household_id {
        return Err(ApiError::forbidden(
            "User is no longer a member of this household",
        ));
    }

    Ok(Session {
        user_id: claims.user_id,
        household_id: claims.household_id,
    })
}
