//! `POST /auth/google` and `POST /auth/test-login`.

use axum::{extract::State, Json};
use common::protocol::{GoogleLoginRequest, TestLoginRequest};
use serde::Serialize;
use tracing::{debug, info};

use crate::auth::{GoogleIdentity, IdentityVerifier, VerifyError};
use crate::db::SecretString;
use crate::error::{ApiError, ApiResult, AppJson};
use crate::models::{new_id, user::random_color, Household, User};
use crate::server::state::AppState;

/// Body returned by both login endpoints.
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: User,
    pub household_id: String,
}

/// What a login proved about the caller.
struct Profile<'a> {
    email: &'a str,
    name: &'a str,
    picture: &'a str,
    google_id: &'a str,
}

pub async fn google_login(
    State(state): State<AppState>,
    AppJson(req): AppJson<GoogleLoginRequest>,
) -> ApiResult<Json<AuthResponse>> {
    let identity = resolve_identity(state.verifier.as_ref(), &req).await?;
    let profile = Profile {
        email: &identity.email,
        name: &identity.name,
        picture: &identity.picture,
        google_id: &identity.subject,
    };
    let user = sign_in(&state, profile, &req.invite_code).await?;
    respond(&state, user)
}

pub async fn test_login(
    State(state): State<AppState>,
    AppJson(req): AppJson<TestLoginRequest>,
) -> ApiResult<Json<AuthResponse>> {
    if !state.test_mode {
        return Err(ApiError::forbidden("Test login only available in test mode"));
    }
    if req.email.trim().is_empty() {
        return Err(ApiError::bad_request("email is required"));
    }
    let profile = Profile {
        email: req.email.trim(),
        name: req.name.trim(),
        picture: "",
        google_id: "",
    };
    let user = sign_in(&state, profile, &req.invite_code).await?;
    respond(&state, user)
}

/// ID token first, then access token.
async fn resolve_identity(
    verifier: &dyn IdentityVerifier,
    req: &GoogleLoginRequest,
) -> Result<GoogleIdentity, ApiError> {
    if !req.id_token.is_empty() {
        match verifier.verify_id_token(&req.id_token).await {
            Ok(identity) => return Ok(identity),
            Err(err @ VerifyError::Transport(_)) => return Err(err.into()),
            Err(err) => debug!(error = %err, "id token not accepted"),
        }
    }
    if !req.access_token.is_empty() {
        return verifier
            .verify_access_token(&req.access_token)
            .await
            .map_err(|err| match err {
                VerifyError::Transport(_) => ApiError::from(err),
                _ => ApiError::unauthorized("Invalid Google access token"),
            });
    }
    Err(ApiError::unauthorized("No valid token provided"))
}

/// Find or create the user behind `profile`.
///
/// A first-time user joins the household of the pending invitation carrying
/// `invite_code`, or else gets a household of their own.
async fn sign_in(state: &AppState, profile: Profile<'_>, invite_code: &str) -> Result<User, ApiError> {
    let repo = &state.repo;

    match repo.find_user_by_email(profile.email, true).await? {
        Some(user) if user.is_deleted() => Err(ApiError::forbidden(
            "User account has been deleted. Contact support to restore.",
        )),
        Some(mut user) => {
            if !profile.name.is_empty() {
                user.name = SecretString::new(profile.name);
            }
            if !profile.picture.is_empty() {
                user.picture_url = profile.picture.to_owned();
            }
            if user.google_id.is_empty() {
                user.google_id = profile.google_id.to_owned();
            }
            if user.color.is_empty() {
                user.color = random_color();
            }
            repo.update(&mut user).await?;
            Ok(user)
        }
        None => {
            let name = if profile.name.is_empty() {
                profile.email
            } else {
                profile.name
            };

            let household_id = match repo.find_pending_invitation_by_code(invite_code).await? {
                Some(mut invitation) => {
                    invitation.accept();
                    repo.update(&mut invitation).await?;
                    info!(
                        invitation_id = %invitation.id,
                        household_id = %invitation.household_id,
                        "invitation accepted"
                    );
                    invitation.household_id
                }
                None => {
                    let mut household = Household::new(new_id(), Household::default_name_for(name));
                    repo.create_household(&mut household).await?;
                    household.id
                }
            };

            let mut user = User::new(repo.crypto(), new_id(), household_id, profile.email, name)?;
            user.picture_url = profile.picture.to_owned();
            user.google_id = profile.google_id.to_owned();
            user.color = random_color();
            repo.insert(&mut user).await?;
            info!(user_id = %user.id, household_id = %user.household_id, "user registered");
            Ok(user)
        }
    }
}

fn respond(state: &AppState, user: User) -> ApiResult<Json<AuthResponse>> {
    let token = state
        .tokens
        .issue(&user.id, &user.household_id)
        .map_err(|e| ApiError::internal(format!("failed to issue session token: {e}")))?;
    Ok(Json(AuthResponse {
        token,
        household_id: user.household_id.clone(),
        user,
    }))
}
