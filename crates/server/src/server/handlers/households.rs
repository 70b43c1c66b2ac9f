//! Households, their members and invitations, and the sync snapshot.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use common::protocol::{
    CreateHouseholdRequest, InvitationRequest, MemberResponse, MessageResponse, MonthQuery,
};
use serde::Serialize;
use tracing::info;

use super::{current_month, parse_month};
use crate::auth::Session;
use crate::error::{ApiError, ApiResult, AppJson};
use crate::mailer::{dispatch_invitation, is_valid_address};
use crate::models::{
    id_or_new, new_id, Account, Category, Household, Invitation, Transaction, User,
};
use crate::server::state::AppState;

/// Placeholder name shown for members who have not logged in yet.
pub const PENDING_MEMBER_NAME: &str = "Invitado";

#[derive(Debug, Serialize)]
pub struct SyncResponse {
    pub accounts: Vec<Account>,
    pub categories: Vec<Category>,
    pub transactions: Vec<Transaction>,
}

/// `POST /households`. Also creates the household's cash account.
pub async fn create_household(
    State(state): State<AppState>,
    AppJson(req): AppJson<CreateHouseholdRequest>,
) -> ApiResult<(StatusCode, Json<Household>)> {
    if req.name.trim().is_empty() {
        return Err(ApiError::bad_request("name is required"));
    }
    let mut household = Household::new(id_or_new(req.id), req.name);
    let cash = state.repo.create_household(&mut household).await?;
    info!(household_id = %household.id, cash_account_id = %cash.id, "household created");
    Ok((StatusCode::CREATED, Json(household)))
}

/// `GET /households/:household_id/sync?month=YYYY-MM`
///
/// Everything the app needs to render a month; no `month` means the current one.
pub async fn sync(
    State(state): State<AppState>,
    session: Session,
    Query(q): Query<MonthQuery>,
) -> ApiResult<Json<SyncResponse>> {
    let period = match q.month.as_deref() {
        Some(month) => parse_month(month)?,
        None => current_month(Utc::now()),
    };
    let repo = &state.repo;
    Ok(Json(SyncResponse {
        accounts: repo.list_in_household(&session.household_id).await?,
        categories: repo.list_in_household(&session.household_id).await?,
        transactions: repo.transactions(&session.household_id, Some(period)).await?,
    }))
}

/// `GET /households/:household_id/members`: active users, then pending invitations.
pub async fn members(
    State(state): State<AppState>,
    session: Session,
) -> ApiResult<Json<Vec<MemberResponse>>> {
    let users: Vec<User> = state.repo.list_in_household(&session.household_id).await?;
    let invitations = state.repo.pending_invitations(&session.household_id).await?;

    let active = users.into_iter().map(|u| MemberResponse {
        id: u.id,
        name: u.name.into_inner(),
        email: u.email.as_str().to_owned(),
        picture_url: u.picture_url,
        color: u.color,
        status: "active".into(),
        invite_code: None,
    });
    let pending = invitations.into_iter().map(|inv| MemberResponse {
        id: inv.id,
        name: PENDING_MEMBER_NAME.into(),
        email: inv.email.as_str().to_owned(),
        picture_url: String::new(),
        color: String::new(),
        status: "pending".into(),
        invite_code: Some(inv.code),
    });
    Ok(Json(active.chain(pending).collect()))
}

/// `DELETE /households/:household_id/members/:member_id`
///
/// `member_id` may name a pending invitation or a user.
pub async fn remove_member(
    State(state): State<AppState>,
    session: Session,
    Path((_, member_id)): Path<(String, String)>,
) -> ApiResult<Json<MessageResponse>> {
    let repo = &state.repo;
    let hh = session.household_id.as_str();

    if repo.find_in_household::<Invitation>(hh, &member_id).await?.is_some() {
        repo.soft_delete::<Invitation>(hh, &member_id).await?;
        info!(household_id = %hh, invitation_id = %member_id, "invitation revoked");
        return Ok(Json(MessageResponse::new("Invitation removed")));
    }
    if repo.find_in_household::<User>(hh, &member_id).await?.is_some() {
        repo.soft_delete::<User>(hh, &member_id).await?;
        info!(household_id = %hh, user_id = %member_id, removed_by = %session.user_id, "member removed");
        return Ok(Json(MessageResponse::new("Member removed")));
    }
    Err(ApiError::not_found("Member or invitation not found"))
}

/// `POST /households/:household_id/invitations`
pub async fn create_invitation(
    State(state): State<AppState>,
    session: Session,
    AppJson(req): AppJson<InvitationRequest>,
) -> ApiResult<(StatusCode, Json<Invitation>)> {
    let email = req.email.trim();
    if !is_valid_address(email) {
        return Err(ApiError::bad_request("Invalid email address"));
    }

    let repo = &state.repo;
    if repo
        .find_pending_invitation_by_email(&session.household_id, email)
        .await?
        .is_some()
    {
        return Err(ApiError::conflict("Invitation already pending for this email"));
    }

    let mut invitation = Invitation::new(repo.crypto(), new_id(), &session.household_id, email)?;
    repo.insert(&mut invitation).await?;
    info!(
        household_id = %invitation.household_id,
        invitation_id = %invitation.id,
        invited_by = %session.user_id,
        "invitation created"
    );

    dispatch_invitation(state.mailer.clone(), email.to_owned(), invitation.code.clone());
    Ok((StatusCode::CREATED, Json(invitation)))
}
