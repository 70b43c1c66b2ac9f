//! Account CRUD.
//!
//! Each household has exactly one cash account. It is created with the
//! household and can be neither edited, deleted, nor duplicated.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use common::protocol::{AccountRequest, MessageResponse};

use crate::auth::Session;
use crate::db::SecretString;
use crate::error::{ApiError, ApiResult, AppJson};
use crate::models::{id_or_new, Account, AccountKind};
use crate::server::state::AppState;

fn parse_kind(kind: &str) -> Result<AccountKind, ApiError> {
    kind.parse()
        .map_err(|_| ApiError::bad_request("Invalid account type. Use cash, bank or card"))
}

fn optional(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

async fn find_account(state: &AppState, session: &Session, id: &str) -> Result<Account, ApiError> {
    state
        .repo
        .find_in_household(&session.household_id, id)
        .await?
        .ok_or_else(|| ApiError::not_found("Account not found"))
}

pub async fn list_accounts(
    State(state): State<AppState>,
    session: Session,
) -> ApiResult<Json<Vec<Account>>> {
    Ok(Json(state.repo.list_in_household(&session.household_id).await?))
}

pub async fn create_account(
    State(state): State<AppState>,
    session: Session,
    AppJson(req): AppJson<AccountRequest>,
) -> ApiResult<(StatusCode, Json<Account>)> {
    let kind = parse_kind(&req.kind)?;
    if kind == AccountKind::Cash && state.repo.count_cash_accounts(&session.household_id).await? > 0 {
        return Err(ApiError::bad_request("Cannot create additional cash accounts"));
    }

    let mut account = Account {
        id: id_or_new(req.id),
        household_id: session.household_id,
        kind,
        name: SecretString::new(req.name),
        brand: optional(req.brand),
        bank: optional(req.bank),
        timestamps: Default::default(),
    };
    state.repo.insert(&mut account).await?;
    Ok((StatusCode::CREATED, Json(account)))
}

pub async fn update_account(
    State(state): State<AppState>,
    session: Session,
    Path((_, id)): Path<(String, String)>,
    AppJson(req): AppJson<AccountRequest>,
) -> ApiResult<Json<Account>> {
    let mut account = find_account(&state, &session, &id).await?;
    if account.kind == AccountKind::Cash {
        return Err(ApiError::forbidden("Cannot edit mandatory cash account"));
    }
    let kind = parse_kind(&req.kind)?;
    if kind == AccountKind::Cash {
        return Err(ApiError::bad_request("Cannot create additional cash accounts"));
    }

    account.kind = kind;
    account.name = SecretString::new(req.name);
    account.brand = optional(req.brand);
    account.bank = optional(req.bank);
    state.repo.update(&mut account).await?;
    Ok(Json(account))
}

pub async fn delete_account(
    State(state): State<AppState>,
    session: Session,
    Path((_, id)): Path<(String, String)>,
) -> ApiResult<Json<MessageResponse>> {
    let account = find_account(&state, &session, &id).await?;
    if account.kind == AccountKind::Cash {
        return Err(ApiError::forbidden("Cannot delete mandatory cash account"));
    }
    state
        .repo
        .soft_delete::<Account>(&session.household_id, &account.id)
        .await?;
    Ok(Json(MessageResponse::new("Account deleted")))
}
