//! Transaction CRUD.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use common::protocol::{MessageResponse, MonthQuery, TransactionRequest};

use super::parse_month;
use crate::auth::Session;
use crate::error::{ApiError, ApiResult, AppJson};
use crate::models::{id_or_new, Transaction};
use crate::server::state::AppState;

/// `GET .../transactions?month=YYYY-MM`, newest first.
pub async fn list_transactions(
    State(state): State<AppState>,
    session: Session,
    Query(q): Query<MonthQuery>,
) -> ApiResult<Json<Vec<Transaction>>> {
    let period = q.month.as_deref().map(parse_month).transpose()?;
    Ok(Json(state.repo.transactions(&session.household_id, period).await?))
}

/// The author is always the caller, whatever the body says.
pub async fn create_transaction(
    State(state): State<AppState>,
    session: Session,
    AppJson(req): AppJson<TransactionRequest>,
) -> ApiResult<(StatusCode, Json<Transaction>)> {
    let repo = &state.repo;
    let mut tx = Transaction::new(
        repo.crypto(),
        id_or_new(req.id),
        session.household_id,
        req.account_id,
        req.category_id,
        session.user_id,
        req.amount,
        req.date,
        &req.note,
    )?;
    repo.insert(&mut tx).await?;
    repo.attach_author(&mut tx).await?;
    Ok((StatusCode::CREATED, Json(tx)))
}

pub async fn update_transaction(
    State(state): State<AppState>,
    session: Session,
    Path((_, id)): Path<(String, String)>,
    AppJson(req): AppJson<TransactionRequest>,
) -> ApiResult<Json<Transaction>> {
    let repo = &state.repo;
    let mut tx: Transaction = repo
        .find_in_household(&session.household_id, &id)
        .await?
        .ok_or_else(|| ApiError::not_found("Transaction not found"))?;

    tx.account_id = req.account_id;
    tx.category_id = req.category_id;
    tx.amount = req.amount;
    tx.date = req.date;
    tx.set_note(repo.crypto(), &req.note)?;
    repo.update(&mut tx).await?;
    repo.attach_author(&mut tx).await?;
    Ok(Json(tx))
}

pub async fn delete_transaction(
    State(state): State<AppState>,
    session: Session,
    Path((_, id)): Path<(String, String)>,
) -> ApiResult<Json<MessageResponse>> {
    state
        .repo
        .soft_delete::<Transaction>(&session.household_id, &id)
        .await?;
    Ok(Json(MessageResponse::new("Transaction deleted")))
}
