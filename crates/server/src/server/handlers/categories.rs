//! Category CRUD and note suggestions.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use common::protocol::{CategoryRequest, MessageResponse};

use crate::auth::Session;
use crate::db::SecretString;
use crate::error::{ApiError, ApiResult, AppJson};
use crate::models::{id_or_new, Category};
use crate::server::state::AppState;

/// Most suggestions returned for one category.
pub const SUGGESTED_NOTES_LIMIT: usize = 50;

pub async fn list_categories(
    State(state): State<AppState>,
    session: Session,
) -> ApiResult<Json<Vec<Category>>> {
    Ok(Json(state.repo.list_in_household(&session.household_id).await?))
}

pub async fn create_category(
    State(state): State<AppState>,
    session: Session,
    AppJson(req): AppJson<CategoryRequest>,
) -> ApiResult<(StatusCode, Json<Category>)> {
    if req.name.trim().is_empty() {
        return Err(ApiError::bad_request("name is required"));
    }
    let mut category = Category::new(
        id_or_new(req.id),
        session.household_id,
        req.name,
        req.monthly_budget,
    );
    category.is_active = req.is_active;
    state.repo.insert(&mut category).await?;
    Ok((StatusCode::CREATED, Json(category)))
}

pub async fn update_category(
    State(state): State<AppState>,
    session: Session,
    Path((_, id)): Path<(String, String)>,
    AppJson(req): AppJson<CategoryRequest>,
) -> ApiResult<Json<Category>> {
    let mut category: Category = state
        .repo
        .find_in_household(&session.household_id, &id)
        .await?
        .ok_or_else(|| ApiError::not_found("Category not found"))?;

    if !req.name.trim().is_empty() {
        category.name = SecretString::new(req.name);
    }
    category.monthly_budget = req.monthly_budget;
    category.is_active = req.is_active;
    state.repo.update(&mut category).await?;
    Ok(Json(category))
}

pub async fn delete_category(
    State(state): State<AppState>,
    session: Session,
    Path((_, id)): Path<(String, String)>,
) -> ApiResult<Json<MessageResponse>> {
    state
        .repo
        .soft_delete::<Category>(&session.household_id, &id)
        .await?;
    Ok(Json(MessageResponse::new("Category deleted")))
}

/// `GET .../categories/:id/suggested-notes`: notes previously used in the category.
pub async fn suggested_notes(
    State(state): State<AppState>,
    session: Session,
    Path((_, id)): Path<(String, String)>,
) -> ApiResult<Json<Vec<String>>> {
    let notes = state
        .repo
        .suggested_notes(&session.household_id, &id, SUGGESTED_NOTES_LIMIT)
        .await?;
    Ok(Json(notes))
}
