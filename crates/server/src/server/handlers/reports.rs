//! Monthly summary and budget recommendations.

use axum::{
    extract::{Path, State},
    Json,
};
use chrono::Utc;
use common::protocol::{CategorySummary, MonthlySummary, RecommendationsResponse, Suggestion};

use super::{parse_month, previous_month};
use crate::auth::Session;
use crate::error::ApiResult;
use crate::models::Category;
use crate::server::state::AppState;

/// Relative deviation from budget above which an adjustment is suggested.
const DEVIATION_THRESHOLD: f64 = 0.1;

/// `GET .../summary/:month`
pub async fn summary(
    State(state): State<AppState>,
    session: Session,
    Path((_, month)): Path<(String, String)>,
) -> ApiResult<Json<MonthlySummary>> {
    let period = parse_month(&month)?;
    let categories: Vec<Category> = state.repo.list_in_household(&session.household_id).await?;

    let mut lines = Vec::with_capacity(categories.len());
    for category in categories {
        let spent = state
            .repo
            .spent_in_category(&session.household_id, &category.id, period)
            .await?;
        lines.push(CategorySummary {
            remaining: category.monthly_budget - spent,
            budget: category.monthly_budget,
            spent,
            name: category.name.into_inner(),
            id: category.id,
        });
    }

    Ok(Json(MonthlySummary {
        month,
        total_budget: lines.iter().map(|l| l.budget).sum(),
        total_spent: lines.iter().map(|l| l.spent).sum(),
        categories: lines,
    }))
}

/// `GET .../recommendations`: suggestions from the previous calendar month.
pub async fn recommendations(
    State(state): State<AppState>,
    session: Session,
) -> ApiResult<Json<RecommendationsResponse>> {
    let period = previous_month(Utc::now());
    let categories: Vec<Category> = state.repo.list_in_household(&session.household_id).await?;

    let mut suggestions = Vec::new();
    for category in &categories {
        let spent = state
            .repo
            .spent_in_category(&session.household_id, &category.id, period)
            .await?;
        suggestions.extend(suggest(category, spent));
    }
    Ok(Json(RecommendationsResponse { suggestions }))
}

/// Suggest moving the budget to what was actually spent, rounded to the
/// nearest 10, when spending strayed more than 10% from it.
fn suggest(category: &Category, spent: f64) -> Option<Suggestion> {
    let budget = category.monthly_budget;
    if budget == 0.0 {
        return None;
    }
    let deviation = (spent - budget) / budget;
    if deviation.abs() <= DEVIATION_THRESHOLD {
        return None;
    }
    let action = if spent >= budget { "increase" } else { "decrease" };
    Some(Suggestion {
        category_id: category.id.clone(),
        category: category.name.as_str().to_owned(),
        action: action.into(),
        amount: (spent / 10.0).round() * 10.0,
    })
}
