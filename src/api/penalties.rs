//! Penalty and eligibility endpoints

use axum::{
    extract::{Path, State},
    Json,
};
use serde::Serialize;
use utoipa::ToSchema;

use crate::{error::AppResult, models::penalty::PenaltyStatus};

/// Borrower eligibility response
#[derive(Serialize, ToSchema)]
pub struct EligibilityResponse {
    pub user_id: i32,
    /// False while the user holds an active penalty
    pub eligible: bool,
}

/// Get a user's penalties
#[utoipa::path(
    get,
    path = "/users/{id}/penalties",
    tag = "penalties",
    params(
        ("id" = i32, Path, description = "User ID")
    ),
    responses(
        (status = 200, description = "User's penalties", body = Vec<PenaltyStatus>),
        (status = 404, description = "User not found")
    )
)]
pub async fn get_user_penalties(
    State(state): State<crate::AppState>,
    Path(user_id): Path<i32>,
) -> AppResult<Json<Vec<PenaltyStatus>>> {
    let penalties = state.services.circulation.user_penalties(user_id).await?;
    Ok(Json(penalties))
}

/// Check whether a user may take out a new loan
#[utoipa::path(
    get,
    path = "/users/{id}/eligibility",
    tag = "penalties",
    params(
        ("id" = i32, Path, description = "User ID")
    ),
    responses(
        (status = 200, description = "Eligibility", body = EligibilityResponse),
        (status = 404, description = "User not found")
    )
)]
pub async fn check_eligibility(
    State(state): State<crate::AppState>,
    Path(user_id): Path<i32>,
) -> AppResult<Json<EligibilityResponse>> {
    let penalized = state.services.circulation.has_active_penalty(user_id).await?;

    Ok(Json(EligibilityResponse {
        user_id,
        eligible: !penalized,
    }))
}
