//! Stock copy availability endpoint

use axum::{
    extract::{Path, State},
    Json,
};
use serde::Serialize;
use utoipa::ToSchema;

use crate::error::AppResult;

/// Availability response
#[derive(Serialize, ToSchema)]
pub struct AvailabilityResponse {
    pub stock_copy_id: i32,
    /// True when the copy has no open loan
    pub available: bool,
}

/// Check whether a stock copy can be borrowed
#[utoipa::path(
    get,
    path = "/stock-copies/{id}/availability",
    tag = "stock",
    params(
        ("id" = i32, Path, description = "Stock copy ID")
    ),
    responses(
        (status = 200, description = "Availability", body = AvailabilityResponse),
        (status = 404, description = "Stock copy not found")
    )
)]
pub async fn check_availability(
    State(state): State<crate::AppState>,
    Path(stock_copy_id): Path<i32>,
) -> AppResult<Json<AvailabilityResponse>> {
    let available = state.services.circulation.is_available(stock_copy_id).await?;

    Ok(Json(AvailabilityResponse {
        stock_copy_id,
        available,
    }))
}
