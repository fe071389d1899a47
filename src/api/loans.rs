//! Loan lifecycle endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::NaiveDate;
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};

use crate::{
    error::AppResult,
    models::loan::{CreateLoan, Loan, LoanReport, LoanSummary},
};

/// Create loan request
#[derive(Deserialize, ToSchema)]
pub struct CreateLoanRequest {
    /// Borrower ID
    pub user_id: i32,
    /// Stock copy to borrow
    pub stock_copy_id: i32,
    /// Loan date; defaults to today
    pub loaned_on: Option<NaiveDate>,
    /// Due date; defaults to the loan date plus the configured duration
    pub due_on: Option<NaiveDate>,
}

/// Return query parameters
#[derive(Deserialize, IntoParams)]
pub struct ReturnQuery {
    /// Return date; defaults to today
    pub returned_on: Option<NaiveDate>,
}

/// Create a new loan (borrow an item)
#[utoipa::path(
    post,
    path = "/loans",
    tag = "loans",
    request_body = CreateLoanRequest,
    responses(
        (status = 201, description = "Loan created", body = Loan),
        (status = 400, description = "Invalid dates"),
        (status = 403, description = "User has an active penalty"),
        (status = 404, description = "User or stock copy not found"),
        (status = 409, description = "Stock copy already on loan")
    )
)]
pub async fn create_loan(
    State(state): State<crate::AppState>,
    Json(request): Json<CreateLoanRequest>,
) -> AppResult<(StatusCode, Json<Loan>)> {
    let loan = state
        .services
        .circulation
        .create_loan(CreateLoan {
            user_id: request.user_id,
            stock_copy_id: request.stock_copy_id,
            loaned_on: request.loaned_on,
            due_on: request.due_on,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(loan)))
}

/// Return a borrowed item
#[utoipa::path(
    post,
    path = "/loans/{id}/return",
    tag = "loans",
    params(
        ("id" = i32, Path, description = "Loan ID"),
        ReturnQuery
    ),
    responses(
        (status = 200, description = "Item returned", body = Loan),
        (status = 400, description = "Return date before the loan date"),
        (status = 404, description = "Loan not found"),
        (status = 409, description = "Already returned")
    )
)]
pub async fn return_loan(
    State(state): State<crate::AppState>,
    Path(loan_id): Path<i32>,
    Query(query): Query<ReturnQuery>,
) -> AppResult<Json<Loan>> {
    let loan = state
        .services
        .circulation
        .return_item(loan_id, query.returned_on)
        .await?;

    Ok(Json(loan))
}

/// Get a loan by ID
#[utoipa::path(
    get,
    path = "/loans/{id}",
    tag = "loans",
    params(
        ("id" = i32, Path, description = "Loan ID")
    ),
    responses(
        (status = 200, description = "Loan", body = Loan),
        (status = 404, description = "Loan not found")
    )
)]
pub async fn get_loan(
    State(state): State<crate::AppState>,
    Path(loan_id): Path<i32>,
) -> AppResult<Json<Loan>> {
    let loan = state.services.circulation.get_loan(loan_id).await?;
    Ok(Json(loan))
}

/// Get all open loans
#[utoipa::path(
    get,
    path = "/loans/open",
    tag = "loans",
    responses(
        (status = 200, description = "Open loans", body = Vec<LoanSummary>)
    )
)]
pub async fn list_open_loans(
    State(state): State<crate::AppState>,
) -> AppResult<Json<Vec<LoanSummary>>> {
    let loans = state.services.circulation.open_loans().await?;
    Ok(Json(loans))
}

/// Get open loans past their due date
#[utoipa::path(
    get,
    path = "/loans/overdue",
    tag = "loans",
    responses(
        (status = 200, description = "Overdue loans", body = Vec<LoanSummary>)
    )
)]
pub async fn list_overdue_loans(
    State(state): State<crate::AppState>,
) -> AppResult<Json<Vec<LoanSummary>>> {
    let loans = state.services.circulation.overdue_loans().await?;
    Ok(Json(loans))
}

/// Get aggregate loan counts
#[utoipa::path(
    get,
    path = "/loans/report",
    tag = "loans",
    responses(
        (status = 200, description = "Loan counts", body = LoanReport)
    )
)]
pub async fn loan_report(
    State(state): State<crate::AppState>,
) -> AppResult<Json<LoanReport>> {
    let report = state.services.circulation.report().await?;
    Ok(Json(report))
}

/// Get open loans for a specific user
#[utoipa::path(
    get,
    path = "/users/{id}/loans",
    tag = "loans",
    params(
        ("id" = i32, Path, description = "User ID")
    ),
    responses(
        (status = 200, description = "User's open loans", body = Vec<LoanSummary>),
        (status = 404, description = "User not found")
    )
)]
pub async fn get_user_loans(
    State(state): State<crate::AppState>,
    Path(user_id): Path<i32>,
) -> AppResult<Json<Vec<LoanSummary>>> {
    let loans = state.services.circulation.user_loans(user_id).await?;
    Ok(Json(loans))
}
