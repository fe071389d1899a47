//! OpenAPI documentation

use axum::Router;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::api::{health, loans, penalties, stock};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Circulation API",
        version = "0.1.0",
        description = "Library circulation REST API: loans, returns and penalties"
    ),
    servers(
        (url = "/api/v1", description = "API v1")
    ),
    paths(
        // Health
        health::health_check,
        health::readiness_check,
        // Loans
        loans::create_loan,
        loans::return_loan,
        loans::get_loan,
        loans::list_open_loans,
        loans::list_overdue_loans,
        loans::loan_report,
        loans::get_user_loans,
        // Penalties
        penalties::get_user_penalties,
        penalties::check_eligibility,
        // Stock
        stock::check_availability,
    ),
    components(
        schemas(
            // Loans
            loans::CreateLoanRequest,
            crate::models::loan::Loan,
            crate::models::loan::LoanSummary,
            crate::models::loan::LoanReport,
            // Penalties
            crate::models::penalty::Penalty,
            crate::models::penalty::PenaltyStatus,
            penalties::EligibilityResponse,
            // Stock
            crate::models::stock_copy::StockCopy,
            stock::AvailabilityResponse,
            // Users
            crate::models::user::UserShort,
            // Health
            health::HealthResponse,
            // Errors
            crate::error::ErrorResponse,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "loans", description = "Loan lifecycle"),
        (name = "penalties", description = "Penalties and borrower eligibility"),
        (name = "stock", description = "Stock copy availability")
    )
)]
pub struct ApiDoc;

/// Create the OpenAPI documentation router
pub fn create_openapi_router() -> Router {
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}
