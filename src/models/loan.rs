//! Loan (borrow) model and related types

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

use super::user::UserShort;

/// Loan model from database
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Loan {
    pub id: i32,
    pub loaned_on: NaiveDate,
    pub due_on: Option<NaiveDate>,
    pub returned_on: Option<NaiveDate>,
    pub stock_copy_id: i32,
    pub user_id: i32,
}

impl Loan {
    /// An open loan past its due date counts as overdue.
    pub fn is_overdue(&self, on: NaiveDate) -> bool {
        self.returned_on.is_none() && self.due_on.is_some_and(|due| due < on)
    }
}

/// Create loan request accepted by the circulation service
#[derive(Debug, Clone, Deserialize)]
pub struct CreateLoan {
    pub user_id: i32,
    pub stock_copy_id: i32,
    /// Defaults to the current date
    pub loaned_on: Option<NaiveDate>,
    /// Defaults to the loan date plus the configured loan duration
    pub due_on: Option<NaiveDate>,
}

/// Resolved loan row ready for insertion
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewLoan {
    pub loaned_on: NaiveDate,
    pub due_on: Option<NaiveDate>,
    pub stock_copy_id: i32,
    pub user_id: i32,
}

/// Loan with borrower and title details for display
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LoanSummary {
    pub id: i32,
    pub loaned_on: NaiveDate,
    pub due_on: Option<NaiveDate>,
    pub returned_on: Option<NaiveDate>,
    pub stock_copy_id: i32,
    pub condition: Option<String>,
    pub title: String,
    pub media_type: Option<String>,
    pub user: UserShort,
    pub is_overdue: bool,
}

/// Aggregate loan counts
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LoanReport {
    pub total: i64,
    pub open: i64,
    pub overdue: i64,
    pub returned: i64,
}
