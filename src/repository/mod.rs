//! Repository layer for database operations

pub mod loans;
pub mod penalties;
pub mod stock;
pub mod users;

use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::{Pool, Postgres};

use crate::{
    error::AppResult,
    models::{Loan, LoanReport, LoanSummary, NewLoan, NewPenalty, Penalty, StockCopy},
};

/// Storage operations the circulation service depends on.
///
/// The service is constructed over this trait rather than a concrete pool so
/// the business rules can be tested against a mock store. `Repository` is the
/// PostgreSQL implementation.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CirculationStore: Send + Sync {
    async fn user_exists(&self, id: i32) -> AppResult<bool>;

    async fn stock_copy(&self, id: i32) -> AppResult<Option<StockCopy>>;

    /// Is there an open loan (null return date) for this copy?
    async fn has_open_loan(&self, stock_copy_id: i32) -> AppResult<bool>;

    /// Does the user hold a penalty that is indefinite or ends after `on`?
    async fn has_active_penalty(&self, user_id: i32, on: NaiveDate) -> AppResult<bool>;

    /// Insert a loan row. Fails with `Conflict` when the copy already has an
    /// open loan (enforced by a partial unique index, so concurrent creates
    /// cannot both succeed).
    async fn insert_loan(&self, loan: NewLoan) -> AppResult<Loan>;

    async fn loan(&self, id: i32) -> AppResult<Option<Loan>>;

    /// Set the loan's return date and insert the penalty, if any, in one
    /// transaction. Fails with `Conflict` when the loan is already returned.
    async fn record_return(
        &self,
        loan_id: i32,
        returned_on: NaiveDate,
        penalty: Option<NewPenalty>,
    ) -> AppResult<()>;

    async fn open_loans(&self, as_of: NaiveDate) -> AppResult<Vec<LoanSummary>>;

    async fn overdue_loans(&self, as_of: NaiveDate) -> AppResult<Vec<LoanSummary>>;

    async fn user_loans(&self, user_id: i32, as_of: NaiveDate) -> AppResult<Vec<LoanSummary>>;

    async fn user_penalties(&self, user_id: i32) -> AppResult<Vec<Penalty>>;

    async fn loan_report(&self, as_of: NaiveDate) -> AppResult<LoanReport>;
}

/// Main repository struct holding database connection pool
#[derive(Clone)]
pub struct Repository {
    pub pool: Pool<Postgres>,
    pub loans: loans::LoansRepository,
    pub penalties: penalties::PenaltiesRepository,
    pub stock: stock::StockRepository,
    pub users: users::UsersRepository,
}

impl Repository {
    /// Create a new repository with the given database pool
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self {
            loans: loans::LoansRepository::new(pool.clone()),
            penalties: penalties::PenaltiesRepository::new(pool.clone()),
            stock: stock::StockRepository::new(pool.clone()),
            users: users::UsersRepository::new(pool.clone()),
            pool,
        }
    }
}

#[async_trait]
impl CirculationStore for Repository {
    async fn user_exists(&self, id: i32) -> AppResult<bool> {
        self.users.exists(id).await
    }

    async fn stock_copy(&self, id: i32) -> AppResult<Option<StockCopy>> {
        self.stock.get_by_id(id).await
    }

    async fn has_open_loan(&self, stock_copy_id: i32) -> AppResult<bool> {
        self.loans.has_open_loan(stock_copy_id).await
    }

    async fn has_active_penalty(&self, user_id: i32, on: NaiveDate) -> AppResult<bool> {
        self.penalties.has_active(user_id, on).await
    }

    async fn insert_loan(&self, loan: NewLoan) -> AppResult<Loan> {
        self.loans.create(&loan).await
    }

    async fn loan(&self, id: i32) -> AppResult<Option<Loan>> {
        self.loans.get_by_id(id).await
    }

    async fn record_return(
        &self,
        loan_id: i32,
        returned_on: NaiveDate,
        penalty: Option<NewPenalty>,
    ) -> AppResult<()> {
        self.loans.record_return(loan_id, returned_on, penalty).await
    }

    async fn open_loans(&self, as_of: NaiveDate) -> AppResult<Vec<LoanSummary>> {
        self.loans.open_loans(as_of).await
    }

    async fn overdue_loans(&self, as_of: NaiveDate) -> AppResult<Vec<LoanSummary>> {
        self.loans.overdue_loans(as_of).await
    }

    async fn user_loans(&self, user_id: i32, as_of: NaiveDate) -> AppResult<Vec<LoanSummary>> {
        self.loans.user_loans(user_id, as_of).await
    }

    async fn user_penalties(&self, user_id: i32) -> AppResult<Vec<Penalty>> {
        self.penalties.for_user(user_id).await
    }

    async fn loan_report(&self, as_of: NaiveDate) -> AppResult<LoanReport> {
        self.loans.report(as_of).await
    }
}
