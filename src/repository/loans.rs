//! Loans repository for database operations

use chrono::NaiveDate;
use sqlx::{postgres::PgRow, Pool, Postgres, Row};

use crate::{
    error::{AppError, AppResult},
    models::{
        loan::{Loan, LoanReport, LoanSummary, NewLoan},
        penalty::NewPenalty,
        user::UserShort,
    },
};

const SUMMARY_SELECT: &str = r#"
    SELECT l.id, l.loaned_on, l.due_on, l.returned_on, l.stock_copy_id,
           s.condition, t.name AS title, t.media_type,
           u.id AS user_id, u.name AS user_name, u.email AS user_email
    FROM loans l
    JOIN users u ON l.user_id = u.id
    JOIN stock_copies s ON l.stock_copy_id = s.id
    JOIN titles t ON s.title_id = t.id
"#;

#[derive(Clone)]
pub struct LoansRepository {
    pool: Pool<Postgres>,
}

impl LoansRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Get loan by ID
    pub async fn get_by_id(&self, id: i32) -> AppResult<Option<Loan>> {
        let loan = sqlx::query_as::<_, Loan>(
            "SELECT id, loaned_on, due_on, returned_on, stock_copy_id, user_id FROM loans WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(loan)
    }

    /// Check if a stock copy currently has an open loan.
    ///
    /// Availability is always derived from loan rows, never from a flag on
    /// the copy that could drift out of sync.
    pub async fn has_open_loan(&self, stock_copy_id: i32) -> AppResult<bool> {
        let borrowed: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM loans WHERE stock_copy_id = $1 AND returned_on IS NULL)",
        )
        .bind(stock_copy_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(borrowed)
    }

    /// Insert a new loan row and return it with its generated id.
    ///
    /// The uq_loans_open_copy partial unique index rejects a second open loan
    /// for the same copy; that violation surfaces as a Conflict so racing
    /// creates resolve to one success and one conflict.
    pub async fn create(&self, loan: &NewLoan) -> AppResult<Loan> {
        let result = sqlx::query_scalar::<_, i32>(
            r#"
            INSERT INTO loans (loaned_on, due_on, returned_on, stock_copy_id, user_id)
            VALUES ($1, $2, NULL, $3, $4)
            RETURNING id
            "#,
        )
        .bind(loan.loaned_on)
        .bind(loan.due_on)
        .bind(loan.stock_copy_id)
        .bind(loan.user_id)
        .fetch_one(&self.pool)
        .await;

        let id = match result {
            Ok(id) => id,
            Err(sqlx::Error::Database(e)) if e.constraint() == Some("uq_loans_open_copy") => {
                return Err(AppError::Conflict("item already on loan".to_string()));
            }
            Err(e) => return Err(e.into()),
        };

        Ok(Loan {
            id,
            loaned_on: loan.loaned_on,
            due_on: loan.due_on,
            returned_on: None,
            stock_copy_id: loan.stock_copy_id,
            user_id: loan.user_id,
        })
    }

    /// Set the return date and insert the penalty, if any, atomically.
    ///
    /// The update only matches a still-open loan, so a concurrent return of
    /// the same loan sees zero rows and fails with Conflict; the penalty is
    /// then never inserted twice.
    pub async fn record_return(
        &self,
        loan_id: i32,
        returned_on: NaiveDate,
        penalty: Option<NewPenalty>,
    ) -> AppResult<()> {
        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query(
            "UPDATE loans SET returned_on = $2 WHERE id = $1 AND returned_on IS NULL",
        )
        .bind(loan_id)
        .bind(returned_on)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        if updated == 0 {
            return Err(AppError::Conflict("loan already returned".to_string()));
        }

        if let Some(p) = penalty {
            sqlx::query(
                r#"
                INSERT INTO penalties (description, ends_on, user_id, loan_id)
                VALUES ($1, $2, $3, $4)
                "#,
            )
            .bind(&p.description)
            .bind(p.ends_on)
            .bind(p.user_id)
            .bind(p.loan_id)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        Ok(())
    }

    /// Get all open loans with borrower and title details
    pub async fn open_loans(&self, as_of: NaiveDate) -> AppResult<Vec<LoanSummary>> {
        let rows = sqlx::query(&format!(
            "{SUMMARY_SELECT} WHERE l.returned_on IS NULL ORDER BY l.loaned_on DESC, l.id DESC"
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|row| summary_from_row(&row, as_of)).collect())
    }

    /// Get open loans past their due date, most overdue first
    pub async fn overdue_loans(&self, as_of: NaiveDate) -> AppResult<Vec<LoanSummary>> {
        let rows = sqlx::query(&format!(
            "{SUMMARY_SELECT} WHERE l.returned_on IS NULL AND l.due_on < $1 ORDER BY l.due_on, l.id"
        ))
        .bind(as_of)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|row| summary_from_row(&row, as_of)).collect())
    }

    /// Get open loans for a user
    pub async fn user_loans(&self, user_id: i32, as_of: NaiveDate) -> AppResult<Vec<LoanSummary>> {
        let rows = sqlx::query(&format!(
            "{SUMMARY_SELECT} WHERE l.user_id = $1 AND l.returned_on IS NULL ORDER BY l.due_on, l.id"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|row| summary_from_row(&row, as_of)).collect())
    }

    /// Aggregate loan counts
    pub async fn report(&self, as_of: NaiveDate) -> AppResult<LoanReport> {
        let row = sqlx::query(
            r#"
            SELECT COUNT(*) AS total,
                   COUNT(*) FILTER (WHERE returned_on IS NULL) AS open,
                   COUNT(*) FILTER (WHERE returned_on IS NULL AND due_on < $1) AS overdue,
                   COUNT(*) FILTER (WHERE returned_on IS NOT NULL) AS returned
            FROM loans
            "#,
        )
        .bind(as_of)
        .fetch_one(&self.pool)
        .await?;

        Ok(LoanReport {
            total: row.get("total"),
            open: row.get("open"),
            overdue: row.get("overdue"),
            returned: row.get("returned"),
        })
    }
}

fn summary_from_row(row: &PgRow, as_of: NaiveDate) -> LoanSummary {
    let due_on: Option<NaiveDate> = row.get("due_on");
    let returned_on: Option<NaiveDate> = row.get("returned_on");

    LoanSummary {
        id: row.get("id"),
        loaned_on: row.get("loaned_on"),
        due_on,
        returned_on,
        stock_copy_id: row.get("stock_copy_id"),
        condition: row.get("condition"),
        title: row.get("title"),
        media_type: row.get("media_type"),
        user: UserShort {
            id: row.get("user_id"),
            name: row.get("user_name"),
            email: row.get("user_email"),
        },
        is_overdue: returned_on.is_none() && due_on.map(|d| d < as_of).unwrap_or(false),
    }
}
