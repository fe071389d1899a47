//! Penalties repository for database operations

use chrono::NaiveDate;
use sqlx::{Pool, Postgres};

use crate::{error::AppResult, models::penalty::Penalty};

#[derive(Clone)]
pub struct PenaltiesRepository {
    pool: Pool<Postgres>,
}

impl PenaltiesRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Check if a user holds a penalty that is indefinite or still running.
    ///
    /// This existence query is the single source of truth for borrower
    /// eligibility; there is no blocked flag on the user row.
    pub async fn has_active(&self, user_id: i32, on: NaiveDate) -> AppResult<bool> {
        let active: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM penalties
                WHERE user_id = $1 AND (ends_on IS NULL OR ends_on > $2)
            )
            "#,
        )
        .bind(user_id)
        .bind(on)
        .fetch_one(&self.pool)
        .await?;

        Ok(active)
    }

    /// Get all penalties recorded for a user
    pub async fn for_user(&self, user_id: i32) -> AppResult<Vec<Penalty>> {
        let penalties = sqlx::query_as::<_, Penalty>(
            "SELECT id, description, ends_on, user_id, loan_id FROM penalties WHERE user_id = $1 ORDER BY id",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(penalties)
    }
}
