//! Stock copies repository for database operations

use sqlx::{Pool, Postgres};

use crate::{error::AppResult, models::stock_copy::StockCopy};

#[derive(Clone)]
pub struct StockRepository {
    pool: Pool<Postgres>,
}

impl StockRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Get stock copy by ID
    pub async fn get_by_id(&self, id: i32) -> AppResult<Option<StockCopy>> {
        let copy = sqlx::query_as::<_, StockCopy>(
            "SELECT id, condition, title_id, library_id FROM stock_copies WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(copy)
    }
}
