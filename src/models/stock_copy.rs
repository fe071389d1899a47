//! Stock copy model

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

/// One physical or digital copy of a title held by a library.
///
/// Stock is owned by inventory management; the circulation service only ever
/// reads these rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct StockCopy {
    pub id: i32,
    pub condition: Option<String>,
    pub title_id: i32,
    pub library_id: i32,
}
