//! The `article` record.

use crate::error::DbResult;
use crate::row::{FromRow, RowExt};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use tokio_postgres::Row;

/// One row of the `article` table.
///
/// Decoded from the columns `id`, `title`, `body`, `isBlind`, `createdDate`
/// and `modifiedDate`; extra columns are ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Article {
    pub id: i64,
    pub title: String,
    pub body: String,
    pub is_blind: bool,
    pub created_date: NaiveDateTime,
    pub modified_date: NaiveDateTime,
}

impl FromRow for Article {
    fn from_row(row: &Row) -> DbResult<Self> {
        Ok(Self {
            id: row.try_get_long("id")?,
            title: row.try_get_column("title")?,
            body: row.try_get_column("body")?,
            is_blind: row.try_get_column("isBlind")?,
            created_date: row.try_get_datetime("createdDate")?,
            modified_date: row.try_get_datetime("modifiedDate")?,
        })
    }
}
