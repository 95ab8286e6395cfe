//! Row mapping traits and utilities

use crate::error::{DbError, DbResult};
use crate::value::Value;
use chrono::NaiveDateTime;
use std::collections::HashMap;
use std::fmt::Display;
use tokio_postgres::Row;
use tokio_postgres::row::RowIndex;
use tokio_postgres::types::FromSql;

/// A generically decoded row: column name → value.
pub type RowMap = HashMap<String, Value>;

/// Trait for converting a database row into a Rust type.
///
/// # Example
///
/// ```ignore
/// use simpledb::{DbResult, FromRow, RowExt};
/// use tokio_postgres::Row;
///
/// struct Tag {
///     id: i64,
///     name: String,
/// }
///
/// impl FromRow for Tag {
///     fn from_row(row: &Row) -> DbResult<Self> {
///         Ok(Self {
///             id: row.try_get_long("id")?,
///             name: row.try_get_column("name")?,
///         })
///     }
/// }
/// ```
pub trait FromRow: Sized {
    /// Convert a database row into Self
    fn from_row(row: &Row) -> DbResult<Self>;
}

/// Every column, keyed by its name, decoded as a [`Value`].
impl FromRow for RowMap {
    fn from_row(row: &Row) -> DbResult<Self> {
        let mut map = HashMap::with_capacity(row.len());
        for (idx, column) in row.columns().iter().enumerate() {
            let value: Value = row
                .try_get(idx)
                .map_err(|e| DbError::decode(column.name(), e.to_string()))?;
            map.insert(column.name().to_string(), value);
        }
        Ok(map)
    }
}

/// Extension trait for Row to provide typed access
pub trait RowExt {
    /// Try to get a column value, returning DbError::Decode on failure
    fn try_get_column<T, I>(&self, column: I) -> DbResult<T>
    where
        T: for<'a> FromSql<'a>,
        I: RowIndex + Display;

    /// Get a column as a dynamically typed [`Value`].
    fn try_get_value<I>(&self, column: I) -> DbResult<Value>
    where
        I: RowIndex + Display;

    /// Get an integer column of any width as `i64`.
    fn try_get_long<I>(&self, column: I) -> DbResult<i64>
    where
        I: RowIndex + Display;

    /// Get a `timestamp` or `timestamptz` column as a local date-time.
    fn try_get_datetime<I>(&self, column: I) -> DbResult<NaiveDateTime>
    where
        I: RowIndex + Display;

    /// Whether the result has a column with this exact name.
    fn has_column(&self, column: &str) -> bool;
}

impl RowExt for Row {
    fn try_get_column<T, I>(&self, column: I) -> DbResult<T>
    where
        T: for<'a> FromSql<'a>,
        I: RowIndex + Display,
    {
        self.try_get(&column)
            .map_err(|e| DbError::decode(column.to_string(), e.to_string()))
    }

    fn try_get_value<I>(&self, column: I) -> DbResult<Value>
    where
        I: RowIndex + Display,
    {
        self.try_get_column(column)
    }

    fn try_get_long<I>(&self, column: I) -> DbResult<i64>
    where
        I: RowIndex + Display,
    {
        let label = column.to_string();
        let value = self.try_get_value(column)?;
        value
            .as_i64()
            .ok_or_else(|| DbError::decode(label, format!("expected integer, got {}", value.type_name())))
    }

    fn try_get_datetime<I>(&self, column: I) -> DbResult<NaiveDateTime>
    where
        I: RowIndex + Display,
    {
        let label = column.to_string();
        let value = self.try_get_value(column)?;
        value.as_datetime().ok_or_else(|| {
            DbError::decode(label, format!("expected timestamp, got {}", value.type_name()))
        })
    }

    fn has_column(&self, column: &str) -> bool {
        self.columns().iter().any(|c| c.name() == column)
    }
}
