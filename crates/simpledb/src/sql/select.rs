use super::NO_KEY;
use super::builder::Sql;
use crate::client::GenericClient;
use crate::error::{DbError, DbResult};
use crate::row::{FromRow, RowExt, RowMap};
use crate::value::Value;
use chrono::NaiveDateTime;
use futures_util::TryStreamExt;
use tokio_postgres::Row;

/// Which column a scalar select reads.
#[derive(Debug, Clone, Copy)]
enum Target<'a> {
    First,
    Named(&'a str),
    /// The named column when present, otherwise the first one.
    NamedOrFirst(&'a str),
}

impl Target<'_> {
    fn read(self, row: &Row) -> DbResult<(String, Value)> {
        let name = match self {
            Self::Named(name) => return Ok((name.to_string(), row.try_get_value(name)?)),
            Self::NamedOrFirst(name) if row.has_column(name) => {
                return Ok((name.to_string(), row.try_get_value(name)?));
            }
            Self::First | Self::NamedOrFirst(_) => row
                .columns()
                .first()
                .map(|c| c.name().to_string())
                .ok_or_else(|| DbError::decode("0", "result has no columns"))?,
        };
        Ok((name, row.try_get_value(0)?))
    }
}

fn scalar<T>(
    (column, value): (String, Value),
    expected: &str,
    extract: impl FnOnce(&Value) -> Option<T>,
) -> DbResult<Option<T>> {
    if value.is_null() {
        return Ok(None);
    }
    extract(&value).map(Some).ok_or_else(|| {
        DbError::decode(column, format!("expected {expected}, got {}", value.type_name()))
    })
}

impl Sql {
    // ==================== Row shapes ====================

    /// Execute the query and decode every row generically, in cursor order.
    pub async fn select_rows(self, conn: &impl GenericClient) -> DbResult<Vec<RowMap>> {
        self.select_rows_as(conn).await
    }

    /// Execute the query and decode every row as `T`, in cursor order.
    pub async fn select_rows_as<T: FromRow>(self, conn: &impl GenericClient) -> DbResult<Vec<T>> {
        let mut cursor = self.open_cursor("select_rows", conn).await?;
        let mut out = Vec::new();
        while let Some(row) = cursor.try_next().await? {
            out.push(T::from_row(&row)?);
        }
        Ok(out)
    }

    /// Execute the query and decode the **last** row generically.
    ///
    /// Every row of the cursor is visited and decoded; the last one wins. Use
    /// [`Sql::select_first_row`] to stop at the first row instead. Returns an
    /// empty map when nothing matched.
    pub async fn select_row(self, conn: &impl GenericClient) -> DbResult<RowMap> {
        Ok(self.select_row_as(conn).await?.unwrap_or_default())
    }

    /// Execute the query and decode the **last** row as `T`, if any.
    pub async fn select_row_as<T: FromRow>(
        self,
        conn: &impl GenericClient,
    ) -> DbResult<Option<T>> {
        let mut cursor = self.open_cursor("select_row", conn).await?;
        let mut last = None;
        while let Some(row) = cursor.try_next().await? {
            last = Some(T::from_row(&row)?);
        }
        Ok(last)
    }

    /// Execute the query and decode the first row generically; the rest of the
    /// cursor is discarded. Returns an empty map when nothing matched.
    pub async fn select_first_row(self, conn: &impl GenericClient) -> DbResult<RowMap> {
        Ok(self.select_first_row_as(conn).await?.unwrap_or_default())
    }

    /// Execute the query and decode the first row as `T`, if any.
    pub async fn select_first_row_as<T: FromRow>(
        self,
        conn: &impl GenericClient,
    ) -> DbResult<Option<T>> {
        let row = self.first_row("select_first_row", conn).await?;
        row.as_ref().map(T::from_row).transpose()
    }

    // ==================== Scalars ====================

    /// First column of the first row as `i64`, or [`NO_KEY`] (`-1`) when no
    /// row (or `NULL`) is returned.
    ///
    /// ```ignore
    /// let mut sql = db.gen_sql();
    /// sql.append("SELECT COUNT(*) FROM article WHERE \"isBlind\" = ?", true);
    /// let blind = sql.select_long(&db).await?;
    /// ```
    pub async fn select_long(self, conn: &impl GenericClient) -> DbResult<i64> {
        let value = self.select_scalar("select_long", conn, Target::First, "integer", Value::as_i64);
        Ok(value.await?.unwrap_or(NO_KEY))
    }

    /// Column `column` of the first row as `i64`, or [`NO_KEY`] (`-1`).
    pub async fn select_long_column(
        self,
        conn: &impl GenericClient,
        column: &str,
    ) -> DbResult<i64> {
        let value = self.select_scalar(
            "select_long",
            conn,
            Target::Named(column),
            "integer",
            Value::as_i64,
        );
        Ok(value.await?.unwrap_or(NO_KEY))
    }

    /// First column of every row as `i64`, in cursor order.
    ///
    /// A `NULL` becomes [`NO_KEY`] (`-1`), as in [`Sql::select_long`].
    pub async fn select_longs(self, conn: &impl GenericClient) -> DbResult<Vec<i64>> {
        let mut cursor = self.open_cursor("select_longs", conn).await?;
        let mut out = Vec::new();
        while let Some(row) = cursor.try_next().await? {
            let value = row.try_get_value(0)?;
            if value.is_null() {
                out.push(NO_KEY);
                continue;
            }
            let n = value.as_i64().ok_or_else(|| {
                DbError::decode(
                    row.columns()[0].name(),
                    format!("expected integer, got {}", value.type_name()),
                )
            })?;
            out.push(n);
        }
        Ok(out)
    }

    /// Column `title` of the first row.
    pub async fn select_string(self, conn: &impl GenericClient) -> DbResult<Option<String>> {
        self.select_string_column(conn, "title").await
    }

    /// Column `column` of the first row as text.
    pub async fn select_string_column(
        self,
        conn: &impl GenericClient,
        column: &str,
    ) -> DbResult<Option<String>> {
        self.select_scalar("select_string", conn, Target::Named(column), "text", |v| {
            v.as_str().map(str::to_string)
        })
        .await
    }

    /// Column `isBlind` of the first row, or its first column when the result
    /// has no `isBlind` column (e.g. `SELECT 1 = 1`).
    pub async fn select_boolean(self, conn: &impl GenericClient) -> DbResult<Option<bool>> {
        self.select_scalar(
            "select_boolean",
            conn,
            Target::NamedOrFirst("isBlind"),
            "bool",
            Value::as_bool,
        )
        .await
    }

    /// Column `column` of the first row as a boolean.
    pub async fn select_boolean_column(
        self,
        conn: &impl GenericClient,
        column: &str,
    ) -> DbResult<Option<bool>> {
        self.select_scalar(
            "select_boolean",
            conn,
            Target::Named(column),
            "bool",
            Value::as_bool,
        )
        .await
    }

    /// The `now` column of the first row (as produced by `SELECT NOW()`), or
    /// its first column, as a local date-time.
    pub async fn select_datetime(
        self,
        conn: &impl GenericClient,
    ) -> DbResult<Option<NaiveDateTime>> {
        self.select_scalar(
            "select_datetime",
            conn,
            Target::NamedOrFirst("now"),
            "timestamp",
            Value::as_datetime,
        )
        .await
    }

    async fn first_row(&self, op: &'static str, conn: &impl GenericClient) -> DbResult<Option<Row>> {
        let mut cursor = self.open_cursor(op, conn).await?;
        cursor.try_next().await
    }

    async fn select_scalar<T>(
        self,
        op: &'static str,
        conn: &impl GenericClient,
        target: Target<'_>,
        expected: &str,
        extract: impl FnOnce(&Value) -> Option<T>,
    ) -> DbResult<Option<T>> {
        match self.first_row(op, conn).await? {
            None => Ok(None),
            Some(row) => scalar(target.read(&row)?, expected, extract),
        }
    }
}
