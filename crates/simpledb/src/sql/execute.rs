use super::NO_KEY;
use super::builder::Sql;
use super::parts::with_returning;
use crate::client::{GenericClient, RowStream};
use crate::error::{DbError, DbResult};
use crate::param::Param;
use crate::row::RowExt;
use futures_util::TryStreamExt;

impl Sql {
    /// Execute an `INSERT` and return the generated `id`.
    ///
    /// `RETURNING "id"` is added unless the statement already has a
    /// `RETURNING` clause, in which case the first returned column is used.
    /// The clause goes ahead of a trailing comment or `;`; a statement
    /// followed by another one is rejected.
    /// Returns [`NO_KEY`] (`-1`) when nothing was inserted.
    pub async fn insert(self, conn: &impl GenericClient) -> DbResult<i64> {
        self.insert_returning(conn, "id").await
    }

    /// Like [`Sql::insert`], for tables whose generated key column is not `id`.
    pub async fn insert_returning(
        self,
        conn: &impl GenericClient,
        key_column: &str,
    ) -> DbResult<i64> {
        self.validate()?;
        let sql = with_returning(&self.to_sql(), key_column)?;
        let mut cursor = self.query_rendered("insert", &sql, conn).await?;
        let Some(row) = cursor.try_next().await? else {
            return Ok(NO_KEY);
        };
        let key = row.try_get_value(0)?;
        if key.is_null() {
            return Ok(NO_KEY);
        }
        key.as_i64().ok_or_else(|| {
            DbError::decode(
                row.columns()[0].name(),
                format!("expected integer key, got {}", key.type_name()),
            )
        })
    }

    /// Execute an `UPDATE` and return the number of affected rows.
    pub async fn update(self, conn: &impl GenericClient) -> DbResult<u64> {
        self.execute_counted("update", conn).await
    }

    /// Execute a `DELETE` and return the number of affected rows.
    pub async fn delete(self, conn: &impl GenericClient) -> DbResult<u64> {
        self.execute_counted("delete", conn).await
    }

    async fn execute_counted(&self, op: &'static str, conn: &impl GenericClient) -> DbResult<u64> {
        self.validate()?;
        let sql = self.to_sql();
        self.trace(op, &sql);
        let params = self.params_ref();
        conn.execute(&sql, &params).await
    }

    /// Validate, render and run the statement as a query.
    pub(super) async fn open_cursor(
        &self,
        op: &'static str,
        conn: &impl GenericClient,
    ) -> DbResult<RowStream> {
        self.validate()?;
        let sql = self.to_sql();
        self.query_rendered(op, &sql, conn).await
    }

    async fn query_rendered(
        &self,
        op: &'static str,
        sql: &str,
        conn: &impl GenericClient,
    ) -> DbResult<RowStream> {
        self.trace(op, sql);
        let params = self.params_ref();
        conn.query_stream(sql, &params).await
    }

    fn trace(&self, op: &'static str, sql: &str) {
        tracing::debug!(
            target: "simpledb.sql",
            op,
            params = self.params.len(),
            kinds = ?self.params.iter().map(Param::kind).collect::<Vec<_>>(),
            "{sql}"
        );
    }
}
