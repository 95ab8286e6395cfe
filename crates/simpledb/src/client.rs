//! The connection capability consumed by [`Sql`](crate::Sql).

use crate::error::{DbError, DbResult};
use futures_core::Stream;
use futures_util::TryStreamExt;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio_postgres::Row;
use tokio_postgres::types::ToSql;

/// A trait over anything that can run a parameterized statement.
///
/// Statements use PostgreSQL's `$1, $2, ...` placeholders; parameters are
/// bound positionally.
pub trait GenericClient: Send + Sync {
    /// Execute a query and return a forward-only cursor over its rows.
    ///
    /// The cursor borrows nothing from `self`; dropping it releases the
    /// underlying portal.
    fn query_stream(
        &self,
        sql: &str,
        params: &[&(dyn ToSql + Sync)],
    ) -> impl std::future::Future<Output = DbResult<RowStream>> + Send;

    /// Execute a query and return all rows.
    ///
    /// The default implementation drains [`GenericClient::query_stream`].
    fn query(
        &self,
        sql: &str,
        params: &[&(dyn ToSql + Sync)],
    ) -> impl std::future::Future<Output = DbResult<Vec<Row>>> + Send {
        async move {
            let mut stream = self.query_stream(sql, params).await?;
            let mut rows = Vec::new();
            while let Some(row) = stream.try_next().await? {
                rows.push(row);
            }
            Ok(rows)
        }
    }

    /// Execute a statement and return the number of affected rows.
    fn execute(
        &self,
        sql: &str,
        params: &[&(dyn ToSql + Sync)],
    ) -> impl std::future::Future<Output = DbResult<u64>> + Send;
}

impl GenericClient for tokio_postgres::Client {
    async fn query_stream(
        &self,
        sql: &str,
        params: &[&(dyn ToSql + Sync)],
    ) -> DbResult<RowStream> {
        let stream = tokio_postgres::Client::query_raw(self, sql, params.iter().copied())
            .await
            .map_err(DbError::from_db_error)?;
        Ok(RowStream::new(stream.map_err(DbError::from_db_error)))
    }

    async fn execute(&self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> DbResult<u64> {
        tokio_postgres::Client::execute(self, sql, params)
            .await
            .map_err(DbError::from_db_error)
    }
}

/// A cursor of database rows.
///
/// This is a type-erased wrapper around a `Stream<Item = DbResult<Row>>` so that different
/// client implementations can return a uniform cursor type.
#[must_use]
pub struct RowStream {
    inner: Pin<Box<dyn Stream<Item = DbResult<Row>> + Send>>,
}

impl RowStream {
    /// Create a new `RowStream` from any compatible stream.
    pub fn new<S>(stream: S) -> Self
    where
        S: Stream<Item = DbResult<Row>> + Send + 'static,
    {
        Self {
            inner: Box::pin(stream),
        }
    }

    /// A cursor that yields no rows.
    pub fn empty() -> Self {
        Self::new(futures_util::stream::empty())
    }
}

impl Stream for RowStream {
    type Item = DbResult<Row>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.inner.as_mut().poll_next(cx)
    }
}
