//! A single-connection database handle.

use crate::client::{GenericClient, RowStream};
use crate::config::DbConfig;
use crate::error::{DbError, DbResult};
use crate::param::IntoParams;
use crate::sql::Sql;
use tokio_postgres::NoTls;
use tokio_postgres::types::ToSql;

/// Owns one `tokio-postgres` connection and hands out [`Sql`] builders.
///
/// There is no pooling and no reconnection: when the connection drops, every
/// later call fails with [`DbError::Query`].
///
/// # Example
///
/// ```ignore
/// let db = SimpleDb::connect(&DbConfig::from_env()?).await?;
///
/// let mut sql = db.gen_sql();
/// sql.append("SELECT COUNT(*) FROM article", ());
/// let count = sql.select_long(&db).await?;
/// ```
pub struct SimpleDb {
    client: tokio_postgres::Client,
    dev_mode: bool,
}

impl SimpleDb {
    /// Connect without TLS and spawn the connection driver onto the current
    /// tokio runtime.
    pub async fn connect(config: &DbConfig) -> DbResult<Self> {
        let (client, connection) = tokio_postgres::connect(&config.database_url, NoTls)
            .await
            .map_err(|e| DbError::Connection(e.to_string()))?;

        tokio::spawn(async move {
            if let Err(e) = connection.await {
                tracing::error!(target: "simpledb.sql", error = %e, "connection closed with error");
            }
        });

        Ok(Self::from_client(client).with_dev_mode(config.dev_mode))
    }

    /// Wrap an already established client.
    pub fn from_client(client: tokio_postgres::Client) -> Self {
        Self {
            client,
            dev_mode: false,
        }
    }

    pub fn with_dev_mode(mut self, dev_mode: bool) -> Self {
        self.dev_mode = dev_mode;
        self
    }

    pub fn set_dev_mode(&mut self, dev_mode: bool) {
        self.dev_mode = dev_mode;
    }

    pub fn is_dev_mode(&self) -> bool {
        self.dev_mode
    }

    /// Start a new, empty statement builder.
    pub fn gen_sql(&self) -> Sql {
        Sql::new()
    }

    /// Run one statement with `?` placeholders and return the affected row count.
    ///
    /// Intended for DDL and fixtures: `db.run("TRUNCATE article", ()).await?`.
    pub async fn run(&self, sql: &str, params: impl IntoParams) -> DbResult<u64> {
        let mut stmt = self.gen_sql();
        stmt.append(sql, params);
        stmt.update(self).await
    }

    /// Get a reference to the inner client.
    pub fn client(&self) -> &tokio_postgres::Client {
        &self.client
    }

    /// Get the inner client, consuming this handle.
    pub fn into_inner(self) -> tokio_postgres::Client {
        self.client
    }

    fn log_statement(&self, sql: &str, params: &[&(dyn ToSql + Sync)]) {
        if self.dev_mode {
            tracing::info!(target: "simpledb.sql", params = ?params, "{sql}");
        }
    }
}

impl GenericClient for SimpleDb {
    async fn query_stream(
        &self,
        sql: &str,
        params: &[&(dyn ToSql + Sync)],
    ) -> DbResult<RowStream> {
        self.log_statement(sql, params);
        GenericClient::query_stream(&self.client, sql, params).await
    }

    async fn execute(&self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> DbResult<u64> {
        self.log_statement(sql, params);
        GenericClient::execute(&self.client, sql, params).await
    }
}
