//! # simpledb
//!
//! A small fluent query builder and result mapper for PostgreSQL.
//!
//! ## Features
//!
//! - **Fluent SQL**: append fragments with `?` placeholders and their values
//! - **Closed parameter types**: `i32`, `i64`, `bool`, text and `NaiveDateTime`
//! - **Result shapes**: generated keys, affected counts, generic rows,
//!   typed records via `FromRow`, and scalars
//! - **One execution per builder**: terminal calls consume the builder
//!
//! ```ignore
//! use simpledb::{Article, DbConfig, SimpleDb};
//!
//! let db = SimpleDb::connect(&DbConfig::from_env()?).await?;
//!
//! let mut sql = db.gen_sql();
//! sql.append("SELECT * FROM article", ())
//!     .append("WHERE \"isBlind\" = ?", false)
//!     .append("ORDER BY id ASC", ());
//! let articles: Vec<Article> = sql.select_rows_as(&db).await?;
//! ```

pub mod article;
pub mod client;
pub mod config;
pub mod db;
pub mod error;
pub mod param;
pub mod row;
pub mod sql;
pub mod value;

pub use article::Article;
pub use client::{GenericClient, RowStream};
pub use config::DbConfig;
pub use db::SimpleDb;
pub use error::{DbError, DbResult};
pub use param::{IntoParams, Param};
pub use row::{FromRow, RowExt, RowMap};
pub use sql::{NO_KEY, Sql, sql};
pub use value::Value;
