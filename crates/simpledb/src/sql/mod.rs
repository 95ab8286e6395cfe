//! Fluent SQL builder.
//!
//! Fragments are appended with `?` placeholders; the builder numbers them
//! (`$1, $2, ...`) when a terminal call consumes it.
//!
//! # Example
//!
//! ```ignore
//! use simpledb::Sql;
//!
//! let mut sql = Sql::new();
//! sql.append("UPDATE article", ())
//!     .append("SET title = ?", "new title")
//!     .append("WHERE id IN (?, ?, ?, ?)", [0, 1, 2, 3]);
//!
//! let affected = sql.update(&db).await?;
//! ```

mod builder;
mod execute;
mod parts;
mod select;

#[cfg(test)]
mod tests;

pub use builder::Sql;

/// Returned by [`Sql::insert`] and [`Sql::select_long`] when there is no value.
pub const NO_KEY: i64 = -1;

/// Start a builder with a first fragment and its parameters.
pub fn sql(fragment: &str, values: impl crate::param::IntoParams) -> Sql {
    let mut sql = Sql::new();
    sql.append(fragment, values);
    sql
}
