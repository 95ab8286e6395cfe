use super::parts::{SqlPart, split_markers};
use crate::error::{DbError, DbResult};
use crate::param::{IntoParams, Param};
use tokio_postgres::types::ToSql;

/// A fluent SQL builder using `?` placeholders.
///
/// `Sql` accumulates fragments and their parameters; one terminal call
/// (`insert`, `update`, `select_rows`, ...) consumes the builder, renders the
/// markers as `$1, $2, ...`, binds the parameters in append order and decodes
/// the result.
#[must_use]
#[derive(Debug, Clone, Default)]
pub struct Sql {
    pub(super) parts: Vec<SqlPart>,
    pub(super) params: Vec<Param>,
}

impl Sql {
    /// Create an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a fragment followed by a single space, and its parameters.
    ///
    /// The fragment is not validated; the number of `?` markers it contains
    /// should match the number of values.
    ///
    /// ```ignore
    /// sql.append("UPDATE article", ())
    ///     .append("SET title = ?", "new title")
    ///     .append("WHERE id IN (?, ?, ?)", [0, 1, 3]);
    /// ```
    pub fn append(&mut self, fragment: &str, values: impl IntoParams) -> &mut Self {
        for part in split_markers(fragment) {
            self.push_part(part);
        }
        self.push_raw(" ");
        self.params.extend(values.into_params());
        self
    }

    /// Append an `IN (...)`-style fragment, expanding its marker into one
    /// marker per value.
    ///
    /// Text before the first `?` marker and after the last one is kept;
    /// everything between them is replaced by `?, ?, ...`. With no values the marker
    /// becomes `NULL`, so `IN (NULL)` is still valid SQL and matches nothing.
    /// No separating space is added.
    ///
    /// Returns a validation error if the fragment has no `?` outside quotes
    /// and comments.
    ///
    /// ```ignore
    /// sql.append("DELETE FROM article", ())
    ///     .append_in("WHERE id IN (?)", [0, 1, 3])?;
    /// // DELETE FROM article WHERE id IN ($1, $2, $3)
    /// ```
    pub fn append_in(&mut self, fragment: &str, values: impl IntoParams) -> DbResult<&mut Self> {
        let parts = split_markers(fragment);
        let is_marker = |p: &SqlPart| matches!(p, SqlPart::Marker);
        let (Some(first), Some(last)) = (
            parts.iter().position(is_marker),
            parts.iter().rposition(is_marker),
        ) else {
            return Err(DbError::validation(format!(
                "Sql::append_in: no '?' placeholder in {fragment:?}"
            )));
        };

        let values = values.into_params();
        for (i, part) in parts.into_iter().enumerate() {
            if i < first || i > last {
                self.push_part(part);
            } else if i == first {
                self.push_list(values.len());
            }
        }
        self.params.extend(values);
        Ok(self)
    }

    /// `?, ?, ...` for `len` values, or `NULL` for none.
    fn push_list(&mut self, len: usize) {
        if len == 0 {
            self.push_raw("NULL");
        }
        for i in 0..len {
            if i > 0 {
                self.push_raw(", ");
            }
            self.parts.push(SqlPart::Marker);
        }
    }

    fn push_part(&mut self, part: SqlPart) {
        match part {
            SqlPart::Raw(s) => self.push_raw(&s),
            SqlPart::Marker => self.parts.push(SqlPart::Marker),
        }
    }

    pub(super) fn push_raw(&mut self, sql: &str) {
        if sql.is_empty() {
            return;
        }

        match self.parts.last_mut() {
            Some(SqlPart::Raw(last)) => last.push_str(sql),
            _ => self.parts.push(SqlPart::Raw(sql.to_string())),
        }
    }

    /// Render SQL with `$1, $2, ...` placeholders.
    pub fn to_sql(&self) -> String {
        use std::fmt::Write;

        let mut out = String::new();
        let mut idx: usize = 0;

        for part in &self.parts {
            match part {
                SqlPart::Raw(s) => out.push_str(s),
                SqlPart::Marker => {
                    idx += 1;
                    let _ = write!(&mut out, "${}", idx);
                }
            }
        }
        out
    }

    /// The accumulated statement with its `?` markers, as appended.
    pub fn raw_sql(&self) -> String {
        let mut out = String::new();
        for part in &self.parts {
            match part {
                SqlPart::Raw(s) => out.push_str(s),
                SqlPart::Marker => out.push('?'),
            }
        }
        out
    }

    /// Accumulated parameters, in bind order.
    pub fn params(&self) -> &[Param] {
        &self.params
    }

    /// Number of `?` markers appended so far.
    pub fn placeholder_count(&self) -> usize {
        self.parts
            .iter()
            .filter(|p| matches!(p, SqlPart::Marker))
            .count()
    }

    /// Parameter refs compatible with `tokio-postgres`.
    pub fn params_ref(&self) -> Vec<&(dyn ToSql + Sync)> {
        self.params
            .iter()
            .map(|p| p as &(dyn ToSql + Sync))
            .collect()
    }

    pub(super) fn validate(&self) -> DbResult<()> {
        let placeholder_count = self.placeholder_count();
        if placeholder_count != self.params.len() {
            return Err(DbError::Validation(format!(
                "Sql: {} placeholders but {} params",
                placeholder_count,
                self.params.len()
            )));
        }
        if self.parts.is_empty() {
            return Err(DbError::validation("Sql: empty statement"));
        }
        Ok(())
    }
}
