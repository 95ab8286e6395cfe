use crate::error::{DbError, DbResult};

/// One piece of an accumulated statement.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum SqlPart {
    Raw(String),
    /// A `?` placeholder, rendered as `$n`.
    Marker,
}

/// Lexical context of one character.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Context {
    Code,
    /// Inside `'...'` or `"..."`, delimiters included.
    Quoted,
    /// Inside `-- ...` or `/* ... */`, delimiters included.
    Comment,
}

#[derive(Debug, Clone, Copy)]
enum State {
    Code,
    Quote(char),
    Line,
    /// `skip` marks the second character of a `/*` or `*/` delimiter.
    Block { depth: u32, skip: bool },
}

/// Classifies each character of a SQL string as code, quoted text or
/// comment. Block comments nest, as in PostgreSQL.
struct Lexer<'a> {
    chars: std::iter::Peekable<std::str::CharIndices<'a>>,
    state: State,
}

impl<'a> Lexer<'a> {
    fn new(sql: &'a str) -> Self {
        Self {
            chars: sql.char_indices().peekable(),
            state: State::Code,
        }
    }
}

impl Iterator for Lexer<'_> {
    type Item = (usize, char, Context);

    fn next(&mut self) -> Option<Self::Item> {
        let (i, c) = self.chars.next()?;
        let peek = self.chars.peek().map(|&(_, c)| c);

        let context = match self.state {
            State::Quote(open) => {
                if c == open {
                    self.state = State::Code;
                }
                Context::Quoted
            }
            State::Line => {
                if c == '\n' {
                    self.state = State::Code;
                }
                Context::Comment
            }
            State::Block { depth, skip: true } => {
                self.state = if depth == 0 {
                    State::Code
                } else {
                    State::Block { depth, skip: false }
                };
                Context::Comment
            }
            State::Block { depth, skip: false } => {
                if c == '*' && peek == Some('/') {
                    self.state = State::Block { depth: depth - 1, skip: true };
                } else if c == '/' && peek == Some('*') {
                    self.state = State::Block { depth: depth + 1, skip: true };
                }
                Context::Comment
            }
            State::Code => match (c, peek) {
                ('-', Some('-')) => {
                    self.state = State::Line;
                    Context::Comment
                }
                ('/', Some('*')) => {
                    self.state = State::Block { depth: 1, skip: true };
                    Context::Comment
                }
                ('\'' | '"', _) => {
                    self.state = State::Quote(c);
                    Context::Quoted
                }
                _ => Context::Code,
            },
        };
        Some((i, c, context))
    }
}

/// Split `fragment` at its `?` markers.
///
/// A `?` inside a single-quoted literal, a double-quoted identifier or a
/// comment is ordinary text. Quotes and comments are tracked per fragment
/// only.
pub(crate) fn split_markers(fragment: &str) -> Vec<SqlPart> {
    let mut parts = Vec::new();
    let mut raw = String::new();

    for (_, c, context) in Lexer::new(fragment) {
        if context == Context::Code && c == '?' {
            if !raw.is_empty() {
                parts.push(SqlPart::Raw(std::mem::take(&mut raw)));
            }
            parts.push(SqlPart::Marker);
            continue;
        }
        raw.push(c);
    }

    if !raw.is_empty() {
        parts.push(SqlPart::Raw(raw));
    }
    parts
}

/// What `insert` needs to know about a rendered statement.
#[derive(Debug, Default, PartialEq, Eq)]
struct StatementShape {
    /// `RETURNING` appears as a keyword outside quotes and comments.
    has_returning: bool,
    /// Byte offset just past the last character that is not whitespace,
    /// a comment or a `;`.
    body_end: usize,
    /// A `;` is followed by more code.
    multiple_statements: bool,
}

fn statement_shape(sql: &str) -> StatementShape {
    let mut shape = StatementShape::default();
    let mut word = String::new();
    let mut terminated = false;

    for (i, c, context) in Lexer::new(sql) {
        if context == Context::Code && (c == '_' || c == '$' || c.is_ascii_alphanumeric()) {
            word.push(c);
        } else {
            shape.has_returning |= word.eq_ignore_ascii_case("returning");
            word.clear();
        }

        let significant = match context {
            Context::Comment => false,
            Context::Quoted => true,
            Context::Code => !(c == ';' || c.is_whitespace()),
        };
        if context == Context::Code && c == ';' {
            terminated = true;
        }
        if significant {
            shape.multiple_statements |= terminated;
            shape.body_end = i + c.len_utf8();
        }
    }
    shape.has_returning |= word.eq_ignore_ascii_case("returning");
    shape
}

/// Add `RETURNING "key_column"` to a rendered statement unless it already
/// has a `RETURNING` clause.
///
/// The clause goes right after the last piece of code, ahead of any trailing
/// comment or `;`. More than one statement is a validation error.
pub(crate) fn with_returning(sql: &str, key_column: &str) -> DbResult<String> {
    let shape = statement_shape(sql);
    if shape.multiple_statements {
        return Err(DbError::validation(format!(
            "insert expects a single statement, got {sql:?}"
        )));
    }
    if shape.has_returning {
        return Ok(sql.to_string());
    }

    let (body, tail) = sql.split_at(shape.body_end);
    Ok(format!("{body} RETURNING {}{tail}", quote_ident(key_column)))
}

/// Quote an identifier for PostgreSQL (`isBlind` → `"isBlind"`).
pub(crate) fn quote_ident(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}
