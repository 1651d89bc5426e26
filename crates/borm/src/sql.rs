//! Parameter-safe SQL assembly.
//!
//! [`Sql`] stores SQL pieces and parameters separately. Placeholders are only numbered
//! when the finished statement is rendered for a [`Dialect`], so the numbering always
//! follows the final left-to-right order of the arguments, whichever clause added them.
//!
//! # Example
//!
//! ```ignore
//! use borm::{Dialect, Sql};
//!
//! let mut q = Sql::new("SELECT * FROM ");
//! q.push_ident("test").push(" WHERE ").push_ident("age").push(" > ").push_bind(18);
//! q.push(" AND ").push_fragment("name <> ?", vec!["x".into()]);
//!
//! let r = q.render(Dialect::Postgres);
//! assert_eq!(r.sql, r#"SELECT * FROM "test" WHERE "age" > $1 AND name <> $2"#);
//! ```

use crate::condition::Condition;
use crate::dialect::Dialect;
use crate::ident::render_ref;
use crate::value::Value;
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
enum SqlPart {
    /// Literal SQL; backticks are rewritten for the dialect.
    Raw(String),
    /// Table or column reference, quoted when it is a plain identifier.
    Ident(String),
    Param,
}

/// A SQL statement under construction.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Sql {
    parts: Vec<SqlPart>,
    params: Vec<Value>,
}

/// A statement rendered for one dialect, ready to execute.
#[derive(Debug, Clone, PartialEq)]
pub struct Rendered {
    pub sql: String,
    pub args: Vec<Value>,
}

impl fmt::Display for Rendered {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [", self.sql)?;
        for (i, arg) in self.args.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{arg}")?;
        }
        f.write_str("]")
    }
}

impl Sql {
    /// Create a new builder with an initial SQL fragment.
    pub fn new(initial_sql: impl Into<String>) -> Self {
        let mut sql = Self::default();
        sql.push(&initial_sql.into());
        sql
    }

    /// Create an empty builder.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    /// Append raw SQL (no parameters).
    pub fn push(&mut self, sql: &str) -> &mut Self {
        if sql.is_empty() {
            return self;
        }

        match self.parts.last_mut() {
            Some(SqlPart::Raw(last)) => last.push_str(sql),
            _ => self.parts.push(SqlPart::Raw(sql.to_string())),
        }
        self
    }

    /// Append a table or column reference.
    pub fn push_ident(&mut self, reference: &str) -> &mut Self {
        self.parts.push(SqlPart::Ident(reference.to_string()));
        self
    }

    /// Append references separated by `, `.
    pub fn push_ident_list<S: AsRef<str>>(&mut self, references: &[S]) -> &mut Self {
        for (i, r) in references.iter().enumerate() {
            if i > 0 {
                self.push(", ");
            }
            self.push_ident(r.as_ref());
        }
        self
    }

    /// Append a parameter placeholder and bind its value.
    pub fn push_bind(&mut self, value: impl Into<Value>) -> &mut Self {
        self.parts.push(SqlPart::Param);
        self.params.push(value.into());
        self
    }

    /// Append a comma-separated list of placeholders and bind all values.
    pub fn push_bind_list(&mut self, values: impl IntoIterator<Item = Value>) -> &mut Self {
        for (i, v) in values.into_iter().enumerate() {
            if i > 0 {
                self.push(", ");
            }
            self.push_bind(v);
        }
        self
    }

    /// Append caller-written SQL whose `?` markers take the given arguments in order.
    ///
    /// A `?` inside a quoted span (`'..'`, `".."` or `` `..` ``) is literal text. The
    /// caller is responsible for the marker count matching `args` (see [`count_markers`]).
    pub fn push_fragment(&mut self, fragment: &str, args: Vec<Value>) -> &mut Self {
        let mut args = args.into_iter();
        let mut start = 0;
        for at in marker_offsets(fragment) {
            self.push(&fragment[start..at]);
            match args.next() {
                Some(v) => self.push_bind(v),
                None => self.push("?"),
            };
            start = at + 1;
        }
        self.push(&fragment[start..]);
        self
    }

    /// Append another `Sql` fragment, consuming it.
    pub fn push_sql(&mut self, other: Sql) -> &mut Self {
        for part in other.parts {
            match part {
                SqlPart::Raw(s) => {
                    self.push(&s);
                }
                part => self.parts.push(part),
            }
        }
        self.params.extend(other.params);
        self
    }

    /// Append a [`Condition`].
    pub fn push_condition(&mut self, condition: &Condition) -> &mut Self {
        condition.append_to_sql(self);
        self
    }

    /// Append multiple [`Condition`]s joined by `AND`.
    ///
    /// If `conditions` is empty, this is a no-op.
    pub fn push_conditions_and(&mut self, conditions: &[Condition]) -> &mut Self {
        for (i, cond) in conditions.iter().enumerate() {
            if i > 0 {
                self.push(" AND ");
            }
            self.push_condition(cond);
        }
        self
    }

    /// Number of bound parameters.
    pub fn param_count(&self) -> usize {
        self.params.len()
    }

    /// Render the statement for `dialect`, numbering placeholders left to right.
    pub fn to_sql(&self, dialect: Dialect) -> String {
        let mut out = String::new();
        let mut idx: usize = 0;

        for part in &self.parts {
            match part {
                SqlPart::Raw(s) => out.push_str(&dialect.normalize(s)),
                SqlPart::Ident(r) => out.push_str(&render_ref(r, dialect)),
                SqlPart::Param => {
                    idx += 1;
                    out.push_str(&dialect.placeholder(idx));
                }
            }
        }
        out
    }

    pub fn params(&self) -> &[Value] {
        &self.params
    }

    pub fn render(self, dialect: Dialect) -> Rendered {
        Rendered {
            sql: self.to_sql(dialect),
            args: self.params,
        }
    }
}

/// Number of `?` markers in a caller-written fragment, ignoring quoted text.
pub fn count_markers(fragment: &str) -> usize {
    marker_offsets(fragment).len()
}

/// Byte offsets of the `?` markers outside quoted spans.
///
/// A doubled quote inside a span (`'it''s'`) closes and reopens it, which leaves the
/// span quoted.
fn marker_offsets(fragment: &str) -> Vec<usize> {
    let mut offsets = Vec::new();
    let mut quote: Option<char> = None;
    for (i, c) in fragment.char_indices() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '\'' | '"' | '`') => quote = Some(c),
            (None, '?') => offsets.push(i),
            (None, _) => {}
        }
    }
    offsets
}
