//! Database-family rendering rules.

use crate::error::{OrmError, OrmResult};
use std::borrow::Cow;
use std::fmt;

/// How an inserted row's generated identifier is obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertId {
    /// The driver reports it with the execution result.
    Driver,
    /// A `RETURNING` clause is appended and the value scanned from the result.
    Returning,
}

/// Placeholder, quoting and feature rules for one database family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub enum Dialect {
    /// Backtick quoting, `?` placeholders, `FORCE INDEX` hints.
    #[default]
    MySql,
    /// Double-quote quoting, `$1, $2, ...` placeholders, `RETURNING` ids, no index hints.
    Postgres,
    /// Double-quote quoting, `?` placeholders, `INDEXED BY` hints.
    Sqlite,
}

impl Dialect {
    pub fn name(self) -> &'static str {
        match self {
            Dialect::MySql => "mysql",
            Dialect::Postgres => "postgres",
            Dialect::Sqlite => "sqlite",
        }
    }

    pub fn quote_char(self) -> char {
        match self {
            Dialect::MySql => '`',
            Dialect::Postgres | Dialect::Sqlite => '"',
        }
    }

    /// Quote a single identifier segment, doubling embedded quote characters.
    pub fn quote_identifier(self, name: &str) -> String {
        let q = self.quote_char();
        let mut out = String::with_capacity(name.len() + 2);
        out.push(q);
        for ch in name.chars() {
            if ch == q {
                out.push(q);
            }
            out.push(ch);
        }
        out.push(q);
        out
    }

    /// Placeholder for the `index`-th (1-based) argument of a statement.
    pub fn placeholder(self, index: usize) -> Cow<'static, str> {
        match self {
            Dialect::Postgres => Cow::Owned(format!("${index}")),
            Dialect::MySql | Dialect::Sqlite => Cow::Borrowed("?"),
        }
    }

    /// Rewrite backtick quoting in caller-written SQL to this dialect's quote.
    pub fn normalize<'a>(self, raw: &'a str) -> Cow<'a, str> {
        let q = self.quote_char();
        if q == '`' || !raw.contains('`') {
            Cow::Borrowed(raw)
        } else {
            Cow::Owned(raw.replace('`', &q.to_string()))
        }
    }

    pub fn insert_id(self) -> InsertId {
        match self {
            Dialect::Postgres => InsertId::Returning,
            Dialect::MySql | Dialect::Sqlite => InsertId::Driver,
        }
    }

    /// Table-level index hint placed right after the table in a SELECT.
    pub fn index_hint(self, index: &str) -> OrmResult<String> {
        match self {
            Dialect::MySql => Ok(format!("FORCE INDEX ({})", self.quote_identifier(index))),
            Dialect::Sqlite => Ok(format!("INDEXED BY {}", self.quote_identifier(index))),
            Dialect::Postgres => Err(OrmError::unsupported_feature(format!(
                "{} has no index hints (requested FORCE INDEX {index})",
                self.name()
            ))),
        }
    }

    /// Whether UPDATE/DELETE accept ORDER BY and LIMIT.
    pub fn supports_mutation_limit(self) -> bool {
        matches!(self, Dialect::MySql)
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
