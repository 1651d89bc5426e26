//! Generic synchronous database handle.
//!
//! borm never speaks a wire protocol itself. Anything that can run a statement with
//! positional [`Value`] arguments and hand back fully drained rows can back a
//! [`crate::Table`]: the bundled SQLite and Postgres adapters, or a test double.

use crate::cache::StatementCache;
use crate::dialect::Dialect;
use crate::error::OrmResult;
use crate::value::Value;

/// What to run: SQL text, or a statement prepared earlier by [`Database::prepare`].
#[derive(Debug)]
pub enum Command<'a, S> {
    Sql(&'a str),
    Prepared(&'a S),
}

impl<S> Clone for Command<'_, S> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<S> Copy for Command<'_, S> {}

/// Result of a non-row-returning statement.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Exec {
    pub rows_affected: u64,
    /// Generated identifier reported by the driver, when it reports one.
    pub last_insert_id: Option<i64>,
}

/// A fully drained result set.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Rows {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

impl Rows {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    pub fn push(&mut self, row: Vec<Value>) {
        self.rows.push(row);
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// A database connection borm can run statements on.
///
/// Calls block the current thread until the driver answers. Implementations must be
/// safe to share between threads; the statement cache lives as long as the handle.
pub trait Database: Send + Sync {
    /// Driver-side prepared statement handle.
    type Statement: Clone + Send + Sync;

    fn prepare(&self, sql: &str) -> OrmResult<Self::Statement>;

    /// Execute a statement and return the number of affected rows.
    fn execute(&self, command: Command<'_, Self::Statement>, args: &[Value]) -> OrmResult<Exec>;

    /// Execute a query and return all rows.
    fn query(&self, command: Command<'_, Self::Statement>, args: &[Value]) -> OrmResult<Rows>;

    /// Statements prepared on this handle, keyed by SQL text.
    fn statement_cache(&self) -> &StatementCache<Self::Statement>;

    /// Dialect a new [`crate::Table`] starts with.
    fn dialect(&self) -> Dialect {
        Dialect::MySql
    }
}
