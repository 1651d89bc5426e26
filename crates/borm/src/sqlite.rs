//! [`Database`] adapter over rusqlite.
//!
//! One connection behind a mutex. Prepared statements are kept by rusqlite's own
//! per-connection cache, so the borm-side statement handle is just the SQL text.

use crate::cache::StatementCache;
use crate::client::{Command, Database, Exec, Rows};
use crate::dialect::Dialect;
use crate::error::{OrmError, OrmResult};
use crate::value::{TEXT_TIME_FORMAT, Value};
use rusqlite::types::{ToSqlOutput, ValueRef};
use rusqlite::{Connection, ToSql, params_from_iter};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

/// Configuration for [`SqliteClient`].
#[derive(Debug, Clone)]
pub struct SqliteConfig {
    /// Capacity of rusqlite's prepared statement cache.
    pub statement_cache_capacity: usize,
    /// SQL run once right after the connection opens (pragmas, schema).
    pub init_sql: Option<String>,
}

impl Default for SqliteConfig {
    fn default() -> Self {
        Self {
            statement_cache_capacity: 64,
            init_sql: None,
        }
    }
}

impl SqliteConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn statement_cache_capacity(mut self, capacity: usize) -> Self {
        self.statement_cache_capacity = capacity;
        self
    }

    pub fn init_sql(mut self, sql: impl Into<String>) -> Self {
        self.init_sql = Some(sql.into());
        self
    }
}

/// A SQLite connection usable as a borm [`Database`].
pub struct SqliteClient {
    conn: Mutex<Connection>,
    statements: StatementCache<String>,
}

impl SqliteClient {
    pub fn open(path: impl AsRef<Path>, config: SqliteConfig) -> OrmResult<Self> {
        Self::with_connection(Connection::open(path)?, config)
    }

    pub fn open_in_memory() -> OrmResult<Self> {
        Self::with_connection(Connection::open_in_memory()?, SqliteConfig::default())
    }

    pub fn with_connection(conn: Connection, config: SqliteConfig) -> OrmResult<Self> {
        conn.set_prepared_statement_cache_capacity(config.statement_cache_capacity);
        if let Some(sql) = &config.init_sql {
            conn.execute_batch(sql)?;
        }
        Ok(Self {
            conn: Mutex::new(conn),
            statements: StatementCache::new(),
        })
    }

    /// Run one or more statements without arguments (DDL, pragmas).
    pub fn execute_batch(&self, sql: &str) -> OrmResult<()> {
        self.conn()?.execute_batch(sql)?;
        Ok(())
    }

    fn conn(&self) -> OrmResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| OrmError::driver(std::io::Error::other("sqlite connection lock poisoned")))
    }
}

fn sql_of<'a>(command: &Command<'a, String>) -> &'a str {
    match *command {
        Command::Sql(sql) => sql,
        Command::Prepared(sql) => sql.as_str(),
    }
}

impl Database for SqliteClient {
    type Statement = String;

    fn prepare(&self, sql: &str) -> OrmResult<String> {
        self.conn()?.prepare_cached(sql)?;
        Ok(sql.to_string())
    }

    fn execute(&self, command: Command<'_, String>, args: &[Value]) -> OrmResult<Exec> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare_cached(sql_of(&command))?;
        let affected = stmt.execute(params_from_iter(args.iter()))?;
        Ok(Exec {
            rows_affected: affected as u64,
            last_insert_id: (affected > 0).then(|| conn.last_insert_rowid()),
        })
    }

    fn query(&self, command: Command<'_, String>, args: &[Value]) -> OrmResult<Rows> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare_cached(sql_of(&command))?;
        let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
        let width = columns.len();

        let mut out = Rows::new(columns);
        let mut rows = stmt.query(params_from_iter(args.iter()))?;
        while let Some(row) = rows.next()? {
            let mut values = Vec::with_capacity(width);
            for i in 0..width {
                values.push(from_sqlite(row.get_ref(i)?));
            }
            out.push(values);
        }
        Ok(out)
    }

    fn statement_cache(&self) -> &StatementCache<String> {
        &self.statements
    }

    fn dialect(&self) -> Dialect {
        Dialect::Sqlite
    }
}

impl ToSql for Value {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        use rusqlite::types::Value as Sv;

        Ok(match self {
            Value::Null => ToSqlOutput::Owned(Sv::Null),
            Value::Bool(b) => ToSqlOutput::Owned(Sv::Integer(i64::from(*b))),
            Value::Int(i) => ToSqlOutput::Owned(Sv::Integer(*i)),
            Value::Float(f) => ToSqlOutput::Owned(Sv::Real(*f)),
            Value::Text(s) => ToSqlOutput::Borrowed(ValueRef::Text(s.as_bytes())),
            Value::Bytes(b) => ToSqlOutput::Borrowed(ValueRef::Blob(b)),
            Value::Time(t) => ToSqlOutput::Owned(Sv::Text(t.format(TEXT_TIME_FORMAT).to_string())),
        })
    }
}

fn from_sqlite(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::Int(i),
        ValueRef::Real(f) => Value::Float(f),
        ValueRef::Text(t) => Value::Text(String::from_utf8_lossy(t).into_owned()),
        ValueRef::Blob(b) => Value::Bytes(b.to_vec()),
    }
}
