//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use borm::{Command, Database, Dialect, Exec, OrmResult, Rows, SqliteClient, StatementCache, Value};
use std::collections::VecDeque;
use std::sync::Mutex;

pub const TEST_TABLE: &str = "
    CREATE TABLE test (
        id      INTEGER PRIMARY KEY AUTOINCREMENT,
        name    TEXT    NOT NULL DEFAULT '',
        age     INTEGER NOT NULL DEFAULT 0,
        ctime   TEXT,
        ctime2  TEXT,
        nick    TEXT    NOT NULL DEFAULT ''
    );
    CREATE INDEX idx_ctime ON test (ctime);
";

/// In-memory SQLite database with the `test` table created.
pub fn sqlite() -> SqliteClient {
    let db = SqliteClient::open_in_memory().unwrap();
    db.execute_batch(TEST_TABLE).unwrap();
    db
}

/// Route `borm::sql` debug output to the test harness.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::INFO)
        .try_init();
}

/// One statement as the driver saw it.
#[derive(Debug, Clone, PartialEq)]
pub struct Call {
    pub sql: String,
    pub args: Vec<Value>,
    pub prepared: bool,
}

/// A driver that records every statement and answers from a queue.
pub struct Recorder {
    pub dialect: Dialect,
    calls: Mutex<Vec<Call>>,
    answers: Mutex<VecDeque<Rows>>,
    exec: Exec,
    statements: StatementCache<String>,
}

impl Recorder {
    pub fn new(dialect: Dialect) -> Self {
        Self {
            dialect,
            calls: Mutex::new(Vec::new()),
            answers: Mutex::new(VecDeque::new()),
            exec: Exec {
                rows_affected: 1,
                last_insert_id: Some(7),
            },
            statements: StatementCache::new(),
        }
    }

    /// Queue the rows returned by the next query.
    pub fn answer(&self, columns: &[&str], rows: Vec<Vec<Value>>) {
        let mut answer = Rows::new(columns.iter().map(|c| c.to_string()).collect());
        for row in rows {
            answer.push(row);
        }
        self.answers.lock().unwrap().push_back(answer);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn last(&self) -> Call {
        self.calls.lock().unwrap().last().cloned().expect("no statement ran")
    }

    fn record(&self, command: Command<'_, String>, args: &[Value]) {
        let (sql, prepared) = match command {
            Command::Sql(sql) => (sql.to_string(), false),
            Command::Prepared(sql) => (sql.clone(), true),
        };
        self.calls.lock().unwrap().push(Call {
            sql,
            args: args.to_vec(),
            prepared,
        });
    }
}

impl Database for Recorder {
    type Statement = String;

    fn prepare(&self, sql: &str) -> OrmResult<String> {
        Ok(sql.to_string())
    }

    fn execute(&self, command: Command<'_, String>, args: &[Value]) -> OrmResult<Exec> {
        self.record(command, args);
        Ok(self.exec)
    }

    fn query(&self, command: Command<'_, String>, args: &[Value]) -> OrmResult<Rows> {
        self.record(command, args);
        Ok(self.answers.lock().unwrap().pop_front().unwrap_or_default())
    }

    fn statement_cache(&self) -> &StatementCache<String> {
        &self.statements
    }

    fn dialect(&self) -> Dialect {
        self.dialect
    }
}
