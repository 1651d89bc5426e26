//! [`Database`] adapter over tokio-postgres.
//!
//! borm's verbs are synchronous, so the client owns a small private tokio runtime: the
//! connection task runs on it, and each call blocks on the request future.
//!
//! Calls must come from outside an async context (blocking inside a runtime panics).

mod config;
mod types;

pub use config::PgConfig;

use crate::cache::StatementCache;
use crate::client::{Command, Database, Exec, Rows};
use crate::dialect::Dialect;
use crate::error::{OrmError, OrmResult};
use crate::value::Value;
use tokio::runtime::Runtime;
use tokio_postgres::types::ToSql;
use tokio_postgres::{Client, NoTls, Statement};

/// A PostgreSQL connection usable as a borm [`Database`].
pub struct PgClient {
    client: Client,
    statements: StatementCache<Statement>,
    runtime: Runtime,
}

impl PgClient {
    /// Connect with `NoTls`.
    pub fn connect(config: PgConfig) -> OrmResult<Self> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(config.worker_threads.max(1))
            .thread_name("borm-postgres")
            .enable_all()
            .build()
            .map_err(OrmError::driver)?;

        let (client, connection) = runtime.block_on(tokio_postgres::connect(&config.url, NoTls))?;
        runtime.spawn(async move {
            if let Err(e) = connection.await {
                tracing::error!(target: "borm::postgres", error = %e, "connection closed");
            }
        });

        Ok(Self {
            client,
            statements: StatementCache::new(),
            runtime,
        })
    }

    /// Run one or more statements without arguments (DDL).
    pub fn batch_execute(&self, sql: &str) -> OrmResult<()> {
        self.runtime.block_on(self.client.batch_execute(sql))?;
        Ok(())
    }
}

fn column_names(columns: &[tokio_postgres::Column]) -> Vec<String> {
    columns.iter().map(|c| c.name().to_string()).collect()
}

fn params(args: &[Value]) -> Vec<&(dyn ToSql + Sync)> {
    args.iter().map(|a| a as &(dyn ToSql + Sync)).collect()
}

impl Database for PgClient {
    type Statement = Statement;

    fn prepare(&self, sql: &str) -> OrmResult<Statement> {
        Ok(self.runtime.block_on(self.client.prepare(sql))?)
    }

    fn execute(&self, command: Command<'_, Statement>, args: &[Value]) -> OrmResult<Exec> {
        let params = params(args);
        let affected = self.runtime.block_on(async {
            match command {
                Command::Sql(sql) => self.client.execute(sql, &params).await,
                Command::Prepared(stmt) => self.client.execute(stmt, &params).await,
            }
        })?;
        Ok(Exec {
            rows_affected: affected,
            last_insert_id: None,
        })
    }

    fn query(&self, command: Command<'_, Statement>, args: &[Value]) -> OrmResult<Rows> {
        let params = params(args);
        let (columns, rows) = self.runtime.block_on(async {
            let (columns, rows) = match command {
                Command::Sql(sql) => (None, self.client.query(sql, &params).await?),
                Command::Prepared(stmt) => (
                    Some(column_names(stmt.columns())),
                    self.client.query(stmt, &params).await?,
                ),
            };
            Ok::<_, tokio_postgres::Error>((columns, rows))
        })?;

        let columns: Vec<String> = columns.unwrap_or_else(|| {
            rows.first()
                .map(|r| column_names(r.columns()))
                .unwrap_or_default()
        });
        let mut out = Rows::new(columns);
        for row in &rows {
            out.push(types::decode_row(row)?);
        }
        Ok(out)
    }

    fn statement_cache(&self) -> &StatementCache<Statement> {
        &self.statements
    }

    fn dialect(&self) -> Dialect {
        Dialect::Postgres
    }
}
