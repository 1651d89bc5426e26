//! # borm
//!
//! Struct-driven CRUD with dialect-aware, parameterized SQL.
//!
//! ## Features
//!
//! - **Declared mapping**: `#[derive(Entity)]` describes field → column binding once per type
//! - **Composable clauses**: fields, where, group by, having, order by, limit, index hints
//! - **Parameterized always**: values are bound, never interpolated; `$n` numbering follows
//!   the final statement order
//! - **Dialects**: MySQL (default), PostgreSQL, SQLite
//! - **Any driver**: runs through the synchronous [`Database`] trait; SQLite and Postgres
//!   adapters are included behind features
//!
//! ## Example
//!
//! ```ignore
//! use borm::prelude::*;
//!
//! #[derive(Debug, Default, Entity)]
//! struct Person {
//!     #[borm(column = "name")]
//!     pub x: String,
//!     #[borm(column = "age")]
//!     pub y: i64,
//!     #[borm(column = "ctime", time)]
//!     pub z1: i64,
//! }
//!
//! let db = SqliteClient::open_in_memory()?;
//! let t = Table::new(&db, "test").debug();
//!
//! t.insert(&mut Person { x: "Orca1".into(), y: 20, z1: 1551405784 }, &[])?;
//!
//! let mut o = Person::default();
//! t.select(&mut o, &[where_([eq("name", "Orca1")])])?;
//!
//! t.update(&UpdateMap::new().set_expr("age", "age+1"), &[where_([eq("name", "Orca1")])])?;
//!
//! let mut count = 0i64;
//! t.select(&mut count, &[fields(["count(1)"])])?;
//! ```

extern crate self as borm;

pub mod cache;
pub mod clause;
pub mod client;
mod compose;
pub mod condition;
pub mod dialect;
pub mod error;
pub mod ident;
pub mod prelude;
pub mod record;
pub mod schema;
pub mod sql;
pub mod table;
pub mod value;

#[cfg(feature = "postgres")]
pub mod postgres;
#[cfg(feature = "sqlite")]
pub mod sqlite;

pub use cache::{OnceMap, SharedStatementCache, StatementCache};
pub use clause::{
    Assign, Clause, ClauseSet, UpdateMap, UpdateSource, expr, fields, force_index, group_by,
    having, limit, offset_limit, order_by, where_,
};
pub use client::{Command, Database, Exec, Rows};
pub use condition::{Condition, Op, between, cond, eq, gt, gte, in_list, lt, lte, neq, raw};
pub use dialect::{Dialect, InsertId};
pub use error::{OrmError, OrmResult};
pub use ident::Ident;
pub use record::{Binding, Destination, FieldDecl, FieldSource, Record, StructDecl};
pub use schema::{Column, Conversion, Schema, SchemaCache, Shape};
pub use sql::{Rendered, Sql};
pub use table::Table;
pub use value::{FromValue, ToValue, Value};

#[cfg(feature = "postgres")]
pub use postgres::{PgClient, PgConfig};
#[cfg(feature = "sqlite")]
pub use sqlite::{SqliteClient, SqliteConfig};

#[cfg(feature = "derive")]
pub use borm_derive::Entity;
