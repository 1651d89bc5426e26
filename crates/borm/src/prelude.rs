//! Convenient imports for typical `borm` usage.
//!
//! ```ignore
//! use borm::prelude::*;
//! ```

pub use crate::{Database, Dialect, OrmError, OrmResult, Table, UpdateMap, Value};

pub use crate::{
    between, cond, eq, expr, fields, force_index, group_by, gt, gte, having, in_list, limit, lt,
    lte, neq, offset_limit, order_by, raw, where_,
};

#[cfg(feature = "derive")]
pub use crate::Entity;

#[cfg(feature = "sqlite")]
pub use crate::{SqliteClient, SqliteConfig};

#[cfg(feature = "postgres")]
pub use crate::{PgClient, PgConfig};
