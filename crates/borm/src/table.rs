//! Table handle: the four verbs, statement execution and row mapping.

use crate::clause::{Clause, ClauseSet, UpdateSource};
use crate::client::{Command, Database, Exec, Rows};
use crate::compose::{Composer, InsertStatement, Plan};
use crate::dialect::Dialect;
use crate::error::{OrmError, OrmResult};
use crate::record::{Destination, FieldSource, Record};
use crate::schema::{Schema, SchemaCache, Shape};
use crate::sql::{Rendered, Sql};
use crate::value::Value;
use std::fmt;
use std::sync::Arc;

/// A table (or raw join expression) bound to a database handle.
///
/// Modifiers never change the handle they are called on; each returns a new one, so a
/// handle shared between callers keeps its settings.
///
/// # Example
///
/// ```ignore
/// use borm::{Table, where_, eq, fields, offset_limit, order_by, gte, lte};
///
/// let t = Table::new(&db, "test").debug();
///
/// let mut o = Person::default();
/// t.select(&mut o, &[where_([eq("name", "Orca1")])])?;
///
/// let mut ids: Vec<i64> = Vec::new();
/// t.select(
///     &mut ids,
///     &[fields(["id"]), where_([gte("id", 0), lte("id", 1000)]), order_by(["id"]), offset_limit(0, 100)],
/// )?;
/// ```
pub struct Table<'a, D: Database> {
    db: &'a D,
    name: String,
    dialect: Dialect,
    reuse: bool,
    debug: bool,
    schemas: Arc<SchemaCache>,
}

impl<D: Database> Clone for Table<'_, D> {
    fn clone(&self) -> Self {
        Self {
            db: self.db,
            name: self.name.clone(),
            dialect: self.dialect,
            reuse: self.reuse,
            debug: self.debug,
            schemas: self.schemas.clone(),
        }
    }
}

impl<D: Database> fmt::Debug for Table<'_, D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Table")
            .field("name", &self.name)
            .field("dialect", &self.dialect)
            .field("reuse", &self.reuse)
            .field("debug", &self.debug)
            .finish_non_exhaustive()
    }
}

impl<'a, D: Database> Table<'a, D> {
    /// Bind `name` (a table name or a raw table expression) to `db`.
    ///
    /// The dialect starts as [`Database::dialect`], and schemas resolve through
    /// [`SchemaCache::global`].
    pub fn new(db: &'a D, name: impl Into<String>) -> Self {
        Self {
            db,
            name: name.into(),
            dialect: db.dialect(),
            reuse: false,
            debug: false,
            schemas: SchemaCache::global(),
        }
    }

    /// Emit every statement and its arguments as a `borm::sql` tracing event.
    pub fn debug(&self) -> Self {
        Self {
            debug: true,
            ..self.clone()
        }
    }

    /// Prepare each distinct statement once and reuse it from the database's cache.
    pub fn reuse(&self) -> Self {
        Self {
            reuse: true,
            ..self.clone()
        }
    }

    pub fn use_pg(&self) -> Self {
        self.dialect(Dialect::Postgres)
    }

    pub fn use_sqlite(&self) -> Self {
        self.dialect(Dialect::Sqlite)
    }

    pub fn use_mysql(&self) -> Self {
        self.dialect(Dialect::MySql)
    }

    pub fn dialect(&self, dialect: Dialect) -> Self {
        Self {
            dialect,
            ..self.clone()
        }
    }

    /// Resolve schemas through `cache` instead of the process-wide one.
    pub fn with_schema_cache(&self, cache: Arc<SchemaCache>) -> Self {
        Self {
            schemas: cache,
            ..self.clone()
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn dialect_kind(&self) -> Dialect {
        self.dialect
    }

    pub fn is_debug(&self) -> bool {
        self.debug
    }

    pub fn is_reuse(&self) -> bool {
        self.reuse
    }

    fn composer(&self) -> Composer<'_> {
        Composer::new(&self.name, self.dialect)
    }

    // ==================== Verbs ====================

    /// Scan matching rows into `dest` and return how many were stored.
    ///
    /// Collections keep every row in order. Single destinations keep the first row
    /// (`Option` becomes `None` when nothing matched). Zero rows is `Ok(0)`.
    pub fn select<T: Destination>(&self, dest: &mut T, clauses: &[Clause]) -> OrmResult<u64> {
        let (sql, plan) = self.compose_select::<T::Item>(clauses)?;
        let rendered = sql.render(self.dialect);
        let Rows { columns, rows } = self.run_query(&rendered)?;
        let mut rows = rows.into_iter();

        if T::MANY {
            dest.reset();
            let mut stored = 0;
            for row in rows {
                let mut item = T::Item::blank();
                scan(&plan, &columns, row, &mut item)?;
                dest.put(item);
                stored += 1;
            }
            return Ok(stored);
        }

        let Some(row) = rows.next() else {
            dest.reset();
            return Ok(0);
        };
        let existing = dest.items_mut().into_iter().next();
        match existing {
            Some(item) => scan(&plan, &columns, row, item)?,
            None => {
                let mut item = T::Item::blank();
                scan(&plan, &columns, row, &mut item)?;
                dest.put(item);
            }
        }
        Ok(1)
    }

    /// Insert every record held by `dest` in one statement and return rows affected.
    ///
    /// For a single record whose type has a last-insert-id field, the generated id is
    /// written back. An empty collection inserts nothing and returns `Ok(0)`.
    pub fn insert<T: Destination>(&self, dest: &mut T, clauses: &[Clause]) -> OrmResult<u64> {
        let shape = self.schemas.resolve::<T::Item>()?;
        let schema = struct_schema(&shape, "insert")?;
        let Some(stmt) = self.compose_insert(schema, dest, clauses)? else {
            return Ok(0);
        };
        let single = dest.items().len() == 1;
        let returning = stmt.returning;
        let rendered = stmt.sql.render(self.dialect);

        let (affected, id) = if returning {
            let rows = self.run_query(&rendered)?;
            let id = rows.rows.first().and_then(|r| r.first()).cloned();
            (rows.len() as u64, id)
        } else {
            let exec = self.run_execute(&rendered)?;
            (exec.rows_affected, exec.last_insert_id.map(Value::Int))
        };

        if single && schema.last_insert_id.is_some() {
            if let (Some(id), Some(item)) = (id, dest.items_mut().into_iter().next()) {
                schema.write_last_insert_id(item, id)?;
            }
        }
        Ok(affected)
    }

    /// Update matching rows from a struct (sparse) or an [`crate::UpdateMap`].
    pub fn update<'s>(
        &self,
        source: impl Into<UpdateSource<'s>>,
        clauses: &[Clause],
    ) -> OrmResult<u64> {
        let rendered = self.render_update(source, clauses)?;
        Ok(self.run_execute(&rendered)?.rows_affected)
    }

    pub fn delete(&self, clauses: &[Clause]) -> OrmResult<u64> {
        let rendered = self.render_delete(clauses)?;
        Ok(self.run_execute(&rendered)?.rows_affected)
    }

    // ==================== Rendering without execution ====================

    /// The SELECT that [`Table::select`] would run for destination type `T`.
    pub fn render_select<T: Destination>(&self, clauses: &[Clause]) -> OrmResult<Rendered> {
        let (sql, _) = self.compose_select::<T::Item>(clauses)?;
        Ok(sql.render(self.dialect))
    }

    /// The INSERT that [`Table::insert`] would run, or `None` for an empty collection,
    /// which sends nothing.
    pub fn render_insert<T: Destination>(
        &self,
        dest: &T,
        clauses: &[Clause],
    ) -> OrmResult<Option<Rendered>> {
        let shape = self.schemas.resolve::<T::Item>()?;
        let schema = struct_schema(&shape, "insert")?;
        Ok(self
            .compose_insert(schema, dest, clauses)?
            .map(|stmt| stmt.sql.render(self.dialect)))
    }

    pub fn render_update<'s>(
        &self,
        source: impl Into<UpdateSource<'s>>,
        clauses: &[Clause],
    ) -> OrmResult<Rendered> {
        let set = ClauseSet::collect(clauses);
        let sql: Sql = match source.into() {
            UpdateSource::Struct(record) => {
                let shape = record.shape(&self.schemas)?;
                let schema = struct_schema(&shape, "update")?;
                self.composer().update_struct(schema, record, &set)?
            }
            UpdateSource::Map(map) => self.composer().update_map(map, &set)?,
        };
        Ok(sql.render(self.dialect))
    }

    pub fn render_delete(&self, clauses: &[Clause]) -> OrmResult<Rendered> {
        let sql = self.composer().delete(&ClauseSet::collect(clauses))?;
        Ok(sql.render(self.dialect))
    }

    fn compose_insert<T: Destination>(
        &self,
        schema: &Schema,
        dest: &T,
        clauses: &[Clause],
    ) -> OrmResult<Option<InsertStatement>> {
        let items = dest.items();
        if items.is_empty() {
            return Ok(None);
        }
        let records: Vec<&dyn FieldSource> =
            items.iter().map(|r| *r as &dyn FieldSource).collect();
        self.composer()
            .insert(schema, &records, &ClauseSet::collect(clauses))
            .map(Some)
    }

    fn compose_select<R: Record>(&self, clauses: &[Clause]) -> OrmResult<(Sql, Plan)> {
        let shape = self.schemas.resolve::<R>()?;
        self.composer().select(&shape, &ClauseSet::collect(clauses))
    }

    // ==================== Execution ====================

    fn trace(&self, rendered: &Rendered) {
        if self.debug {
            tracing::info!(
                target: "borm::sql",
                dialect = %self.dialect,
                table = %self.name,
                reuse = self.reuse,
                sql = %rendered.sql,
                args = ?rendered.args,
                "executing statement"
            );
        }
    }

    fn prepared(&self, sql: &str) -> OrmResult<D::Statement> {
        self.db
            .statement_cache()
            .get_or_prepare(sql, |s| self.db.prepare(s))
    }

    fn run_execute(&self, rendered: &Rendered) -> OrmResult<Exec> {
        self.trace(rendered);
        if self.reuse {
            let stmt = self.prepared(&rendered.sql)?;
            self.db.execute(Command::Prepared(&stmt), &rendered.args)
        } else {
            self.db.execute(Command::Sql(&rendered.sql), &rendered.args)
        }
    }

    fn run_query(&self, rendered: &Rendered) -> OrmResult<Rows> {
        self.trace(rendered);
        if self.reuse {
            let stmt = self.prepared(&rendered.sql)?;
            self.db.query(Command::Prepared(&stmt), &rendered.args)
        } else {
            self.db.query(Command::Sql(&rendered.sql), &rendered.args)
        }
    }
}

fn struct_schema<'s>(shape: &'s Shape, verb: &str) -> OrmResult<&'s Schema> {
    match shape {
        Shape::Struct(schema) => Ok(schema.as_ref()),
        Shape::Scalar => Err(OrmError::unsupported_type(format!(
            "{verb} needs a struct destination, not a scalar"
        ))),
    }
}

/// Store one result row into `target`.
fn scan<R: Record>(plan: &Plan, columns: &[String], row: Vec<Value>, target: &mut R) -> OrmResult<()> {
    match plan {
        Plan::Scalar => {
            let column = columns.first().map(String::as_str).unwrap_or("?column?");
            let value = row
                .into_iter()
                .next()
                .ok_or_else(|| OrmError::mapping(column, "result row has no columns"))?;
            target
                .set(0, value)
                .map_err(|m| OrmError::mapping(column, m))
        }
        Plan::Struct {
            schema,
            columns: mapping,
        } => {
            for (value, &idx) in row.into_iter().zip(mapping) {
                schema.write(target, &schema.columns[idx], value)?;
            }
            Ok(())
        }
    }
}
