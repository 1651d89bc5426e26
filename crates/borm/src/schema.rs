//! Schema reflection: field-to-column mapping, resolved once per type.
//!
//! [`SchemaCache::resolve`] runs the declared-field pass for a [`Record`] type the first
//! time it is seen and hands every later caller the same [`Shape`].

use crate::cache::OnceMap;
use crate::error::{OrmError, OrmResult};
use crate::record::{Binding, FieldSource, Record, StructDecl};
use crate::value::{FromValue, Value, parse_time};
use chrono::DateTime;
use std::any::TypeId;
use std::collections::HashSet;
use std::sync::{Arc, OnceLock};

/// Field name that marks the last-insert-id slot without an attribute.
pub const LAST_ID_FIELD: &str = "borm_last_id";

/// Column the generated identifier is read from when none is named.
pub const DEFAULT_ID_COLUMN: &str = "id";

/// Value conversion between a field and its column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Conversion {
    #[default]
    Plain,
    /// Integer field holding unix seconds, stored as a time value.
    UnixTime,
}

impl Conversion {
    /// Field value → column value.
    pub fn to_column(self, value: Value) -> Value {
        match (self, value) {
            (Conversion::UnixTime, Value::Int(secs)) => match DateTime::from_timestamp(secs, 0) {
                Some(t) => Value::Time(t),
                None => Value::Int(secs),
            },
            (_, value) => value,
        }
    }

    /// Column value → field value.
    pub fn from_column(self, value: Value) -> Result<Value, String> {
        match (self, value) {
            (Conversion::UnixTime, Value::Time(t)) => Ok(Value::Int(t.timestamp())),
            (Conversion::UnixTime, Value::Text(s)) => parse_time(&s)
                .map(|t| Value::Int(t.timestamp()))
                .ok_or_else(|| format!("cannot parse {s:?} as a time")),
            (Conversion::UnixTime, Value::Float(f)) => Ok(Value::Int(f as i64)),
            (_, value) => Ok(value),
        }
    }
}

/// One bound column of a struct record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    pub name: String,
    /// Index into the declared fields.
    pub field: usize,
    pub ident: &'static str,
    pub conversion: Conversion,
    /// Value can be read from the struct (insert/update).
    pub readable: bool,
    /// Value can be scanned into the struct (select).
    pub writable: bool,
}

impl Column {
    /// Whether `reference` (a field list entry or result column name) names this column.
    ///
    /// Quotes are ignored. A table prefix on only one side still matches; two different
    /// prefixes never do.
    pub fn matches(&self, reference: &str) -> bool {
        let reference = unquote(reference);
        let name = unquote(&self.name);
        if reference == name {
            return true;
        }
        let qualified = |s: &str| s.contains('.');
        !(qualified(&reference) && qualified(&name))
            && last_segment(&reference) == last_segment(&name)
    }

    fn matches_exactly(&self, reference: &str) -> bool {
        unquote(reference) == unquote(&self.name)
    }
}

fn unquote(s: &str) -> String {
    s.trim().chars().filter(|c| !matches!(c, '`' | '"')).collect()
}

fn last_segment(s: &str) -> &str {
    s.rsplit('.').next().unwrap_or(s)
}

/// Where the generated identifier of an insert goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LastInsertId {
    pub field: usize,
    /// Column named in a Postgres `RETURNING` clause.
    pub column: String,
}

/// Resolved column mapping for one struct type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schema {
    pub type_name: &'static str,
    pub table: Option<&'static str>,
    pub columns: Vec<Column>,
    pub last_insert_id: Option<LastInsertId>,
}

impl Schema {
    /// Build the mapping from declared fields.
    pub fn build(decl: StructDecl) -> OrmResult<Self> {
        let mut columns = Vec::with_capacity(decl.fields.len());
        let mut seen = HashSet::with_capacity(decl.fields.len());
        let mut last_insert_id: Option<LastInsertId> = None;

        for (idx, field) in decl.fields.iter().enumerate() {
            let reserved = field.ident.eq_ignore_ascii_case(LAST_ID_FIELD);
            if field.last_insert_id.is_some() || reserved {
                if last_insert_id.is_some() {
                    return Err(OrmError::unsupported_type(format!(
                        "{}: more than one last-insert-id field",
                        decl.type_name
                    )));
                }
                let column = field
                    .last_insert_id
                    .flatten()
                    .unwrap_or(DEFAULT_ID_COLUMN)
                    .to_string();
                last_insert_id = Some(LastInsertId { field: idx, column });
                continue;
            }

            let (readable, writable) = match field.binding {
                Binding::Public => (true, true),
                Binding::Accessor { get, set } => (get, set),
                Binding::Private | Binding::Skipped => continue,
            };
            if !readable && !writable {
                continue;
            }

            let name = match field.column {
                Some(tag) if !tag.trim().is_empty() => tag.to_string(),
                _ => field.ident.to_lowercase(),
            };
            if !seen.insert(name.clone()) {
                return Err(OrmError::unsupported_type(format!(
                    "{}: column '{}' is bound by more than one field",
                    decl.type_name, name
                )));
            }

            columns.push(Column {
                name,
                field: idx,
                ident: field.ident,
                conversion: if field.time {
                    Conversion::UnixTime
                } else {
                    Conversion::Plain
                },
                readable,
                writable,
            });
        }

        Ok(Self {
            type_name: decl.type_name,
            table: decl.table,
            columns,
            last_insert_id,
        })
    }

    pub fn column(&self, reference: &str) -> Option<&Column> {
        self.find(reference, |_| true)
            .ok()
            .map(|i| &self.columns[i])
    }

    /// Index of the column named by `reference` among those passing `usable`.
    ///
    /// An exact name wins. Otherwise a prefix-insensitive match must be unique; two
    /// candidates (`test.name` and `test2.name` for `name`) are a mapping error.
    pub fn find(&self, reference: &str, usable: impl Fn(&Column) -> bool) -> OrmResult<usize> {
        let usable: Vec<(usize, &Column)> =
            self.columns.iter().enumerate().filter(|(_, c)| usable(*c)).collect();
        if let Some((i, _)) = usable.iter().find(|(_, c)| c.matches_exactly(reference)) {
            return Ok(*i);
        }

        let mut candidates = usable.iter().filter(|(_, c)| c.matches(reference));
        match (candidates.next(), candidates.next()) {
            (Some((i, _)), None) => Ok(*i),
            (Some((_, a)), Some((_, b))) => Err(OrmError::mapping(
                reference,
                format!(
                    "ambiguous in {}: matches both '{}' and '{}'",
                    self.type_name, a.name, b.name
                ),
            )),
            (None, _) => Err(OrmError::mapping(
                reference,
                format!("{} has no usable field for this column", self.type_name),
            )),
        }
    }

    pub fn readable(&self) -> impl Iterator<Item = &Column> {
        self.columns.iter().filter(|c| c.readable)
    }

    pub fn writable(&self) -> impl Iterator<Item = &Column> {
        self.columns.iter().filter(|c| c.writable)
    }

    /// Read a column's value out of a record, converted for storage.
    pub fn read(&self, record: &dyn FieldSource, column: &Column) -> Value {
        column.conversion.to_column(record.field(column.field))
    }

    /// Store a column value into a record, converted back to the field's form.
    pub fn write<R: Record>(&self, record: &mut R, column: &Column, value: Value) -> OrmResult<()> {
        let value = column
            .conversion
            .from_column(value)
            .map_err(|m| OrmError::mapping(&column.name, m))?;
        record
            .set(column.field, value)
            .map_err(|m| OrmError::mapping(&column.name, m))
    }

    /// Store a generated identifier into the last-insert-id field, if the type has one.
    pub fn write_last_insert_id<R: Record>(&self, record: &mut R, id: Value) -> OrmResult<()> {
        let Some(slot) = &self.last_insert_id else {
            return Ok(());
        };
        let id = i64::from_value(id).map_err(|m| OrmError::mapping(&slot.column, m))?;
        record
            .set(slot.field, Value::Int(id))
            .map_err(|m| OrmError::mapping(&slot.column, m))
    }
}

/// Resolved shape of a record type.
#[derive(Debug, Clone)]
pub enum Shape {
    Scalar,
    Struct(Arc<Schema>),
}

impl Shape {
    pub fn schema(&self) -> Option<&Arc<Schema>> {
        match self {
            Shape::Scalar => None,
            Shape::Struct(schema) => Some(schema),
        }
    }
}

/// Memoized [`Shape`] per record type.
///
/// The process-wide instance is [`SchemaCache::global`]; tests and embedders can build
/// an isolated one with [`SchemaCache::new`] and hand it to a table handle.
#[derive(Debug, Default)]
pub struct SchemaCache {
    shapes: OnceMap<TypeId, Shape>,
}

impl SchemaCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide cache.
    pub fn global() -> Arc<SchemaCache> {
        static GLOBAL: OnceLock<Arc<SchemaCache>> = OnceLock::new();
        GLOBAL.get_or_init(|| Arc::new(SchemaCache::new())).clone()
    }

    /// Resolve the shape of `R`, building it on first use.
    pub fn resolve<R: Record>(&self) -> OrmResult<Shape> {
        self.shapes.get_or_try_init(TypeId::of::<R>(), || match R::describe() {
            None => Ok(Shape::Scalar),
            Some(decl) => {
                let schema = Schema::build(decl)?;
                tracing::debug!(
                    target: "borm::schema",
                    type_name = schema.type_name,
                    columns = schema.columns.len(),
                    "resolved schema"
                );
                Ok(Shape::Struct(Arc::new(schema)))
            }
        })
    }

    /// Number of resolved types.
    pub fn len(&self) -> usize {
        self.shapes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
