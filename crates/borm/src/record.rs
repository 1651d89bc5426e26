//! Row-level and destination-level mapping traits.
//!
//! A [`Record`] is one row: either a struct (described by `#[derive(Entity)]`) or a
//! scalar. A [`Destination`] is what a verb is called with: a single record, an
//! `Option`, a `Box`, or a `Vec` of records.

use crate::error::OrmResult;
use crate::schema::{SchemaCache, Shape};
use crate::value::{FromValue, ToValue, Value};
use chrono::{DateTime, NaiveDateTime, Utc};

/// How a declared field takes part in column binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Binding {
    /// `pub` field, read and written directly.
    Public,
    /// Non-`pub` field without accessors; never bound.
    Private,
    /// Non-`pub` field bound through accessor methods.
    Accessor { get: bool, set: bool },
    /// `#[borm(skip)]`
    Skipped,
}

/// One declared field, as emitted by the derive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDecl {
    pub ident: &'static str,
    /// Explicit `#[borm(column = "..")]`.
    pub column: Option<&'static str>,
    /// `#[borm(time)]`: the integer field holds a unix timestamp.
    pub time: bool,
    pub binding: Binding,
    /// `#[borm(last_insert_id)]`, carrying the RETURNING column when one was given.
    pub last_insert_id: Option<Option<&'static str>>,
}

impl FieldDecl {
    pub const fn new(ident: &'static str) -> Self {
        Self {
            ident,
            column: None,
            time: false,
            binding: Binding::Public,
            last_insert_id: None,
        }
    }

    pub const fn column(mut self, column: &'static str) -> Self {
        self.column = Some(column);
        self
    }

    pub const fn time(mut self) -> Self {
        self.time = true;
        self
    }

    pub const fn binding(mut self, binding: Binding) -> Self {
        self.binding = binding;
        self
    }

    pub const fn last_insert_id(mut self, returning: Option<&'static str>) -> Self {
        self.last_insert_id = Some(returning);
        self
    }
}

/// The declared shape of a struct record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructDecl {
    pub type_name: &'static str,
    /// `#[borm(table = "..")]`, overriding the table handle's name.
    pub table: Option<&'static str>,
    pub fields: Vec<FieldDecl>,
}

/// A type that one result row maps onto.
///
/// Field indices refer to positions in [`StructDecl::fields`]; scalars ignore the index.
pub trait Record: Sized + 'static {
    /// Declared fields for struct records; `None` for scalars.
    ///
    /// Called once per type by [`SchemaCache`].
    fn describe() -> Option<StructDecl>;

    /// An empty instance to scan into.
    fn blank() -> Self;

    fn get(&self, field: usize) -> Value;

    fn set(&mut self, field: usize, value: Value) -> Result<(), String>;
}

/// What a verb reads from or scans into.
pub trait Destination {
    type Item: Record;

    /// Collections keep every row; everything else keeps the first.
    const MANY: bool;

    /// Drop previously held rows before scanning.
    fn reset(&mut self);

    fn put(&mut self, item: Self::Item);

    fn items(&self) -> Vec<&Self::Item>;

    fn items_mut(&mut self) -> Vec<&mut Self::Item>;
}

/// Object-safe view of a record, used by [`crate::UpdateSource`].
pub trait FieldSource {
    fn shape(&self, cache: &SchemaCache) -> OrmResult<Shape>;

    fn field(&self, field: usize) -> Value;
}

impl<T: Record> FieldSource for T {
    fn shape(&self, cache: &SchemaCache) -> OrmResult<Shape> {
        cache.resolve::<T>()
    }

    fn field(&self, field: usize) -> Value {
        self.get(field)
    }
}

impl<T: Record> Record for Box<T> {
    fn describe() -> Option<StructDecl> {
        T::describe()
    }

    fn blank() -> Self {
        Box::new(T::blank())
    }

    fn get(&self, field: usize) -> Value {
        (**self).get(field)
    }

    fn set(&mut self, field: usize, value: Value) -> Result<(), String> {
        (**self).set(field, value)
    }
}

impl<T> Record for Option<T>
where
    T: FromValue + ToValue + 'static,
{
    fn describe() -> Option<StructDecl> {
        None
    }

    fn blank() -> Self {
        None
    }

    fn get(&self, _field: usize) -> Value {
        match self {
            Some(v) => v.to_value(),
            None => Value::Null,
        }
    }

    fn set(&mut self, _field: usize, value: Value) -> Result<(), String> {
        *self = FromValue::from_value(value)?;
        Ok(())
    }
}

impl<T: Record> Destination for Vec<T> {
    type Item = T;
    const MANY: bool = true;

    fn reset(&mut self) {
        self.clear();
    }

    fn put(&mut self, item: T) {
        self.push(item);
    }

    fn items(&self) -> Vec<&T> {
        self.iter().collect()
    }

    fn items_mut(&mut self) -> Vec<&mut T> {
        self.iter_mut().collect()
    }
}

impl<T: Record> Destination for Option<T> {
    type Item = T;
    const MANY: bool = false;

    fn reset(&mut self) {
        *self = None;
    }

    fn put(&mut self, item: T) {
        *self = Some(item);
    }

    fn items(&self) -> Vec<&T> {
        self.iter().collect()
    }

    fn items_mut(&mut self) -> Vec<&mut T> {
        self.iter_mut().collect()
    }
}

impl<T: Record> Destination for Box<T> {
    type Item = T;
    const MANY: bool = false;

    fn reset(&mut self) {}

    fn put(&mut self, item: T) {
        **self = item;
    }

    fn items(&self) -> Vec<&T> {
        vec![&**self]
    }

    fn items_mut(&mut self) -> Vec<&mut T> {
        vec![&mut **self]
    }
}

/// Implement [`Record`] for a scalar type.
macro_rules! impl_scalar_record {
    ($($t:ty),* $(,)?) => {
        $(
            impl Record for $t {
                fn describe() -> Option<StructDecl> {
                    None
                }

                fn blank() -> Self {
                    <$t>::default()
                }

                fn get(&self, _field: usize) -> Value {
                    self.to_value()
                }

                fn set(&mut self, _field: usize, value: Value) -> Result<(), String> {
                    *self = FromValue::from_value(value)?;
                    Ok(())
                }
            }
        )*
    };
}

/// Implement [`Destination`] for a single scalar.
macro_rules! impl_scalar_destination {
    ($($t:ty),* $(,)?) => {
        $(
            impl Destination for $t {
                type Item = $t;
                const MANY: bool = false;

                fn reset(&mut self) {}

                fn put(&mut self, item: $t) {
                    *self = item;
                }

                fn items(&self) -> Vec<&$t> {
                    vec![self]
                }

                fn items_mut(&mut self) -> Vec<&mut $t> {
                    vec![self]
                }
            }
        )*
    };
}

impl_scalar_record!(
    i8,
    i16,
    i32,
    i64,
    u8,
    u16,
    u32,
    f32,
    f64,
    bool,
    String,
    Vec<u8>,
    Value,
    DateTime<Utc>,
    NaiveDateTime,
);

// `Vec<u8>` is left out: as a destination it is a list of `u8` rows.
impl_scalar_destination!(
    i8,
    i16,
    i32,
    i64,
    u8,
    u16,
    u32,
    f32,
    f64,
    bool,
    String,
    Value,
    DateTime<Utc>,
    NaiveDateTime,
);
