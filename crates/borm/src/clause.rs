//! Clause descriptors passed to the verbs, and the update-value container.

use crate::condition::Condition;
use crate::error::OrmResult;
use crate::record::{FieldSource, Record};
use crate::value::Value;
use std::collections::BTreeMap;
use std::collections::btree_map;

/// One optional query modifier.
///
/// Any number of clauses may be passed to a verb, in any order; the rendered statement
/// always uses the canonical order (fields, index hint, WHERE, GROUP BY, HAVING,
/// ORDER BY, LIMIT/OFFSET).
#[derive(Debug, Clone, PartialEq)]
pub enum Clause {
    Fields(Vec<String>),
    Where(Vec<Condition>),
    GroupBy(Vec<String>),
    Having(Vec<Condition>),
    OrderBy(Vec<String>),
    Limit { offset: Option<u64>, count: u64 },
    ForceIndex(String),
}

fn strings<S: Into<String>>(items: impl IntoIterator<Item = S>) -> Vec<String> {
    items.into_iter().map(Into::into).collect()
}

/// Explicit field list: column names or expressions such as `count(1)`.
pub fn fields<S: Into<String>>(names: impl IntoIterator<Item = S>) -> Clause {
    Clause::Fields(strings(names))
}

/// WHERE conditions, joined with `AND`.
pub fn where_(conditions: impl IntoIterator<Item = Condition>) -> Clause {
    Clause::Where(conditions.into_iter().collect())
}

pub fn group_by<S: Into<String>>(columns: impl IntoIterator<Item = S>) -> Clause {
    Clause::GroupBy(strings(columns))
}

/// HAVING conditions, joined with `AND`.
pub fn having(conditions: impl IntoIterator<Item = Condition>) -> Clause {
    Clause::Having(conditions.into_iter().collect())
}

/// ORDER BY entries; `"id"` is quoted, `"id desc"` is emitted as written.
pub fn order_by<S: Into<String>>(columns: impl IntoIterator<Item = S>) -> Clause {
    Clause::OrderBy(strings(columns))
}

pub fn limit(count: u64) -> Clause {
    Clause::Limit {
        offset: None,
        count,
    }
}

pub fn offset_limit(offset: u64, count: u64) -> Clause {
    Clause::Limit {
        offset: Some(offset),
        count,
    }
}

/// Index hint for SELECT; dialects without index hints reject it.
pub fn force_index(index: impl Into<String>) -> Clause {
    Clause::ForceIndex(index.into())
}

/// Clauses of one call, collected by kind.
///
/// Repeated `Fields`/`Where`/`GroupBy`/`Having`/`OrderBy` clauses accumulate; for
/// `Limit` and `ForceIndex` the last one wins.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClauseSet {
    pub fields: Vec<String>,
    pub wheres: Vec<Condition>,
    pub group_by: Vec<String>,
    pub having: Vec<Condition>,
    pub order_by: Vec<String>,
    pub limit: Option<(Option<u64>, u64)>,
    pub force_index: Option<String>,
}

impl ClauseSet {
    pub fn collect(clauses: &[Clause]) -> Self {
        let mut set = Self::default();
        for clause in clauses {
            match clause {
                Clause::Fields(f) => set.fields.extend(f.iter().cloned()),
                Clause::Where(c) => set.wheres.extend(c.iter().cloned()),
                Clause::GroupBy(g) => set.group_by.extend(g.iter().cloned()),
                Clause::Having(c) => set.having.extend(c.iter().cloned()),
                Clause::OrderBy(o) => set.order_by.extend(o.iter().cloned()),
                Clause::Limit { offset, count } => set.limit = Some((*offset, *count)),
                Clause::ForceIndex(idx) => set.force_index = Some(idx.clone()),
            }
        }
        set
    }

    /// Validate every condition before anything is rendered.
    pub fn validate(&self) -> OrmResult<()> {
        self.wheres
            .iter()
            .chain(&self.having)
            .try_for_each(Condition::validate)
    }
}

/// Right-hand side of one `SET` entry.
#[derive(Debug, Clone, PartialEq)]
pub enum Assign {
    /// Bound as a parameter.
    Value(Value),
    /// Emitted verbatim, e.g. `age+1`.
    Expr(String),
}

/// Raw SQL expression for an update entry.
pub fn expr(sql: impl Into<String>) -> Assign {
    Assign::Expr(sql.into())
}

/// Column → value map for [`crate::Table::update`].
///
/// Entries are kept sorted by column, so the argument order of the generated statement
/// does not depend on insertion order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpdateMap {
    entries: BTreeMap<String, Assign>,
}

impl UpdateMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `value` to `column`.
    pub fn set(self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.assign(column, Assign::Value(value.into()))
    }

    /// Set `column` to a raw SQL expression.
    pub fn set_expr(self, column: impl Into<String>, sql: impl Into<String>) -> Self {
        self.assign(column, expr(sql))
    }

    pub fn assign(mut self, column: impl Into<String>, value: Assign) -> Self {
        self.entries.insert(column.into(), value);
        self
    }

    pub fn insert(&mut self, column: impl Into<String>, value: Assign) -> Option<Assign> {
        self.entries.insert(column.into(), value)
    }

    pub fn iter(&self) -> btree_map::Iter<'_, String, Assign> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<'a> IntoIterator for &'a UpdateMap {
    type Item = (&'a String, &'a Assign);
    type IntoIter = btree_map::Iter<'a, String, Assign>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

/// What an update writes: a struct's fields or an explicit map.
#[derive(Clone, Copy)]
pub enum UpdateSource<'a> {
    Struct(&'a dyn FieldSource),
    Map(&'a UpdateMap),
}

impl<'a, T: Record> From<&'a T> for UpdateSource<'a> {
    fn from(record: &'a T) -> Self {
        UpdateSource::Struct(record)
    }
}

impl<'a> From<&'a UpdateMap> for UpdateSource<'a> {
    fn from(map: &'a UpdateMap) -> Self {
        UpdateSource::Map(map)
    }
}
