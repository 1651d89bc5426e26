//! Query condition types for WHERE and HAVING clauses.
//!
//! This module provides [`Op`] (operator) and [`Condition`] primitives. Conditions of one
//! clause are joined with `AND` in the order given; there is no nesting.
//!
//! Constructors never fail. A malformed condition (empty column, empty `IN` list, empty
//! raw fragment, or a raw fragment whose `?` count does not match its arguments) is
//! reported by [`Condition::validate`] when the statement is composed, before anything
//! is sent to the database.

use crate::error::{OrmError, OrmResult};
use crate::sql::{Sql, count_markers};
use crate::value::Value;

/// Query operator with its operands.
///
/// # Example
/// ```ignore
/// use borm::{Condition, Op};
///
/// Condition::new("age", Op::gte(18));
/// Condition::new("id", Op::in_list([1, 2, 3]));
/// Condition::new("ctime", Op::between(0, 1000));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum Op {
    /// Equal: column = value
    Eq(Value),
    /// Not equal: column != value
    Ne(Value),
    /// Greater than: column > value
    Gt(Value),
    /// Greater than or equal: column >= value
    Gte(Value),
    /// Less than: column < value
    Lt(Value),
    /// Less than or equal: column <= value
    Lte(Value),
    /// IN (list)
    In(Vec<Value>),
    /// BETWEEN a AND b (inclusive)
    Between(Value, Value),
}

impl Op {
    pub fn eq(val: impl Into<Value>) -> Self {
        Op::Eq(val.into())
    }

    pub fn ne(val: impl Into<Value>) -> Self {
        Op::Ne(val.into())
    }

    pub fn gt(val: impl Into<Value>) -> Self {
        Op::Gt(val.into())
    }

    pub fn gte(val: impl Into<Value>) -> Self {
        Op::Gte(val.into())
    }

    pub fn lt(val: impl Into<Value>) -> Self {
        Op::Lt(val.into())
    }

    pub fn lte(val: impl Into<Value>) -> Self {
        Op::Lte(val.into())
    }

    pub fn in_list<T: Into<Value>>(vals: impl IntoIterator<Item = T>) -> Self {
        Op::In(vals.into_iter().map(Into::into).collect())
    }

    pub fn between(from: impl Into<Value>, to: impl Into<Value>) -> Self {
        Op::Between(from.into(), to.into())
    }

    fn operator(&self) -> &'static str {
        match self {
            Op::Eq(_) => "=",
            Op::Ne(_) => "!=",
            Op::Gt(_) => ">",
            Op::Gte(_) => ">=",
            Op::Lt(_) => "<",
            Op::Lte(_) => "<=",
            Op::In(_) => "IN",
            Op::Between(..) => "BETWEEN",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum ConditionInner {
    /// Caller-written fragment with `?` markers.
    ///
    /// # Safety
    /// Be careful with SQL injection when using raw conditions.
    Raw { sql: String, args: Vec<Value> },
    /// A structured condition over a column reference.
    Expr { column: String, op: Op },
}

/// One predicate of a WHERE or HAVING clause.
#[derive(Debug, Clone, PartialEq)]
pub struct Condition(ConditionInner);

impl Condition {
    /// Create a structured condition. `column` may be a plain identifier (quoted on
    /// render) or an expression such as `count(1)` (emitted verbatim).
    pub fn new(column: impl Into<String>, op: Op) -> Self {
        Condition(ConditionInner::Expr {
            column: column.into(),
            op,
        })
    }

    /// Create a raw condition whose `?` markers take `args` in order.
    ///
    /// # Safety
    /// Be careful with SQL injection when using raw conditions.
    pub fn raw_with_args(sql: impl Into<String>, args: Vec<Value>) -> Self {
        Condition(ConditionInner::Raw {
            sql: sql.into(),
            args,
        })
    }

    /// Number of placeholders this condition contributes.
    pub fn arg_count(&self) -> usize {
        match &self.0 {
            ConditionInner::Raw { args, .. } => args.len(),
            ConditionInner::Expr { op, .. } => match op {
                Op::In(vals) => vals.len(),
                Op::Between(..) => 2,
                _ => 1,
            },
        }
    }

    /// Reject conditions that cannot be rendered.
    pub fn validate(&self) -> OrmResult<()> {
        match &self.0 {
            ConditionInner::Raw { sql, args } => {
                if sql.trim().is_empty() {
                    return Err(OrmError::invalid_condition("empty raw condition"));
                }
                let markers = count_markers(sql);
                if markers != args.len() {
                    return Err(OrmError::invalid_condition(format!(
                        "raw condition {sql:?} has {markers} placeholder(s) but {} argument(s)",
                        args.len()
                    )));
                }
            }
            ConditionInner::Expr { column, op } => {
                if column.trim().is_empty() {
                    return Err(OrmError::invalid_condition(format!(
                        "empty column in {} condition",
                        op.operator()
                    )));
                }
                if let Op::In(vals) = op {
                    if vals.is_empty() {
                        return Err(OrmError::invalid_condition(format!(
                            "empty IN list for column {column}"
                        )));
                    }
                }
            }
        }
        Ok(())
    }

    /// Append this condition into a [`Sql`] builder.
    ///
    /// Placeholders are generated by `Sql`, so they are numbered together with the
    /// rest of the statement.
    pub fn append_to_sql(&self, sql: &mut Sql) {
        match &self.0 {
            ConditionInner::Raw { sql: fragment, args } => {
                sql.push_fragment(fragment, args.clone());
            }
            ConditionInner::Expr { column, op } => {
                sql.push_ident(column);
                sql.push(" ");
                sql.push(op.operator());
                sql.push(" ");
                match op {
                    Op::Eq(v) | Op::Ne(v) | Op::Gt(v) | Op::Gte(v) | Op::Lt(v) | Op::Lte(v) => {
                        sql.push_bind(v.clone());
                    }
                    Op::In(vals) => {
                        sql.push("(");
                        sql.push_bind_list(vals.iter().cloned());
                        sql.push(")");
                    }
                    Op::Between(from, to) => {
                        sql.push_bind(from.clone());
                        sql.push(" AND ");
                        sql.push_bind(to.clone());
                    }
                }
            }
        }
    }
}

// ==================== Convenience constructors ====================

/// `column = value`
pub fn eq(column: impl Into<String>, value: impl Into<Value>) -> Condition {
    Condition::new(column, Op::eq(value))
}

/// `column != value`
pub fn neq(column: impl Into<String>, value: impl Into<Value>) -> Condition {
    Condition::new(column, Op::ne(value))
}

/// `column > value`
pub fn gt(column: impl Into<String>, value: impl Into<Value>) -> Condition {
    Condition::new(column, Op::gt(value))
}

/// `column >= value`
pub fn gte(column: impl Into<String>, value: impl Into<Value>) -> Condition {
    Condition::new(column, Op::gte(value))
}

/// `column < value`
pub fn lt(column: impl Into<String>, value: impl Into<Value>) -> Condition {
    Condition::new(column, Op::lt(value))
}

/// `column <= value`
pub fn lte(column: impl Into<String>, value: impl Into<Value>) -> Condition {
    Condition::new(column, Op::lte(value))
}

/// `column BETWEEN from AND to`, both bounds inclusive.
pub fn between(
    column: impl Into<String>,
    from: impl Into<Value>,
    to: impl Into<Value>,
) -> Condition {
    Condition::new(column, Op::between(from, to))
}

/// `column IN (values...)`; an empty list is rejected when the statement is composed.
pub fn in_list<T: Into<Value>>(
    column: impl Into<String>,
    values: impl IntoIterator<Item = T>,
) -> Condition {
    Condition::new(column, Op::in_list(values))
}

/// Raw fragment with `?` markers and their arguments, e.g.
/// `cond("name = ? OR age > ?", vec!["x".into(), 3.into()])`.
pub fn cond(sql: impl Into<String>, args: Vec<Value>) -> Condition {
    Condition::raw_with_args(sql, args)
}

/// Raw fragment without arguments.
pub fn raw(sql: impl Into<String>) -> Condition {
    Condition::raw_with_args(sql, Vec::new())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::Dialect;
    use pretty_assertions::assert_eq;

    fn render(conds: &[Condition], dialect: Dialect) -> (String, Vec<Value>) {
        let mut sql = Sql::empty();
        sql.push_conditions_and(conds);
        let r = sql.render(dialect);
        (r.sql, r.args)
    }

    #[test]
    fn comparison_operators() {
        let (sql, args) = render(
            &[
                eq("a", 1),
                neq("b", 2),
                gt("c", 3),
                gte("d", 4),
                lt("e", 5),
                lte("f", 6),
            ],
            Dialect::MySql,
        );
        assert_eq!(
            sql,
            "`a` = ? AND `b` != ? AND `c` > ? AND `d` >= ? AND `e` < ? AND `f` <= ?"
        );
        assert_eq!(args.len(), 6);
    }

    #[test]
    fn placeholders_match_values() {
        let conds = [
            between("id", 0, 10),
            in_list("age", [1, 2, 3]),
            cond("name = ? OR name = ?", vec!["a".into(), "b".into()]),
            eq("x", 1),
        ];
        let expected: usize = conds.iter().map(Condition::arg_count).sum();
        let (sql, args) = render(&conds, Dialect::Postgres);

        assert_eq!(args.len(), expected);
        assert_eq!(
            sql,
            r#""id" BETWEEN $1 AND $2 AND "age" IN ($3, $4, $5) AND name = $6 OR name = $7 AND "x" = $8"#
        );
    }

    #[test]
    fn expression_columns_pass_through() {
        let (sql, _) = render(&[gt("count(1)", 2)], Dialect::Postgres);
        assert_eq!(sql, "count(1) > $1");
    }

    #[test]
    fn raw_without_args() {
        let (sql, args) = render(&[raw("`deleted` IS NULL")], Dialect::Postgres);
        assert_eq!(sql, "\"deleted\" IS NULL");
        assert!(args.is_empty());
    }

    #[test]
    fn malformed_conditions_are_rejected() {
        let empty: [i64; 0] = [];
        for c in [
            in_list("id", empty),
            raw(""),
            raw("   "),
            eq("", 1),
            cond("a = ? AND b = ?", vec![1.into()]),
            cond("a = 1", vec![1.into()]),
        ] {
            assert!(c.validate().unwrap_err().is_invalid_condition(), "{c:?}");
        }
        assert!(eq("id", 1).validate().is_ok());
        assert!(cond("a = ?", vec![1.into()]).validate().is_ok());
    }

    #[test]
    fn question_marks_in_literals_are_not_placeholders() {
        let literal = raw("name <> 'why?'");
        assert!(literal.validate().is_ok());

        let mixed = cond("name = ? OR name = 'a?'", vec!["x".into()]);
        assert!(mixed.validate().is_ok());

        let (sql, args) = render(&[literal, mixed], Dialect::Postgres);
        assert_eq!(sql, "name <> 'why?' AND name = $1 OR name = 'a?'");
        assert_eq!(args, vec![Value::from("x")]);
    }
}
