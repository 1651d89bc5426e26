//! Statement composition.
//!
//! Turns a table reference, a resolved [`Shape`] and a [`ClauseSet`] into a [`Sql`]
//! builder. Clauses are always emitted in one canonical order:
//!
//! ```text
//! SELECT fields FROM table [hint] [WHERE ..] [GROUP BY ..] [HAVING ..] [ORDER BY ..] [LIMIT n [OFFSET m]]
//! INSERT INTO table (cols) VALUES (..), (..) [RETURNING id]
//! UPDATE table SET .. [WHERE ..] [ORDER BY ..] [LIMIT n]
//! DELETE FROM table [WHERE ..] [LIMIT n]
//! ```
//!
//! Every check happens here, before a statement reaches the database.

use crate::clause::{Assign, ClauseSet, UpdateMap};
use crate::dialect::{Dialect, InsertId};
use crate::error::{OrmError, OrmResult};
use crate::record::FieldSource;
use crate::schema::{Column, Schema, Shape};
use crate::sql::Sql;
use std::sync::Arc;

/// How the columns of a SELECT result map back onto the destination.
#[derive(Debug, Clone)]
pub(crate) enum Plan {
    /// Column 0 of each row is the value.
    Scalar,
    /// `columns[i]` is the schema column receiving result column `i`.
    Struct {
        schema: Arc<Schema>,
        columns: Vec<usize>,
    },
}

/// A composed INSERT.
pub(crate) struct InsertStatement {
    pub sql: Sql,
    /// The generated id comes back as a row (`RETURNING`) instead of from the driver.
    pub returning: bool,
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct Composer<'a> {
    pub table: &'a str,
    pub dialect: Dialect,
}

impl<'a> Composer<'a> {
    pub fn new(table: &'a str, dialect: Dialect) -> Self {
        Self { table, dialect }
    }

    /// The type's own table name wins over the handle's.
    fn table_for(&self, schema: Option<&Schema>) -> &'a str {
        schema.and_then(|s| s.table).unwrap_or(self.table)
    }

    pub fn select(&self, shape: &Shape, set: &ClauseSet) -> OrmResult<(Sql, Plan)> {
        set.validate()?;

        let mut sql = Sql::new("SELECT ");
        let plan = match shape {
            Shape::Scalar => {
                if set.fields.is_empty() {
                    sql.push("*");
                } else {
                    sql.push_ident_list(&set.fields);
                }
                Plan::Scalar
            }
            Shape::Struct(schema) => {
                let columns = if set.fields.is_empty() {
                    let columns: Vec<usize> = schema
                        .columns
                        .iter()
                        .enumerate()
                        .filter(|(_, c)| c.writable)
                        .map(|(i, _)| i)
                        .collect();
                    let names: Vec<&str> =
                        columns.iter().map(|&i| schema.columns[i].name.as_str()).collect();
                    sql.push_ident_list(&names);
                    columns
                } else {
                    let columns = set
                        .fields
                        .iter()
                        .map(|f| schema.find(f, |c| c.writable))
                        .collect::<OrmResult<Vec<_>>>()?;
                    sql.push_ident_list(&set.fields);
                    columns
                };
                if columns.is_empty() {
                    return Err(OrmError::unsupported_type(format!(
                        "{} has no column that can be selected into",
                        schema.type_name
                    )));
                }
                Plan::Struct {
                    schema: schema.clone(),
                    columns,
                }
            }
        };

        sql.push(" FROM ");
        sql.push_ident(self.table_for(shape.schema().map(|s| &**s)));
        if let Some(index) = &set.force_index {
            sql.push(" ");
            sql.push(&self.dialect.index_hint(index)?);
        }
        push_where(&mut sql, set);
        if !set.group_by.is_empty() {
            sql.push(" GROUP BY ");
            sql.push_ident_list(&set.group_by);
        }
        if !set.having.is_empty() {
            sql.push(" HAVING ");
            sql.push_conditions_and(&set.having);
        }
        push_order_by(&mut sql, set);
        if let Some((offset, count)) = set.limit {
            sql.push(&format!(" LIMIT {count}"));
            if let Some(offset) = offset {
                sql.push(&format!(" OFFSET {offset}"));
            }
        }

        Ok((sql, plan))
    }

    pub fn insert(
        &self,
        schema: &Schema,
        records: &[&dyn FieldSource],
        set: &ClauseSet,
    ) -> OrmResult<InsertStatement> {
        if records.is_empty() {
            return Err(OrmError::invalid_condition("no records to insert"));
        }

        let columns: Vec<&Column> = if set.fields.is_empty() {
            schema.readable().collect()
        } else {
            set.fields
                .iter()
                .map(|f| {
                    schema.find(f, |c| c.readable).map(|i| &schema.columns[i])
                })
                .collect::<OrmResult<_>>()?
        };
        if columns.is_empty() {
            return Err(OrmError::unsupported_type(format!(
                "{} has no column to insert",
                schema.type_name
            )));
        }

        let mut sql = Sql::new("INSERT INTO ");
        sql.push_ident(self.table_for(Some(schema)));
        sql.push(" (");
        let names: Vec<&str> = columns.iter().map(|c| c.name.as_str()).collect();
        sql.push_ident_list(&names);
        sql.push(") VALUES ");

        for (i, record) in records.iter().enumerate() {
            if i > 0 {
                sql.push(", ");
            }
            sql.push("(");
            sql.push_bind_list(columns.iter().map(|c| schema.read(*record, c)));
            sql.push(")");
        }

        let returning = match &schema.last_insert_id {
            Some(slot) if records.len() == 1 && self.dialect.insert_id() == InsertId::Returning => {
                sql.push(" RETURNING ");
                sql.push_ident(&slot.column);
                true
            }
            _ => false,
        };

        Ok(InsertStatement { sql, returning })
    }

    /// Sparse update from a struct: zero-valued fields are skipped unless explicit
    /// fields are given, in which case exactly those are written.
    pub fn update_struct(
        &self,
        schema: &Schema,
        record: &dyn FieldSource,
        set: &ClauseSet,
    ) -> OrmResult<Sql> {
        let mut sql = Sql::new("UPDATE ");
        sql.push_ident(self.table_for(Some(schema)));
        sql.push(" SET ");

        let mut assigned = 0;
        let mut assign = |sql: &mut Sql, column: &Column| {
            if assigned > 0 {
                sql.push(", ");
            }
            assigned += 1;
            sql.push_ident(&column.name);
            sql.push(" = ");
            sql.push_bind(schema.read(record, column));
        };

        if set.fields.is_empty() {
            for column in schema.readable() {
                if record.field(column.field).is_zero() {
                    continue;
                }
                assign(&mut sql, column);
            }
        } else {
            for f in &set.fields {
                let i = schema.find(f, |c| c.readable)?;
                assign(&mut sql, &schema.columns[i]);
            }
        }

        if assigned == 0 {
            return Err(OrmError::invalid_condition(format!(
                "nothing to update: every field of {} is zero",
                schema.type_name
            )));
        }
        self.finish_update(sql, set)
    }

    /// Update from a map: every entry is written, expressions verbatim.
    pub fn update_map(&self, map: &UpdateMap, set: &ClauseSet) -> OrmResult<Sql> {
        if map.is_empty() {
            return Err(OrmError::invalid_condition("nothing to update: empty update map"));
        }

        let mut sql = Sql::new("UPDATE ");
        sql.push_ident(self.table);
        sql.push(" SET ");
        for (i, (column, value)) in map.iter().enumerate() {
            if column.trim().is_empty() {
                return Err(OrmError::invalid_condition("empty column in update map"));
            }
            if i > 0 {
                sql.push(", ");
            }
            sql.push_ident(column);
            sql.push(" = ");
            match value {
                Assign::Value(v) => {
                    sql.push_bind(v.clone());
                }
                Assign::Expr(e) => {
                    sql.push(e);
                }
            }
        }
        self.finish_update(sql, set)
    }

    fn finish_update(&self, mut sql: Sql, set: &ClauseSet) -> OrmResult<Sql> {
        set.validate()?;
        if !self.dialect.supports_mutation_limit()
            && (set.limit.is_some() || !set.order_by.is_empty())
        {
            return Err(OrmError::unsupported_feature(format!(
                "{} does not support ORDER BY or LIMIT in UPDATE",
                self.dialect
            )));
        }
        push_where(&mut sql, set);
        push_order_by(&mut sql, set);
        push_mutation_limit(&mut sql, set)?;
        Ok(sql)
    }

    /// Fields, ORDER BY, GROUP BY and HAVING are ignored.
    pub fn delete(&self, set: &ClauseSet) -> OrmResult<Sql> {
        set.wheres.iter().try_for_each(|c| c.validate())?;
        if set.limit.is_some() && !self.dialect.supports_mutation_limit() {
            return Err(OrmError::unsupported_feature(format!(
                "{} does not support LIMIT in DELETE",
                self.dialect
            )));
        }

        let mut sql = Sql::new("DELETE FROM ");
        sql.push_ident(self.table);
        push_where(&mut sql, set);
        push_mutation_limit(&mut sql, set)?;
        Ok(sql)
    }
}

fn push_where(sql: &mut Sql, set: &ClauseSet) {
    if !set.wheres.is_empty() {
        sql.push(" WHERE ");
        sql.push_conditions_and(&set.wheres);
    }
}

fn push_order_by(sql: &mut Sql, set: &ClauseSet) {
    if !set.order_by.is_empty() {
        sql.push(" ORDER BY ");
        sql.push_ident_list(&set.order_by);
    }
}

fn push_mutation_limit(sql: &mut Sql, set: &ClauseSet) -> OrmResult<()> {
    match set.limit {
        None => Ok(()),
        Some((Some(offset), _)) if offset > 0 => Err(OrmError::unsupported_feature(
            "OFFSET is not allowed in UPDATE or DELETE",
        )),
        Some((_, count)) => {
            sql.push(&format!(" LIMIT {count}"));
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clause::{
        Clause, fields, force_index, group_by, having, limit, offset_limit, order_by, where_,
    };
    use crate::condition::{between, eq, gt, gte, in_list, lte, raw};
    use crate::record::{FieldDecl, Record, StructDecl};
    use crate::schema::SchemaCache;
    use crate::value::{FromValue, Value};
    use pretty_assertions::assert_eq;

    #[derive(Default)]
    struct Person {
        name: String,
        age: i64,
        ctime: i64,
        id: i64,
    }

    impl Record for Person {
        fn describe() -> Option<StructDecl> {
            Some(StructDecl {
                type_name: "Person",
                table: None,
                fields: vec![
                    FieldDecl::new("name"),
                    FieldDecl::new("age"),
                    FieldDecl::new("ctime").time(),
                    FieldDecl::new("id").last_insert_id(None),
                ],
            })
        }

        fn blank() -> Self {
            Self::default()
        }

        fn get(&self, field: usize) -> Value {
            match field {
                0 => self.name.clone().into(),
                1 => self.age.into(),
                2 => self.ctime.into(),
                3 => self.id.into(),
                _ => Value::Null,
            }
        }

        fn set(&mut self, field: usize, value: Value) -> Result<(), String> {
            match field {
                0 => self.name = FromValue::from_value(value)?,
                1 => self.age = FromValue::from_value(value)?,
                2 => self.ctime = FromValue::from_value(value)?,
                3 => self.id = FromValue::from_value(value)?,
                _ => {}
            }
            Ok(())
        }
    }

    fn person_shape() -> Shape {
        SchemaCache::new().resolve::<Person>().unwrap()
    }

    fn select(dialect: Dialect, shape: &Shape, clauses: &[Clause]) -> OrmResult<(String, Vec<Value>)> {
        let (sql, _) = Composer::new("test", dialect).select(shape, &ClauseSet::collect(clauses))?;
        let r = sql.render(dialect);
        Ok((r.sql, r.args))
    }

    #[test]
    fn select_uses_schema_columns() {
        let (sql, args) = select(
            Dialect::MySql,
            &person_shape(),
            &[where_([eq("name", "Orca1")])],
        )
        .unwrap();
        assert_eq!(
            sql,
            "SELECT `name`, `age`, `ctime` FROM `test` WHERE `name` = ?"
        );
        assert_eq!(args, vec![Value::from("Orca1")]);
    }

    #[test]
    fn select_renders_canonical_order_whatever_the_call_order() {
        let (sql, args) = select(
            Dialect::Postgres,
            &Shape::Scalar,
            &[
                offset_limit(0, 100),
                order_by(["id"]),
                having([gt("count(1)", 1)]),
                where_([gte("id", 0), lte("id", 1000)]),
                group_by(["age"]),
                fields(["id"]),
            ],
        )
        .unwrap();
        assert_eq!(
            sql,
            r#"SELECT "id" FROM "test" WHERE "id" >= $1 AND "id" <= $2 GROUP BY "age" HAVING count(1) > $3 ORDER BY "id" LIMIT 100 OFFSET 0"#
        );
        assert_eq!(args, vec![Value::Int(0), Value::Int(1000), Value::Int(1)]);
    }

    #[test]
    fn numbered_placeholders_increase_left_to_right() {
        let (sql, args) = select(
            Dialect::Postgres,
            &Shape::Scalar,
            &[
                having([gt("count(1)", 0)]),
                where_([in_list("age", [1, 2]), between("ctime", 5, 6)]),
                where_([raw("1 = 1"), eq("name", "x")]),
            ],
        )
        .unwrap();

        let numbers: Vec<usize> = sql
            .split('$')
            .skip(1)
            .map(|s| {
                s.chars()
                    .take_while(char::is_ascii_digit)
                    .collect::<String>()
                    .parse()
                    .unwrap()
            })
            .collect();
        assert_eq!(numbers, (1..=args.len()).collect::<Vec<_>>());
        assert_eq!(args.len(), 6);
    }

    #[test]
    fn scalar_without_fields_selects_star() {
        let (sql, _) = select(Dialect::Sqlite, &Shape::Scalar, &[limit(1)]).unwrap();
        assert_eq!(sql, r#"SELECT * FROM "test" LIMIT 1"#);
    }

    #[test]
    fn index_hints_follow_the_dialect() {
        let clauses = [force_index("idx_ctime"), limit(1)];
        assert_eq!(
            select(Dialect::MySql, &person_shape(), &clauses).unwrap().0,
            "SELECT `name`, `age`, `ctime` FROM `test` FORCE INDEX (`idx_ctime`) LIMIT 1"
        );
        assert_eq!(
            select(Dialect::Sqlite, &person_shape(), &clauses).unwrap().0,
            r#"SELECT "name", "age", "ctime" FROM "test" INDEXED BY "idx_ctime" LIMIT 1"#
        );
        assert!(
            select(Dialect::Postgres, &person_shape(), &clauses)
                .unwrap_err()
                .is_unsupported_feature()
        );
    }

    #[test]
    fn explicit_fields_must_map_to_struct_columns() {
        let err = select(Dialect::MySql, &person_shape(), &[fields(["name", "nope"])]).unwrap_err();
        assert!(matches!(err, OrmError::Mapping { ref column, .. } if column == "nope"));

        let (_, plan) = Composer::new("test", Dialect::MySql)
            .select(
                &person_shape(),
                &ClauseSet::collect(&[fields(["ctime", "`name`"])]),
            )
            .unwrap();
        let Plan::Struct { columns, .. } = plan else {
            panic!("expected a struct plan");
        };
        assert_eq!(columns, vec![2, 0]);
    }

    #[test]
    fn join_expressions_pass_through() {
        let (sql, _) = Composer::new("test inner join test2 on test.id = test2.id", Dialect::MySql)
            .select(
                &Shape::Scalar,
                &ClauseSet::collect(&[fields(["test.name"]), where_([eq("test2.age", 3)])]),
            )
            .unwrap();
        assert_eq!(
            sql.to_sql(Dialect::MySql),
            "SELECT `test`.`name` FROM test inner join test2 on test.id = test2.id WHERE `test2`.`age` = ?"
        );
    }

    #[test]
    fn invalid_conditions_fail_before_rendering() {
        let empty: Vec<i64> = vec![];
        let err = select(Dialect::MySql, &Shape::Scalar, &[where_([in_list("id", empty)])]);
        assert!(err.unwrap_err().is_invalid_condition());
    }

    #[test]
    fn insert_converts_unix_time_and_groups_tuples() {
        let shape = person_shape();
        let schema = shape.schema().unwrap();
        let a = Person {
            name: "Orca1".into(),
            age: 20,
            ctime: 1_551_405_784,
            id: 0,
        };
        let b = Person {
            name: "Orca2".into(),
            ..Default::default()
        };
        let stmt = Composer::new("test", Dialect::MySql)
            .insert(schema, &[&a, &b], &ClauseSet::default())
            .unwrap();
        assert!(!stmt.returning);
        let r = stmt.sql.render(Dialect::MySql);
        assert_eq!(
            r.sql,
            "INSERT INTO `test` (`name`, `age`, `ctime`) VALUES (?, ?, ?), (?, ?, ?)"
        );
        assert_eq!(r.args.len(), 6);
        assert!(matches!(r.args[2], Value::Time(t) if t.timestamp() == 1_551_405_784));
    }

    #[test]
    fn postgres_single_insert_returns_id() {
        let shape = person_shape();
        let schema = shape.schema().unwrap();
        let a = Person::default();
        let stmt = Composer::new("test", Dialect::Postgres)
            .insert(schema, &[&a], &ClauseSet::collect(&[fields(["name", "age"])]))
            .unwrap();
        assert!(stmt.returning);
        assert_eq!(
            stmt.sql.to_sql(Dialect::Postgres),
            r#"INSERT INTO "test" ("name", "age") VALUES ($1, $2) RETURNING "id""#
        );

        let stmt = Composer::new("test", Dialect::Postgres)
            .insert(schema, &[&a, &a], &ClauseSet::default())
            .unwrap();
        assert!(!stmt.returning);
    }

    #[test]
    fn sparse_update_skips_zero_fields() {
        let shape = person_shape();
        let schema = shape.schema().unwrap();
        let p = Person {
            age: 21,
            ..Default::default()
        };
        let composer = Composer::new("test", Dialect::MySql);

        let sql = composer
            .update_struct(schema, &p, &ClauseSet::collect(&[where_([eq("name", "Orca1")])]))
            .unwrap();
        let r = sql.render(Dialect::MySql);
        assert_eq!(r.sql, "UPDATE `test` SET `age` = ? WHERE `name` = ?");
        assert_eq!(r.args, vec![Value::Int(21), Value::from("Orca1")]);

        let sql = composer
            .update_struct(schema, &p, &ClauseSet::collect(&[fields(["name", "age"])]))
            .unwrap();
        let r = sql.render(Dialect::MySql);
        assert_eq!(r.sql, "UPDATE `test` SET `name` = ?, `age` = ?");
        assert_eq!(r.args, vec![Value::from(""), Value::Int(21)]);

        let err = composer
            .update_struct(schema, &Person::default(), &ClauseSet::default())
            .unwrap_err();
        assert!(err.is_invalid_condition());
    }

    #[test]
    fn map_update_emits_expressions_verbatim() {
        let map = UpdateMap::new().set("name", "Orca2").set_expr("age", "age+1");
        let sql = Composer::new("test", Dialect::Postgres)
            .update_map(&map, &ClauseSet::collect(&[where_([eq("name", "Orca1")])]))
            .unwrap();
        let r = sql.render(Dialect::Postgres);
        assert_eq!(
            r.sql,
            r#"UPDATE "test" SET "age" = age+1, "name" = $1 WHERE "name" = $2"#
        );
        assert_eq!(r.args, vec![Value::from("Orca2"), Value::from("Orca1")]);
    }

    #[test]
    fn mutation_limits_are_mysql_only() {
        let map = UpdateMap::new().set("age", 1);
        let set = ClauseSet::collect(&[order_by(["id"]), limit(10)]);

        let sql = Composer::new("test", Dialect::MySql).update_map(&map, &set).unwrap();
        assert_eq!(
            sql.to_sql(Dialect::MySql),
            "UPDATE `test` SET `age` = ? ORDER BY `id` LIMIT 10"
        );
        assert!(
            Composer::new("test", Dialect::Sqlite)
                .update_map(&map, &set)
                .unwrap_err()
                .is_unsupported_feature()
        );
        assert!(
            Composer::new("test", Dialect::Postgres)
                .delete(&set)
                .unwrap_err()
                .is_unsupported_feature()
        );
    }

    #[test]
    fn delete_ignores_select_only_clauses() {
        let set = ClauseSet::collect(&[
            fields(["name"]),
            order_by(["id"]),
            group_by(["age"]),
            having([raw("")]),
            where_([eq("name", "Orca1")]),
        ]);
        let sql = Composer::new("test", Dialect::Postgres).delete(&set).unwrap();
        assert_eq!(
            sql.to_sql(Dialect::Postgres),
            r#"DELETE FROM "test" WHERE "name" = $1"#
        );
    }
}
