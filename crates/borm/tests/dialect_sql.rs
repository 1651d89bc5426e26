//! Statements as the driver receives them, per dialect.

mod common;

use borm::prelude::*;
use common::Recorder;
use pretty_assertions::assert_eq;

#[derive(Debug, Default, Clone, PartialEq, Entity)]
struct Person {
    #[borm(column = "name")]
    pub x: String,
    #[borm(column = "age")]
    pub y: i64,
    #[borm(column = "ctime", time)]
    pub z1: i64,
    #[borm(last_insert_id = "id")]
    pub id: i64,
}

fn orca() -> Person {
    Person {
        x: "Orca1".into(),
        y: 20,
        z1: 1_551_405_784,
        id: 0,
    }
}

#[test]
fn mysql_is_the_default() {
    let db = Recorder::new(Dialect::MySql);
    let t = Table::new(&db, "test");

    let mut ids: Vec<i64> = Vec::new();
    t.select(
        &mut ids,
        &[
            fields(["id"]),
            force_index("idx_ctime"),
            where_([gte("id", 10), lte("id", 20)]),
            order_by(["id"]),
            offset_limit(0, 100),
        ],
    )
    .unwrap();

    let call = db.last();
    assert_eq!(
        call.sql,
        "SELECT `id` FROM `test` FORCE INDEX (`idx_ctime`) WHERE `id` >= ? AND `id` <= ? ORDER BY `id` LIMIT 100 OFFSET 0"
    );
    assert_eq!(call.args, vec![Value::Int(10), Value::Int(20)]);
    assert!(!call.prepared);
}

#[test]
fn mysql_insert_uses_the_driver_id() {
    let db = Recorder::new(Dialect::MySql);
    let t = Table::new(&db, "test");

    let mut p = orca();
    assert_eq!(t.insert(&mut p, &[]).unwrap(), 1);
    assert_eq!(p.id, 7);

    let call = db.last();
    assert_eq!(
        call.sql,
        "INSERT INTO `test` (`name`, `age`, `ctime`) VALUES (?, ?, ?)"
    );
    assert_eq!(call.args[0], Value::from("Orca1"));
    assert!(matches!(call.args[2], Value::Time(t) if t.timestamp() == 1_551_405_784));
}

#[test]
fn mysql_update_and_delete_take_order_and_limit() {
    let db = Recorder::new(Dialect::MySql);
    let t = Table::new(&db, "test");

    t.update(
        &UpdateMap::new().set_expr("age", "age+1"),
        &[where_([eq("name", "Orca1")]), order_by(["id"]), limit(1)],
    )
    .unwrap();
    assert_eq!(
        db.last().sql,
        "UPDATE `test` SET `age` = age+1 WHERE `name` = ? ORDER BY `id` LIMIT 1"
    );

    t.delete(&[where_([lt("age", 3)]), limit(5)]).unwrap();
    assert_eq!(db.last().sql, "DELETE FROM `test` WHERE `age` < ? LIMIT 5");

    let err = t.delete(&[offset_limit(2, 5)]).unwrap_err();
    assert!(err.is_unsupported_feature());
}

#[test]
fn postgres_numbers_placeholders_in_statement_order() {
    let db = Recorder::new(Dialect::MySql);
    let t = Table::new(&db, "test").use_pg();

    let mut people: Vec<Person> = Vec::new();
    t.select(
        &mut people,
        &[
            where_([
                cond("name = ? AND age > ?", vec!["x".into(), 3.into()]),
                between("ctime", 1, 2),
            ]),
            having([gt("count(1)", 1)]),
            group_by(["age"]),
        ],
    )
    .unwrap();

    let call = db.last();
    assert_eq!(
        call.sql,
        r#"SELECT "name", "age", "ctime" FROM "test" WHERE name = $1 AND age > $2 AND "ctime" BETWEEN $3 AND $4 GROUP BY "age" HAVING count(1) > $5"#
    );
    assert_eq!(call.args.len(), 5);
}

#[test]
fn postgres_single_insert_returns_the_id() {
    let db = Recorder::new(Dialect::Postgres);
    db.answer(&["id"], vec![vec![Value::Int(41)]]);
    let t = Table::new(&db, "test");

    let mut p = orca();
    assert_eq!(t.insert(&mut p, &[]).unwrap(), 1);
    assert_eq!(p.id, 41);
    assert_eq!(
        db.last().sql,
        r#"INSERT INTO "test" ("name", "age", "ctime") VALUES ($1, $2, $3) RETURNING "id""#
    );

    let mut many = vec![orca(), orca()];
    assert_eq!(t.insert(&mut many, &[]).unwrap(), 1);
    assert_eq!(
        db.last().sql,
        r#"INSERT INTO "test" ("name", "age", "ctime") VALUES ($1, $2, $3), ($4, $5, $6)"#
    );
    assert!(many.iter().all(|p| p.id == 0));
}

#[test]
fn postgres_rejects_index_hints_and_mutation_limits() {
    let db = Recorder::new(Dialect::Postgres);
    let t = Table::new(&db, "test");

    let mut people: Vec<Person> = Vec::new();
    let err = t.select(&mut people, &[force_index("idx_ctime")]).unwrap_err();
    assert!(err.is_unsupported_feature());

    let err = t
        .update(&UpdateMap::new().set("age", 1), &[order_by(["id"])])
        .unwrap_err();
    assert!(err.is_unsupported_feature());

    assert!(db.calls().is_empty());
}

#[test]
fn sparse_update_binds_converted_values() {
    let db = Recorder::new(Dialect::Postgres);
    let t = Table::new(&db, "test");

    let patch = Person {
        z1: 1_551_405_784,
        ..Default::default()
    };
    t.update(&patch, &[where_([eq("name", "Orca1")])]).unwrap();

    let call = db.last();
    assert_eq!(call.sql, r#"UPDATE "test" SET "ctime" = $1 WHERE "name" = $2"#);
    assert!(matches!(call.args[0], Value::Time(_)));
    assert_eq!(call.args[1], Value::from("Orca1"));
}

#[test]
fn reuse_runs_prepared_statements() {
    let db = Recorder::new(Dialect::MySql);
    let t = Table::new(&db, "test").reuse();

    db.answer(&["count(1)"], vec![vec![Value::Int(3)]]);
    db.answer(&["count(1)"], vec![vec![Value::Int(4)]]);
    let mut count = 0i64;
    t.select(&mut count, &[fields(["count(1)"])]).unwrap();
    assert_eq!(count, 3);
    t.select(&mut count, &[fields(["count(1)"])]).unwrap();
    assert_eq!(count, 4);

    let calls = db.calls();
    assert_eq!(calls.len(), 2);
    assert!(calls.iter().all(|c| c.prepared));
    assert_eq!(db.statement_cache().len(), 1);
}

#[test]
fn backticks_in_raw_fragments_follow_the_dialect() {
    let db = Recorder::new(Dialect::Postgres);
    let t = Table::new(&db, "test");

    let rendered = t
        .render_delete(&[where_([cond("`name` = ?", vec!["x".into()])])])
        .unwrap();
    assert_eq!(rendered.sql, r#"DELETE FROM "test" WHERE "name" = $1"#);
    assert!(db.calls().is_empty());
}

#[test]
fn empty_insert_renders_and_sends_nothing() {
    let db = Recorder::new(Dialect::MySql);
    let t = Table::new(&db, "test");

    let mut none: Vec<Person> = Vec::new();
    assert!(t.render_insert(&none, &[]).unwrap().is_none());
    assert_eq!(t.insert(&mut none, &[]).unwrap(), 0);
    assert!(db.calls().is_empty());

    let one = t.render_insert(&orca(), &[]).unwrap().unwrap();
    assert_eq!(
        one.sql,
        "INSERT INTO `test` (`name`, `age`, `ctime`) VALUES (?, ?, ?)"
    );
    assert_eq!(one.args.len(), 3);
}
