//! End-to-end SQL tests: every statement goes through parse, plan, execute

use chrono::NaiveDate;
use mica::{Database, Engine, Error, Value};

fn engine_with(statements: &[&str]) -> Engine {
    let mut engine = Engine::new(Database::new());
    for sql in statements {
        engine
            .execute_sql(sql)
            .unwrap_or_else(|e| panic!("setup `{sql}` failed: {e}"));
    }
    engine
}

#[test]
fn full_sql_workflow_without_a_primary_key() {
    let mut engine = engine_with(&[
        "CREATE TABLE items",
        "ALTER TABLE items ADD COLUMN sku TEXT, price FLOAT, in_stock BOOL",
        "INSERT INTO items (sku, price, in_stock) VALUES ('apple', 0.5, TRUE)",
        "INSERT INTO items (sku, price, in_stock) VALUES ('brick', 2.0, FALSE)",
        "INSERT INTO items (sku, price, in_stock) VALUES ('cedar', 12.75, TRUE)",
    ]);

    let rows = engine
        .execute_sql("SELECT sku FROM items WHERE in_stock = TRUE AND price < 10.0")
        .unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].get("sku"), Some(&Value::Text("apple".to_string())));

    let updated = engine
        .execute_sql("UPDATE items SET price = 1.5 WHERE sku = 'brick'")
        .unwrap();
    assert_eq!(updated.len(), 1);
    assert_eq!(updated[0].get("price"), Some(&Value::Float(1.5)));

    let removed = engine
        .execute_sql("DELETE FROM items WHERE in_stock = FALSE")
        .unwrap();
    assert_eq!(removed.len(), 1);
    assert_eq!(engine.database().get_table("items").unwrap().row_count(), 2);
}

#[test]
fn statements_tolerate_case_whitespace_and_semicolons() {
    let mut engine = engine_with(&[
        "create table t;",
        "alter table t add column a int",
        "insert into t (a) values (1);",
    ]);

    let rows = engine
        .execute_sql("  SeLeCt  *\n  FrOm t\n  WhErE a = 1 ;")
        .unwrap();
    assert_eq!(rows.len(), 1);
}

#[test]
fn date_literals_filter_and_round_trip() {
    let mut engine = engine_with(&[
        "CREATE TABLE events",
        "ALTER TABLE events ADD COLUMN name TEXT, held DATE",
        "INSERT INTO events (name, held) VALUES ('kickoff', DATE '2024-01-15')",
        "INSERT INTO events (name, held) VALUES ('review', DATE '2024-06-30')",
    ]);

    let rows = engine
        .execute_sql("SELECT name FROM events WHERE held = DATE '2024-06-30'")
        .unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].get("name"), Some(&Value::Text("review".to_string())));

    let rows = engine.execute_sql("SELECT held FROM events").unwrap();
    assert_eq!(
        rows[0].get("held"),
        Some(&Value::Date(NaiveDate::from_ymd_opt(2024, 1, 15).unwrap()))
    );
}

#[test]
fn update_without_where_touches_every_row() {
    let mut engine = engine_with(&[
        "CREATE TABLE t",
        "ALTER TABLE t ADD COLUMN a INT, flag BOOL",
        "INSERT INTO t (a, flag) VALUES (1, FALSE)",
        "INSERT INTO t (a, flag) VALUES (2, FALSE)",
        "INSERT INTO t (a, flag) VALUES (3, FALSE)",
    ]);

    let updated = engine.execute_sql("UPDATE t SET flag = TRUE").unwrap();
    assert_eq!(updated.len(), 3);
    let rows = engine
        .execute_sql("SELECT a FROM t WHERE flag = TRUE")
        .unwrap();
    assert_eq!(rows.len(), 3);
}

#[test]
fn describe_reflects_schema_changes() {
    let mut engine = engine_with(&[
        "CREATE TABLE t",
        "ALTER TABLE t ADD COLUMN a INT",
        "ALTER TABLE t ADD COLUMN b",
    ]);

    let rows = engine.execute_sql("DESCRIBE t").unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].get("name"), Some(&Value::Text("a".to_string())));
    assert_eq!(rows[0].get("type"), Some(&Value::Text("INT".to_string())));
    // Omitted type defaults to TEXT
    assert_eq!(rows[1].get("name"), Some(&Value::Text("b".to_string())));
    assert_eq!(rows[1].get("type"), Some(&Value::Text("TEXT".to_string())));
}

#[test]
fn show_tables_lists_names_sorted() {
    let mut engine = engine_with(&["CREATE TABLE zebra", "CREATE TABLE ant"]);
    let rows = engine.execute_sql("SHOW TABLES").unwrap();
    let names: Vec<_> = rows
        .iter()
        .map(|r| r.get("table_name").unwrap().clone())
        .collect();
    assert_eq!(
        names,
        vec![
            Value::Text("ant".to_string()),
            Value::Text("zebra".to_string())
        ]
    );
}

#[test]
fn added_column_leaves_old_rows_without_the_field() {
    let mut engine = engine_with(&[
        "CREATE TABLE t",
        "ALTER TABLE t ADD COLUMN a INT",
        "INSERT INTO t (a) VALUES (1)",
        "ALTER TABLE t ADD COLUMN b INT",
        "INSERT INTO t (a, b) VALUES (2, 20)",
    ]);

    // The old row fails the filter silently rather than erroring
    let rows = engine.execute_sql("SELECT a FROM t WHERE b = 20").unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].get("a"), Some(&Value::Integer(2)));

    // but projecting the missing field out of a matching row is an error
    let err = engine.execute_sql("SELECT b FROM t WHERE a = 1").unwrap_err();
    assert!(matches!(err, Error::ColumnNotFound(_, _)));
}

#[test]
fn errors_surface_as_results_not_panics() {
    let mut engine = engine_with(&["CREATE TABLE t", "ALTER TABLE t ADD COLUMN a INT"]);

    let cases: &[(&str, fn(&Error) -> bool)] = &[
        ("SELECT * FROM missing", |e| {
            matches!(e, Error::TableNotFound(_))
        }),
        ("SELEC * FROM t", |e| matches!(e, Error::ParseError(_))),
        ("INSERT INTO t (a, b) VALUES (1)", |e| {
            matches!(e, Error::PlanError(_))
        }),
        ("ALTER TABLE t ADD COLUMN a INT", |e| {
            matches!(e, Error::DuplicateColumn(_))
        }),
        ("ALTER TABLE t ADD COLUMN b BLOB", |e| {
            matches!(e, Error::PlanError(_))
        }),
        ("INSERT INTO t (a) VALUES ('x'", |e| {
            matches!(e, Error::ParseError(_))
        }),
    ];

    for (sql, check) in cases {
        let err = engine.execute_sql(sql).unwrap_err();
        assert!(check(&err), "{sql}: {err:?}");
    }
}

#[test]
fn parse_errors_name_a_position_or_the_leftover_text() {
    let mut engine = Engine::new(Database::new());

    // A statement that fails outright reports where
    let err = engine.execute_sql("DELETE users").unwrap_err();
    match err {
        Error::ParseError(message) => assert!(message.contains("line 1"), "{message}"),
        other => panic!("expected ParseError, got {other:?}"),
    }

    // A statement followed by junk reports the junk
    let err = engine.execute_sql("SELECT a FROM t extra tokens").unwrap_err();
    match err {
        Error::ParseError(message) => {
            assert!(message.contains("unexpected input after statement"), "{message}")
        }
        other => panic!("expected ParseError, got {other:?}"),
    }
}

#[test]
fn string_escapes_survive_storage_and_filtering() {
    let mut engine = engine_with(&[
        "CREATE TABLE notes",
        "ALTER TABLE notes ADD COLUMN body TEXT",
        "INSERT INTO notes (body) VALUES ('It\\'s here')",
    ]);

    let rows = engine
        .execute_sql("SELECT body FROM notes WHERE body = 'It\\'s here'")
        .unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(
        rows[0].get("body"),
        Some(&Value::Text("It's here".to_string()))
    );
}
