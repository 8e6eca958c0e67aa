//! UPDATE and DELETE statements.

mod common;

use common::{column, exec, ints, rows, setup};
use vellum::{Output, Params, Value};

#[test]
fn update_assigns_expressions() {
    let db = setup();
    let mut tx = db.begin(true).unwrap();

    exec(&mut tx, "CREATE TABLE t");
    exec(&mut tx, "INSERT INTO t VALUES {n: 1, s: 'a'}, {n: 2, s: 'b'}");

    assert_eq!(
        exec(&mut tx, "UPDATE t SET n = n * 10, flag = true WHERE s = 'b'"),
        Output::Count(1)
    );

    let updated = rows(&mut tx, "SELECT * FROM t WHERE s = 'b'");
    assert_eq!(updated[0].get("n"), Some(&Value::Int64(20)));
    assert_eq!(updated[0].get("flag"), Some(&Value::Bool(true)));

    let untouched = rows(&mut tx, "SELECT * FROM t WHERE s = 'a'");
    assert_eq!(untouched[0].get("n"), Some(&Value::Int64(1)));
    assert_eq!(untouched[0].get("flag"), None);

    tx.commit().unwrap();
}

#[test]
fn update_without_filter_touches_everything() {
    let db = setup();
    let mut tx = db.begin(true).unwrap();

    exec(&mut tx, "CREATE TABLE t");
    exec(&mut tx, "INSERT INTO t (n) VALUES (1), (2), (3)");
    assert_eq!(exec(&mut tx, "UPDATE t SET n = 0"), Output::Count(3));
    assert_eq!(column(&mut tx, "SELECT n FROM t", "n"), ints(&[0, 0, 0]));

    tx.commit().unwrap();
}

#[test]
fn update_sets_nested_paths() {
    let db = setup();
    let mut tx = db.begin(true).unwrap();

    exec(&mut tx, "CREATE TABLE t");
    exec(&mut tx, "INSERT INTO t VALUES {profile: {name: 'ada'}}");
    exec(&mut tx, "UPDATE t SET profile.name = 'grace'");

    let result = rows(&mut tx, "SELECT profile.name AS name FROM t");
    assert_eq!(result[0].get("name"), Some(&Value::Text("grace".into())));

    tx.commit().unwrap();
}

#[test]
fn delete_with_filter() {
    let db = setup();
    let mut tx = db.begin(true).unwrap();

    exec(&mut tx, "CREATE TABLE t");
    exec(&mut tx, "INSERT INTO t (n) VALUES (1), (2), (3), (4)");
    assert_eq!(
        exec(&mut tx, "DELETE FROM t WHERE n % 2 = 0"),
        Output::Count(2)
    );
    assert_eq!(column(&mut tx, "SELECT n FROM t", "n"), ints(&[1, 3]));

    assert_eq!(exec(&mut tx, "DELETE FROM t"), Output::Count(2));
    assert_eq!(rows(&mut tx, "SELECT * FROM t").len(), 0);

    tx.commit().unwrap();
}

#[test]
fn key_function_addresses_records() {
    let db = setup();
    let mut tx = db.begin(true).unwrap();

    exec(&mut tx, "CREATE TABLE t (id INTEGER PRIMARY KEY)");
    exec(&mut tx, "INSERT INTO t VALUES {id: 1, s: 'a'}, {id: 2, s: 'b'}");

    assert_eq!(
        exec(&mut tx, "UPDATE t SET s = 'changed' WHERE key() = 2"),
        Output::Count(1)
    );
    assert_eq!(
        column(&mut tx, "SELECT s FROM t WHERE pk() = 2", "s"),
        vec![Value::Text("changed".into())]
    );
    assert_eq!(
        exec(&mut tx, "DELETE FROM t WHERE key() = 1"),
        Output::Count(1)
    );
    assert_eq!(rows(&mut tx, "SELECT * FROM t").len(), 1);

    tx.commit().unwrap();
}

#[test]
fn update_preserving_primary_key_identity() {
    let db = setup();
    let mut tx = db.begin(true).unwrap();

    exec(&mut tx, "CREATE TABLE t (id INTEGER PRIMARY KEY)");
    exec(&mut tx, "INSERT INTO t VALUES {id: 1, n: 0}");

    // Replacing under the same record id, even repeatedly, keeps exactly
    // one record.
    for _ in 0..3 {
        exec(&mut tx, "UPDATE t SET n = n + 1 WHERE id = 1");
    }
    let result = rows(&mut tx, "SELECT * FROM t");
    assert_eq!(result.len(), 1);
    assert_eq!(result[0].get("n"), Some(&Value::Int64(3)));

    tx.commit().unwrap();
}

#[test]
fn failed_update_surfaces_error() {
    let db = setup();
    let mut tx = db.begin(true).unwrap();

    exec(&mut tx, "CREATE TABLE t (n INTEGER NOT NULL)");
    exec(&mut tx, "INSERT INTO t VALUES {n: 1}");

    assert!(tx
        .exec("UPDATE t SET n = NULL", &Params::new())
        .is_err());

    tx.commit().unwrap();
}
