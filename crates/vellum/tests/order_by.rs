//! ORDER BY over unindexed paths (materialized sort).

mod common;

use common::{column, exec, ints, setup, texts};
use vellum::Value;

#[test]
fn order_by_descending() {
    let db = setup();
    let mut tx = db.begin(true).unwrap();

    exec(&mut tx, "CREATE TABLE t");
    exec(&mut tx, "INSERT INTO t VALUES {k: 'b'}, {k: 'a'}, {k: 'c'}");

    assert_eq!(
        column(&mut tx, "SELECT * FROM t ORDER BY k DESC", "k"),
        texts(&["c", "b", "a"])
    );
    assert_eq!(
        column(&mut tx, "SELECT * FROM t ORDER BY k", "k"),
        texts(&["a", "b", "c"])
    );

    tx.commit().unwrap();
}

#[test]
fn missing_sort_fields_come_first() {
    let db = setup();
    let mut tx = db.begin(true).unwrap();

    exec(&mut tx, "CREATE TABLE t");
    exec(&mut tx, "INSERT INTO t VALUES {n: 2}, {other: true}, {n: 1}");

    assert_eq!(
        column(&mut tx, "SELECT * FROM t ORDER BY n", "n"),
        vec![Value::Null, Value::Int64(1), Value::Int64(2)]
    );

    tx.commit().unwrap();
}

#[test]
fn sort_is_stable_for_equal_keys() {
    let db = setup();
    let mut tx = db.begin(true).unwrap();

    exec(&mut tx, "CREATE TABLE t (id INTEGER PRIMARY KEY)");
    exec(
        &mut tx,
        "INSERT INTO t VALUES {id: 1, g: 1}, {id: 2, g: 1}, {id: 3, g: 0}",
    );

    // Equal keys keep record-id order, ascending and descending alike.
    assert_eq!(
        column(&mut tx, "SELECT * FROM t ORDER BY g", "id"),
        ints(&[3, 1, 2])
    );
    assert_eq!(
        column(&mut tx, "SELECT * FROM t ORDER BY g DESC", "id"),
        ints(&[1, 2, 3])
    );

    tx.commit().unwrap();
}

#[test]
fn mixed_numeric_sort_compares_by_magnitude() {
    let db = setup();
    let mut tx = db.begin(true).unwrap();

    exec(&mut tx, "CREATE TABLE t");
    exec(&mut tx, "INSERT INTO t VALUES {n: 2}, {n: 1.5}, {n: 1}");

    assert_eq!(
        column(&mut tx, "SELECT * FROM t ORDER BY n", "n"),
        vec![Value::Int64(1), Value::Float64(1.5), Value::Int64(2)]
    );

    tx.commit().unwrap();
}
