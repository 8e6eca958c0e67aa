//! Secondary indexes end to end: uniqueness, range scans, maintenance.

mod common;

use common::{column, exec, ints, rows, setup};
use vellum::{Error, Params};

#[test]
fn unique_index_collision() {
    let db = setup();
    let mut tx = db.begin(true).unwrap();

    exec(&mut tx, "CREATE TABLE t");
    exec(&mut tx, "CREATE UNIQUE INDEX ix ON t (a)");
    exec(&mut tx, "INSERT INTO t VALUES {a: 1}");

    assert!(matches!(
        tx.exec("INSERT INTO t VALUES {a: 1}", &Params::new()),
        Err(Error::Duplicate(_))
    ));

    // The failed insert left nothing behind.
    assert_eq!(rows(&mut tx, "SELECT * FROM t").len(), 1);

    tx.commit().unwrap();
}

#[test]
fn range_scan_via_index() {
    let db = setup();
    let mut tx = db.begin(true).unwrap();

    exec(&mut tx, "CREATE TABLE t");
    // Insert out of order so that only an index scan yields ascending a.
    exec(&mut tx, "INSERT INTO t (a) VALUES (5), (3), (1), (4), (2)");
    exec(&mut tx, "CREATE INDEX ix ON t (a)");

    assert_eq!(
        column(&mut tx, "SELECT a FROM t WHERE a >= 3", "a"),
        ints(&[3, 4, 5])
    );
    assert_eq!(
        column(&mut tx, "SELECT a FROM t WHERE a > 3", "a"),
        ints(&[4, 5])
    );
    assert_eq!(
        column(&mut tx, "SELECT a FROM t WHERE a = 3", "a"),
        ints(&[3])
    );

    tx.commit().unwrap();
}

#[test]
fn residual_predicates_still_filter() {
    let db = setup();
    let mut tx = db.begin(true).unwrap();

    exec(&mut tx, "CREATE TABLE t");
    exec(&mut tx, "CREATE INDEX ix ON t (a)");
    exec(
        &mut tx,
        "INSERT INTO t VALUES {a: 1, b: 1}, {a: 2, b: 0}, {a: 3, b: 1}",
    );

    assert_eq!(
        column(&mut tx, "SELECT a FROM t WHERE a >= 1 AND b = 1", "a"),
        ints(&[1, 3])
    );

    tx.commit().unwrap();
}

#[test]
fn index_stays_consistent_through_updates_and_deletes() {
    let db = setup();
    let mut tx = db.begin(true).unwrap();

    exec(&mut tx, "CREATE TABLE t");
    exec(&mut tx, "CREATE INDEX ix ON t (a)");
    exec(&mut tx, "INSERT INTO t (a) VALUES (1), (2), (3), (4)");
    exec(&mut tx, "UPDATE t SET a = a + 10 WHERE a = 2");
    exec(&mut tx, "DELETE FROM t WHERE a = 3");

    // Scans through the index must see exactly the surviving values.
    assert_eq!(
        column(&mut tx, "SELECT a FROM t WHERE a >= 1", "a"),
        ints(&[1, 4, 12])
    );
    assert_eq!(
        column(&mut tx, "SELECT a FROM t WHERE a = 2", "a"),
        ints(&[])
    );

    tx.commit().unwrap();
}

#[test]
fn descending_order_through_reversed_scan() {
    let db = setup();
    let mut tx = db.begin(true).unwrap();

    exec(&mut tx, "CREATE TABLE t");
    exec(&mut tx, "CREATE INDEX ix ON t (a)");
    exec(&mut tx, "INSERT INTO t (a) VALUES (2), (5), (1), (4), (3)");

    assert_eq!(
        column(&mut tx, "SELECT a FROM t WHERE a >= 2 ORDER BY a DESC", "a"),
        ints(&[5, 4, 3, 2])
    );
    assert_eq!(
        column(&mut tx, "SELECT a FROM t WHERE a <= 3 ORDER BY a DESC", "a"),
        ints(&[3, 2, 1])
    );

    tx.commit().unwrap();
}

#[test]
fn non_unique_index_keeps_equal_values_apart() {
    let db = setup();
    let mut tx = db.begin(true).unwrap();

    exec(&mut tx, "CREATE TABLE t");
    exec(&mut tx, "CREATE INDEX ix ON t (a)");
    exec(&mut tx, "INSERT INTO t VALUES {a: 1, tag: 'x'}, {a: 1, tag: 'y'}");

    assert_eq!(rows(&mut tx, "SELECT * FROM t WHERE a = 1").len(), 2);

    exec(&mut tx, "DELETE FROM t WHERE tag = 'x'");
    let remaining = rows(&mut tx, "SELECT * FROM t WHERE a = 1");
    assert_eq!(remaining.len(), 1);
    assert_eq!(
        remaining[0].get("tag"),
        Some(&vellum::Value::Text("y".into()))
    );

    tx.commit().unwrap();
}

#[test]
fn typed_index_converts_probes() {
    let db = setup();
    let mut tx = db.begin(true).unwrap();

    exec(&mut tx, "CREATE TABLE t (a INTEGER)");
    exec(&mut tx, "CREATE INDEX ix ON t (a)");
    exec(&mut tx, "INSERT INTO t (a) VALUES (1), (2)");

    // A float literal convertible to the indexed integer kind still probes
    // the index.
    assert_eq!(
        column(&mut tx, "SELECT a FROM t WHERE a = 2.0", "a"),
        ints(&[2])
    );

    tx.commit().unwrap();
}

#[test]
fn drop_index_falls_back_to_scans() {
    let db = setup();
    let mut tx = db.begin(true).unwrap();

    exec(&mut tx, "CREATE TABLE t");
    exec(&mut tx, "CREATE INDEX ix ON t (a)");
    exec(&mut tx, "INSERT INTO t (a) VALUES (1), (2), (3)");
    exec(&mut tx, "DROP INDEX ix");

    let mut values = column(&mut tx, "SELECT a FROM t WHERE a >= 2", "a");
    values.sort_by(|a, b| a.cmp_total(b));
    assert_eq!(values, ints(&[2, 3]));

    assert!(matches!(
        tx.exec("DROP INDEX ix", &Params::new()),
        Err(Error::NotFound(_))
    ));

    tx.commit().unwrap();
}
