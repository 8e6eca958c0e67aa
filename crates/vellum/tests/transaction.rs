//! Transaction semantics: atomicity, visibility, read-only enforcement,
//! cancellation.

mod common;

use common::{exec, rows, setup};
use vellum::{Error, IterControl, Params};
use vellum_engine::StoreError;

#[test]
fn rollback_discards_everything() {
    let db = setup();

    let mut tx = db.begin(true).unwrap();
    exec(&mut tx, "CREATE TABLE t");
    exec(&mut tx, "INSERT INTO t VALUES {a: 1}");
    tx.rollback().unwrap();

    let mut tx = db.begin(true).unwrap();
    assert!(matches!(
        tx.exec("SELECT * FROM t", &Params::new()),
        Err(Error::NotFound(_))
    ));
    tx.rollback().unwrap();
}

#[test]
fn commit_publishes_ddl_and_data_together() {
    let db = setup();

    let mut tx = db.begin(true).unwrap();
    exec(&mut tx, "CREATE TABLE t");
    exec(&mut tx, "CREATE UNIQUE INDEX ix ON t (a)");
    exec(&mut tx, "INSERT INTO t VALUES {a: 1}");
    tx.commit().unwrap();

    let mut tx = db.begin(true).unwrap();
    assert_eq!(rows(&mut tx, "SELECT * FROM t").len(), 1);
    // The committed index still enforces uniqueness.
    assert!(matches!(
        tx.exec("INSERT INTO t VALUES {a: 1}", &Params::new()),
        Err(Error::Duplicate(_))
    ));
    tx.rollback().unwrap();
}

#[test]
fn read_only_transactions_reject_writes() {
    let db = setup();
    db.exec("CREATE TABLE t", &Params::new()).unwrap();

    let mut tx = db.begin(false).unwrap();
    assert_eq!(rows(&mut tx, "SELECT * FROM t").len(), 0);
    assert!(matches!(
        tx.exec("INSERT INTO t VALUES {a: 1}", &Params::new()),
        Err(Error::Engine(StoreError::ReadOnly))
    ));
    tx.rollback().unwrap();
}

#[test]
fn snapshot_isolation_for_readers() {
    let db = setup();
    db.exec("CREATE TABLE t", &Params::new()).unwrap();

    // A reader that began before a commit keeps its snapshot.
    let mut reader = db.begin(false).unwrap();
    db.exec("INSERT INTO t VALUES {a: 1}", &Params::new())
        .unwrap();
    assert_eq!(rows(&mut reader, "SELECT * FROM t").len(), 0);
    reader.rollback().unwrap();

    let mut reader = db.begin(false).unwrap();
    assert_eq!(rows(&mut reader, "SELECT * FROM t").len(), 1);
    reader.rollback().unwrap();
}

#[test]
fn cancellation_terminates_streams() {
    let db = setup();
    let mut tx = db.begin(true).unwrap();
    exec(&mut tx, "CREATE TABLE t");
    for i in 0..10 {
        exec(&mut tx, &format!("INSERT INTO t VALUES {{n: {}}}", i));
    }

    // Cancel mid-stream: the error surfaces after rows already emitted.
    let cancel = tx.cancellation();
    let mut seen = 0;
    let result = tx.query_with("SELECT n FROM t", &Params::new(), &mut |_| {
        seen += 1;
        if seen == 3 {
            cancel.cancel();
        }
        Ok(IterControl::Continue)
    });
    assert_eq!(result, Err(Error::Cancelled));
    assert_eq!(seen, 3);

    // The token stays cancelled for later statements in this transaction.
    assert_eq!(
        tx.exec("SELECT n FROM t", &Params::new()),
        Err(Error::Cancelled)
    );

    tx.rollback().unwrap();
}

#[test]
fn sink_can_stop_streams_early() {
    let db = setup();
    let mut tx = db.begin(true).unwrap();
    exec(&mut tx, "CREATE TABLE t");
    for i in 0..10 {
        exec(&mut tx, &format!("INSERT INTO t VALUES {{n: {}}}", i));
    }

    let mut seen = 0;
    tx.query_with("SELECT n FROM t", &Params::new(), &mut |_| {
        seen += 1;
        Ok(if seen == 4 {
            IterControl::Stop
        } else {
            IterControl::Continue
        })
    })
    .unwrap();
    assert_eq!(seen, 4);

    tx.rollback().unwrap();
}

#[test]
fn non_queries_are_rejected_by_query() {
    let db = setup();
    let mut tx = db.begin(true).unwrap();
    exec(&mut tx, "CREATE TABLE t");

    assert!(matches!(
        tx.query("INSERT INTO t VALUES {a: 1}", &Params::new()),
        Err(Error::Plan(_))
    ));

    tx.rollback().unwrap();
}
