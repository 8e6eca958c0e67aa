//! Shared helpers for the end-to-end tests.
#![allow(dead_code)]

use vellum::{Database, Document, Output, Params, Transaction, Value};
use vellum_engine::MemoryEngine;

/// A fresh database over an empty in-memory engine.
pub fn setup() -> Database {
    Database::new(MemoryEngine::new()).expect("database setup")
}

pub fn exec(tx: &mut Transaction, sql: &str) -> Output {
    tx.exec(sql, &Params::new())
        .unwrap_or_else(|err| panic!("exec {:?} failed: {}", sql, err))
}

pub fn rows(tx: &mut Transaction, sql: &str) -> Vec<Document> {
    match exec(tx, sql) {
        Output::Rows(rows) => rows,
        other => panic!("expected rows from {:?}, got {:?}", sql, other),
    }
}

/// The value of `field` in each result row, in row order.
pub fn column(tx: &mut Transaction, sql: &str, field: &str) -> Vec<Value> {
    rows(tx, sql)
        .iter()
        .map(|doc| doc.get(field).cloned().unwrap_or(Value::Null))
        .collect()
}

pub fn ints(values: &[i64]) -> Vec<Value> {
    values.iter().map(|&i| Value::Int64(i)).collect()
}

pub fn texts(values: &[&str]) -> Vec<Value> {
    values.iter().map(|&s| Value::Text(s.into())).collect()
}
