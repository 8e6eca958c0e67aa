//! The embedding surface: a `Database` over an engine, and transactions
//! that parse and execute statements.

use tracing::debug;
use vellum_engine::Engine;

use crate::error::{Error, Result};
use crate::execution::{self, Cancellation, Output, Params};
use crate::parsing::{self, ast::Statement};
use crate::storage::Catalog;
use crate::types::Document;
use vellum_engine::IterControl;

pub struct Database {
    engine: Box<dyn Engine>,
}

impl Database {
    /// Wraps an engine, creating the reserved catalog stores if this is a
    /// fresh one.
    pub fn new(engine: impl Engine + 'static) -> Result<Database> {
        let database = Database {
            engine: Box::new(engine),
        };
        let mut tx = database.engine.begin(true)?;
        Catalog::setup(tx.as_mut())?;
        tx.commit()?;
        Ok(database)
    }

    /// Begins a transaction. All statement execution happens within one;
    /// writes need `writable` and surface the engine's error otherwise.
    pub fn begin(&self, writable: bool) -> Result<Transaction> {
        Ok(Transaction {
            inner: self.engine.begin(writable)?,
            cancel: Cancellation::new(),
        })
    }

    /// Convenience: runs one statement in its own committed transaction.
    pub fn exec(&self, sql: &str, params: &Params) -> Result<Output> {
        let mut tx = self.begin(true)?;
        let output = tx.exec(sql, params)?;
        tx.commit()?;
        Ok(output)
    }
}

pub struct Transaction {
    inner: Box<dyn vellum_engine::Transaction>,
    cancel: Cancellation,
}

impl Transaction {
    /// Parses and executes one statement, buffering any result rows.
    pub fn exec(&mut self, sql: &str, params: &Params) -> Result<Output> {
        let stmt = parsing::parse(sql)?;
        debug!(sql, read_only = stmt.is_read_only(), "executing statement");
        execution::execute(&stmt, self.inner.as_mut(), params, &self.cancel)
    }

    /// Runs a SELECT and collects its rows.
    pub fn query(&self, sql: &str, params: &Params) -> Result<Vec<Document>> {
        let mut rows = Vec::new();
        self.query_with(sql, params, &mut |doc| {
            rows.push(doc);
            Ok(IterControl::Continue)
        })?;
        Ok(rows)
    }

    /// Runs a SELECT, streaming rows into the sink as they are produced.
    /// Rows handed to the sink before an error stay delivered.
    pub fn query_with(
        &self,
        sql: &str,
        params: &Params,
        sink: &mut dyn FnMut(Document) -> Result<IterControl>,
    ) -> Result<()> {
        let stmt = parsing::parse(sql)?;
        let select = match &stmt {
            Statement::Select(select) => select,
            _ => return Err(Error::Plan("statement is not a query".into())),
        };
        debug!(sql, "executing query");
        execution::execute_query(select, self.inner.as_ref(), params, &self.cancel, sink)
    }

    /// A token that cancels statements running in this transaction when
    /// triggered from another thread.
    pub fn cancellation(&self) -> Cancellation {
        self.cancel.clone()
    }

    /// Opens a table handle for storage-layer operations (schema
    /// evolution, reindexing, direct record access).
    pub fn table(&self, name: &str) -> Result<crate::storage::Table<'_>> {
        crate::storage::Table::open(self.inner.as_ref(), name)
    }

    /// The underlying engine transaction.
    pub fn engine(&self) -> &dyn vellum_engine::Transaction {
        self.inner.as_ref()
    }

    pub fn commit(self) -> Result<()> {
        self.inner.commit().map_err(Error::from)
    }

    pub fn rollback(self) -> Result<()> {
        self.inner.rollback().map_err(Error::from)
    }
}
