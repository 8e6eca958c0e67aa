//! Statement execution: DDL against the catalog, writes through the table
//! layer, queries through the streaming executor. Writes run in two phases
//! (collect matches, then mutate) so iteration never races its own updates.

use tracing::debug;
use vellum_engine::{IterControl, Transaction};

use super::{executor, Cancellation, EvalContext, ExecContext, Params};
use crate::error::{Error, Result};
use crate::parsing::ast::{Expr, InsertSource, SelectStatement, Statement};
use crate::planning::{optimize, plan_select, Node};
use crate::storage::{Catalog, FieldConstraint, IndexConfig, PrimaryKey, Table, TableConfig};
use crate::types::{Document, Path, Value};

/// Result of executing one statement.
#[derive(Debug, Clone, PartialEq)]
pub enum Output {
    /// SELECT result rows.
    Rows(Vec<Document>),
    /// Records affected by INSERT/UPDATE/DELETE.
    Count(usize),
    /// DDL statements produce no output.
    None,
}

pub fn execute(
    stmt: &Statement,
    tx: &mut dyn Transaction,
    params: &Params,
    cancel: &Cancellation,
) -> Result<Output> {
    match stmt {
        Statement::CreateTable { name, columns } => {
            let mut config = TableConfig::default();
            for column in columns {
                if column.primary_key {
                    config.primary_key = Some(PrimaryKey {
                        path: column.path.clone(),
                        kind: column.kind,
                    });
                }
                config.constraints.push(FieldConstraint {
                    path: column.path.clone(),
                    kind: column.kind,
                    not_null: column.not_null,
                    default: column.default.clone(),
                });
            }
            Catalog::create_table(tx, name, &config)?;
            Ok(Output::None)
        }

        Statement::DropTable { name } => {
            Catalog::drop_table(tx, name)?;
            Ok(Output::None)
        }

        Statement::CreateIndex {
            name,
            table,
            path,
            unique,
        } => {
            let table_config = Catalog::table_config(tx, table)?;
            let kind = table_config
                .constraints
                .iter()
                .find(|constraint| constraint.path == *path)
                .map(|constraint| constraint.kind);
            Catalog::create_index(
                tx,
                name,
                &IndexConfig {
                    table: table.clone(),
                    path: path.clone(),
                    unique: *unique,
                    kind,
                },
            )?;
            // Index the records that already exist.
            let mut table = Table::open(&*tx, table)?;
            table.reindex(name)?;
            Ok(Output::None)
        }

        Statement::DropIndex { name } => {
            Catalog::drop_index(tx, name)?;
            Ok(Output::None)
        }

        Statement::Insert { table, source } => insert(tx, table, source, params, cancel),

        Statement::Update {
            table,
            assignments,
            filter,
        } => update(tx, table, assignments, filter.as_ref(), params, cancel),

        Statement::Delete { table, filter } => {
            delete(tx, table, filter.as_ref(), params, cancel)
        }

        Statement::Select(select) => {
            let mut rows = Vec::new();
            execute_query(select, tx, params, cancel, &mut |doc| {
                rows.push(doc);
                Ok(IterControl::Continue)
            })?;
            Ok(Output::Rows(rows))
        }
    }
}

/// Runs a SELECT, streaming result documents into the sink. Rows already
/// emitted stay emitted when a later row errors; the error is surfaced to
/// the caller once.
pub fn execute_query(
    stmt: &SelectStatement,
    tx: &dyn Transaction,
    params: &Params,
    cancel: &Cancellation,
    sink: &mut dyn FnMut(Document) -> Result<IterControl>,
) -> Result<()> {
    let table = Table::open(tx, &stmt.table)?;
    let indexes = index_metadata(&table);
    let primary_key = table.config().primary_key.clone();

    let node = plan_select(stmt, params)?;
    let node = optimize(node, &indexes);
    debug!(table = stmt.table.as_str(), "executing select");

    let ctx = ExecContext {
        tx,
        params,
        cancel,
        primary_key,
    };
    executor::iterate(&node, &ctx, &mut |item| sink(item.doc))
}

fn insert(
    tx: &mut dyn Transaction,
    table_name: &str,
    source: &InsertSource,
    params: &Params,
    cancel: &Cancellation,
) -> Result<Output> {
    let mut table = Table::open(&*tx, table_name)?;
    let ctx = EvalContext::constant(params);
    let mut count = 0;

    match source {
        InsertSource::Fields { paths, rows } => {
            for row in rows {
                cancel.check()?;
                let mut doc = Document::new();
                for (path, expr) in paths.iter().zip(row) {
                    path.set_in_document(&mut doc, expr.eval(&ctx)?)?;
                }
                table.insert(doc)?;
                count += 1;
            }
        }
        InsertSource::Documents(documents) => {
            for expr in documents {
                cancel.check()?;
                match expr.eval(&ctx)? {
                    Value::Document(doc) => {
                        table.insert(doc)?;
                        count += 1;
                    }
                    value => {
                        return Err(Error::type_mismatch(
                            "document",
                            value.kind().to_string(),
                        ))
                    }
                }
            }
        }
    }
    Ok(Output::Count(count))
}

fn update(
    tx: &mut dyn Transaction,
    table_name: &str,
    assignments: &[(Path, Expr)],
    filter: Option<&Expr>,
    params: &Params,
    cancel: &Cancellation,
) -> Result<Output> {
    let matches = collect_matches(&*tx, table_name, filter, params, cancel)?;
    let mut table = Table::open(&*tx, table_name)?;
    let primary_key = table.config().primary_key.clone();

    let mut count = 0;
    for (id, doc) in matches {
        cancel.check()?;
        // Assignments see the record as it was before this statement.
        let eval_ctx = EvalContext {
            record: Some(&doc),
            record_id: Some(&id),
            primary_key: primary_key.as_ref(),
            params,
        };
        let mut updated = doc.clone();
        for (path, expr) in assignments {
            path.set_in_document(&mut updated, expr.eval(&eval_ctx)?)?;
        }
        table.replace(&id, updated)?;
        count += 1;
    }
    Ok(Output::Count(count))
}

fn delete(
    tx: &mut dyn Transaction,
    table_name: &str,
    filter: Option<&Expr>,
    params: &Params,
    cancel: &Cancellation,
) -> Result<Output> {
    let matches = collect_matches(&*tx, table_name, filter, params, cancel)?;
    let mut table = Table::open(&*tx, table_name)?;

    let mut count = 0;
    for (id, _) in matches {
        cancel.check()?;
        table.delete(&id)?;
        count += 1;
    }
    Ok(Output::Count(count))
}

/// Phase one of UPDATE/DELETE: the records matching the filter, collected
/// through the same planned (and index-optimized) scan a query would use.
fn collect_matches(
    tx: &dyn Transaction,
    table_name: &str,
    filter: Option<&Expr>,
    params: &Params,
    cancel: &Cancellation,
) -> Result<Vec<(Vec<u8>, Document)>> {
    let table = Table::open(tx, table_name)?;
    let indexes = index_metadata(&table);
    let primary_key = table.config().primary_key.clone();

    let mut node = Node::TableInput {
        table: table_name.to_string(),
    };
    if let Some(filter) = filter {
        node = Node::Selection {
            child: Box::new(node),
            predicate: filter.clone(),
        };
    }
    let node = optimize(node, &indexes);

    let ctx = ExecContext {
        tx,
        params,
        cancel,
        primary_key,
    };
    let mut matches = Vec::new();
    executor::iterate(&node, &ctx, &mut |item| {
        let id = item.record_id.expect("table and index scans carry record ids");
        matches.push((id, item.doc));
        Ok(IterControl::Continue)
    })?;
    Ok(matches)
}

fn index_metadata(table: &Table<'_>) -> Vec<(String, IndexConfig)> {
    table
        .indexes()
        .map(|(name, config)| (name.to_string(), config.clone()))
        .collect()
}
