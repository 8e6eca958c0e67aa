//! Pull-based plan execution.
//!
//! Every node follows the same contract: `iterate` walks the node's stream
//! and hands each document to the callback, which answers whether to keep
//! going. Nodes never buffer more than needed; `Sort` and `Grouping` are
//! the only materializing nodes. The cancellation token is checked between
//! callbacks at every input and materialized emit loop.

use std::cmp::Ordering;

use vellum_engine::{IterControl, Transaction};

use super::aggregate::Accumulator;
use super::{Cancellation, EvalContext, Params};
use crate::error::{Error, Result};
use crate::parsing::ast::{Direction, Expr, Projection};
use crate::planning::{IndexRange, Node};
use crate::storage::{Index, PrimaryKey, Table};
use crate::types::{Document, FieldBuffer, Path, Value};

/// Per-statement execution context. Statements address a single table, so
/// its primary-key declaration rides along for `key()`/`pk()`.
pub struct ExecContext<'a> {
    pub tx: &'a dyn Transaction,
    pub params: &'a Params,
    pub cancel: &'a Cancellation,
    pub primary_key: Option<PrimaryKey>,
}

impl ExecContext<'_> {
    fn eval_ctx<'b>(&'b self, item: &'b Item) -> EvalContext<'b> {
        EvalContext {
            record: Some(&item.doc),
            record_id: item.record_id.as_deref(),
            primary_key: self.primary_key.as_ref(),
            params: self.params,
        }
    }
}

/// One element of a document stream. The record id is carried along until
/// projection so `key()` and `pk()` can reach it.
#[derive(Debug, Clone)]
pub struct Item {
    pub record_id: Option<Vec<u8>>,
    pub doc: Document,
}

/// Executes the node, streaming items into the callback.
pub fn iterate(
    node: &Node,
    ctx: &ExecContext<'_>,
    f: &mut dyn FnMut(Item) -> Result<IterControl>,
) -> Result<()> {
    match node {
        Node::TableInput { table } => {
            let table = Table::open(ctx.tx, table)?;
            table.iterate(&mut |id, doc| {
                ctx.cancel.check()?;
                f(Item {
                    record_id: Some(id.to_vec()),
                    doc,
                })
            })
        }

        Node::IndexInput {
            index,
            range,
            reverse,
        } => iterate_index(index, range, *reverse, ctx, f),

        Node::Selection { child, predicate } => iterate(child, ctx, &mut |item| {
            if predicate.eval(&ctx.eval_ctx(&item))?.is_truthy() {
                f(item)
            } else {
                Ok(IterControl::Continue)
            }
        }),

        Node::Projection { child, projections } => {
            if projections.iter().any(projection_has_aggregate) {
                iterate_aggregate(child, projections, ctx, f)
            } else {
                iterate(child, ctx, &mut |item| {
                    let doc = project(&item, projections, ctx)?;
                    f(Item {
                        record_id: item.record_id,
                        doc,
                    })
                })
            }
        }

        Node::Sort {
            child,
            path,
            direction,
        } => {
            let mut keyed = materialize_keyed(child, path, ctx)?;
            match direction {
                Direction::Ascending => keyed.sort_by(|(a, _), (b, _)| a.cmp_total(b)),
                // A reversed comparator keeps the sort stable, unlike
                // sorting ascending and reversing the buffer.
                Direction::Descending => keyed.sort_by(|(a, _), (b, _)| b.cmp_total(a)),
            }
            emit_all(keyed, ctx, f)
        }

        Node::Grouping { child, path } => {
            let mut keyed = materialize_keyed(child, path, ctx)?;
            keyed.sort_by(|(a, _), (b, _)| a.cmp_total(b));
            emit_all(keyed, ctx, f)
        }

        Node::Limit { child, limit } => {
            if *limit == 0 {
                return Ok(());
            }
            let mut remaining = *limit;
            iterate(child, ctx, &mut |item| {
                let control = f(item)?;
                remaining -= 1;
                if control == IterControl::Stop || remaining == 0 {
                    Ok(IterControl::Stop)
                } else {
                    Ok(IterControl::Continue)
                }
            })
        }

        Node::Offset { child, offset } => {
            let mut to_skip = *offset;
            iterate(child, ctx, &mut |item| {
                if to_skip > 0 {
                    to_skip -= 1;
                    return Ok(IterControl::Continue);
                }
                f(item)
            })
        }
    }
}

/// Materializes the child stream with each item's sort key.
fn materialize_keyed(
    child: &Node,
    path: &Path,
    ctx: &ExecContext<'_>,
) -> Result<Vec<(Value, Item)>> {
    let mut keyed = Vec::new();
    iterate(child, ctx, &mut |item| {
        let key = path
            .resolve_document(&item.doc)
            .cloned()
            .unwrap_or(Value::Null);
        keyed.push((key, item));
        Ok(IterControl::Continue)
    })?;
    Ok(keyed)
}

fn emit_all(
    keyed: Vec<(Value, Item)>,
    ctx: &ExecContext<'_>,
    f: &mut dyn FnMut(Item) -> Result<IterControl>,
) -> Result<()> {
    for (_, item) in keyed {
        ctx.cancel.check()?;
        if let IterControl::Stop = f(item)? {
            break;
        }
    }
    Ok(())
}

fn iterate_index(
    name: &str,
    range: &IndexRange,
    reverse: bool,
    ctx: &ExecContext<'_>,
    f: &mut dyn FnMut(Item) -> Result<IterControl>,
) -> Result<()> {
    let index = Index::open(ctx.tx, name)?;
    let table = Table::open(ctx.tx, &index.config().table)?;

    let mut visit = |value: Value, record_id: &[u8]| -> Result<IterControl> {
        ctx.cancel.check()?;
        // Entries indexed under null (missing paths on unique indexes)
        // never satisfy a comparison predicate.
        if value.is_null() {
            return Ok(IterControl::Continue);
        }
        // The far bound ends the scan.
        if reverse {
            if let Some((lower, inclusive)) = &range.lower {
                match value.cmp_total(lower) {
                    Ordering::Less => return Ok(IterControl::Stop),
                    Ordering::Equal if !inclusive => return Ok(IterControl::Stop),
                    _ => {}
                }
            }
        } else if let Some((upper, inclusive)) = &range.upper {
            match value.cmp_total(upper) {
                Ordering::Greater => return Ok(IterControl::Stop),
                Ordering::Equal if !inclusive => return Ok(IterControl::Stop),
                _ => {}
            }
        }
        let doc = table.get(record_id)?;
        f(Item {
            record_id: Some(record_id.to_vec()),
            doc,
        })
    };

    if reverse {
        let bound = range.upper.as_ref().map(|(value, inclusive)| (value, *inclusive));
        index.descend_less_or_equal(bound, &mut visit)
    } else {
        let bound = range.lower.as_ref().map(|(value, inclusive)| (value, *inclusive));
        index.ascend_greater_or_equal(bound, &mut visit)
    }
}

/// Builds the projected document for one input item. `*` copies all input
/// fields in order; expressions project under their alias or their own
/// rendering.
fn project(item: &Item, projections: &[Projection], ctx: &ExecContext<'_>) -> Result<Document> {
    let mut buf = FieldBuffer::new();
    let eval_ctx = ctx.eval_ctx(item);
    for projection in projections {
        match projection {
            Projection::Wildcard => {
                for (name, value) in item.doc.iter() {
                    buf.set(name, value.clone());
                }
            }
            Projection::Expr { expr, alias } => {
                let name = alias.clone().unwrap_or_else(|| expr.to_string());
                buf.set(&name, expr.eval(&eval_ctx)?);
            }
        }
    }
    Ok(buf.into_document())
}

fn projection_has_aggregate(projection: &Projection) -> bool {
    matches!(projection, Projection::Expr { expr, .. } if expr.has_aggregate())
}

/// State for the group currently being accumulated.
struct Group {
    key: Option<Value>,
    first: Item,
    accumulators: Vec<Accumulator>,
}

fn new_accumulators(projections: &[Projection]) -> Result<Vec<Accumulator>> {
    let mut accumulators = Vec::new();
    for projection in projections {
        if let Projection::Expr { expr, .. } = projection {
            match expr {
                Expr::Aggregate(op, arg) => {
                    accumulators.push(Accumulator::new(*op, arg.is_none()))
                }
                expr if expr.has_aggregate() => {
                    return Err(Error::Plan(
                        "aggregate functions must be top-level projections".into(),
                    ))
                }
                _ => {}
            }
        }
    }
    Ok(accumulators)
}

/// Aggregating projection: consumes the child stream (group-ordered when
/// the child is a `Grouping`), accumulating per group and emitting one
/// document at each group boundary. Without GROUP BY the whole input is one
/// group and an empty input still produces a row.
fn iterate_aggregate(
    child: &Node,
    projections: &[Projection],
    ctx: &ExecContext<'_>,
    f: &mut dyn FnMut(Item) -> Result<IterControl>,
) -> Result<()> {
    let group_path = match child {
        Node::Grouping { path, .. } => Some(path),
        _ => None,
    };

    let mut group: Option<Group> = None;
    let mut stopped = false;

    iterate(child, ctx, &mut |item| {
        let key = match group_path {
            Some(path) => Some(
                path.resolve_document(&item.doc)
                    .cloned()
                    .unwrap_or(Value::Null),
            ),
            None => None,
        };

        let boundary = match &group {
            Some(current) => !same_key(&current.key, &key),
            None => false,
        };
        if boundary {
            let finished = group.take().expect("boundary implies a current group");
            let doc = finish_group(finished, projections, ctx)?;
            if let IterControl::Stop = f(Item {
                record_id: None,
                doc,
            })? {
                stopped = true;
                return Ok(IterControl::Stop);
            }
        }

        if group.is_none() {
            group = Some(Group {
                key,
                first: item.clone(),
                accumulators: new_accumulators(projections)?,
            });
        }
        let current = group.as_mut().expect("just initialized");

        let eval_ctx = ctx.eval_ctx(&item);
        let mut slot = 0;
        for projection in projections {
            if let Projection::Expr {
                expr: Expr::Aggregate(_, arg),
                ..
            } = projection
            {
                let value = match arg {
                    Some(arg) => arg.eval(&eval_ctx)?,
                    None => Value::Null,
                };
                current.accumulators[slot].update(&value)?;
                slot += 1;
            }
        }
        Ok(IterControl::Continue)
    })?;

    if stopped {
        return Ok(());
    }
    match group {
        Some(group) => {
            let doc = finish_group(group, projections, ctx)?;
            f(Item {
                record_id: None,
                doc,
            })?;
            Ok(())
        }
        // No input rows: aggregates over the whole table still produce one
        // row, grouped queries produce none.
        None if group_path.is_none() => {
            let empty = Group {
                key: None,
                first: Item {
                    record_id: None,
                    doc: Document::new(),
                },
                accumulators: new_accumulators(projections)?,
            };
            let doc = finish_group(empty, projections, ctx)?;
            f(Item {
                record_id: None,
                doc,
            })?;
            Ok(())
        }
        None => Ok(()),
    }
}

fn same_key(a: &Option<Value>, b: &Option<Value>) -> bool {
    match (a, b) {
        (None, None) => true,
        (Some(a), Some(b)) => a.cmp_total(b) == Ordering::Equal,
        _ => false,
    }
}

/// Builds the output document for a finished group. Non-aggregate
/// projections evaluate against the group's first record.
fn finish_group(
    group: Group,
    projections: &[Projection],
    ctx: &ExecContext<'_>,
) -> Result<Document> {
    let mut buf = FieldBuffer::new();
    let eval_ctx = ctx.eval_ctx(&group.first);
    let mut accumulators = group.accumulators.into_iter();
    for projection in projections {
        match projection {
            Projection::Wildcard => {
                for (name, value) in group.first.doc.iter() {
                    buf.set(name, value.clone());
                }
            }
            Projection::Expr {
                expr: expr @ Expr::Aggregate(..),
                alias,
            } => {
                let name = alias.clone().unwrap_or_else(|| expr.to_string());
                let value = accumulators
                    .next()
                    .expect("one accumulator per aggregate projection")
                    .finish();
                buf.set(&name, value);
            }
            Projection::Expr { expr, alias } => {
                let name = alias.clone().unwrap_or_else(|| expr.to_string());
                buf.set(&name, expr.eval(&eval_ctx)?);
            }
        }
    }
    Ok(buf.into_document())
}
