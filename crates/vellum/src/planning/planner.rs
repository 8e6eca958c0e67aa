//! Builds the plan tree for SELECT statements.
//!
//! The nesting is fixed: `Limit(Offset(Projection(Sort(Grouping(
//! Selection(TableInput))))))`, with absent clauses skipped, so OFFSET
//! always skips before LIMIT counts.

use super::Node;
use crate::error::{Error, Result};
use crate::execution::{EvalContext, Params};
use crate::parsing::ast::{Expr, SelectStatement};
use crate::types::{Value, ValueKind};

pub fn plan_select(stmt: &SelectStatement, params: &Params) -> Result<Node> {
    let mut node = Node::TableInput {
        table: stmt.table.clone(),
    };

    if let Some(filter) = &stmt.filter {
        node = Node::Selection {
            child: Box::new(node),
            predicate: filter.clone(),
        };
    }

    if let Some(path) = &stmt.group_by {
        node = Node::Grouping {
            child: Box::new(node),
            path: path.clone(),
        };
    }

    // Without grouping, records sort before projection so the sort path can
    // reach unprojected fields. With grouping, the projection must sit
    // directly on the grouped stream to see group boundaries, so the sort
    // applies to the aggregated output instead.
    let sort_before_projection = stmt.group_by.is_none();

    if sort_before_projection {
        if let Some((path, direction)) = &stmt.order_by {
            node = Node::Sort {
                child: Box::new(node),
                path: path.clone(),
                direction: *direction,
            };
        }
    }

    node = Node::Projection {
        child: Box::new(node),
        projections: stmt.projections.clone(),
    };

    if !sort_before_projection {
        if let Some((path, direction)) = &stmt.order_by {
            node = Node::Sort {
                child: Box::new(node),
                path: path.clone(),
                direction: *direction,
            };
        }
    }

    if let Some(offset) = &stmt.offset {
        node = Node::Offset {
            child: Box::new(node),
            offset: eval_count(offset, params)?,
        };
    }

    if let Some(limit) = &stmt.limit {
        node = Node::Limit {
            child: Box::new(node),
            limit: eval_count(limit, params)?,
        };
    }

    Ok(node)
}

/// LIMIT/OFFSET operands: evaluated without a record, convertible to a
/// non-negative integer.
fn eval_count(expr: &Expr, params: &Params) -> Result<usize> {
    let value = expr.eval(&EvalContext::constant(params))?;
    match value.convert_to(ValueKind::Int64)? {
        Value::Int64(count) if count >= 0 => Ok(count as usize),
        Value::Int64(count) => Err(Error::type_mismatch(
            "non-negative integer",
            count.to_string(),
        )),
        _ => unreachable!("convert_to(Int64) yields Int64"),
    }
}
