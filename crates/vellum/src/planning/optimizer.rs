//! Plan optimization by pattern-matching on the tree shape.
//!
//! Two rewrites, both driven by the indexes declared on the scanned table:
//!
//! - A `Selection` directly above a `TableInput` becomes an `IndexInput`
//!   when one of the predicate's conjuncts is `path op literal` with an
//!   index on that path and a literal convertible to the indexed kind. The
//!   other conjuncts stay behind as a residual `Selection`.
//! - A `Sort` whose child scans an index on the sorted path is folded into
//!   the scan: ascending order comes free, descending flips the scan
//!   direction.

use tracing::debug;

use super::{IndexRange, Node};
use crate::parsing::ast::{Direction, Expr};
use crate::storage::IndexConfig;
use crate::types::{Path, Value};

/// Comparison operators usable for index ranges.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RangeOp {
    Eq,
    Lt,
    Lte,
    Gt,
    Gte,
}

pub fn optimize(node: Node, indexes: &[(String, IndexConfig)]) -> Node {
    match node {
        Node::Selection { child, predicate } => {
            let child = optimize(*child, indexes);
            if let Node::TableInput { .. } = child {
                rewrite_selection(child, predicate, indexes)
            } else {
                Node::Selection {
                    child: Box::new(child),
                    predicate,
                }
            }
        }
        Node::Sort {
            child,
            path,
            direction,
        } => {
            let child = optimize(*child, indexes);
            fold_sort(child, path, direction, indexes)
        }
        Node::Projection { child, projections } => Node::Projection {
            child: Box::new(optimize(*child, indexes)),
            projections,
        },
        Node::Grouping { child, path } => Node::Grouping {
            child: Box::new(optimize(*child, indexes)),
            path,
        },
        Node::Limit { child, limit } => Node::Limit {
            child: Box::new(optimize(*child, indexes)),
            limit,
        },
        Node::Offset { child, offset } => Node::Offset {
            child: Box::new(optimize(*child, indexes)),
            offset,
        },
        leaf @ (Node::TableInput { .. } | Node::IndexInput { .. }) => leaf,
    }
}

/// Replaces a selection over a table scan by an index scan when a conjunct
/// allows it, keeping the remaining conjuncts as a residual selection.
fn rewrite_selection(child: Node, predicate: Expr, indexes: &[(String, IndexConfig)]) -> Node {
    let conjuncts = flatten_and(predicate);

    for (i, conjunct) in conjuncts.iter().enumerate() {
        let Some((path, op, literal)) = as_path_op_literal(conjunct) else {
            continue;
        };
        let Some((name, config)) = indexes.iter().find(|(_, c)| c.path == *path) else {
            continue;
        };
        // The literal must convert to the indexed kind; otherwise leave
        // this conjunct to the residual filter.
        let value = match config.kind {
            Some(kind) => match literal.convert_to(kind) {
                Ok(value) => value,
                Err(_) => continue,
            },
            None => literal.clone(),
        };

        debug!(index = name.as_str(), op = ?op, "using index scan");
        let mut node = Node::IndexInput {
            index: name.clone(),
            range: range_for(op, value),
            reverse: false,
        };
        let residual: Vec<Expr> = conjuncts
            .iter()
            .enumerate()
            .filter(|(j, _)| *j != i)
            .map(|(_, expr)| expr.clone())
            .collect();
        if let Some(residual) = rebuild_and(residual) {
            node = Node::Selection {
                child: Box::new(node),
                predicate: residual,
            };
        }
        return node;
    }

    let predicate = rebuild_and(conjuncts).expect("conjuncts of a predicate are non-empty");
    Node::Selection {
        child: Box::new(child),
        predicate,
    }
}

/// Drops a sort whose child already scans an index on the sorted path,
/// flipping the scan for descending order. A residual selection between
/// sort and scan streams records through unchanged, so the fold sees
/// through it.
fn fold_sort(
    child: Node,
    path: Path,
    direction: Direction,
    indexes: &[(String, IndexConfig)],
) -> Node {
    let scan_path = |index: &str| {
        indexes
            .iter()
            .find(|(name, _)| name == index)
            .map(|(_, config)| config.path.clone())
    };

    match child {
        Node::IndexInput {
            index,
            range,
            reverse: false,
        } if scan_path(&index).as_ref() == Some(&path) => {
            debug!(index = index.as_str(), ?direction, "order satisfied by index scan");
            Node::IndexInput {
                index,
                range,
                reverse: direction == Direction::Descending,
            }
        }
        Node::Selection { child, predicate }
            if matches!(
                &*child,
                Node::IndexInput { index, reverse: false, .. }
                    if scan_path(index).as_ref() == Some(&path)
            ) =>
        {
            let folded = fold_sort(*child, path, direction, indexes);
            Node::Selection {
                child: Box::new(folded),
                predicate,
            }
        }
        other => Node::Sort {
            child: Box::new(other),
            path,
            direction,
        },
    }
}

/// Splits a predicate into its top-level AND conjuncts.
fn flatten_and(expr: Expr) -> Vec<Expr> {
    match expr {
        Expr::And(lhs, rhs) => {
            let mut conjuncts = flatten_and(*lhs);
            conjuncts.extend(flatten_and(*rhs));
            conjuncts
        }
        other => vec![other],
    }
}

fn rebuild_and(conjuncts: Vec<Expr>) -> Option<Expr> {
    conjuncts
        .into_iter()
        .reduce(|lhs, rhs| Expr::And(Box::new(lhs), Box::new(rhs)))
}

/// Matches `path op literal` and `literal op path` (with the operator
/// flipped), the only shapes an index range can serve.
fn as_path_op_literal(expr: &Expr) -> Option<(&Path, RangeOp, &Value)> {
    let (lhs, op, rhs) = match expr {
        Expr::Equal(l, r) => (l, RangeOp::Eq, r),
        Expr::LessThan(l, r) => (l, RangeOp::Lt, r),
        Expr::LessOrEqual(l, r) => (l, RangeOp::Lte, r),
        Expr::GreaterThan(l, r) => (l, RangeOp::Gt, r),
        Expr::GreaterOrEqual(l, r) => (l, RangeOp::Gte, r),
        _ => return None,
    };
    match (&**lhs, &**rhs) {
        (Expr::Path(path), Expr::Literal(value)) => Some((path, op, value)),
        (Expr::Literal(value), Expr::Path(path)) => Some((path, flip(op), value)),
        _ => None,
    }
}

fn flip(op: RangeOp) -> RangeOp {
    match op {
        RangeOp::Eq => RangeOp::Eq,
        RangeOp::Lt => RangeOp::Gt,
        RangeOp::Lte => RangeOp::Gte,
        RangeOp::Gt => RangeOp::Lt,
        RangeOp::Gte => RangeOp::Lte,
    }
}

fn range_for(op: RangeOp, value: Value) -> IndexRange {
    match op {
        RangeOp::Eq => IndexRange::point(value),
        RangeOp::Lt => IndexRange {
            lower: None,
            upper: Some((value, false)),
        },
        RangeOp::Lte => IndexRange {
            lower: None,
            upper: Some((value, true)),
        },
        RangeOp::Gt => IndexRange {
            lower: Some((value, false)),
            upper: None,
        },
        RangeOp::Gte => IndexRange {
            lower: Some((value, true)),
            upper: None,
        },
    }
}
