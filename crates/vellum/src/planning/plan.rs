//! The logical plan tree. Each node owns its child; plans are values built
//! per statement execution, never shared between queries.

use crate::parsing::ast::{Direction, Expr, Projection};
use crate::types::{Path, Value};

/// Value range scanned by an index input. Bounds carry values already
/// converted to the indexed kind, paired with an inclusive flag.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct IndexRange {
    pub lower: Option<(Value, bool)>,
    pub upper: Option<(Value, bool)>,
}

impl IndexRange {
    /// The closed single-value range an equality predicate produces.
    pub fn point(value: Value) -> IndexRange {
        IndexRange {
            lower: Some((value.clone(), true)),
            upper: Some((value, true)),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// Full table scan in record-id order.
    TableInput { table: String },

    /// Bounded scan over a secondary index, fetching each pointed-at
    /// record. `reverse` walks the range from its upper end.
    IndexInput {
        index: String,
        range: IndexRange,
        reverse: bool,
    },

    /// Emits inputs for which the predicate is truthy.
    Selection { child: Box<Node>, predicate: Expr },

    /// Rewrites each document to the projected fields.
    Projection {
        child: Box<Node>,
        projections: Vec<Projection>,
    },

    /// Materializes and sorts by the value at `path`.
    Sort {
        child: Box<Node>,
        path: Path,
        direction: Direction,
    },

    /// Emits at most `limit` documents.
    Limit { child: Box<Node>, limit: usize },

    /// Skips the first `offset` documents.
    Offset { child: Box<Node>, offset: usize },

    /// Stable-sorts by `path` so downstream aggregation sees group
    /// boundaries as key changes.
    Grouping { child: Box<Node>, path: Path },
}
