//! The statement and expression AST produced by the parser.

use std::fmt;

use crate::types::{Path, Value, ValueKind};

#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    CreateTable {
        name: String,
        columns: Vec<ColumnDef>,
    },
    DropTable {
        name: String,
    },
    CreateIndex {
        name: String,
        table: String,
        path: Path,
        unique: bool,
    },
    DropIndex {
        name: String,
    },
    Insert {
        table: String,
        source: InsertSource,
    },
    Select(SelectStatement),
    Update {
        table: String,
        assignments: Vec<(Path, Expr)>,
        filter: Option<Expr>,
    },
    Delete {
        table: String,
        filter: Option<Expr>,
    },
}

impl Statement {
    /// Whether the statement can run inside a read-only transaction. The
    /// caller is responsible for beginning a matching transaction kind.
    pub fn is_read_only(&self) -> bool {
        matches!(self, Statement::Select(_))
    }
}

/// One entry of a CREATE TABLE column list.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnDef {
    pub path: Path,
    pub kind: ValueKind,
    pub primary_key: bool,
    pub not_null: bool,
    pub default: Option<Value>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum InsertSource {
    /// `INSERT INTO t (a, b) VALUES (1, 'x'), ...`
    Fields {
        paths: Vec<Path>,
        rows: Vec<Vec<Expr>>,
    },
    /// `INSERT INTO t VALUES {a: 1, b: 'x'}, ...`
    Documents(Vec<Expr>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct SelectStatement {
    pub projections: Vec<Projection>,
    pub table: String,
    pub filter: Option<Expr>,
    pub group_by: Option<Path>,
    pub order_by: Option<(Path, Direction)>,
    pub limit: Option<Expr>,
    pub offset: Option<Expr>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Projection {
    /// `*`: all fields of the input record, in its order.
    Wildcard,
    /// An expression, optionally renamed with `AS`.
    Expr { expr: Expr, alias: Option<String> },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Ascending,
    Descending,
}

/// Functions evaluated against the current record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Function {
    /// The record's id (the primary-key value when one is declared).
    Key,
    /// The primary-key value, or null without one.
    Pk,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregateOp {
    Count,
    Min,
    Max,
    Sum,
    Avg,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Value),
    Path(Path),
    PositionalParam(usize),
    NamedParam(String),
    DocumentLiteral(Vec<(String, Expr)>),
    ArrayLiteral(Vec<Expr>),

    Equal(Box<Expr>, Box<Expr>),
    NotEqual(Box<Expr>, Box<Expr>),
    LessThan(Box<Expr>, Box<Expr>),
    LessOrEqual(Box<Expr>, Box<Expr>),
    GreaterThan(Box<Expr>, Box<Expr>),
    GreaterOrEqual(Box<Expr>, Box<Expr>),

    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
    Not(Box<Expr>),

    Add(Box<Expr>, Box<Expr>),
    Subtract(Box<Expr>, Box<Expr>),
    Multiply(Box<Expr>, Box<Expr>),
    Divide(Box<Expr>, Box<Expr>),
    Remainder(Box<Expr>, Box<Expr>),
    Negate(Box<Expr>),

    Function(Function),
    /// An aggregate over the group's records; `None` argument is `COUNT(*)`.
    Aggregate(AggregateOp, Option<Box<Expr>>),
}

impl Expr {
    /// Whether the expression contains an aggregate anywhere.
    pub fn has_aggregate(&self) -> bool {
        match self {
            Expr::Aggregate(..) => true,
            Expr::Literal(_)
            | Expr::Path(_)
            | Expr::PositionalParam(_)
            | Expr::NamedParam(_)
            | Expr::Function(_) => false,
            Expr::DocumentLiteral(fields) => fields.iter().any(|(_, e)| e.has_aggregate()),
            Expr::ArrayLiteral(items) => items.iter().any(Expr::has_aggregate),
            Expr::Equal(l, r)
            | Expr::NotEqual(l, r)
            | Expr::LessThan(l, r)
            | Expr::LessOrEqual(l, r)
            | Expr::GreaterThan(l, r)
            | Expr::GreaterOrEqual(l, r)
            | Expr::And(l, r)
            | Expr::Or(l, r)
            | Expr::Add(l, r)
            | Expr::Subtract(l, r)
            | Expr::Multiply(l, r)
            | Expr::Divide(l, r)
            | Expr::Remainder(l, r) => l.has_aggregate() || r.has_aggregate(),
            Expr::Not(e) | Expr::Negate(e) => e.has_aggregate(),
        }
    }
}

impl fmt::Display for AggregateOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AggregateOp::Count => "COUNT",
            AggregateOp::Min => "MIN",
            AggregateOp::Max => "MAX",
            AggregateOp::Sum => "SUM",
            AggregateOp::Avg => "AVG",
        };
        write!(f, "{}", name)
    }
}

/// Renders the expression back as SQL-ish text; projections without an
/// alias use this as their output field name.
impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Literal(value) => write!(f, "{}", value),
            Expr::Path(path) => write!(f, "{}", path),
            Expr::PositionalParam(_) => write!(f, "?"),
            Expr::NamedParam(name) => write!(f, "${}", name),
            Expr::DocumentLiteral(fields) => {
                write!(f, "{{")?;
                for (i, (name, expr)) in fields.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", name, expr)?;
                }
                write!(f, "}}")
            }
            Expr::ArrayLiteral(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
            Expr::Equal(l, r) => write!(f, "{} = {}", l, r),
            Expr::NotEqual(l, r) => write!(f, "{} != {}", l, r),
            Expr::LessThan(l, r) => write!(f, "{} < {}", l, r),
            Expr::LessOrEqual(l, r) => write!(f, "{} <= {}", l, r),
            Expr::GreaterThan(l, r) => write!(f, "{} > {}", l, r),
            Expr::GreaterOrEqual(l, r) => write!(f, "{} >= {}", l, r),
            Expr::And(l, r) => write!(f, "{} AND {}", l, r),
            Expr::Or(l, r) => write!(f, "{} OR {}", l, r),
            Expr::Not(e) => write!(f, "NOT {}", e),
            Expr::Add(l, r) => write!(f, "{} + {}", l, r),
            Expr::Subtract(l, r) => write!(f, "{} - {}", l, r),
            Expr::Multiply(l, r) => write!(f, "{} * {}", l, r),
            Expr::Divide(l, r) => write!(f, "{} / {}", l, r),
            Expr::Remainder(l, r) => write!(f, "{} % {}", l, r),
            Expr::Negate(e) => write!(f, "-{}", e),
            Expr::Function(Function::Key) => write!(f, "key()"),
            Expr::Function(Function::Pk) => write!(f, "pk()"),
            Expr::Aggregate(op, None) => write!(f, "{}(*)", op),
            Expr::Aggregate(op, Some(expr)) => write!(f, "{}({})", op, expr),
        }
    }
}
