//! Expression evaluation against the current record.

use super::Params;
use crate::error::{Error, Result};
use crate::parsing::ast::{Expr, Function};
use crate::storage::PrimaryKey;
use crate::types::{decode_value, Array, Document, FieldBuffer, Value};

/// Everything an expression can reach while evaluating: the current record
/// and its id, the table's primary key declaration, and bound parameters.
#[derive(Clone, Copy)]
pub struct EvalContext<'a> {
    pub record: Option<&'a Document>,
    pub record_id: Option<&'a [u8]>,
    pub primary_key: Option<&'a PrimaryKey>,
    pub params: &'a Params,
}

impl<'a> EvalContext<'a> {
    /// A context with no record, for expressions that must be constant
    /// (LIMIT/OFFSET operands, INSERT values).
    pub fn constant(params: &'a Params) -> EvalContext<'a> {
        EvalContext {
            record: None,
            record_id: None,
            primary_key: None,
            params,
        }
    }
}

impl Expr {
    pub fn eval(&self, ctx: &EvalContext<'_>) -> Result<Value> {
        match self {
            Expr::Literal(value) => Ok(value.clone()),

            // Missing paths evaluate to null, not an error, so comparisons
            // against absent fields are simply false.
            Expr::Path(path) => Ok(ctx
                .record
                .and_then(|doc| path.resolve_document(doc))
                .cloned()
                .unwrap_or(Value::Null)),

            Expr::PositionalParam(index) => ctx.params.positional(*index).cloned(),
            Expr::NamedParam(name) => ctx.params.named(name).cloned(),

            Expr::DocumentLiteral(fields) => {
                let mut buf = FieldBuffer::new();
                for (name, expr) in fields {
                    buf.add(name, expr.eval(ctx)?)?;
                }
                Ok(Value::Document(buf.into_document()))
            }
            Expr::ArrayLiteral(items) => {
                let mut array = Array::new();
                for item in items {
                    array.push(item.eval(ctx)?);
                }
                Ok(Value::Array(array))
            }

            Expr::Equal(lhs, rhs) => compare(ctx, lhs, rhs, Value::is_equal),
            Expr::NotEqual(lhs, rhs) => {
                let equal = lhs.eval(ctx)?.is_equal(&rhs.eval(ctx)?);
                Ok(Value::Bool(!equal))
            }
            Expr::LessThan(lhs, rhs) => compare(ctx, lhs, rhs, Value::is_less_than),
            Expr::LessOrEqual(lhs, rhs) => compare(ctx, lhs, rhs, Value::is_less_or_equal),
            Expr::GreaterThan(lhs, rhs) => compare(ctx, lhs, rhs, Value::is_greater_than),
            Expr::GreaterOrEqual(lhs, rhs) => compare(ctx, lhs, rhs, Value::is_greater_or_equal),

            // Boolean combinators short-circuit.
            Expr::And(lhs, rhs) => {
                if !lhs.eval(ctx)?.is_truthy() {
                    return Ok(Value::Bool(false));
                }
                Ok(Value::Bool(rhs.eval(ctx)?.is_truthy()))
            }
            Expr::Or(lhs, rhs) => {
                if lhs.eval(ctx)?.is_truthy() {
                    return Ok(Value::Bool(true));
                }
                Ok(Value::Bool(rhs.eval(ctx)?.is_truthy()))
            }
            Expr::Not(expr) => Ok(Value::Bool(!expr.eval(ctx)?.is_truthy())),

            Expr::Add(lhs, rhs) => arithmetic(ctx, lhs, rhs, ArithmeticOp::Add),
            Expr::Subtract(lhs, rhs) => arithmetic(ctx, lhs, rhs, ArithmeticOp::Subtract),
            Expr::Multiply(lhs, rhs) => arithmetic(ctx, lhs, rhs, ArithmeticOp::Multiply),
            Expr::Divide(lhs, rhs) => arithmetic(ctx, lhs, rhs, ArithmeticOp::Divide),
            Expr::Remainder(lhs, rhs) => arithmetic(ctx, lhs, rhs, ArithmeticOp::Remainder),
            Expr::Negate(expr) => match expr.eval(ctx)? {
                Value::Int64(i) => Ok(Value::Int64(i.wrapping_neg())),
                Value::Float64(f) => Ok(Value::Float64(-f)),
                Value::Null => Ok(Value::Null),
                value => Err(Error::type_mismatch("number", value.kind().to_string())),
            },

            Expr::Function(Function::Key) => match ctx.record_id {
                // With a declared primary key the record id is its encoded
                // value; give the value back. Generated ids (including the
                // fallback for records missing the key) stay opaque.
                Some(id) if ctx.primary_key.is_some() => {
                    Ok(decode_value(id).unwrap_or_else(|_| Value::Blob(id.to_vec())))
                }
                Some(id) => Ok(Value::Blob(id.to_vec())),
                None => Ok(Value::Null),
            },
            Expr::Function(Function::Pk) => match (ctx.primary_key, ctx.record) {
                (Some(pk), Some(record)) => Ok(pk
                    .path
                    .resolve_document(record)
                    .cloned()
                    .unwrap_or(Value::Null)),
                _ => Ok(Value::Null),
            },

            Expr::Aggregate(op, _) => Err(Error::Plan(format!(
                "{} can only appear in a projection",
                op
            ))),
        }
    }
}

fn compare(
    ctx: &EvalContext<'_>,
    lhs: &Expr,
    rhs: &Expr,
    op: impl Fn(&Value, &Value) -> bool,
) -> Result<Value> {
    Ok(Value::Bool(op(&lhs.eval(ctx)?, &rhs.eval(ctx)?)))
}

#[derive(Clone, Copy)]
enum ArithmeticOp {
    Add,
    Subtract,
    Multiply,
    Divide,
    Remainder,
}

/// Numeric arithmetic: integers stay integers, any float operand promotes
/// both sides, null operands propagate null.
fn arithmetic(ctx: &EvalContext<'_>, lhs: &Expr, rhs: &Expr, op: ArithmeticOp) -> Result<Value> {
    let (lhs, rhs) = (lhs.eval(ctx)?, rhs.eval(ctx)?);
    if lhs.is_null() || rhs.is_null() {
        return Ok(Value::Null);
    }
    match (&lhs, &rhs) {
        (Value::Int64(a), Value::Int64(b)) => {
            let result = match op {
                ArithmeticOp::Add => a.wrapping_add(*b),
                ArithmeticOp::Subtract => a.wrapping_sub(*b),
                ArithmeticOp::Multiply => a.wrapping_mul(*b),
                ArithmeticOp::Divide => {
                    if *b == 0 {
                        return Err(Error::type_mismatch("non-zero divisor", "0"));
                    }
                    a.wrapping_div(*b)
                }
                ArithmeticOp::Remainder => {
                    if *b == 0 {
                        return Err(Error::type_mismatch("non-zero divisor", "0"));
                    }
                    a.wrapping_rem(*b)
                }
            };
            Ok(Value::Int64(result))
        }
        _ if lhs.is_numeric() && rhs.is_numeric() => {
            let to_f64 = |v: &Value| match v {
                Value::Int64(i) => *i as f64,
                Value::Float64(f) => *f,
                _ => unreachable!("checked numeric"),
            };
            let (a, b) = (to_f64(&lhs), to_f64(&rhs));
            let result = match op {
                ArithmeticOp::Add => a + b,
                ArithmeticOp::Subtract => a - b,
                ArithmeticOp::Multiply => a * b,
                ArithmeticOp::Divide => a / b,
                ArithmeticOp::Remainder => a % b,
            };
            // NaN has no place in the value order; reject it at the only
            // point float arithmetic can produce it, as the encoder does.
            if result.is_nan() {
                return Err(Error::type_mismatch("orderable float64", "NaN"));
            }
            Ok(Value::Float64(result))
        }
        _ => Err(Error::type_mismatch(
            "numbers",
            format!("{} and {}", lhs.kind(), rhs.kind()),
        )),
    }
}
