//! Aggregate accumulators, one per aggregate projection per group.

use crate::error::{Error, Result};
use crate::parsing::ast::AggregateOp;
use crate::types::Value;

/// Streaming accumulator for one aggregate function. `COUNT(*)` counts
/// rows; the other forms skip null arguments, and `SUM`/`AVG` reject
/// non-numeric ones.
#[derive(Debug)]
pub struct Accumulator {
    op: AggregateOp,
    counts_rows: bool,
    count: i64,
    int_sum: i64,
    float_sum: f64,
    saw_float: bool,
    extreme: Option<Value>,
}

impl Accumulator {
    pub fn new(op: AggregateOp, counts_rows: bool) -> Accumulator {
        Accumulator {
            op,
            counts_rows,
            count: 0,
            int_sum: 0,
            float_sum: 0.0,
            saw_float: false,
            extreme: None,
        }
    }

    pub fn update(&mut self, value: &Value) -> Result<()> {
        if value.is_null() && !self.counts_rows {
            return Ok(());
        }
        self.count += 1;
        match self.op {
            AggregateOp::Count => {}
            AggregateOp::Sum | AggregateOp::Avg => match value {
                Value::Int64(i) => self.int_sum = self.int_sum.wrapping_add(*i),
                Value::Float64(f) => {
                    self.saw_float = true;
                    self.float_sum += f;
                }
                value => {
                    return Err(Error::type_mismatch(
                        format!("number in {}", self.op),
                        value.kind().to_string(),
                    ))
                }
            },
            AggregateOp::Min => {
                let smaller = match &self.extreme {
                    Some(extreme) => value.cmp_total(extreme).is_lt(),
                    None => true,
                };
                if smaller {
                    self.extreme = Some(value.clone());
                }
            }
            AggregateOp::Max => {
                let larger = match &self.extreme {
                    Some(extreme) => value.cmp_total(extreme).is_gt(),
                    None => true,
                };
                if larger {
                    self.extreme = Some(value.clone());
                }
            }
        }
        Ok(())
    }

    pub fn finish(self) -> Value {
        match self.op {
            AggregateOp::Count => Value::Int64(self.count),
            AggregateOp::Sum if self.count == 0 => Value::Null,
            AggregateOp::Sum if self.saw_float => {
                Value::Float64(self.float_sum + self.int_sum as f64)
            }
            AggregateOp::Sum => Value::Int64(self.int_sum),
            AggregateOp::Avg if self.count == 0 => Value::Null,
            AggregateOp::Avg => {
                let total = self.float_sum + self.int_sum as f64;
                Value::Float64(total / self.count as f64)
            }
            AggregateOp::Min | AggregateOp::Max => self.extreme.unwrap_or(Value::Null),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(op: AggregateOp, counts_rows: bool, values: &[Value]) -> Value {
        let mut acc = Accumulator::new(op, counts_rows);
        for value in values {
            acc.update(value).unwrap();
        }
        acc.finish()
    }

    #[test]
    fn count_star_counts_rows_count_expr_skips_nulls() {
        let values = [Value::Int64(1), Value::Null, Value::Int64(3)];
        assert_eq!(run(AggregateOp::Count, true, &values), Value::Int64(3));
        assert_eq!(run(AggregateOp::Count, false, &values), Value::Int64(2));
    }

    #[test]
    fn sum_and_avg() {
        let values = [Value::Int64(1), Value::Int64(2), Value::Null];
        assert_eq!(run(AggregateOp::Sum, false, &values), Value::Int64(3));
        assert_eq!(run(AggregateOp::Avg, false, &values), Value::Float64(1.5));

        let mixed = [Value::Int64(1), Value::Float64(0.5)];
        assert_eq!(run(AggregateOp::Sum, false, &mixed), Value::Float64(1.5));

        assert_eq!(run(AggregateOp::Sum, false, &[]), Value::Null);

        let mut acc = Accumulator::new(AggregateOp::Sum, false);
        assert!(acc.update(&Value::Text("x".into())).is_err());
    }

    #[test]
    fn min_and_max() {
        let values = [Value::Int64(3), Value::Int64(1), Value::Float64(2.5)];
        assert_eq!(run(AggregateOp::Min, false, &values), Value::Int64(1));
        assert_eq!(run(AggregateOp::Max, false, &values), Value::Int64(3));
        assert_eq!(run(AggregateOp::Min, false, &[]), Value::Null);
    }
}
