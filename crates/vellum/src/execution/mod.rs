//! Streaming execution: expression evaluation, the pull-based node
//! executor, aggregation, and statement execution.

mod aggregate;
mod executor;
mod expression;
mod statements;

pub use executor::{iterate, ExecContext, Item};
pub use expression::EvalContext;
pub use statements::{execute, execute_query, Output};

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::types::Value;

/// Values bound to the statement's `?` and `$name` placeholders.
#[derive(Debug, Clone, Default)]
pub struct Params {
    positional: Vec<Value>,
    named: HashMap<String, Value>,
}

impl Params {
    pub fn new() -> Params {
        Params::default()
    }

    /// Appends the next positional value.
    pub fn bind(mut self, value: impl Into<Value>) -> Params {
        self.positional.push(value.into());
        self
    }

    pub fn bind_named(mut self, name: impl Into<String>, value: impl Into<Value>) -> Params {
        self.named.insert(name.into(), value.into());
        self
    }

    pub(crate) fn positional(&self, index: usize) -> Result<&Value> {
        self.positional
            .get(index)
            .ok_or_else(|| Error::NotFound(format!("value for parameter ?{}", index + 1)))
    }

    pub(crate) fn named(&self, name: &str) -> Result<&Value> {
        self.named
            .get(name)
            .ok_or_else(|| Error::NotFound(format!("value for parameter ${}", name)))
    }
}

/// Cancellation token threaded through statement execution. The executor
/// checks it between stream callbacks; a cancelled statement terminates
/// with `Error::Cancelled`.
#[derive(Debug, Clone, Default)]
pub struct Cancellation(Arc<AtomicBool>);

impl Cancellation {
    pub fn new() -> Cancellation {
        Cancellation::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }

    pub(crate) fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            return Err(Error::Cancelled);
        }
        Ok(())
    }
}
