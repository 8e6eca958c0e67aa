//! Query planning: the logical plan tree, SELECT planning, and the
//! index-scan optimization.

mod optimizer;
mod plan;
mod planner;

pub use optimizer::optimize;
pub use plan::{IndexRange, Node};
pub use planner::plan_select;
