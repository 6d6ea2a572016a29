//! Fleet scheduling: batch dispatch, the parallel executor, and the
//! terminal cleanup pass.

mod dispatch;
mod executor;
mod reset;

pub use dispatch::{Dispatcher, RunOptions, RunSummary};
pub use executor::{
    ExecutionResult, ExecutionStatus, ParallelExecutor, TokioExecutor, UnitFn, UnitFuture,
};
pub use reset::{reset_fleet, ResetSummary};
