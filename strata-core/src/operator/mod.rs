mod accessor;
mod batch;
mod handler;
mod query;
mod update;

pub use accessor::*;
pub use batch::*;
pub use handler::*;
pub use query::*;
pub use update::*;

use crate::{ConnectionHolder, OperationKind, Params, display_list, truncate_long};
use std::time::{Duration, Instant};

/// Stage of an operator that can still bind parameters and run.
#[derive(Debug)]
pub struct Built;

/// Stage of an operator that ran, it only exposes its results.
#[derive(Debug)]
pub struct Executed;

pub trait Stage: Send + Sync + 'static {
    const EXECUTED: bool;
}

impl Stage for Built {
    const EXECUTED: bool = false;
}

impl Stage for Executed {
    const EXECUTED: bool = true;
}

/// Type erased view of a statement, handed to event listeners.
pub trait Operator {
    fn sql(&self) -> &str;

    fn params(&self) -> &Params;

    fn kind(&self) -> OperationKind;

    /// Effect of each executed statement: the number of rows returned by a
    /// query, the affected rows otherwise. Empty before execution.
    fn effect_counts(&self) -> &[u64];

    /// Time spent running the statement.
    fn expend_time(&self) -> Duration;

    fn is_executed(&self) -> bool;
}

#[derive(Default, Clone, Debug)]
pub(crate) struct Statement {
    pub(crate) sql: String,
    pub(crate) params: Params,
    pub(crate) effect_counts: Vec<u64>,
    pub(crate) expend_time: Duration,
}

impl Statement {
    pub(crate) fn new(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            ..Default::default()
        }
    }

    /// Run `f` measuring its duration, logs the statement when the data
    /// source asks for it.
    pub(crate) fn timed<T>(
        &mut self,
        holder: &ConnectionHolder,
        f: impl FnOnce(&Self) -> crate::Result<(T, Vec<u64>)>,
    ) -> crate::Result<T> {
        let start = Instant::now();
        let result = f(self);
        self.expend_time = start.elapsed();
        let (value, counts) = result?;
        self.effect_counts = counts;
        if holder.config().show_sql {
            log::info!(
                "[sql] {} [params] {} [count] {} [time] {} ms",
                truncate_long!(self.sql),
                self.params,
                display_list(&self.effect_counts),
                self.expend_time.as_millis()
            );
        }
        Ok(value)
    }
}
