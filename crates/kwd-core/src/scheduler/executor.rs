//! Run account executions concurrently, each under a wall-clock budget.
//!
//! Keeps up to `max_parallel` executions in flight; when one finishes, the
//! next queued account is started. An execution that outlives its budget is
//! aborted at its next await point and reported as `TIMEOUT`; the execution
//! itself never sees the budget. Results come back in input order, only
//! after every execution reached a terminal status.

use async_trait::async_trait;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinSet;

use crate::fleet::UnitId;

/// Future returned by a unit function: the execution's string payload.
pub type UnitFuture = Pin<Box<dyn Future<Output = anyhow::Result<String>> + Send>>;

/// Function run once per account.
pub type UnitFn = Arc<dyn Fn(UnitId) -> UnitFuture + Send + Sync>;

/// Terminal status of one execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionStatus {
    Ok,
    Error,
    Timeout,
}

impl ExecutionStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ExecutionStatus::Ok => "OK",
            ExecutionStatus::Error => "ERROR",
            ExecutionStatus::Timeout => "TIMEOUT",
        }
    }
}

impl fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the executor reports for one account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionResult {
    pub unit_id: UnitId,
    pub status: ExecutionStatus,
    /// Set when `status` is `Error`.
    pub error: Option<String>,
    /// Set when `status` is `Ok`.
    pub return_value: Option<String>,
}

impl ExecutionResult {
    pub fn ok(unit_id: UnitId, value: String) -> Self {
        Self {
            unit_id,
            status: ExecutionStatus::Ok,
            error: None,
            return_value: Some(value),
        }
    }

    pub fn error(unit_id: UnitId, error: impl Into<String>) -> Self {
        Self {
            unit_id,
            status: ExecutionStatus::Error,
            error: Some(error.into()),
            return_value: None,
        }
    }

    pub fn timeout(unit_id: UnitId) -> Self {
        Self {
            unit_id,
            status: ExecutionStatus::Timeout,
            error: None,
            return_value: None,
        }
    }
}

/// Platform primitive that runs a bounded batch of executions in parallel.
#[async_trait]
pub trait ParallelExecutor: Send + Sync {
    /// Most executions one batch may contain.
    fn max_parallel(&self) -> usize;

    /// Run `unit_fn` once per account and return one result per account, in order.
    async fn execute(&self, units: Vec<UnitId>, unit_fn: UnitFn) -> Vec<ExecutionResult>;
}

/// In-process executor on the tokio runtime.
#[derive(Debug, Clone)]
pub struct TokioExecutor {
    max_parallel: usize,
    unit_budget: Duration,
}

impl TokioExecutor {
    pub fn new(max_parallel: usize, unit_budget: Duration) -> Self {
        Self {
            max_parallel: max_parallel.max(1),
            unit_budget,
        }
    }
}

async fn invoke(unit_id: UnitId, unit_fn: UnitFn, budget: Duration) -> ExecutionResult {
    let mut handle = tokio::spawn(unit_fn(unit_id.clone()));
    match tokio::time::timeout(budget, &mut handle).await {
        Ok(Ok(Ok(value))) => ExecutionResult::ok(unit_id, value),
        Ok(Ok(Err(e))) => ExecutionResult::error(unit_id, format!("{e:#}")),
        Ok(Err(join)) => ExecutionResult::error(unit_id, format!("execution failed: {join}")),
        Err(_) => {
            handle.abort();
            tracing::warn!(unit = %unit_id, ?budget, "execution hit its time budget");
            ExecutionResult::timeout(unit_id)
        }
    }
}

#[async_trait]
impl ParallelExecutor for TokioExecutor {
    fn max_parallel(&self) -> usize {
        self.max_parallel
    }

    async fn execute(&self, units: Vec<UnitId>, unit_fn: UnitFn) -> Vec<ExecutionResult> {
        let ids = units.clone();
        let mut slots: Vec<Option<ExecutionResult>> = vec![None; units.len()];
        let mut queue = units.into_iter().enumerate();
        let mut join_set = JoinSet::new();

        loop {
            while join_set.len() < self.max_parallel {
                let Some((idx, unit_id)) = queue.next() else {
                    break;
                };
                let unit_fn = Arc::clone(&unit_fn);
                let budget = self.unit_budget;
                join_set.spawn(async move { (idx, invoke(unit_id, unit_fn, budget).await) });
            }

            let Some(res) = join_set.join_next().await else {
                break;
            };
            match res {
                Ok((idx, result)) => slots[idx] = Some(result),
                Err(e) => tracing::error!("execution task join: {}", e),
            }
        }

        slots
            .into_iter()
            .zip(ids)
            .map(|(slot, unit_id)| {
                slot.unwrap_or_else(|| ExecutionResult::error(unit_id, "execution task lost"))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn ids(n: usize) -> Vec<UnitId> {
        (0..n).map(|i| UnitId::new(format!("u{i}"))).collect()
    }

    #[tokio::test]
    async fn reports_each_terminal_status_in_input_order() {
        let exec = TokioExecutor::new(4, Duration::from_millis(200));
        let unit_fn: UnitFn = Arc::new(|id: UnitId| -> UnitFuture {
            Box::pin(async move {
                match id.as_str() {
                    "ok" => Ok::<_, anyhow::Error>("1/0/1".to_string()),
                    "err" => anyhow::bail!("boom"),
                    "panic" => panic!("unit panicked"),
                    _ => {
                        tokio::time::sleep(Duration::from_secs(5)).await;
                        Ok("never".to_string())
                    }
                }
            })
        });
        let units: Vec<UnitId> = ["slow", "ok", "err", "panic"]
            .into_iter()
            .map(UnitId::from)
            .collect();

        let results = exec.execute(units, unit_fn).await;
        let statuses: Vec<_> = results.iter().map(|r| (r.unit_id.as_str(), r.status)).collect();
        assert_eq!(
            statuses,
            vec![
                ("slow", ExecutionStatus::Timeout),
                ("ok", ExecutionStatus::Ok),
                ("err", ExecutionStatus::Error),
                ("panic", ExecutionStatus::Error),
            ]
        );
        assert_eq!(results[1].return_value.as_deref(), Some("1/0/1"));
        assert_eq!(results[2].error.as_deref(), Some("boom"));
        assert!(results[0].return_value.is_none());
    }

    #[tokio::test]
    async fn never_runs_more_than_max_parallel_at_once() {
        let exec = TokioExecutor::new(3, Duration::from_secs(5));
        let in_flight = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        let (f, p) = (Arc::clone(&in_flight), Arc::clone(&peak));
        let unit_fn: UnitFn = Arc::new(move |_id: UnitId| -> UnitFuture {
            let (f, p) = (Arc::clone(&f), Arc::clone(&p));
            Box::pin(async move {
                let now = f.fetch_add(1, Ordering::SeqCst) + 1;
                p.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(10)).await;
                f.fetch_sub(1, Ordering::SeqCst);
                Ok::<_, anyhow::Error>("0/0/1".to_string())
            })
        });

        let results = exec.execute(ids(10), unit_fn).await;
        assert_eq!(results.len(), 10);
        assert!(results.iter().all(|r| r.status == ExecutionStatus::Ok));
        assert!(peak.load(Ordering::SeqCst) <= 3);
    }

    #[tokio::test]
    async fn timed_out_execution_is_stopped() {
        let exec = TokioExecutor::new(1, Duration::from_millis(20));
        let progressed = Arc::new(AtomicUsize::new(0));
        let p = Arc::clone(&progressed);
        let unit_fn: UnitFn = Arc::new(move |_id: UnitId| -> UnitFuture {
            let p = Arc::clone(&p);
            Box::pin(async move {
                tokio::time::sleep(Duration::from_millis(200)).await;
                p.fetch_add(1, Ordering::SeqCst);
                Ok::<_, anyhow::Error>(String::new())
            })
        });

        let results = exec.execute(ids(1), unit_fn).await;
        assert_eq!(results[0].status, ExecutionStatus::Timeout);
        tokio::time::sleep(Duration::from_millis(300)).await;
        assert_eq!(progressed.load(Ordering::SeqCst), 0);
    }
}
