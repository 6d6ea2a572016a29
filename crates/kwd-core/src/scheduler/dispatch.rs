//! Fleet dispatcher: one invocation selects a batch of unfinished accounts,
//! runs them in parallel, aggregates the results and sends one report.

use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::checkpoint::CheckpointStore;
use crate::config::SweepSettings;
use crate::fleet::{FleetClient, Selection, UnitId};
use crate::processor::process_unit;
use crate::query::{Condition, Query};
use crate::report::{
    aggregate, fleet_complete_notification, run_failed_notification, BatchReport, Notification,
    Notifier,
};

use super::executor::{ParallelExecutor, UnitFn, UnitFuture};
use super::reset::{reset_fleet, ResetSummary};

#[derive(Debug, Clone, Copy, Default)]
pub struct RunOptions {
    /// Mark the report as a preview; the caller does not persist the fleet.
    pub preview: bool,
}

/// Result of one dispatcher invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunSummary {
    /// No unfinished account was left. `reset` is set when the cleanup
    /// pass ran.
    FleetComplete { reset: Option<ResetSummary> },
    Batch(BatchReport),
}

pub struct Dispatcher {
    settings: Arc<SweepSettings>,
    fleet: Arc<dyn FleetClient>,
    executor: Arc<dyn ParallelExecutor>,
    notifier: Arc<dyn Notifier>,
}

impl Dispatcher {
    pub fn new(
        settings: Arc<SweepSettings>,
        fleet: Arc<dyn FleetClient>,
        executor: Arc<dyn ParallelExecutor>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            settings,
            fleet,
            executor,
            notifier,
        }
    }

    /// Most accounts one invocation dispatches.
    pub fn batch_limit(&self) -> usize {
        self.executor
            .max_parallel()
            .min(self.settings.max_parallel_units)
            .max(1)
    }

    pub async fn run(&self, options: RunOptions) -> Result<RunSummary> {
        let selection = match self.select_batch().await {
            Ok(selection) => selection,
            Err(e) => {
                let message = format!("{e:#}");
                error!(error = %message, "run aborted before dispatching accounts");
                let failed =
                    run_failed_notification(&self.settings.notification, &message, options.preview);
                self.notify(&failed).await;
                return Err(e);
            }
        };

        if selection.entries.is_empty() {
            return self.finish_fleet(options).await;
        }

        info!(
            batch = selection.entries.len(),
            unfinished = selection.total,
            preview = options.preview,
            "dispatching accounts"
        );
        let generations = &self.settings.generations;
        let results = self.executor.execute(selection.entries, self.unit_fn()).await;
        let report = aggregate(self.fleet.tags(), generations, results, options.preview).await;
        info!(
            completed = report.completed(),
            deleted = report.deleted(),
            "batch finished"
        );

        self.notify(&report.to_notification(&self.settings.notification))
            .await;
        Ok(RunSummary::Batch(report))
    }

    /// Make sure every generation tag exists, then pick the next batch.
    async fn select_batch(&self) -> Result<Selection<UnitId>> {
        let generations = &self.settings.generations;
        let store = CheckpointStore::new(self.fleet.tags());
        for name in generations.names() {
            let existed = store
                .ensure_exists(name)
                .await
                .with_context(|| format!("create account tag `{name}`"))?;
            if !existed {
                info!(generation = %name, "created account tag");
            }
        }

        let unfinished = Query::new().with(Condition::TaggedNone(generations.names().to_vec()));
        let selection = self
            .fleet
            .select_units(&unfinished, self.batch_limit())
            .await
            .context("select unfinished accounts")?;
        Ok(selection)
    }

    async fn finish_fleet(&self, options: RunOptions) -> Result<RunSummary> {
        info!("every account is processed");
        let notification = fleet_complete_notification(&self.settings.notification, options.preview);

        let reset = if self.settings.reset_on_completion {
            match reset_fleet(self.fleet.as_ref(), &self.settings.generations).await {
                Ok(summary) => Some(summary),
                Err(e) => {
                    self.notify(&notification).await;
                    return Err(anyhow::Error::new(e).context("fleet reset after completion"));
                }
            }
        } else {
            None
        };

        self.notify(&notification).await;
        Ok(RunSummary::FleetComplete { reset })
    }

    /// The per-account function handed to the executor. Returns the
    /// execution's outcome in its wire form.
    fn unit_fn(&self) -> UnitFn {
        let fleet = Arc::clone(&self.fleet);
        let settings = Arc::clone(&self.settings);
        Arc::new(move |unit_id: UnitId| -> UnitFuture {
            let fleet = Arc::clone(&fleet);
            let settings = Arc::clone(&settings);
            Box::pin(async move {
                let unit = fleet.open_unit(&unit_id).await?;
                let outcome = process_unit(unit.as_ref(), &settings).await?;
                Ok::<_, anyhow::Error>(outcome.to_string())
            })
        })
    }

    async fn notify(&self, notification: &Notification) {
        if let Err(e) = self.notifier.send(notification).await {
            warn!(error = %format!("{e:#}"), "sending status report failed");
        }
    }
}
