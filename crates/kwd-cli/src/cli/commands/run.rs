//! `kwd run` – process one batch of unfinished accounts.

use anyhow::Result;
use kwd_core::report::Notifier;
use kwd_core::scheduler::{Dispatcher, RunOptions, RunSummary, TokioExecutor};
use std::sync::Arc;

use crate::cli::Workspace;

pub async fn run_sweep(ws: &Workspace, preview: bool, notifier: Arc<dyn Notifier>) -> Result<()> {
    let settings = Arc::new(ws.settings.clone());
    let executor = TokioExecutor::new(settings.max_parallel_units, settings.unit_time_budget);
    let dispatcher = Dispatcher::new(
        Arc::clone(&settings),
        Arc::new(ws.fleet.clone()),
        Arc::new(executor),
        notifier,
    );

    let summary = dispatcher.run(RunOptions { preview }).await?;
    if preview {
        tracing::info!("preview run: fleet snapshot left untouched");
    } else {
        ws.save()?;
    }

    match summary {
        RunSummary::FleetComplete { reset } => {
            println!("All accounts are processed.");
            if let Some(reset) = reset {
                println!(
                    "Cleared tags: {} account(s), {} campaign(s), {} definition(s).",
                    reset.units_released, reset.sub_units_released, reset.tags_deleted
                );
            }
        }
        RunSummary::Batch(report) => {
            for line in &report.lines {
                println!("{line}");
            }
            println!(
                "{} account(s) processed, {} done, {} keyword(s) deleted{}.",
                report.lines.len(),
                report.completed(),
                report.deleted(),
                if preview { " (preview)" } else { "" }
            );
        }
    }
    Ok(())
}
