//! `kwd reset` – clear every completion tag so the fleet starts over.

use anyhow::{Context, Result};
use kwd_core::scheduler::reset_fleet;

use crate::cli::Workspace;

pub async fn run_reset(ws: &Workspace) -> Result<()> {
    let summary = reset_fleet(&ws.fleet, &ws.settings.generations)
        .await
        .context("fleet reset")?;
    ws.save()?;
    println!(
        "Released {} account(s) and {} campaign(s); deleted {} tag definition(s).",
        summary.units_released, summary.sub_units_released, summary.tags_deleted
    );
    Ok(())
}
