//! `kwd status` – tag generation usage and remaining accounts.

use anyhow::Result;
use kwd_core::report::fleet_status;

use crate::cli::Workspace;

pub async fn run_status(ws: &Workspace) -> Result<()> {
    let status = fleet_status(&ws.fleet, &ws.settings.generations).await?;

    println!("{:<24} {:>8} {:>8}", "GENERATION", "MEMBERS", "CAPACITY");
    for g in &status.generations {
        let marker = if g.is_full() { "  (full)" } else { "" };
        println!("{:<24} {:>8} {:>8}{}", g.name, g.members, g.capacity, marker);
    }
    println!(
        "accounts: {} total, {} done, {} left",
        status.total_units,
        status.finished_units(),
        status.unfinished_units
    );
    match &status.writable {
        Ok(name) => println!("next completions go to: {name}"),
        Err(e) => println!("warning: {e}"),
    }
    Ok(())
}
