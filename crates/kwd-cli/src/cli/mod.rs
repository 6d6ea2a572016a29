//! CLI for the kwd fleet keyword sweeper.

mod commands;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use kwd_core::config::{self, SweepSettings};
use kwd_core::fleet::memory::MemoryFleet;
use kwd_core::report::{LogNotifier, Notifier, OutboxNotifier};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use commands::{run_reset, run_status, run_sweep};

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "kwd")]
#[command(
    about = "kwd: resumable keyword deletion across a fleet of ad accounts",
    long_about = None
)]
pub struct Cli {
    /// Config file to use instead of ~/.config/kwd/config.toml.
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Fleet snapshot to use instead of ~/.local/state/kwd/fleet.json.
    #[arg(long, global = true, value_name = "PATH")]
    pub fleet: Option<PathBuf>,

    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Process the next batch of unfinished accounts and send one status report.
    Run {
        /// Run against the fleet without saving any change.
        #[arg(long)]
        preview: bool,
        /// Directory the status report is written to (default ~/.local/state/kwd/outbox).
        #[arg(long, value_name = "DIR", conflicts_with = "log_only")]
        outbox: Option<PathBuf>,
        /// Log the status report instead of writing it to the outbox.
        #[arg(long)]
        log_only: bool,
    },

    /// Remove every completion tag from accounts and campaigns.
    Reset,

    /// Show tag generation usage and how many accounts are left.
    Status,
}

/// Validated config plus the fleet it applies to.
pub struct Workspace {
    pub settings: SweepSettings,
    pub fleet: MemoryFleet,
    pub fleet_path: PathBuf,
}

impl Workspace {
    fn load(config_path: Option<&Path>, fleet_path: Option<PathBuf>) -> Result<Self> {
        let cfg = match config_path {
            Some(path) => config::load_from_path(path)?,
            None => config::load_or_init()?,
        };
        tracing::debug!("loaded config: {:?}", cfg);
        let settings = cfg.validate()?;

        let fleet_path = match fleet_path {
            Some(path) => path,
            None => MemoryFleet::default_path()?,
        };
        let fleet = MemoryFleet::load_from_path(&fleet_path, settings.generations.capacity())?
            .with_context(|| format!("no fleet snapshot at {}", fleet_path.display()))?;
        Ok(Self {
            settings,
            fleet,
            fleet_path,
        })
    }

    fn save(&self) -> Result<()> {
        self.fleet.save_to_path(&self.fleet_path)?;
        tracing::debug!(path = %self.fleet_path.display(), "saved fleet snapshot");
        Ok(())
    }
}

fn report_sink(outbox: Option<PathBuf>, log_only: bool) -> Result<Arc<dyn Notifier>> {
    if log_only {
        return Ok(Arc::new(LogNotifier));
    }
    let dir = match outbox {
        Some(dir) => dir,
        None => OutboxNotifier::default_dir()?,
    };
    Ok(Arc::new(OutboxNotifier::new(dir)))
}

impl Cli {
    pub async fn run_from_args() -> Result<()> {
        let cli = Cli::parse();
        let ws = Workspace::load(cli.config.as_deref(), cli.fleet)?;

        match cli.command {
            CliCommand::Run {
                preview,
                outbox,
                log_only,
            } => {
                let notifier = report_sink(outbox, log_only)?;
                run_sweep(&ws, preview, notifier).await?;
            }
            CliCommand::Reset => run_reset(&ws).await?,
            CliCommand::Status => run_status(&ws).await?,
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests;
