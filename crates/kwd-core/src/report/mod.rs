//! Result aggregation and the per-run status report.
//!
//! Consumes the executor's ordered results once every execution has reached a
//! terminal status, marks finished accounts with the current writable tag
//! generation, and renders the single notification of the run.

mod notify;
mod status;

use std::fmt;

use tracing::{info, warn};

use crate::checkpoint::{CheckpointStore, TagGenerations};
use crate::config::NotificationConfig;
use crate::fleet::{TagService, UnitId};
use crate::processor::UnitOutcome;
use crate::scheduler::{ExecutionResult, ExecutionStatus};

pub use notify::{LogNotifier, Notification, Notifier, OutboxNotifier, RecordingNotifier};
pub use status::{fleet_status, FleetStatus, GenerationUsage};

const INTRO: &str = "Hello there,\n\nThe following accounts were processed by the script:\n\n";
const PREVIEW: &str = "The script is running in preview mode.\n\n";
const OUTRO: &str = "\n\nFor additional information, check the logs.";
const FLEET_DONE: &str = "Hello there,\n\nAll the accounts have been processed and all the \
                          necessary keywords have been deleted.\n\n\
                          For additional information, check the logs.";

/// What happened to one account in this run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnitVerdict {
    /// The execution failed; the account is picked up again next run.
    Failed { error: String },
    /// Timed out, returned an unreadable payload (`progress` is `None`), or
    /// reported work left.
    NeedsAnotherRun { progress: Option<UnitOutcome> },
    /// Drained and tagged under `generation`.
    Done { deleted: u64, generation: String },
    /// Drained, but the completion tag could not be written.
    TagFailed { deleted: u64, error: String },
}

impl UnitVerdict {
    pub fn is_done(&self) -> bool {
        matches!(self, UnitVerdict::Done { .. })
    }
}

impl fmt::Display for UnitVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnitVerdict::Failed { error } => write!(f, "Failed with error: {error}."),
            UnitVerdict::NeedsAnotherRun { progress: None } => f.write_str(
                "Account reached the execution time limit; Additional run(s) are required.",
            ),
            UnitVerdict::NeedsAnotherRun {
                progress: Some(outcome),
            } => write!(
                f,
                "Processed {} keywords, {} left; Additional run(s) are required",
                outcome.deleted, outcome.remaining
            ),
            UnitVerdict::Done { deleted, .. } => {
                write!(f, "Account done; Keywords deleted during this run: {deleted}")
            }
            UnitVerdict::TagFailed { deleted, error } => write!(
                f,
                "Account done; Keywords deleted during this run: {deleted}; \
                 Failed to mark the account as processed: {error}. It will be checked again."
            ),
        }
    }
}

/// One report line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportLine {
    pub unit_id: UnitId,
    pub verdict: UnitVerdict,
}

impl fmt::Display for ReportLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Customer ID: {}; {}", self.unit_id, self.verdict)
    }
}

/// Aggregated outcome of one batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchReport {
    pub preview: bool,
    pub lines: Vec<ReportLine>,
}

impl BatchReport {
    pub fn body(&self) -> String {
        let mut body = String::from(INTRO);
        if self.preview {
            body.push_str(PREVIEW);
        }
        for line in &self.lines {
            body.push_str(&format!("{line}\n"));
        }
        body.push_str(OUTRO);
        body
    }

    pub fn to_notification(&self, cfg: &NotificationConfig) -> Notification {
        notification(cfg, self.body())
    }

    /// Accounts tagged done in this batch.
    pub fn completed(&self) -> usize {
        self.lines.iter().filter(|l| l.verdict.is_done()).count()
    }

    /// Keywords removed by every execution that returned a readable payload.
    pub fn deleted(&self) -> u64 {
        self.lines
            .iter()
            .map(|l| match &l.verdict {
                UnitVerdict::Done { deleted, .. } | UnitVerdict::TagFailed { deleted, .. } => {
                    *deleted
                }
                UnitVerdict::NeedsAnotherRun {
                    progress: Some(outcome),
                } => outcome.deleted,
                _ => 0,
            })
            .sum()
    }
}

/// Notification sent when no unfinished account is left.
pub fn fleet_complete_notification(cfg: &NotificationConfig, preview: bool) -> Notification {
    let body = if preview {
        format!("{}{}", PREVIEW, FLEET_DONE)
    } else {
        FLEET_DONE.to_string()
    };
    notification(cfg, body)
}

/// Notification sent when a run stops before any account was dispatched.
pub fn run_failed_notification(
    cfg: &NotificationConfig,
    error: &str,
    preview: bool,
) -> Notification {
    let mut body = String::from("Hello there,\n\n");
    if preview {
        body.push_str(PREVIEW);
    }
    body.push_str(&format!(
        "The script could not process any account during this run: {error}.\n\n\
         For additional information, check the logs."
    ));
    notification(cfg, body)
}

fn notification(cfg: &NotificationConfig, body: String) -> Notification {
    Notification {
        to: cfg.to.clone(),
        cc: cfg.cc.clone(),
        subject: cfg.subject.clone(),
        body,
    }
}

/// Turn terminal results into report lines, tagging drained accounts.
///
/// Never fails: a tagging error is recorded on the affected account's line.
/// Generation member counts are read once and advanced locally so a batch
/// rolls over to the next generation exactly when one fills up.
pub async fn aggregate(
    tags: &dyn TagService,
    generations: &TagGenerations,
    results: Vec<ExecutionResult>,
    preview: bool,
) -> BatchReport {
    let store = CheckpointStore::new(tags);
    let mut counts = match store.member_counts(generations).await {
        Ok(counts) => Some(counts),
        Err(e) => {
            warn!(error = %e, "could not read tag generation sizes");
            None
        }
    };

    let mut lines = Vec::with_capacity(results.len());
    for result in results {
        let verdict = match result.status {
            ExecutionStatus::Error => UnitVerdict::Failed {
                error: result.error.unwrap_or_else(|| "unknown error".to_string()),
            },
            ExecutionStatus::Timeout => UnitVerdict::NeedsAnotherRun { progress: None },
            ExecutionStatus::Ok => {
                let payload = result.return_value.as_deref().unwrap_or_default();
                match payload.parse::<UnitOutcome>() {
                    Err(e) => {
                        warn!(
                            unit = %result.unit_id,
                            payload,
                            error = %e,
                            "unreadable execution payload"
                        );
                        UnitVerdict::NeedsAnotherRun { progress: None }
                    }
                    Ok(outcome) if !outcome.done => UnitVerdict::NeedsAnotherRun {
                        progress: Some(outcome),
                    },
                    Ok(outcome) => {
                        let counts = counts.as_mut();
                        mark_done(&store, generations, counts, &result.unit_id, outcome.deleted)
                            .await
                    }
                }
            }
        };
        info!(unit = %result.unit_id, status = %result.status, "{}", verdict);
        lines.push(ReportLine {
            unit_id: result.unit_id,
            verdict,
        });
    }

    BatchReport { preview, lines }
}

async fn mark_done(
    store: &CheckpointStore<'_>,
    generations: &TagGenerations,
    counts: Option<&mut Vec<usize>>,
    unit: &UnitId,
    deleted: u64,
) -> UnitVerdict {
    let Some(counts) = counts else {
        return UnitVerdict::TagFailed {
            deleted,
            error: "tag generation sizes unavailable".to_string(),
        };
    };
    let idx = match generations.current_writable(counts) {
        Ok(idx) => idx,
        Err(e) => {
            warn!(unit = %unit, error = %e, "no writable tag generation");
            return UnitVerdict::TagFailed {
                deleted,
                error: e.to_string(),
            };
        }
    };
    let generation = &generations.names()[idx];
    match store.attach(unit.as_str(), generation).await {
        Ok(already) => {
            if !already {
                counts[idx] += 1;
            }
            UnitVerdict::Done {
                deleted,
                generation: generation.clone(),
            }
        }
        Err(e) => {
            warn!(unit = %unit, generation = %generation, error = %e, "tagging account failed");
            UnitVerdict::TagFailed {
                deleted,
                error: e.to_string(),
            }
        }
    }
}
