//! Shared fixtures for the integration tests: a small fleet builder and a
//! dispatcher wired to the in-memory backend.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use kwd_core::config::SweepConfig;
use kwd_core::fleet::UnitId;
use kwd_core::fleet::memory::{FleetSnapshot, KeywordRecord, MemoryFleet};
use kwd_core::report::RecordingNotifier;
use kwd_core::scheduler::{Dispatcher, RunOptions, RunSummary, TokioExecutor};

/// Zero clicks and a poor quality score: removed by the default sweep.
pub fn dead(text: &str) -> KeywordRecord {
    KeywordRecord::new(text, &[("Clicks", 0.0), ("QualityScore", 4.0)])
}

/// Has clicks: never removed.
pub fn alive(text: &str) -> KeywordRecord {
    KeywordRecord::new(text, &[("Clicks", 25.0), ("QualityScore", 4.0)])
}

/// Account U: campaign S1 with two dead keywords, S2 with one.
pub fn add_unit_u(snap: &mut FleetSnapshot, id: &str) {
    let unit = snap.unit(id);
    unit.sub_unit("S1", "Search")
        .keyword("ag1", "k1", dead("cheap flights"))
        .keyword("ag1", "k2", dead("flight deals"));
    unit.sub_unit("S2", "Display")
        .keyword("ag1", "k3", dead("last minute flights"));
}

/// Accounts without any matching keyword.
pub fn idle_units(snap: &mut FleetSnapshot, ids: impl IntoIterator<Item = String>) {
    for id in ids {
        snap.unit(id.as_str())
            .sub_unit("C1", "Brand")
            .keyword("ag1", "k1", alive("brand"));
    }
}

pub struct Harness {
    pub fleet: MemoryFleet,
    pub notifier: Arc<RecordingNotifier>,
    pub dispatcher: Dispatcher,
}

impl Harness {
    pub fn new(snapshot: FleetSnapshot, cfg: SweepConfig) -> Self {
        let budget = Duration::from_secs(cfg.unit_time_budget_secs);
        Self::with_budget(snapshot, cfg, budget)
    }

    pub fn with_budget(snapshot: FleetSnapshot, cfg: SweepConfig, budget: Duration) -> Self {
        let settings = Arc::new(cfg.validate().expect("valid config"));
        let fleet = MemoryFleet::with_tag_capacity(snapshot, settings.generations.capacity());
        let notifier = Arc::new(RecordingNotifier::new());
        let dispatcher = Dispatcher::new(
            Arc::clone(&settings),
            Arc::new(fleet.clone()),
            Arc::new(TokioExecutor::new(settings.max_parallel_units, budget)),
            notifier.clone(),
        );
        Self {
            fleet,
            notifier,
            dispatcher,
        }
    }

    pub async fn run(&self) -> RunSummary {
        self.dispatcher
            .run(RunOptions::default())
            .await
            .expect("dispatcher run")
    }

    /// Fleet-level tags carried by `unit`.
    pub fn unit_tags(&self, unit: &str) -> Vec<String> {
        let snap = self.fleet.snapshot();
        snap.units[&UnitId::from(unit)].tags.iter().cloned().collect()
    }
}
