//! Fleet progress summary for `kwd status`.

use crate::checkpoint::{CheckpointStore, GenerationError, TagGenerations};
use crate::fleet::{BackendError, FleetClient};
use crate::query::{Condition, Query};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationUsage {
    pub name: String,
    pub members: usize,
    pub capacity: usize,
}

impl GenerationUsage {
    pub fn is_full(&self) -> bool {
        self.members >= self.capacity
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FleetStatus {
    pub generations: Vec<GenerationUsage>,
    pub total_units: u64,
    pub unfinished_units: u64,
    /// Generation the next completion goes to; `Err` when all are full.
    pub writable: Result<String, GenerationError>,
}

impl FleetStatus {
    pub fn finished_units(&self) -> u64 {
        self.total_units.saturating_sub(self.unfinished_units)
    }
}

/// Read-only view of how far the fleet has progressed.
pub async fn fleet_status(
    fleet: &dyn FleetClient,
    generations: &TagGenerations,
) -> Result<FleetStatus, BackendError> {
    let store = CheckpointStore::new(fleet.tags());
    let counts = store.member_counts(generations).await?;
    let usage = generations
        .names()
        .iter()
        .zip(&counts)
        .map(|(name, &members)| GenerationUsage {
            name: name.clone(),
            members,
            capacity: generations.capacity(),
        })
        .collect();
    let writable = generations
        .current_writable(&counts)
        .map(|idx| generations.names()[idx].clone());

    let total_units = fleet.select_units(&Query::new(), 0).await?.total;
    let unfinished = Query::new().with(Condition::TaggedNone(generations.names().to_vec()));
    let unfinished_units = fleet.select_units(&unfinished, 0).await?.total;

    Ok(FleetStatus {
        generations: usage,
        total_units,
        unfinished_units,
        writable,
    })
}
