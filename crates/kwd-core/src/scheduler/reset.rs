//! Terminal cleanup: remove every completion tag the sweep ever wrote.

use tracing::info;

use crate::checkpoint::{CheckpointStore, TagGenerations};
use crate::fleet::{BackendError, FleetClient};
use crate::query::Query;

/// What one cleanup pass removed. All zero when there was nothing left.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResetSummary {
    pub units_released: usize,
    pub sub_units_released: usize,
    pub tags_deleted: usize,
}

/// Release every generation from accounts and campaigns and delete the
/// tag definitions at both levels.
pub async fn reset_fleet(
    fleet: &dyn FleetClient,
    generations: &TagGenerations,
) -> Result<ResetSummary, BackendError> {
    let mut summary = ResetSummary::default();

    let fleet_store = CheckpointStore::new(fleet.tags());
    for name in generations.names() {
        let (released, deleted) = fleet_store.release_all(name).await?;
        summary.units_released += released;
        summary.tags_deleted += usize::from(deleted);
    }

    let units = fleet.select_units(&Query::new(), usize::MAX).await?;
    for unit_id in units.entries {
        let unit = fleet.open_unit(&unit_id).await?;
        let store = CheckpointStore::new(unit.tags());
        for name in generations.names() {
            let (released, deleted) = store.release_all(name).await?;
            summary.sub_units_released += released;
            summary.tags_deleted += usize::from(deleted);
            if released > 0 || deleted {
                info!(
                    unit = %unit_id,
                    generation = %name,
                    campaigns = released,
                    "cleared campaign tags"
                );
            }
        }
    }

    info!(
        units = summary.units_released,
        campaigns = summary.sub_units_released,
        tags = summary.tags_deleted,
        "fleet reset finished"
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fleet::memory::{FleetSnapshot, KeywordRecord, MemoryFleet};
    use crate::fleet::UnitId;

    fn gens() -> TagGenerations {
        TagGenerations::new(vec!["gen1".to_string(), "gen2".to_string()], 10).unwrap()
    }

    async fn tagged_fleet() -> MemoryFleet {
        let mut snap = FleetSnapshot::default();
        for id in ["a", "b", "c"] {
            snap.unit(id)
                .sub_unit("s1", "Search")
                .keyword("ag", "k1", KeywordRecord::new("kw", &[("Clicks", 3.0)]));
        }
        let fleet = MemoryFleet::new(snap);
        let store = CheckpointStore::new(fleet.tags());
        for name in gens().names() {
            store.ensure_exists(name).await.unwrap();
        }
        store.attach("a", "gen1").await.unwrap();
        store.attach("b", "gen2").await.unwrap();

        let unit = fleet.open_unit(&UnitId::from("c")).await.unwrap();
        let unit_store = CheckpointStore::new(unit.tags());
        unit_store.ensure_exists("gen1").await.unwrap();
        unit_store.attach("s1", "gen1").await.unwrap();
        fleet
    }

    #[tokio::test]
    async fn clears_both_levels() {
        let fleet = tagged_fleet().await;
        let summary = reset_fleet(&fleet, &gens()).await.unwrap();
        assert_eq!(
            summary,
            ResetSummary {
                units_released: 2,
                sub_units_released: 1,
                tags_deleted: 3,
            }
        );
        let snap = fleet.snapshot();
        assert!(snap.tags.is_empty());
        for unit in snap.units.values() {
            assert!(unit.tags.is_empty());
            assert!(unit.sub_unit_tags.is_empty());
            assert!(unit.sub_units.values().all(|s| s.tags.is_empty()));
        }
    }

    #[tokio::test]
    async fn second_pass_is_a_no_op() {
        let fleet = tagged_fleet().await;
        reset_fleet(&fleet, &gens()).await.unwrap();
        let again = reset_fleet(&fleet, &gens()).await.unwrap();
        assert_eq!(again, ResetSummary::default());
    }
}
