//! Per-account sweep.
//!
//! One execution counts the matching keywords of an account, walks every
//! campaign not yet tagged done, removes its matching keywords and tags the
//! campaign once its sweep is confirmed complete. When nothing is left the
//! campaign tags are cleared and the outcome reports the account as done.
//!
//! The execution may be stopped at any await point by the executor's time
//! budget. That is safe: removing a keyword twice is a no-op, and a campaign
//! is only tagged after all of its selected keywords were removed.

mod outcome;

use tracing::{debug, info};

use crate::checkpoint::CheckpointStore;
use crate::config::SweepSettings;
use crate::fleet::{BackendError, SubUnit, UnitClient};
use crate::query::{Condition, Query};

pub use outcome::{OutcomeParseError, UnitOutcome};

/// Run one sweep of `unit`. Any backend failure aborts the execution.
pub async fn process_unit(
    unit: &dyn UnitClient,
    settings: &SweepSettings,
) -> Result<UnitOutcome, BackendError> {
    let unit_id = unit.unit_id();
    let tag = settings.sub_unit_tag();
    let store = CheckpointStore::new(unit.tags());
    store.ensure_exists(tag).await?;

    let matching = Query::new()
        .for_date_range(settings.date_range)
        .with(Condition::SubUnitActive)
        .with(Condition::AdGroupActive)
        .with(Condition::Metric(settings.condition.clone()));
    let initial = unit.count_items(&matching).await?;
    info!(unit = %unit_id, keywords = initial, "keywords to delete");

    let pending = Query::new()
        .with(Condition::SubUnitActive)
        .with(Condition::TaggedNone(vec![tag.to_string()]));

    let mut deleted = 0u64;
    if initial > 0 {
        let sweep = Query::new()
            .for_date_range(settings.date_range)
            .with(Condition::Metric(settings.condition.clone()))
            .with(Condition::Metric(settings.quality_condition.clone()))
            .with(Condition::AdGroupActive);
        for sub in unit.select_sub_units(&pending).await?.entries {
            deleted += sweep_sub_unit(unit, &store, tag, &sub, &sweep).await?;
        }
    }

    let untagged = unit.select_sub_units(&pending).await?.total;
    let done = initial == 0 || untagged == 0 || deleted == initial;
    if done {
        let (released, _) = store.release_all(tag).await?;
        debug!(unit = %unit_id, campaigns = released, "cleared campaign tags");
        info!(unit = %unit_id, deleted, "account is done");
    }

    Ok(UnitOutcome {
        deleted,
        remaining: initial.saturating_sub(deleted),
        done,
    })
}

/// Remove the matching keywords of one campaign; tag it if all were removed.
async fn sweep_sub_unit(
    unit: &dyn UnitClient,
    store: &CheckpointStore<'_>,
    tag: &str,
    sub: &SubUnit,
    query: &Query,
) -> Result<u64, BackendError> {
    let selection = unit.select_items(&sub.id, query).await?;
    debug!(
        unit = %unit.unit_id(),
        campaign = %sub.name,
        keywords = selection.total,
        "sweeping campaign"
    );

    let mut removed = 0u64;
    for item in &selection.entries {
        unit.remove_item(&item.id).await?;
        removed += 1;
    }

    if removed == selection.total {
        store.attach(sub.id.as_str(), tag).await?;
        info!(unit = %unit.unit_id(), campaign = %sub.name, removed, "campaign finished");
    } else {
        info!(
            unit = %unit.unit_id(),
            campaign = %sub.name,
            left = selection.total.saturating_sub(removed),
            "campaign not finished"
        );
    }
    Ok(removed)
}

#[cfg(test)]
mod tests;
