//! Tests for the per-account sweep, driven against the in-memory fleet.

use super::*;
use crate::config::SweepConfig;
use crate::fleet::memory::{FleetSnapshot, KeywordRecord, MemoryFleet};
use crate::fleet::{EntityStatus, FleetClient, SubUnitId, UnitId};

const TAG: &str = "__PROCESSED__";

fn settings() -> SweepSettings {
    SweepConfig::default().validate().unwrap()
}

fn dead(text: &str) -> KeywordRecord {
    KeywordRecord::new(text, &[("Clicks", 0.0), ("QualityScore", 3.0)])
}

fn alive(text: &str) -> KeywordRecord {
    KeywordRecord::new(text, &[("Clicks", 12.0), ("QualityScore", 3.0)])
}

/// Account U: campaign S1 with two dead keywords, S2 with one.
fn unit_u() -> FleetSnapshot {
    let mut snap = FleetSnapshot::default();
    let u = snap.unit("U");
    u.sub_unit("S1", "Search")
        .keyword("ag1", "k1", dead("red shoes"))
        .keyword("ag1", "k2", dead("blue shoes"))
        .keyword("ag1", "k9", alive("shoes"));
    u.sub_unit("S2", "Display").keyword("ag1", "k3", dead("green shoes"));
    snap
}

async fn run(fleet: &MemoryFleet, id: &str) -> Result<UnitOutcome, BackendError> {
    let unit = fleet.open_unit(&UnitId::from(id)).await?;
    process_unit(unit.as_ref(), &settings()).await
}

fn sub_unit_tags(fleet: &MemoryFleet, unit: &str, sub: &str) -> Vec<String> {
    let snap = fleet.snapshot();
    let record = &snap.units[&UnitId::from(unit)];
    record.sub_units[&SubUnitId::from(sub)].tags.iter().cloned().collect()
}

#[tokio::test]
async fn truncated_run_tags_finished_campaign_and_resumes() {
    let fleet = MemoryFleet::new(unit_u());
    fleet.set_removal_quota(Some(2));

    let first = run(&fleet, "U").await.unwrap();
    assert_eq!(
        first,
        UnitOutcome {
            deleted: 2,
            remaining: 1,
            done: false
        }
    );
    assert_eq!(sub_unit_tags(&fleet, "U", "S1"), vec![TAG]);
    assert!(sub_unit_tags(&fleet, "U", "S2").is_empty());

    let second = run(&fleet, "U").await.unwrap();
    assert_eq!(
        second,
        UnitOutcome {
            deleted: 1,
            remaining: 0,
            done: true
        }
    );
    // Campaign tags and their definition are gone once the account is done.
    assert!(sub_unit_tags(&fleet, "U", "S1").is_empty());
    assert!(fleet.snapshot().units[&UnitId::from("U")]
        .sub_unit_tags
        .is_empty());
    assert_eq!(fleet.keyword_count(&UnitId::from("U")), Some(1));
}

#[tokio::test]
async fn account_without_matches_is_done_immediately() {
    let mut snap = FleetSnapshot::default();
    snap.unit("V")
        .sub_unit("C1", "Brand")
        .keyword("ag1", "k1", alive("brand"));
    let fleet = MemoryFleet::new(snap);

    let outcome = run(&fleet, "V").await.unwrap();
    assert_eq!(
        outcome,
        UnitOutcome {
            deleted: 0,
            remaining: 0,
            done: true
        }
    );
    assert_eq!(fleet.keyword_count(&UnitId::from("V")), Some(1));
}

#[tokio::test]
async fn tagged_campaigns_are_not_rescanned() {
    let fleet = MemoryFleet::new(unit_u());
    fleet.set_removal_quota(Some(2));
    run(&fleet, "U").await.unwrap();

    // Only the unfinished campaign is offered to the next sweep.
    let unit = fleet.open_unit(&UnitId::from("U")).await.unwrap();
    let pending = Query::new()
        .with(Condition::SubUnitActive)
        .with(Condition::TaggedNone(vec![TAG.to_string()]));
    let ids: Vec<String> = unit
        .select_sub_units(&pending)
        .await
        .unwrap()
        .entries
        .into_iter()
        .map(|s| s.id.to_string())
        .collect();
    assert_eq!(ids, vec!["S2"]);
}

#[tokio::test]
async fn removed_campaigns_and_ad_groups_are_ignored() {
    let mut snap = FleetSnapshot::default();
    let u = snap.unit("R");
    let old = u.sub_unit("C1", "Old");
    old.status = EntityStatus::Removed;
    old.keyword("ag1", "k1", dead("old"));
    let live = u.sub_unit("C2", "Live");
    live.keyword("ag-removed", "k2", dead("gone"));
    live.ad_group("ag-removed").status = EntityStatus::Removed;
    let fleet = MemoryFleet::new(snap);

    let outcome = run(&fleet, "R").await.unwrap();
    assert_eq!(outcome.deleted, 0);
    assert!(outcome.done);
    assert_eq!(fleet.keyword_count(&UnitId::from("R")), Some(2));
}

#[tokio::test]
async fn high_quality_keywords_are_kept_without_blocking_completion() {
    let mut snap = FleetSnapshot::default();
    snap.unit("Q").sub_unit("C1", "Brand").keyword(
        "ag1",
        "k1",
        KeywordRecord::new("premium", &[("Clicks", 0.0), ("QualityScore", 9.0)]),
    );
    let fleet = MemoryFleet::new(snap);

    let outcome = run(&fleet, "Q").await.unwrap();
    assert_eq!(
        outcome,
        UnitOutcome {
            deleted: 0,
            remaining: 1,
            done: true
        }
    );
    assert_eq!(fleet.keyword_count(&UnitId::from("Q")), Some(1));
}

#[tokio::test]
async fn backend_failure_aborts_without_tagging() {
    let fleet = MemoryFleet::new(unit_u());
    fleet.fail_removals_for(&UnitId::from("U"));

    assert!(matches!(run(&fleet, "U").await, Err(BackendError::Remote(_))));
    assert!(sub_unit_tags(&fleet, "U", "S1").is_empty());
    assert!(sub_unit_tags(&fleet, "U", "S2").is_empty());
}

#[tokio::test]
async fn remaining_never_grows_and_reaches_zero() {
    let mut snap = FleetSnapshot::default();
    let u = snap.unit("M");
    for c in 0..3 {
        let sub = u.sub_unit(format!("C{c}").as_str(), "Campaign");
        for k in 0..3 {
            sub.keyword("ag1", format!("k{c}{k}").as_str(), dead("kw"));
        }
    }
    let fleet = MemoryFleet::new(snap);
    fleet.set_removal_quota(Some(2));

    let mut last_remaining = u64::MAX;
    let mut runs = 0;
    loop {
        let outcome = run(&fleet, "M").await.unwrap();
        runs += 1;
        assert!(outcome.remaining <= last_remaining);
        last_remaining = outcome.remaining;
        if outcome.done {
            break;
        }
        assert!(runs < 20, "sweep did not converge");
    }
    assert_eq!(last_remaining, 0);
    assert_eq!(fleet.keyword_count(&UnitId::from("M")), Some(0));
}
