//! In-process fleet backend.
//!
//! Holds a whole manager account (accounts, campaigns, ad groups, keywords and
//! labels) in memory. The CLI loads it from a JSON snapshot and writes it back
//! after a run; tests build it directly.
//!
//! Keyword metrics are stored already aggregated over the configured window,
//! so the date range of a query is accepted but not re-applied here.
//!
//! A few knobs model what the real platform does to a running execution:
//! a per-execution removal quota (selections are truncated to what is left
//! of it), an artificial latency on removals, and injected removal failures.

mod persist;
mod snapshot;

use async_trait::async_trait;
use std::collections::BTreeSet;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use crate::checkpoint::DEFAULT_TAG_CAPACITY;
use crate::fleet::{
    BackendError, FleetClient, ItemId, LeafItem, Selection, SubUnit, SubUnitId, TagService,
    UnitClient, UnitId,
};
use crate::query::{Condition, Query};

pub use snapshot::{AdGroupRecord, FleetSnapshot, KeywordRecord, SubUnitRecord, UnitRecord};

#[derive(Debug, Default)]
struct Faults {
    removal_quota: Option<u64>,
    removal_delay: Option<Duration>,
    failing_units: BTreeSet<UnitId>,
}

#[derive(Debug)]
struct Inner {
    state: Mutex<FleetSnapshot>,
    faults: Mutex<Faults>,
    tag_capacity: usize,
}

/// Shared handle to an in-memory fleet. Clones see the same state.
#[derive(Debug, Clone)]
pub struct MemoryFleet {
    inner: Arc<Inner>,
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl MemoryFleet {
    pub fn new(snapshot: FleetSnapshot) -> Self {
        Self::with_tag_capacity(snapshot, DEFAULT_TAG_CAPACITY)
    }

    /// Fleet whose account labels accept at most `tag_capacity` members each.
    pub fn with_tag_capacity(snapshot: FleetSnapshot, tag_capacity: usize) -> Self {
        Self {
            inner: Arc::new(Inner {
                state: Mutex::new(snapshot),
                faults: Mutex::new(Faults::default()),
                tag_capacity: tag_capacity.max(1),
            }),
        }
    }

    /// Copy of the current state.
    pub fn snapshot(&self) -> FleetSnapshot {
        lock(&self.inner.state).clone()
    }

    /// Limit how many keywords one execution (one `open_unit`) may remove.
    pub fn set_removal_quota(&self, quota: Option<u64>) {
        lock(&self.inner.faults).removal_quota = quota;
    }

    /// Delay every keyword removal by `delay`.
    pub fn set_removal_delay(&self, delay: Option<Duration>) {
        lock(&self.inner.faults).removal_delay = delay;
    }

    /// Make every keyword removal in `unit` fail.
    pub fn fail_removals_for(&self, unit: &UnitId) {
        lock(&self.inner.faults).failing_units.insert(unit.clone());
    }

    pub fn clear_faults(&self) {
        *lock(&self.inner.faults) = Faults::default();
    }

    /// Keywords still present in `unit` (any status). None if the account is unknown.
    pub fn keyword_count(&self, unit: &UnitId) -> Option<usize> {
        lock(&self.inner.state)
            .units
            .get(unit)
            .map(UnitRecord::keyword_count)
    }
}

fn unsupported(c: &Condition) -> BackendError {
    BackendError::UnsupportedCondition(c.to_string())
}

fn tags_match(tags: &BTreeSet<String>, c: &Condition) -> Result<bool, BackendError> {
    match c {
        Condition::TaggedNone(names) => Ok(names.iter().all(|n| !tags.contains(n))),
        other => Err(unsupported(other)),
    }
}

fn unit_matches(unit: &UnitRecord, query: &Query) -> Result<bool, BackendError> {
    for c in &query.conditions {
        if !tags_match(&unit.tags, c)? {
            return Ok(false);
        }
    }
    Ok(true)
}

fn sub_unit_matches(sub: &SubUnitRecord, query: &Query) -> Result<bool, BackendError> {
    for c in &query.conditions {
        let ok = match c {
            Condition::SubUnitActive => !sub.status.is_removed(),
            other => tags_match(&sub.tags, other)?,
        };
        if !ok {
            return Ok(false);
        }
    }
    Ok(true)
}

fn keyword_matches(
    sub: &SubUnitRecord,
    ad_group: &AdGroupRecord,
    keyword: &KeywordRecord,
    query: &Query,
) -> Result<bool, BackendError> {
    for c in &query.conditions {
        let ok = match c {
            Condition::SubUnitActive => !sub.status.is_removed(),
            Condition::AdGroupActive => !ad_group.status.is_removed(),
            Condition::Metric(p) => p.matches(&keyword.metrics),
            other => return Err(unsupported(other)),
        };
        if !ok {
            return Ok(false);
        }
    }
    Ok(true)
}

#[async_trait]
impl TagService for MemoryFleet {
    async fn create_tag(&self, name: &str) -> Result<(), BackendError> {
        let mut state = lock(&self.inner.state);
        if !state.tags.insert(name.to_string()) {
            return Err(BackendError::TagAlreadyExists(name.to_string()));
        }
        Ok(())
    }

    async fn delete_tag(&self, name: &str) -> Result<(), BackendError> {
        let mut state = lock(&self.inner.state);
        if !state.tags.remove(name) {
            return Err(BackendError::TagNotFound(name.to_string()));
        }
        for unit in state.units.values_mut() {
            unit.tags.remove(name);
        }
        Ok(())
    }

    async fn attach_tag(&self, entity: &str, name: &str) -> Result<(), BackendError> {
        let mut state = lock(&self.inner.state);
        if !state.tags.contains(name) {
            return Err(BackendError::TagNotFound(name.to_string()));
        }
        let members = state.units.values().filter(|u| u.tags.contains(name)).count();
        let unit = state
            .units
            .get_mut(&UnitId::from(entity))
            .ok_or_else(|| BackendError::UnitNotFound(entity.to_string()))?;
        if unit.tags.contains(name) {
            return Err(BackendError::AlreadyTagged {
                entity: entity.to_string(),
                tag: name.to_string(),
            });
        }
        if members >= self.inner.tag_capacity {
            return Err(BackendError::TagCapacityExceeded {
                tag: name.to_string(),
                capacity: self.inner.tag_capacity,
            });
        }
        unit.tags.insert(name.to_string());
        Ok(())
    }

    async fn detach_tag(&self, entity: &str, name: &str) -> Result<(), BackendError> {
        let mut state = lock(&self.inner.state);
        let unit = state
            .units
            .get_mut(&UnitId::from(entity))
            .ok_or_else(|| BackendError::UnitNotFound(entity.to_string()))?;
        if !unit.tags.remove(name) {
            return Err(BackendError::NotTagged {
                entity: entity.to_string(),
                tag: name.to_string(),
            });
        }
        Ok(())
    }

    async fn tagged_with(&self, name: &str) -> Result<Vec<String>, BackendError> {
        let state = lock(&self.inner.state);
        if !state.tags.contains(name) {
            return Err(BackendError::TagNotFound(name.to_string()));
        }
        Ok(state
            .units
            .iter()
            .filter(|(_, u)| u.tags.contains(name))
            .map(|(id, _)| id.to_string())
            .collect())
    }
}

#[async_trait]
impl FleetClient for MemoryFleet {
    fn tags(&self) -> &dyn TagService {
        self
    }

    async fn select_units(
        &self,
        query: &Query,
        limit: usize,
    ) -> Result<Selection<UnitId>, BackendError> {
        let state = lock(&self.inner.state);
        let mut matched = Vec::new();
        for (id, unit) in &state.units {
            if unit_matches(unit, query)? {
                matched.push(id.clone());
            }
        }
        let total = matched.len() as u64;
        matched.truncate(limit);
        Ok(Selection {
            total,
            entries: matched,
        })
    }

    async fn open_unit(&self, unit: &UnitId) -> Result<Arc<dyn UnitClient>, BackendError> {
        if !lock(&self.inner.state).units.contains_key(unit) {
            return Err(BackendError::UnitNotFound(unit.to_string()));
        }
        let quota = lock(&self.inner.faults).removal_quota;
        Ok(Arc::new(MemoryUnit {
            fleet: self.clone(),
            unit: unit.clone(),
            quota_left: Mutex::new(quota),
        }))
    }
}

/// One execution against one account of a [`MemoryFleet`].
#[derive(Debug)]
pub struct MemoryUnit {
    fleet: MemoryFleet,
    unit: UnitId,
    quota_left: Mutex<Option<u64>>,
}

impl MemoryUnit {
    fn with_unit<T>(
        &self,
        f: impl FnOnce(&mut UnitRecord) -> Result<T, BackendError>,
    ) -> Result<T, BackendError> {
        let mut state = lock(&self.fleet.inner.state);
        let unit = state
            .units
            .get_mut(&self.unit)
            .ok_or_else(|| BackendError::UnitNotFound(self.unit.to_string()))?;
        f(unit)
    }

    fn sub_unit_mut<'a>(
        unit: &'a mut UnitRecord,
        entity: &str,
    ) -> Result<&'a mut SubUnitRecord, BackendError> {
        unit.sub_units
            .get_mut(&SubUnitId::from(entity))
            .ok_or_else(|| BackendError::SubUnitNotFound(entity.to_string()))
    }
}

#[async_trait]
impl TagService for MemoryUnit {
    async fn create_tag(&self, name: &str) -> Result<(), BackendError> {
        self.with_unit(|unit| {
            if !unit.sub_unit_tags.insert(name.to_string()) {
                return Err(BackendError::TagAlreadyExists(name.to_string()));
            }
            Ok(())
        })
    }

    async fn delete_tag(&self, name: &str) -> Result<(), BackendError> {
        self.with_unit(|unit| {
            if !unit.sub_unit_tags.remove(name) {
                return Err(BackendError::TagNotFound(name.to_string()));
            }
            for sub in unit.sub_units.values_mut() {
                sub.tags.remove(name);
            }
            Ok(())
        })
    }

    async fn attach_tag(&self, entity: &str, name: &str) -> Result<(), BackendError> {
        self.with_unit(|unit| {
            if !unit.sub_unit_tags.contains(name) {
                return Err(BackendError::TagNotFound(name.to_string()));
            }
            let sub = Self::sub_unit_mut(unit, entity)?;
            if !sub.tags.insert(name.to_string()) {
                return Err(BackendError::AlreadyTagged {
                    entity: entity.to_string(),
                    tag: name.to_string(),
                });
            }
            Ok(())
        })
    }

    async fn detach_tag(&self, entity: &str, name: &str) -> Result<(), BackendError> {
        self.with_unit(|unit| {
            let sub = Self::sub_unit_mut(unit, entity)?;
            if !sub.tags.remove(name) {
                return Err(BackendError::NotTagged {
                    entity: entity.to_string(),
                    tag: name.to_string(),
                });
            }
            Ok(())
        })
    }

    async fn tagged_with(&self, name: &str) -> Result<Vec<String>, BackendError> {
        self.with_unit(|unit| {
            if !unit.sub_unit_tags.contains(name) {
                return Err(BackendError::TagNotFound(name.to_string()));
            }
            Ok(unit
                .sub_units
                .iter()
                .filter(|(_, s)| s.tags.contains(name))
                .map(|(id, _)| id.to_string())
                .collect())
        })
    }
}

#[async_trait]
impl UnitClient for MemoryUnit {
    fn unit_id(&self) -> &UnitId {
        &self.unit
    }

    fn tags(&self) -> &dyn TagService {
        self
    }

    async fn count_items(&self, query: &Query) -> Result<u64, BackendError> {
        self.with_unit(|unit| {
            let mut count = 0u64;
            for sub in unit.sub_units.values() {
                for ad_group in sub.ad_groups.values() {
                    for keyword in ad_group.keywords.values() {
                        if keyword_matches(sub, ad_group, keyword, query)? {
                            count += 1;
                        }
                    }
                }
            }
            Ok(count)
        })
    }

    async fn select_sub_units(&self, query: &Query) -> Result<Selection<SubUnit>, BackendError> {
        self.with_unit(|unit| {
            let mut entries = Vec::new();
            for (id, sub) in &unit.sub_units {
                if sub_unit_matches(sub, query)? {
                    entries.push(SubUnit {
                        id: id.clone(),
                        name: sub.name.clone(),
                    });
                }
            }
            Ok(Selection {
                total: entries.len() as u64,
                entries,
            })
        })
    }

    async fn select_items(
        &self,
        sub_unit: &SubUnitId,
        query: &Query,
    ) -> Result<Selection<LeafItem>, BackendError> {
        let mut selection = self.with_unit(|unit| {
            let sub = unit
                .sub_units
                .get(sub_unit)
                .ok_or_else(|| BackendError::SubUnitNotFound(sub_unit.to_string()))?;
            let mut entries = Vec::new();
            for ad_group in sub.ad_groups.values() {
                for (id, keyword) in &ad_group.keywords {
                    if keyword_matches(sub, ad_group, keyword, query)? {
                        entries.push(LeafItem {
                            id: id.clone(),
                            sub_unit: sub_unit.clone(),
                            text: keyword.text.clone(),
                        });
                    }
                }
            }
            Ok(Selection {
                total: entries.len() as u64,
                entries,
            })
        })?;
        if let Some(left) = *lock(&self.quota_left) {
            selection.entries.truncate(left as usize);
        }
        Ok(selection)
    }

    async fn remove_item(&self, item: &ItemId) -> Result<(), BackendError> {
        let (delay, failing) = {
            let faults = lock(&self.fleet.inner.faults);
            (faults.removal_delay, faults.failing_units.contains(&self.unit))
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if failing {
            return Err(BackendError::Remote(format!(
                "removal of keyword {item} rejected by account {}",
                self.unit
            )));
        }
        let removed = self.with_unit(|unit| Ok(unit.remove_keyword(item)))?;
        if removed {
            if let Some(left) = lock(&self.quota_left).as_mut() {
                *left = left.saturating_sub(1);
            }
        }
        Ok(())
    }
}
