//! Serializable fleet state held by [`super::MemoryFleet`].

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::fleet::{EntityStatus, ItemId, SubUnitId, UnitId};

/// Whole manager account: account label definitions and every account.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FleetSnapshot {
    /// Account label definitions.
    #[serde(default)]
    pub tags: BTreeSet<String>,
    #[serde(default)]
    pub units: BTreeMap<UnitId, UnitRecord>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UnitRecord {
    /// Account labels applied to this account.
    #[serde(default)]
    pub tags: BTreeSet<String>,
    /// Campaign label definitions inside this account.
    #[serde(default)]
    pub sub_unit_tags: BTreeSet<String>,
    #[serde(default)]
    pub sub_units: BTreeMap<SubUnitId, SubUnitRecord>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SubUnitRecord {
    pub name: String,
    #[serde(default)]
    pub status: EntityStatus,
    #[serde(default)]
    pub tags: BTreeSet<String>,
    #[serde(default)]
    pub ad_groups: BTreeMap<String, AdGroupRecord>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AdGroupRecord {
    #[serde(default)]
    pub status: EntityStatus,
    #[serde(default)]
    pub keywords: BTreeMap<ItemId, KeywordRecord>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KeywordRecord {
    pub text: String,
    /// Metric values aggregated over the reporting window.
    #[serde(default)]
    pub metrics: BTreeMap<String, f64>,
}

impl KeywordRecord {
    pub fn new(text: impl Into<String>, metrics: &[(&str, f64)]) -> Self {
        Self {
            text: text.into(),
            metrics: metrics.iter().map(|(k, v)| (k.to_string(), *v)).collect(),
        }
    }
}

impl FleetSnapshot {
    /// Get or insert an account.
    pub fn unit(&mut self, id: impl Into<UnitId>) -> &mut UnitRecord {
        self.units.entry(id.into()).or_default()
    }
}

impl UnitRecord {
    /// Get or insert a campaign.
    pub fn sub_unit(&mut self, id: impl Into<SubUnitId>, name: &str) -> &mut SubUnitRecord {
        self.sub_units
            .entry(id.into())
            .or_insert_with(|| SubUnitRecord {
                name: name.to_string(),
                ..SubUnitRecord::default()
            })
    }

    pub fn keyword_count(&self) -> usize {
        self.sub_units
            .values()
            .flat_map(|s| s.ad_groups.values())
            .map(|a| a.keywords.len())
            .sum()
    }

    /// Remove a keyword wherever it lives. Returns false if it was not present.
    pub fn remove_keyword(&mut self, item: &ItemId) -> bool {
        self.sub_units
            .values_mut()
            .flat_map(|s| s.ad_groups.values_mut())
            .any(|a| a.keywords.remove(item).is_some())
    }
}

impl SubUnitRecord {
    /// Get or insert an ad group.
    pub fn ad_group(&mut self, name: &str) -> &mut AdGroupRecord {
        self.ad_groups.entry(name.to_string()).or_default()
    }

    /// Add a keyword to the named ad group (created on demand).
    pub fn keyword(
        &mut self,
        ad_group: &str,
        id: impl Into<ItemId>,
        keyword: KeywordRecord,
    ) -> &mut Self {
        self.ad_group(ad_group).keywords.insert(id.into(), keyword);
        self
    }
}
