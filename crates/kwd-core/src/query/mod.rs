//! Selection queries handed to the fleet backend.
//!
//! A query is a conjunction of conditions plus an optional date range over
//! which metric conditions are evaluated. How a backend executes it is its
//! own concern; backends reject conditions that make no sense at the level
//! being selected.

mod date;
mod predicate;

use std::fmt;

pub use date::{DateError, DateRange};
pub use predicate::{Comparison, MetricPredicate, PredicateError};

#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    /// The campaign owning the entity is not removed.
    SubUnitActive,
    /// The ad group owning the keyword is not removed.
    AdGroupActive,
    /// Metric comparison evaluated over the query's date range.
    Metric(MetricPredicate),
    /// The entity carries none of the named tags.
    TaggedNone(Vec<String>),
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Condition::SubUnitActive => write!(f, "CampaignStatus != REMOVED"),
            Condition::AdGroupActive => write!(f, "AdGroupStatus != REMOVED"),
            Condition::Metric(p) => write!(f, "{p}"),
            Condition::TaggedNone(tags) => write!(f, "LabelNames CONTAINS_NONE {tags:?}"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    pub conditions: Vec<Condition>,
    pub date_range: Option<DateRange>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, condition: Condition) -> Self {
        self.conditions.push(condition);
        self
    }

    pub fn for_date_range(mut self, range: DateRange) -> Self {
        self.date_range = Some(range);
        self
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for c in &self.conditions {
            if !first {
                write!(f, " AND ")?;
            }
            write!(f, "{c}")?;
            first = false;
        }
        if let Some(range) = &self.date_range {
            write!(f, " DURING {range}")?;
        }
        Ok(())
    }
}
