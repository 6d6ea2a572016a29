//! Identifiers and entity views shared by every fleet backend.

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }
    };
}

string_id!(
    /// Stable external id of a managed account (e.g. `123-456-7890`).
    UnitId
);
string_id!(
    /// Campaign id, unique within its account.
    SubUnitId
);
string_id!(
    /// Keyword id, unique within its account.
    ItemId
);

/// Serving status of a campaign or ad group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityStatus {
    #[default]
    Enabled,
    Paused,
    Removed,
}

impl EntityStatus {
    pub fn is_removed(self) -> bool {
        self == EntityStatus::Removed
    }
}

/// Campaign as returned by a selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubUnit {
    pub id: SubUnitId,
    pub name: String,
}

/// Keyword as returned by a selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeafItem {
    pub id: ItemId,
    pub sub_unit: SubUnitId,
    pub text: String,
}

/// Result of a selection: how many entities matched, and a cursor over them.
///
/// `entries` may be shorter than `total` when the backend caps what one
/// execution may walk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection<T> {
    pub total: u64,
    pub entries: Vec<T>,
}

impl<T> Selection<T> {
    pub fn empty() -> Self {
        Self {
            total: 0,
            entries: Vec::new(),
        }
    }
}
