//! Fleet backend seam: account selection, per-account querying, and tagging.
//!
//! The engine only talks to the fleet through these traits. `memory` holds
//! the in-process backend used by the CLI (against a JSON fleet snapshot)
//! and by the tests.

pub mod memory;
mod types;

use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

use crate::query::Query;

pub use types::{EntityStatus, ItemId, LeafItem, Selection, SubUnit, SubUnitId, UnitId};

/// Errors reported by a fleet backend.
///
/// The tag variants describe expected idempotency conditions; the checkpoint
/// store turns them into booleans and never surfaces them.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BackendError {
    #[error("tag `{0}` already exists")]
    TagAlreadyExists(String),
    #[error("tag `{0}` does not exist")]
    TagNotFound(String),
    #[error("`{entity}` already carries tag `{tag}`")]
    AlreadyTagged { entity: String, tag: String },
    #[error("`{entity}` does not carry tag `{tag}`")]
    NotTagged { entity: String, tag: String },
    #[error("tag `{tag}` is at capacity ({capacity} members)")]
    TagCapacityExceeded { tag: String, capacity: usize },
    #[error("account {0} not found")]
    UnitNotFound(String),
    #[error("campaign {0} not found")]
    SubUnitNotFound(String),
    #[error("condition `{0}` is not supported at this level")]
    UnsupportedCondition(String),
    #[error("{0}")]
    Remote(String),
}

/// Label storage for one scope (fleet-level account labels, or the
/// campaign labels of a single account). Entities are addressed by id.
#[async_trait]
pub trait TagService: Send + Sync {
    /// Fails with `TagAlreadyExists` if the tag is already defined.
    async fn create_tag(&self, name: &str) -> Result<(), BackendError>;

    /// Fails with `TagNotFound` if the tag is not defined. Deleting a tag
    /// detaches it from every member.
    async fn delete_tag(&self, name: &str) -> Result<(), BackendError>;

    /// Fails with `AlreadyTagged`, `TagNotFound` or `TagCapacityExceeded`.
    async fn attach_tag(&self, entity: &str, name: &str) -> Result<(), BackendError>;

    /// Fails with `NotTagged` if the entity does not carry the tag.
    async fn detach_tag(&self, entity: &str, name: &str) -> Result<(), BackendError>;

    /// Ids of entities carrying the tag. Fails with `TagNotFound`.
    async fn tagged_with(&self, name: &str) -> Result<Vec<String>, BackendError>;
}

/// Fleet-level view (the manager account).
#[async_trait]
pub trait FleetClient: Send + Sync {
    /// Account labels.
    fn tags(&self) -> &dyn TagService;

    /// Accounts matching `query`; at most `limit` entries, `total` counts all matches.
    async fn select_units(&self, query: &Query, limit: usize)
        -> Result<Selection<UnitId>, BackendError>;

    /// Open one execution against a single account.
    async fn open_unit(&self, unit: &UnitId) -> Result<Arc<dyn UnitClient>, BackendError>;
}

/// Account-level view, valid for one execution.
#[async_trait]
pub trait UnitClient: Send + Sync {
    fn unit_id(&self) -> &UnitId;

    /// Campaign labels of this account.
    fn tags(&self) -> &dyn TagService;

    /// Number of keywords matching `query` across the whole account.
    async fn count_items(&self, query: &Query) -> Result<u64, BackendError>;

    async fn select_sub_units(&self, query: &Query) -> Result<Selection<SubUnit>, BackendError>;

    /// Keywords under one campaign matching `query`.
    async fn select_items(
        &self,
        sub_unit: &SubUnitId,
        query: &Query,
    ) -> Result<Selection<LeafItem>, BackendError>;

    /// Remove a keyword. Removing a keyword that is already gone is a no-op.
    async fn remove_item(&self, item: &ItemId) -> Result<(), BackendError>;
}
