//! Checkpoint tag store.
//!
//! Tags are the only state that survives between runs. This wrapper gives the
//! engine idempotent operations over a [`TagService`]: every call reports
//! whether the target state already held instead of failing, so a run that is
//! cut short and started again converges on the same tags.

mod generations;

use std::collections::BTreeSet;

use crate::fleet::{BackendError, TagService};

pub use generations::{GenerationError, TagGenerations, DEFAULT_TAG_CAPACITY};

/// Idempotent view over one tag scope.
#[derive(Clone, Copy)]
pub struct CheckpointStore<'a> {
    tags: &'a dyn TagService,
}

impl<'a> CheckpointStore<'a> {
    pub fn new(tags: &'a dyn TagService) -> Self {
        Self { tags }
    }

    /// Define `name` if absent. Returns true if it already existed.
    pub async fn ensure_exists(&self, name: &str) -> Result<bool, BackendError> {
        match self.tags.create_tag(name).await {
            Ok(()) => Ok(false),
            Err(BackendError::TagAlreadyExists(_)) => Ok(true),
            Err(e) => Err(e),
        }
    }

    /// Delete the definition of `name`. Returns true if it was already gone.
    pub async fn ensure_absent(&self, name: &str) -> Result<bool, BackendError> {
        match self.tags.delete_tag(name).await {
            Ok(()) => Ok(false),
            Err(BackendError::TagNotFound(_)) => Ok(true),
            Err(e) => Err(e),
        }
    }

    /// Tag `entity` with `name`. Returns true if it already carried the tag.
    pub async fn attach(&self, entity: &str, name: &str) -> Result<bool, BackendError> {
        match self.tags.attach_tag(entity, name).await {
            Ok(()) => Ok(false),
            Err(BackendError::AlreadyTagged { .. }) => Ok(true),
            Err(e) => Err(e),
        }
    }

    /// Remove `name` from `entity`. Returns true if it was not tagged.
    pub async fn release(&self, entity: &str, name: &str) -> Result<bool, BackendError> {
        match self.tags.detach_tag(entity, name).await {
            Ok(()) => Ok(false),
            Err(BackendError::NotTagged { .. }) | Err(BackendError::TagNotFound(_)) => Ok(true),
            Err(e) => Err(e),
        }
    }

    /// Entities carrying `name`; empty if the tag is not defined.
    pub async fn members(&self, name: &str) -> Result<Vec<String>, BackendError> {
        match self.tags.tagged_with(name).await {
            Ok(members) => Ok(members),
            Err(BackendError::TagNotFound(_)) => Ok(Vec::new()),
            Err(e) => Err(e),
        }
    }

    /// Entities tagged under any generation.
    pub async fn union_membership(
        &self,
        generations: &TagGenerations,
    ) -> Result<BTreeSet<String>, BackendError> {
        let mut all = BTreeSet::new();
        for name in generations.names() {
            all.extend(self.members(name).await?);
        }
        Ok(all)
    }

    pub async fn is_member_of_any(
        &self,
        entity: &str,
        generations: &TagGenerations,
    ) -> Result<bool, BackendError> {
        Ok(self.union_membership(generations).await?.contains(entity))
    }

    /// Member count of each generation, in order.
    pub async fn member_counts(
        &self,
        generations: &TagGenerations,
    ) -> Result<Vec<usize>, BackendError> {
        let mut counts = Vec::with_capacity(generations.len());
        for name in generations.names() {
            counts.push(self.members(name).await?.len());
        }
        Ok(counts)
    }

    /// Release `name` from every member and delete its definition.
    /// Returns how many entities were released and whether a definition
    /// was deleted.
    pub async fn release_all(&self, name: &str) -> Result<(usize, bool), BackendError> {
        let mut released = 0;
        for entity in self.members(name).await? {
            if !self.release(&entity, name).await? {
                released += 1;
            }
        }
        let deleted = !self.ensure_absent(name).await?;
        Ok((released, deleted))
    }
}
