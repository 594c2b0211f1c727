//! In-memory repository
//!
//! Reference implementation of [`MetadataRepository`] backed by a single
//! `parking_lot::RwLock`. Insert-if-absent and compare-and-swap are atomic
//! under the lock, which is never held across an await point.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use parking_lot::RwLock;

use meridian_core::{
    Element, ElementId, ElementState, ElementType, ExternalCorrelation, ExternalSystemId,
    Relationship, RelationshipId, RepositoryResult, VersionRecord,
};

use crate::repository::{CorrelationInsert, HomeClaim, MetadataRepository};

#[derive(Default)]
struct State {
    elements: HashMap<ElementId, Element>,
    /// Keyed on the unique (system, external identifier) pair.
    correlations: HashMap<(ExternalSystemId, String), ExternalCorrelation>,
    versions: HashMap<ElementId, BTreeMap<u64, VersionRecord>>,
    relationships: HashMap<RelationshipId, Relationship>,
}

/// An in-process [`MetadataRepository`].
#[derive(Default)]
pub struct MemoryRepository {
    state: RwLock<State>,
}

impl MemoryRepository {
    /// Create an empty repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored elements. Test/diagnostic helper.
    #[must_use]
    pub fn element_count(&self) -> usize {
        self.state.read().elements.len()
    }

    /// Number of stored correlations. Test/diagnostic helper.
    #[must_use]
    pub fn correlation_count(&self) -> usize {
        self.state.read().correlations.len()
    }
}

#[async_trait]
impl MetadataRepository for MemoryRepository {
    async fn insert_element(&self, element: Element) -> RepositoryResult<()> {
        self.state.write().elements.insert(element.id, element);
        Ok(())
    }

    async fn element(&self, id: ElementId) -> RepositoryResult<Option<Element>> {
        Ok(self.state.read().elements.get(&id).cloned())
    }

    async fn update_element(
        &self,
        expected_version: u64,
        expected_state: ElementState,
        updated: Element,
    ) -> RepositoryResult<bool> {
        let mut state = self.state.write();
        match state.elements.get_mut(&updated.id) {
            Some(stored)
                if stored.current_version == expected_version
                    && stored.state == expected_state =>
            {
                *stored = updated;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn delete_element(&self, id: ElementId) -> RepositoryResult<bool> {
        Ok(self.state.write().elements.remove(&id).is_some())
    }

    async fn elements_by_type(
        &self,
        element_type: Option<ElementType>,
    ) -> RepositoryResult<Vec<Element>> {
        let state = self.state.read();
        let mut matches: Vec<Element> = state
            .elements
            .values()
            .filter(|e| element_type.map_or(true, |t| e.element_type == t))
            .cloned()
            .collect();
        // Stable order so pagination is deterministic.
        matches.sort_by_key(|e| (e.created_at, e.id));
        Ok(matches)
    }

    async fn anchored_children(&self, anchor_id: ElementId) -> RepositoryResult<Vec<ElementId>> {
        let state = self.state.read();
        Ok(state
            .elements
            .values()
            .filter(|e| e.anchor_id == Some(anchor_id))
            .map(|e| e.id)
            .collect())
    }

    async fn insert_correlated_element(
        &self,
        element: Element,
        correlation: ExternalCorrelation,
    ) -> RepositoryResult<CorrelationInsert> {
        let mut state = self.state.write();
        let key = (
            correlation.external_system_id,
            correlation.external_identifier.clone(),
        );
        match state.correlations.get(&key) {
            Some(existing) => Ok(CorrelationInsert::Existing(existing.clone())),
            None => {
                let id = correlation.id;
                state.elements.insert(element.id, element);
                state.correlations.insert(key, correlation);
                Ok(CorrelationInsert::Created(id))
            }
        }
    }

    async fn insert_correlation_if_absent(
        &self,
        correlation: ExternalCorrelation,
    ) -> RepositoryResult<CorrelationInsert> {
        let mut state = self.state.write();
        let key = (
            correlation.external_system_id,
            correlation.external_identifier.clone(),
        );
        match state.correlations.get(&key) {
            Some(existing) => Ok(CorrelationInsert::Existing(existing.clone())),
            None => {
                let id = correlation.id;
                state.correlations.insert(key, correlation);
                Ok(CorrelationInsert::Created(id))
            }
        }
    }

    async fn correlation(
        &self,
        system_id: ExternalSystemId,
        external_identifier: &str,
    ) -> RepositoryResult<Option<ExternalCorrelation>> {
        let key = (system_id, external_identifier.to_string());
        Ok(self.state.read().correlations.get(&key).cloned())
    }

    async fn correlations_for_element(
        &self,
        element_id: ElementId,
    ) -> RepositoryResult<Vec<ExternalCorrelation>> {
        let state = self.state.read();
        Ok(state
            .correlations
            .values()
            .filter(|c| c.element_id == element_id)
            .cloned()
            .collect())
    }

    async fn update_correlation(
        &self,
        correlation: ExternalCorrelation,
    ) -> RepositoryResult<bool> {
        let mut state = self.state.write();
        let key = (
            correlation.external_system_id,
            correlation.external_identifier.clone(),
        );
        match state.correlations.get_mut(&key) {
            Some(stored) => {
                *stored = correlation;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_correlation(
        &self,
        system_id: ExternalSystemId,
        element_id: ElementId,
    ) -> RepositoryResult<bool> {
        let mut state = self.state.write();
        let key = state
            .correlations
            .iter()
            .find(|(_, c)| c.external_system_id == system_id && c.element_id == element_id)
            .map(|(k, _)| k.clone());
        match key {
            Some(key) => {
                state.correlations.remove(&key);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn claim_home(
        &self,
        element_id: ElementId,
        system_id: ExternalSystemId,
    ) -> RepositoryResult<HomeClaim> {
        let mut state = self.state.write();

        if let Some(holder) = state
            .correlations
            .values()
            .find(|c| c.element_id == element_id && c.is_home)
        {
            return Ok(if holder.external_system_id == system_id {
                HomeClaim::AlreadyHome
            } else {
                HomeClaim::ConflictingHome(holder.external_system_id)
            });
        }

        match state
            .correlations
            .values_mut()
            .find(|c| c.element_id == element_id && c.external_system_id == system_id)
        {
            Some(own) => {
                own.is_home = true;
                Ok(HomeClaim::Claimed)
            }
            None => Ok(HomeClaim::CorrelationMissing),
        }
    }

    async fn push_version(&self, record: VersionRecord) -> RepositoryResult<()> {
        let mut state = self.state.write();
        state
            .versions
            .entry(record.element_id)
            .or_default()
            .insert(record.version, record);
        Ok(())
    }

    async fn version(
        &self,
        element_id: ElementId,
        version: u64,
    ) -> RepositoryResult<Option<VersionRecord>> {
        let state = self.state.read();
        Ok(state
            .versions
            .get(&element_id)
            .and_then(|history| history.get(&version))
            .cloned())
    }

    async fn prune_versions(
        &self,
        element_id: ElementId,
        keep_latest: u64,
    ) -> RepositoryResult<()> {
        let mut state = self.state.write();
        if let Some(history) = state.versions.get_mut(&element_id) {
            while history.len() as u64 > keep_latest {
                let Some(oldest) = history.keys().next().copied() else {
                    break;
                };
                history.remove(&oldest);
            }
        }
        Ok(())
    }

    async fn delete_versions(&self, element_id: ElementId) -> RepositoryResult<()> {
        self.state.write().versions.remove(&element_id);
        Ok(())
    }

    async fn insert_relationship(&self, relationship: Relationship) -> RepositoryResult<()> {
        self.state
            .write()
            .relationships
            .insert(relationship.id, relationship);
        Ok(())
    }

    async fn relationship(
        &self,
        id: RelationshipId,
    ) -> RepositoryResult<Option<Relationship>> {
        Ok(self.state.read().relationships.get(&id).cloned())
    }

    async fn update_relationship(&self, relationship: Relationship) -> RepositoryResult<bool> {
        let mut state = self.state.write();
        match state.relationships.get_mut(&relationship.id) {
            Some(stored) => {
                *stored = relationship;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_relationship(&self, id: RelationshipId) -> RepositoryResult<bool> {
        Ok(self.state.write().relationships.remove(&id).is_some())
    }

    async fn relationships_for_element(
        &self,
        element_id: ElementId,
    ) -> RepositoryResult<Vec<Relationship>> {
        let state = self.state.read();
        let mut matches: Vec<Relationship> = state
            .relationships
            .values()
            .filter(|r| r.is_incident_to(element_id))
            .cloned()
            .collect();
        matches.sort_by_key(|r| (r.created_at, r.id));
        Ok(matches)
    }
}
