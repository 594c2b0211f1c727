//! Correlation service
//!
//! Owns the mapping between (external system, external identifier) pairs
//! and internal elements: resolution, creation, home assignment, removal
//! and synchronized-version bookkeeping. Uniqueness of the pair and the
//! at-most-one-home invariant are enforced through the repository's atomic
//! insert-if-absent and claim-home primitives, so concurrent writers
//! serialize per key.

use std::sync::Arc;

use tracing::{debug, info, instrument};

use meridian_core::{
    CorrelationId, ElementId, ExternalCorrelation, ExternalSystemId, ExternalSystemKey,
    PropertyBag,
};

use crate::error::{SyncError, SyncResult};
use crate::repository::{CorrelationInsert, HomeClaim, MetadataRepository};

/// Service for managing external identifier correlations.
#[derive(Clone)]
pub struct CorrelationService {
    repository: Arc<dyn MetadataRepository>,
}

impl CorrelationService {
    /// Create a new correlation service.
    #[must_use]
    pub fn new(repository: Arc<dyn MetadataRepository>) -> Self {
        Self { repository }
    }

    /// Resolve an external identifier to the internal element it maps to.
    #[instrument(skip(self), fields(system = %system_id))]
    pub async fn resolve(
        &self,
        system_id: ExternalSystemId,
        external_identifier: &str,
    ) -> SyncResult<Option<ElementId>> {
        let correlation = self
            .repository
            .correlation(system_id, external_identifier)
            .await?;
        Ok(correlation.map(|c| c.element_id))
    }

    /// Create a correlation between an element and an external identifier.
    ///
    /// Idempotent when the pair already maps to the same element; fails
    /// with `DuplicateCorrelation` when it maps to a different one. A
    /// requested home flag is claimed through the repository's atomic
    /// primitive, so the at-most-one-home invariant holds under concurrent
    /// callers.
    #[instrument(skip(self, properties), fields(element = %element_id, system = %system.id))]
    pub async fn create(
        &self,
        element_id: ElementId,
        system: &ExternalSystemKey,
        external_identifier: &str,
        is_home: bool,
        synchronized_version: u64,
        properties: PropertyBag,
    ) -> SyncResult<CorrelationId> {
        // Insert without the home flag; home is claimed separately so the
        // single-holder check happens under the store's atomic primitive.
        let candidate = ExternalCorrelation::new(
            element_id,
            system,
            external_identifier,
            false,
            synchronized_version,
            properties,
        );

        let correlation_id = match self.repository.insert_correlation_if_absent(candidate).await? {
            CorrelationInsert::Created(id) => {
                info!(
                    correlation = %id,
                    identifier = external_identifier,
                    "External identifier correlated"
                );
                id
            }
            CorrelationInsert::Existing(existing) if existing.element_id == element_id => {
                debug!(correlation = %existing.id, "Correlation already present");
                existing.id
            }
            CorrelationInsert::Existing(existing) => {
                return Err(SyncError::DuplicateCorrelation {
                    external_system_id: system.id,
                    external_identifier: external_identifier.to_string(),
                    element_id: existing.element_id,
                });
            }
        };

        if is_home {
            self.set_home(element_id, system.id).await?;
        }

        Ok(correlation_id)
    }

    /// Mark the given external system as home for an element.
    ///
    /// Fails with `HomeConflict` when another system already holds home,
    /// and with `NotFound` when the system has no correlation with the
    /// element.
    #[instrument(skip(self), fields(element = %element_id, system = %system_id))]
    pub async fn set_home(
        &self,
        element_id: ElementId,
        system_id: ExternalSystemId,
    ) -> SyncResult<()> {
        match self.repository.claim_home(element_id, system_id).await? {
            HomeClaim::Claimed => {
                info!("Home ownership claimed");
                Ok(())
            }
            HomeClaim::AlreadyHome => Ok(()),
            HomeClaim::ConflictingHome(holder) => Err(SyncError::HomeConflict {
                element_id,
                home_system_id: holder,
            }),
            HomeClaim::CorrelationMissing => {
                Err(SyncError::not_found("Correlation", element_id))
            }
        }
    }

    /// Remove the correlation between one system and one element without
    /// touching the element.
    ///
    /// When the removed correlation carried the home flag the element
    /// reverts to internal ownership — home lives on the correlation, so
    /// deleting it deletes the claim.
    #[instrument(skip(self), fields(element = %element_id, system = %system_id))]
    pub async fn remove(
        &self,
        system_id: ExternalSystemId,
        element_id: ElementId,
    ) -> SyncResult<()> {
        let removed = self
            .repository
            .delete_correlation(system_id, element_id)
            .await?;
        if !removed {
            return Err(SyncError::not_found("Correlation", element_id));
        }
        info!("Correlation removed");
        Ok(())
    }

    /// The external system holding home for an element, if any.
    pub async fn home_system(
        &self,
        element_id: ElementId,
    ) -> SyncResult<Option<ExternalSystemId>> {
        let correlations = self.repository.correlations_for_element(element_id).await?;
        Ok(correlations
            .into_iter()
            .find(|c| c.is_home)
            .map(|c| c.external_system_id))
    }

    /// The correlation one system holds for an element, if any.
    ///
    /// This is the read-back a connector uses to retrieve its own mapping
    /// metadata; callers never see another system's external identifiers.
    pub async fn correlation_for(
        &self,
        element_id: ElementId,
        system_id: ExternalSystemId,
    ) -> SyncResult<Option<ExternalCorrelation>> {
        let correlations = self.repository.correlations_for_element(element_id).await?;
        Ok(correlations
            .into_iter()
            .find(|c| c.external_system_id == system_id))
    }

    /// Record the element version last synchronized with an external
    /// system, for optimistic-concurrency callers. No-op when the system
    /// holds no correlation for the element.
    #[instrument(skip(self), fields(element = %element_id, system = %system_id, version))]
    pub async fn record_synchronized_version(
        &self,
        element_id: ElementId,
        system_id: ExternalSystemId,
        version: u64,
    ) -> SyncResult<()> {
        if let Some(mut correlation) = self.correlation_for(element_id, system_id).await? {
            correlation.last_synchronized_version = version;
            self.repository.update_correlation(correlation).await?;
            debug!("Synchronized version recorded");
        }
        Ok(())
    }
}
