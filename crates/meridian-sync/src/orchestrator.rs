//! Synchronization orchestrator
//!
//! The façade every exchange operation goes through. One generic engine,
//! parameterized by element type, replaces per-entity CRUD families: the
//! orchestrator resolves correlations, applies ownership checks, invokes
//! the merge resolver and lifecycle manager, and keeps correlation
//! bookkeeping current. Every read path passes candidates through the
//! effectivity filter before returning them.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use meridian_core::{
    CallerIdentity, Element, ElementId, ElementType, ExternalCorrelation, ExternalSystemKey,
    PropertyBag, Relationship, RelationshipId, RelationshipStatus,
};

use crate::config::SyncConfig;
use crate::correlation::CorrelationService;
use crate::effectivity::{self, Admission, QueryScope};
use crate::error::{SyncError, SyncResult};
use crate::lifecycle::LifecycleManager;
use crate::merge::{self, UpdateMode};
use crate::ownership::OwnershipGuard;
use crate::repository::{CorrelationInsert, MetadataRepository};
use crate::validate::{GlossaryTermValidator, ValidatorRegistry};

/// Caller-supplied pagination for find/scan operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    /// Number of surviving results to skip.
    #[serde(default)]
    pub start_from: usize,

    /// Maximum number of results to return.
    pub page_size: usize,
}

impl PageRequest {
    /// Create a new page request with the given page size.
    #[must_use]
    pub fn new(page_size: usize) -> Self {
        Self {
            start_from: 0,
            page_size,
        }
    }

    /// Set the start offset.
    #[must_use]
    pub fn with_start(mut self, start_from: usize) -> Self {
        self.start_from = start_from;
        self
    }
}

/// Options for element creation.
#[derive(Debug, Clone, Default)]
pub struct CreateOptions {
    /// The creating system's own identifier for the object. Supplying one
    /// makes creation idempotent: a second create with the same identifier
    /// resolves to the element the first one produced.
    pub external_identifier: Option<String>,

    /// Register the creating external system as home for the element.
    pub is_home: bool,

    /// Mapping-specific properties stored on the correlation.
    pub correlation_properties: PropertyBag,

    /// Owning element whose removal cascades to this one.
    pub anchor_id: Option<ElementId>,

    /// Start of the validity window.
    pub effective_from: Option<DateTime<Utc>>,

    /// End of the validity window, exclusive.
    pub effective_to: Option<DateTime<Utc>>,
}

impl CreateOptions {
    /// Create empty options: internally owned, unanchored, always effective.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the external identifier.
    #[must_use]
    pub fn with_external_identifier(mut self, identifier: impl Into<String>) -> Self {
        self.external_identifier = Some(identifier.into());
        self
    }

    /// Register the creating system as home.
    #[must_use]
    pub fn as_home(mut self) -> Self {
        self.is_home = true;
        self
    }

    /// Set correlation properties.
    #[must_use]
    pub fn with_correlation_properties(mut self, properties: PropertyBag) -> Self {
        self.correlation_properties = properties;
        self
    }

    /// Anchor the new element to an owning element.
    #[must_use]
    pub fn anchored_to(mut self, anchor_id: ElementId) -> Self {
        self.anchor_id = Some(anchor_id);
        self
    }

    /// Set the validity window.
    #[must_use]
    pub fn effective_between(
        mut self,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) -> Self {
        self.effective_from = from;
        self.effective_to = to;
        self
    }
}

/// The synchronization façade.
#[derive(Clone)]
pub struct SyncOrchestrator {
    repository: Arc<dyn MetadataRepository>,
    correlations: CorrelationService,
    ownership: OwnershipGuard,
    lifecycle: LifecycleManager,
    config: SyncConfig,
}

impl std::fmt::Debug for SyncOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncOrchestrator")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl SyncOrchestrator {
    /// Create an orchestrator with the built-in validators.
    ///
    /// Fails with `InvalidParameter` when the configuration bounds are
    /// invalid.
    pub fn new(repository: Arc<dyn MetadataRepository>, config: SyncConfig) -> SyncResult<Self> {
        let mut validators = ValidatorRegistry::new();
        validators.register(Arc::new(GlossaryTermValidator));
        Self::with_validators(repository, config, validators)
    }

    /// Create an orchestrator with a caller-assembled validator registry.
    ///
    /// Fails with `InvalidParameter` when the configuration bounds are
    /// invalid.
    pub fn with_validators(
        repository: Arc<dyn MetadataRepository>,
        config: SyncConfig,
        validators: ValidatorRegistry,
    ) -> SyncResult<Self> {
        config.validate()?;
        let validators = Arc::new(validators);
        let correlations = CorrelationService::new(repository.clone());
        let ownership = OwnershipGuard::new(correlations.clone());
        let lifecycle = LifecycleManager::new(repository.clone(), validators, config.clone());
        Ok(Self {
            repository,
            correlations,
            ownership,
            lifecycle,
            config,
        })
    }

    /// A page request using the configured default page size.
    #[must_use]
    pub fn default_page(&self) -> PageRequest {
        PageRequest::new(self.config.default_page_size)
    }

    fn external_system<'a>(
        &self,
        caller: &'a CallerIdentity,
        operation: &str,
    ) -> SyncResult<&'a ExternalSystemKey> {
        caller.external_system.as_ref().ok_or_else(|| {
            SyncError::invalid_parameter(
                "external_system",
                format!("{operation} requires an external system identity"),
            )
        })
    }

    fn check_page(&self, page: &PageRequest) -> SyncResult<()> {
        if page.page_size == 0 {
            return Err(SyncError::invalid_parameter("page_size", "must be non-zero"));
        }
        if page.page_size > self.config.max_page_size {
            return Err(SyncError::invalid_parameter(
                "page_size",
                format!("must not exceed {}", self.config.max_page_size),
            ));
        }
        Ok(())
    }

    // ---- element write operations ----

    /// Create an element, or correlate to an existing one.
    ///
    /// When an external identifier is supplied and already resolves, the
    /// call is treated as a merge update of the existing element instead of
    /// a fresh create, and the existing internal id is returned — external
    /// callers always receive the internal id, never another system's
    /// identifiers. Creation under a contested external identifier is
    /// serialized by the correlation store, so concurrent creates produce
    /// exactly one element.
    #[instrument(skip(self, properties, options), fields(user = %caller.user_id, element_type = %element_type))]
    pub async fn create_element(
        &self,
        caller: &CallerIdentity,
        element_type: ElementType,
        properties: PropertyBag,
        options: CreateOptions,
    ) -> SyncResult<ElementId> {
        let Some(external_identifier) = options.external_identifier.as_deref() else {
            if options.is_home {
                return Err(SyncError::invalid_parameter(
                    "is_home",
                    "home registration requires an external identifier",
                ));
            }
            return self
                .insert_new_element(caller, element_type, properties, &options)
                .await;
        };

        if external_identifier.is_empty() {
            return Err(SyncError::invalid_parameter(
                "external_identifier",
                "must not be empty",
            ));
        }
        let system = self.external_system(caller, "create with external identifier")?;

        // Fast path: known identifier, treat as update (idempotent create).
        if let Some(existing) = self.correlations.resolve(system.id, external_identifier).await? {
            debug!(element = %existing, "External identifier already correlated; applying as update");
            self.update_element(
                caller,
                existing,
                properties,
                UpdateMode::Merge,
                Some(external_identifier),
            )
            .await?;
            if options.is_home {
                self.correlations.set_home(existing, system.id).await?;
            }
            return Ok(existing);
        }

        // The element and its first correlation go into the store in one
        // atomic insert keyed on (system, identifier): a stored correlation
        // always has its element, and a creator that loses the race inserts
        // nothing, so there is no provisional row to clean up.
        let element = self.build_element(caller, element_type, properties.clone(), &options);
        let id = element.id;
        self.validate_new(&element).await?;
        let candidate = ExternalCorrelation::new(
            id,
            system,
            external_identifier,
            false,
            element.current_version,
            options.correlation_properties.clone(),
        );

        match self
            .repository
            .insert_correlated_element(element, candidate)
            .await?
        {
            CorrelationInsert::Created(_) => {
                if options.is_home {
                    self.correlations.set_home(id, system.id).await?;
                }
                info!(element = %id, identifier = external_identifier, "Element created and correlated");
                Ok(id)
            }
            CorrelationInsert::Existing(existing) => {
                // Lost the creation race (or resolve raced an insert):
                // apply as update of the element that won.
                let winner = existing.element_id;
                self.update_element(
                    caller,
                    winner,
                    properties,
                    UpdateMode::Merge,
                    Some(external_identifier),
                )
                .await?;
                if options.is_home {
                    self.correlations.set_home(winner, system.id).await?;
                }
                Ok(winner)
            }
        }
    }

    fn build_element(
        &self,
        caller: &CallerIdentity,
        element_type: ElementType,
        properties: PropertyBag,
        options: &CreateOptions,
    ) -> Element {
        let mut element = Element::new(element_type, properties, caller.user_id.clone())
            .with_effectivity(options.effective_from, options.effective_to);
        if let Some(anchor) = options.anchor_id {
            element = element.with_anchor(anchor);
        }
        element
    }

    async fn insert_new_element(
        &self,
        caller: &CallerIdentity,
        element_type: ElementType,
        properties: PropertyBag,
        options: &CreateOptions,
    ) -> SyncResult<ElementId> {
        let element = self.build_element(caller, element_type, properties, options);
        let id = element.id;
        self.validate_new(&element).await?;
        self.repository.insert_element(element).await?;
        info!(element = %id, "Element created");
        Ok(id)
    }

    async fn validate_new(&self, element: &Element) -> SyncResult<()> {
        self.lifecycle_validators()
            .validate(element.element_type, &element.properties)?;
        if let Some(anchor) = element.anchor_id {
            if self.repository.element(anchor).await?.is_none() {
                return Err(SyncError::not_found("Element", anchor));
            }
        }
        Ok(())
    }

    fn lifecycle_validators(&self) -> &ValidatorRegistry {
        self.lifecycle.validators()
    }

    /// Update an element's properties.
    ///
    /// Ownership check, merge resolution, versioned write and correlation
    /// bookkeeping, in that order. A supplied external identifier upserts
    /// the caller's correlation when it is missing.
    #[instrument(skip(self, incoming), fields(user = %caller.user_id, element = %element_id, mode = %mode))]
    pub async fn update_element(
        &self,
        caller: &CallerIdentity,
        element_id: ElementId,
        incoming: PropertyBag,
        mode: UpdateMode,
        external_identifier: Option<&str>,
    ) -> SyncResult<Element> {
        self.ownership.check_write(element_id, caller).await?;

        let updated = self
            .lifecycle
            .update(element_id, &incoming, mode, &caller.user_id)
            .await?;

        if let Some(system) = caller.external_system.as_ref() {
            if let Some(identifier) = external_identifier {
                if self
                    .correlations
                    .correlation_for(element_id, system.id)
                    .await?
                    .is_none()
                {
                    self.correlations
                        .create(
                            element_id,
                            system,
                            identifier,
                            false,
                            updated.current_version,
                            PropertyBag::new(),
                        )
                        .await?;
                }
            }
            self.correlations
                .record_synchronized_version(element_id, system.id, updated.current_version)
                .await?;
        }

        Ok(updated)
    }

    /// Archive (soft-delete) an element. It remains visible to lineage
    /// reads.
    #[instrument(skip(self, archive_properties), fields(user = %caller.user_id, element = %element_id))]
    pub async fn archive_element(
        &self,
        caller: &CallerIdentity,
        element_id: ElementId,
        archive_properties: Option<PropertyBag>,
    ) -> SyncResult<Element> {
        self.ownership.check_write(element_id, caller).await?;
        self.lifecycle
            .archive(element_id, archive_properties.as_ref(), &caller.user_id)
            .await
    }

    /// Revert an element's properties to the immediately preceding version,
    /// as a new version.
    #[instrument(skip(self), fields(user = %caller.user_id, element = %element_id))]
    pub async fn undo_element_update(
        &self,
        caller: &CallerIdentity,
        element_id: ElementId,
    ) -> SyncResult<Element> {
        self.ownership.check_write(element_id, caller).await?;
        let restored = self.lifecycle.undo(element_id, &caller.user_id).await?;

        if let Some(system) = caller.external_system.as_ref() {
            self.correlations
                .record_synchronized_version(element_id, system.id, restored.current_version)
                .await?;
        }
        Ok(restored)
    }

    /// Permanently remove an element, cascading to anchored children and
    /// incident relationships. Safe to retry until the cascade completes.
    #[instrument(skip(self), fields(user = %caller.user_id, element = %element_id))]
    pub async fn remove_element(
        &self,
        caller: &CallerIdentity,
        element_id: ElementId,
    ) -> SyncResult<()> {
        self.ownership.check_write(element_id, caller).await?;
        self.lifecycle.remove(element_id).await
    }

    // ---- correlation operations ----

    /// Mark the calling external system as home for an element.
    pub async fn set_home(
        &self,
        caller: &CallerIdentity,
        element_id: ElementId,
    ) -> SyncResult<()> {
        let system = self.external_system(caller, "set_home")?;
        self.correlations.set_home(element_id, system.id).await
    }

    /// Remove the calling system's correlation with an element, leaving the
    /// element itself untouched.
    pub async fn remove_correlation(
        &self,
        caller: &CallerIdentity,
        element_id: ElementId,
    ) -> SyncResult<()> {
        let system = self.external_system(caller, "remove_correlation")?;
        self.correlations.remove(system.id, element_id).await
    }

    /// The calling system's own correlation record for an element.
    pub async fn own_correlation(
        &self,
        caller: &CallerIdentity,
        element_id: ElementId,
    ) -> SyncResult<Option<ExternalCorrelation>> {
        let system = self.external_system(caller, "own_correlation")?;
        self.correlations.correlation_for(element_id, system.id).await
    }

    // ---- element read operations ----

    /// Fetch one element under the given scope.
    ///
    /// Returns `None` when the element does not exist or falls outside the
    /// scope. A duplicate redirects to its designated master (one hop).
    pub async fn get_element(
        &self,
        element_id: ElementId,
        scope: &QueryScope,
    ) -> SyncResult<Option<Element>> {
        let Some(element) = self.repository.element(element_id).await? else {
            return Ok(None);
        };
        match effectivity::admit(&element, scope) {
            Admission::Include => Ok(Some(element)),
            Admission::Exclude => Ok(None),
            Admission::Redirect(master) => {
                let Some(master) = self.repository.element(master).await? else {
                    return Ok(None);
                };
                match effectivity::admit(&master, scope) {
                    Admission::Include => Ok(Some(master)),
                    _ => Ok(None),
                }
            }
        }
    }

    /// Scan elements, optionally restricted to one type, under the given
    /// scope.
    ///
    /// Duplicates collapse into their master (dedicated by id) unless the
    /// scope asks for duplicate processing.
    pub async fn find_elements(
        &self,
        element_type: Option<ElementType>,
        scope: &QueryScope,
        page: &PageRequest,
    ) -> SyncResult<Vec<Element>> {
        self.check_page(page)?;

        let candidates = self.repository.elements_by_type(element_type).await?;
        let mut surviving = Vec::new();
        let mut seen: HashSet<ElementId> = HashSet::new();

        for candidate in candidates {
            match effectivity::admit(&candidate, scope) {
                Admission::Include => {
                    if seen.insert(candidate.id) {
                        surviving.push(candidate);
                    }
                }
                Admission::Exclude => {}
                Admission::Redirect(master_id) => {
                    if seen.insert(master_id) {
                        if let Some(master) = self.repository.element(master_id).await? {
                            if effectivity::admit(&master, scope) == Admission::Include {
                                surviving.push(master);
                            }
                        }
                    }
                }
            }
        }

        Ok(surviving
            .into_iter()
            .skip(page.start_from)
            .take(page.page_size)
            .collect())
    }

    // ---- relationship operations ----

    /// Create a typed relationship between two existing elements.
    #[instrument(skip(self, properties), fields(user = %caller.user_id, relationship_type))]
    pub async fn setup_relationship(
        &self,
        caller: &CallerIdentity,
        relationship_type: &str,
        end_one: ElementId,
        end_two: ElementId,
        properties: PropertyBag,
        status: Option<RelationshipStatus>,
        effective_from: Option<DateTime<Utc>>,
        effective_to: Option<DateTime<Utc>>,
    ) -> SyncResult<RelationshipId> {
        if relationship_type.is_empty() {
            return Err(SyncError::invalid_parameter(
                "relationship_type",
                "must not be empty",
            ));
        }
        for end in [end_one, end_two] {
            if self.repository.element(end).await?.is_none() {
                return Err(SyncError::not_found("Element", end));
            }
        }

        let mut relationship = Relationship::new(relationship_type, end_one, end_two, properties);
        if let Some(status) = status {
            relationship.status = status;
        }
        relationship.effective_from = effective_from;
        relationship.effective_to = effective_to;

        let id = relationship.id;
        self.repository.insert_relationship(relationship).await?;
        info!(relationship = %id, "Relationship created");
        Ok(id)
    }

    /// Update a relationship's properties and/or status.
    #[instrument(skip(self, incoming), fields(user = %caller.user_id, relationship = %relationship_id))]
    pub async fn update_relationship(
        &self,
        caller: &CallerIdentity,
        relationship_id: RelationshipId,
        incoming: PropertyBag,
        mode: UpdateMode,
        status: Option<RelationshipStatus>,
    ) -> SyncResult<Relationship> {
        let current = self
            .repository
            .relationship(relationship_id)
            .await?
            .ok_or_else(|| SyncError::not_found("Relationship", relationship_id))?;

        let mut updated = current.clone();
        updated.properties = merge::apply(&current.properties, &incoming, mode);
        if let Some(status) = status {
            updated.status = status;
        }
        updated.updated_at = Utc::now();

        if !self.repository.update_relationship(updated.clone()).await? {
            return Err(SyncError::not_found("Relationship", relationship_id));
        }
        Ok(updated)
    }

    /// Remove a relationship.
    #[instrument(skip(self), fields(user = %caller.user_id, relationship = %relationship_id))]
    pub async fn clear_relationship(
        &self,
        caller: &CallerIdentity,
        relationship_id: RelationshipId,
    ) -> SyncResult<()> {
        if !self.repository.delete_relationship(relationship_id).await? {
            return Err(SyncError::not_found("Relationship", relationship_id));
        }
        Ok(())
    }

    /// Relationships incident to an element, filtered by the scope's
    /// validity window.
    pub async fn element_relationships(
        &self,
        element_id: ElementId,
        scope: &QueryScope,
        page: &PageRequest,
    ) -> SyncResult<Vec<Relationship>> {
        self.check_page(page)?;
        let relationships = self.repository.relationships_for_element(element_id).await?;
        Ok(relationships
            .into_iter()
            .filter(|r| effectivity::admit_relationship(r, scope))
            .skip(page.start_from)
            .take(page.page_size)
            .collect())
    }
}
