//! Typed exchange façade
//!
//! A thin per-element-type view over the shared orchestrator. Entity
//! façades hold a reference to the engine instead of inheriting its
//! operations, so adding a type costs one constructor call (plus a
//! validator, when the type has constraints) rather than a duplicated
//! CRUD family.

use std::sync::Arc;

use meridian_core::{CallerIdentity, Element, ElementId, ElementType, PropertyBag};

use crate::effectivity::QueryScope;
use crate::error::SyncResult;
use crate::merge::UpdateMode;
use crate::orchestrator::{CreateOptions, PageRequest, SyncOrchestrator};

/// An element-type-specific view of the synchronization engine.
#[derive(Clone)]
pub struct ElementExchange {
    orchestrator: Arc<SyncOrchestrator>,
    element_type: ElementType,
}

impl ElementExchange {
    /// Create a façade pinned to one element type.
    #[must_use]
    pub fn new(orchestrator: Arc<SyncOrchestrator>, element_type: ElementType) -> Self {
        Self {
            orchestrator,
            element_type,
        }
    }

    /// The element type this façade exchanges.
    #[must_use]
    pub fn element_type(&self) -> ElementType {
        self.element_type
    }

    /// Create (or correlate to) an element of this façade's type.
    pub async fn create(
        &self,
        caller: &CallerIdentity,
        properties: PropertyBag,
        options: CreateOptions,
    ) -> SyncResult<ElementId> {
        self.orchestrator
            .create_element(caller, self.element_type, properties, options)
            .await
    }

    /// Update an element of this façade's type.
    pub async fn update(
        &self,
        caller: &CallerIdentity,
        element_id: ElementId,
        incoming: PropertyBag,
        mode: UpdateMode,
        external_identifier: Option<&str>,
    ) -> SyncResult<Element> {
        self.orchestrator
            .update_element(caller, element_id, incoming, mode, external_identifier)
            .await
    }

    /// Archive an element of this façade's type.
    pub async fn archive(
        &self,
        caller: &CallerIdentity,
        element_id: ElementId,
        archive_properties: Option<PropertyBag>,
    ) -> SyncResult<Element> {
        self.orchestrator
            .archive_element(caller, element_id, archive_properties)
            .await
    }

    /// Undo the last update of an element of this façade's type.
    pub async fn undo(
        &self,
        caller: &CallerIdentity,
        element_id: ElementId,
    ) -> SyncResult<Element> {
        self.orchestrator.undo_element_update(caller, element_id).await
    }

    /// Permanently remove an element of this façade's type.
    pub async fn remove(
        &self,
        caller: &CallerIdentity,
        element_id: ElementId,
    ) -> SyncResult<()> {
        self.orchestrator.remove_element(caller, element_id).await
    }

    /// Fetch one element, `None` when it is not of this façade's type or
    /// falls outside the scope.
    pub async fn get(
        &self,
        element_id: ElementId,
        scope: &QueryScope,
    ) -> SyncResult<Option<Element>> {
        let element = self.orchestrator.get_element(element_id, scope).await?;
        Ok(element.filter(|e| e.element_type == self.element_type))
    }

    /// Scan elements of this façade's type.
    pub async fn find(
        &self,
        scope: &QueryScope,
        page: &PageRequest,
    ) -> SyncResult<Vec<Element>> {
        self.orchestrator
            .find_elements(Some(self.element_type), scope, page)
            .await
    }
}
