//! Repository seam
//!
//! The storage engine is an external collaborator; the engine talks to it
//! through this trait only. Implementations must provide three atomic
//! primitives on top of plain CRUD:
//!
//! - **insert-if-absent** for correlations, keyed on
//!   (external system id, external identifier);
//! - **correlated element insert**: a fresh element together with its first
//!   correlation, all-or-nothing under the same key, so two concurrent
//!   creates referencing the same external identifier produce exactly one
//!   element and a lost race leaves nothing behind;
//! - **compare-and-swap** on an element's write token, so concurrent
//!   writes cannot silently overwrite each other.
//!
//! The write token is the (current version, state) pair: update and undo
//! bump the version, archive flips the state one way without a version
//! bump, so every element write moves the token and the pair never
//! repeats.
//!
//! [`MemoryRepository`](crate::memory::MemoryRepository) is the reference
//! implementation used by embedders and tests.

use async_trait::async_trait;

use meridian_core::{
    CorrelationId, Element, ElementId, ElementState, ElementType, ExternalCorrelation,
    ExternalSystemId, Relationship, RelationshipId, RepositoryResult, VersionRecord,
};

/// Outcome of the atomic correlation insert-if-absent primitive.
#[derive(Debug, Clone)]
pub enum CorrelationInsert {
    /// No correlation existed for the key; the supplied record was stored.
    Created(CorrelationId),

    /// A correlation already existed for the key; the stored record is
    /// returned untouched.
    Existing(ExternalCorrelation),
}

/// Outcome of the atomic home-claim primitive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HomeClaim {
    /// The claim succeeded; the system is now home for the element.
    Claimed,

    /// The system already held home; nothing changed.
    AlreadyHome,

    /// A different system holds home for the element.
    ConflictingHome(ExternalSystemId),

    /// The system has no correlation with the element to mark as home.
    CorrelationMissing,
}

/// Entity/relationship storage with temporal versioning, as assumed by the
/// synchronization engine.
///
/// All methods are cancel-safe in the sense that a repeated call after a
/// failure observes a consistent store; the engine's cascade logic relies
/// on this to make `remove` retryable to completion.
#[async_trait]
pub trait MetadataRepository: Send + Sync {
    // ---- elements ----

    /// Insert a new element. The id is freshly minted by the caller and
    /// must not already exist.
    async fn insert_element(&self, element: Element) -> RepositoryResult<()>;

    /// Fetch an element by id.
    async fn element(&self, id: ElementId) -> RepositoryResult<Option<Element>>;

    /// Compare-and-swap write: persist `updated` only when the stored
    /// element's write token — its (`current_version`, `state`) pair —
    /// matches (`expected_version`, `expected_state`).
    ///
    /// Comparing the state as well as the version is what serializes
    /// archive against updates: archive changes the state without a
    /// version bump, and a writer that read the pre-archive row must lose.
    ///
    /// Returns `Ok(true)` when the write won, `Ok(false)` when the race was
    /// lost or the element no longer exists.
    async fn update_element(
        &self,
        expected_version: u64,
        expected_state: ElementState,
        updated: Element,
    ) -> RepositoryResult<bool>;

    /// Hard-delete an element row. Returns whether a row was removed.
    async fn delete_element(&self, id: ElementId) -> RepositoryResult<bool>;

    /// All elements, optionally restricted to one type.
    ///
    /// Effectivity and lineage policy are deliberately *not* applied here;
    /// the engine filters candidates itself so policy lives in one place.
    async fn elements_by_type(
        &self,
        element_type: Option<ElementType>,
    ) -> RepositoryResult<Vec<Element>>;

    /// Ids of elements whose `anchor_id` equals the given element.
    async fn anchored_children(&self, anchor_id: ElementId) -> RepositoryResult<Vec<ElementId>>;

    // ---- correlations ----

    /// Atomically insert a fresh element together with its first
    /// correlation, keyed on (external system id, external identifier).
    ///
    /// All-or-nothing: when the key is already mapped, neither row is
    /// written and the stored correlation is returned, so a creator that
    /// loses the race has nothing to clean up and a stored correlation
    /// always points at an element that exists.
    async fn insert_correlated_element(
        &self,
        element: Element,
        correlation: ExternalCorrelation,
    ) -> RepositoryResult<CorrelationInsert>;

    /// Atomically insert a correlation keyed on
    /// (external system id, external identifier), or return the existing
    /// record when the key is already mapped.
    async fn insert_correlation_if_absent(
        &self,
        correlation: ExternalCorrelation,
    ) -> RepositoryResult<CorrelationInsert>;

    /// Fetch a correlation by its unique key.
    async fn correlation(
        &self,
        system_id: ExternalSystemId,
        external_identifier: &str,
    ) -> RepositoryResult<Option<ExternalCorrelation>>;

    /// All correlations pointing at the given element.
    async fn correlations_for_element(
        &self,
        element_id: ElementId,
    ) -> RepositoryResult<Vec<ExternalCorrelation>>;

    /// Overwrite a correlation record (matched by its key). Returns whether
    /// a record was updated.
    async fn update_correlation(
        &self,
        correlation: ExternalCorrelation,
    ) -> RepositoryResult<bool>;

    /// Remove the correlation between one system and one element. Returns
    /// whether a record was removed.
    async fn delete_correlation(
        &self,
        system_id: ExternalSystemId,
        element_id: ElementId,
    ) -> RepositoryResult<bool>;

    /// Atomically mark the (element, system) correlation as home, failing
    /// the claim when another system already holds home for the element.
    async fn claim_home(
        &self,
        element_id: ElementId,
        system_id: ExternalSystemId,
    ) -> RepositoryResult<HomeClaim>;

    // ---- version history ----

    /// Store a version snapshot. Writing the same (element, version) twice
    /// is permitted and idempotent — concurrent losing writers snapshot the
    /// identical state.
    async fn push_version(&self, record: VersionRecord) -> RepositoryResult<()>;

    /// Fetch one version snapshot.
    async fn version(
        &self,
        element_id: ElementId,
        version: u64,
    ) -> RepositoryResult<Option<VersionRecord>>;

    /// Drop snapshots older than the newest `keep_latest` generations.
    async fn prune_versions(
        &self,
        element_id: ElementId,
        keep_latest: u64,
    ) -> RepositoryResult<()>;

    /// Drop all snapshots for an element (hard delete path).
    async fn delete_versions(&self, element_id: ElementId) -> RepositoryResult<()>;

    // ---- relationships ----

    /// Insert a new relationship.
    async fn insert_relationship(&self, relationship: Relationship) -> RepositoryResult<()>;

    /// Fetch a relationship by id.
    async fn relationship(
        &self,
        id: RelationshipId,
    ) -> RepositoryResult<Option<Relationship>>;

    /// Overwrite a relationship. Returns whether a record was updated.
    async fn update_relationship(&self, relationship: Relationship) -> RepositoryResult<bool>;

    /// Remove a relationship. Returns whether a record was removed.
    async fn delete_relationship(&self, id: RelationshipId) -> RepositoryResult<bool>;

    /// All relationships incident to the given element, at either end.
    async fn relationships_for_element(
        &self,
        element_id: ElementId,
    ) -> RepositoryResult<Vec<Relationship>>;
}
