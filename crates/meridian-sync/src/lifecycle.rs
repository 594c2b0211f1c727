//! Version/lifecycle manager
//!
//! Drives the element state machine: ACTIVE → ARCHIVED → removed, with
//! strictly increasing versions and single-step undo. Every mutation goes
//! through the repository's compare-and-swap on the element's write token,
//! the (current version, state) pair, retried up to the configured budget,
//! so concurrent writers linearize per element. Archive keeps the version
//! but flips the state, which still moves the token, so archive and remove
//! take the same serialization point as update.
//!
//! Undo is copy-forward: it restores the properties of `version - 1` as a
//! new `version + 1`, so version numbers never decrease and repeated undo
//! alternates between the two most recent property sets.
//!
//! Remove cascades to anchored children (children first, anchor last) and
//! to incident relationships. An interrupted cascade leaves the anchor in
//! place, so retrying `remove` completes the cascade.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, instrument, warn};

use meridian_core::{Element, ElementId, ElementState, PropertyBag, VersionRecord};

use crate::config::SyncConfig;
use crate::error::{SyncError, SyncResult};
use crate::merge::{self, UpdateMode};
use crate::repository::MetadataRepository;
use crate::validate::ValidatorRegistry;

/// Service for element version and lifecycle transitions.
#[derive(Clone)]
pub struct LifecycleManager {
    repository: Arc<dyn MetadataRepository>,
    validators: Arc<ValidatorRegistry>,
    config: SyncConfig,
}

impl LifecycleManager {
    /// Create a new lifecycle manager.
    #[must_use]
    pub fn new(
        repository: Arc<dyn MetadataRepository>,
        validators: Arc<ValidatorRegistry>,
        config: SyncConfig,
    ) -> Self {
        Self {
            repository,
            validators,
            config,
        }
    }

    /// The validator registry shared with the orchestrator.
    pub(crate) fn validators(&self) -> &ValidatorRegistry {
        &self.validators
    }

    async fn fetch(&self, element_id: ElementId) -> SyncResult<Element> {
        self.repository
            .element(element_id)
            .await?
            .ok_or_else(|| SyncError::not_found("Element", element_id))
    }

    /// Apply an incoming property set to an element.
    ///
    /// Allowed on active and archived elements (archived elements may still
    /// be corrected). The current properties are snapshotted to history,
    /// the merge resolver produces the new bag, and the version increments
    /// under compare-and-swap. A losing writer re-reads the merged base and
    /// reapplies, up to the retry budget.
    #[instrument(skip(self, incoming), fields(element = %element_id, mode = %mode))]
    pub async fn update(
        &self,
        element_id: ElementId,
        incoming: &PropertyBag,
        mode: UpdateMode,
        user_id: &str,
    ) -> SyncResult<Element> {
        let mut attempts = 0;
        loop {
            let current = self.fetch(element_id).await?;
            let merged = merge::apply(&current.properties, incoming, mode);
            self.validators
                .validate(current.element_type, &merged)?;

            // Snapshot what the new version supersedes. Idempotent if a
            // concurrent writer snapshots the same state.
            self.repository
                .push_version(VersionRecord {
                    element_id,
                    version: current.current_version,
                    properties: current.properties.clone(),
                    recorded_at: Utc::now(),
                    recorded_by: user_id.to_string(),
                })
                .await?;

            let mut updated = current.clone();
            updated.properties = merged;
            updated.current_version += 1;
            updated.updated_at = Utc::now();
            updated.last_updated_by = user_id.to_string();

            if self
                .repository
                .update_element(current.current_version, current.state, updated.clone())
                .await?
            {
                self.repository
                    .prune_versions(element_id, self.config.version_history_depth)
                    .await?;
                info!(version = updated.current_version, "Element updated");
                return Ok(updated);
            }

            attempts += 1;
            if attempts >= self.config.max_retry_attempts {
                return Err(SyncError::ConcurrentModification {
                    element_id,
                    attempts,
                });
            }
            debug!(attempt = attempts, "Version race lost, re-reading");
        }
    }

    /// Soft-delete an element: ACTIVE → ARCHIVED, no version bump.
    ///
    /// The state flip moves the write token, so an update that read the
    /// pre-archive row loses its compare-and-swap and re-reads.
    ///
    /// The element stays fully queryable with a lineage scope. Optional
    /// archive properties (archive date, archiving process, ...) are merged
    /// into the property bag.
    #[instrument(skip(self, archive_properties), fields(element = %element_id))]
    pub async fn archive(
        &self,
        element_id: ElementId,
        archive_properties: Option<&PropertyBag>,
        user_id: &str,
    ) -> SyncResult<Element> {
        let mut attempts = 0;
        loop {
            let current = self.fetch(element_id).await?;
            if current.is_archived() {
                return Err(SyncError::invalid_parameter(
                    "element_id",
                    format!("element {element_id} is already archived"),
                ));
            }

            let mut updated = current.clone();
            if let Some(props) = archive_properties {
                updated.properties = merge::apply(&updated.properties, props, UpdateMode::Merge);
            }
            updated.state = ElementState::Archived;
            updated.updated_at = Utc::now();
            updated.last_updated_by = user_id.to_string();

            if self
                .repository
                .update_element(current.current_version, current.state, updated.clone())
                .await?
            {
                info!("Element archived");
                return Ok(updated);
            }

            attempts += 1;
            if attempts >= self.config.max_retry_attempts {
                return Err(SyncError::ConcurrentModification {
                    element_id,
                    attempts,
                });
            }
        }
    }

    /// Restore the properties of the immediately preceding version as a new
    /// version.
    ///
    /// Copy-forward, never decrementing: undoing version `n` stores the
    /// state of `n - 1` as version `n + 1`. Fails with `NoPriorVersion`
    /// when the element has only one version. Archive state is untouched —
    /// archiving and undo are independent axes.
    #[instrument(skip(self), fields(element = %element_id))]
    pub async fn undo(&self, element_id: ElementId, user_id: &str) -> SyncResult<Element> {
        let mut attempts = 0;
        loop {
            let current = self.fetch(element_id).await?;
            if current.current_version <= current.created_version {
                return Err(SyncError::NoPriorVersion { element_id });
            }

            let prior = self
                .repository
                .version(element_id, current.current_version - 1)
                .await?
                .ok_or(SyncError::NoPriorVersion { element_id })?;

            self.repository
                .push_version(VersionRecord {
                    element_id,
                    version: current.current_version,
                    properties: current.properties.clone(),
                    recorded_at: Utc::now(),
                    recorded_by: user_id.to_string(),
                })
                .await?;

            let mut updated = current.clone();
            updated.properties = prior.properties;
            updated.current_version += 1;
            updated.updated_at = Utc::now();
            updated.last_updated_by = user_id.to_string();

            if self
                .repository
                .update_element(current.current_version, current.state, updated.clone())
                .await?
            {
                self.repository
                    .prune_versions(element_id, self.config.version_history_depth)
                    .await?;
                info!(
                    restored = current.current_version - 1,
                    version = updated.current_version,
                    "Element restored by undo"
                );
                return Ok(updated);
            }

            attempts += 1;
            if attempts >= self.config.max_retry_attempts {
                return Err(SyncError::ConcurrentModification {
                    element_id,
                    attempts,
                });
            }
        }
    }

    /// Permanently remove an element, cascading to every element anchored
    /// to it (transitively) and to all incident relationships.
    ///
    /// Children are purged before the anchor, so a cascade interrupted by a
    /// repository failure leaves the anchor present and a repeated call
    /// completes the remainder. Fails with `NotFound` when the element is
    /// already gone.
    #[instrument(skip(self), fields(element = %element_id))]
    pub async fn remove(&self, element_id: ElementId) -> SyncResult<()> {
        if self.repository.element(element_id).await?.is_none() {
            return Err(SyncError::not_found("Element", element_id));
        }

        // Transitive closure of anchored children, deepest purged first.
        let mut ordered = Vec::new();
        let mut seen: HashSet<ElementId> = HashSet::from([element_id]);
        let mut frontier = vec![element_id];
        while let Some(next) = frontier.pop() {
            for child in self.repository.anchored_children(next).await? {
                if seen.insert(child) {
                    ordered.push(child);
                    frontier.push(child);
                }
            }
        }

        for child in ordered.iter().rev() {
            self.purge(*child).await?;
        }
        self.purge(element_id).await?;

        info!(cascaded = ordered.len(), "Element removed");
        Ok(())
    }

    /// Delete one element row plus its relationships, correlations and
    /// version history. Safe to call for an element a previous attempt
    /// already purged.
    async fn purge(&self, element_id: ElementId) -> SyncResult<()> {
        for relationship in self.repository.relationships_for_element(element_id).await? {
            self.repository.delete_relationship(relationship.id).await?;
        }
        for correlation in self.repository.correlations_for_element(element_id).await? {
            self.repository
                .delete_correlation(correlation.external_system_id, element_id)
                .await?;
        }
        self.repository.delete_versions(element_id).await?;
        if !self.repository.delete_element(element_id).await? {
            // Already gone: an earlier interrupted cascade got this far.
            warn!(element = %element_id, "Purge target was already removed");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryRepository;
    use meridian_core::ElementType;
    use serde_json::json;

    fn manager() -> (LifecycleManager, Arc<MemoryRepository>) {
        let repo = Arc::new(MemoryRepository::new());
        let manager = LifecycleManager::new(
            repo.clone(),
            Arc::new(ValidatorRegistry::new()),
            SyncConfig::default(),
        );
        (manager, repo)
    }

    async fn seed(repo: &MemoryRepository, properties: PropertyBag) -> ElementId {
        let element = Element::new(ElementType::GlossaryTerm, properties, "user1");
        let id = element.id;
        repo.insert_element(element).await.unwrap();
        id
    }

    mod update_tests {
        use super::*;

        #[tokio::test]
        async fn test_update_increments_version_and_snapshots() {
            let (manager, repo) = manager();
            let id = seed(&repo, PropertyBag::new().with("a", 1)).await;

            let updated = manager
                .update(
                    id,
                    &PropertyBag::new().with("a", 2),
                    UpdateMode::Merge,
                    "user2",
                )
                .await
                .unwrap();

            assert_eq!(updated.current_version, 2);
            assert_eq!(updated.last_updated_by, "user2");

            let snapshot = repo.version(id, 1).await.unwrap().unwrap();
            assert_eq!(snapshot.properties.get("a"), Some(&json!(1)));
        }

        #[tokio::test]
        async fn test_update_missing_element_is_not_found() {
            let (manager, _) = manager();
            let err = manager
                .update(
                    ElementId::new(),
                    &PropertyBag::new(),
                    UpdateMode::Merge,
                    "user1",
                )
                .await
                .unwrap_err();
            assert!(matches!(err, SyncError::NotFound { .. }));
        }

        #[tokio::test]
        async fn test_archived_element_may_still_be_corrected() {
            let (manager, repo) = manager();
            let id = seed(&repo, PropertyBag::new().with("a", 1)).await;

            manager.archive(id, None, "user1").await.unwrap();
            let updated = manager
                .update(
                    id,
                    &PropertyBag::new().with("a", 2),
                    UpdateMode::Merge,
                    "user1",
                )
                .await
                .unwrap();

            assert!(updated.is_archived());
            assert_eq!(updated.properties.get("a"), Some(&json!(2)));
        }

        #[tokio::test]
        async fn test_sequential_updates_are_strictly_increasing() {
            let (manager, repo) = manager();
            let id = seed(&repo, PropertyBag::new()).await;

            for expected in 2..=6 {
                let updated = manager
                    .update(
                        id,
                        &PropertyBag::new().with("n", expected),
                        UpdateMode::Merge,
                        "user1",
                    )
                    .await
                    .unwrap();
                assert_eq!(updated.current_version, expected);
            }
        }
    }

    mod archive_tests {
        use super::*;

        #[tokio::test]
        async fn test_archive_does_not_bump_version() {
            let (manager, repo) = manager();
            let id = seed(&repo, PropertyBag::new()).await;

            let archived = manager
                .archive(
                    id,
                    Some(&PropertyBag::new().with("archiveProcess", "cleanup")),
                    "user1",
                )
                .await
                .unwrap();

            assert!(archived.is_archived());
            assert_eq!(archived.current_version, 1);
            assert_eq!(archived.properties.get_string("archiveProcess"), Some("cleanup"));
        }

        #[tokio::test]
        async fn test_double_archive_is_rejected() {
            let (manager, repo) = manager();
            let id = seed(&repo, PropertyBag::new()).await;

            manager.archive(id, None, "user1").await.unwrap();
            let err = manager.archive(id, None, "user1").await.unwrap_err();
            assert!(matches!(err, SyncError::InvalidParameter { .. }));
        }
    }

    mod undo_tests {
        use super::*;

        #[tokio::test]
        async fn test_undo_is_copy_forward() {
            let (manager, repo) = manager();
            let id = seed(&repo, PropertyBag::new().with("a", "original")).await;

            manager
                .update(
                    id,
                    &PropertyBag::new().with("a", "changed"),
                    UpdateMode::Merge,
                    "user1",
                )
                .await
                .unwrap();

            let restored = manager.undo(id, "user1").await.unwrap();
            assert_eq!(restored.current_version, 3);
            assert_eq!(restored.properties.get_string("a"), Some("original"));
        }

        #[tokio::test]
        async fn test_repeated_undo_alternates() {
            let (manager, repo) = manager();
            let id = seed(&repo, PropertyBag::new().with("a", "v1")).await;

            manager
                .update(id, &PropertyBag::new().with("a", "v2"), UpdateMode::Merge, "u")
                .await
                .unwrap();

            let first = manager.undo(id, "u").await.unwrap();
            assert_eq!(first.properties.get_string("a"), Some("v1"));

            let second = manager.undo(id, "u").await.unwrap();
            assert_eq!(second.properties.get_string("a"), Some("v2"));
            assert_eq!(second.current_version, 4);
        }

        #[tokio::test]
        async fn test_undo_single_version_fails() {
            let (manager, repo) = manager();
            let id = seed(&repo, PropertyBag::new()).await;

            let err = manager.undo(id, "user1").await.unwrap_err();
            assert!(matches!(err, SyncError::NoPriorVersion { .. }));
        }

        #[tokio::test]
        async fn test_undo_leaves_archive_state_alone() {
            let (manager, repo) = manager();
            let id = seed(&repo, PropertyBag::new().with("a", 1)).await;

            manager
                .update(id, &PropertyBag::new().with("a", 2), UpdateMode::Merge, "u")
                .await
                .unwrap();
            manager.archive(id, None, "u").await.unwrap();

            let restored = manager.undo(id, "u").await.unwrap();
            assert!(restored.is_archived());
            assert_eq!(restored.properties.get("a"), Some(&json!(1)));
        }
    }

    mod remove_tests {
        use super::*;
        use meridian_core::Relationship;

        #[tokio::test]
        async fn test_remove_cascades_to_anchored_children() {
            let (manager, repo) = manager();
            let anchor = seed(&repo, PropertyBag::new()).await;

            let mut children = Vec::new();
            for _ in 0..3 {
                let child = Element::new(ElementType::Comment, PropertyBag::new(), "u")
                    .with_anchor(anchor);
                children.push(child.id);
                repo.insert_element(child).await.unwrap();
            }
            // Grandchild anchored to the first child.
            let grandchild = Element::new(ElementType::Comment, PropertyBag::new(), "u")
                .with_anchor(children[0]);
            repo.insert_element(grandchild).await.unwrap();

            manager.remove(anchor).await.unwrap();
            assert_eq!(repo.element_count(), 0);
        }

        #[tokio::test]
        async fn test_remove_deletes_incident_relationships() {
            let (manager, repo) = manager();
            let a = seed(&repo, PropertyBag::new()).await;
            let b = seed(&repo, PropertyBag::new()).await;

            let rel = Relationship::new("term_relates_to_term", a, b, PropertyBag::new());
            let rel_id = rel.id;
            repo.insert_relationship(rel).await.unwrap();

            manager.remove(a).await.unwrap();
            assert!(repo.relationship(rel_id).await.unwrap().is_none());
            // The other endpoint survives.
            assert!(repo.element(b).await.unwrap().is_some());
        }

        #[tokio::test]
        async fn test_remove_already_removed_is_not_found() {
            let (manager, repo) = manager();
            let id = seed(&repo, PropertyBag::new()).await;

            manager.remove(id).await.unwrap();
            let err = manager.remove(id).await.unwrap_err();
            assert!(matches!(err, SyncError::NotFound { .. }));
        }
    }
}
