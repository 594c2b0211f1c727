//! # Synchronization Engine
//!
//! Correlation and synchronization core for the meridian metadata catalog.
//!
//! The catalog represents the *same* real-world object — a glossary term, a
//! connection, an asset — as defined independently by multiple external
//! asset managers, while keeping one unified, internally-owned record. This
//! crate is the engine behind that: it maps each external system's private
//! identifier to the canonical internal element, decides which system owns
//! an element, applies external updates under merge-vs-replace semantics,
//! scopes every read by effective time and lineage policy, and drives the
//! archive / undo / remove lifecycle.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                    SyncOrchestrator                          │
//! │  create / update / archive / undo / remove / get / find      │
//! └────┬──────────────┬──────────────┬──────────────┬────────────┘
//!      │              │              │              │
//!      ▼              ▼              ▼              ▼
//! ┌──────────┐  ┌───────────┐  ┌──────────┐  ┌────────────────┐
//! │Correlation│ │ Ownership │  │  Merge   │  │   Lifecycle    │
//! │ Service  │  │   Guard   │  │ Resolver │  │    Manager     │
//! └────┬─────┘  └─────┬─────┘  └──────────┘  └───────┬────────┘
//!      │              │                              │
//!      └──────────────┴──────────┬───────────────────┘
//!                                ▼
//!                   ┌─────────────────────────┐
//!                   │   MetadataRepository    │  (injected seam;
//!                   │  insert-if-absent, CAS  │   MemoryRepository
//!                   └─────────────────────────┘   is the reference)
//! ```
//!
//! Every read path passes candidates through the effectivity filter
//! ([`effectivity::admit`]) so effective-time, lineage and duplicate
//! suppression behave identically for every element type.
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//! use meridian_core::{CallerIdentity, ElementType, ExternalSystemId, PropertyBag};
//! use meridian_sync::{
//!     CreateOptions, MemoryRepository, QueryScope, SyncConfig, SyncOrchestrator,
//! };
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> meridian_sync::SyncResult<()> {
//! let repository = Arc::new(MemoryRepository::new());
//! let orchestrator = SyncOrchestrator::new(repository, SyncConfig::default())?;
//!
//! let connector = CallerIdentity::external("connector", ExternalSystemId::new(), "DataHubX");
//!
//! // Create-or-correlate: the external identifier makes this idempotent.
//! let options = CreateOptions::new()
//!     .with_external_identifier("term-42")
//!     .as_home();
//! let id = orchestrator
//!     .create_element(
//!         &connector,
//!         ElementType::GlossaryTerm,
//!         PropertyBag::new().with("displayName", "Customer"),
//!         options,
//!     )
//!     .await?;
//!
//! let element = orchestrator.get_element(id, &QueryScope::any_time()).await?;
//! assert!(element.is_some());
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod correlation;
pub mod effectivity;
pub mod error;
pub mod exchange;
pub mod lifecycle;
pub mod memory;
pub mod merge;
pub mod orchestrator;
pub mod ownership;
pub mod repository;
pub mod validate;

pub use config::SyncConfig;
pub use correlation::CorrelationService;
pub use effectivity::{Admission, QueryScope};
pub use error::{SyncError, SyncResult};
pub use exchange::ElementExchange;
pub use lifecycle::LifecycleManager;
pub use memory::MemoryRepository;
pub use merge::UpdateMode;
pub use orchestrator::{CreateOptions, PageRequest, SyncOrchestrator};
pub use ownership::OwnershipGuard;
pub use repository::{CorrelationInsert, HomeClaim, MetadataRepository};
pub use validate::{GlossaryTermValidator, PropertyValidator, ValidatorRegistry};
