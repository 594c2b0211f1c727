//! Synchronization error types
//!
//! One taxonomy for the whole engine. Invariant violations
//! (`DuplicateCorrelation`, `HomeConflict`, `NotHome`) are terminal and
//! require the caller to resolve them; repository outages and lost
//! compare-and-swap races are retryable, which [`SyncError::is_retryable`]
//! reports.

use thiserror::Error;

use meridian_core::{ElementId, ExternalSystemId, RepositoryError};

/// Error that can occur during a synchronization operation.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Malformed input: null required field, unknown type name,
    /// out-of-range page parameters. Never retried.
    #[error("invalid parameter '{field}': {message}")]
    InvalidParameter { field: String, message: String },

    /// Incoming properties violate the target element type's constraints.
    #[error("invalid properties for {element_type}: {message}")]
    InvalidProperties {
        element_type: String,
        message: String,
    },

    /// Referenced element, correlation or relationship does not exist.
    #[error("{resource} not found: {id}")]
    NotFound { resource: &'static str, id: String },

    /// The (external system, external identifier) pair is already mapped to
    /// a different element.
    #[error(
        "external identifier '{external_identifier}' from system {external_system_id} \
         is already correlated to element {element_id}"
    )]
    DuplicateCorrelation {
        external_system_id: ExternalSystemId,
        external_identifier: String,
        element_id: ElementId,
    },

    /// Another external system already holds home ownership of the element.
    #[error("element {element_id} is already homed in external system {home_system_id}")]
    HomeConflict {
        element_id: ElementId,
        home_system_id: ExternalSystemId,
    },

    /// The caller is not the home system for the element it tried to write.
    #[error(
        "caller {caller} may not write element {element_id}: home is {home_system_id}"
    )]
    NotHome {
        element_id: ElementId,
        /// `"<internal>"` when the caller carried no external identity.
        caller: String,
        home_system_id: ExternalSystemId,
    },

    /// A version compare-and-swap lost its race more times than the
    /// configured retry budget allows.
    #[error("concurrent modification of element {element_id} after {attempts} attempts")]
    ConcurrentModification { element_id: ElementId, attempts: u32 },

    /// Undo was called on an element with only one version in history.
    #[error("element {element_id} has no prior version to restore")]
    NoPriorVersion { element_id: ElementId },

    /// The underlying repository failed. Retryable when transient.
    #[error("repository error: {0}")]
    Repository(#[from] RepositoryError),

    /// Property bag could not be serialized or deserialized.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl SyncError {
    /// Whether the whole operation is safe to retry.
    ///
    /// Lost CAS races and transient repository failures qualify; invariant
    /// violations and bad input never do.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            SyncError::ConcurrentModification { .. } => true,
            SyncError::Repository(e) => e.is_transient(),
            _ => false,
        }
    }

    /// Create an `InvalidParameter` error.
    pub fn invalid_parameter(field: impl Into<String>, message: impl Into<String>) -> Self {
        SyncError::InvalidParameter {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create an `InvalidProperties` error.
    pub fn invalid_properties(
        element_type: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        SyncError::InvalidProperties {
            element_type: element_type.into(),
            message: message.into(),
        }
    }

    /// Create a `NotFound` error.
    pub fn not_found(resource: &'static str, id: impl ToString) -> Self {
        SyncError::NotFound {
            resource,
            id: id.to_string(),
        }
    }
}

/// Result type for synchronization operations.
pub type SyncResult<T> = std::result::Result<T, SyncError>;
