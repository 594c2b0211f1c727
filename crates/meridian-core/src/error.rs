//! Repository-Boundary Error Types
//!
//! Errors surfaced by the storage engine behind the repository seam, with
//! transient/permanent classification for retry logic.

use thiserror::Error;

/// Error that can occur while talking to the underlying metadata repository.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// The repository is temporarily unavailable (transient).
    #[error("repository unavailable: {message}")]
    Unavailable {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A repository call timed out (transient).
    #[error("repository call timed out after {timeout_secs} seconds")]
    Timeout { timeout_secs: u64 },

    /// The repository rejected the request or returned inconsistent data
    /// (permanent).
    #[error("repository internal error: {message}")]
    Internal {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl RepositoryError {
    /// Whether the error is transient and the whole operation may be retried.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            RepositoryError::Unavailable { .. } | RepositoryError::Timeout { .. }
        )
    }

    /// Whether the error is permanent.
    #[must_use]
    pub fn is_permanent(&self) -> bool {
        !self.is_transient()
    }

    /// Create an `Unavailable` error from a message.
    pub fn unavailable(message: impl Into<String>) -> Self {
        RepositoryError::Unavailable {
            message: message.into(),
            source: None,
        }
    }

    /// Create an `Unavailable` error with a source error.
    pub fn unavailable_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        RepositoryError::Unavailable {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create an `Internal` error from a message.
    pub fn internal(message: impl Into<String>) -> Self {
        RepositoryError::Internal {
            message: message.into(),
            source: None,
        }
    }

    /// Create an `Internal` error with a source error.
    pub fn internal_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        RepositoryError::Internal {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }
}

/// Result type for repository operations.
pub type RepositoryResult<T> = std::result::Result<T, RepositoryError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unavailable_is_transient() {
        let err = RepositoryError::unavailable("connection refused");
        assert!(err.is_transient());
        assert!(!err.is_permanent());
    }

    #[test]
    fn test_timeout_is_transient() {
        let err = RepositoryError::Timeout { timeout_secs: 30 };
        assert!(err.is_transient());
        assert!(err.to_string().contains("30"));
    }

    #[test]
    fn test_internal_is_permanent() {
        let err = RepositoryError::internal("constraint violated");
        assert!(err.is_permanent());
        assert!(!err.is_transient());
    }

    #[test]
    fn test_source_is_preserved() {
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset");
        let err = RepositoryError::unavailable_with_source("lost connection", io);
        assert!(std::error::Error::source(&err).is_some());
    }
}
