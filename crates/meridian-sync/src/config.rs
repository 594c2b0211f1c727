//! Engine configuration.

use serde::{Deserialize, Serialize};

use crate::error::{SyncError, SyncResult};

/// Tunables for the synchronization engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// How many times a lost version compare-and-swap is retried internally
    /// before `ConcurrentModification` surfaces to the caller.
    pub max_retry_attempts: u32,

    /// Page size used when the caller does not supply one.
    pub default_page_size: usize,

    /// Upper bound on caller-supplied page sizes.
    pub max_page_size: usize,

    /// How many prior property generations are retained per element.
    /// Must be at least 1 so undo always has a predecessor to copy forward.
    pub version_history_depth: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            max_retry_attempts: 3,
            default_page_size: 100,
            max_page_size: 500,
            version_history_depth: 10,
        }
    }
}

impl SyncConfig {
    /// Validate the configuration.
    pub fn validate(&self) -> SyncResult<()> {
        if self.max_retry_attempts == 0 {
            return Err(SyncError::invalid_parameter(
                "max_retry_attempts",
                "must be at least 1",
            ));
        }
        if self.default_page_size == 0 {
            return Err(SyncError::invalid_parameter(
                "default_page_size",
                "must be non-zero",
            ));
        }
        if self.max_page_size < self.default_page_size {
            return Err(SyncError::invalid_parameter(
                "max_page_size",
                "must be at least default_page_size",
            ));
        }
        if self.version_history_depth == 0 {
            return Err(SyncError::invalid_parameter(
                "version_history_depth",
                "must retain at least one generation",
            ));
        }
        Ok(())
    }
}
