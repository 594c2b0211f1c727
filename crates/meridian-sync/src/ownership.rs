//! Ownership guard
//!
//! Enforces the is-home rule: when an element has a home correlation, only
//! the matching external system may update or delete it. Elements with no
//! home are internally owned and writable by anyone the authorization
//! layer (out of scope here) already admitted.

use tracing::debug;

use meridian_core::{CallerIdentity, ElementId};

use crate::correlation::CorrelationService;
use crate::error::{SyncError, SyncResult};

/// Guard consulted before every element write.
#[derive(Clone)]
pub struct OwnershipGuard {
    correlations: CorrelationService,
}

impl OwnershipGuard {
    /// Create a new guard over the given correlation service.
    #[must_use]
    pub fn new(correlations: CorrelationService) -> Self {
        Self { correlations }
    }

    /// Allow or deny a write to the element by the given caller.
    pub async fn check_write(
        &self,
        element_id: ElementId,
        caller: &CallerIdentity,
    ) -> SyncResult<()> {
        let Some(home) = self.correlations.home_system(element_id).await? else {
            return Ok(());
        };

        if caller.system_id() == Some(home) {
            return Ok(());
        }

        debug!(
            element = %element_id,
            home = %home,
            caller = %caller.user_id,
            "Write denied: caller is not home"
        );
        Err(SyncError::NotHome {
            element_id,
            caller: caller
                .system_id()
                .map_or_else(|| "<internal>".to_string(), |id| id.to_string()),
            home_system_id: home,
        })
    }
}
