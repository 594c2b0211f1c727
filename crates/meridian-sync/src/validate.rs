//! Per-type property validation
//!
//! One small capability trait implemented once per element type, instead of
//! hand-duplicating constraint checks across dozens of typed façades. The
//! orchestrator consults the registry before persisting any property set;
//! types without a registered validator accept any bag.

use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;

use serde_json::Value;

use meridian_core::{ElementType, PropertyBag, RelationshipStatus};

use crate::error::{SyncError, SyncResult};

/// Validates property bags for one element type.
pub trait PropertyValidator: Send + Sync {
    /// The element type this validator covers.
    fn element_type(&self) -> ElementType;

    /// Check an incoming property set against the type's constraints.
    ///
    /// Called with the post-merge result, so constraints hold on what is
    /// actually persisted.
    fn validate(&self, properties: &PropertyBag) -> SyncResult<()>;
}

/// Registry of per-type validators consulted by the orchestrator.
#[derive(Default)]
pub struct ValidatorRegistry {
    validators: HashMap<ElementType, Arc<dyn PropertyValidator>>,
}

impl ValidatorRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a validator, replacing any previous one for its type.
    pub fn register(&mut self, validator: Arc<dyn PropertyValidator>) {
        self.validators.insert(validator.element_type(), validator);
    }

    /// Validate a property bag for the given type. Types without a
    /// registered validator pass.
    pub fn validate(&self, element_type: ElementType, properties: &PropertyBag) -> SyncResult<()> {
        match self.validators.get(&element_type) {
            Some(validator) => validator.validate(properties),
            None => Ok(()),
        }
    }
}

/// Validator for glossary terms.
///
/// Constraints: `qualifiedName` and `displayName` must be strings when
/// present, and `status` must be one of the allowed term statuses
/// (draft/active/deprecated/obsolete/other).
#[derive(Debug, Clone, Copy, Default)]
pub struct GlossaryTermValidator;

impl PropertyValidator for GlossaryTermValidator {
    fn element_type(&self) -> ElementType {
        ElementType::GlossaryTerm
    }

    fn validate(&self, properties: &PropertyBag) -> SyncResult<()> {
        for field in ["qualifiedName", "displayName"] {
            match properties.get(field) {
                None | Some(Value::String(_)) => {}
                Some(other) => {
                    return Err(SyncError::invalid_properties(
                        self.element_type().as_str(),
                        format!("'{field}' must be a string, got {other}"),
                    ));
                }
            }
        }

        if let Some(status) = properties.get("status") {
            let Some(status) = status.as_str() else {
                return Err(SyncError::invalid_properties(
                    self.element_type().as_str(),
                    "'status' must be a string",
                ));
            };
            if RelationshipStatus::from_str(status).is_err() {
                return Err(SyncError::invalid_properties(
                    self.element_type().as_str(),
                    format!("'{status}' is not an allowed status"),
                ));
            }
        }

        Ok(())
    }
}
