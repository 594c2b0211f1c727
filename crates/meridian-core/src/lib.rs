//! meridian Core Library
//!
//! Shared types for the meridian open metadata catalog.
//!
//! # Modules
//!
//! - [`ids`] - Strongly typed identifiers (ElementId, CorrelationId, ...)
//! - [`properties`] - The PropertyBag value type carried by every element
//! - [`element`] - Element, relationship and correlation model types
//! - [`error`] - Repository-boundary error types
//!
//! # Example
//!
//! ```
//! use meridian_core::{ElementId, ElementType, PropertyBag};
//!
//! let id = ElementId::new();
//! let props = PropertyBag::new().with("displayName", "Customer Record");
//!
//! assert_eq!(props.get_string("displayName"), Some("Customer Record"));
//! assert_eq!(ElementType::GlossaryTerm.as_str(), "glossary_term");
//! let _ = id;
//! ```

pub mod element;
pub mod error;
pub mod ids;
pub mod properties;

// Re-export main types for convenient access
pub use element::{
    CallerIdentity, Element, ElementState, ElementType, ExternalCorrelation, ExternalSystemKey,
    Relationship, RelationshipStatus, VersionRecord,
};
pub use error::{RepositoryError, RepositoryResult};
pub use ids::{CorrelationId, ElementId, ExternalSystemId, ParseIdError, RelationshipId};
pub use properties::PropertyBag;
