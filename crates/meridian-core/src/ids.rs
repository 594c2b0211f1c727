//! Strongly Typed Identifiers
//!
//! Type-safe identifier types for meridian. Using the newtype pattern, these
//! types prevent accidental misuse of different ID types at compile time.
//!
//! # Example
//!
//! ```
//! use meridian_core::{ElementId, CorrelationId};
//!
//! let element = ElementId::new();
//! let correlation = CorrelationId::new();
//!
//! // Type safety: cannot pass CorrelationId where ElementId is expected
//! fn requires_element(id: ElementId) -> String {
//!     id.to_string()
//! }
//!
//! let result = requires_element(element);
//! // requires_element(correlation); // This would not compile!
//! ```

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::str::FromStr;
use uuid::Uuid;

/// Error type for ID parsing failures
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseIdError {
    /// The type of ID that failed to parse
    pub id_type: &'static str,
    /// The underlying UUID parse error message
    pub message: String,
}

impl Display for ParseIdError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "Failed to parse {}: {}", self.id_type, self.message)
    }
}

impl std::error::Error for ParseIdError {}

/// Macro to define a strongly-typed ID type
macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Creates a new random ID using UUID v4.
            #[must_use]
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Creates an ID from an existing UUID.
            #[must_use]
            pub fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            /// Returns a reference to the underlying UUID.
            #[must_use]
            pub fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl Display for $name {
            fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = ParseIdError;

            fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
                Uuid::parse_str(s)
                    .map(Self)
                    .map_err(|e| ParseIdError {
                        id_type: stringify!($name),
                        message: e.to_string(),
                    })
            }
        }
    };
}

define_id!(
    /// Strongly typed identifier for catalog elements.
    ///
    /// This is the internal, globally unique identifier that the catalog
    /// owns. External systems never mint these; they are assigned on
    /// element creation and are immutable for the element's lifetime.
    ///
    /// # Example
    ///
    /// ```
    /// use meridian_core::ElementId;
    /// use uuid::Uuid;
    ///
    /// // Create a new random ElementId
    /// let element_id = ElementId::new();
    /// println!("Element: {}", element_id);
    ///
    /// // Create from existing UUID
    /// let uuid = Uuid::new_v4();
    /// let element_id = ElementId::from_uuid(uuid);
    /// assert_eq!(element_id.as_uuid(), &uuid);
    ///
    /// // Parse from string
    /// let element_id: ElementId = "550e8400-e29b-41d4-a716-446655440000".parse().unwrap();
    /// ```
    ElementId
);

define_id!(
    /// Strongly typed identifier for an external-identifier correlation.
    ///
    /// Identifies the mapping record between one external system's
    /// identifier and one internal element.
    CorrelationId
);

define_id!(
    /// Strongly typed identifier for a relationship between two elements.
    RelationshipId
);

define_id!(
    /// Strongly typed identifier for an external asset manager.
    ///
    /// Identifies the third-party system whose metadata is correlated into
    /// the catalog. Supplied already authenticated by the transport layer.
    ExternalSystemId
);
