//! Element Model
//!
//! The catalog's view of a metadata record: elements, the relationships
//! between them, the immutable version history behind them, and the
//! correlation records that tie them to external asset managers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{CorrelationId, ElementId, ExternalSystemId, RelationshipId};
use crate::properties::PropertyBag;

/// The kind of metadata record an element represents.
///
/// One variant per exchange façade; the synchronization engine itself is
/// generic over this.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ElementType {
    Glossary,
    GlossaryCategory,
    GlossaryTerm,
    Asset,
    Connection,
    Comment,
    InformalTag,
    Note,
    GovernanceDefinition,
    ValidValue,
    ExternalReference,
}

impl ElementType {
    /// Convert to string representation.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            ElementType::Glossary => "glossary",
            ElementType::GlossaryCategory => "glossary_category",
            ElementType::GlossaryTerm => "glossary_term",
            ElementType::Asset => "asset",
            ElementType::Connection => "connection",
            ElementType::Comment => "comment",
            ElementType::InformalTag => "informal_tag",
            ElementType::Note => "note",
            ElementType::GovernanceDefinition => "governance_definition",
            ElementType::ValidValue => "valid_value",
            ElementType::ExternalReference => "external_reference",
        }
    }
}

impl std::fmt::Display for ElementType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for ElementType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "glossary" => Ok(ElementType::Glossary),
            "glossary_category" => Ok(ElementType::GlossaryCategory),
            "glossary_term" => Ok(ElementType::GlossaryTerm),
            "asset" => Ok(ElementType::Asset),
            "connection" => Ok(ElementType::Connection),
            "comment" => Ok(ElementType::Comment),
            "informal_tag" => Ok(ElementType::InformalTag),
            "note" => Ok(ElementType::Note),
            "governance_definition" => Ok(ElementType::GovernanceDefinition),
            "valid_value" => Ok(ElementType::ValidValue),
            "external_reference" => Ok(ElementType::ExternalReference),
            _ => Err(format!("Unknown element type: {s}")),
        }
    }
}

/// Soft-delete state of an element.
///
/// Archived elements are excluded from normal reads but remain visible to
/// lineage queries. Removal is terminal and has no state — the element is
/// gone from the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ElementState {
    /// Element is live and visible to normal reads.
    Active,

    /// Element is soft-deleted; visible to lineage reads only.
    Archived,
}

impl ElementState {
    /// Convert to string representation.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            ElementState::Active => "active",
            ElementState::Archived => "archived",
        }
    }
}

impl std::fmt::Display for ElementState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for ElementState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "active" => Ok(ElementState::Active),
            "archived" => Ok(ElementState::Archived),
            _ => Err(format!("Unknown element state: {s}")),
        }
    }
}

/// An internally-owned metadata record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Element {
    /// Internal id, immutable and globally unique.
    pub id: ElementId,

    /// The kind of record this element represents.
    pub element_type: ElementType,

    /// Type-specific property bag.
    pub properties: PropertyBag,

    /// Version assigned at creation. Never changes.
    pub created_version: u64,

    /// Current version. Strictly increasing; every update and undo bumps it.
    pub current_version: u64,

    /// Soft-delete state.
    pub state: ElementState,

    /// Start of the validity window (`None` = unbounded past).
    pub effective_from: Option<DateTime<Utc>>,

    /// End of the validity window, exclusive (`None` = unbounded future).
    pub effective_to: Option<DateTime<Utc>>,

    /// Owning element whose removal cascades to this one.
    pub anchor_id: Option<ElementId>,

    /// Designated master when this element is a known duplicate.
    pub duplicate_of: Option<ElementId>,

    /// When the element was created.
    pub created_at: DateTime<Utc>,

    /// When the element was last written.
    pub updated_at: DateTime<Utc>,

    /// User that performed the last write.
    pub last_updated_by: String,
}

impl Element {
    /// Create a new active element at version 1.
    #[must_use]
    pub fn new(
        element_type: ElementType,
        properties: PropertyBag,
        created_by: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: ElementId::new(),
            element_type,
            properties,
            created_version: 1,
            current_version: 1,
            state: ElementState::Active,
            effective_from: None,
            effective_to: None,
            anchor_id: None,
            duplicate_of: None,
            created_at: now,
            updated_at: now,
            last_updated_by: created_by.into(),
        }
    }

    /// Set the effectivity window using builder pattern.
    #[must_use]
    pub fn with_effectivity(
        mut self,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) -> Self {
        self.effective_from = from;
        self.effective_to = to;
        self
    }

    /// Set the anchor using builder pattern.
    #[must_use]
    pub fn with_anchor(mut self, anchor_id: ElementId) -> Self {
        self.anchor_id = Some(anchor_id);
        self
    }

    /// Whether the element is archived.
    #[must_use]
    pub fn is_archived(&self) -> bool {
        self.state == ElementState::Archived
    }
}

/// Lifecycle status of a relationship.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationshipStatus {
    Draft,
    Active,
    Deprecated,
    Obsolete,
    Other,
}

impl RelationshipStatus {
    /// Convert to string representation.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            RelationshipStatus::Draft => "draft",
            RelationshipStatus::Active => "active",
            RelationshipStatus::Deprecated => "deprecated",
            RelationshipStatus::Obsolete => "obsolete",
            RelationshipStatus::Other => "other",
        }
    }
}

impl std::fmt::Display for RelationshipStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for RelationshipStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "draft" => Ok(RelationshipStatus::Draft),
            "active" => Ok(RelationshipStatus::Active),
            "deprecated" => Ok(RelationshipStatus::Deprecated),
            "obsolete" => Ok(RelationshipStatus::Obsolete),
            "other" => Ok(RelationshipStatus::Other),
            _ => Err(format!("Unknown relationship status: {s}")),
        }
    }
}

/// A typed, directed link between two elements.
///
/// Carries its own property bag and effectivity window. Removal of either
/// endpoint element removes the relationship.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relationship {
    pub id: RelationshipId,

    /// Relationship type name, e.g. `"category_contains_term"`.
    pub relationship_type: String,

    /// Source end of the link.
    pub end_one: ElementId,

    /// Destination end of the link.
    pub end_two: ElementId,

    pub properties: PropertyBag,

    pub status: RelationshipStatus,

    pub effective_from: Option<DateTime<Utc>>,
    pub effective_to: Option<DateTime<Utc>>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Relationship {
    /// Create a new active relationship between two elements.
    #[must_use]
    pub fn new(
        relationship_type: impl Into<String>,
        end_one: ElementId,
        end_two: ElementId,
        properties: PropertyBag,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: RelationshipId::new(),
            relationship_type: relationship_type.into(),
            end_one,
            end_two,
            properties,
            status: RelationshipStatus::Active,
            effective_from: None,
            effective_to: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Whether the relationship touches the given element.
    #[must_use]
    pub fn is_incident_to(&self, element_id: ElementId) -> bool {
        self.end_one == element_id || self.end_two == element_id
    }
}

/// Immutable snapshot of an element's property bag at a given version.
///
/// Retained at least one generation back so that undo can copy the prior
/// state forward.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VersionRecord {
    pub element_id: ElementId,

    /// The version number this snapshot belongs to.
    pub version: u64,

    /// The property bag as it stood at that version.
    pub properties: PropertyBag,

    /// When the snapshot was taken.
    pub recorded_at: DateTime<Utc>,

    /// User whose write superseded this version.
    pub recorded_by: String,
}

/// Maps one external system's identifier for one element to that element.
///
/// The pair (external system id, external identifier) is unique across the
/// store. An element may carry zero, one or many correlations, but at most
/// one with `is_home = true`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExternalCorrelation {
    pub id: CorrelationId,

    pub external_system_id: ExternalSystemId,

    /// Display name of the external system, for audit output.
    pub external_system_name: String,

    /// The external system's private identifier for the element. Opaque.
    pub external_identifier: String,

    /// The internal element this correlation points at.
    pub element_id: ElementId,

    /// Whether the external system owns (is home for) the element.
    pub is_home: bool,

    /// The internal element version last pushed to / pulled from the
    /// external system. Stale-update detection for optimistic callers.
    pub last_synchronized_version: u64,

    /// Mapping-specific properties supplied by the external system.
    pub properties: PropertyBag,

    pub created_at: DateTime<Utc>,
}

impl ExternalCorrelation {
    /// Create a new correlation record.
    #[must_use]
    pub fn new(
        element_id: ElementId,
        system: &ExternalSystemKey,
        external_identifier: impl Into<String>,
        is_home: bool,
        synchronized_version: u64,
        properties: PropertyBag,
    ) -> Self {
        Self {
            id: CorrelationId::new(),
            external_system_id: system.id,
            external_system_name: system.name.clone(),
            external_identifier: external_identifier.into(),
            element_id,
            is_home,
            last_synchronized_version: synchronized_version,
            properties,
            created_at: Utc::now(),
        }
    }
}

/// Identity of an external asset manager, as supplied by the transport
/// layer after authentication.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalSystemKey {
    pub id: ExternalSystemId,
    pub name: String,
}

impl ExternalSystemKey {
    #[must_use]
    pub fn new(id: ExternalSystemId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }
}

/// The already-authenticated caller of an exchange operation.
///
/// Interactive users carry no external system; asset manager connectors
/// carry the system on whose behalf they write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallerIdentity {
    /// The user the transport layer authenticated.
    pub user_id: String,

    /// The external system the caller represents, if any.
    pub external_system: Option<ExternalSystemKey>,
}

impl CallerIdentity {
    /// An interactive (internal) caller with no external system identity.
    #[must_use]
    pub fn internal(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            external_system: None,
        }
    }

    /// A caller acting on behalf of an external asset manager.
    #[must_use]
    pub fn external(
        user_id: impl Into<String>,
        system_id: ExternalSystemId,
        system_name: impl Into<String>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            external_system: Some(ExternalSystemKey::new(system_id, system_name)),
        }
    }

    /// The external system id the caller represents, if any.
    #[must_use]
    pub fn system_id(&self) -> Option<ExternalSystemId> {
        self.external_system.as_ref().map(|s| s.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    mod element_type_tests {
        use super::*;

        #[test]
        fn test_round_trip_all_variants() {
            let all = [
                ElementType::Glossary,
                ElementType::GlossaryCategory,
                ElementType::GlossaryTerm,
                ElementType::Asset,
                ElementType::Connection,
                ElementType::Comment,
                ElementType::InformalTag,
                ElementType::Note,
                ElementType::GovernanceDefinition,
                ElementType::ValidValue,
                ElementType::ExternalReference,
            ];
            for t in all {
                assert_eq!(ElementType::from_str(t.as_str()).unwrap(), t);
            }
        }

        #[test]
        fn test_unknown_type_is_rejected() {
            assert!(ElementType::from_str("widget").is_err());
        }
    }

    mod element_tests {
        use super::*;

        #[test]
        fn test_new_element_starts_at_version_one() {
            let element = Element::new(
                ElementType::GlossaryTerm,
                PropertyBag::new().with("displayName", "Customer"),
                "user1",
            );

            assert_eq!(element.created_version, 1);
            assert_eq!(element.current_version, 1);
            assert_eq!(element.state, ElementState::Active);
            assert!(element.anchor_id.is_none());
            assert!(!element.is_archived());
        }

        #[test]
        fn test_with_anchor() {
            let anchor = ElementId::new();
            let element =
                Element::new(ElementType::Comment, PropertyBag::new(), "user1").with_anchor(anchor);
            assert_eq!(element.anchor_id, Some(anchor));
        }
    }

    mod relationship_tests {
        use super::*;

        #[test]
        fn test_incidence() {
            let a = ElementId::new();
            let b = ElementId::new();
            let rel = Relationship::new("category_contains_term", a, b, PropertyBag::new());

            assert!(rel.is_incident_to(a));
            assert!(rel.is_incident_to(b));
            assert!(!rel.is_incident_to(ElementId::new()));
            assert_eq!(rel.status, RelationshipStatus::Active);
        }

        #[test]
        fn test_status_round_trip() {
            for s in [
                RelationshipStatus::Draft,
                RelationshipStatus::Active,
                RelationshipStatus::Deprecated,
                RelationshipStatus::Obsolete,
                RelationshipStatus::Other,
            ] {
                assert_eq!(RelationshipStatus::from_str(s.as_str()).unwrap(), s);
            }
        }
    }

    mod caller_tests {
        use super::*;

        #[test]
        fn test_internal_caller_has_no_system() {
            let caller = CallerIdentity::internal("erin");
            assert_eq!(caller.system_id(), None);
        }

        #[test]
        fn test_external_caller_carries_system() {
            let system_id = ExternalSystemId::new();
            let caller = CallerIdentity::external("connector", system_id, "DataHubX");
            assert_eq!(caller.system_id(), Some(system_id));
            assert_eq!(caller.external_system.unwrap().name, "DataHubX");
        }
    }
}
