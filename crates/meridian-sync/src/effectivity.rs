//! Effectivity filter
//!
//! The single place where effective-time, lineage visibility and duplicate
//! suppression are decided. Every find/get/scan path in the orchestrator
//! runs its candidates through [`admit`], so the policy is identical for
//! every element type.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use meridian_core::{Element, ElementId, Relationship};

/// The read-time policy for one request.
///
/// Replaces the loose (`effective_time`, `for_lineage`,
/// `for_duplicate_processing`) parameter triple threaded through every call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct QueryScope {
    /// The point in time the validity window is evaluated at.
    /// `None` means "any time": the window rules always pass.
    pub as_of: Option<DateTime<Utc>>,

    /// Include archived (soft-deleted) elements, for lineage/traceability
    /// reads.
    pub for_lineage: bool,

    /// Show known duplicates as distinct records instead of redirecting to
    /// their designated master.
    pub for_duplicate_processing: bool,
}

impl QueryScope {
    /// Scope evaluated at a specific point in time.
    #[must_use]
    pub fn at(as_of: DateTime<Utc>) -> Self {
        Self {
            as_of: Some(as_of),
            ..Self::default()
        }
    }

    /// Scope that ignores validity windows entirely.
    #[must_use]
    pub fn any_time() -> Self {
        Self::default()
    }

    /// Include archived elements.
    #[must_use]
    pub fn with_lineage(mut self) -> Self {
        self.for_lineage = true;
        self
    }

    /// Show duplicates as distinct records.
    #[must_use]
    pub fn with_duplicates(mut self) -> Self {
        self.for_duplicate_processing = true;
        self
    }
}

/// Verdict for one candidate element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// The element is part of the result set.
    Include,

    /// The element is outside the scope.
    Exclude,

    /// The element is a known duplicate; the caller's view is redirected to
    /// the designated master element.
    Redirect(ElementId),
}

/// `T1 <= t < T2`, with unbounded ends and the "any time" exception.
fn window_admits(
    effective_from: Option<DateTime<Utc>>,
    effective_to: Option<DateTime<Utc>>,
    as_of: Option<DateTime<Utc>>,
) -> bool {
    let Some(at) = as_of else {
        return true;
    };
    if let Some(from) = effective_from {
        if at < from {
            return false;
        }
    }
    if let Some(to) = effective_to {
        if at >= to {
            return false;
        }
    }
    true
}

/// Decide whether an element is visible under the given scope.
///
/// Rules, applied in order: validity window start, validity window end,
/// archive state vs lineage, duplicate redirect.
#[must_use]
pub fn admit(element: &Element, scope: &QueryScope) -> Admission {
    if !window_admits(element.effective_from, element.effective_to, scope.as_of) {
        return Admission::Exclude;
    }

    if element.is_archived() && !scope.for_lineage {
        return Admission::Exclude;
    }

    if let Some(master) = element.duplicate_of {
        if !scope.for_duplicate_processing {
            return Admission::Redirect(master);
        }
    }

    Admission::Include
}

/// Decide whether a relationship is visible under the given scope.
///
/// Relationships carry a validity window but no archive state and no
/// duplicate link, so only the window rules apply.
#[must_use]
pub fn admit_relationship(relationship: &Relationship, scope: &QueryScope) -> bool {
    window_admits(
        relationship.effective_from,
        relationship.effective_to,
        scope.as_of,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use meridian_core::{ElementState, ElementType, PropertyBag};

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    fn element_with_window(from: Option<i64>, to: Option<i64>) -> Element {
        Element::new(ElementType::GlossaryTerm, PropertyBag::new(), "user1")
            .with_effectivity(from.map(at), to.map(at))
    }

    mod window_tests {
        use super::*;

        #[test]
        fn test_boundary_is_inclusive_start_exclusive_end() {
            let element = element_with_window(Some(100), Some(200));

            assert_eq!(admit(&element, &QueryScope::at(at(99))), Admission::Exclude);
            assert_eq!(admit(&element, &QueryScope::at(at(100))), Admission::Include);
            assert_eq!(admit(&element, &QueryScope::at(at(199))), Admission::Include);
            assert_eq!(admit(&element, &QueryScope::at(at(200))), Admission::Exclude);
            assert_eq!(admit(&element, &QueryScope::at(at(201))), Admission::Exclude);
        }

        #[test]
        fn test_null_query_time_always_passes_window() {
            let element = element_with_window(Some(100), Some(200));
            assert_eq!(admit(&element, &QueryScope::any_time()), Admission::Include);
        }

        #[test]
        fn test_unbounded_ends() {
            let open_start = element_with_window(None, Some(200));
            assert_eq!(admit(&open_start, &QueryScope::at(at(0))), Admission::Include);

            let open_end = element_with_window(Some(100), None);
            assert_eq!(
                admit(&open_end, &QueryScope::at(at(1_000_000))),
                Admission::Include
            );

            let unbounded = element_with_window(None, None);
            assert_eq!(admit(&unbounded, &QueryScope::at(at(0))), Admission::Include);
        }
    }

    mod lineage_tests {
        use super::*;

        #[test]
        fn test_archived_excluded_from_normal_reads() {
            let mut element = element_with_window(None, None);
            element.state = ElementState::Archived;

            assert_eq!(admit(&element, &QueryScope::any_time()), Admission::Exclude);
        }

        #[test]
        fn test_archived_included_in_lineage_reads() {
            let mut element = element_with_window(None, None);
            element.state = ElementState::Archived;

            assert_eq!(
                admit(&element, &QueryScope::any_time().with_lineage()),
                Admission::Include
            );
        }

        #[test]
        fn test_window_is_checked_before_lineage() {
            let mut element = element_with_window(Some(100), Some(200));
            element.state = ElementState::Archived;

            // Out of window excludes even a lineage read.
            assert_eq!(
                admit(&element, &QueryScope::at(at(50)).with_lineage()),
                Admission::Exclude
            );
        }
    }

    mod duplicate_tests {
        use super::*;

        #[test]
        fn test_duplicate_redirects_to_master() {
            let master = meridian_core::ElementId::new();
            let mut element = element_with_window(None, None);
            element.duplicate_of = Some(master);

            assert_eq!(
                admit(&element, &QueryScope::any_time()),
                Admission::Redirect(master)
            );
        }

        #[test]
        fn test_duplicate_processing_shows_distinct_records() {
            let mut element = element_with_window(None, None);
            element.duplicate_of = Some(meridian_core::ElementId::new());

            assert_eq!(
                admit(&element, &QueryScope::any_time().with_duplicates()),
                Admission::Include
            );
        }
    }

    mod relationship_tests {
        use super::*;
        use meridian_core::{ElementId, Relationship};

        #[test]
        fn test_relationship_window() {
            let mut rel = Relationship::new(
                "term_relates_to_term",
                ElementId::new(),
                ElementId::new(),
                PropertyBag::new(),
            );
            rel.effective_from = Some(at(100));
            rel.effective_to = Some(at(200));

            assert!(admit_relationship(&rel, &QueryScope::at(at(150))));
            assert!(!admit_relationship(&rel, &QueryScope::at(at(200))));
            assert!(admit_relationship(&rel, &QueryScope::any_time()));
        }
    }
}
