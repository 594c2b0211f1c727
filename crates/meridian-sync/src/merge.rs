//! Merge resolver
//!
//! Computes the result of applying an incoming property set to an existing
//! one under merge or replace semantics. Stored bags are normalized: an
//! explicit JSON `null` in the incoming bag clears the field, and nulls are
//! never persisted.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use meridian_core::PropertyBag;

/// How an incoming property set is applied to the existing one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdateMode {
    /// Fields absent from the incoming set retain their existing values;
    /// fields present with `null` are cleared.
    Merge,

    /// The incoming set verbatim; fields absent from it become unset even
    /// if previously set.
    Replace,
}

impl UpdateMode {
    /// Convert to string representation.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            UpdateMode::Merge => "merge",
            UpdateMode::Replace => "replace",
        }
    }

    /// Construct from the transport layer's `is_merge_update` flag.
    #[must_use]
    pub fn from_merge_flag(is_merge_update: bool) -> Self {
        if is_merge_update {
            UpdateMode::Merge
        } else {
            UpdateMode::Replace
        }
    }
}

impl std::fmt::Display for UpdateMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for UpdateMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "merge" => Ok(UpdateMode::Merge),
            "replace" => Ok(UpdateMode::Replace),
            _ => Err(format!("Unknown update mode: {s}")),
        }
    }
}

/// Apply `incoming` to `existing` under the given mode.
#[must_use]
pub fn apply(existing: &PropertyBag, incoming: &PropertyBag, mode: UpdateMode) -> PropertyBag {
    match mode {
        UpdateMode::Replace => incoming
            .iter()
            .filter(|(_, value)| !matches!(value, Value::Null))
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect(),
        UpdateMode::Merge => {
            let mut result = existing.clone();
            for (name, value) in incoming.iter() {
                if matches!(value, Value::Null) {
                    result.remove(name);
                } else {
                    result.set(name.clone(), value.clone());
                }
            }
            result
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn existing() -> PropertyBag {
        PropertyBag::new().with("a", 1).with("b", 2)
    }

    #[test]
    fn test_merge_keeps_unspecified_fields() {
        let incoming = PropertyBag::new().with("b", 3);
        let result = apply(&existing(), &incoming, UpdateMode::Merge);

        assert_eq!(result.get("a"), Some(&json!(1)));
        assert_eq!(result.get("b"), Some(&json!(3)));
    }

    #[test]
    fn test_replace_clears_unspecified_fields() {
        let incoming = PropertyBag::new().with("b", 3);
        let result = apply(&existing(), &incoming, UpdateMode::Replace);

        assert_eq!(result.get("a"), None);
        assert_eq!(result.get("b"), Some(&json!(3)));
        assert_eq!(result.len(), 1);
    }

    #[test]
    fn test_merge_explicit_null_clears_field() {
        let incoming = PropertyBag::new().with_cleared("a").with("c", "new");
        let result = apply(&existing(), &incoming, UpdateMode::Merge);

        assert!(!result.has("a"));
        assert_eq!(result.get("b"), Some(&json!(2)));
        assert_eq!(result.get_string("c"), Some("new"));
    }

    #[test]
    fn test_merge_absent_differs_from_explicit_null() {
        // Absent "a": kept. Null "a": cleared.
        let absent = PropertyBag::new().with("b", 9);
        let nulled = PropertyBag::new().with("b", 9).with_cleared("a");

        let kept = apply(&existing(), &absent, UpdateMode::Merge);
        let cleared = apply(&existing(), &nulled, UpdateMode::Merge);

        assert!(kept.has("a"));
        assert!(!cleared.has("a"));
    }

    #[test]
    fn test_replace_never_persists_nulls() {
        let incoming = PropertyBag::new().with("b", 3).with_cleared("a");
        let result = apply(&existing(), &incoming, UpdateMode::Replace);

        assert!(!result.has("a"));
        assert_eq!(result.len(), 1);
    }

    #[test]
    fn test_merge_into_empty_bag() {
        let incoming = PropertyBag::new().with("x", true);
        let result = apply(&PropertyBag::new(), &incoming, UpdateMode::Merge);
        assert_eq!(result.get("x"), Some(&json!(true)));
    }

    #[test]
    fn test_mode_from_merge_flag() {
        assert_eq!(UpdateMode::from_merge_flag(true), UpdateMode::Merge);
        assert_eq!(UpdateMode::from_merge_flag(false), UpdateMode::Replace);
    }
}
