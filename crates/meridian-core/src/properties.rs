//! Property Bags
//!
//! The free-form property set carried by every element, relationship and
//! correlation. Backed by a JSON object so type-specific façades can store
//! whatever shape their element type requires.
//!
//! A key that is *absent* from a bag means "unset". A key that is present
//! with a JSON `null` value means "explicitly cleared" — the distinction
//! drives merge-update semantics, where absent fields keep their existing
//! values but null fields are removed.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A set of named properties for an element, relationship or correlation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PropertyBag {
    /// Map of property name to JSON value.
    #[serde(flatten)]
    entries: Map<String, Value>,
}

impl PropertyBag {
    /// Create a new empty property bag.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: Map::new(),
        }
    }

    /// Set a property value.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.entries.insert(name.into(), value.into());
    }

    /// Set a property using builder pattern.
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(name, value);
        self
    }

    /// Mark a property as explicitly cleared (present with null value).
    ///
    /// On a merge update this removes the field from the result; on a
    /// replace update the field simply ends up unset.
    #[must_use]
    pub fn with_cleared(mut self, name: impl Into<String>) -> Self {
        self.entries.insert(name.into(), Value::Null);
        self
    }

    /// Get a property value.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.entries.get(name)
    }

    /// Get a string-valued property.
    #[must_use]
    pub fn get_string(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(Value::as_str)
    }

    /// Check whether a property is present (including explicit nulls).
    #[must_use]
    pub fn has(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Check whether a property is present with an explicit null value.
    #[must_use]
    pub fn is_cleared(&self, name: &str) -> bool {
        matches!(self.entries.get(name), Some(Value::Null))
    }

    /// Remove a property.
    pub fn remove(&mut self, name: &str) -> Option<Value> {
        self.entries.remove(name)
    }

    /// Get all property names.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Iterate over all properties.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.entries.iter()
    }

    /// Get the number of properties.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the bag is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Convert into the underlying JSON map.
    #[must_use]
    pub fn into_map(self) -> Map<String, Value> {
        self.entries
    }
}

impl From<Map<String, Value>> for PropertyBag {
    fn from(entries: Map<String, Value>) -> Self {
        Self { entries }
    }
}

impl FromIterator<(String, Value)> for PropertyBag {
    fn from_iter<T: IntoIterator<Item = (String, Value)>>(iter: T) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}
