// crates/provider-registry-core/src/core/properties.rs
// ============================================================================
// Module: Extension Properties
// Description: Free-form key/value attributes attached to providers.
// Purpose: Share one property representation across aggregates and sections.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! Extension properties are arbitrary JSON values keyed by a non-blank name.
//! Maps are ordered so that equality and persistence are deterministic. The
//! same representation backs provider, authenticator, and provisioner
//! properties.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::fmt;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Property value type. Any JSON value except `null` is stored.
pub type PropertyValue = Value;

/// Ordered property map.
pub type PropertyMap = BTreeMap<String, PropertyValue>;

/// Section whose properties a property-equality lookup inspects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PropertyScope {
    /// Provider-level extension properties.
    Provider,
    /// Properties of any authenticator in the authentication section.
    Authenticator,
    /// Properties of any provisioner in the provisioning section.
    Provisioner,
}

impl PropertyScope {
    /// Returns a stable label for the scope.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Provider => "provider",
            Self::Authenticator => "authenticator",
            Self::Provisioner => "provisioner",
        }
    }
}

impl fmt::Display for PropertyScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Inserts a property when the key is non-blank and the value is not null.
pub(crate) fn put_property(map: &mut PropertyMap, key: impl Into<String>, value: PropertyValue) {
    let key = key.into();
    if key.trim().is_empty() || value.is_null() {
        return;
    }
    map.insert(key, value);
}

/// Replaces `target` with `source` unless `source` is empty.
pub(crate) fn replace_properties(target: &mut PropertyMap, source: PropertyMap) {
    if source.is_empty() {
        return;
    }
    target.clear();
    merge_properties(target, source);
}

/// Merges `source` into `target`, skipping blank keys and null values.
pub(crate) fn merge_properties(target: &mut PropertyMap, source: PropertyMap) {
    for (key, value) in source {
        put_property(target, key, value);
    }
}

/// Returns the canonical text form used to persist and compare a value.
///
/// # Errors
///
/// Returns [`serde_json::Error`] when the value cannot be serialized.
pub fn canonical_property_text(value: &PropertyValue) -> Result<String, serde_json::Error> {
    serde_json::to_string(value)
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::PropertyMap;
    use super::merge_properties;
    use super::put_property;
    use super::replace_properties;

    #[test]
    fn put_property_skips_blank_keys_and_nulls() {
        let mut map = PropertyMap::new();
        put_property(&mut map, "  ", json!(1));
        put_property(&mut map, "key", json!(null));
        put_property(&mut map, "key", json!("value"));
        assert_eq!(map.len(), 1);
        assert_eq!(map.get("key"), Some(&json!("value")));
    }

    #[test]
    fn replace_with_empty_map_is_a_no_op() {
        let mut map = PropertyMap::new();
        put_property(&mut map, "kept", json!(true));
        replace_properties(&mut map, PropertyMap::new());
        assert_eq!(map.get("kept"), Some(&json!(true)));
    }

    #[test]
    fn merge_overwrites_existing_keys_only() {
        let mut map = PropertyMap::new();
        put_property(&mut map, "a", json!(1));
        put_property(&mut map, "b", json!(2));
        let mut delta = PropertyMap::new();
        delta.insert("b".to_string(), json!(3));
        merge_properties(&mut map, delta);
        assert_eq!(map.get("a"), Some(&json!(1)));
        assert_eq!(map.get("b"), Some(&json!(3)));
    }
}
