//! Named key-value container used to save and load module state.
//!
//! Values are stored as JSON trees so that a bundle can hold anything serde can
//! describe, and a whole bundle can be written to disk as one JSON document.
//! Bundles nest: an entity bundle holds one sub-bundle per saved module.

use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Errors raised while reading or writing bundle values.
#[derive(Debug, thiserror::Error)]
pub enum BundleError {
    #[error("bundle '{bundle}' has no key '{key}'")]
    MissingKey { bundle: String, key: String },

    #[error("failed to encode '{key}' in bundle '{bundle}': {source}")]
    Encode {
        bundle: String,
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to decode '{key}' in bundle '{bundle}': {source}")]
    Decode {
        bundle: String,
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

/// A named, flat key-value store with nested sub-bundles.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Bundle {
    name: String,
    #[serde(default)]
    data: BTreeMap<String, serde_json::Value>,
    #[serde(default)]
    bundles: BTreeMap<String, Bundle>,
}

impl Bundle {
    /// Create an empty bundle with the given name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data: BTreeMap::new(),
            bundles: BTreeMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Store a value under `key`, replacing any previous value.
    pub fn put<T: Serialize>(&mut self, key: impl Into<String>, value: &T) -> Result<(), BundleError> {
        let key = key.into();
        let value = serde_json::to_value(value).map_err(|source| BundleError::Encode {
            bundle: self.name.clone(),
            key: key.clone(),
            source,
        })?;
        self.data.insert(key, value);
        Ok(())
    }

    /// Read the value stored under `key` as `T`.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<T, BundleError> {
        let value = self.data.get(key).ok_or_else(|| BundleError::MissingKey {
            bundle: self.name.clone(),
            key: key.to_string(),
        })?;
        T::deserialize(value).map_err(|source| BundleError::Decode {
            bundle: self.name.clone(),
            key: key.to_string(),
            source,
        })
    }

    /// Whether a value is stored under `key`.
    pub fn contains(&self, key: &str) -> bool {
        self.data.contains_key(key)
    }

    /// Nest a sub-bundle, keyed by its name.
    pub fn put_bundle(&mut self, bundle: Bundle) {
        self.bundles.insert(bundle.name.clone(), bundle);
    }

    pub fn get_bundle(&self, name: &str) -> Option<&Bundle> {
        self.bundles.get(name)
    }

    /// Names of all nested sub-bundles, in sorted order.
    pub fn bundle_names(&self) -> impl Iterator<Item = &str> {
        self.bundles.keys().map(String::as_str)
    }

    /// Number of plain values (sub-bundles are not counted).
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty() && self.bundles.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn put_and_get() {
        let mut bundle = Bundle::new("Health");
        bundle.put("value", &33.0f64).unwrap();
        bundle.put("label", &"hp").unwrap();
        assert_eq!(bundle.get::<f64>("value").unwrap(), 33.0);
        assert_eq!(bundle.get::<String>("label").unwrap(), "hp");
        assert_eq!(bundle.len(), 2);
    }

    #[test]
    fn missing_key() {
        let bundle = Bundle::new("Empty");
        let err = bundle.get::<i32>("nope").unwrap_err();
        assert!(matches!(err, BundleError::MissingKey { .. }));
        assert!(bundle.is_empty());
    }

    #[test]
    fn wrong_type_fails_to_decode() {
        let mut bundle = Bundle::new("Typed");
        bundle.put("value", &"text").unwrap();
        assert!(matches!(
            bundle.get::<u32>("value"),
            Err(BundleError::Decode { .. })
        ));
    }

    #[test]
    fn nested_bundles_survive_json() {
        let mut inner = Bundle::new("Position");
        inner.put("x", &1.5f64).unwrap();
        let mut outer = Bundle::new("entity");
        outer.put_bundle(inner);

        let json = serde_json::to_string(&outer).unwrap();
        let restored: Bundle = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, outer);
        assert_eq!(
            restored.get_bundle("Position").unwrap().get::<f64>("x").unwrap(),
            1.5
        );
        assert_eq!(restored.bundle_names().collect::<Vec<_>>(), vec!["Position"]);
    }
}
