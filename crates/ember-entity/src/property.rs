use std::any::Any;
use std::collections::HashMap;

/// Keyed bag of arbitrary values attached to an entity.
///
/// A key may hold a value or an explicit null. Reading a null and reading a key
/// that was never set both yield `None`; callers cannot tell the two apart.
#[derive(Default)]
pub struct Properties {
    map: HashMap<String, Option<Box<dyn Any + Send + Sync>>>,
}

impl Properties {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite.
    pub fn set<T: Any + Send + Sync>(&mut self, key: impl Into<String>, value: T) {
        self.map.insert(key.into(), Some(Box::new(value)));
    }

    /// Insert or overwrite with an explicit null.
    pub fn set_null(&mut self, key: impl Into<String>) {
        self.map.insert(key.into(), None);
    }

    /// The stored value, or `None` if the key is absent, null, or holds another type.
    pub fn get<T: Any>(&self, key: &str) -> Option<&T> {
        self.map.get(key)?.as_ref()?.downcast_ref()
    }

    pub fn get_mut<T: Any>(&mut self, key: &str) -> Option<&mut T> {
        self.map.get_mut(key)?.as_mut()?.downcast_mut()
    }

    /// Owned copy of the stored value, with the same `None` cases as [`get`](Self::get).
    pub fn get_optional<T: Any + Clone>(&self, key: &str) -> Option<T> {
        self.get::<T>(key).cloned()
    }

    pub fn remove(&mut self, key: &str) -> bool {
        self.map.remove(key).is_some()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.map.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

/// Binding from an entity property to a script resource. Execution is left to the
/// scripting layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptHandler {
    script: String,
}

impl ScriptHandler {
    pub fn new(script: impl Into<String>) -> Self {
        Self {
            script: script.into(),
        }
    }

    /// Name of the script resource this handler points at.
    pub fn script(&self) -> &str {
        &self.script
    }
}
