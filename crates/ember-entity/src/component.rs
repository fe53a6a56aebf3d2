use std::any::TypeId;
use std::collections::HashMap;

use crate::module::{Module, ModuleKey};

/// A typed unit of entity state. At most one instance of each concrete type may be
/// attached to an entity.
pub trait Component: Module {
    /// Produce an independent copy for [`Entity::copy`](crate::Entity::copy).
    /// Components that return `None` are skipped when an entity is copied.
    fn copy_component(&self) -> Option<Box<dyn Component>> {
        None
    }
}

/// One attached module plus the dependency list captured when it was attached.
pub(crate) struct ModuleEntry<M: ?Sized> {
    pub key: ModuleKey,
    pub requires: Vec<ModuleKey>,
    /// `None` while the module is checked out by a running update.
    pub module: Option<Box<M>>,
}

/// Insertion-ordered storage keyed by module type. A type index gives O(1) lookup,
/// the dense entry list preserves attach order for iteration.
pub(crate) struct ModuleMap<M: ?Sized> {
    index: HashMap<TypeId, usize>,
    entries: Vec<ModuleEntry<M>>,
}

impl<M: ?Sized> ModuleMap<M> {
    pub fn new() -> Self {
        Self {
            index: HashMap::new(),
            entries: Vec::new(),
        }
    }

    pub fn contains(&self, id: TypeId) -> bool {
        self.index.contains_key(&id)
    }

    /// Look up an entry. The entry exists but holds no module while it is checked out.
    pub fn entry(&self, id: TypeId) -> Option<&ModuleEntry<M>> {
        self.index.get(&id).map(|&slot| &self.entries[slot])
    }

    pub fn get(&self, id: TypeId) -> Option<&M> {
        self.entry(id).and_then(|e| e.module.as_deref())
    }

    pub fn get_mut(&mut self, id: TypeId) -> Option<&mut M> {
        let slot = *self.index.get(&id)?;
        self.entries[slot].module.as_deref_mut()
    }

    /// Append a module. The caller has already verified the type is absent.
    pub fn insert(&mut self, key: ModuleKey, requires: Vec<ModuleKey>, module: Box<M>) {
        self.index.insert(key.type_id(), self.entries.len());
        self.entries.push(ModuleEntry {
            key,
            requires,
            module: Some(module),
        });
    }

    /// Swap in a new module for an existing type, keeping its position.
    pub fn replace(&mut self, id: TypeId, module: Box<M>) -> Option<Box<M>> {
        let slot = *self.index.get(&id)?;
        self.entries[slot].module.replace(module)
    }

    /// Remove a type while preserving the order of the remaining entries.
    pub fn remove(&mut self, id: TypeId) -> Option<ModuleEntry<M>> {
        let slot = self.index.remove(&id)?;
        let entry = self.entries.remove(slot);
        for moved in &self.entries[slot..] {
            if let Some(index) = self.index.get_mut(&moved.key.type_id()) {
                *index -= 1;
            }
        }
        Some(entry)
    }

    /// Take the module at `slot` out for the duration of a call.
    pub fn checkout(&mut self, slot: usize) -> Option<(ModuleKey, Box<M>)> {
        let entry = self.entries.get_mut(slot)?;
        let module = entry.module.take()?;
        Some((entry.key, module))
    }

    /// Return a module taken with [`checkout`](Self::checkout) to the entry of its type.
    /// Hands the module back if that entry is gone or already occupied.
    pub fn restore(&mut self, key: ModuleKey, module: Box<M>) -> Option<Box<M>> {
        let Some(&slot) = self.index.get(&key.type_id()) else {
            return Some(module);
        };
        let entry = &mut self.entries[slot];
        if entry.module.is_some() {
            return Some(module);
        }
        entry.module = Some(module);
        None
    }

    /// Find an attached entry (other than `key` itself) that declares `key` as required.
    pub fn dependent_of(&self, key: ModuleKey) -> Option<ModuleKey> {
        self.entries
            .iter()
            .find(|e| e.key != key && e.requires.contains(&key))
            .map(|e| e.key)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ModuleEntry<M>> {
        self.entries.iter()
    }

    pub fn keys(&self) -> impl Iterator<Item = ModuleKey> + '_ {
        self.entries.iter().map(|e| e.key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

impl<M: ?Sized> Default for ModuleMap<M> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key<T: 'static>() -> ModuleKey {
        ModuleKey::of::<T>()
    }

    fn map_of(values: &[(ModuleKey, i32)]) -> ModuleMap<i32> {
        let mut map = ModuleMap::new();
        for &(k, v) in values {
            map.insert(k, Vec::new(), Box::new(v));
        }
        map
    }

    #[test]
    fn insert_and_get() {
        let map = map_of(&[(key::<u8>(), 1), (key::<u16>(), 2)]);
        assert_eq!(map.get(TypeId::of::<u16>()), Some(&2));
        assert_eq!(map.get(TypeId::of::<u32>()), None);
        assert_eq!(map.len(), 2);
    }

    #[test]
    fn remove_preserves_order() {
        let mut map = map_of(&[(key::<u8>(), 1), (key::<u16>(), 2), (key::<u32>(), 3)]);
        let removed = map.remove(TypeId::of::<u8>()).unwrap();
        assert_eq!(removed.module.as_deref(), Some(&1));
        assert_eq!(map.keys().collect::<Vec<_>>(), vec![key::<u16>(), key::<u32>()]);
        assert_eq!(map.get(TypeId::of::<u32>()), Some(&3));
        assert!(map.remove(TypeId::of::<u8>()).is_none());
    }

    #[test]
    fn checkout_keeps_entry() {
        let mut map = map_of(&[(key::<u8>(), 7)]);
        let (k, taken) = map.checkout(0).unwrap();
        assert_eq!(k, key::<u8>());
        assert!(map.contains(TypeId::of::<u8>()));
        assert_eq!(map.get(TypeId::of::<u8>()), None);
        assert!(map.checkout(0).is_none());
        assert!(map.restore(k, taken).is_none());
        assert_eq!(map.get(TypeId::of::<u8>()), Some(&7));
    }

    #[test]
    fn restore_follows_type_after_reorder() {
        let mut map = map_of(&[(key::<u8>(), 1), (key::<u16>(), 2)]);
        let (k, taken) = map.checkout(1).unwrap();
        map.remove(TypeId::of::<u8>());
        assert!(map.restore(k, taken).is_none());
        assert_eq!(map.get(TypeId::of::<u16>()), Some(&2));
    }

    #[test]
    fn restore_hands_back_when_entry_is_gone() {
        let mut map = map_of(&[(key::<u8>(), 1)]);
        let (k, taken) = map.checkout(0).unwrap();
        map.remove(TypeId::of::<u8>());
        assert_eq!(map.restore(k, taken).as_deref(), Some(&1));
        assert_eq!(map.len(), 0);
    }

    #[test]
    fn dependents_are_found() {
        let mut map = ModuleMap::new();
        map.insert(key::<u8>(), Vec::new(), Box::new(0i32));
        map.insert(key::<u16>(), vec![key::<u8>()], Box::new(1i32));
        assert_eq!(map.dependent_of(key::<u8>()), Some(key::<u16>()));
        assert_eq!(map.dependent_of(key::<u16>()), None);
    }
}
