use std::collections::HashMap;
use std::sync::{Arc, Weak};

use ember_core::{EntityId, WorldId};
use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::entity::Entity;
use crate::error::WorldError;

/// Observer notified when entities join or leave a world.
pub trait WorldListener: Send {
    fn on_entity_added(&mut self, entity: &Entity);
    fn on_entity_removed(&mut self, entity: &Entity);
}

/// Owns a set of entities and drives their lifecycle. Iteration order is unspecified.
pub struct World {
    id: WorldId,
    entities: HashMap<EntityId, Entity>,
    listeners: Vec<Weak<Mutex<dyn WorldListener>>>,
}

impl World {
    pub fn new() -> Self {
        Self {
            id: WorldId::next(),
            entities: HashMap::new(),
            listeners: Vec::new(),
        }
    }

    pub fn id(&self) -> WorldId {
        self.id
    }

    // ---- Entity management ----

    /// Take ownership of an entity and activate it. Activation observers run before
    /// this returns.
    pub fn add_entity(&mut self, entity: Entity) -> Result<EntityId, WorldError> {
        self.sweep();
        let id = entity.id();
        if self.entities.contains_key(&id) {
            return Err(WorldError::DuplicateEntity(id));
        }

        let entity = self.entities.entry(id).or_insert(entity);
        entity.on_added_to_world(self.id);
        debug!("{}: added entity {}", self.id, id);
        for listener in live_listeners(&mut self.listeners) {
            listener.lock().on_entity_added(entity);
        }
        Ok(id)
    }

    /// Deactivate an entity and hand it back to the caller.
    ///
    /// An entity that already left through [`Entity::remove_from_world`] is treated
    /// as absent and is dropped by the next [`sweep`](Self::sweep).
    pub fn remove_entity(&mut self, id: EntityId) -> Result<Entity, WorldError> {
        if self.entity(id).is_none() {
            return Err(WorldError::EntityNotFound(id));
        }
        let mut entity = self
            .entities
            .remove(&id)
            .ok_or(WorldError::EntityNotFound(id))?;
        entity.remove_from_world();
        debug!("{}: removed entity {}", self.id, id);
        for listener in live_listeners(&mut self.listeners) {
            listener.lock().on_entity_removed(&entity);
        }
        Ok(entity)
    }

    /// Drop entities that left the world through [`Entity::remove_from_world`].
    /// Their modules are cleaned before they are dropped.
    pub fn sweep(&mut self) -> usize {
        let detached: Vec<EntityId> = self
            .entities
            .iter()
            .filter(|(_, e)| e.world() != Some(self.id))
            .map(|(id, _)| *id)
            .collect();

        for id in &detached {
            let Some(mut entity) = self.entities.remove(id) else {
                continue;
            };
            for listener in live_listeners(&mut self.listeners) {
                listener.lock().on_entity_removed(&entity);
            }
            if let Err(e) = entity.clean() {
                warn!("{}: failed to clean entity {}: {}", self.id, id, e);
            }
            debug!("{}: swept entity {}", self.id, id);
        }
        detached.len()
    }

    /// Update every entity once, then sweep entities that removed themselves.
    pub fn update(&mut self, tpf: f64) {
        for entity in self.entities.values_mut() {
            if entity.world() == Some(self.id) {
                entity.update(tpf);
            }
        }
        self.sweep();
    }

    pub fn entity(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get(&id).filter(|e| e.world() == Some(self.id))
    }

    pub fn entity_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        let world = self.id;
        self.entities.get_mut(&id).filter(|e| e.world() == Some(world))
    }

    /// Entities currently attached to this world.
    pub fn entities(&self) -> impl Iterator<Item = &Entity> {
        let world = self.id;
        self.entities.values().filter(move |e| e.world() == Some(world))
    }

    pub fn entities_mut(&mut self) -> impl Iterator<Item = &mut Entity> {
        let world = self.id;
        self.entities.values_mut().filter(move |e| e.world() == Some(world))
    }

    /// Attached entities whose type tag equals `entity_type`.
    pub fn entities_by_type<'a>(&'a self, entity_type: &'a str) -> impl Iterator<Item = &'a Entity> {
        self.entities().filter(move |e| e.is_type(entity_type))
    }

    pub fn len(&self) -> usize {
        self.entities().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // ---- Listeners ----

    /// Register a listener. The world holds it weakly.
    pub fn add_listener<L: WorldListener + 'static>(&mut self, listener: &Arc<Mutex<L>>) {
        let listener: Arc<Mutex<dyn WorldListener>> = listener.clone();
        self.listeners.push(Arc::downgrade(&listener));
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

fn live_listeners(listeners: &mut Vec<Weak<Mutex<dyn WorldListener>>>) -> Vec<Arc<Mutex<dyn WorldListener>>> {
    listeners.retain(|l| l.strong_count() > 0);
    listeners.iter().filter_map(Weak::upgrade).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::control::Control;
    use crate::module::{Module, ModuleState};
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct Recorder {
        added: Vec<EntityId>,
        removed: Vec<EntityId>,
    }

    impl WorldListener for Recorder {
        fn on_entity_added(&mut self, entity: &Entity) {
            self.added.push(entity.id());
        }

        fn on_entity_removed(&mut self, entity: &Entity) {
            self.removed.push(entity.id());
        }
    }

    struct SelfDestruct {
        state: ModuleState,
        frames: u32,
    }

    impl Module for SelfDestruct {
        crate::impl_module_state!(state);
    }

    impl Control for SelfDestruct {
        fn on_update(&mut self, entity: &mut Entity, _tpf: f64) {
            self.frames += 1;
            if self.frames == 2 {
                entity.remove_from_world();
            }
        }
    }

    #[test]
    fn add_and_remove_entity() {
        let mut world = World::new();
        let entity = Entity::new();
        assert!(!entity.is_active());

        let id = world.add_entity(entity).unwrap();
        let entity = world.entity(id).unwrap();
        assert!(entity.is_active());
        assert_eq!(entity.world(), Some(world.id()));
        assert_eq!(world.len(), 1);

        let entity = world.remove_entity(id).unwrap();
        assert!(!entity.is_active());
        assert_eq!(entity.world(), None);
        assert!(world.is_empty());
        assert!(matches!(
            world.remove_entity(id),
            Err(WorldError::EntityNotFound(_))
        ));
    }

    #[test]
    fn activation_observers_fire_synchronously() {
        let activated = Arc::new(AtomicUsize::new(0));
        let deactivated = Arc::new(AtomicUsize::new(0));

        let mut entity = Entity::new();
        let a = activated.clone();
        entity.on_active(move || {
            a.fetch_add(1, Ordering::SeqCst);
        });
        let d = deactivated.clone();
        entity.on_not_active(move || {
            d.fetch_add(1, Ordering::SeqCst);
        });

        let mut world = World::new();
        let id = world.add_entity(entity).unwrap();
        assert_eq!(activated.load(Ordering::SeqCst), 1);
        assert_eq!(deactivated.load(Ordering::SeqCst), 0);

        world.remove_entity(id).unwrap();
        assert_eq!(deactivated.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn late_active_observer_does_not_fire() {
        let mut world = World::new();
        let id = world.add_entity(Entity::new()).unwrap();

        let fired = Arc::new(AtomicUsize::new(0));
        let f = fired.clone();
        world.entity_mut(id).unwrap().on_active(move || {
            f.fetch_add(1, Ordering::SeqCst);
        });
        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn self_removal_is_swept() {
        let recorder = Arc::new(Mutex::new(Recorder::default()));
        let mut world = World::new();
        world.add_listener(&recorder);

        let mut entity = Entity::new();
        entity
            .add_control(SelfDestruct {
                state: ModuleState::new(),
                frames: 0,
            })
            .unwrap();
        let id = world.add_entity(entity).unwrap();

        world.update(0.016);
        assert_eq!(world.len(), 1);
        world.update(0.016);
        assert!(world.is_empty());
        assert!(world.entity(id).is_none());

        let recorder = recorder.lock();
        assert_eq!(recorder.added, vec![id]);
        assert_eq!(recorder.removed, vec![id]);
    }

    #[test]
    fn detached_entity_cannot_be_removed_again() {
        let recorder = Arc::new(Mutex::new(Recorder::default()));
        let mut world = World::new();
        world.add_listener(&recorder);
        let id = world.add_entity(Entity::new()).unwrap();

        world.entity_mut(id).unwrap().remove_from_world();
        assert!(matches!(
            world.remove_entity(id),
            Err(WorldError::EntityNotFound(_))
        ));
        assert!(recorder.lock().removed.is_empty());

        assert_eq!(world.sweep(), 1);
        assert_eq!(recorder.lock().removed, vec![id]);
        assert_eq!(world.sweep(), 0);
    }

    #[test]
    fn remove_from_world_outside_world_is_noop() {
        let mut entity = Entity::new();
        entity.remove_from_world();
        assert!(!entity.is_active());
        assert_eq!(entity.world(), None);
    }

    #[test]
    fn filter_by_type() {
        let mut world = World::new();
        let mut enemy = Entity::new();
        enemy.set_type("enemy");
        world.add_entity(enemy).unwrap();
        world.add_entity(Entity::new()).unwrap();

        assert_eq!(world.entities_by_type("enemy").count(), 1);
        assert_eq!(world.entities().count(), 2);
    }

    #[test]
    fn dropped_listener_is_ignored() {
        let mut world = World::new();
        {
            let recorder = Arc::new(Mutex::new(Recorder::default()));
            world.add_listener(&recorder);
        }
        world.add_entity(Entity::new()).unwrap();
        assert_eq!(world.len(), 1);
    }
}
