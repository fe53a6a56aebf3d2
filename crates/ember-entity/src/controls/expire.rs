use crate::control::Control;
use crate::entity::Entity;
use crate::module::{Module, ModuleState};

/// Removes the entity from its world once `expire` seconds of update time have passed.
#[derive(Debug, Clone)]
pub struct ExpireCleanControl {
    state: ModuleState,
    expire: f64,
    elapsed: f64,
}

impl ExpireCleanControl {
    pub fn new(expire: f64) -> Self {
        Self {
            state: ModuleState::new(),
            expire,
            elapsed: 0.0,
        }
    }

    pub fn remaining(&self) -> f64 {
        (self.expire - self.elapsed).max(0.0)
    }
}

impl Module for ExpireCleanControl {
    crate::impl_module_state!(state);
}

impl Control for ExpireCleanControl {
    fn on_update(&mut self, entity: &mut Entity, tpf: f64) {
        self.elapsed += tpf;
        if self.elapsed >= self.expire {
            entity.remove_from_world();
        }
    }

    fn copy_control(&self) -> Option<Box<dyn Control>> {
        Some(Box::new(Self::new(self.expire)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::World;

    #[test]
    fn entity_expires_after_duration() {
        let mut world = World::new();
        let mut entity = Entity::new();
        entity.add_control(ExpireCleanControl::new(1.0)).unwrap();
        world.add_entity(entity).unwrap();

        world.update(0.4);
        world.update(0.4);
        assert_eq!(world.len(), 1);
        world.update(0.4);
        assert!(world.is_empty());
    }

    #[test]
    fn paused_timer_does_not_advance() {
        let mut entity = Entity::new();
        entity.add_control(ExpireCleanControl::new(1.0)).unwrap();
        entity.get_control_mut::<ExpireCleanControl>().unwrap().pause();
        entity.update(5.0);
        assert_eq!(
            entity.get_control::<ExpireCleanControl>().unwrap().remaining(),
            1.0
        );
    }

    #[test]
    fn copy_restarts_timer() {
        let mut entity = Entity::new();
        entity.add_control(ExpireCleanControl::new(2.0)).unwrap();
        entity.update(1.5);
        let copy = entity.copy();
        assert_eq!(copy.get_control::<ExpireCleanControl>().unwrap().remaining(), 2.0);
    }
}
