//! Demo scene: entity prefabs and initial spawning

use ember_core::DVec2;
use ember_entity::controls::{CircularMovementControl, ExpireCleanControl, ProjectileControl};
use ember_entity::{Entity, EntityError, HitBox, World, WorldListener};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, warn};

pub const ORBITER: &str = "orbiter";
pub const BULLET: &str = "bullet";
pub const DRONE: &str = "drone";

const KINDS: [&str; 3] = [ORBITER, BULLET, DRONE];

/// Build an entity of the given kind with default module state.
/// Unknown kinds get only the core components.
pub fn prefab(kind: &str) -> Result<Entity, EntityError> {
    let mut entity = Entity::new();
    entity.set_type(kind);
    match kind {
        ORBITER => {
            entity.set_view_from_texture("orbiter.png");
            entity.add_control(CircularMovementControl::new(1.5, 40.0))?;
        }
        BULLET => {
            entity.set_view_from_texture("bullet.png");
            entity.add_control(ProjectileControl::new(DVec2::X, 300.0))?;
            entity.add_control(ExpireCleanControl::new(2.0))?;
        }
        DRONE => {
            entity.set_view_from_texture("drone.png");
            entity.add_control(ProjectileControl::new(DVec2::new(1.0, 1.0), 25.0))?;
        }
        other => warn!("Unknown prefab '{}', spawning a bare entity", other),
    }
    entity
        .bounding_box_mut()
        .add_hit_box(HitBox::new("body", DVec2::ZERO, DVec2::new(16.0, 16.0)));
    Ok(entity)
}

/// Spawn `count` entities at random positions, cycling through the prefab kinds.
pub fn spawn(world: &mut World, count: u32, seed: u64) -> anyhow::Result<()> {
    let mut rng = StdRng::seed_from_u64(seed);
    for i in 0..count {
        let kind = KINDS[i as usize % KINDS.len()];
        let mut entity = prefab(kind)?;
        entity.set_position(DVec2::new(
            rng.gen_range(0.0..800.0),
            rng.gen_range(0.0..600.0),
        ));
        if kind == DRONE {
            let heading = rng.gen_range(0.0..std::f64::consts::TAU);
            if let Ok(control) = entity.get_control_mut::<ProjectileControl>() {
                control.set_direction(DVec2::new(heading.cos(), heading.sin()));
            }
        }
        let id = world.add_entity(entity)?;
        debug!("Spawned {} {}", kind, id);
    }
    Ok(())
}

/// Counts entities entering and leaving the world.
#[derive(Debug, Default)]
pub struct SceneStats {
    pub spawned: u32,
    pub despawned: u32,
}

impl WorldListener for SceneStats {
    fn on_entity_added(&mut self, _entity: &Entity) {
        self.spawned += 1;
    }

    fn on_entity_removed(&mut self, entity: &Entity) {
        self.despawned += 1;
        debug!("{} {} left the world", entity.entity_type(), entity.id());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::Arc;

    #[test]
    fn prefabs_carry_their_controls() {
        let bullet = prefab(BULLET).unwrap();
        assert!(bullet.is_type(BULLET));
        assert!(bullet.has_control::<ProjectileControl>());
        assert!(bullet.has_control::<ExpireCleanControl>());
        assert_eq!(bullet.width(), 16.0);

        let bare = prefab("unknown").unwrap();
        assert_eq!(bare.control_count(), 0);
    }

    #[test]
    fn bullets_expire_from_world() {
        let stats = Arc::new(Mutex::new(SceneStats::default()));
        let mut world = World::new();
        world.add_listener(&stats);
        spawn(&mut world, 6, 1).unwrap();
        assert_eq!(world.len(), 6);
        assert_eq!(world.entities_by_type(BULLET).count(), 2);

        for _ in 0..30 {
            world.update(0.1);
        }
        assert_eq!(world.len(), 4);
        assert_eq!(world.entities_by_type(BULLET).count(), 0);

        let stats = stats.lock();
        assert_eq!(stats.spawned, 6);
        assert_eq!(stats.despawned, 2);
    }
}
