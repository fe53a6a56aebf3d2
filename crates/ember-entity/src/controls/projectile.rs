use ember_core::{Bundle, BundleError, DVec2};

use crate::control::Control;
use crate::entity::Entity;
use crate::module::{Module, ModuleState, SerializableModule};

/// Moves the entity in a straight line at constant speed and keeps its rotation
/// facing the direction of travel.
#[derive(Debug, Clone)]
pub struct ProjectileControl {
    state: ModuleState,
    direction: DVec2,
    speed: f64,
}

impl ProjectileControl {
    /// `direction` is normalised; a zero vector leaves the entity in place.
    pub fn new(direction: DVec2, speed: f64) -> Self {
        Self {
            state: ModuleState::new(),
            direction: direction.normalize_or_zero(),
            speed,
        }
    }

    pub fn direction(&self) -> DVec2 {
        self.direction
    }

    pub fn set_direction(&mut self, direction: DVec2) {
        self.direction = direction.normalize_or_zero();
    }

    pub fn speed(&self) -> f64 {
        self.speed
    }

    pub fn set_speed(&mut self, speed: f64) {
        self.speed = speed;
    }

    pub fn velocity(&self) -> DVec2 {
        self.direction * self.speed
    }
}

impl Module for ProjectileControl {
    crate::impl_module_state!(state);

    fn serializable(&self) -> Option<&dyn SerializableModule> {
        Some(self)
    }

    fn serializable_mut(&mut self) -> Option<&mut dyn SerializableModule> {
        Some(self)
    }
}

impl Control for ProjectileControl {
    fn on_update(&mut self, entity: &mut Entity, tpf: f64) {
        if self.direction != DVec2::ZERO {
            entity.set_rotation(self.direction.y.atan2(self.direction.x).to_degrees());
        }
        entity.translate(self.velocity() * tpf);
    }

    fn copy_control(&self) -> Option<Box<dyn Control>> {
        Some(Box::new(self.clone()))
    }
}

impl SerializableModule for ProjectileControl {
    fn write(&self, bundle: &mut Bundle) -> Result<(), BundleError> {
        bundle.put("direction", &self.direction)?;
        bundle.put("speed", &self.speed)
    }

    fn read(&mut self, bundle: &Bundle) -> Result<(), BundleError> {
        self.direction = bundle.get::<DVec2>("direction")?.normalize_or_zero();
        self.speed = bundle.get("speed")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn moves_along_direction() {
        let mut entity = Entity::new();
        entity
            .add_control(ProjectileControl::new(DVec2::new(0.0, 2.0), 50.0))
            .unwrap();
        entity.update(0.5);
        assert!(entity.x().abs() < 1e-9);
        assert!((entity.y() - 25.0).abs() < 1e-9);
        assert!((entity.rotation() - 90.0).abs() < 1e-9);
    }

    #[test]
    fn zero_direction_stays_put() {
        let mut entity = Entity::new();
        entity.set_rotation(12.0);
        entity
            .add_control(ProjectileControl::new(DVec2::ZERO, 50.0))
            .unwrap();
        entity.update(1.0);
        assert_eq!(entity.position(), DVec2::ZERO);
        assert_eq!(entity.rotation(), 12.0);
    }
}
