use ember_core::{Bundle, BundleError};

use crate::control::Control;
use crate::entity::Entity;
use crate::module::{Module, ModuleState, SerializableModule};

/// Moves the entity around a circle of `radius`, advancing the angle by `speed`
/// radians per second. The circle is centered so that the entity's position when
/// the control starts lies on it at angle 0.
#[derive(Debug, Clone)]
pub struct CircularMovementControl {
    state: ModuleState,
    speed: f64,
    radius: f64,
    t: f64,
}

impl CircularMovementControl {
    pub fn new(speed: f64, radius: f64) -> Self {
        Self {
            state: ModuleState::new(),
            speed,
            radius,
            t: 0.0,
        }
    }

    pub fn speed(&self) -> f64 {
        self.speed
    }

    pub fn radius(&self) -> f64 {
        self.radius
    }

    /// Current angle along the circle, in radians.
    pub fn angle(&self) -> f64 {
        self.t
    }
}

impl Module for CircularMovementControl {
    crate::impl_module_state!(state);

    fn serializable(&self) -> Option<&dyn SerializableModule> {
        Some(self)
    }

    fn serializable_mut(&mut self) -> Option<&mut dyn SerializableModule> {
        Some(self)
    }
}

impl Control for CircularMovementControl {
    fn on_update(&mut self, entity: &mut Entity, tpf: f64) {
        let x = entity.x() - self.t.cos() * self.radius;
        let y = entity.y() - self.t.sin() * self.radius;

        self.t += tpf * self.speed;

        entity.set_x(x + self.t.cos() * self.radius);
        entity.set_y(y + self.t.sin() * self.radius);
    }

    fn copy_control(&self) -> Option<Box<dyn Control>> {
        Some(Box::new(self.clone()))
    }
}

impl SerializableModule for CircularMovementControl {
    fn write(&self, bundle: &mut Bundle) -> Result<(), BundleError> {
        bundle.put("speed", &self.speed)?;
        bundle.put("radius", &self.radius)?;
        bundle.put("t", &self.t)
    }

    fn read(&mut self, bundle: &Bundle) -> Result<(), BundleError> {
        self.speed = bundle.get("speed")?;
        self.radius = bundle.get("radius")?;
        self.t = bundle.get("t")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ember_core::DVec2;
    use std::f64::consts::PI;

    #[test]
    fn half_turn_crosses_the_circle() {
        let mut entity = Entity::new();
        entity.add_control(CircularMovementControl::new(PI, 10.0)).unwrap();

        // Starting at the origin, the center sits at (-10, 0).
        entity.update(1.0);
        assert!((entity.x() - -20.0).abs() < 1e-9);
        assert!(entity.y().abs() < 1e-9);

        entity.update(1.0);
        assert!(entity.x().abs() < 1e-9);
        assert!(entity.y().abs() < 1e-9);
    }

    #[test]
    fn radius_is_preserved() {
        let mut entity = Entity::new();
        entity.add_control(CircularMovementControl::new(1.3, 5.0)).unwrap();
        for _ in 0..17 {
            entity.update(0.1);
            let center = DVec2::new(-5.0, 0.0);
            assert!((entity.position().distance(center) - 5.0).abs() < 1e-9);
        }
    }
}
