use crate::entity::Entity;
use crate::module::{Module, ModuleState};

/// A typed unit of per-frame behavior. At most one instance of each concrete type
/// may be attached to an entity.
pub trait Control: Module {
    /// Called once per [`Entity::update`] while the control is not paused.
    fn on_update(&mut self, entity: &mut Entity, tpf: f64);

    /// Produce an independent copy for [`Entity::copy`]. Controls that return
    /// `None` are skipped when an entity is copied.
    fn copy_control(&self) -> Option<Box<dyn Control>> {
        None
    }
}

/// Adapts a function into a control.
///
/// The control is keyed by the function's type, so a named `fn` item works while a
/// closure is rejected as anonymous when attached.
pub struct FnControl<F> {
    state: ModuleState,
    func: F,
}

impl<F> FnControl<F>
where
    F: FnMut(&mut Entity, f64) + Send + 'static,
{
    pub fn new(func: F) -> Self {
        Self {
            state: ModuleState::new(),
            func,
        }
    }
}

impl<F> Module for FnControl<F>
where
    F: FnMut(&mut Entity, f64) + Send + 'static,
{
    crate::impl_module_state!(state);
}

impl<F> Control for FnControl<F>
where
    F: FnMut(&mut Entity, f64) + Send + 'static,
{
    fn on_update(&mut self, entity: &mut Entity, tpf: f64) {
        (self.func)(entity, tpf);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EntityError;

    fn drift_right(entity: &mut Entity, tpf: f64) {
        entity.translate_x(10.0 * tpf);
    }

    #[test]
    fn named_function_control_runs() {
        let mut entity = Entity::new();
        entity
            .add_control(FnControl::new(drift_right))
            .unwrap();
        entity.update(0.5);
        assert!((entity.x() - 5.0).abs() < 1e-9);
    }

    #[test]
    fn closure_control_is_anonymous() {
        let mut entity = Entity::new();
        let result = entity.add_control(FnControl::new(|e: &mut Entity, _| e.translate_x(1.0)));
        assert!(matches!(result, Err(EntityError::AnonymousModule { .. })));
        assert_eq!(entity.control_count(), 0);
    }
}
