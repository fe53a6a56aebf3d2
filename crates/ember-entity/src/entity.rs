use std::any::Any;
use std::sync::{Arc, Weak};

use ember_core::{Bundle, DVec2, EntityId, WorldId};
use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::activation::Activation;
use crate::component::{Component, ModuleMap};
use crate::control::Control;
use crate::core_components::{
    is_core_component, BoundingBoxComponent, PositionComponent, RotationComponent, TypeComponent,
    ViewComponent, ViewNode,
};
use crate::error::{EntityError, ModuleKind};
use crate::module::{Module, ModuleKey, ModuleListener};
use crate::property::{Properties, ScriptHandler};

/// A game object: the aggregate of its components and controls.
///
/// Every entity carries the five core components from construction. Further
/// components and controls are keyed by concrete type, so at most one instance of
/// each type can be attached. Controls run in attach order on [`update`](Self::update).
pub struct Entity {
    id: EntityId,
    components: ModuleMap<dyn Component>,
    controls: ModuleMap<dyn Control>,
    world: Option<WorldId>,
    activation: Activation,
    controls_enabled: bool,
    /// Set while `update` iterates the controls.
    updating: bool,
    properties: Properties,
    module_listeners: Vec<Weak<Mutex<dyn ModuleListener>>>,
}

impl Entity {
    pub fn new() -> Self {
        let mut entity = Self {
            id: EntityId::new(),
            components: ModuleMap::new(),
            controls: ModuleMap::new(),
            world: None,
            activation: Activation::default(),
            controls_enabled: true,
            updating: false,
            properties: Properties::new(),
            module_listeners: Vec::new(),
        };
        entity.insert_component(ModuleKey::of::<TypeComponent>(), Box::new(TypeComponent::default()));
        entity.insert_component(
            ModuleKey::of::<PositionComponent>(),
            Box::new(PositionComponent::default()),
        );
        entity.insert_component(
            ModuleKey::of::<RotationComponent>(),
            Box::new(RotationComponent::default()),
        );
        entity.insert_component(
            ModuleKey::of::<BoundingBoxComponent>(),
            Box::new(BoundingBoxComponent::default()),
        );
        entity.insert_component(ModuleKey::of::<ViewComponent>(), Box::new(ViewComponent::default()));
        entity
    }

    pub fn id(&self) -> EntityId {
        self.id
    }

    // ---- Components ----

    /// Attach a component.
    ///
    /// Fails if a component of the same type is attached, if the type is anonymous,
    /// or if any type it requires is missing.
    pub fn add_component<T: Component>(&mut self, component: T) -> Result<(), EntityError> {
        self.attach_component(ModuleKey::of::<T>(), Box::new(component))
    }

    fn attach_component(&mut self, key: ModuleKey, component: Box<dyn Component>) -> Result<(), EntityError> {
        if self.components.contains(key.type_id()) {
            return Err(EntityError::DuplicateModule {
                kind: ModuleKind::Component,
                name: key.short_name(),
            });
        }
        self.check_attachable(key, ModuleKind::Component, &component.requires())?;
        self.insert_component(key, component);
        Ok(())
    }

    /// Post-validation half of the attach path.
    fn insert_component(&mut self, key: ModuleKey, mut component: Box<dyn Component>) {
        component.state_mut().owner = Some(self.id);
        let requires = component.requires();
        self.components.insert(key, requires, component);
        debug!("Entity {}: added component {}", self.id, key);
        if let Some(component) = self.components.get_mut(key.type_id()) {
            notify_added(&mut self.module_listeners, component.as_module_mut());
        }
    }

    pub fn get_component<T: Component>(&self) -> Result<&T, EntityError> {
        self.get_component_optional::<T>()
            .ok_or_else(|| not_found::<T>(ModuleKind::Component))
    }

    pub fn get_component_mut<T: Component>(&mut self) -> Result<&mut T, EntityError> {
        self.components
            .get_mut(ModuleKey::of::<T>().type_id())
            .and_then(|c| c.as_any_mut().downcast_mut::<T>())
            .ok_or_else(|| not_found::<T>(ModuleKind::Component))
    }

    pub fn get_component_optional<T: Component>(&self) -> Option<&T> {
        self.components
            .get(ModuleKey::of::<T>().type_id())
            .and_then(|c| c.as_any().downcast_ref::<T>())
    }

    pub fn has_component<T: Component>(&self) -> bool {
        self.components.contains(ModuleKey::of::<T>().type_id())
    }

    /// Detach a component. Returns `Ok(false)` if none of that type is attached.
    ///
    /// Core components cannot be removed, nor can a component some other attached
    /// module requires.
    pub fn remove_component<T: Component>(&mut self) -> Result<bool, EntityError> {
        self.detach_component(ModuleKey::of::<T>())
    }

    fn detach_component(&mut self, key: ModuleKey) -> Result<bool, EntityError> {
        if !self.components.contains(key.type_id()) {
            return Ok(false);
        }
        if is_core_component(key) {
            return Err(EntityError::ProtectedModule(key.short_name()));
        }
        self.check_not_required(key)?;

        let Some(entry) = self.components.remove(key.type_id()) else {
            return Ok(false);
        };
        if let Some(mut component) = entry.module {
            notify_removed(&mut self.module_listeners, component.as_module_mut());
            component.state_mut().owner = None;
        }
        debug!("Entity {}: removed component {}", self.id, key);
        Ok(true)
    }

    pub fn component_keys(&self) -> impl Iterator<Item = ModuleKey> + '_ {
        self.components.keys()
    }

    pub fn component_count(&self) -> usize {
        self.components.len()
    }

    // ---- Controls ----

    /// Attach a control. Same rules as [`add_component`](Self::add_component), and
    /// additionally fails while this entity's controls are updating.
    pub fn add_control<T: Control>(&mut self, control: T) -> Result<(), EntityError> {
        self.attach_control(ModuleKey::of::<T>(), Box::new(control))
    }

    fn attach_control(&mut self, key: ModuleKey, mut control: Box<dyn Control>) -> Result<(), EntityError> {
        if self.updating {
            return Err(EntityError::ConcurrentModification(key.short_name()));
        }
        if self.controls.contains(key.type_id()) {
            return Err(EntityError::DuplicateModule {
                kind: ModuleKind::Control,
                name: key.short_name(),
            });
        }
        let requires = control.requires();
        self.check_attachable(key, ModuleKind::Control, &requires)?;

        control.state_mut().owner = Some(self.id);
        self.controls.insert(key, requires, control);
        debug!("Entity {}: added control {}", self.id, key);
        if let Some(control) = self.controls.get_mut(key.type_id()) {
            notify_added(&mut self.module_listeners, control.as_module_mut());
        }
        Ok(())
    }

    /// Fails with [`EntityError::ModuleBusy`] when asked for the control that is
    /// currently executing.
    pub fn get_control<T: Control>(&self) -> Result<&T, EntityError> {
        let key = ModuleKey::of::<T>();
        let Some(entry) = self.controls.entry(key.type_id()) else {
            return Err(not_found::<T>(ModuleKind::Control));
        };
        entry
            .module
            .as_deref()
            .ok_or_else(|| EntityError::ModuleBusy(key.short_name()))?
            .as_any()
            .downcast_ref::<T>()
            .ok_or_else(|| not_found::<T>(ModuleKind::Control))
    }

    pub fn get_control_mut<T: Control>(&mut self) -> Result<&mut T, EntityError> {
        let key = ModuleKey::of::<T>();
        if !self.controls.contains(key.type_id()) {
            return Err(not_found::<T>(ModuleKind::Control));
        }
        self.controls
            .get_mut(key.type_id())
            .ok_or_else(|| EntityError::ModuleBusy(key.short_name()))?
            .as_any_mut()
            .downcast_mut::<T>()
            .ok_or_else(|| not_found::<T>(ModuleKind::Control))
    }

    pub fn get_control_optional<T: Control>(&self) -> Option<&T> {
        self.controls
            .get(ModuleKey::of::<T>().type_id())
            .and_then(|c| c.as_any().downcast_ref::<T>())
    }

    /// True for every attached control, including one that is currently executing.
    pub fn has_control<T: Control>(&self) -> bool {
        self.controls.contains(ModuleKey::of::<T>().type_id())
    }

    /// Detach a control. Returns `Ok(false)` if none of that type is attached.
    pub fn remove_control<T: Control>(&mut self) -> Result<bool, EntityError> {
        let key = ModuleKey::of::<T>();
        if !self.controls.contains(key.type_id()) {
            return Ok(false);
        }
        if self.updating {
            return Err(EntityError::ConcurrentModification(key.short_name()));
        }
        self.check_not_required(key)?;

        let Some(entry) = self.controls.remove(key.type_id()) else {
            return Ok(false);
        };
        if let Some(mut control) = entry.module {
            notify_removed(&mut self.module_listeners, control.as_module_mut());
            control.state_mut().owner = None;
        }
        debug!("Entity {}: removed control {}", self.id, key);
        Ok(true)
    }

    pub fn control_keys(&self) -> impl Iterator<Item = ModuleKey> + '_ {
        self.controls.keys()
    }

    pub fn control_count(&self) -> usize {
        self.controls.len()
    }

    /// Entity-wide switch for [`update`](Self::update).
    pub fn controls_enabled(&self) -> bool {
        self.controls_enabled
    }

    pub fn set_controls_enabled(&mut self, enabled: bool) {
        self.controls_enabled = enabled;
    }

    /// Whether a component or control of this type is attached.
    pub fn has_module(&self, key: ModuleKey) -> bool {
        self.components.contains(key.type_id()) || self.controls.contains(key.type_id())
    }

    // ---- Invariants ----

    fn check_attachable(&self, key: ModuleKey, kind: ModuleKind, requires: &[ModuleKey]) -> Result<(), EntityError> {
        if key.is_anonymous() {
            return Err(EntityError::AnonymousModule {
                kind,
                name: key.name().to_string(),
            });
        }
        if let Some(missing) = requires.iter().find(|r| !self.has_module(**r)) {
            return Err(EntityError::MissingDependency {
                required: missing.short_name(),
                by: key.short_name(),
            });
        }
        Ok(())
    }

    fn check_not_required(&self, key: ModuleKey) -> Result<(), EntityError> {
        let dependent = self
            .components
            .dependent_of(key)
            .or_else(|| self.controls.dependent_of(key));
        match dependent {
            Some(by) => Err(EntityError::InUse {
                required: key.short_name(),
                by: by.short_name(),
            }),
            None => Ok(()),
        }
    }

    // ---- Update ----

    /// Run every unpaused control once, in attach order.
    ///
    /// Each control is checked out of its slot while it runs so it can receive the
    /// entity mutably. Attaching or detaching controls from inside this call fails
    /// with [`EntityError::ConcurrentModification`]. A nested call made by a control
    /// runs the other controls and skips the caller, which is still checked out.
    pub fn update(&mut self, tpf: f64) {
        if !self.controls_enabled {
            return;
        }
        // A control may call `update` again; only the outermost call clears the flag.
        let was_updating = std::mem::replace(&mut self.updating, true);
        for slot in 0..self.controls.len() {
            let Some((key, mut control)) = self.controls.checkout(slot) else {
                continue;
            };
            if !control.is_paused() {
                control.on_update(self, tpf);
            }
            if self.controls.restore(key, control).is_some() {
                warn!("Entity {}: control {} lost its slot during update", self.id, key);
            }
        }
        self.updating = was_updating;
    }

    /// Whether `update` is currently iterating this entity's controls.
    pub fn is_updating(&self) -> bool {
        self.updating
    }

    /// Detach every non-core component and every control without dependency checks.
    /// Listeners are still notified. Used at teardown.
    pub fn clean(&mut self) -> Result<(), EntityError> {
        if self.updating {
            return Err(EntityError::ConcurrentModification(format!("entity {}", self.id)));
        }
        let controls: Vec<ModuleKey> = self.controls.keys().collect();
        for key in controls.into_iter().rev() {
            if let Some(mut control) = self.controls.remove(key.type_id()).and_then(|e| e.module) {
                notify_removed(&mut self.module_listeners, control.as_module_mut());
                control.state_mut().owner = None;
            }
        }
        let components: Vec<ModuleKey> = self
            .components
            .keys()
            .filter(|k| !is_core_component(*k))
            .collect();
        for key in components.into_iter().rev() {
            if let Some(mut component) = self.components.remove(key.type_id()).and_then(|e| e.module) {
                notify_removed(&mut self.module_listeners, component.as_module_mut());
                component.state_mut().owner = None;
            }
        }
        debug!("Entity {}: cleaned", self.id);
        Ok(())
    }

    // ---- Copy / save / load ----

    /// Build a new entity from copies of every copyable module, in attach order.
    ///
    /// Modules without the copy capability are skipped. Properties, listeners and
    /// world membership are not carried over.
    pub fn copy(&self) -> Entity {
        let mut copy = Entity::new();
        copy.controls_enabled = self.controls_enabled;

        for entry in self.components.iter() {
            let Some(clone) = entry.module.as_deref().and_then(|c| c.copy_component()) else {
                continue;
            };
            if clone.as_any().type_id() != entry.key.type_id() {
                warn!("Copy of component {} produced a different type, skipping", entry.key);
                continue;
            }
            if is_core_component(entry.key) {
                let mut clone = clone;
                clone.state_mut().owner = Some(copy.id);
                copy.components.replace(entry.key.type_id(), clone);
            } else if let Err(e) = copy.attach_component(entry.key, clone) {
                warn!("Skipping component {} while copying entity: {}", entry.key, e);
            }
        }

        for entry in self.controls.iter() {
            let Some(clone) = entry.module.as_deref().and_then(|c| c.copy_control()) else {
                continue;
            };
            if clone.as_any().type_id() != entry.key.type_id() {
                warn!("Copy of control {} produced a different type, skipping", entry.key);
                continue;
            }
            if let Err(e) = copy.attach_control(entry.key, clone) {
                warn!("Skipping control {} while copying entity: {}", entry.key, e);
            }
        }
        copy
    }

    /// Write every serializable module into its own sub-bundle, named by the full type
    /// path so same-named types from different modules keep separate sections.
    pub fn save(&self, bundle: &mut Bundle) -> Result<(), EntityError> {
        let components = self.components.iter().filter_map(|e| {
            let module = e.module.as_deref()?.as_module();
            Some((e.key, module))
        });
        let controls = self.controls.iter().filter_map(|e| {
            let module = e.module.as_deref()?.as_module();
            Some((e.key, module))
        });
        for (key, module) in components.chain(controls) {
            let Some(serializable) = module.serializable() else {
                continue;
            };
            let mut section = Bundle::new(key.name());
            serializable.write(&mut section)?;
            bundle.put_bundle(section);
        }
        Ok(())
    }

    /// Restore serializable modules from sub-bundles written by [`save`](Self::save).
    ///
    /// Best effort: sections for absent types are ignored, modules without a section
    /// keep their current state, and a section that fails to read is skipped.
    pub fn load(&mut self, bundle: &Bundle) {
        let id = self.id;
        let keys: Vec<ModuleKey> = self.components.keys().chain(self.controls.keys()).collect();
        for key in keys {
            let Some(section) = bundle.get_bundle(key.name()) else {
                continue;
            };
            let module = match self.components.get_mut(key.type_id()) {
                Some(component) => Some(component.as_module_mut()),
                None => self.controls.get_mut(key.type_id()).map(|c| c.as_module_mut()),
            };
            let Some(serializable) = module.and_then(|m| m.serializable_mut()) else {
                continue;
            };
            if let Err(e) = serializable.read(section) {
                warn!("Entity {}: failed to load {}: {}", id, key, e);
            }
        }
    }

    // ---- Module listeners ----

    /// Register a listener. The entity holds it weakly; dropping the last strong
    /// reference unregisters it.
    pub fn add_module_listener<L: ModuleListener + 'static>(&mut self, listener: &Arc<Mutex<L>>) {
        let listener: Arc<Mutex<dyn ModuleListener>> = listener.clone();
        self.module_listeners.push(Arc::downgrade(&listener));
    }

    pub fn remove_module_listener<L: ModuleListener + 'static>(&mut self, listener: &Arc<Mutex<L>>) {
        let target = Arc::as_ptr(listener) as *const ();
        self.module_listeners.retain(|weak| match weak.upgrade() {
            Some(l) => Arc::as_ptr(&l) as *const () != target,
            None => false,
        });
    }

    // ---- World integration ----

    pub fn world(&self) -> Option<WorldId> {
        self.world
    }

    pub fn is_active(&self) -> bool {
        self.activation.is_active()
    }

    /// Run `f` each time the entity becomes active. Not fired for the current state.
    pub fn on_active(&mut self, mut f: impl FnMut() + Send + 'static) {
        self.activation.observe(move |active| {
            if active {
                f();
            }
        });
    }

    /// Run `f` each time the entity stops being active.
    pub fn on_not_active(&mut self, mut f: impl FnMut() + Send + 'static) {
        self.activation.observe(move |active| {
            if !active {
                f();
            }
        });
    }

    pub(crate) fn on_added_to_world(&mut self, world: WorldId) {
        self.world = Some(world);
        self.activation.set(true);
    }

    pub(crate) fn on_removed_from_world(&mut self) {
        self.world = None;
        self.activation.set(false);
    }

    /// Leave the current world. The world drops detached entities on its next sweep.
    /// No-op when not in a world.
    pub fn remove_from_world(&mut self) {
        if let Some(world) = self.world {
            debug!("Entity {} leaving {}", self.id, world);
            self.on_removed_from_world();
        }
    }

    // ---- Properties ----

    pub fn set_property<T: Any + Send + Sync>(&mut self, key: impl Into<String>, value: T) {
        self.properties.set(key, value);
    }

    pub fn set_property_null(&mut self, key: impl Into<String>) {
        self.properties.set_null(key);
    }

    /// `None` when the key is absent, null, or holds another type.
    pub fn get_property<T: Any>(&self, key: &str) -> Option<&T> {
        self.properties.get(key)
    }

    pub fn get_property_mut<T: Any>(&mut self, key: &str) -> Option<&mut T> {
        self.properties.get_mut(key)
    }

    pub fn get_property_optional<T: Any + Clone>(&self, key: &str) -> Option<T> {
        self.properties.get_optional(key)
    }

    pub fn properties(&self) -> &Properties {
        &self.properties
    }

    /// Resolve a property naming a script resource.
    pub fn get_script_handler(&self, key: &str) -> Option<ScriptHandler> {
        self.properties
            .get::<String>(key)
            .map(|script| ScriptHandler::new(script.as_str()))
    }

    // ---- Core component accessors ----

    fn position_component(&self) -> &PositionComponent {
        self.core::<PositionComponent>()
    }

    fn position_component_mut(&mut self) -> &mut PositionComponent {
        self.core_mut::<PositionComponent>()
    }

    fn core<T: Component>(&self) -> &T {
        self.get_component_optional::<T>()
            .expect("core components are never detached")
    }

    fn core_mut<T: Component>(&mut self) -> &mut T {
        self.get_component_mut::<T>()
            .expect("core components are never detached")
    }

    pub fn position(&self) -> DVec2 {
        self.position_component().value
    }

    pub fn set_position(&mut self, position: DVec2) {
        self.position_component_mut().value = position;
    }

    pub fn x(&self) -> f64 {
        self.position().x
    }

    pub fn y(&self) -> f64 {
        self.position().y
    }

    pub fn set_x(&mut self, x: f64) {
        self.position_component_mut().value.x = x;
    }

    pub fn set_y(&mut self, y: f64) {
        self.position_component_mut().value.y = y;
    }

    pub fn translate(&mut self, delta: DVec2) {
        self.position_component_mut().value += delta;
    }

    pub fn translate_x(&mut self, dx: f64) {
        self.position_component_mut().value.x += dx;
    }

    pub fn translate_y(&mut self, dy: f64) {
        self.position_component_mut().value.y += dy;
    }

    /// Rotation in degrees.
    pub fn rotation(&self) -> f64 {
        self.core::<RotationComponent>().value
    }

    pub fn set_rotation(&mut self, degrees: f64) {
        self.core_mut::<RotationComponent>().value = degrees;
    }

    pub fn rotate_by(&mut self, degrees: f64) {
        self.core_mut::<RotationComponent>().value += degrees;
    }

    pub fn width(&self) -> f64 {
        self.core::<BoundingBoxComponent>().width()
    }

    pub fn height(&self) -> f64 {
        self.core::<BoundingBoxComponent>().height()
    }

    pub fn bounding_box(&self) -> &BoundingBoxComponent {
        self.core()
    }

    pub fn bounding_box_mut(&mut self) -> &mut BoundingBoxComponent {
        self.core_mut()
    }

    pub fn entity_type(&self) -> &str {
        &self.core::<TypeComponent>().value
    }

    pub fn set_type(&mut self, value: impl Into<String>) {
        self.core_mut::<TypeComponent>().value = value.into();
    }

    pub fn is_type(&self, value: &str) -> bool {
        self.entity_type() == value
    }

    pub fn view(&self) -> &ViewComponent {
        self.core()
    }

    /// Replace the entity's visual nodes with `node`.
    pub fn set_view(&mut self, node: ViewNode) {
        self.core_mut::<ViewComponent>().set_view(node);
    }

    pub fn set_view_from_texture(&mut self, asset: impl Into<String>) {
        self.set_view(ViewNode::texture(asset));
    }
}

impl Default for Entity {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Entity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Entity")
            .field("id", &self.id)
            .field("components", &self.components.keys().collect::<Vec<_>>())
            .field("controls", &self.controls.keys().collect::<Vec<_>>())
            .field("active", &self.is_active())
            .finish()
    }
}

fn not_found<T: 'static>(kind: ModuleKind) -> EntityError {
    EntityError::NotFound {
        kind,
        name: ModuleKey::of::<T>().short_name(),
    }
}

fn live_listeners(listeners: &mut Vec<Weak<Mutex<dyn ModuleListener>>>) -> Vec<Arc<Mutex<dyn ModuleListener>>> {
    listeners.retain(|l| l.strong_count() > 0);
    listeners.iter().filter_map(Weak::upgrade).collect()
}

fn notify_added(listeners: &mut Vec<Weak<Mutex<dyn ModuleListener>>>, module: &mut dyn Module) {
    for listener in live_listeners(listeners) {
        listener.lock().on_added(module);
    }
}

fn notify_removed(listeners: &mut Vec<Weak<Mutex<dyn ModuleListener>>>, module: &mut dyn Module) {
    for listener in live_listeners(listeners) {
        listener.lock().on_removed(module);
    }
}
