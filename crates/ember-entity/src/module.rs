//! The base contract shared by components and controls.
//!
//! A module is identified by its concrete type. `ModuleKey` carries that identity
//! together with the type's name, which is used for diagnostics and as the
//! section name when a module is saved into a [`Bundle`].

use std::any::{Any, TypeId};
use std::fmt;
use std::hash::{Hash, Hasher};

use ember_core::{Bundle, BundleError, EntityId};

/// Stable identity of a concrete module type.
#[derive(Clone, Copy)]
pub struct ModuleKey {
    id: TypeId,
    name: &'static str,
}

impl ModuleKey {
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }

    pub fn type_id(&self) -> TypeId {
        self.id
    }

    /// Fully qualified type name.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Type name without its module path. Generic arguments are shortened the same way,
    /// so `a::Wrapper<b::Inner>` becomes `Wrapper<Inner>`.
    pub fn short_name(&self) -> String {
        let mut out = String::with_capacity(self.name.len());
        let mut segment = String::new();
        for ch in self.name.chars() {
            match ch {
                ':' => segment.clear(),
                '<' | '>' | ',' | ' ' | '(' | ')' | '[' | ']' | ';' | '&' => {
                    out.push_str(&segment);
                    segment.clear();
                    out.push(ch);
                }
                _ => segment.push(ch),
            }
        }
        out.push_str(&segment);
        out
    }

    /// Closures and other unnamed types have no stable name to key on.
    pub fn is_anonymous(&self) -> bool {
        self.name.is_empty() || self.name.contains("{{closure}}")
    }
}

impl PartialEq for ModuleKey {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for ModuleKey {}

impl Hash for ModuleKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for ModuleKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ModuleKey({})", self.name)
    }
}

impl fmt::Display for ModuleKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.short_name())
    }
}

/// Framework-managed state embedded in every module.
#[derive(Debug, Clone, Default)]
pub struct ModuleState {
    pub(crate) owner: Option<EntityId>,
    pub(crate) paused: bool,
}

impl ModuleState {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Common base of [`Component`](crate::Component) and [`Control`](crate::Control).
///
/// Implementors embed a [`ModuleState`] and usually expand [`impl_module_state!`]
/// inside their `impl Module` block to provide the accessor methods.
pub trait Module: Any + Send {
    fn state(&self) -> &ModuleState;
    fn state_mut(&mut self) -> &mut ModuleState;
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
    fn as_module(&self) -> &dyn Module;
    fn as_module_mut(&mut self) -> &mut dyn Module;

    /// Module types that must already be attached to the entity before this one.
    ///
    /// Must return the same list for every instance of a type.
    fn requires(&self) -> Vec<ModuleKey> {
        Vec::new()
    }

    fn serializable(&self) -> Option<&dyn SerializableModule> {
        None
    }

    fn serializable_mut(&mut self) -> Option<&mut dyn SerializableModule> {
        None
    }

    /// The entity this module is attached to.
    fn owner(&self) -> Option<EntityId> {
        self.state().owner
    }

    fn is_paused(&self) -> bool {
        self.state().paused
    }

    fn pause(&mut self) {
        self.state_mut().paused = true;
    }

    fn resume(&mut self) {
        self.state_mut().paused = false;
    }
}

/// Capability for modules that can write their state into a bundle and read it back.
pub trait SerializableModule {
    fn write(&self, bundle: &mut Bundle) -> Result<(), BundleError>;
    fn read(&mut self, bundle: &Bundle) -> Result<(), BundleError>;
}

/// Observer notified synchronously when modules are attached to or detached from an entity.
///
/// `on_removed` runs while the module still holds its state and owner.
pub trait ModuleListener: Send {
    fn on_added(&mut self, module: &mut dyn Module);
    fn on_removed(&mut self, module: &mut dyn Module);
}

/// Expands to the accessor methods of [`Module`] for a type that stores its
/// [`ModuleState`] in the named field.
#[macro_export]
macro_rules! impl_module_state {
    ($field:ident) => {
        fn state(&self) -> &$crate::ModuleState {
            &self.$field
        }

        fn state_mut(&mut self) -> &mut $crate::ModuleState {
            &mut self.$field
        }

        fn as_any(&self) -> &dyn ::std::any::Any {
            self
        }

        fn as_any_mut(&mut self) -> &mut dyn ::std::any::Any {
            self
        }

        fn as_module(&self) -> &dyn $crate::Module {
            self
        }

        fn as_module_mut(&mut self) -> &mut dyn $crate::Module {
            self
        }
    };
}
