//! Ember Entity - Entity, component, and control framework
//!
//! An [`Entity`] aggregates typed components (state) and controls (per-frame
//! behavior). At most one module of each concrete type may be attached, modules
//! can declare other module types they require, and the five core components are
//! present on every entity for its whole lifetime. A [`World`] owns entities and
//! drives their activation and updates.

mod activation;
mod component;
mod control;
pub mod controls;
mod core_components;
mod entity;
mod error;
mod module;
mod property;
mod world;

pub use component::Component;
pub use control::{Control, FnControl};
pub use core_components::{
    core_component_keys, is_core_component, BoundingBoxComponent, HitBox, PositionComponent,
    RotationComponent, TypeComponent, ViewComponent, ViewNode,
};
pub use entity::Entity;
pub use error::{EntityError, ModuleKind, WorldError};
pub use module::{Module, ModuleKey, ModuleListener, ModuleState, SerializableModule};
pub use property::{Properties, ScriptHandler};
pub use world::{World, WorldListener};
