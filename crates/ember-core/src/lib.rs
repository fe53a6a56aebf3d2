//! Ember Core - Shared types for the Ember engine
//!
//! This crate provides the foundational types used throughout the engine:
//! - Mathematical primitives (re-exported from glam)
//! - Entity and world identifiers
//! - The key-value `Bundle` used to save and load entity state

pub mod bundle;
pub mod types;

pub use bundle::{Bundle, BundleError};
pub use glam::{DVec2, Vec2};
pub use types::{EntityId, WorldId};
