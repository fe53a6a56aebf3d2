//! The five components every entity carries for its whole lifetime.
//!
//! They are installed when an entity is constructed and cannot be removed.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use ember_core::{Bundle, BundleError, DVec2};
use serde::{Deserialize, Serialize};

use crate::component::Component;
use crate::module::{Module, ModuleKey, ModuleState, SerializableModule};

/// Keys of the core component types, in installation order.
pub fn core_component_keys() -> [ModuleKey; 5] {
    [
        ModuleKey::of::<TypeComponent>(),
        ModuleKey::of::<PositionComponent>(),
        ModuleKey::of::<RotationComponent>(),
        ModuleKey::of::<BoundingBoxComponent>(),
        ModuleKey::of::<ViewComponent>(),
    ]
}

pub fn is_core_component(key: ModuleKey) -> bool {
    core_component_keys().contains(&key)
}

/// Arbitrary type tag used by game code to classify entities.
#[derive(Debug, Clone, Default)]
pub struct TypeComponent {
    state: ModuleState,
    pub value: String,
}

impl TypeComponent {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            state: ModuleState::new(),
            value: value.into(),
        }
    }
}

impl Module for TypeComponent {
    crate::impl_module_state!(state);

    fn serializable(&self) -> Option<&dyn SerializableModule> {
        Some(self)
    }

    fn serializable_mut(&mut self) -> Option<&mut dyn SerializableModule> {
        Some(self)
    }
}

impl Component for TypeComponent {
    fn copy_component(&self) -> Option<Box<dyn Component>> {
        Some(Box::new(self.clone()))
    }
}

impl SerializableModule for TypeComponent {
    fn write(&self, bundle: &mut Bundle) -> Result<(), BundleError> {
        bundle.put("type", &self.value)
    }

    fn read(&mut self, bundle: &Bundle) -> Result<(), BundleError> {
        self.value = bundle.get("type")?;
        Ok(())
    }
}

/// World-space position of the entity's origin.
#[derive(Debug, Clone, Default)]
pub struct PositionComponent {
    state: ModuleState,
    pub value: DVec2,
}

impl PositionComponent {
    pub fn new(x: f64, y: f64) -> Self {
        Self {
            state: ModuleState::new(),
            value: DVec2::new(x, y),
        }
    }
}

impl Module for PositionComponent {
    crate::impl_module_state!(state);

    fn serializable(&self) -> Option<&dyn SerializableModule> {
        Some(self)
    }

    fn serializable_mut(&mut self) -> Option<&mut dyn SerializableModule> {
        Some(self)
    }
}

impl Component for PositionComponent {
    fn copy_component(&self) -> Option<Box<dyn Component>> {
        Some(Box::new(self.clone()))
    }
}

impl SerializableModule for PositionComponent {
    fn write(&self, bundle: &mut Bundle) -> Result<(), BundleError> {
        bundle.put("x", &self.value.x)?;
        bundle.put("y", &self.value.y)
    }

    fn read(&mut self, bundle: &Bundle) -> Result<(), BundleError> {
        let x = bundle.get("x")?;
        let y = bundle.get("y")?;
        self.value = DVec2::new(x, y);
        Ok(())
    }
}

/// Rotation in degrees.
#[derive(Debug, Clone, Default)]
pub struct RotationComponent {
    state: ModuleState,
    pub value: f64,
}

impl RotationComponent {
    pub fn new(degrees: f64) -> Self {
        Self {
            state: ModuleState::new(),
            value: degrees,
        }
    }
}

impl Module for RotationComponent {
    crate::impl_module_state!(state);

    fn serializable(&self) -> Option<&dyn SerializableModule> {
        Some(self)
    }

    fn serializable_mut(&mut self) -> Option<&mut dyn SerializableModule> {
        Some(self)
    }
}

impl Component for RotationComponent {
    fn copy_component(&self) -> Option<Box<dyn Component>> {
        Some(Box::new(self.clone()))
    }
}

impl SerializableModule for RotationComponent {
    fn write(&self, bundle: &mut Bundle) -> Result<(), BundleError> {
        bundle.put("angle", &self.value)
    }

    fn read(&mut self, bundle: &Bundle) -> Result<(), BundleError> {
        self.value = bundle.get("angle")?;
        Ok(())
    }
}

/// Axis-aligned box relative to the entity origin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HitBox {
    pub name: String,
    pub min: DVec2,
    pub size: DVec2,
}

impl HitBox {
    pub fn new(name: impl Into<String>, min: DVec2, size: DVec2) -> Self {
        Self {
            name: name.into(),
            min,
            size,
        }
    }

    pub fn max(&self) -> DVec2 {
        self.min + self.size
    }
}

/// Collection of hit boxes. Width and height are derived from their extents.
#[derive(Debug, Clone, Default)]
pub struct BoundingBoxComponent {
    state: ModuleState,
    hit_boxes: Vec<HitBox>,
}

impl BoundingBoxComponent {
    pub fn add_hit_box(&mut self, hit_box: HitBox) {
        self.hit_boxes.push(hit_box);
    }

    pub fn remove_hit_box(&mut self, name: &str) -> bool {
        let before = self.hit_boxes.len();
        self.hit_boxes.retain(|b| b.name != name);
        self.hit_boxes.len() != before
    }

    pub fn clear_hit_boxes(&mut self) {
        self.hit_boxes.clear();
    }

    pub fn hit_boxes(&self) -> &[HitBox] {
        &self.hit_boxes
    }

    /// Furthest right extent of any hit box, or 0 with no boxes.
    pub fn width(&self) -> f64 {
        self.hit_boxes
            .iter()
            .map(|b| b.max().x)
            .fold(0.0, f64::max)
    }

    /// Furthest bottom extent of any hit box, or 0 with no boxes.
    pub fn height(&self) -> f64 {
        self.hit_boxes
            .iter()
            .map(|b| b.max().y)
            .fold(0.0, f64::max)
    }
}

impl Module for BoundingBoxComponent {
    crate::impl_module_state!(state);

    fn serializable(&self) -> Option<&dyn SerializableModule> {
        Some(self)
    }

    fn serializable_mut(&mut self) -> Option<&mut dyn SerializableModule> {
        Some(self)
    }
}

impl Component for BoundingBoxComponent {
    fn copy_component(&self) -> Option<Box<dyn Component>> {
        Some(Box::new(self.clone()))
    }
}

impl SerializableModule for BoundingBoxComponent {
    fn write(&self, bundle: &mut Bundle) -> Result<(), BundleError> {
        bundle.put("hit_boxes", &self.hit_boxes)
    }

    fn read(&mut self, bundle: &Bundle) -> Result<(), BundleError> {
        self.hit_boxes = bundle.get("hit_boxes")?;
        Ok(())
    }
}

/// A visual node attached to an entity. The entity stores nodes without interpreting them.
#[derive(Clone)]
pub enum ViewNode {
    /// A texture referenced by asset name.
    Texture(String),
    /// Any node type owned by the rendering layer.
    Custom(Arc<dyn Any + Send + Sync>),
}

impl ViewNode {
    pub fn texture(asset: impl Into<String>) -> Self {
        ViewNode::Texture(asset.into())
    }

    pub fn custom<T: Any + Send + Sync>(node: T) -> Self {
        ViewNode::Custom(Arc::new(node))
    }

    pub fn as_texture(&self) -> Option<&str> {
        match self {
            ViewNode::Texture(asset) => Some(asset),
            ViewNode::Custom(_) => None,
        }
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        match self {
            ViewNode::Texture(_) => None,
            ViewNode::Custom(node) => node.downcast_ref(),
        }
    }
}

impl fmt::Debug for ViewNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ViewNode::Texture(asset) => f.debug_tuple("Texture").field(asset).finish(),
            ViewNode::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

/// Visual nodes rendered for the entity.
#[derive(Debug, Clone, Default)]
pub struct ViewComponent {
    state: ModuleState,
    nodes: Vec<ViewNode>,
}

impl ViewComponent {
    /// Replace every node with `node`.
    pub fn set_view(&mut self, node: ViewNode) {
        self.nodes.clear();
        self.nodes.push(node);
    }

    pub fn add_node(&mut self, node: ViewNode) {
        self.nodes.push(node);
    }

    pub fn clear(&mut self) {
        self.nodes.clear();
    }

    pub fn nodes(&self) -> &[ViewNode] {
        &self.nodes
    }
}

impl Module for ViewComponent {
    crate::impl_module_state!(state);
}

impl Component for ViewComponent {
    fn copy_component(&self) -> Option<Box<dyn Component>> {
        Some(Box::new(self.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bounding_box_extents() {
        let mut bbox = BoundingBoxComponent::default();
        assert_eq!(bbox.width(), 0.0);
        bbox.add_hit_box(HitBox::new("body", DVec2::ZERO, DVec2::new(40.0, 20.0)));
        bbox.add_hit_box(HitBox::new("head", DVec2::new(10.0, -10.0), DVec2::new(10.0, 50.0)));
        assert_eq!(bbox.width(), 40.0);
        assert_eq!(bbox.height(), 40.0);
        assert!(bbox.remove_hit_box("head"));
        assert!(!bbox.remove_hit_box("head"));
        assert_eq!(bbox.height(), 20.0);
    }

    #[test]
    fn view_nodes() {
        let mut view = ViewComponent::default();
        view.add_node(ViewNode::texture("ship.png"));
        view.add_node(ViewNode::custom(7u32));
        assert_eq!(view.nodes().len(), 2);
        assert_eq!(view.nodes()[1].downcast_ref::<u32>(), Some(&7));

        view.set_view(ViewNode::texture("boom.png"));
        assert_eq!(view.nodes().len(), 1);
        assert_eq!(view.nodes()[0].as_texture(), Some("boom.png"));
    }

    #[test]
    fn position_bundle() {
        let position = PositionComponent::new(3.0, -4.0);
        let mut bundle = Bundle::new("PositionComponent");
        position.write(&mut bundle).unwrap();

        let mut restored = PositionComponent::default();
        restored.read(&bundle).unwrap();
        assert_eq!(restored.value, DVec2::new(3.0, -4.0));
    }

    #[test]
    fn core_keys_are_distinct() {
        let keys = core_component_keys();
        for (i, a) in keys.iter().enumerate() {
            for b in &keys[i + 1..] {
                assert_ne!(a, b);
            }
        }
        assert!(is_core_component(ModuleKey::of::<ViewComponent>()));
        assert!(!is_core_component(ModuleKey::of::<u32>()));
    }
}
