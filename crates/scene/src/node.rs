use gridview_common::{Rgb, Transform};
use gridview_procgen::Mesh;
use std::fmt;

/// Handle to a node in the scene graph. Never reused within one graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u64);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node{}", self.0)
    }
}

/// Surface appearance of a node.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Material {
    pub color: Rgb,
    /// 0 = opaque, 1 = fully transparent.
    pub transparency: f32,
    pub emissive: Rgb,
    pub roughness: f32,
    pub metalness: f32,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            color: Rgb::WHITE,
            transparency: 0.0,
            emissive: Rgb::BLACK,
            roughness: 0.7,
            metalness: 0.0,
        }
    }
}

impl Material {
    pub fn colored(color: Rgb) -> Self {
        Self {
            color,
            ..Self::default()
        }
    }

    pub fn opacity(&self) -> f32 {
        1.0 - self.transparency.clamp(0.0, 1.0)
    }

    pub fn rgba(&self) -> [f32; 4] {
        [self.color.r, self.color.g, self.color.b, self.opacity()]
    }
}

/// Everything needed to create a node.
#[derive(Debug, Clone, Default)]
pub struct NodeDesc {
    pub label: String,
    pub transform: Transform,
    pub material: Material,
    pub mesh: Option<Mesh>,
}

impl NodeDesc {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            ..Self::default()
        }
    }

    pub fn with_transform(mut self, transform: Transform) -> Self {
        self.transform = transform;
        self
    }

    pub fn with_material(mut self, material: Material) -> Self {
        self.material = material;
        self
    }

    pub fn with_mesh(mut self, mesh: Mesh) -> Self {
        self.mesh = Some(mesh);
        self
    }
}

/// A renderable entity in the scene graph.
#[derive(Debug, Clone)]
pub struct SceneNode {
    pub id: NodeId,
    pub label: String,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    pub transform: Transform,
    pub material: Material,
    pub mesh: Option<Mesh>,
    pub visible: bool,
}
