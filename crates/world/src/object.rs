use glam::Vec3;
use gridview_common::{ObjectId, Rgb, Transform};
use gridview_procgen::{Mesh, UnknownOption};
use gridview_scene::NodeId;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Color given to objects when none is specified.
pub const DEFAULT_OBJECT_COLOR: Rgb = Rgb::new(0.957, 0.263, 0.212);

/// Geometry class of a placed object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ObjectKind {
    #[default]
    Box,
    Sphere,
    Cylinder,
    Prism,
    Torus,
    /// Imported mesh. The core has no mesh source, so it renders as a box.
    Mesh,
}

impl ObjectKind {
    pub const ALL: [ObjectKind; 6] = [
        ObjectKind::Box,
        ObjectKind::Sphere,
        ObjectKind::Cylinder,
        ObjectKind::Prism,
        ObjectKind::Torus,
        ObjectKind::Mesh,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ObjectKind::Box => "box",
            ObjectKind::Sphere => "sphere",
            ObjectKind::Cylinder => "cylinder",
            ObjectKind::Prism => "prism",
            ObjectKind::Torus => "torus",
            ObjectKind::Mesh => "mesh",
        }
    }

    /// Unknown kinds become a box.
    pub fn parse_or_default(s: &str) -> Self {
        s.parse().unwrap_or_else(|e: UnknownOption| {
            tracing::warn!("{e}, using box");
            ObjectKind::Box
        })
    }

    /// Unit-sized geometry for this kind; size comes from the transform scale.
    pub fn geometry(self) -> Mesh {
        match self {
            ObjectKind::Box | ObjectKind::Mesh => Mesh::cuboid(1.0, 1.0, 1.0),
            ObjectKind::Sphere => Mesh::icosphere(0.5, 2),
            ObjectKind::Cylinder => Mesh::cylinder(0.5, 0.5, 1.0, 24),
            ObjectKind::Prism => Mesh::cone(0.5, 1.0, 4),
            ObjectKind::Torus => Mesh::torus(0.4, 0.15, 12, 32),
        }
    }

    /// Map a coarse inventory item type onto an object kind.
    pub fn from_item_type(item_type: &str) -> Self {
        match item_type.trim().to_ascii_lowercase().as_str() {
            "sphere" | "ball" => ObjectKind::Sphere,
            "cylinder" => ObjectKind::Cylinder,
            "prism" | "pyramid" => ObjectKind::Prism,
            "torus" | "ring" => ObjectKind::Torus,
            "mesh" => ObjectKind::Mesh,
            _ => ObjectKind::Box,
        }
    }
}

impl FromStr for ObjectKind {
    type Err = UnknownOption;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|k| k.as_str() == lowered)
            .ok_or_else(|| UnknownOption {
                kind: "object kind",
                value: s.to_string(),
            })
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ObjectAppearance {
    pub color: Rgb,
    /// 0 = opaque.
    pub transparency: f32,
}

impl Default for ObjectAppearance {
    fn default() -> Self {
        Self {
            color: DEFAULT_OBJECT_COLOR,
            transparency: 0.0,
        }
    }
}

/// Simulation metadata. No geometric effect.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectFlags {
    pub physical: bool,
    pub phantom: bool,
    pub temporary: bool,
}

/// Everything needed to create an object.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ObjectSpec {
    pub kind: ObjectKind,
    pub name: Option<String>,
    pub transform: Transform,
    pub appearance: ObjectAppearance,
    pub flags: ObjectFlags,
}

impl ObjectSpec {
    pub fn new(kind: ObjectKind) -> Self {
        Self {
            kind,
            ..Self::default()
        }
    }

    /// Uniform size, as the editing form sets it.
    pub fn with_size(mut self, size: f32) -> Self {
        self.transform.scale = Vec3::splat(size);
        self
    }

    pub fn with_position(mut self, position: Vec3) -> Self {
        self.transform.position = position;
        self
    }

    pub fn with_color(mut self, color: Rgb) -> Self {
        self.appearance.color = color;
        self
    }

    pub fn with_transparency(mut self, transparency: f32) -> Self {
        self.appearance.transparency = transparency.clamp(0.0, 1.0);
        self
    }

    pub fn with_flags(mut self, flags: ObjectFlags) -> Self {
        self.flags = flags;
        self
    }
}

/// Partial update. `None` fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ObjectPatch {
    pub kind: Option<ObjectKind>,
    pub position: Option<Vec3>,
    pub rotation: Option<Vec3>,
    pub scale: Option<Vec3>,
    pub color: Option<Rgb>,
    pub transparency: Option<f32>,
    pub physical: Option<bool>,
    pub phantom: Option<bool>,
    pub temporary: Option<bool>,
}

impl ObjectPatch {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    fn touches_geometry(&self) -> bool {
        self.kind.is_some()
    }
}

/// Raw values from the object editing form. Strings are parsed leniently.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ObjectForm {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub size: Option<f32>,
    pub color: Option<String>,
    pub transparency: Option<f32>,
    pub physical: Option<bool>,
    pub phantom: Option<bool>,
    pub temporary: Option<bool>,
}

impl ObjectForm {
    fn color(&self) -> Option<Rgb> {
        let raw = self.color.as_deref()?;
        let parsed = Rgb::from_hex(raw);
        if parsed.is_none() {
            tracing::warn!(color = raw, "ignoring malformed color");
        }
        parsed
    }

    pub fn to_spec(&self) -> ObjectSpec {
        let mut spec = ObjectSpec::new(
            self.kind
                .as_deref()
                .map_or(ObjectKind::Box, ObjectKind::parse_or_default),
        )
        .with_size(self.size.unwrap_or(1.0))
        .with_transparency(self.transparency.unwrap_or(0.0))
        .with_flags(ObjectFlags {
            physical: self.physical.unwrap_or(false),
            phantom: self.phantom.unwrap_or(false),
            temporary: self.temporary.unwrap_or(false),
        });
        if let Some(color) = self.color() {
            spec = spec.with_color(color);
        }
        spec
    }

    pub fn to_patch(&self) -> ObjectPatch {
        ObjectPatch {
            kind: self.kind.as_deref().map(ObjectKind::parse_or_default),
            scale: self.size.map(Vec3::splat),
            color: self.color(),
            transparency: self.transparency.map(|t| t.clamp(0.0, 1.0)),
            physical: self.physical,
            phantom: self.phantom,
            temporary: self.temporary,
            ..ObjectPatch::default()
        }
    }
}

/// An inventory item dropped into the world.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ExternalItem {
    pub name: String,
    #[serde(rename = "type")]
    pub item_type: String,
    pub position: Option<Vec3>,
}

/// The registry's record of one placed object.
#[derive(Debug, Clone, PartialEq)]
pub struct SceneObject {
    pub id: ObjectId,
    pub node: NodeId,
    pub kind: ObjectKind,
    pub name: Option<String>,
    pub transform: Transform,
    pub appearance: ObjectAppearance,
    pub flags: ObjectFlags,
}

impl SceneObject {
    /// Apply the provided fields. Returns true if geometry must be rebuilt.
    pub(crate) fn apply(&mut self, patch: &ObjectPatch) -> bool {
        if let Some(kind) = patch.kind {
            self.kind = kind;
        }
        if let Some(p) = patch.position {
            self.transform.position = p;
        }
        if let Some(r) = patch.rotation {
            self.transform.rotation = r;
        }
        if let Some(s) = patch.scale {
            self.transform.scale = s;
        }
        if let Some(c) = patch.color {
            self.appearance.color = c;
        }
        if let Some(t) = patch.transparency {
            self.appearance.transparency = t.clamp(0.0, 1.0);
        }
        if let Some(v) = patch.physical {
            self.flags.physical = v;
        }
        if let Some(v) = patch.phantom {
            self.flags.phantom = v;
        }
        if let Some(v) = patch.temporary {
            self.flags.temporary = v;
        }
        patch.touches_geometry()
    }
}
