//! Client-side world state: placed objects, the avatar and the terrain.
//!
//! # Invariants
//! - Exactly one registry record per pickable object node, and vice versa.
//! - Deletion removes the scene node before the record.
//! - The avatar has one root node; appearance changes rebuild its children.

mod avatar;
mod object;
mod registry;
mod terrain;

pub use avatar::AvatarController;
pub use object::{
    DEFAULT_OBJECT_COLOR, ExternalItem, ObjectAppearance, ObjectFlags, ObjectForm, ObjectKind,
    ObjectPatch, ObjectSpec, SceneObject,
};
pub use registry::ObjectRegistry;
pub use terrain::{TerrainController, TerrainUpdate};
