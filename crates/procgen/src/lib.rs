//! Procedural Generators: primitive meshes, avatar bodies, terrain.
//!
//! # Invariants
//! - Every generator is a pure function of its inputs. No randomness, no
//!   hidden state.
//! - Unknown appearance options resolve to a default variant, never an error.

pub mod avatar;
pub mod mesh;
pub mod terrain;

pub use avatar::{
    AppearanceUpdate, AvatarAppearance, AvatarModel, AvatarPart, BodyShape, HairStyle,
    OutfitStyle, PartKind, Surface, UnknownOption, build_avatar,
};
pub use mesh::Mesh;
pub use terrain::{HeightField, TerrainParams, height_at, water_plane, water_position};
