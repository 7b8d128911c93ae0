//! Shared value types for the viewer: ids, transforms, colors, axis
//! conversion, typed observers, configuration.

pub mod config;
pub mod observer;
pub mod types;

pub use config::{ConfigError, MAX_TERRAIN_RESOLUTION, ViewerConfig};
pub use observer::{Observers, Subscription};
pub use types::{ObjectId, Rgb, Transform, scene_to_wire, wire_to_scene};
