//! wgpu render backend for the viewer.
//!
//! [`WgpuSurface`] implements the scene's render surface: node meshes are
//! uploaded once into their own vertex and index buffers, and each frame
//! draws the scene's draw list with one instance record per node.
//!
//! # Invariants
//! - The surface never mutates the scene.
//! - Opaque nodes draw before translucent ones; translucent nodes draw back
//!   to front and do not write depth.

mod gpu;
mod shaders;

pub use gpu::{GpuInitError, WgpuSurface};
