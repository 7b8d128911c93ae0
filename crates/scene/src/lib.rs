//! Scene ownership.
//!
//! # Invariants
//! - Every renderable node is owned by exactly one [`SceneGraph`].
//! - Surfaces read frames; they never mutate the scene.
//! - The selection is always pickable and its highlight is restored on
//!   deselect.

mod camera;
mod clock;
mod graph;
mod node;
mod pick;
mod surface;

pub use camera::{OrbitCamera, Ray};
pub use clock::{FrameClock, FrameLoop, FrameTick, LoopControl, ManualClock, SystemClock};
pub use graph::{SELECTION_EMISSIVE, SceneGraph, SelectionEvent};
pub use node::{Material, NodeDesc, NodeId, SceneNode};
pub use pick::ray_triangle;
pub use surface::{DebugTextSurface, DrawItem, FrameView, RenderSurface, SurfaceError};
