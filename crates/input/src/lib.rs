//! Input: raw events mapped to viewer actions, and held movement keys
//! integrated into avatar motion.
//!
//! # Invariants
//! - The viewer consumes [`Action`]s, never raw window events.
//! - Motion depends on elapsed time only, not on how many frames covered it.

pub mod action;
pub mod motion;

pub use action::{Action, HeldInput, MoveKey};
pub use motion::MotionIntegrator;
