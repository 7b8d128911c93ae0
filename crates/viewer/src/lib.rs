//! The viewer application context.
//!
//! [`Viewer`] owns the scene graph, the object registry, the avatar and
//! terrain controllers and the session client, and runs one frame at a time:
//! motion, then session work, then render. Front ends (the desktop window,
//! the headless CLI) only translate their input into [`Action`]s and call
//! [`Viewer::frame`].

mod affordances;
mod viewer;

pub use affordances::EditAffordances;
pub use viewer::Viewer;

pub use gridview_common as common;
pub use gridview_input as input;
pub use gridview_input::{Action, MoveKey};
pub use gridview_procgen as procgen;
pub use gridview_scene as scene;
pub use gridview_session as session;
pub use gridview_world as world;
