//! Window input to viewer actions.

use gridview_input::{Action, MoveKey};
use winit::keyboard::KeyCode;

/// Map a key event to an action. Movement keys report press and release;
/// command keys only fire on press.
pub fn key_action(key: KeyCode, pressed: bool) -> Action {
    if let Some(move_key) = MoveKey::from_key_name(&format!("{key:?}")) {
        return if pressed {
            Action::Press(move_key)
        } else {
            Action::Release(move_key)
        };
    }
    if !pressed {
        return Action::Noop;
    }
    match key {
        KeyCode::KeyN => Action::CreateObject("box".into()),
        KeyCode::KeyB => Action::CreateObject("sphere".into()),
        KeyCode::Delete | KeyCode::Backspace => Action::DeleteSelected,
        KeyCode::Escape => Action::Deselect,
        _ => Action::Noop,
    }
}

/// Window pixel coordinates to normalized device coordinates, y up.
pub fn cursor_to_ndc(x: f64, y: f64, width: u32, height: u32) -> (f32, f32) {
    let w = width.max(1) as f64;
    let h = height.max(1) as f64;
    ((2.0 * x / w - 1.0) as f32, (1.0 - 2.0 * y / h) as f32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn movement_keys_press_and_release() {
        assert_eq!(
            key_action(KeyCode::KeyW, true),
            Action::Press(MoveKey::Forward)
        );
        assert_eq!(
            key_action(KeyCode::ArrowLeft, false),
            Action::Release(MoveKey::TurnLeft)
        );
        assert_eq!(
            key_action(KeyCode::KeyD, true),
            Action::Press(MoveKey::StrafeRight)
        );
    }

    #[test]
    fn commands_fire_on_press_only() {
        assert_eq!(key_action(KeyCode::Delete, true), Action::DeleteSelected);
        assert_eq!(key_action(KeyCode::Delete, false), Action::Noop);
        assert_eq!(key_action(KeyCode::Escape, true), Action::Deselect);
        assert_eq!(key_action(KeyCode::F12, true), Action::Noop);
    }

    #[test]
    fn ndc_corners() {
        assert_eq!(cursor_to_ndc(0.0, 0.0, 800, 600), (-1.0, 1.0));
        assert_eq!(cursor_to_ndc(400.0, 300.0, 800, 600), (0.0, 0.0));
        assert_eq!(cursor_to_ndc(800.0, 600.0, 800, 600), (1.0, -1.0));
    }
}
