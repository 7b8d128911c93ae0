/// Movement keys that are tracked while held.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MoveKey {
    Forward,
    Backward,
    StrafeLeft,
    StrafeRight,
    TurnLeft,
    TurnRight,
}

impl MoveKey {
    pub const ALL: [MoveKey; 6] = [
        MoveKey::Forward,
        MoveKey::Backward,
        MoveKey::StrafeLeft,
        MoveKey::StrafeRight,
        MoveKey::TurnLeft,
        MoveKey::TurnRight,
    ];

    /// Map a key name (`"w"`, `"ArrowUp"`, `"KeyW"`, ...) to a movement key.
    pub fn from_key_name(name: &str) -> Option<Self> {
        let name = name.trim().to_ascii_lowercase();
        let name = name.strip_prefix("key").unwrap_or(&name);
        match name {
            "w" | "arrowup" => Some(MoveKey::Forward),
            "s" | "arrowdown" => Some(MoveKey::Backward),
            "a" => Some(MoveKey::StrafeLeft),
            "d" => Some(MoveKey::StrafeRight),
            "q" | "arrowleft" => Some(MoveKey::TurnLeft),
            "e" | "arrowright" => Some(MoveKey::TurnRight),
            _ => None,
        }
    }
}

/// A high-level action any front end can produce.
///
/// Pointer coordinates are normalized device coordinates: `x`, `y` in
/// [-1, 1] with +Y up.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    Press(MoveKey),
    Release(MoveKey),
    /// Pick whatever is under the pointer and select it, or deselect.
    Pick { x: f32, y: f32 },
    Deselect,
    /// Create an object of the named kind in front of the avatar.
    CreateObject(String),
    DeleteSelected,
    Orbit { dx: f32, dy: f32 },
    Pan { dx: f32, dy: f32 },
    Zoom(f32),
    Resize { width: u32, height: u32 },
    /// Key not bound to anything.
    Noop,
}

/// Movement keys currently held.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct HeldInput {
    pub forward: bool,
    pub backward: bool,
    pub strafe_left: bool,
    pub strafe_right: bool,
    pub turn_left: bool,
    pub turn_right: bool,
}

impl HeldInput {
    pub fn set(&mut self, key: MoveKey, held: bool) {
        let slot = match key {
            MoveKey::Forward => &mut self.forward,
            MoveKey::Backward => &mut self.backward,
            MoveKey::StrafeLeft => &mut self.strafe_left,
            MoveKey::StrafeRight => &mut self.strafe_right,
            MoveKey::TurnLeft => &mut self.turn_left,
            MoveKey::TurnRight => &mut self.turn_right,
        };
        *slot = held;
    }

    /// Apply a press or release; other actions are ignored.
    pub fn apply(&mut self, action: &Action) -> bool {
        match action {
            Action::Press(key) => self.set(*key, true),
            Action::Release(key) => self.set(*key, false),
            _ => return false,
        }
        true
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }

    pub fn any(&self) -> bool {
        *self != Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_names() {
        assert_eq!(MoveKey::from_key_name("w"), Some(MoveKey::Forward));
        assert_eq!(MoveKey::from_key_name("KeyW"), Some(MoveKey::Forward));
        assert_eq!(MoveKey::from_key_name("ArrowLeft"), Some(MoveKey::TurnLeft));
        assert_eq!(MoveKey::from_key_name("x"), None);
    }

    #[test]
    fn press_and_release() {
        let mut held = HeldInput::default();
        assert!(held.apply(&Action::Press(MoveKey::Forward)));
        assert!(held.forward && held.any());
        held.apply(&Action::Release(MoveKey::Forward));
        assert!(!held.any());
    }

    #[test]
    fn other_actions_do_not_touch_held_state() {
        let mut held = HeldInput::default();
        assert!(!held.apply(&Action::Deselect));
        assert!(!held.apply(&Action::Zoom(1.0)));
        assert!(!held.any());
    }
}
