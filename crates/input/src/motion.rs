use crate::action::HeldInput;
use glam::Vec3;

/// Turns held movement keys and elapsed time into avatar motion.
///
/// Heading is in radians about +Y; heading 0 faces -Z. Translation stays in
/// the XZ plane.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MotionIntegrator {
    /// Units per second.
    pub speed: f32,
    /// Radians per second.
    pub turn_rate: f32,
    heading: f32,
}

impl MotionIntegrator {
    pub fn new(speed: f32, turn_rate: f32) -> Self {
        Self {
            speed,
            turn_rate,
            heading: 0.0,
        }
    }

    pub fn heading(&self) -> f32 {
        self.heading
    }

    pub fn set_heading(&mut self, heading: f32) {
        self.heading = heading;
    }

    /// Unit vector the avatar faces.
    pub fn forward(&self) -> Vec3 {
        Vec3::new(-self.heading.sin(), 0.0, -self.heading.cos())
    }

    pub fn right(&self) -> Vec3 {
        Vec3::new(self.heading.cos(), 0.0, -self.heading.sin())
    }

    /// Advance by `dt` seconds and return the new position.
    pub fn step(&mut self, held: &HeldInput, position: Vec3, dt: f32) -> Vec3 {
        if dt <= 0.0 {
            return position;
        }

        let turn = axis(held.turn_left, held.turn_right);
        self.heading += turn * self.turn_rate * dt;

        let forward = axis(held.backward, held.forward);
        let strafe = axis(held.strafe_left, held.strafe_right);
        let wish = self.forward() * forward + self.right() * strafe;
        if wish == Vec3::ZERO {
            return position;
        }
        position + wish.normalize() * self.speed * dt
    }
}

/// -1, 0 or 1 from a pair of opposing keys.
fn axis(negative: bool, positive: bool) -> f32 {
    f32::from(u8::from(positive)) - f32::from(u8::from(negative))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn forward_only() -> HeldInput {
        HeldInput {
            forward: true,
            ..HeldInput::default()
        }
    }

    fn run(frames: u32) -> Vec3 {
        let mut motion = MotionIntegrator::new(5.0, 1.8);
        let dt = 1.0 / frames as f32;
        (0..frames).fold(Vec3::ZERO, |p, _| motion.step(&forward_only(), p, dt))
    }

    #[test]
    fn one_second_forward_moves_five_units() {
        for frames in [1, 7, 60, 144, 1000] {
            let p = run(frames);
            assert!((p.z + 5.0).abs() < 1e-3, "{frames} frames: {p}");
            assert!(p.x.abs() < 1e-5);
        }
    }

    #[test]
    fn nothing_held_stays_put() {
        let mut motion = MotionIntegrator::new(5.0, 1.8);
        let p = Vec3::new(1.0, 2.0, 3.0);
        assert_eq!(motion.step(&HeldInput::default(), p, 0.5), p);
    }

    #[test]
    fn opposing_keys_cancel() {
        let mut motion = MotionIntegrator::new(5.0, 1.8);
        let held = HeldInput {
            forward: true,
            backward: true,
            ..HeldInput::default()
        };
        assert_eq!(motion.step(&held, Vec3::ZERO, 1.0), Vec3::ZERO);
    }

    #[test]
    fn diagonal_is_not_faster() {
        let mut motion = MotionIntegrator::new(5.0, 1.8);
        let held = HeldInput {
            forward: true,
            strafe_right: true,
            ..HeldInput::default()
        };
        let p = motion.step(&held, Vec3::ZERO, 1.0);
        assert!((p.length() - 5.0).abs() < 1e-4);
        assert!(p.x > 0.0 && p.z < 0.0);
    }

    #[test]
    fn turning_changes_heading_not_position() {
        let mut motion = MotionIntegrator::new(5.0, 2.0);
        let held = HeldInput {
            turn_left: true,
            ..HeldInput::default()
        };
        let p = motion.step(&held, Vec3::ZERO, 0.5);
        assert_eq!(p, Vec3::ZERO);
        assert!((motion.heading() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn forward_follows_heading() {
        let mut motion = MotionIntegrator::new(5.0, 1.8);
        motion.set_heading(std::f32::consts::FRAC_PI_2);
        let f = motion.forward();
        assert!((f - Vec3::NEG_X).length() < 1e-6);
    }

    #[test]
    fn vertical_position_is_kept() {
        let mut motion = MotionIntegrator::new(5.0, 1.8);
        let p = motion.step(&forward_only(), Vec3::new(0.0, 7.0, 0.0), 0.25);
        assert_eq!(p.y, 7.0);
    }
}
