use glam::{Mat4, Vec2, Vec3, Vec4Swizzles};

/// A ray with a normalized direction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    pub direction: Vec3,
}

/// Orbit camera: rotates around, pans and zooms toward a target point.
///
/// Input deltas are queued and bled into the pose over subsequent frames by
/// [`OrbitCamera::update`], which gives the damped feel. Camera motion never
/// touches world state.
#[derive(Debug, Clone)]
pub struct OrbitCamera {
    pub target: Vec3,
    pub yaw: f32,
    pub pitch: f32,
    pub distance: f32,
    pub fov: f32,
    pub aspect: f32,
    pub near: f32,
    pub far: f32,
    /// Fraction of the pending motion applied per 60 Hz frame.
    pub damping: f32,
    pub min_distance: f32,
    pub max_distance: f32,
    pub rotate_speed: f32,
    pending_rotate: Vec2,
    pending_pan: Vec2,
    pending_zoom: f32,
}

impl Default for OrbitCamera {
    fn default() -> Self {
        Self {
            target: Vec3::ZERO,
            yaw: 0.0,
            pitch: 25.0_f32.to_radians(),
            distance: 8.0,
            fov: 60.0_f32.to_radians(),
            aspect: 16.0 / 9.0,
            near: 0.1,
            far: 1000.0,
            damping: 0.1,
            min_distance: 2.0,
            max_distance: 200.0,
            rotate_speed: 0.005,
            pending_rotate: Vec2::ZERO,
            pending_pan: Vec2::ZERO,
            pending_zoom: 0.0,
        }
    }
}

impl OrbitCamera {
    /// Camera position derived from target, angles and distance.
    pub fn eye(&self) -> Vec3 {
        let offset = Vec3::new(
            self.yaw.sin() * self.pitch.cos(),
            self.pitch.sin(),
            self.yaw.cos() * self.pitch.cos(),
        );
        self.target + offset * self.distance
    }

    pub fn forward(&self) -> Vec3 {
        (self.target - self.eye()).normalize()
    }

    pub fn right(&self) -> Vec3 {
        self.forward().cross(Vec3::Y).normalize()
    }

    /// Queue an orbit by pointer delta (pixels).
    pub fn rotate(&mut self, dx: f32, dy: f32) {
        self.pending_rotate += Vec2::new(-dx, dy) * self.rotate_speed;
    }

    /// Queue a pan by pointer delta (pixels). Pans scale with distance.
    pub fn pan(&mut self, dx: f32, dy: f32) {
        self.pending_pan += Vec2::new(dx, dy) * self.distance * 0.002;
    }

    /// Queue a zoom. Positive steps move closer.
    pub fn zoom(&mut self, steps: f32) {
        self.pending_zoom -= steps * 0.1;
    }

    /// Whether queued motion remains to be applied.
    pub fn is_settling(&self) -> bool {
        self.pending_rotate.length_squared() > 1e-10
            || self.pending_pan.length_squared() > 1e-10
            || self.pending_zoom.abs() > 1e-5
    }

    /// Apply a damped share of the queued motion for a frame of `dt` seconds.
    pub fn update(&mut self, dt: f32) {
        let k = 1.0 - (1.0 - self.damping.clamp(0.0, 1.0)).powf(dt.max(0.0) * 60.0);

        let rotate = self.pending_rotate * k;
        self.pending_rotate -= rotate;
        self.yaw += rotate.x;
        self.pitch = (self.pitch + rotate.y).clamp(-85.0_f32.to_radians(), 85.0_f32.to_radians());

        let pan = self.pending_pan * k;
        self.pending_pan -= pan;
        let right = self.right();
        let up = right.cross(self.forward());
        self.target += -right * pan.x + up * pan.y;

        let zoom = self.pending_zoom * k;
        self.pending_zoom -= zoom;
        self.distance = (self.distance * zoom.exp()).clamp(self.min_distance, self.max_distance);
    }

    pub fn set_aspect(&mut self, width: u32, height: u32) {
        self.aspect = width.max(1) as f32 / height.max(1) as f32;
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.eye(), self.target, Vec3::Y)
    }

    pub fn projection_matrix(&self) -> Mat4 {
        Mat4::perspective_rh(self.fov, self.aspect, self.near, self.far)
    }

    pub fn view_projection(&self) -> Mat4 {
        self.projection_matrix() * self.view_matrix()
    }

    /// Ray from the eye through normalized device coordinates
    /// (`x`, `y` in [-1, 1], +Y up).
    pub fn ray(&self, ndc_x: f32, ndc_y: f32) -> Ray {
        let inv = self.view_projection().inverse();
        let far = inv * glam::Vec4::new(ndc_x, ndc_y, 1.0, 1.0);
        let far = far.xyz() / far.w;
        let origin = self.eye();
        Ray {
            origin,
            direction: (far - origin).normalize(),
        }
    }
}
