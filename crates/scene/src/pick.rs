use crate::camera::Ray;
use glam::Vec3;

const EPSILON: f32 = 1e-7;

/// Möller–Trumbore ray/triangle test, two-sided. Returns the distance along
/// the ray to the hit point.
pub fn ray_triangle(ray: &Ray, a: Vec3, b: Vec3, c: Vec3) -> Option<f32> {
    let e1 = b - a;
    let e2 = c - a;
    let p = ray.direction.cross(e2);
    let det = e1.dot(p);
    if det.abs() < EPSILON {
        return None;
    }
    let inv_det = 1.0 / det;
    let s = ray.origin - a;
    let u = s.dot(p) * inv_det;
    if !(0.0..=1.0).contains(&u) {
        return None;
    }
    let q = s.cross(e1);
    let v = ray.direction.dot(q) * inv_det;
    if v < 0.0 || u + v > 1.0 {
        return None;
    }
    let t = e2.dot(q) * inv_det;
    (t > EPSILON).then_some(t)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn down_at(x: f32, z: f32) -> Ray {
        Ray {
            origin: Vec3::new(x, 10.0, z),
            direction: Vec3::NEG_Y,
        }
    }

    const A: Vec3 = Vec3::new(0.0, 0.0, 0.0);
    const B: Vec3 = Vec3::new(1.0, 0.0, 0.0);
    const C: Vec3 = Vec3::new(0.0, 0.0, 1.0);

    #[test]
    fn hits_inside() {
        let t = ray_triangle(&down_at(0.25, 0.25), A, B, C).unwrap();
        assert!((t - 10.0).abs() < 1e-5);
    }

    #[test]
    fn hits_back_face() {
        assert!(ray_triangle(&down_at(0.25, 0.25), A, C, B).is_some());
    }

    #[test]
    fn misses_outside() {
        assert!(ray_triangle(&down_at(0.9, 0.9), A, B, C).is_none());
    }

    #[test]
    fn ignores_hits_behind_origin() {
        let ray = Ray {
            origin: Vec3::new(0.25, -1.0, 0.25),
            direction: Vec3::NEG_Y,
        };
        assert!(ray_triangle(&ray, A, B, C).is_none());
    }
}
