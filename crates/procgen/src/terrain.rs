//! Procedural terrain: layered pseudo-noise height field and a water plane.
//!
//! Heights are a pure function of `(x, z)` and the noise seed, so terrain is
//! reproducible without being stored.

use crate::mesh::Mesh;
use glam::Vec3;
use gridview_common::MAX_TERRAIN_RESOLUTION;

/// Noise lattice period. Heights repeat every `PERIOD / frequency` units.
const PERIOD: i32 = 256;

/// (frequency, amplitude) of the three summed octaves.
pub const OCTAVES: [(f32, f32); 3] = [(0.01, 0.6), (0.04, 0.3), (0.1, 0.1)];

/// Parameters of a height field.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TerrainParams {
    /// Planar extent along X and Z.
    pub size: f32,
    /// Grid segments per side. The field has `(resolution + 1)^2` samples.
    /// Out-of-range values are clamped to `1..=MAX_TERRAIN_RESOLUTION`.
    pub resolution: u32,
    pub max_height: f32,
    pub seed: u64,
}

impl TerrainParams {
    /// `resolution` clamped to the supported range.
    pub fn segments(&self) -> u32 {
        self.resolution.clamp(1, MAX_TERRAIN_RESOLUTION)
    }
}

impl Default for TerrainParams {
    fn default() -> Self {
        Self {
            size: 256.0,
            resolution: 128,
            max_height: 20.0,
            seed: 0,
        }
    }
}

fn hash01(seed: u64, x: i32, z: i32) -> f32 {
    let mut h = seed ^ 0x9e37_79b9_7f4a_7c15;
    h ^= (x.rem_euclid(PERIOD) as u64).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    h = h.rotate_left(31);
    h ^= (z.rem_euclid(PERIOD) as u64).wrapping_mul(0x94d0_49bb_1331_11eb);
    h = (h ^ (h >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    h = (h ^ (h >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
    h ^= h >> 31;
    (h >> 40) as f32 / (1u64 << 24) as f32
}

fn smoothstep(t: f32) -> f32 {
    t * t * (3.0 - 2.0 * t)
}

fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

/// Periodic value noise in [-1, 1]. No internal state.
pub fn noise(seed: u64, x: f32, z: f32) -> f32 {
    let xi = x.floor() as i32;
    let zi = z.floor() as i32;
    let tx = smoothstep(x - xi as f32);
    let tz = smoothstep(z - zi as f32);

    let v00 = hash01(seed, xi, zi);
    let v10 = hash01(seed, xi + 1, zi);
    let v01 = hash01(seed, xi, zi + 1);
    let v11 = hash01(seed, xi + 1, zi + 1);

    lerp(lerp(v00, v10, tx), lerp(v01, v11, tx), tz) * 2.0 - 1.0
}

/// Terrain height at world `(x, z)`: three octaves scaled by `max_height`.
pub fn height_at(params: &TerrainParams, x: f32, z: f32) -> f32 {
    OCTAVES
        .iter()
        .enumerate()
        .map(|(i, &(freq, amp))| {
            // Offset each octave so they don't share lattice corners.
            let offset = i as f32 * 17.0;
            amp * noise(params.seed, x * freq + offset, z * freq + offset)
        })
        .sum::<f32>()
        * params.max_height
}

/// Sampled height grid.
#[derive(Debug, Clone, PartialEq)]
pub struct HeightField {
    pub params: TerrainParams,
    /// Row-major samples, `(resolution + 1)` per row, rows along +Z.
    pub heights: Vec<f32>,
}

impl HeightField {
    pub fn generate(params: TerrainParams) -> Self {
        let samples = params.segments() + 1;
        let per_side = samples as usize;
        let mut heights = Vec::with_capacity(per_side * per_side);
        for row in 0..samples {
            for col in 0..samples {
                let (x, z) = Self::sample_position(&params, row, col);
                heights.push(height_at(&params, x, z));
            }
        }
        tracing::debug!(
            resolution = params.resolution,
            samples = heights.len(),
            "generated height field"
        );
        Self { params, heights }
    }

    fn sample_position(params: &TerrainParams, row: u32, col: u32) -> (f32, f32) {
        let res = params.segments() as f32;
        let x = -params.size * 0.5 + params.size * col as f32 / res;
        let z = -params.size * 0.5 + params.size * row as f32 / res;
        (x, z)
    }

    pub fn samples_per_side(&self) -> u32 {
        self.params.segments() + 1
    }

    pub fn sample(&self, row: u32, col: u32) -> Option<f32> {
        let n = self.samples_per_side();
        if row >= n || col >= n {
            return None;
        }
        self.heights
            .get(row as usize * n as usize + col as usize)
            .copied()
    }

    /// `(min, max)` sampled height.
    pub fn range(&self) -> (f32, f32) {
        self.heights
            .iter()
            .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &h| {
                (lo.min(h), hi.max(h))
            })
    }

    /// Displace a plane by the samples and recompute flat per-face normals.
    pub fn to_mesh(&self) -> Mesh {
        let mut mesh = Mesh::plane(self.params.size, self.params.size, self.params.segments());
        for (p, h) in mesh.positions.iter_mut().zip(&self.heights) {
            p.y = *h;
        }
        mesh.with_flat_normals()
    }
}

/// An undisplaced square at the water level.
pub fn water_plane(size: f32) -> Mesh {
    Mesh::plane(size, size, 1)
}

/// Position of the water surface for a given level.
pub fn water_position(level: f32) -> Vec3 {
    Vec3::new(0.0, level, 0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small() -> TerrainParams {
        TerrainParams {
            size: 64.0,
            resolution: 16,
            max_height: 10.0,
            seed: 0,
        }
    }

    #[test]
    fn height_is_pure() {
        let p = small();
        for &(x, z) in &[(0.0, 0.0), (12.5, -3.25), (-100.0, 77.7)] {
            assert_eq!(height_at(&p, x, z), height_at(&p, x, z));
        }
    }

    #[test]
    fn height_is_bounded_by_max() {
        let p = small();
        for i in 0..200 {
            let x = i as f32 * 3.7 - 300.0;
            let z = i as f32 * -1.3 + 50.0;
            assert!(height_at(&p, x, z).abs() <= p.max_height + 1e-4);
        }
    }

    #[test]
    fn noise_is_periodic() {
        let a = noise(3, 1.5, 2.25);
        let b = noise(3, 1.5 + PERIOD as f32, 2.25);
        assert!((a - b).abs() < 1e-5);
    }

    #[test]
    fn seed_changes_field() {
        let a = HeightField::generate(small());
        let b = HeightField::generate(TerrainParams { seed: 99, ..small() });
        assert_ne!(a.heights, b.heights);
    }

    #[test]
    fn generation_is_reproducible() {
        assert_eq!(HeightField::generate(small()), HeightField::generate(small()));
    }

    #[test]
    fn field_matches_height_function_at_corners() {
        let p = small();
        let field = HeightField::generate(p);
        assert_eq!(field.heights.len(), 17 * 17);
        assert_eq!(field.sample(0, 0), Some(height_at(&p, -32.0, -32.0)));
        assert_eq!(field.sample(16, 16), Some(height_at(&p, 32.0, 32.0)));
        assert_eq!(field.sample(17, 0), None);
    }

    #[test]
    fn mesh_is_displaced_with_face_normals() {
        let field = HeightField::generate(small());
        let mesh = field.to_mesh();
        assert_eq!(mesh.triangle_count(), 16 * 16 * 2);
        let (lo, hi) = field.range();
        let (mlo, mhi) = mesh.bounds().unwrap();
        assert!((mlo.y - lo).abs() < 1e-5);
        assert!((mhi.y - hi).abs() < 1e-5);
        for tri in mesh.normals.chunks_exact(3) {
            assert_eq!(tri[0], tri[1]);
            assert_eq!(tri[1], tri[2]);
        }
    }

    #[test]
    fn resolution_is_clamped() {
        let huge = TerrainParams {
            resolution: 70_000,
            ..small()
        };
        assert_eq!(huge.segments(), MAX_TERRAIN_RESOLUTION);
        let zero = TerrainParams {
            resolution: 0,
            ..small()
        };
        assert_eq!(HeightField::generate(zero).heights.len(), 4);
    }

    #[test]
    fn water_is_flat() {
        let water = water_plane(10.0);
        assert!(water.positions.iter().all(|p| p.y == 0.0));
        assert_eq!(water_position(3.0), Vec3::new(0.0, 3.0, 0.0));
    }
}
