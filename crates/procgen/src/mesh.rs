use glam::Vec3;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::f32::consts::{PI, TAU};

/// Indexed triangle mesh in local space.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Mesh {
    pub positions: Vec<Vec3>,
    pub normals: Vec<Vec3>,
    pub indices: Vec<u32>,
}

impl Mesh {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    fn push_vertex(&mut self, position: Vec3, normal: Vec3) -> u32 {
        let index = self.positions.len() as u32;
        self.positions.push(position);
        self.normals.push(normal);
        index
    }

    fn push_quad(&mut self, corners: [Vec3; 4], normal: Vec3) {
        let base = self.positions.len() as u32;
        for c in corners {
            self.push_vertex(c, normal);
        }
        self.indices
            .extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
    }

    /// Iterate triangles as vertex-position triples.
    pub fn triangles(&self) -> impl Iterator<Item = [Vec3; 3]> + '_ {
        self.indices.chunks_exact(3).map(|t| {
            [
                self.positions[t[0] as usize],
                self.positions[t[1] as usize],
                self.positions[t[2] as usize],
            ]
        })
    }

    /// Axis-aligned bounds `(min, max)`, or `None` for an empty mesh.
    pub fn bounds(&self) -> Option<(Vec3, Vec3)> {
        let first = *self.positions.first()?;
        Some(
            self.positions
                .iter()
                .fold((first, first), |(lo, hi), p| (lo.min(*p), hi.max(*p))),
        )
    }

    /// Un-index the mesh so each triangle owns its three vertices, and give
    /// every vertex its face normal. Produces the faceted low-poly look.
    pub fn with_flat_normals(&self) -> Mesh {
        let mut flat = Mesh::new();
        for [a, b, c] in self.triangles() {
            let normal = (b - a).cross(c - a).normalize_or_zero();
            let base = flat.positions.len() as u32;
            flat.positions.extend_from_slice(&[a, b, c]);
            flat.normals.extend_from_slice(&[normal, normal, normal]);
            flat.indices.extend_from_slice(&[base, base + 1, base + 2]);
        }
        flat
    }

    /// Copy with every vertex offset by `delta`.
    pub fn translated(mut self, delta: Vec3) -> Mesh {
        for p in &mut self.positions {
            *p += delta;
        }
        self
    }

    /// Axis-aligned box centered at the origin.
    pub fn cuboid(width: f32, height: f32, depth: f32) -> Mesh {
        let (x, y, z) = (width * 0.5, height * 0.5, depth * 0.5);
        let mut mesh = Mesh::new();
        #[rustfmt::skip]
        let faces = [
            ([Vec3::new(-x, -y,  z), Vec3::new( x, -y,  z), Vec3::new( x,  y,  z), Vec3::new(-x,  y,  z)], Vec3::Z),
            ([Vec3::new( x, -y, -z), Vec3::new(-x, -y, -z), Vec3::new(-x,  y, -z), Vec3::new( x,  y, -z)], Vec3::NEG_Z),
            ([Vec3::new( x, -y,  z), Vec3::new( x, -y, -z), Vec3::new( x,  y, -z), Vec3::new( x,  y,  z)], Vec3::X),
            ([Vec3::new(-x, -y, -z), Vec3::new(-x, -y,  z), Vec3::new(-x,  y,  z), Vec3::new(-x,  y, -z)], Vec3::NEG_X),
            ([Vec3::new(-x,  y,  z), Vec3::new( x,  y,  z), Vec3::new( x,  y, -z), Vec3::new(-x,  y, -z)], Vec3::Y),
            ([Vec3::new(-x, -y, -z), Vec3::new( x, -y, -z), Vec3::new( x, -y,  z), Vec3::new(-x, -y,  z)], Vec3::NEG_Y),
        ];
        for (corners, normal) in faces {
            mesh.push_quad(corners, normal);
        }
        mesh
    }

    /// Sphere built by subdividing an icosahedron.
    pub fn icosphere(radius: f32, subdivisions: u32) -> Mesh {
        let t = (1.0 + 5.0_f32.sqrt()) / 2.0;
        let mut positions: Vec<Vec3> = [
            (-1.0, t, 0.0),
            (1.0, t, 0.0),
            (-1.0, -t, 0.0),
            (1.0, -t, 0.0),
            (0.0, -1.0, t),
            (0.0, 1.0, t),
            (0.0, -1.0, -t),
            (0.0, 1.0, -t),
            (t, 0.0, -1.0),
            (t, 0.0, 1.0),
            (-t, 0.0, -1.0),
            (-t, 0.0, 1.0),
        ]
        .iter()
        .map(|&(x, y, z)| Vec3::new(x, y, z).normalize())
        .collect();

        #[rustfmt::skip]
        let mut faces: Vec<[u32; 3]> = vec![
            [0, 11, 5], [0, 5, 1], [0, 1, 7], [0, 7, 10], [0, 10, 11],
            [1, 5, 9], [5, 11, 4], [11, 10, 2], [10, 7, 6], [7, 1, 8],
            [3, 9, 4], [3, 4, 2], [3, 2, 6], [3, 6, 8], [3, 8, 9],
            [4, 9, 5], [2, 4, 11], [6, 2, 10], [8, 6, 7], [9, 8, 1],
        ];

        for _ in 0..subdivisions {
            let mut midpoints: HashMap<(u32, u32), u32> = HashMap::new();
            let mut midpoint = |a: u32, b: u32, positions: &mut Vec<Vec3>| -> u32 {
                let key = (a.min(b), a.max(b));
                *midpoints.entry(key).or_insert_with(|| {
                    let mid = ((positions[a as usize] + positions[b as usize]) * 0.5).normalize();
                    positions.push(mid);
                    positions.len() as u32 - 1
                })
            };
            let mut next = Vec::with_capacity(faces.len() * 4);
            for [a, b, c] in faces {
                let ab = midpoint(a, b, &mut positions);
                let bc = midpoint(b, c, &mut positions);
                let ca = midpoint(c, a, &mut positions);
                next.extend_from_slice(&[[a, ab, ca], [b, bc, ab], [c, ca, bc], [ab, bc, ca]]);
            }
            faces = next;
        }

        Mesh {
            normals: positions.clone(),
            positions: positions.into_iter().map(|p| p * radius).collect(),
            indices: faces.into_iter().flatten().collect(),
        }
    }

    /// Capped cylinder along Y, centered at the origin. A zero top radius
    /// makes a cone.
    pub fn cylinder(radius_top: f32, radius_bottom: f32, height: f32, segments: u32) -> Mesh {
        let segments = segments.max(3);
        let half = height * 0.5;
        let slope = (radius_bottom - radius_top) / height.max(f32::EPSILON);
        let mut mesh = Mesh::new();

        let ring = |i: u32| {
            let theta = i as f32 / segments as f32 * TAU;
            (theta.sin(), theta.cos())
        };

        // Side
        for i in 0..segments {
            let (s0, c0) = ring(i);
            let (s1, c1) = ring(i + 1);
            let n0 = Vec3::new(s0, slope, c0).normalize();
            let n1 = Vec3::new(s1, slope, c1).normalize();
            let base = mesh.positions.len() as u32;
            mesh.push_vertex(Vec3::new(radius_bottom * s0, -half, radius_bottom * c0), n0);
            mesh.push_vertex(Vec3::new(radius_bottom * s1, -half, radius_bottom * c1), n1);
            mesh.push_vertex(Vec3::new(radius_top * s1, half, radius_top * c1), n1);
            mesh.push_vertex(Vec3::new(radius_top * s0, half, radius_top * c0), n0);
            mesh.indices
                .extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
        }

        // Caps
        for (y, radius, normal) in [(half, radius_top, Vec3::Y), (-half, radius_bottom, Vec3::NEG_Y)] {
            if radius <= 0.0 {
                continue;
            }
            let center = mesh.push_vertex(Vec3::new(0.0, y, 0.0), normal);
            for i in 0..segments {
                let (s0, c0) = ring(i);
                let (s1, c1) = ring(i + 1);
                let a = mesh.push_vertex(Vec3::new(radius * s0, y, radius * c0), normal);
                let b = mesh.push_vertex(Vec3::new(radius * s1, y, radius * c1), normal);
                if normal.y > 0.0 {
                    mesh.indices.extend_from_slice(&[center, a, b]);
                } else {
                    mesh.indices.extend_from_slice(&[center, b, a]);
                }
            }
        }
        mesh
    }

    /// Cone along Y with the apex up.
    pub fn cone(radius: f32, height: f32, segments: u32) -> Mesh {
        Mesh::cylinder(0.0, radius, height, segments)
    }

    /// Torus in the XZ plane.
    pub fn torus(radius: f32, tube: f32, radial_segments: u32, tubular_segments: u32) -> Mesh {
        let radial = radial_segments.max(3);
        let tubular = tubular_segments.max(3);
        let mut mesh = Mesh::new();
        for j in 0..=radial {
            let v = j as f32 / radial as f32 * TAU;
            for i in 0..=tubular {
                let u = i as f32 / tubular as f32 * TAU;
                let center = Vec3::new(radius * u.cos(), 0.0, radius * u.sin());
                let position = Vec3::new(
                    (radius + tube * v.cos()) * u.cos(),
                    tube * v.sin(),
                    (radius + tube * v.cos()) * u.sin(),
                );
                mesh.push_vertex(position, (position - center).normalize_or_zero());
            }
        }
        let stride = tubular + 1;
        for j in 1..=radial {
            for i in 1..=tubular {
                let a = stride * j + i - 1;
                let b = stride * (j - 1) + i - 1;
                let c = stride * (j - 1) + i;
                let d = stride * j + i;
                mesh.indices.extend_from_slice(&[a, b, d, b, c, d]);
            }
        }
        mesh
    }

    /// Flat grid on the XZ plane centered at the origin, facing +Y.
    /// `segments` is the number of cells along each side.
    pub fn plane(width: f32, depth: f32, segments: u32) -> Mesh {
        let segments = segments.max(1);
        let mut mesh = Mesh::new();
        for row in 0..=segments {
            let z = -depth * 0.5 + depth * row as f32 / segments as f32;
            for col in 0..=segments {
                let x = -width * 0.5 + width * col as f32 / segments as f32;
                mesh.push_vertex(Vec3::new(x, 0.0, z), Vec3::Y);
            }
        }
        let stride = segments + 1;
        for row in 0..segments {
            for col in 0..segments {
                let a = row * stride + col;
                let b = a + 1;
                let c = a + stride;
                let d = c + 1;
                mesh.indices.extend_from_slice(&[a, c, b, b, c, d]);
            }
        }
        mesh
    }

    /// Half sphere (dome) opening downward, used for hair caps.
    pub fn hemisphere(radius: f32, segments: u32) -> Mesh {
        let segments = segments.max(3);
        let rings = (segments / 2).max(2);
        let mut mesh = Mesh::new();
        for r in 0..=rings {
            let phi = r as f32 / rings as f32 * (PI * 0.5);
            for s in 0..=segments {
                let theta = s as f32 / segments as f32 * TAU;
                let n = Vec3::new(phi.sin() * theta.sin(), phi.cos(), phi.sin() * theta.cos());
                mesh.push_vertex(n * radius, n);
            }
        }
        let stride = segments + 1;
        for r in 0..rings {
            for s in 0..segments {
                let a = r * stride + s;
                let b = a + 1;
                let c = a + stride;
                let d = c + 1;
                mesh.indices.extend_from_slice(&[a, c, b, b, c, d]);
            }
        }
        mesh
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_indices_valid(mesh: &Mesh) {
        assert_eq!(mesh.indices.len() % 3, 0);
        assert_eq!(mesh.positions.len(), mesh.normals.len());
        assert!(mesh.indices.iter().all(|&i| (i as usize) < mesh.positions.len()));
    }

    #[test]
    fn cuboid_has_six_faces() {
        let mesh = Mesh::cuboid(1.0, 2.0, 3.0);
        assert_indices_valid(&mesh);
        assert_eq!(mesh.vertex_count(), 24);
        assert_eq!(mesh.triangle_count(), 12);
        let (lo, hi) = mesh.bounds().unwrap();
        assert_eq!(lo, Vec3::new(-0.5, -1.0, -1.5));
        assert_eq!(hi, Vec3::new(0.5, 1.0, 1.5));
    }

    #[test]
    fn icosphere_vertices_lie_on_radius() {
        let mesh = Mesh::icosphere(2.0, 2);
        assert_indices_valid(&mesh);
        assert_eq!(mesh.triangle_count(), 20 * 16);
        for p in &mesh.positions {
            assert!((p.length() - 2.0).abs() < 1e-4);
        }
    }

    #[test]
    fn four_sided_cone_is_pointed() {
        let mesh = Mesh::cone(0.5, 1.0, 4);
        assert_indices_valid(&mesh);
        let (_, hi) = mesh.bounds().unwrap();
        assert!((hi.y - 0.5).abs() < 1e-6);
        let apex_count = mesh
            .positions
            .iter()
            .filter(|p| (p.y - 0.5).abs() < 1e-6)
            .count();
        // 4 side quads each contribute two apex vertices, no top cap.
        assert_eq!(apex_count, 8);
    }

    #[test]
    fn torus_bounds() {
        let mesh = Mesh::torus(1.0, 0.25, 8, 16);
        assert_indices_valid(&mesh);
        let (lo, hi) = mesh.bounds().unwrap();
        assert!((hi.x - 1.25).abs() < 1e-4);
        assert!((lo.y + 0.25).abs() < 1e-4);
    }

    #[test]
    fn flat_normals_are_per_face() {
        let flat = Mesh::plane(2.0, 2.0, 2).with_flat_normals();
        assert_indices_valid(&flat);
        assert_eq!(flat.vertex_count(), flat.triangle_count() * 3);
        for n in &flat.normals {
            assert!((n.y - 1.0).abs() < 1e-6, "plane faces should point up, got {n}");
        }
    }

    #[test]
    fn empty_mesh_has_no_bounds() {
        assert!(Mesh::new().bounds().is_none());
    }
}
