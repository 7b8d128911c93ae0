use gridview_common::config::TerrainConfig;
use gridview_common::{MAX_TERRAIN_RESOLUTION, Rgb, Transform};
use gridview_procgen::{HeightField, TerrainParams, height_at, water_plane, water_position};
use gridview_scene::{Material, NodeDesc, NodeId, RenderSurface, SceneGraph};

const GROUND_COLOR: Rgb = Rgb::new(0.34, 0.55, 0.27);
const WATER_COLOR: Rgb = Rgb::new(0.16, 0.44, 0.78);

/// Partial terrain update. `None` fields are left untouched.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TerrainUpdate {
    pub size: Option<f32>,
    pub resolution: Option<u32>,
    pub max_height: Option<f32>,
    pub seed: Option<u64>,
    pub water_level: Option<f32>,
    pub water_opacity: Option<f32>,
}

/// Owns the ground and water nodes.
#[derive(Debug)]
pub struct TerrainController {
    params: TerrainParams,
    water_level: f32,
    water_opacity: f32,
    ground: NodeId,
    water: NodeId,
    generations: u32,
}

impl TerrainController {
    pub fn new<S: RenderSurface>(scene: &mut SceneGraph<S>, config: &TerrainConfig) -> Self {
        let params = TerrainParams {
            size: config.size,
            resolution: config.resolution,
            max_height: config.max_height,
            seed: config.seed,
        };
        let field = HeightField::generate(params);
        let ground = scene.spawn(
            None,
            NodeDesc::new("terrain")
                .with_mesh(field.to_mesh())
                .with_material(Material {
                    roughness: 0.9,
                    ..Material::colored(GROUND_COLOR)
                }),
        );
        let water = scene.spawn(
            None,
            NodeDesc::new("water")
                .with_mesh(water_plane(params.size))
                .with_transform(Transform::from_position(water_position(config.water_level)))
                .with_material(Self::water_material(config.water_opacity)),
        );
        tracing::info!(
            size = params.size,
            resolution = params.resolution,
            "terrain ready"
        );
        Self {
            params,
            water_level: config.water_level,
            water_opacity: config.water_opacity,
            ground,
            water,
            generations: 1,
        }
    }

    fn water_material(opacity: f32) -> Material {
        Material {
            transparency: 1.0 - opacity.clamp(0.0, 1.0),
            roughness: 0.1,
            metalness: 0.2,
            ..Material::colored(WATER_COLOR)
        }
    }

    pub fn params(&self) -> &TerrainParams {
        &self.params
    }

    pub fn water_level(&self) -> f32 {
        self.water_level
    }

    pub fn water_opacity(&self) -> f32 {
        self.water_opacity
    }

    pub fn ground(&self) -> NodeId {
        self.ground
    }

    pub fn water(&self) -> NodeId {
        self.water
    }

    /// Number of times the height field has been generated.
    pub fn generations(&self) -> u32 {
        self.generations
    }

    /// Ground height at world `(x, z)`.
    pub fn height_at(&self, x: f32, z: f32) -> f32 {
        height_at(&self.params, x, z)
    }

    /// Merge `update`. Height-field parameters regenerate the ground; water
    /// settings only touch the water node.
    pub fn update<S: RenderSurface>(&mut self, scene: &mut SceneGraph<S>, update: &TerrainUpdate) {
        let mut params = self.params;
        if let Some(v) = update.size {
            params.size = v;
        }
        if let Some(v) = update.resolution {
            if !(1..=MAX_TERRAIN_RESOLUTION).contains(&v) {
                tracing::warn!(resolution = v, "terrain resolution out of range, clamping");
            }
            params.resolution = v.clamp(1, MAX_TERRAIN_RESOLUTION);
        }
        if let Some(v) = update.max_height {
            params.max_height = v;
        }
        if let Some(v) = update.seed {
            params.seed = v;
        }

        if params != self.params {
            let resized = params.size != self.params.size;
            self.params = params;
            scene.set_mesh(self.ground, HeightField::generate(params).to_mesh());
            if resized {
                scene.set_mesh(self.water, water_plane(params.size));
            }
            self.generations += 1;
            tracing::debug!(generation = self.generations, "regenerated terrain");
        }

        if let Some(level) = update.water_level {
            self.water_level = level;
            scene.set_position(self.water, water_position(level));
        }
        if let Some(opacity) = update.water_opacity {
            self.water_opacity = opacity.clamp(0.0, 1.0);
            let material = Self::water_material(opacity);
            scene.update_material(self.water, |m| *m = material);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;
    use gridview_scene::DebugTextSurface;

    fn config() -> TerrainConfig {
        TerrainConfig {
            size: 32.0,
            resolution: 8,
            ..TerrainConfig::default()
        }
    }

    fn setup() -> (SceneGraph<DebugTextSurface>, TerrainController) {
        let mut scene = SceneGraph::new(DebugTextSurface::new(640, 480), 640, 480);
        let terrain = TerrainController::new(&mut scene, &config());
        (scene, terrain)
    }

    #[test]
    fn water_level_update_does_not_regenerate() {
        let (mut scene, mut terrain) = setup();
        let ground_mesh = scene.node(terrain.ground()).unwrap().mesh.clone();
        terrain.update(
            &mut scene,
            &TerrainUpdate {
                water_level: Some(4.5),
                ..TerrainUpdate::default()
            },
        );
        assert_eq!(terrain.generations(), 1);
        assert_eq!(scene.node(terrain.ground()).unwrap().mesh, ground_mesh);
        assert_eq!(
            scene.node(terrain.water()).unwrap().transform.position,
            Vec3::new(0.0, 4.5, 0.0)
        );
    }

    #[test]
    fn height_change_regenerates() {
        let (mut scene, mut terrain) = setup();
        terrain.update(
            &mut scene,
            &TerrainUpdate {
                max_height: Some(40.0),
                ..TerrainUpdate::default()
            },
        );
        assert_eq!(terrain.generations(), 2);
        assert_eq!(terrain.params().max_height, 40.0);
    }

    #[test]
    fn unchanged_params_do_not_regenerate() {
        let (mut scene, mut terrain) = setup();
        terrain.update(
            &mut scene,
            &TerrainUpdate {
                resolution: Some(8),
                ..TerrainUpdate::default()
            },
        );
        assert_eq!(terrain.generations(), 1);
    }

    #[test]
    fn out_of_range_resolution_update_is_clamped() {
        let (mut scene, mut terrain) = setup();
        terrain.update(
            &mut scene,
            &TerrainUpdate {
                resolution: Some(0),
                ..TerrainUpdate::default()
            },
        );
        assert_eq!(terrain.params().resolution, 1);
        assert_eq!(terrain.generations(), 2);
    }

    #[test]
    fn water_opacity_maps_to_transparency() {
        let (mut scene, mut terrain) = setup();
        terrain.update(
            &mut scene,
            &TerrainUpdate {
                water_opacity: Some(0.25),
                ..TerrainUpdate::default()
            },
        );
        let m = scene.node(terrain.water()).unwrap().material;
        assert!((m.transparency - 0.75).abs() < 1e-6);
    }

    #[test]
    fn height_query_matches_generator() {
        let (_scene, terrain) = setup();
        assert_eq!(terrain.height_at(3.0, -2.0), height_at(terrain.params(), 3.0, -2.0));
    }

    #[test]
    fn terrain_is_not_pickable() {
        let (scene, _terrain) = setup();
        assert_eq!(scene.pickable_count(), 0);
    }
}
