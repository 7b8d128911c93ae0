use glam::Vec3;
use gridview_common::Transform;
use gridview_procgen::{AppearanceUpdate, AvatarAppearance, build_avatar};
use gridview_scene::{Material, NodeDesc, NodeId, RenderSurface, SceneGraph};

/// Owns the avatar's appearance and its single root node.
///
/// Appearance changes rebuild every child part; moving and turning only
/// touch the root transform.
#[derive(Debug)]
pub struct AvatarController {
    root: NodeId,
    appearance: AvatarAppearance,
    position: Vec3,
    heading: f32,
    rebuilds: u32,
}

impl AvatarController {
    pub fn new<S: RenderSurface>(
        scene: &mut SceneGraph<S>,
        appearance: AvatarAppearance,
        position: Vec3,
    ) -> Self {
        let root = scene.spawn(
            None,
            NodeDesc::new("avatar").with_transform(Transform::from_position(position)),
        );
        let mut avatar = Self {
            root,
            appearance,
            position,
            heading: 0.0,
            rebuilds: 0,
        };
        avatar.rebuild(scene);
        avatar
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn appearance(&self) -> &AvatarAppearance {
        &self.appearance
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub fn heading(&self) -> f32 {
        self.heading
    }

    /// Number of times the part geometry has been generated.
    pub fn rebuilds(&self) -> u32 {
        self.rebuilds
    }

    /// Merge `update` into the current appearance and rebuild.
    pub fn update<S: RenderSurface>(&mut self, scene: &mut SceneGraph<S>, update: &AppearanceUpdate) {
        self.appearance.merge(update);
        self.rebuild(scene);
    }

    /// Replace the whole appearance and rebuild.
    pub fn set_appearance<S: RenderSurface>(
        &mut self,
        scene: &mut SceneGraph<S>,
        appearance: AvatarAppearance,
    ) {
        self.appearance = appearance;
        self.rebuild(scene);
    }

    pub fn set_position<S: RenderSurface>(&mut self, scene: &mut SceneGraph<S>, position: Vec3) {
        self.position = position;
        scene.set_position(self.root, position);
    }

    /// Face `heading` radians about +Y. Zero faces -Z.
    pub fn set_heading<S: RenderSurface>(&mut self, scene: &mut SceneGraph<S>, heading: f32) {
        self.heading = heading;
        let transform = Transform {
            position: self.position,
            rotation: Vec3::new(0.0, heading, 0.0),
            ..Transform::default()
        };
        scene.set_transform(self.root, transform);
    }

    fn rebuild<S: RenderSurface>(&mut self, scene: &mut SceneGraph<S>) {
        scene.despawn_children(self.root);
        let model = build_avatar(&self.appearance);
        for part in model.parts {
            let material = Material {
                color: part.color,
                roughness: part.surface.roughness,
                metalness: part.surface.metalness,
                ..Material::default()
            };
            scene.spawn(
                Some(self.root),
                NodeDesc::new(format!("avatar {:?}", part.kind))
                    .with_mesh(part.mesh)
                    .with_transform(Transform::from_position(part.offset))
                    .with_material(material),
            );
        }
        self.rebuilds += 1;
        tracing::debug!(
            parts = scene.children(self.root).len(),
            height = self.appearance.height,
            "rebuilt avatar"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gridview_procgen::HairStyle;
    use gridview_scene::DebugTextSurface;

    fn setup() -> (SceneGraph<DebugTextSurface>, AvatarController) {
        let mut scene = SceneGraph::new(DebugTextSurface::new(640, 480), 640, 480);
        let avatar = AvatarController::new(&mut scene, AvatarAppearance::default(), Vec3::ZERO);
        (scene, avatar)
    }

    fn part_offsets(scene: &SceneGraph<DebugTextSurface>, root: NodeId) -> Vec<Vec3> {
        scene
            .children(root)
            .iter()
            .map(|c| scene.node(*c).unwrap().transform.position)
            .collect()
    }

    #[test]
    fn builds_parts_under_single_root() {
        let (scene, avatar) = setup();
        let parts = scene.children(avatar.root()).len();
        assert_eq!(parts, build_avatar(&AvatarAppearance::default()).parts.len());
        assert_eq!(scene.node_count(), parts + 1);
        assert!(!scene.is_pickable(avatar.root()));
    }

    #[test]
    fn update_rebuilds_all_children() {
        let (mut scene, mut avatar) = setup();
        let before: Vec<NodeId> = scene.children(avatar.root()).to_vec();
        avatar.update(
            &mut scene,
            &AppearanceUpdate {
                hair_style: Some("long".into()),
                ..AppearanceUpdate::default()
            },
        );
        let after = scene.children(avatar.root());
        assert!(before.iter().all(|id| !scene.contains(*id)));
        assert!(after.iter().all(|id| !before.contains(id)));
        assert_eq!(avatar.appearance().hair_style, HairStyle::Long);
        assert_eq!(avatar.rebuilds(), 2);
        assert_eq!(scene.surface().resident_count(), after.len());
    }

    #[test]
    fn identical_rebuilds_are_identical() {
        let (mut scene, mut avatar) = setup();
        let first = part_offsets(&scene, avatar.root());
        avatar.update(&mut scene, &AppearanceUpdate::default());
        assert_eq!(part_offsets(&scene, avatar.root()), first);
    }

    #[test]
    fn set_position_does_not_rebuild() {
        let (mut scene, mut avatar) = setup();
        let parts: Vec<NodeId> = scene.children(avatar.root()).to_vec();
        avatar.set_position(&mut scene, Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(avatar.rebuilds(), 1);
        assert_eq!(scene.children(avatar.root()), parts.as_slice());
        assert_eq!(
            scene.node(avatar.root()).unwrap().transform.position,
            Vec3::new(1.0, 2.0, 3.0)
        );
    }

    #[test]
    fn heading_rotates_root() {
        let (mut scene, mut avatar) = setup();
        avatar.set_position(&mut scene, Vec3::new(5.0, 0.0, 0.0));
        avatar.set_heading(&mut scene, 1.0);
        let t = scene.node(avatar.root()).unwrap().transform;
        assert_eq!(t.rotation.y, 1.0);
        assert_eq!(t.position, Vec3::new(5.0, 0.0, 0.0));
    }
}
