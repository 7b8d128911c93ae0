use crate::affordances::EditAffordances;
use glam::Vec3;
use gridview_common::{ObjectId, ViewerConfig};
use gridview_input::{Action, HeldInput, MotionIntegrator};
use gridview_procgen::{AppearanceUpdate, AvatarAppearance};
use gridview_scene::{RenderSurface, SceneGraph};
use gridview_session::{AvatarSink, SessionClient, SessionTransport};
use gridview_world::{
    AvatarController, ExternalItem, ObjectForm, ObjectKind, ObjectPatch, ObjectRegistry,
    ObjectSpec, TerrainController, TerrainUpdate,
};
use std::cell::RefCell;
use std::rc::Rc;

/// Distance in front of the avatar where new objects appear.
const PLACE_DISTANCE: f32 = 3.0;

/// Routes reconciler placements to the avatar controller.
struct AvatarPlacement<'a, S: RenderSurface> {
    scene: &'a mut SceneGraph<S>,
    avatar: &'a mut AvatarController,
}

impl<S: RenderSurface> AvatarSink for AvatarPlacement<'_, S> {
    fn place_avatar(&mut self, position: Vec3) {
        self.avatar.set_position(self.scene, position);
    }
}

/// The application context. Owns every component and wires them together;
/// nothing in the viewer is global.
pub struct Viewer<S: RenderSurface, T: SessionTransport> {
    scene: SceneGraph<S>,
    objects: ObjectRegistry,
    avatar: AvatarController,
    terrain: TerrainController,
    motion: MotionIntegrator,
    held: HeldInput,
    session: SessionClient<T>,
    affordances: Rc<RefCell<EditAffordances>>,
}

impl<S: RenderSurface, T: SessionTransport> Viewer<S, T> {
    pub fn new(config: &ViewerConfig, surface: S, transport: T) -> Self {
        Self::with_registry(config, surface, transport, ObjectRegistry::new())
    }

    /// Like [`Viewer::new`] with a caller-provided registry, e.g. one with a
    /// fixed color seed.
    pub fn with_registry(
        config: &ViewerConfig,
        surface: S,
        transport: T,
        objects: ObjectRegistry,
    ) -> Self {
        let mut scene = SceneGraph::new(surface, config.window.width, config.window.height);
        let terrain = TerrainController::new(&mut scene, &config.terrain);
        let avatar = AvatarController::new(&mut scene, AvatarAppearance::default(), Vec3::ZERO);
        scene.camera_mut().target = avatar.position() + Vec3::Y;

        let affordances = Rc::new(RefCell::new(EditAffordances::default()));
        let sink = affordances.clone();
        scene.on_selection(move |event| sink.borrow_mut().on_selection(event));

        tracing::info!(grid = %config.grid.name, "viewer ready");
        Self {
            scene,
            objects,
            avatar,
            terrain,
            motion: MotionIntegrator::new(config.motion.speed, config.motion.turn_rate),
            held: HeldInput::default(),
            session: SessionClient::new(transport, &config.session),
            affordances,
        }
    }

    pub fn scene(&self) -> &SceneGraph<S> {
        &self.scene
    }

    pub fn scene_mut(&mut self) -> &mut SceneGraph<S> {
        &mut self.scene
    }

    pub fn objects(&self) -> &ObjectRegistry {
        &self.objects
    }

    pub fn avatar(&self) -> &AvatarController {
        &self.avatar
    }

    pub fn terrain(&self) -> &TerrainController {
        &self.terrain
    }

    pub fn session(&self) -> &SessionClient<T> {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut SessionClient<T> {
        &mut self.session
    }

    pub fn held(&self) -> &HeldInput {
        &self.held
    }

    pub fn affordances(&self) -> EditAffordances {
        *self.affordances.borrow()
    }

    /// Object currently selected, if any.
    pub fn selected_object(&self) -> Option<ObjectId> {
        self.scene
            .selected()
            .and_then(|node| self.objects.id_for_node(node))
    }

    // --- Objects ---

    pub fn create_object(&mut self, spec: ObjectSpec) -> ObjectId {
        self.objects.create(&mut self.scene, spec)
    }

    /// Create from form values, in front of the avatar.
    pub fn create_from_form(&mut self, form: &ObjectForm) -> ObjectId {
        let spec = form.to_spec().with_position(self.placement_point());
        self.create_object(spec)
    }

    pub fn update_object(&mut self, id: ObjectId, patch: &ObjectPatch) -> bool {
        self.objects.update(&mut self.scene, id, patch)
    }

    pub fn delete_object(&mut self, id: ObjectId) -> bool {
        self.objects.delete(&mut self.scene, id)
    }

    pub fn place_item(&mut self, item: &ExternalItem) -> ObjectId {
        let mut item = item.clone();
        if item.position.is_none() {
            item.position = Some(self.placement_point());
        }
        self.objects.create_from_external_item(&mut self.scene, &item)
    }

    /// Apply form values to the selected object. No-op without a selection.
    pub fn edit_selected(&mut self, form: &ObjectForm) -> bool {
        match self.selected_object() {
            Some(id) => self.update_object(id, &form.to_patch()),
            None => false,
        }
    }

    pub fn delete_selected(&mut self) -> bool {
        match self.selected_object() {
            Some(id) => self.delete_object(id),
            None => false,
        }
    }

    fn placement_point(&self) -> Vec3 {
        let p = self.avatar.position() + self.motion.forward() * PLACE_DISTANCE;
        Vec3::new(p.x, p.y + 0.5, p.z)
    }

    // --- Avatar & terrain ---

    pub fn update_appearance(&mut self, update: &AppearanceUpdate) {
        self.avatar.update(&mut self.scene, update);
    }

    pub fn update_terrain(&mut self, update: &TerrainUpdate) {
        self.terrain.update(&mut self.scene, update);
    }

    // --- Input ---

    pub fn handle_action(&mut self, action: Action) {
        if self.held.apply(&action) {
            return;
        }
        match action {
            Action::Pick { x, y } => match self.scene.pick(x, y) {
                Some(node) => {
                    tracing::debug!(node = %node, "picked");
                    self.scene.select(node);
                }
                None => {
                    self.scene.deselect();
                }
            },
            Action::Deselect => {
                self.scene.deselect();
            }
            Action::CreateObject(kind) => {
                let spec = ObjectSpec::new(ObjectKind::parse_or_default(&kind))
                    .with_position(self.placement_point());
                self.create_object(spec);
            }
            Action::DeleteSelected => {
                self.delete_selected();
            }
            Action::Orbit { dx, dy } => self.scene.camera_mut().rotate(dx, dy),
            Action::Pan { dx, dy } => self.scene.camera_mut().pan(dx, dy),
            Action::Zoom(steps) => self.scene.camera_mut().zoom(steps),
            Action::Resize { width, height } => self.scene.resize(width, height),
            Action::Press(_) | Action::Release(_) | Action::Noop => {}
        }
    }

    // --- Frame ---

    /// One frame: integrate motion, run session work, then render. State
    /// changed by the first two steps is what the render sees.
    pub fn frame(&mut self, dt: f32) {
        let _span = tracing::trace_span!("frame", dt).entered();
        let before = self.avatar.position();

        if self.held.any() {
            let next = self.motion.step(&self.held, self.avatar.position(), dt);
            self.avatar.set_position(&mut self.scene, next);
            self.avatar.set_heading(&mut self.scene, self.motion.heading());
        }

        let mut placement = AvatarPlacement {
            scene: &mut self.scene,
            avatar: &mut self.avatar,
        };
        self.session.update(dt, &mut placement);

        // Follow the avatar while keeping any pan offset.
        let moved = self.avatar.position() - before;
        if moved != Vec3::ZERO {
            self.scene.camera_mut().target += moved;
        }
        if let Err(e) = self.scene.render_frame(dt) {
            tracing::warn!("frame skipped: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gridview_common::{Rgb, wire_to_scene};
    use gridview_input::MoveKey;
    use gridview_scene::{DebugTextSurface, SELECTION_EMISSIVE};
    use gridview_session::{
        ConnectionStatus, Credentials, LogLevel, PushEvent, ScriptedGrid, WELCOME_POSITION,
        WELCOME_REGION,
    };

    type TestViewer = Viewer<DebugTextSurface, ScriptedGrid>;

    fn viewer() -> TestViewer {
        let mut config = ViewerConfig::default();
        config.terrain.size = 32.0;
        config.terrain.resolution = 8;
        Viewer::with_registry(
            &config,
            DebugTextSurface::new(640, 480),
            ScriptedGrid::new(),
            ObjectRegistry::with_seed(7),
        )
    }

    fn push(v: &mut TestViewer, event: PushEvent) {
        v.session_mut().transport_mut().inject_push(event);
        v.frame(1.0 / 60.0);
    }

    #[test]
    fn create_update_delete_box() {
        let mut v = viewer();
        let id = v.create_object(ObjectSpec::new(ObjectKind::Box).with_size(2.0));
        let record = v.objects().get(id).unwrap().clone();
        assert_eq!(record.kind, ObjectKind::Box);
        assert_eq!(record.transform.scale, Vec3::splat(2.0));
        assert!(v.scene().is_pickable(record.node));

        let green = Rgb::from_u32(0x00ff00);
        let patch = ObjectPatch {
            color: Some(green),
            ..ObjectPatch::default()
        };
        assert!(v.update_object(id, &patch));
        let record = v.objects().get(id).unwrap();
        assert_eq!(record.appearance.color, green);
        assert_eq!(record.transform.scale, Vec3::splat(2.0));
        let node = v.scene().node(record.node).unwrap();
        assert_eq!(node.material.color, green);
        assert_eq!(node.transform.scale, Vec3::splat(2.0));

        assert!(v.delete_object(id));
        assert!(v.objects().is_empty());
        assert_eq!(v.scene().pickable_count(), 0);
        assert!(v.objects().is_consistent_with(v.scene()));
    }

    #[test]
    fn status_labels_follow_pushes() {
        let mut v = viewer();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        v.session_mut()
            .reconciler_mut()
            .on_status(move |s| sink.borrow_mut().push(s.label().to_string()));
        assert_eq!(v.session().reconciler().status_label(), "Idle");

        for status in [
            "starting",
            "logging_in",
            "logged_in",
            "in_world",
            "logging_out",
            "completed",
        ] {
            push(
                &mut v,
                PushEvent::StatusUpdate {
                    status: status.into(),
                },
            );
        }
        assert_eq!(
            *seen.borrow(),
            [
                "Starting…",
                "Logging in…",
                "Logged in",
                "In World",
                "Logging out…",
                "Completed"
            ]
        );
    }

    #[test]
    fn forward_motion_is_frame_rate_independent() {
        for frames in [1u32, 7, 60, 144] {
            let mut v = viewer();
            v.handle_action(Action::Press(MoveKey::Forward));
            for _ in 0..frames {
                v.frame(1.0 / frames as f32);
            }
            let p = v.avatar().position();
            assert!((p.z + 5.0).abs() < 1e-3, "{frames} frames ended at {p}");
            assert!(p.x.abs() < 1e-4);
        }
    }

    #[test]
    fn camera_follows_avatar() {
        let mut v = viewer();
        let target = v.scene().camera().target;
        v.handle_action(Action::Press(MoveKey::Forward));
        v.frame(1.0);
        v.handle_action(Action::Release(MoveKey::Forward));
        v.frame(1.0);
        let moved = v.scene().camera().target - target;
        assert!((moved - Vec3::new(0.0, 0.0, -5.0)).length() < 1e-3);
        assert!(!v.held().any());
    }

    #[test]
    fn teleport_is_idempotent() {
        let mut v = viewer();
        let teleport = PushEvent::Teleport {
            region: WELCOME_REGION.into(),
            position: Some(WELCOME_POSITION),
        };
        push(&mut v, teleport.clone());
        let view = v.session().reconciler().view().clone();
        let placed = v.avatar().position();
        assert_eq!(placed, wire_to_scene(WELCOME_POSITION));

        push(&mut v, teleport);
        assert_eq!(v.session().reconciler().view(), &view);
        assert_eq!(v.avatar().position(), placed);
        let marker = view.minimap.unwrap();
        assert_eq!((marker.x, marker.y), (50.0, 50.0));
    }

    #[test]
    fn selecting_another_object_restores_the_first() {
        let mut v = viewer();
        let a = v.create_object(ObjectSpec::new(ObjectKind::Box));
        let b = v.create_object(ObjectSpec::new(ObjectKind::Sphere).with_position(Vec3::X * 4.0));
        let node_a = v.objects().get(a).unwrap().node;
        let node_b = v.objects().get(b).unwrap().node;
        let before = v.scene().node(node_a).unwrap().material.emissive;

        assert!(v.scene_mut().select(node_a));
        assert_eq!(v.scene().node(node_a).unwrap().material.emissive, SELECTION_EMISSIVE);
        assert!(v.scene_mut().select(node_b));
        assert_eq!(v.scene().node(node_a).unwrap().material.emissive, before);
        assert_eq!(v.scene().node(node_b).unwrap().material.emissive, SELECTION_EMISSIVE);
        assert_eq!(v.selected_object(), Some(b));
        assert_eq!(v.affordances().target, Some(node_b));
    }

    #[test]
    fn pick_then_delete_selected() {
        let mut v = viewer();
        let target = v.scene().camera().target;
        let id = v.create_object(
            ObjectSpec::new(ObjectKind::Box)
                .with_size(2.0)
                .with_position(target),
        );

        v.handle_action(Action::Pick { x: 0.0, y: 0.0 });
        assert_eq!(v.selected_object(), Some(id));
        assert!(v.affordances().can_edit && v.affordances().can_delete);

        v.handle_action(Action::DeleteSelected);
        assert!(v.objects().is_empty());
        assert_eq!(v.scene().selected(), None);
        assert_eq!(v.affordances(), EditAffordances::default());

        // Nothing selected: a second delete is a no-op.
        assert!(!v.delete_selected());
    }

    #[test]
    fn pick_on_empty_space_deselects() {
        let mut v = viewer();
        let id = v.create_object(ObjectSpec::new(ObjectKind::Box));
        let node = v.objects().get(id).unwrap().node;
        v.scene_mut().select(node);
        v.handle_action(Action::Pick { x: 0.0, y: 0.99 });
        assert_eq!(v.scene().selected(), None);
        assert!(!v.affordances().can_edit);
    }

    #[test]
    fn unknown_kinds_fall_back_to_box() {
        let mut v = viewer();
        v.handle_action(Action::CreateObject("blob".into()));
        let item = ExternalItem {
            name: "Lamp".into(),
            item_type: "landmark".into(),
            position: None,
        };
        let placed = v.place_item(&item);
        assert_eq!(v.objects().len(), 2);
        assert!(v.objects().objects().all(|o| o.kind == ObjectKind::Box));
        let record = v.objects().get(placed).unwrap();
        assert_eq!(record.name.as_deref(), Some("Lamp"));
        assert_eq!(record.transform.position, Vec3::new(0.0, 0.5, -3.0));
    }

    #[test]
    fn form_edits_selected_object() {
        let mut v = viewer();
        let form: ObjectForm =
            serde_json::from_str(r##"{"type":"torus","size":1.5,"color":"#2196f3"}"##).unwrap();
        let id = v.create_from_form(&form);
        assert_eq!(v.objects().get(id).unwrap().kind, ObjectKind::Torus);

        let edit: ObjectForm = serde_json::from_str(r#"{"type":"cylinder"}"#).unwrap();
        assert!(!v.edit_selected(&edit));
        let node = v.objects().get(id).unwrap().node;
        v.scene_mut().select(node);
        assert!(v.edit_selected(&edit));
        assert_eq!(v.objects().get(id).unwrap().kind, ObjectKind::Cylinder);
        // Editing keeps the highlight on the selected node.
        assert_eq!(v.scene().node(node).unwrap().material.emissive, SELECTION_EMISSIVE);
    }

    #[test]
    fn appearance_update_rebuilds_avatar() {
        let mut v = viewer();
        let rebuilds = v.avatar().rebuilds();
        v.update_appearance(&AppearanceUpdate {
            hair_style: Some("long".into()),
            ..AppearanceUpdate::default()
        });
        assert_eq!(v.avatar().rebuilds(), rebuilds + 1);
        assert!(!v.scene().children(v.avatar().root()).is_empty());
    }

    #[test]
    fn scripted_session_runs_to_completion() {
        let mut v = viewer();
        let chat_log = Rc::new(RefCell::new(Vec::new()));
        let sink = chat_log.clone();
        v.session_mut()
            .reconciler_mut()
            .on_log(move |entry| sink.borrow_mut().push(entry.message.clone()));

        assert!(v.session_mut().start());
        assert!(v.session().is_polling());
        for _ in 0..80 {
            v.frame(0.1);
        }

        let session = v.session().reconciler();
        assert_eq!(session.status(), &ConnectionStatus::Completed);
        assert!(!v.session().is_polling());
        assert_eq!(session.view().region.as_deref(), Some(WELCOME_REGION));
        assert!(
            session
                .view()
                .chat
                .iter()
                .any(|c| c.message == "Welcome to Kitely Plaza!")
        );
        assert_eq!(v.avatar().position(), wire_to_scene(WELCOME_POSITION));
        assert!(
            chat_log
                .borrow()
                .iter()
                .any(|m| m == "Disconnected from grid")
        );
        assert!(v.scene().frames_rendered() >= 80);
    }

    #[test]
    fn session_recovers_after_grid_outage() {
        let mut v = viewer();
        assert!(v.session_mut().start());
        v.frame(0.1);

        v.session_mut().transport_mut().set_reachable(false);
        for _ in 0..21 {
            v.frame(0.1);
        }
        assert_eq!(v.session().reconciler().status(), &ConnectionStatus::Error);
        assert!(v.session().is_polling());

        v.session_mut().transport_mut().set_reachable(true);
        v.frame(0.1);
        assert_ne!(v.session().reconciler().status(), &ConnectionStatus::Error);
        assert!(v.session().is_polling());

        for _ in 0..60 {
            v.frame(0.1);
        }
        let session = v.session().reconciler();
        assert_eq!(session.status(), &ConnectionStatus::Completed);
        assert_eq!(session.view().region.as_deref(), Some(WELCOME_REGION));
        assert!(!v.session().is_polling());
    }

    #[test]
    fn short_password_login_fails() {
        let mut v = viewer();
        let errors = Rc::new(RefCell::new(0));
        let sink = errors.clone();
        v.session_mut().reconciler_mut().on_log(move |entry| {
            if entry.level == LogLevel::Error {
                *sink.borrow_mut() += 1;
            }
        });
        assert!(!v.session_mut().login(&Credentials::new("Test", "User", "abc")));
        assert_eq!(v.session().reconciler().status(), &ConnectionStatus::Error);
        assert_eq!(*errors.borrow(), 1);
        assert!(!v.session().is_polling());
    }

    #[test]
    fn render_failure_does_not_stop_the_loop() {
        let mut v = viewer();
        v.scene_mut().surface_mut().fail_next_draw();
        v.frame(0.016);
        v.frame(0.016);
        assert_eq!(v.scene().surface().frames_drawn(), 1);
    }
}
