//! The scene graph: sole owner of renderable nodes, the pickable set, the
//! current selection and the camera.

use crate::camera::OrbitCamera;
use crate::node::{Material, NodeDesc, NodeId, SceneNode};
use crate::pick::ray_triangle;
use crate::surface::{DrawItem, FrameView, RenderSurface, SurfaceError};
use glam::{Mat4, Vec3};
use gridview_common::{Observers, Rgb, Subscription, Transform};
use gridview_procgen::Mesh;
use std::collections::BTreeMap;

/// Emissive tint applied to the selected node.
pub const SELECTION_EMISSIVE: Rgb = Rgb::new(0.33, 0.33, 0.33);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionEvent {
    Selected(NodeId),
    Deselected(NodeId),
}

#[derive(Debug, Clone, Copy)]
struct Selection {
    node: NodeId,
    prior_emissive: Rgb,
}

/// Owns every node and hands frames to a [`RenderSurface`].
///
/// Invariants:
/// - the selection is always a member of the pickable set;
/// - removing a node from the pickable set clears its selection first, so
///   the highlight is restored before the node can go away;
/// - destroying a node releases its surface resources and those of every
///   descendant.
pub struct SceneGraph<S: RenderSurface> {
    surface: S,
    camera: OrbitCamera,
    nodes: BTreeMap<NodeId, SceneNode>,
    next_node: u64,
    pickable: Vec<NodeId>,
    selection: Option<Selection>,
    selection_events: Observers<SelectionEvent>,
    frame: u64,
    width: u32,
    height: u32,
}

impl<S: RenderSurface> SceneGraph<S> {
    pub fn new(surface: S, width: u32, height: u32) -> Self {
        let mut camera = OrbitCamera::default();
        camera.set_aspect(width, height);
        Self {
            surface,
            camera,
            nodes: BTreeMap::new(),
            next_node: 1,
            pickable: Vec::new(),
            selection: None,
            selection_events: Observers::new(),
            frame: 0,
            width,
            height,
        }
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    pub fn camera(&self) -> &OrbitCamera {
        &self.camera
    }

    pub fn camera_mut(&mut self) -> &mut OrbitCamera {
        &mut self.camera
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn frames_rendered(&self) -> u64 {
        self.frame
    }

    // --- Nodes ---

    /// Create a node under `parent` (or at the root) and upload its mesh.
    /// An unknown parent falls back to the root.
    pub fn spawn(&mut self, parent: Option<NodeId>, desc: NodeDesc) -> NodeId {
        let id = NodeId(self.next_node);
        self.next_node += 1;

        let parent = parent.filter(|p| self.nodes.contains_key(p));
        if let Some(p) = parent.and_then(|p| self.nodes.get_mut(&p)) {
            p.children.push(id);
        }
        if let Some(mesh) = &desc.mesh {
            self.surface.upload(id, mesh);
        }

        tracing::trace!(node = %id, label = %desc.label, "spawned node");
        self.nodes.insert(
            id,
            SceneNode {
                id,
                label: desc.label,
                parent,
                children: Vec::new(),
                transform: desc.transform,
                material: desc.material,
                mesh: desc.mesh,
                visible: true,
            },
        );
        id
    }

    /// Destroy a node and its whole subtree. Returns false for unknown ids.
    pub fn despawn(&mut self, id: NodeId) -> bool {
        let Some(parent) = self.nodes.get(&id).map(|n| n.parent) else {
            return false;
        };
        if let Some(p) = parent.and_then(|p| self.nodes.get_mut(&p)) {
            p.children.retain(|c| *c != id);
        }
        self.despawn_subtree(id);
        true
    }

    /// Destroy every child of `id`, keeping `id` itself.
    pub fn despawn_children(&mut self, id: NodeId) -> bool {
        let Some(children) = self.nodes.get_mut(&id).map(|n| std::mem::take(&mut n.children))
        else {
            return false;
        };
        for child in children {
            self.despawn_subtree(child);
        }
        true
    }

    fn despawn_subtree(&mut self, id: NodeId) {
        self.remove_object(id);
        let Some(node) = self.nodes.remove(&id) else {
            return;
        };
        for child in node.children {
            self.despawn_subtree(child);
        }
        if node.mesh.is_some() {
            self.surface.release(id);
        }
        tracing::trace!(node = %id, "despawned node");
    }

    pub fn node(&self, id: NodeId) -> Option<&SceneNode> {
        self.nodes.get(&id)
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.nodes.get(&id).map_or(&[], |n| n.children.as_slice())
    }

    pub fn set_transform(&mut self, id: NodeId, transform: Transform) -> bool {
        match self.nodes.get_mut(&id) {
            Some(node) => {
                node.transform = transform;
                true
            }
            None => false,
        }
    }

    pub fn set_position(&mut self, id: NodeId, position: Vec3) -> bool {
        match self.nodes.get_mut(&id) {
            Some(node) => {
                node.transform.position = position;
                true
            }
            None => false,
        }
    }

    pub fn set_visible(&mut self, id: NodeId, visible: bool) -> bool {
        match self.nodes.get_mut(&id) {
            Some(node) => {
                node.visible = visible;
                true
            }
            None => false,
        }
    }

    /// Edit a node's material. On the selected node the edit applies to the
    /// underlying material and the highlight stays on top.
    pub fn update_material(&mut self, id: NodeId, edit: impl FnOnce(&mut Material)) -> bool {
        let Some(node) = self.nodes.get_mut(&id) else {
            return false;
        };
        match self.selection.as_mut().filter(|s| s.node == id) {
            Some(sel) => {
                node.material.emissive = sel.prior_emissive;
                edit(&mut node.material);
                sel.prior_emissive = node.material.emissive;
                node.material.emissive = SELECTION_EMISSIVE;
            }
            None => edit(&mut node.material),
        }
        true
    }

    /// Replace a node's mesh and re-upload it.
    pub fn set_mesh(&mut self, id: NodeId, mesh: Mesh) -> bool {
        let Some(node) = self.nodes.get_mut(&id) else {
            return false;
        };
        self.surface.upload(id, &mesh);
        node.mesh = Some(mesh);
        true
    }

    /// Local-to-world matrix of a node.
    pub fn world_matrix(&self, id: NodeId) -> Option<Mat4> {
        let mut node = self.nodes.get(&id)?;
        let mut matrix = node.transform.matrix();
        while let Some(parent) = node.parent.and_then(|p| self.nodes.get(&p)) {
            matrix = parent.transform.matrix() * matrix;
            node = parent;
        }
        Some(matrix)
    }

    // --- Pickable set ---

    /// Register a node as pickable. Returns false if unknown or already
    /// registered.
    pub fn add_object(&mut self, id: NodeId) -> bool {
        if !self.nodes.contains_key(&id) || self.pickable.contains(&id) {
            return false;
        }
        self.pickable.push(id);
        true
    }

    /// Unregister a node, clearing its selection first.
    pub fn remove_object(&mut self, id: NodeId) -> bool {
        let Some(index) = self.pickable.iter().position(|p| *p == id) else {
            return false;
        };
        if self.selected() == Some(id) {
            self.deselect();
        }
        self.pickable.remove(index);
        true
    }

    pub fn is_pickable(&self, id: NodeId) -> bool {
        self.pickable.contains(&id)
    }

    pub fn pickable_count(&self) -> usize {
        self.pickable.len()
    }

    /// Nearest pickable node under the pointer, in normalized device
    /// coordinates. Each pickable node is tested together with its
    /// descendants. Equal distances resolve to the earlier registration.
    pub fn pick(&self, ndc_x: f32, ndc_y: f32) -> Option<NodeId> {
        let ray = self.camera.ray(ndc_x, ndc_y);
        let mut best: Option<(NodeId, f32)> = None;
        for &id in &self.pickable {
            let Some(t) = self.nearest_hit(id, &ray) else {
                continue;
            };
            if best.is_none_or(|(_, bt)| t < bt) {
                best = Some((id, t));
            }
        }
        best.map(|(id, _)| id)
    }

    fn nearest_hit(&self, id: NodeId, ray: &crate::camera::Ray) -> Option<f32> {
        let node = self.nodes.get(&id)?;
        if !node.visible {
            return None;
        }
        let mut best = node.mesh.as_ref().and_then(|mesh| {
            let world = self.world_matrix(id)?;
            mesh.triangles()
                .filter_map(|[a, b, c]| {
                    ray_triangle(
                        ray,
                        world.transform_point3(a),
                        world.transform_point3(b),
                        world.transform_point3(c),
                    )
                })
                .min_by(f32::total_cmp)
        });
        for &child in &node.children {
            if let Some(t) = self.nearest_hit(child, ray) {
                best = Some(best.map_or(t, |b| b.min(t)));
            }
        }
        best
    }

    // --- Selection ---

    pub fn selected(&self) -> Option<NodeId> {
        self.selection.map(|s| s.node)
    }

    /// Select a pickable node, deselecting any previous one. Returns false
    /// when the node is not pickable.
    pub fn select(&mut self, id: NodeId) -> bool {
        if !self.is_pickable(id) {
            return false;
        }
        if self.selected() == Some(id) {
            return true;
        }
        self.deselect();
        let Some(node) = self.nodes.get_mut(&id) else {
            return false;
        };
        self.selection = Some(Selection {
            node: id,
            prior_emissive: node.material.emissive,
        });
        node.material.emissive = SELECTION_EMISSIVE;
        tracing::debug!(node = %id, "selected");
        self.selection_events.emit(&SelectionEvent::Selected(id));
        true
    }

    /// Clear the selection, restoring the node's emissive color exactly.
    pub fn deselect(&mut self) -> Option<NodeId> {
        let sel = self.selection.take()?;
        if let Some(node) = self.nodes.get_mut(&sel.node) {
            node.material.emissive = sel.prior_emissive;
        }
        tracing::debug!(node = %sel.node, "deselected");
        self.selection_events
            .emit(&SelectionEvent::Deselected(sel.node));
        Some(sel.node)
    }

    pub fn on_selection(&mut self, listener: impl FnMut(&SelectionEvent) + 'static) -> Subscription {
        self.selection_events.subscribe(listener)
    }

    pub fn unsubscribe_selection(&mut self, handle: Subscription) -> bool {
        self.selection_events.unsubscribe(handle)
    }

    // --- Frames ---

    pub fn resize(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
        self.camera.set_aspect(width, height);
        self.surface.resize(width, height);
    }

    /// Visible nodes with meshes, with world matrices, in id order.
    pub fn draw_list(&self) -> Vec<DrawItem> {
        self.nodes
            .values()
            .filter(|n| n.mesh.is_some() && self.is_effectively_visible(n))
            .filter_map(|n| {
                Some(DrawItem {
                    node: n.id,
                    model: self.world_matrix(n.id)?,
                    color: n.material.rgba(),
                    emissive: n.material.emissive.to_array(),
                })
            })
            .collect()
    }

    fn is_effectively_visible(&self, node: &SceneNode) -> bool {
        let mut current = Some(node);
        while let Some(n) = current {
            if !n.visible {
                return false;
            }
            current = n.parent.and_then(|p| self.nodes.get(&p));
        }
        true
    }

    /// Advance the camera and present one frame.
    pub fn render_frame(&mut self, dt: f32) -> Result<(), SurfaceError> {
        self.camera.update(dt);
        let items = self.draw_list();
        let view = FrameView {
            frame: self.frame,
            view_proj: self.camera.view_projection(),
            eye: self.camera.eye(),
            items: &items,
        };
        self.frame += 1;
        self.surface.draw(&view)
    }
}
