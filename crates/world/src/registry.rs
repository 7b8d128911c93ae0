use crate::object::{ExternalItem, ObjectKind, ObjectPatch, ObjectSpec, SceneObject};
use gridview_common::{ObjectId, Rgb};
use gridview_scene::{Material, NodeDesc, NodeId, RenderSurface, SceneGraph};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::BTreeMap;

/// Authoritative client-side record of placed objects.
///
/// Every record corresponds to exactly one pickable scene node. All
/// mutations go through this type; the scene graph is passed in explicitly
/// and is the only owner of the node itself.
#[derive(Debug)]
pub struct ObjectRegistry {
    records: BTreeMap<ObjectId, SceneObject>,
    next_id: u64,
    rng: StdRng,
}

impl Default for ObjectRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn material_for(object: &SceneObject) -> Material {
    Material {
        color: object.appearance.color,
        transparency: object.appearance.transparency,
        roughness: 0.5,
        metalness: 0.1,
        ..Material::default()
    }
}

impl ObjectRegistry {
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_entropy())
    }

    /// Registry whose placeholder colors are reproducible.
    pub fn with_seed(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }

    fn with_rng(rng: StdRng) -> Self {
        Self {
            records: BTreeMap::new(),
            next_id: 1,
            rng,
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, id: ObjectId) -> Option<&SceneObject> {
        self.records.get(&id)
    }

    /// Records in id order.
    pub fn objects(&self) -> impl Iterator<Item = &SceneObject> {
        self.records.values()
    }

    /// Reverse lookup from a picked node.
    pub fn id_for_node(&self, node: NodeId) -> Option<ObjectId> {
        self.records
            .values()
            .find(|o| o.node == node)
            .map(|o| o.id)
    }

    /// Build geometry, add the node to the scene as pickable and store the
    /// record.
    pub fn create<S: RenderSurface>(
        &mut self,
        scene: &mut SceneGraph<S>,
        spec: ObjectSpec,
    ) -> ObjectId {
        let id = ObjectId(self.next_id);
        self.next_id += 1;

        let mut record = SceneObject {
            id,
            node: NodeId(0),
            kind: spec.kind,
            name: spec.name,
            transform: spec.transform,
            appearance: spec.appearance,
            flags: spec.flags,
        };
        let node = scene.spawn(
            None,
            NodeDesc::new(format!("object {id}"))
                .with_mesh(record.kind.geometry())
                .with_transform(record.transform)
                .with_material(material_for(&record)),
        );
        scene.add_object(node);
        record.node = node;

        tracing::info!(object = %id, kind = record.kind.as_str(), "created object");
        self.records.insert(id, record);
        id
    }

    /// Apply the provided fields to the record and its node. Unknown ids are
    /// a no-op and return false.
    pub fn update<S: RenderSurface>(
        &mut self,
        scene: &mut SceneGraph<S>,
        id: ObjectId,
        patch: &ObjectPatch,
    ) -> bool {
        let Some(record) = self.records.get_mut(&id) else {
            tracing::debug!(object = %id, "update ignored, unknown object");
            return false;
        };

        if record.apply(patch) {
            scene.set_mesh(record.node, record.kind.geometry());
        }
        scene.set_transform(record.node, record.transform);
        let material = material_for(record);
        scene.update_material(record.node, |m| {
            m.color = material.color;
            m.transparency = material.transparency;
        });

        tracing::debug!(object = %id, "updated object");
        true
    }

    /// Remove the node from the scene, then the record. Clears the selection
    /// first if this object was selected. Unknown ids return false.
    pub fn delete<S: RenderSurface>(&mut self, scene: &mut SceneGraph<S>, id: ObjectId) -> bool {
        let Some(node) = self.records.get(&id).map(|r| r.node) else {
            tracing::debug!(object = %id, "delete ignored, unknown object");
            return false;
        };
        scene.remove_object(node);
        scene.despawn(node);
        self.records.remove(&id);
        tracing::info!(object = %id, "deleted object");
        true
    }

    /// Delete every object.
    pub fn clear<S: RenderSurface>(&mut self, scene: &mut SceneGraph<S>) {
        let ids: Vec<ObjectId> = self.records.keys().copied().collect();
        for id in ids {
            self.delete(scene, id);
        }
    }

    /// Place an inventory item: its type picks the kind, its color is random.
    pub fn create_from_external_item<S: RenderSurface>(
        &mut self,
        scene: &mut SceneGraph<S>,
        item: &ExternalItem,
    ) -> ObjectId {
        let kind = ObjectKind::from_item_type(&item.item_type);
        let color = Rgb::from_u32(self.rng.r#gen::<u32>() & 0x00ff_ffff);
        let mut spec = ObjectSpec::new(kind).with_color(color);
        if !item.name.is_empty() {
            spec.name = Some(item.name.clone());
        }
        if let Some(position) = item.position {
            spec = spec.with_position(position);
        }
        tracing::debug!(item = %item.name, item_type = %item.item_type, "placing item");
        self.create(scene, spec)
    }

    /// True when records and pickable nodes correspond one-to-one.
    pub fn is_consistent_with<S: RenderSurface>(&self, scene: &SceneGraph<S>) -> bool {
        self.records.len() == scene.pickable_count()
            && self.records.values().all(|r| scene.is_pickable(r.node))
    }
}
