//! Scene: the traversal context and actor bookkeeping
//!
//! The scene owns the node arena, the actor-to-node lookup map, the active
//! camera, and a subscription to the entity lifecycle bus. Each frame the
//! host drains lifecycle events into graph mutations, then runs update and
//! render traversals.
//!
//! The synthetic root's direct children are one group node per
//! [`RenderPass`], created at construction; `add_child` files a node under
//! the group matching its pass, so a plain depth-first walk of the root
//! visits opaque geometry, then the sky, then debug overlays. Alpha nodes
//! are skipped by the main walk and drawn in a final back-to-front pass.

use std::collections::HashMap;
use std::sync::Arc;

use slotmap::SlotMap;

use crate::assets::ResourceCache;
use crate::events::{EventBus, EventSubscription, SceneEvent, SceneEventKind};
use crate::foundation::math::{Mat4, Vec3};
use crate::foundation::time::FrameTime;
use crate::gizmo::GizmoNode;
use crate::render::device::RenderDevice;
use crate::scene::node::SceneNode;
use crate::scene::{ActorId, Camera, FrameContext, NodeKey, RenderPass, SelectionTarget};

/// Scene graph: ownership tree of nodes plus per-frame traversal state
pub struct Scene {
    nodes: SlotMap<NodeKey, SceneNode>,
    root: NodeKey,
    groups: [NodeKey; 4],
    actor_map: HashMap<ActorId, NodeKey>,
    camera: Option<Camera>,
    picked_actor: Option<ActorId>,
    gizmo: Option<NodeKey>,
    cache: Arc<ResourceCache>,
    subscription: EventSubscription,
}

impl Scene {
    /// Create an empty scene subscribed to the given lifecycle bus
    ///
    /// The subscription is dropped with the scene, which unregisters it from
    /// the bus, so a destroyed scene can never be reached through a stale
    /// listener.
    pub fn new(bus: &EventBus, cache: Arc<ResourceCache>) -> Self {
        let subscription = bus.subscribe(&[
            SceneEventKind::NewRenderComponent,
            SceneEventKind::DestroyActor,
            SceneEventKind::MoveActor,
            SceneEventKind::ModifiedRenderComponent,
        ]);

        let mut nodes = SlotMap::with_key();
        let root = nodes.insert(SceneNode::group(RenderPass::Opaque));

        let groups = RenderPass::ALL.map(|pass| {
            let mut group = SceneNode::group(pass);
            group.parent = Some(root);
            nodes.insert(group)
        });
        for &group in &groups {
            nodes[root].children.push(group);
        }

        Self {
            nodes,
            root,
            groups,
            actor_map: HashMap::new(),
            camera: None,
            picked_actor: None,
            gizmo: None,
            cache,
            subscription,
        }
    }

    /// Root node key
    pub fn root(&self) -> NodeKey {
        self.root
    }

    /// Borrow a node by key
    pub fn node(&self, key: NodeKey) -> Option<&SceneNode> {
        self.nodes.get(key)
    }

    /// Mutably borrow a node by key
    pub fn node_mut(&mut self, key: NodeKey) -> Option<&mut SceneNode> {
        self.nodes.get_mut(key)
    }

    /// Install the active camera
    pub fn set_camera(&mut self, camera: Camera) {
        self.camera = Some(camera);
    }

    /// The active camera, if any
    pub fn camera(&self) -> Option<&Camera> {
        self.camera.as_ref()
    }

    /// Mutable access to the active camera
    pub fn camera_mut(&mut self) -> Option<&mut Camera> {
        self.camera.as_mut()
    }

    /// Select an actor (or clear the selection with `None`)
    pub fn set_picked_actor(&mut self, actor: Option<ActorId>) {
        self.picked_actor = actor;
    }

    /// Currently selected actor
    pub fn picked_actor(&self) -> Option<ActorId> {
        self.picked_actor
    }

    /// O(1) actor-to-node lookup; `None` when the actor has no node
    pub fn find_actor(&self, actor: ActorId) -> Option<NodeKey> {
        self.actor_map.get(&actor).copied()
    }

    /// Register a node under the pass group matching its classification
    ///
    /// A valid actor id is recorded in the lookup map.
    pub fn add_child(&mut self, actor: Option<ActorId>, node: SceneNode) -> NodeKey {
        let parent = self.groups[node.render_pass.index()];
        self.add_child_to(parent, actor, node)
    }

    /// Register a node under a designated parent node
    pub fn add_child_to(
        &mut self,
        parent: NodeKey,
        actor: Option<ActorId>,
        mut node: SceneNode,
    ) -> NodeKey {
        node.actor = actor;
        node.parent = Some(parent);
        let key = self.nodes.insert(node);
        if let Some(parent_node) = self.nodes.get_mut(parent) {
            parent_node.children.push(key);
        }
        if let Some(id) = actor {
            self.actor_map.insert(id, key);
        }
        key
    }

    /// Attach a gizmo overlay under the debug pass group
    pub fn add_gizmo(&mut self, gizmo: GizmoNode) -> NodeKey {
        let key = self.add_child(None, SceneNode::gizmo(gizmo));
        self.gizmo = Some(key);
        key
    }

    /// Mutable access to the attached gizmo, if any
    pub fn gizmo_mut(&mut self) -> Option<&mut GizmoNode> {
        let key = self.gizmo?;
        self.nodes.get_mut(key)?.as_gizmo_mut()
    }

    /// Remove an actor's node and its whole subtree
    ///
    /// Detaches the node from its parent, releases device resources for
    /// every node in the subtree, and purges every descendant's actor id
    /// from the lookup map. Returns false if the actor was never present.
    pub fn remove_child(&mut self, actor: ActorId, device: &mut dyn RenderDevice) -> bool {
        let Some(key) = self.actor_map.remove(&actor) else {
            return false;
        };
        self.detach_subtree(key, device);
        true
    }

    fn detach_subtree(&mut self, key: NodeKey, device: &mut dyn RenderDevice) {
        if let Some(parent) = self.nodes.get(key).and_then(|n| n.parent) {
            if let Some(parent_node) = self.nodes.get_mut(parent) {
                parent_node.children.retain(|&child| child != key);
            }
        }

        let mut stack = vec![key];
        let mut subtree = Vec::new();
        while let Some(k) = stack.pop() {
            if let Some(node) = self.nodes.get(k) {
                subtree.push(k);
                stack.extend(node.children.iter().copied());
            }
        }

        for k in subtree {
            if let Some(mut node) = self.nodes.remove(k) {
                node.release(device);
                if let Some(id) = node.actor {
                    self.actor_map.remove(&id);
                }
                if self.gizmo == Some(k) {
                    self.gizmo = None;
                }
            }
        }
    }

    /// Drain queued lifecycle events into graph mutations
    ///
    /// Called once per frame before update. A new render component restores
    /// its node first and is only inserted when restore succeeds; a move
    /// applies the transform to the node immediately; a modified render
    /// component rebuilds the node's device resources in place.
    pub fn process_events(&mut self, device: &mut dyn RenderDevice) {
        for event in self.subscription.drain() {
            match event {
                SceneEvent::NewRenderComponent { actor, payload } => {
                    match SceneNode::mesh(payload, &self.cache) {
                        Ok(mut node) => {
                            if node.on_restore(device) {
                                self.add_child(Some(actor), node);
                            } else {
                                log::error!(
                                    "failed to restore scene node for actor {:?}",
                                    actor
                                );
                            }
                        }
                        Err(e) => {
                            log::error!("failed to create scene node for actor {:?}: {}", actor, e);
                        }
                    }
                }
                SceneEvent::DestroyActor { actor } => {
                    self.remove_child(actor, device);
                }
                SceneEvent::MoveActor { actor, transform } => {
                    if let Some(node) = self.find_actor(actor).and_then(|k| self.nodes.get_mut(k)) {
                        node.local = transform;
                    }
                }
                SceneEvent::ModifiedRenderComponent { actor } => {
                    if let Some(key) = self.find_actor(actor) {
                        if let Some(node) = self.nodes.get_mut(key) {
                            if !node.on_restore(device) {
                                log::error!(
                                    "failed to re-restore scene node for actor {:?}",
                                    actor
                                );
                            }
                        }
                    }
                }
            }
        }
    }

    fn frame_context(&self, time: FrameTime) -> FrameContext {
        let (view, projection, camera_position) = match &self.camera {
            Some(camera) => (
                camera.view_matrix(),
                camera.projection_matrix(),
                camera.position,
            ),
            None => (Mat4::identity(), Mat4::identity(), Vec3::zeros()),
        };

        let selection = self
            .picked_actor
            .and_then(|actor| self.find_actor(actor))
            .and_then(|key| self.nodes.get(key))
            .map(|node| SelectionTarget {
                world: node.world,
                bounds: node.bounds,
            });

        FrameContext {
            time,
            view,
            projection,
            camera_position,
            selection,
        }
    }

    /// Per-frame update: visits the whole reachable tree exactly once,
    /// parent before children, then refreshes world matrices
    pub fn update(&mut self, time: FrameTime) {
        let ctx = self.frame_context(time);

        let mut stack = vec![(self.root, Mat4::identity())];
        while let Some((key, parent_world)) = stack.pop() {
            let Some(node) = self.nodes.get_mut(key) else {
                continue;
            };
            node.on_update(&ctx);
            node.world = parent_world * node.local;

            let world = node.world;
            let children = node.children.clone();
            for &child in children.iter().rev() {
                stack.push((child, world));
            }
        }
    }

    /// Per-frame render: requires a camera; draws opaque, sky, and debug
    /// groups in order, then alpha nodes back-to-front
    pub fn render(&mut self, time: FrameTime, device: &mut dyn RenderDevice) {
        if self.camera.is_none() {
            return;
        }

        // Pre-render: refresh world matrices so event-driven transform
        // changes since the update are reflected
        self.propagate_world();
        let ctx = self.frame_context(time);

        for pass in [RenderPass::Opaque, RenderPass::Sky, RenderPass::Debug] {
            self.render_subtree(self.groups[pass.index()], &ctx, device);
        }

        self.render_alpha_pass(&ctx, device);
    }

    fn propagate_world(&mut self) {
        let mut stack = vec![(self.root, Mat4::identity())];
        while let Some((key, parent_world)) = stack.pop() {
            let Some(node) = self.nodes.get_mut(key) else {
                continue;
            };
            node.world = parent_world * node.local;

            let world = node.world;
            let children = node.children.clone();
            for &child in children.iter().rev() {
                stack.push((child, world));
            }
        }
    }

    fn render_subtree(
        &mut self,
        start: NodeKey,
        ctx: &FrameContext,
        device: &mut dyn RenderDevice,
    ) {
        let mut stack = vec![start];
        while let Some(key) = stack.pop() {
            let Some(node) = self.nodes.get_mut(key) else {
                continue;
            };
            if node.is_visible(ctx) {
                node.on_render(ctx, device);
            }
            let children = node.children.clone();
            for &child in children.iter().rev() {
                stack.push(child);
            }
        }
    }

    /// Deferred pass: alpha nodes collected from their group and drawn
    /// farthest-first so blending composes correctly
    fn render_alpha_pass(&mut self, ctx: &FrameContext, device: &mut dyn RenderDevice) {
        let alpha_group = self.groups[RenderPass::Alpha.index()];

        let mut deferred: Vec<(NodeKey, f32)> = Vec::new();
        let mut stack = vec![alpha_group];
        while let Some(key) = stack.pop() {
            let Some(node) = self.nodes.get(key) else {
                continue;
            };
            if key != alpha_group && node.is_visible(ctx) {
                let position = Vec3::new(node.world[(0, 3)], node.world[(1, 3)], node.world[(2, 3)]);
                let depth = (ctx.camera_position - position).norm();
                deferred.push((key, depth));
            }
            stack.extend(node.children.iter().copied());
        }

        deferred.sort_by(|a, b| b.1.total_cmp(&a.1));

        for (key, _) in deferred {
            if let Some(node) = self.nodes.get_mut(key) {
                node.on_render(ctx, device);
            }
        }
    }

    /// Propagate a device reset through the whole tree
    ///
    /// Every node re-acquires its device-dependent resources. Safe to call
    /// any number of times across the graph's lifetime.
    pub fn restore_device(&mut self, device: &mut dyn RenderDevice) {
        let mut stack = vec![self.root];
        while let Some(key) = stack.pop() {
            let Some(node) = self.nodes.get_mut(key) else {
                continue;
            };
            if !node.on_restore(device) {
                log::warn!("node failed to restore device resources (actor {:?})", node.actor);
            }
            let children = node.children.clone();
            stack.extend(children);
        }
    }

    /// Actor ids reachable from the root, for consistency checks
    pub fn reachable_actors(&self) -> Vec<ActorId> {
        let mut actors = Vec::new();
        let mut stack = vec![self.root];
        while let Some(key) = stack.pop() {
            if let Some(node) = self.nodes.get(key) {
                if let Some(actor) = node.actor {
                    actors.push(actor);
                }
                stack.extend(node.children.iter().copied());
            }
        }
        actors
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    use crate::events::RenderPayload;
    use crate::foundation::math::Vec4;
    use crate::render::device::HeadlessDevice;
    use crate::render::effect::{
        EffectDesc, PassDesc, TechniqueDesc, VariableDesc, VariableValue,
    };
    use crate::render::layout::SignatureElement;
    use crate::render::mesh::Mesh;
    use crate::scene::SkyNode;

    fn test_cache() -> Arc<ResourceCache> {
        let mut cache = ResourceCache::new();
        cache
            .insert_effect(
                crate::render::effect::Effect::from_desc(EffectDesc {
                    name: "Flat".to_string(),
                    source_path: "effects/Flat.fx".to_string(),
                    techniques: vec![TechniqueDesc {
                        name: "main11".to_string(),
                        passes: vec![PassDesc {
                            name: "p0".to_string(),
                            vertex_signature: vec![SignatureElement {
                                semantic: "POSITION".to_string(),
                                semantic_index: 0,
                                mask: 0x7,
                            }],
                            has_geometry_shader: false,
                            has_hull_shader: false,
                            has_domain_shader: false,
                            patch_constant_signature: vec![],
                        }],
                    }],
                    variables: vec![
                        VariableDesc {
                            name: "WorldViewProjection".to_string(),
                            semantic: None,
                            type_name: "float4x4".to_string(),
                            columns: None,
                            value: VariableValue::Matrix([[0.0; 4]; 4]),
                            annotations: vec![],
                        },
                        VariableDesc {
                            name: "AmbientColor".to_string(),
                            semantic: None,
                            type_name: "float4".to_string(),
                            columns: Some(4),
                            value: VariableValue::Vector([1.0, 1.0, 1.0, 1.0]),
                            annotations: vec![],
                        },
                        VariableDesc {
                            name: "SkyboxTexture".to_string(),
                            semantic: None,
                            type_name: "TextureCube".to_string(),
                            columns: None,
                            value: VariableValue::Resource(None),
                            annotations: vec![],
                        },
                    ],
                })
                .unwrap(),
            );
        Arc::new(cache)
    }

    fn payload(pass: RenderPass, position: Vec3) -> RenderPayload {
        RenderPayload {
            mesh: Mesh::cube(),
            effect: "Flat".to_string(),
            technique: "main11".to_string(),
            render_pass: pass,
            transform: Mat4::new_translation(&position),
            color: Some(Vec4::new(1.0, 1.0, 1.0, 1.0)),
        }
    }

    fn mesh_node(scene: &Scene, pass: RenderPass, position: Vec3) -> SceneNode {
        SceneNode::mesh(payload(pass, position), &scene.cache).unwrap()
    }

    fn assert_lookup_matches_tree(scene: &Scene) {
        let reachable: HashSet<ActorId> = scene.reachable_actors().into_iter().collect();
        let mapped: HashSet<ActorId> = scene.actor_map.keys().copied().collect();
        assert_eq!(mapped, reachable, "Lookup map must mirror reachable actor ids");
    }

    #[test]
    fn test_new_scene_has_root_and_pass_groups() {
        let bus = EventBus::new();
        let scene = Scene::new(&bus, test_cache());

        let root = scene.node(scene.root()).unwrap();
        assert_eq!(root.children().len(), 4, "One group per render pass");
        assert!(scene.reachable_actors().is_empty());
        assert_eq!(bus.subscriber_count(), 1);
    }

    #[test]
    fn test_add_and_find_actor() {
        let bus = EventBus::new();
        let mut scene = Scene::new(&bus, test_cache());

        let node = mesh_node(&scene, RenderPass::Opaque, Vec3::zeros());
        let key = scene.add_child(Some(ActorId(1)), node);

        assert_eq!(scene.find_actor(ActorId(1)), Some(key));
        assert!(scene.find_actor(ActorId(2)).is_none());
        assert_lookup_matches_tree(&scene);
    }

    #[test]
    fn test_remove_child() {
        let bus = EventBus::new();
        let mut scene = Scene::new(&bus, test_cache());
        let mut device = HeadlessDevice::new();

        let node = mesh_node(&scene, RenderPass::Opaque, Vec3::zeros());
        scene.add_child(Some(ActorId(1)), node);

        assert!(scene.remove_child(ActorId(1), &mut device));
        assert!(scene.find_actor(ActorId(1)).is_none());
        assert!(
            !scene.remove_child(ActorId(1), &mut device),
            "Removing an absent actor returns false"
        );
        assert_lookup_matches_tree(&scene);
    }

    #[test]
    fn test_subtree_removal_purges_descendants() {
        let bus = EventBus::new();
        let mut scene = Scene::new(&bus, test_cache());
        let mut device = HeadlessDevice::new();

        let parent = mesh_node(&scene, RenderPass::Opaque, Vec3::zeros());
        let parent_key = scene.add_child(Some(ActorId(1)), parent);

        let child = mesh_node(&scene, RenderPass::Opaque, Vec3::new(1.0, 0.0, 0.0));
        let child_key = scene.add_child_to(parent_key, Some(ActorId(2)), child);

        let grandchild = mesh_node(&scene, RenderPass::Opaque, Vec3::new(2.0, 0.0, 0.0));
        scene.add_child_to(child_key, Some(ActorId(3)), grandchild);

        assert!(scene.remove_child(ActorId(1), &mut device));

        for id in [1, 2, 3] {
            assert!(
                scene.find_actor(ActorId(id)).is_none(),
                "Actor {} should be gone with the subtree",
                id
            );
        }
        assert!(scene.node(parent_key).is_none());
        assert!(scene.node(child_key).is_none());
        assert_lookup_matches_tree(&scene);
    }

    #[test]
    fn test_lookup_invariant_across_mutations() {
        let bus = EventBus::new();
        let mut scene = Scene::new(&bus, test_cache());
        let mut device = HeadlessDevice::new();

        for i in 0..5 {
            let node = mesh_node(&scene, RenderPass::Opaque, Vec3::new(i as f32, 0.0, 0.0));
            scene.add_child(Some(ActorId(i)), node);
            assert_lookup_matches_tree(&scene);
        }
        for i in [1u32, 3] {
            scene.remove_child(ActorId(i), &mut device);
            assert_lookup_matches_tree(&scene);
        }
    }

    #[test]
    fn test_new_render_component_event_creates_node() {
        let bus = EventBus::new();
        let mut scene = Scene::new(&bus, test_cache());
        let mut device = HeadlessDevice::new();

        bus.publish(SceneEvent::NewRenderComponent {
            actor: ActorId(42),
            payload: payload(RenderPass::Opaque, Vec3::zeros()),
        });
        assert!(
            scene.find_actor(ActorId(42)).is_none(),
            "Mutation is deferred until events are processed"
        );

        scene.process_events(&mut device);

        let key = scene.find_actor(ActorId(42)).expect("node created from event");
        let opaque_group = scene.groups[RenderPass::Opaque.index()];
        assert!(scene.node(opaque_group).unwrap().children().contains(&key));
        assert_lookup_matches_tree(&scene);

        bus.publish(SceneEvent::DestroyActor { actor: ActorId(42) });
        scene.process_events(&mut device);

        assert!(scene.find_actor(ActorId(42)).is_none());
        assert!(!scene.node(opaque_group).unwrap().children().contains(&key));
        assert_lookup_matches_tree(&scene);
    }

    #[test]
    fn test_unknown_effect_in_event_is_skipped() {
        let bus = EventBus::new();
        let mut scene = Scene::new(&bus, test_cache());
        let mut device = HeadlessDevice::new();

        let mut bad = payload(RenderPass::Opaque, Vec3::zeros());
        bad.effect = "NeverLoaded".to_string();
        bus.publish(SceneEvent::NewRenderComponent {
            actor: ActorId(9),
            payload: bad,
        });
        scene.process_events(&mut device);

        assert!(scene.find_actor(ActorId(9)).is_none(), "Unloadable node is not inserted");
    }

    #[test]
    fn test_failed_restore_prevents_insertion() {
        let bus = EventBus::new();
        let mut scene = Scene::new(&bus, test_cache());
        let mut device = HeadlessDevice::new();
        device.set_fail_buffer_creation(true);

        bus.publish(SceneEvent::NewRenderComponent {
            actor: ActorId(10),
            payload: payload(RenderPass::Opaque, Vec3::zeros()),
        });
        scene.process_events(&mut device);

        assert!(scene.find_actor(ActorId(10)).is_none());
    }

    #[test]
    fn test_move_actor_applies_transform() {
        let bus = EventBus::new();
        let mut scene = Scene::new(&bus, test_cache());
        let mut device = HeadlessDevice::new();

        bus.publish(SceneEvent::NewRenderComponent {
            actor: ActorId(5),
            payload: payload(RenderPass::Opaque, Vec3::zeros()),
        });
        scene.process_events(&mut device);

        let moved = Mat4::new_translation(&Vec3::new(7.0, 8.0, 9.0));
        bus.publish(SceneEvent::MoveActor {
            actor: ActorId(5),
            transform: moved,
        });
        scene.process_events(&mut device);

        let key = scene.find_actor(ActorId(5)).unwrap();
        assert_eq!(
            scene.node(key).unwrap().local_transform(),
            &moved,
            "Move events update the node transform immediately"
        );
    }

    #[test]
    fn test_modified_render_component_rebuilds_resources() {
        let bus = EventBus::new();
        let mut scene = Scene::new(&bus, test_cache());
        let mut device = HeadlessDevice::new();

        bus.publish(SceneEvent::NewRenderComponent {
            actor: ActorId(6),
            payload: payload(RenderPass::Opaque, Vec3::zeros()),
        });
        scene.process_events(&mut device);
        let created_before = device.buffers_created();
        let alive_before = device.buffer_count();

        bus.publish(SceneEvent::ModifiedRenderComponent { actor: ActorId(6) });
        scene.process_events(&mut device);

        assert!(
            device.buffers_created() > created_before,
            "Modification rebuilds device buffers"
        );
        assert_eq!(device.buffer_count(), alive_before, "Old buffers are released");
    }

    #[test]
    fn test_dropping_scene_unsubscribes() {
        let bus = EventBus::new();
        let scene = Scene::new(&bus, test_cache());
        assert_eq!(bus.subscriber_count(), 1);

        drop(scene);
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[test]
    fn test_update_propagates_world_matrices() {
        let bus = EventBus::new();
        let mut scene = Scene::new(&bus, test_cache());

        let parent = mesh_node(&scene, RenderPass::Opaque, Vec3::new(1.0, 0.0, 0.0));
        let parent_key = scene.add_child(Some(ActorId(1)), parent);
        let child = mesh_node(&scene, RenderPass::Opaque, Vec3::new(0.0, 2.0, 0.0));
        let child_key = scene.add_child_to(parent_key, Some(ActorId(2)), child);

        scene.update(FrameTime::default());

        let world = scene.node(child_key).unwrap().world_matrix();
        assert_eq!(world[(0, 3)], 1.0, "Child inherits the parent translation");
        assert_eq!(world[(1, 3)], 2.0);
    }

    #[test]
    fn test_sky_node_recenters_on_camera() {
        let bus = EventBus::new();
        let mut scene = Scene::new(&bus, test_cache());
        let sky = SkyNode::new(scene.cache.effect("Flat").unwrap());
        let sky_key = scene.add_child(None, SceneNode::sky(sky));

        let camera_position = Vec3::new(3.0, 4.0, 5.0);
        scene.set_camera(Camera::perspective(camera_position, 60.0, 1.0, 0.1, 100.0));
        scene.update(FrameTime::default());

        let world = scene.node(sky_key).unwrap().world_matrix();
        assert_eq!(world[(0, 3)], 3.0, "Sky dome follows the camera");
        assert_eq!(world[(1, 3)], 4.0);
        assert_eq!(world[(2, 3)], 5.0);
    }

    #[test]
    fn test_render_requires_camera() {
        let bus = EventBus::new();
        let mut scene = Scene::new(&bus, test_cache());
        let mut device = HeadlessDevice::new();

        let node = mesh_node(&scene, RenderPass::Opaque, Vec3::zeros());
        scene.add_child(Some(ActorId(1)), node);
        scene.restore_device(&mut device);
        device.clear_draw_calls();

        scene.render(FrameTime::default(), &mut device);
        assert!(device.draw_calls().is_empty(), "No camera, no rendering");

        scene.set_camera(Camera::default());
        scene.render(FrameTime::default(), &mut device);
        assert_eq!(device.draw_calls().len(), 1);
    }

    #[test]
    fn test_alpha_nodes_draw_last_back_to_front() {
        let bus = EventBus::new();
        let mut scene = Scene::new(&bus, test_cache());
        let mut device = HeadlessDevice::new();

        scene.set_camera(Camera::perspective(
            Vec3::new(0.0, 0.0, 10.0),
            60.0,
            1.0,
            0.1,
            100.0,
        ));

        // Distinguish nodes by index count: opaque cube (36), near alpha
        // triangle (3), far alpha quad (6)
        let mut triangle = Mesh::new("tri");
        triangle.positions = vec![
            Vec3::zeros(),
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(0.0, 1.0, 0.0),
        ];
        triangle.indices = vec![0, 1, 2];

        let mut quad = Mesh::new("quad");
        quad.positions = vec![
            Vec3::zeros(),
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(1.0, 1.0, 0.0),
            Vec3::new(0.0, 1.0, 0.0),
        ];
        quad.indices = vec![0, 1, 2, 2, 3, 0];

        let opaque = mesh_node(&scene, RenderPass::Opaque, Vec3::zeros());
        scene.add_child(Some(ActorId(1)), opaque);

        let mut near_payload = payload(RenderPass::Alpha, Vec3::new(0.0, 0.0, 5.0));
        near_payload.mesh = triangle;
        let near = SceneNode::mesh(near_payload, &scene.cache).unwrap();
        scene.add_child(Some(ActorId(2)), near);

        let mut far_payload = payload(RenderPass::Alpha, Vec3::new(0.0, 0.0, -5.0));
        far_payload.mesh = quad;
        let far = SceneNode::mesh(far_payload, &scene.cache).unwrap();
        scene.add_child(Some(ActorId(3)), far);

        scene.restore_device(&mut device);
        scene.update(FrameTime::default());
        device.clear_draw_calls();

        scene.render(FrameTime::default(), &mut device);

        let index_counts: Vec<u32> = device.draw_calls().iter().map(|c| c.index_count).collect();
        assert_eq!(
            index_counts,
            vec![36, 6, 3],
            "Opaque first, then alpha nodes farthest-first (quad at z=-5, triangle at z=5)"
        );
    }

    #[test]
    fn test_restore_device_is_idempotent() {
        let bus = EventBus::new();
        let mut scene = Scene::new(&bus, test_cache());
        let mut device = HeadlessDevice::new();

        let node = mesh_node(&scene, RenderPass::Opaque, Vec3::zeros());
        scene.add_child(Some(ActorId(1)), node);

        scene.restore_device(&mut device);
        let alive = device.buffer_count();
        scene.restore_device(&mut device);
        scene.restore_device(&mut device);

        assert_eq!(device.buffer_count(), alive, "Repeated restores do not leak buffers");
    }

    #[test]
    fn test_gizmo_invisible_without_picked_actor() {
        let bus = EventBus::new();
        let mut scene = Scene::new(&bus, test_cache());
        let mut device = HeadlessDevice::new();

        let gizmo = GizmoNode::new(scene.cache.effect("Flat").unwrap(), 1000, 1000);
        let gizmo_key = scene.add_gizmo(gizmo);
        scene
            .node_mut(gizmo_key)
            .unwrap()
            .as_gizmo_mut()
            .unwrap()
            .set_mode(crate::gizmo::TransformMode::Translate);
        scene.set_camera(Camera::default());
        scene.restore_device(&mut device);
        device.clear_draw_calls();

        scene.render(FrameTime::default(), &mut device);
        assert!(
            device.draw_calls().is_empty(),
            "Gizmo contributes nothing while no actor is picked"
        );

        // Pick an actor and the gizmo appears
        let node = mesh_node(&scene, RenderPass::Opaque, Vec3::zeros());
        scene.add_child(Some(ActorId(1)), node);
        scene.restore_device(&mut device);
        scene.set_picked_actor(Some(ActorId(1)));
        scene.update(FrameTime::default());
        device.clear_draw_calls();

        scene.render(FrameTime::default(), &mut device);
        assert!(
            device.draw_calls().len() > 1,
            "Selected actor renders with the gizmo overlay"
        );
    }
}
