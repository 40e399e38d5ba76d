//! Scene nodes and their concrete behaviors
//!
//! A [`SceneNode`] couples the hierarchy bookkeeping every node shares
//! (identity, pass classification, transforms, bounds, children) with a
//! closed [`NodeKind`] variant supplying the node's behavior over the
//! update/render/restore/visibility capability set. The tree exclusively owns
//! its nodes; device resources held by a kind are released when the node
//! leaves the tree or the graph is torn down.

use std::sync::Arc;

use crate::assets::{AssetError, ResourceCache};
use crate::events::RenderPayload;
use crate::foundation::math::{Aabb, Mat4, Vec4};
use crate::gizmo::GizmoNode;
use crate::render::device::{BufferHandle, IndexFormat, PrimitiveTopology, RenderDevice};
use crate::render::effect::{Effect, Pass};
use crate::render::mesh::Mesh;
use crate::scene::sky::SkyNode;
use crate::scene::{ActorId, FrameContext, NodeKey, RenderPass};

/// Behavior variant of a scene node
#[derive(Debug)]
pub enum NodeKind {
    /// Structural node with no behavior of its own (root, pass groups)
    Group,
    /// Renderable mesh bound to an effect
    Mesh(MeshNode),
    /// Sky dome that re-centers on the camera
    Sky(SkyNode),
    /// Manipulation gizmo overlay for the selected actor
    Gizmo(GizmoNode),
}

/// One renderable or grouping entity in the scene tree
#[derive(Debug)]
pub struct SceneNode {
    pub(crate) actor: Option<ActorId>,
    pub(crate) render_pass: RenderPass,
    pub(crate) local: Mat4,
    pub(crate) world: Mat4,
    pub(crate) bounds: Aabb,
    pub(crate) parent: Option<NodeKey>,
    pub(crate) children: Vec<NodeKey>,
    pub(crate) kind: NodeKind,
}

impl SceneNode {
    fn with_kind(render_pass: RenderPass, kind: NodeKind) -> Self {
        Self {
            actor: None,
            render_pass,
            local: Mat4::identity(),
            world: Mat4::identity(),
            bounds: Aabb::default(),
            parent: None,
            children: Vec::new(),
            kind,
        }
    }

    /// Create a structural group node
    pub fn group(render_pass: RenderPass) -> Self {
        Self::with_kind(render_pass, NodeKind::Group)
    }

    /// Create a mesh node from a render payload, resolving its effect
    ///
    /// Fails when the payload names an effect the cache never loaded: a
    /// resource-load failure the caller must not render through.
    pub fn mesh(payload: RenderPayload, cache: &ResourceCache) -> Result<Self, AssetError> {
        let effect = cache.effect(&payload.effect)?;
        let mut node = Self::with_kind(
            payload.render_pass,
            NodeKind::Mesh(MeshNode::new(
                payload.mesh.clone(),
                effect,
                payload.technique.clone(),
                payload.color,
            )),
        );
        node.local = payload.transform;
        node.bounds = payload.mesh.compute_bounds();
        Ok(node)
    }

    /// Wrap a sky dome into a sky-pass node
    pub fn sky(sky: SkyNode) -> Self {
        Self::with_kind(RenderPass::Sky, NodeKind::Sky(sky))
    }

    /// Wrap a gizmo into a debug-pass node
    pub fn gizmo(gizmo: GizmoNode) -> Self {
        Self::with_kind(RenderPass::Debug, NodeKind::Gizmo(gizmo))
    }

    /// Actor identity, if the node represents a gameplay entity
    pub fn actor(&self) -> Option<ActorId> {
        self.actor
    }

    /// Render-pass classification
    pub fn render_pass(&self) -> RenderPass {
        self.render_pass
    }

    /// Local transform relative to the parent
    pub fn local_transform(&self) -> &Mat4 {
        &self.local
    }

    /// Replace the local transform
    pub fn set_local_transform(&mut self, transform: Mat4) {
        self.local = transform;
    }

    /// Cached world matrix from the last traversal
    pub fn world_matrix(&self) -> &Mat4 {
        &self.world
    }

    /// Local-space bounding box
    pub fn bounds(&self) -> &Aabb {
        &self.bounds
    }

    /// Parent node key, if any
    pub fn parent(&self) -> Option<NodeKey> {
        self.parent
    }

    /// Child node keys in insertion order
    pub fn children(&self) -> &[NodeKey] {
        &self.children
    }

    /// Behavior variant
    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    /// Mutable access to the sky dome, if this is a sky node
    pub fn as_sky_mut(&mut self) -> Option<&mut SkyNode> {
        match &mut self.kind {
            NodeKind::Sky(sky) => Some(sky),
            _ => None,
        }
    }

    /// Mutable access to the gizmo, if this is a gizmo node
    pub fn as_gizmo_mut(&mut self) -> Option<&mut GizmoNode> {
        match &mut self.kind {
            NodeKind::Gizmo(gizmo) => Some(gizmo),
            _ => None,
        }
    }

    pub(crate) fn on_update(&mut self, ctx: &FrameContext) {
        if let NodeKind::Sky(sky) = &self.kind {
            self.local = sky.recenter(ctx);
        }
    }

    /// Re-acquire device-dependent resources; returns false when the node is
    /// left without usable buffers
    pub(crate) fn on_restore(&mut self, device: &mut dyn RenderDevice) -> bool {
        match &mut self.kind {
            NodeKind::Group => true,
            NodeKind::Mesh(mesh) => mesh.restore(device),
            NodeKind::Sky(sky) => sky.restore(device),
            NodeKind::Gizmo(gizmo) => gizmo.restore(device),
        }
    }

    pub(crate) fn on_render(&mut self, ctx: &FrameContext, device: &mut dyn RenderDevice) {
        let world = self.world;
        match &mut self.kind {
            NodeKind::Group => {}
            NodeKind::Mesh(mesh) => mesh.render(&world, ctx, device),
            NodeKind::Sky(sky) => sky.render(&world, ctx, device),
            NodeKind::Gizmo(gizmo) => gizmo.render(ctx, device),
        }
    }

    pub(crate) fn is_visible(&self, ctx: &FrameContext) -> bool {
        match &self.kind {
            NodeKind::Group | NodeKind::Mesh(_) => true,
            NodeKind::Sky(sky) => sky.is_active(),
            NodeKind::Gizmo(_) => ctx.selection.is_some(),
        }
    }

    /// Release all device resources held by the node
    pub(crate) fn release(&mut self, device: &mut dyn RenderDevice) {
        match &mut self.kind {
            NodeKind::Group => {}
            NodeKind::Mesh(mesh) => mesh.release(device),
            NodeKind::Sky(sky) => sky.release(device),
            NodeKind::Gizmo(gizmo) => gizmo.release(device),
        }
    }
}

/// Renderable mesh bound to an effect technique
///
/// The vertex buffer is packed to the layout the technique's first pass
/// derives from its shader signature, so the geometry always matches what the
/// program expects.
#[derive(Debug)]
pub struct MeshNode {
    mesh: Mesh,
    effect: Arc<Effect>,
    technique: String,
    color: Option<Vec4>,
    vertex_buffer: Option<BufferHandle>,
    index_buffer: Option<BufferHandle>,
    index_count: u32,
    stride: u32,
}

impl MeshNode {
    fn new(mesh: Mesh, effect: Arc<Effect>, technique: String, color: Option<Vec4>) -> Self {
        Self {
            mesh,
            effect,
            technique,
            color,
            vertex_buffer: None,
            index_buffer: None,
            index_count: 0,
            stride: 0,
        }
    }

    fn pass(&self) -> &Pass {
        let technique = self.effect.expect_technique(&self.technique);
        technique.passes().first().unwrap_or_else(|| {
            log::error!(
                "technique has no passes: {}:{}",
                self.effect.name(),
                self.technique
            );
            panic!(
                "technique has no passes: {}:{}",
                self.effect.name(),
                self.technique
            );
        })
    }

    fn restore(&mut self, device: &mut dyn RenderDevice) -> bool {
        self.release(device);

        let pass = self.pass();
        let stride = pass.vertex_stride();
        let vertex_buffer = pass.create_mesh_vertex_buffer(device, &self.mesh);
        let index_buffer = pass.create_index_buffer(device, bytemuck::cast_slice(&self.mesh.indices));

        self.stride = stride;
        self.index_count = self.mesh.indices.len() as u32;
        self.vertex_buffer = vertex_buffer;
        self.index_buffer = index_buffer;

        self.vertex_buffer.is_some() && self.index_buffer.is_some()
    }

    fn render(&self, world: &Mat4, ctx: &FrameContext, device: &mut dyn RenderDevice) {
        let (Some(vertex_buffer), Some(index_buffer)) = (self.vertex_buffer, self.index_buffer)
        else {
            // Resources failed to restore; skip the draw rather than crash the frame
            return;
        };

        let wvp = ctx.projection * ctx.view * world;
        self.effect.expect_variable("WorldViewProjection").set_matrix(&wvp);
        if let Some(color) = self.color {
            if let Some(variable) = self.effect.variable_by_name("AmbientColor") {
                variable.set_vector(color);
            }
        }

        let pass = self.pass();
        pass.apply(device, PrimitiveTopology::TriangleList);
        device.set_vertex_buffer(vertex_buffer, self.stride, 0);
        device.set_index_buffer(index_buffer, IndexFormat::Uint32, 0);
        device.draw_indexed(self.index_count, 0, 0);
    }

    fn release(&mut self, device: &mut dyn RenderDevice) {
        if let Some(handle) = self.vertex_buffer.take() {
            device.destroy_buffer(handle);
        }
        if let Some(handle) = self.index_buffer.take() {
            device.destroy_buffer(handle);
        }
    }
}
