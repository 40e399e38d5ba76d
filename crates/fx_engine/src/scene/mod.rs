//! Scene graph: node hierarchy, actor lookup, and frame traversal
//!
//! A [`Scene`] owns a tree of [`SceneNode`]s rooted at a synthetic root node
//! whose direct children are fixed render-pass groups. Nodes are held in a
//! generational arena and addressed by [`NodeKey`]; an actor-id map provides
//! O(1) lookup from gameplay identity to node.

mod camera;
mod graph;
mod node;
mod sky;

pub use camera::Camera;
pub use graph::Scene;
pub use node::{MeshNode, NodeKind, SceneNode};
pub use sky::SkyNode;

use slotmap::new_key_type;

use crate::foundation::math::{Aabb, Mat4, Vec3};
use crate::foundation::time::FrameTime;

new_key_type! {
    /// Generational key addressing a node within a scene's arena
    pub struct NodeKey;
}

/// Gameplay-side entity identity attached to a scene node
///
/// Nodes created by engine subsystems (sky, gizmos, pass groups) carry no
/// actor and are represented with `Option<ActorId>::None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ActorId(pub u32);

/// Render-pass classification of a scene node
///
/// The root's pass groups are traversed in declaration order; alpha nodes are
/// collected during the main traversal and drawn last, back-to-front.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RenderPass {
    /// Solid geometry, drawn first
    Opaque,
    /// Sky dome, drawn after opaque geometry
    Sky,
    /// Editor/debug overlays such as gizmos
    Debug,
    /// Transparent geometry, deferred to a final back-to-front pass
    Alpha,
}

impl RenderPass {
    pub(crate) const ALL: [RenderPass; 4] = [
        RenderPass::Opaque,
        RenderPass::Sky,
        RenderPass::Debug,
        RenderPass::Alpha,
    ];

    pub(crate) fn index(self) -> usize {
        match self {
            RenderPass::Opaque => 0,
            RenderPass::Sky => 1,
            RenderPass::Debug => 2,
            RenderPass::Alpha => 3,
        }
    }
}

/// The current selection, resolved once per frame for nodes that render
/// relative to it (gizmos, overlays)
#[derive(Debug, Clone, Copy)]
pub struct SelectionTarget {
    /// Selected node's world matrix
    pub world: Mat4,
    /// Selected node's local-space bounding box
    pub bounds: Aabb,
}

/// Per-frame state handed to every node during update and render
#[derive(Debug, Clone)]
pub struct FrameContext {
    /// Frame timing
    pub time: FrameTime,
    /// Active camera's view matrix
    pub view: Mat4,
    /// Active camera's projection matrix
    pub projection: Mat4,
    /// Active camera's world position
    pub camera_position: Vec3,
    /// Currently selected actor's node, if any
    pub selection: Option<SelectionTarget>,
}
