//! Entity lifecycle event bus
//!
//! The scene graph does not poll the gameplay layer; it reacts to lifecycle
//! notifications published on an [`EventBus`]. The bus is an explicit
//! dependency handed to subscribers at construction; there is no process-wide
//! singleton. A subscription unregisters itself when dropped, so a torn
//! down scene can never be invoked through a dangling listener.
//!
//! Delivery is queued per subscriber: publishing never re-enters subscriber
//! code, and the scene drains its queue at a well-defined point in the frame.
//! This keeps graph mutation asynchronous relative to entity creation while
//! staying on the single update/render thread.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use crate::foundation::math::{Mat4, Vec4};
use crate::render::mesh::Mesh;
use crate::scene::{ActorId, RenderPass};

/// Renderable description carried by a new-render-component event
///
/// Everything the scene needs to build and restore a mesh node for the actor:
/// geometry, the effect/technique to draw it with, its pass classification,
/// and the initial transform.
#[derive(Debug, Clone)]
pub struct RenderPayload {
    /// Geometry to render
    pub mesh: Mesh,
    /// Name of the effect resource to resolve
    pub effect: String,
    /// Technique to select within the effect
    pub technique: String,
    /// Render-pass classification for the node
    pub render_pass: RenderPass,
    /// Initial local transform
    pub transform: Mat4,
    /// Optional flat color bound to the effect's ambient-color variable
    pub color: Option<Vec4>,
}

/// Entity lifecycle notifications consumed by the scene graph
#[derive(Debug, Clone)]
pub enum SceneEvent {
    /// An actor gained a render component; the scene creates a node for it
    NewRenderComponent {
        /// Actor the component belongs to
        actor: ActorId,
        /// Renderable description for the new node
        payload: RenderPayload,
    },
    /// An actor was destroyed; the scene removes its subtree
    DestroyActor {
        /// Destroyed actor
        actor: ActorId,
    },
    /// An actor moved; the scene updates its node's local transform
    MoveActor {
        /// Moved actor
        actor: ActorId,
        /// New local transform
        transform: Mat4,
    },
    /// An actor's render component changed; the scene rebuilds device resources
    ModifiedRenderComponent {
        /// Modified actor
        actor: ActorId,
    },
}

/// Discriminant used to register interest in specific event kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SceneEventKind {
    /// [`SceneEvent::NewRenderComponent`]
    NewRenderComponent,
    /// [`SceneEvent::DestroyActor`]
    DestroyActor,
    /// [`SceneEvent::MoveActor`]
    MoveActor,
    /// [`SceneEvent::ModifiedRenderComponent`]
    ModifiedRenderComponent,
}

impl SceneEvent {
    /// The kind discriminant of this event
    pub fn kind(&self) -> SceneEventKind {
        match self {
            Self::NewRenderComponent { .. } => SceneEventKind::NewRenderComponent,
            Self::DestroyActor { .. } => SceneEventKind::DestroyActor,
            Self::MoveActor { .. } => SceneEventKind::MoveActor,
            Self::ModifiedRenderComponent { .. } => SceneEventKind::ModifiedRenderComponent,
        }
    }
}

#[derive(Debug, Default)]
struct BusState {
    next_id: u64,
    queues: HashMap<u64, SubscriberQueue>,
}

#[derive(Debug)]
struct SubscriberQueue {
    kinds: Vec<SceneEventKind>,
    events: VecDeque<SceneEvent>,
}

/// Publish-subscribe dispatcher for scene events
///
/// Cheap to clone; clones share the same subscriber table.
#[derive(Debug, Clone, Default)]
pub struct EventBus {
    state: Arc<Mutex<BusState>>,
}

impl EventBus {
    /// Create a new bus with no subscribers
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a subscriber interested in the given event kinds
    ///
    /// The returned subscription owns a private queue; dropping it
    /// unregisters the subscriber.
    pub fn subscribe(&self, kinds: &[SceneEventKind]) -> EventSubscription {
        let mut state = self.state.lock().unwrap();
        state.next_id += 1;
        let id = state.next_id;
        state.queues.insert(
            id,
            SubscriberQueue {
                kinds: kinds.to_vec(),
                events: VecDeque::new(),
            },
        );

        EventSubscription {
            id,
            state: self.state.clone(),
        }
    }

    /// Publish an event to every subscriber registered for its kind
    pub fn publish(&self, event: SceneEvent) {
        let kind = event.kind();
        let mut state = self.state.lock().unwrap();
        for queue in state.queues.values_mut() {
            if queue.kinds.contains(&kind) {
                queue.events.push_back(event.clone());
            }
        }
    }

    /// Number of live subscriptions
    pub fn subscriber_count(&self) -> usize {
        self.state.lock().unwrap().queues.len()
    }
}

/// A registered interest in scene events; unregisters on drop
#[derive(Debug)]
pub struct EventSubscription {
    id: u64,
    state: Arc<Mutex<BusState>>,
}

impl EventSubscription {
    /// Take the next queued event, if any
    pub fn poll(&self) -> Option<SceneEvent> {
        let mut state = self.state.lock().unwrap();
        state.queues.get_mut(&self.id)?.events.pop_front()
    }

    /// Take every queued event at once
    pub fn drain(&self) -> Vec<SceneEvent> {
        let mut state = self.state.lock().unwrap();
        match state.queues.get_mut(&self.id) {
            Some(queue) => queue.events.drain(..).collect(),
            None => Vec::new(),
        }
    }
}

impl Drop for EventSubscription {
    fn drop(&mut self) {
        let mut state = self.state.lock().unwrap();
        state.queues.remove(&self.id);
    }
}
