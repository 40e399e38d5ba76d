//! # FX Engine
//!
//! Scene-graph and render-pipeline core for a 3D engine/editor: a node
//! hierarchy updated and rendered once per frame, an effect reflection layer
//! that binds shader programs and vertex layouts to geometry, and an
//! interactive gizmo subsystem for translate/rotate/scale manipulation of
//! the selected entity.
//!
//! The core talks to graphics hardware only through the
//! [`render::RenderDevice`] trait and reacts to gameplay through the
//! [`events::EventBus`]; windowing, asset import, and the concrete graphics
//! backend live outside this crate.
//!
//! ## Frame flow
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use fx_engine::prelude::*;
//!
//! let bus = EventBus::new();
//! let mut cache = ResourceCache::new();
//! # let effect_ron = "";
//! cache.load_effect_str(effect_ron).unwrap();
//!
//! let mut scene = Scene::new(&bus, Arc::new(cache));
//! scene.set_camera(Camera::default());
//!
//! let mut device = HeadlessDevice::new();
//! let mut timer = Timer::new();
//! loop {
//!     timer.update();
//!     scene.process_events(&mut device);
//!     scene.update(timer.frame_time());
//!     scene.render(timer.frame_time(), &mut device);
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::similar_names, clippy::too_many_arguments)]

pub mod assets;
pub mod config;
pub mod events;
pub mod foundation;
pub mod gizmo;
pub mod input;
pub mod render;
pub mod scene;

/// Common imports for engine users
pub mod prelude {
    pub use crate::assets::{AssetError, ResourceCache};
    pub use crate::config::{ConfigError, EngineConfig};
    pub use crate::events::{EventBus, RenderPayload, SceneEvent, SceneEventKind};
    pub use crate::foundation::math::{Aabb, Mat4, Ray, Transform, Vec2, Vec3, Vec4};
    pub use crate::foundation::time::{FrameTime, Timer};
    pub use crate::gizmo::{GizmoNode, PickedHandle, TransformMode};
    pub use crate::render::{
        Effect, HeadlessDevice, Mesh, PrimitiveTopology, RenderDevice, ResourceHandle,
    };
    pub use crate::scene::{ActorId, Camera, RenderPass, Scene, SceneNode, SkyNode};
}
