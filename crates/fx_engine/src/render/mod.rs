//! Rendering layer: device abstraction, geometry, and the effect system
//!
//! Nothing in this module talks to a concrete graphics API. The scene graph
//! drives rendering through the [`device::RenderDevice`] trait, and the
//! effect layer ([`effect`]) binds shader parameters and derives vertex
//! layouts ([`layout`]) purely from reflected program descriptions.

pub mod device;
pub mod effect;
pub mod geometry;
pub mod layout;
pub mod mesh;

pub use device::{
    BufferHandle, DeviceError, DeviceResult, DrawCall, HeadlessDevice, IndexFormat,
    PrimitiveTopology, RenderDevice, ResourceHandle,
};
pub use effect::{Effect, EffectDesc, EffectError, Pass, Technique, Variable, VariableValue};
pub use layout::{VertexLayout, VertexSemantic};
pub use mesh::Mesh;
