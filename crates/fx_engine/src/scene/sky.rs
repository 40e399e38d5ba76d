//! Sky dome node
//!
//! A sphere that follows the camera: every update it recomputes its local
//! transform as scale-then-translate-to-camera, so the dome never gets closer
//! or farther no matter how the camera moves. Renders in the sky pass with a
//! cube-map resource bound to the effect.

use std::sync::Arc;

use crate::foundation::math::Mat4;
use crate::render::device::{BufferHandle, IndexFormat, PrimitiveTopology, RenderDevice, ResourceHandle};
use crate::render::effect::{Effect, Pass};
use crate::render::geometry;
use crate::render::mesh::Mesh;
use crate::scene::FrameContext;

const DOME_SCALE: f32 = 10.0;
const DOME_TESSELLATION: u32 = 16;

/// Camera-following sky dome
#[derive(Debug)]
pub struct SkyNode {
    effect: Arc<Effect>,
    texture: Option<ResourceHandle>,
    active: bool,
    vertex_buffer: Option<BufferHandle>,
    index_buffer: Option<BufferHandle>,
    index_count: u32,
    stride: u32,
}

impl SkyNode {
    /// Create a sky dome rendered with the given effect
    pub fn new(effect: Arc<Effect>) -> Self {
        Self {
            effect,
            texture: None,
            active: true,
            vertex_buffer: None,
            index_buffer: None,
            index_count: 0,
            stride: 0,
        }
    }

    /// Bind the cube-map resource the effect samples
    pub fn set_texture(&mut self, texture: Option<ResourceHandle>) {
        self.texture = texture;
    }

    /// Toggle the dome without removing it from the scene
    pub fn set_active(&mut self, active: bool) {
        self.active = active;
    }

    /// Whether the dome currently renders
    pub fn is_active(&self) -> bool {
        self.active
    }

    fn pass(&self) -> &Pass {
        self.effect.expect_technique("main11").expect_pass("p0")
    }

    /// Compute the camera-centered local transform for this frame
    pub(crate) fn recenter(&self, ctx: &FrameContext) -> Mat4 {
        Mat4::new_translation(&ctx.camera_position) * Mat4::new_scaling(DOME_SCALE)
    }

    pub(crate) fn restore(&mut self, device: &mut dyn RenderDevice) -> bool {
        self.release(device);

        let dome = geometry::sphere(2.0, DOME_TESSELLATION);
        let mut mesh = Mesh::new("SkyDome");
        mesh.positions = dome.positions;
        mesh.indices = dome.indices.iter().map(|&i| u32::from(i)).collect();

        let pass = self.pass();
        let stride = pass.vertex_stride();
        let vertex_buffer = pass.create_mesh_vertex_buffer(device, &mesh);
        let index_buffer = pass.create_index_buffer(device, bytemuck::cast_slice(&mesh.indices));

        self.stride = stride;
        self.index_count = mesh.indices.len() as u32;
        self.vertex_buffer = vertex_buffer;
        self.index_buffer = index_buffer;

        self.vertex_buffer.is_some() && self.index_buffer.is_some()
    }

    pub(crate) fn render(&self, world: &Mat4, ctx: &FrameContext, device: &mut dyn RenderDevice) {
        let (Some(vertex_buffer), Some(index_buffer)) = (self.vertex_buffer, self.index_buffer)
        else {
            return;
        };

        let wvp = ctx.projection * ctx.view * world;
        self.effect.expect_variable("WorldViewProjection").set_matrix(&wvp);
        if self.texture.is_some() {
            self.effect
                .expect_variable("SkyboxTexture")
                .set_resource(self.texture);
        }

        let pass = self.pass();
        pass.apply(device, PrimitiveTopology::TriangleList);
        device.set_vertex_buffer(vertex_buffer, self.stride, 0);
        device.set_index_buffer(index_buffer, IndexFormat::Uint32, 0);
        device.draw_indexed(self.index_count, 0, 0);
    }

    pub(crate) fn release(&mut self, device: &mut dyn RenderDevice) {
        if let Some(handle) = self.vertex_buffer.take() {
            device.destroy_buffer(handle);
        }
        if let Some(handle) = self.index_buffer.take() {
            device.destroy_buffer(handle);
        }
    }
}
