//! Manipulation gizmo for the selected actor
//!
//! Renders translate/rotate/scale handles around the selection plus a
//! wireframe box over its bounding volume, and ray-tests the pointer against
//! the handle volumes to decide which axis is hot.
//!
//! All handle shapes are packed into one shared vertex/index buffer when the
//! node restores; each shape's sub-range is recorded as offset+count pairs
//! and every handle instance is a single indexed draw reusing those ranges.
//! Nothing is regenerated per frame.
//!
//! Picking transforms the pointer into a handle-local ray: the projection's
//! diagonal terms turn the pixel into a view-space direction (forward is -Z,
//! right-handed), and the inverse of (view × handle-world) carries origin and
//! direction into the handle's local space, where a slab test against the
//! shaft volume decides the hit. Axes are tested in fixed X, Y, Z order and
//! the first hit wins; later axes are not tested that frame.

use std::sync::Arc;

use crate::foundation::math::{Aabb, Mat4, Point3, Ray, Vec3, Vec4};
use crate::input::PointerState;
use crate::render::device::{BufferHandle, IndexFormat, PrimitiveTopology, RenderDevice};
use crate::render::effect::{Effect, Pass};
use crate::render::geometry::{self, ShapeGeometry};
use crate::render::mesh::Mesh;
use crate::scene::{FrameContext, SelectionTarget};

/// Handle size relative to camera distance: world scale = distance × this
const DISTANCE_SCALE: f32 = 0.2;
/// Offset of the shaft primitive along its axis
const SHAFT_OFFSET: f32 = 0.3;
/// Offset of the tip primitive (cone or cube) along its axis
const TIP_OFFSET: f32 = 0.6;

fn picked_color() -> Vec4 {
    Vec4::new(1.0, 1.0, 1.0, 1.0)
}

fn bounding_box_color() -> Vec4 {
    Vec4::new(0.529, 0.808, 0.98, 1.0)
}

/// Active manipulation mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransformMode {
    /// No manipulation; only the bounding box renders
    #[default]
    None,
    /// Translate handles: shaft + cone per axis
    Translate,
    /// Rotate handles: one ring per axis-perpendicular plane
    Rotate,
    /// Scale handles: shaft + cube per axis
    Scale,
}

/// Which specific handle the pointer is over
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PickedHandle {
    /// Nothing hot
    #[default]
    None,
    /// X translate axis
    TranslateX,
    /// Y translate axis
    TranslateY,
    /// Z translate axis
    TranslateZ,
    /// X scale axis
    ScaleX,
    /// Y scale axis
    ScaleY,
    /// Z scale axis
    ScaleZ,
}

/// Sub-range of the shared geometry batch for one shape
#[derive(Debug, Clone, Copy, Default)]
struct ShapeRange {
    vertex_offset: i32,
    index_offset: u32,
    index_count: u32,
}

/// Gizmo node state: geometry batch, manipulation mode, and picking state
#[derive(Debug)]
pub struct GizmoNode {
    effect: Arc<Effect>,
    pointer: PointerState,
    mode: TransformMode,
    picked: PickedHandle,

    vertex_buffer: Option<BufferHandle>,
    index_buffer: Option<BufferHandle>,
    stride: u32,

    wire_box: ShapeRange,
    cylinder: ShapeRange,
    cone: ShapeRange,
    torus: ShapeRange,
    cube: ShapeRange,

    /// Pick volume shared by every shaft handle (cylinder ∪ cone extents)
    handle_bounds: Aabb,
}

/// Distance-proportional handle scale: doubling the camera distance doubles
/// the world-space scale, holding apparent size constant
pub(crate) fn handle_scale(camera_position: &Vec3, object_position: &Vec3) -> f32 {
    (camera_position - object_position).norm() * DISTANCE_SCALE
}

fn axis_color(axis: usize) -> Vec4 {
    match axis {
        0 => Vec4::new(1.0, 0.0, 0.0, 1.0),
        1 => Vec4::new(0.0, 1.0, 0.0, 1.0),
        _ => Vec4::new(0.0, 0.0, 1.0, 1.0),
    }
}

/// Rotation carrying the Y-aligned shaft/tip geometry onto the given axis
fn axis_rotation(axis: usize) -> Mat4 {
    use nalgebra::Rotation3;
    match axis {
        0 => Rotation3::from_axis_angle(&Vec3::z_axis(), (-90.0f32).to_radians()).to_homogeneous(),
        1 => Mat4::identity(),
        _ => Rotation3::from_axis_angle(&Vec3::x_axis(), 90.0f32.to_radians()).to_homogeneous(),
    }
}

fn axis_offset(axis: usize, amount: f32) -> Mat4 {
    let mut offset = Vec3::zeros();
    offset[axis] = amount;
    Mat4::new_translation(&offset)
}

impl GizmoNode {
    /// Create a gizmo drawn with the given effect for a window of the given size
    ///
    /// Geometry buffers are built when the node first restores.
    pub fn new(effect: Arc<Effect>, window_width: u32, window_height: u32) -> Self {
        Self {
            effect,
            pointer: PointerState::new(window_width, window_height),
            mode: TransformMode::None,
            picked: PickedHandle::None,
            vertex_buffer: None,
            index_buffer: None,
            stride: 0,
            wire_box: ShapeRange::default(),
            cylinder: ShapeRange::default(),
            cone: ShapeRange::default(),
            torus: ShapeRange::default(),
            cube: ShapeRange::default(),
            handle_bounds: Aabb::default(),
        }
    }

    /// Switch the manipulation mode
    pub fn set_mode(&mut self, mode: TransformMode) {
        self.mode = mode;
    }

    /// Current manipulation mode
    pub fn mode(&self) -> TransformMode {
        self.mode
    }

    /// Handle the pointer picked during the last render, if any
    pub fn picked_handle(&self) -> PickedHandle {
        self.picked
    }

    /// Record a pointer move
    pub fn on_pointer_move(&mut self, x: f64, y: f64) {
        self.pointer.update_position(x, y);
    }

    /// Record a primary-button press
    pub fn on_pointer_down(&mut self, x: f64, y: f64) {
        self.pointer.update_position(x, y);
        self.pointer.press();
    }

    /// Record a primary-button release
    pub fn on_pointer_up(&mut self) {
        self.pointer.release();
    }

    /// Whether the primary button is held (a drag is in progress)
    pub fn is_dragging(&self) -> bool {
        self.pointer.button_down
    }

    /// Update the viewport size used for pointer-to-view conversion
    pub fn set_viewport(&mut self, width: u32, height: u32) {
        self.pointer.update_window_size(width, height);
    }

    fn pass(&self) -> &Pass {
        self.effect.expect_technique("main11").expect_pass("p0")
    }

    /// Rebuild the shared geometry batch
    ///
    /// Shapes are appended in fixed order (wire box, cylinder, cone, torus,
    /// cube) with their vertex/index sub-ranges recorded for later draws. The
    /// pick volume is the box around the shaft shapes (cylinder + cone), the
    /// same union the handle draws cover.
    pub(crate) fn restore(&mut self, device: &mut dyn RenderDevice) -> bool {
        self.release(device);

        let shapes = [
            geometry::wire_box(),
            geometry::cylinder(0.6, 0.008),
            geometry::cone(0.06, 0.1),
            geometry::torus(1.0, 0.008),
            geometry::cube(0.06),
        ];

        let mut positions: Vec<Vec3> = Vec::new();
        let mut indices: Vec<u16> = Vec::new();
        let mut ranges = [ShapeRange::default(); 5];

        for (shape, range) in shapes.iter().zip(ranges.iter_mut()) {
            *range = ShapeRange {
                vertex_offset: positions.len() as i32,
                index_offset: indices.len() as u32,
                index_count: shape.indices.len() as u32,
            };
            positions.extend_from_slice(&shape.positions);
            indices.extend_from_slice(&shape.indices);
        }

        let [wire_box, cylinder, cone, torus, cube] = ranges;
        self.wire_box = wire_box;
        self.cylinder = cylinder;
        self.cone = cone;
        self.torus = torus;
        self.cube = cube;

        self.handle_bounds = Self::shaft_bounds(&shapes[1], &shapes[2]);

        let mut mesh = Mesh::new("GizmoBatch");
        mesh.positions = positions;

        let pass = self.pass();
        let stride = pass.vertex_stride();
        let vertex_buffer = pass.create_mesh_vertex_buffer(device, &mesh);
        let index_buffer = pass.create_index_buffer(device, bytemuck::cast_slice(&indices));

        self.stride = stride;
        self.vertex_buffer = vertex_buffer;
        self.index_buffer = index_buffer;

        self.vertex_buffer.is_some() && self.index_buffer.is_some()
    }

    fn shaft_bounds(cylinder: &ShapeGeometry, cone: &ShapeGeometry) -> Aabb {
        Aabb::from_points(cylinder.positions.iter().chain(cone.positions.iter()))
    }

    pub(crate) fn release(&mut self, device: &mut dyn RenderDevice) {
        if let Some(handle) = self.vertex_buffer.take() {
            device.destroy_buffer(handle);
        }
        if let Some(handle) = self.index_buffer.take() {
            device.destroy_buffer(handle);
        }
    }

    pub(crate) fn render(&mut self, ctx: &FrameContext, device: &mut dyn RenderDevice) {
        let Some(selection) = ctx.selection else {
            return;
        };
        let (Some(vertex_buffer), Some(index_buffer)) = (self.vertex_buffer, self.index_buffer)
        else {
            return;
        };

        device.set_vertex_buffer(vertex_buffer, self.stride, 0);
        device.set_index_buffer(index_buffer, IndexFormat::Uint16, 0);

        self.pass().apply(device, PrimitiveTopology::LineList);
        self.render_bounding_box(&selection, ctx, device);

        self.pass().apply(device, PrimitiveTopology::TriangleList);
        self.picked = PickedHandle::None;
        match self.mode {
            TransformMode::None => {}
            TransformMode::Translate => self.render_axis_handles(&selection, ctx, device, false),
            TransformMode::Rotate => self.render_rotate_rings(&selection, ctx, device),
            TransformMode::Scale => self.render_axis_handles(&selection, ctx, device, true),
        }
    }

    /// Handle frame: the selection's world matrix with its basis scaled by
    /// the distance factor and its origin shifted to the bounds center
    fn axis_frame(&self, selection: &SelectionTarget, ctx: &FrameContext) -> Mat4 {
        let object_position = Vec3::new(
            selection.world[(0, 3)],
            selection.world[(1, 3)],
            selection.world[(2, 3)],
        );
        let scale = handle_scale(&ctx.camera_position, &object_position);
        Mat4::new_translation(&selection.bounds.center())
            * selection.world
            * Mat4::new_scaling(scale)
    }

    /// Ray-test the pointer against the shaft volume placed by `handle_world`
    fn is_handle_picked(&self, ctx: &FrameContext, handle_world: &Mat4) -> bool {
        let proj = &ctx.projection;
        let width = f64::from(self.pointer.window_width);
        let height = f64::from(self.pointer.window_height);

        let view_x = (2.0 * self.pointer.screen_x / width - 1.0) as f32 / proj[(0, 0)];
        let view_y = (1.0 - 2.0 * self.pointer.screen_y / height) as f32 / proj[(1, 1)];

        let Some(to_local) = (ctx.view * handle_world).try_inverse() else {
            return false;
        };

        let origin = to_local.transform_point(&Point3::origin());
        // Right-handed view space looks down -Z
        let direction = to_local.transform_vector(&Vec3::new(view_x, view_y, -1.0));
        let ray = Ray::new(origin.coords, direction);

        self.handle_bounds.intersect_ray(&ray).is_some()
    }

    fn set_color(&self, color: Vec4) {
        self.effect.expect_variable("AmbientColor").set_vector(color);
    }

    fn draw_shape(
        &self,
        range: ShapeRange,
        wvp: &Mat4,
        device: &mut dyn RenderDevice,
    ) {
        self.effect
            .expect_variable("WorldViewProjection")
            .set_matrix(wvp);
        device.draw_indexed(range.index_count, range.index_offset, range.vertex_offset);
    }

    /// Wireframe box over the selection's bounding volume, recomputed every
    /// frame from its current world matrix and extents
    fn render_bounding_box(
        &self,
        selection: &SelectionTarget,
        ctx: &FrameContext,
        device: &mut dyn RenderDevice,
    ) {
        let box_world = Mat4::new_translation(&selection.bounds.center())
            * selection.world
            * Mat4::new_nonuniform_scaling(&(selection.bounds.extents() * 2.0));
        let wvp = ctx.projection * ctx.view * box_world;

        self.set_color(bounding_box_color());
        self.draw_shape(self.wire_box, &wvp, device);
    }

    /// Shaft + tip handles for translate (cone tips) or scale (cube tips)
    ///
    /// Axes are evaluated in X, Y, Z order; the first whose volume the
    /// pointer ray enters is picked and later axes are not tested.
    fn render_axis_handles(
        &mut self,
        selection: &SelectionTarget,
        ctx: &FrameContext,
        device: &mut dyn RenderDevice,
        scale_mode: bool,
    ) {
        let axis_frame = self.axis_frame(selection, ctx);
        let view_proj = ctx.projection * ctx.view;
        let tip_range = if scale_mode { self.cube } else { self.cone };

        for axis in 0..3 {
            let rotation = axis_rotation(axis);
            let shaft_model = axis_frame * axis_offset(axis, SHAFT_OFFSET) * rotation;
            let tip_model = axis_frame * axis_offset(axis, TIP_OFFSET) * rotation;

            let hit = self.picked == PickedHandle::None
                && self.is_handle_picked(ctx, &shaft_model);
            if hit {
                self.picked = match (scale_mode, axis) {
                    (false, 0) => PickedHandle::TranslateX,
                    (false, 1) => PickedHandle::TranslateY,
                    (false, _) => PickedHandle::TranslateZ,
                    (true, 0) => PickedHandle::ScaleX,
                    (true, 1) => PickedHandle::ScaleY,
                    (true, _) => PickedHandle::ScaleZ,
                };
                self.set_color(picked_color());
            } else {
                self.set_color(axis_color(axis));
            }

            self.draw_shape(self.cylinder, &(view_proj * shaft_model), device);
            self.draw_shape(tip_range, &(view_proj * tip_model), device);
        }
    }

    /// One torus per axis-perpendicular plane; rings are not pickable
    fn render_rotate_rings(
        &self,
        selection: &SelectionTarget,
        ctx: &FrameContext,
        device: &mut dyn RenderDevice,
    ) {
        let axis_frame = self.axis_frame(selection, ctx);
        let view_proj = ctx.projection * ctx.view;

        for axis in 0..3 {
            let model = axis_frame * axis_rotation(axis);
            self.set_color(axis_color(axis));
            self.draw_shape(self.torus, &(view_proj * model), device);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::time::FrameTime;
    use crate::render::device::HeadlessDevice;
    use crate::render::effect::{
        Effect, EffectDesc, PassDesc, TechniqueDesc, VariableDesc, VariableValue,
    };
    use crate::render::layout::SignatureElement;
    use crate::scene::Camera;

    fn gizmo_effect() -> Arc<Effect> {
        Arc::new(
            Effect::from_desc(EffectDesc {
                name: "DebugAssist".to_string(),
                source_path: "effects/DebugAssist.fx".to_string(),
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
                ],
            })
            .unwrap(),
        )
    }

    fn restored_gizmo(device: &mut HeadlessDevice) -> GizmoNode {
        let mut gizmo = GizmoNode::new(gizmo_effect(), 1000, 1000);
        assert!(gizmo.restore(device));
        gizmo
    }

    fn context_with_selection(camera_position: Vec3) -> FrameContext {
        let mut camera = Camera::perspective(camera_position, 90.0, 1.0, 0.1, 100.0);
        camera.look_at(Vec3::zeros(), Vec3::new(0.0, 1.0, 0.0));

        FrameContext {
            time: FrameTime::default(),
            view: camera.view_matrix(),
            projection: camera.projection_matrix(),
            camera_position,
            selection: Some(SelectionTarget {
                world: Mat4::identity(),
                bounds: Aabb::from_center_extents(Vec3::zeros(), Vec3::new(0.5, 0.5, 0.5)),
            }),
        }
    }

    #[test]
    fn test_geometry_batch_ranges_are_contiguous() {
        let mut device = HeadlessDevice::new();
        let gizmo = restored_gizmo(&mut device);

        let ranges = [gizmo.wire_box, gizmo.cylinder, gizmo.cone, gizmo.torus, gizmo.cube];

        assert_eq!(ranges[0].vertex_offset, 0);
        assert_eq!(ranges[0].index_offset, 0);
        assert_eq!(ranges[0].index_count, 24, "Wire box has 24 line indices");

        for pair in ranges.windows(2) {
            assert_eq!(
                pair[1].index_offset,
                pair[0].index_offset + pair[0].index_count,
                "Index sub-ranges must be contiguous"
            );
            assert!(pair[1].vertex_offset > pair[0].vertex_offset);
        }
    }

    #[test]
    fn test_batch_built_once_into_shared_buffers() {
        let mut device = HeadlessDevice::new();
        let mut gizmo = restored_gizmo(&mut device);

        assert_eq!(device.buffer_count(), 2, "One vertex and one index buffer");

        // Every draw in translate mode reuses the same two buffers
        gizmo.set_mode(TransformMode::Translate);
        gizmo.on_pointer_move(500.0, 500.0);
        let created_before = device.buffers_created();
        gizmo.render(&context_with_selection(Vec3::new(0.0, 0.0, 5.0)), &mut device);

        assert_eq!(
            device.buffers_created(),
            created_before,
            "Rendering must not regenerate geometry"
        );
        let vb = gizmo.vertex_buffer;
        assert!(device.draw_calls().iter().all(|c| c.vertex_buffer == vb));
    }

    #[test]
    fn test_invisible_without_selection() {
        let mut device = HeadlessDevice::new();
        let mut gizmo = restored_gizmo(&mut device);
        gizmo.set_mode(TransformMode::Translate);

        let mut ctx = context_with_selection(Vec3::new(0.0, 0.0, 5.0));
        ctx.selection = None;
        gizmo.render(&ctx, &mut device);

        assert!(device.draw_calls().is_empty(), "No selection, no draws");
    }

    #[test]
    fn test_draw_counts_per_mode() {
        let mut device = HeadlessDevice::new();
        let mut gizmo = restored_gizmo(&mut device);
        let ctx = context_with_selection(Vec3::new(0.0, 0.0, 5.0));

        gizmo.set_mode(TransformMode::Translate);
        gizmo.render(&ctx, &mut device);
        assert_eq!(device.draw_calls().len(), 7, "Box + 3 shafts + 3 cone tips");
        assert_eq!(device.draw_calls()[0].topology, PrimitiveTopology::LineList);
        device.clear_draw_calls();

        gizmo.set_mode(TransformMode::Rotate);
        gizmo.render(&ctx, &mut device);
        assert_eq!(device.draw_calls().len(), 4, "Box + 3 rings");
        device.clear_draw_calls();

        gizmo.set_mode(TransformMode::None);
        gizmo.render(&ctx, &mut device);
        assert_eq!(device.draw_calls().len(), 1, "Bounding box only");
    }

    #[test]
    fn test_picking_precedence_x_before_y() {
        let mut device = HeadlessDevice::new();
        let mut gizmo = restored_gizmo(&mut device);
        gizmo.set_mode(TransformMode::Translate);

        // Camera a unit-distance grid in front; the pointer aims the ray
        // through (0.02, 0.02, 0), a point inside both the X and Y shaft
        // volumes near the gizmo origin.
        let ctx = context_with_selection(Vec3::new(0.0, 0.0, 5.0));
        let target = Vec3::new(0.02, 0.02, 0.0);
        let view_x = target.x / 5.0 * ctx.projection[(0, 0)];
        let view_y = target.y / 5.0 * ctx.projection[(1, 1)];
        let mx = (f64::from(view_x) + 1.0) * 0.5 * 1000.0;
        let my = (1.0 - f64::from(view_y)) * 0.5 * 1000.0;
        gizmo.on_pointer_move(mx, my);

        gizmo.render(&ctx, &mut device);

        assert_eq!(
            gizmo.picked_handle(),
            PickedHandle::TranslateX,
            "X is tested first and wins when both axes are under the pointer"
        );
    }

    #[test]
    fn test_picking_scale_axes() {
        let mut device = HeadlessDevice::new();
        let mut gizmo = restored_gizmo(&mut device);
        gizmo.set_mode(TransformMode::Scale);

        // Aim at a point only inside the Y shaft volume
        let ctx = context_with_selection(Vec3::new(0.0, 0.0, 5.0));
        let target = Vec3::new(0.0, 0.4, 0.0);
        let view_y = target.y / 5.0 * ctx.projection[(1, 1)];
        let my = (1.0 - f64::from(view_y)) * 0.5 * 1000.0;
        gizmo.on_pointer_move(500.0, my);

        gizmo.render(&ctx, &mut device);
        assert_eq!(gizmo.picked_handle(), PickedHandle::ScaleY);
    }

    #[test]
    fn test_nothing_picked_away_from_handles() {
        let mut device = HeadlessDevice::new();
        let mut gizmo = restored_gizmo(&mut device);
        gizmo.set_mode(TransformMode::Translate);

        let ctx = context_with_selection(Vec3::new(0.0, 0.0, 5.0));
        gizmo.on_pointer_move(10.0, 10.0); // far corner of the screen
        gizmo.render(&ctx, &mut device);

        assert_eq!(gizmo.picked_handle(), PickedHandle::None);
    }

    #[test]
    fn test_handle_scale_is_linear_in_distance() {
        let object = Vec3::zeros();
        let near = handle_scale(&Vec3::new(0.0, 0.0, 5.0), &object);
        let far = handle_scale(&Vec3::new(0.0, 0.0, 10.0), &object);

        assert!((far - 2.0 * near).abs() < 1e-6, "Doubling distance doubles the scale");
        assert!((near - 1.0).abs() < 1e-6, "5.0 × 0.2 = 1.0");
    }

    #[test]
    fn test_restore_is_idempotent() {
        let mut device = HeadlessDevice::new();
        let mut gizmo = restored_gizmo(&mut device);

        assert!(gizmo.restore(&mut device));
        assert!(gizmo.restore(&mut device));
        assert_eq!(
            device.buffer_count(),
            2,
            "Old buffers are released before new ones are created"
        );
    }

    #[test]
    fn test_failed_restore_skips_draws() {
        let mut device = HeadlessDevice::new();
        let mut gizmo = GizmoNode::new(gizmo_effect(), 1000, 1000);

        device.set_fail_buffer_creation(true);
        assert!(!gizmo.restore(&mut device), "Restore reports failure");

        gizmo.set_mode(TransformMode::Translate);
        gizmo.render(&context_with_selection(Vec3::new(0.0, 0.0, 5.0)), &mut device);
        assert!(device.draw_calls().is_empty(), "No buffers, no draws");
    }
}
