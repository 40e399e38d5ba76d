//! Procedural geometry for engine-owned nodes
//!
//! Generates the primitive shapes the gizmo batches into its shared buffer
//! (wire box, cylinder, cone, torus, cube) and the sphere the sky dome is
//! built from. Only positions are produced; these shapes are drawn with
//! flat-color effects whose passes declare a POSITION-only input layout.

use crate::foundation::math::Vec3;

/// Number of segments used around an axis of revolution
const TESSELLATION: u32 = 16;

/// Position-only geometry with 16-bit indices
#[derive(Debug, Clone, Default)]
pub struct ShapeGeometry {
    /// Vertex positions
    pub positions: Vec<Vec3>,
    /// Primitive indices
    pub indices: Vec<u16>,
}

/// Create a unit wireframe box centered at the origin (line-list indices)
///
/// 8 corners at ±0.5 and 24 indices: the four bottom edges, the four top
/// edges, and the four verticals.
pub fn wire_box() -> ShapeGeometry {
    let positions = vec![
        Vec3::new(-0.5, -0.5, -0.5),
        Vec3::new(0.5, -0.5, -0.5),
        Vec3::new(0.5, -0.5, 0.5),
        Vec3::new(-0.5, -0.5, 0.5),
        Vec3::new(-0.5, 0.5, -0.5),
        Vec3::new(0.5, 0.5, -0.5),
        Vec3::new(0.5, 0.5, 0.5),
        Vec3::new(-0.5, 0.5, 0.5),
    ];

    let indices = vec![
        0, 1, 1, 2, 2, 3, 3, 0, // bottom ring
        4, 5, 5, 6, 6, 7, 7, 4, // top ring
        0, 4, 1, 5, 2, 6, 3, 7, // verticals
    ];

    ShapeGeometry { positions, indices }
}

/// Create a solid cube of the given edge length, centered at the origin
pub fn cube(size: f32) -> ShapeGeometry {
    let h = size * 0.5;
    let positions = vec![
        Vec3::new(-h, -h, -h),
        Vec3::new(h, -h, -h),
        Vec3::new(h, -h, h),
        Vec3::new(-h, -h, h),
        Vec3::new(-h, h, -h),
        Vec3::new(h, h, -h),
        Vec3::new(h, h, h),
        Vec3::new(-h, h, h),
    ];

    let indices = vec![
        0, 1, 2, 2, 3, 0, // bottom
        4, 6, 5, 6, 4, 7, // top
        0, 4, 5, 5, 1, 0, // -z side
        1, 5, 6, 6, 2, 1, // +x side
        2, 6, 7, 7, 3, 2, // +z side
        3, 7, 4, 4, 0, 3, // -x side
    ];

    ShapeGeometry { positions, indices }
}

/// Create a capped cylinder along the Y axis
///
/// `height` is the full extent along Y (the shape spans ±height/2),
/// `diameter` the full width of the circular cross-section.
pub fn cylinder(height: f32, diameter: f32) -> ShapeGeometry {
    let radius = diameter * 0.5;
    let half = height * 0.5;
    let mut shape = ShapeGeometry::default();

    // Two rings of side vertices
    for &y in &[-half, half] {
        for i in 0..TESSELLATION {
            let angle = (i as f32) / (TESSELLATION as f32) * std::f32::consts::TAU;
            shape
                .positions
                .push(Vec3::new(radius * angle.cos(), y, radius * angle.sin()));
        }
    }

    // Side quads between the rings
    for i in 0..TESSELLATION {
        let next = (i + 1) % TESSELLATION;
        let (b0, b1) = (i as u16, next as u16);
        let (t0, t1) = (b0 + TESSELLATION as u16, b1 + TESSELLATION as u16);
        shape.indices.extend_from_slice(&[b0, t0, b1, b1, t0, t1]);
    }

    // Cap centers
    let bottom_center = shape.positions.len() as u16;
    shape.positions.push(Vec3::new(0.0, -half, 0.0));
    let top_center = shape.positions.len() as u16;
    shape.positions.push(Vec3::new(0.0, half, 0.0));

    for i in 0..TESSELLATION {
        let next = (i + 1) % TESSELLATION;
        shape
            .indices
            .extend_from_slice(&[bottom_center, i as u16, next as u16]);
        shape.indices.extend_from_slice(&[
            top_center,
            (TESSELLATION + next) as u16,
            (TESSELLATION + i) as u16,
        ]);
    }

    shape
}

/// Create a cone along the Y axis with its apex at +height/2
///
/// `diameter` is the full width of the base circle, `height` the distance
/// from base to apex; the shape is centered so it spans ±height/2.
pub fn cone(diameter: f32, height: f32) -> ShapeGeometry {
    let radius = diameter * 0.5;
    let half = height * 0.5;
    let mut shape = ShapeGeometry::default();

    for i in 0..TESSELLATION {
        let angle = (i as f32) / (TESSELLATION as f32) * std::f32::consts::TAU;
        shape
            .positions
            .push(Vec3::new(radius * angle.cos(), -half, radius * angle.sin()));
    }

    let apex = shape.positions.len() as u16;
    shape.positions.push(Vec3::new(0.0, half, 0.0));
    let base_center = shape.positions.len() as u16;
    shape.positions.push(Vec3::new(0.0, -half, 0.0));

    for i in 0..TESSELLATION {
        let next = (i + 1) % TESSELLATION;
        shape
            .indices
            .extend_from_slice(&[apex, next as u16, i as u16]);
        shape
            .indices
            .extend_from_slice(&[base_center, i as u16, next as u16]);
    }

    shape
}

/// Create a torus lying in the XZ plane around the Y axis
///
/// `diameter` is the full width across the ring, `thickness` the full width
/// of the tube.
pub fn torus(diameter: f32, thickness: f32) -> ShapeGeometry {
    let ring_radius = diameter * 0.5;
    let tube_radius = thickness * 0.5;
    let mut shape = ShapeGeometry::default();

    for i in 0..TESSELLATION {
        let ring_angle = (i as f32) / (TESSELLATION as f32) * std::f32::consts::TAU;
        let (sin_r, cos_r) = ring_angle.sin_cos();

        for j in 0..TESSELLATION {
            let tube_angle = (j as f32) / (TESSELLATION as f32) * std::f32::consts::TAU;
            let (sin_t, cos_t) = tube_angle.sin_cos();

            let r = ring_radius + tube_radius * cos_t;
            shape
                .positions
                .push(Vec3::new(r * cos_r, tube_radius * sin_t, r * sin_r));
        }
    }

    for i in 0..TESSELLATION {
        let next_ring = (i + 1) % TESSELLATION;
        for j in 0..TESSELLATION {
            let next_tube = (j + 1) % TESSELLATION;

            let a = (i * TESSELLATION + j) as u16;
            let b = (next_ring * TESSELLATION + j) as u16;
            let c = (next_ring * TESSELLATION + next_tube) as u16;
            let d = (i * TESSELLATION + next_tube) as u16;

            shape.indices.extend_from_slice(&[a, b, c, c, d, a]);
        }
    }

    shape
}

/// Create a latitude/longitude sphere centered at the origin
///
/// `diameter` is the full width; `tessellation` controls the number of
/// horizontal and vertical subdivisions (clamped to at least 3).
pub fn sphere(diameter: f32, tessellation: u32) -> ShapeGeometry {
    let radius = diameter * 0.5;
    let stacks = tessellation.max(3);
    let slices = tessellation.max(3);
    let mut shape = ShapeGeometry::default();

    for stack in 0..=stacks {
        let phi = (stack as f32) / (stacks as f32) * std::f32::consts::PI;
        let (sin_p, cos_p) = phi.sin_cos();

        for slice in 0..=slices {
            let theta = (slice as f32) / (slices as f32) * std::f32::consts::TAU;
            let (sin_t, cos_t) = theta.sin_cos();

            shape.positions.push(Vec3::new(
                radius * sin_p * cos_t,
                radius * cos_p,
                radius * sin_p * sin_t,
            ));
        }
    }

    let row = slices + 1;
    for stack in 0..stacks {
        for slice in 0..slices {
            let a = (stack * row + slice) as u16;
            let b = a + 1;
            let c = ((stack + 1) * row + slice) as u16;
            let d = c + 1;

            shape.indices.extend_from_slice(&[a, c, b, b, c, d]);
        }
    }

    shape
}
