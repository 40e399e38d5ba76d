//! Mesh representation for 3D geometry
//!
//! A [`Mesh`] stores its attributes as parallel arrays keyed by vertex index.
//! The effect layer interleaves these into whatever layout a shader pass
//! declares (see [`crate::render::layout`]), so the container itself stays
//! backend-agnostic: attribute arrays may be empty and the packer substitutes
//! documented defaults.

use crate::foundation::math::{Aabb, Vec2, Vec3, Vec4};

/// 3D mesh containing attribute arrays and triangle indices
///
/// Positions are mandatory for a renderable mesh; every other attribute array
/// is either empty or exactly `positions.len()` long.
#[derive(Debug, Clone, Default)]
pub struct Mesh {
    /// Mesh name for diagnostics
    pub name: String,
    /// Vertex positions
    pub positions: Vec<Vec3>,
    /// Vertex normals (empty if the source had none)
    pub normals: Vec<Vec3>,
    /// Tangent vectors for normal mapping
    pub tangents: Vec<Vec3>,
    /// Binormal (bitangent) vectors
    pub binormals: Vec<Vec3>,
    /// Texture coordinates, first UV set
    pub tex_coords: Vec<Vec2>,
    /// Per-vertex colors
    pub colors: Vec<Vec4>,
    /// Triangle indices
    pub indices: Vec<u32>,
}

impl Mesh {
    /// Create an empty mesh with the given name
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Number of vertices in the mesh
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    /// Compute the axis-aligned bounding box of the positions
    pub fn compute_bounds(&self) -> Aabb {
        Aabb::from_points(self.positions.iter())
    }

    /// Create a unit cube centered at the origin
    ///
    /// 8 vertices with outward normals and corner UVs, 36 indices. Used by
    /// tests and as a placeholder renderable.
    pub fn cube() -> Self {
        let positions = vec![
            Vec3::new(-1.0, -1.0, 1.0),
            Vec3::new(1.0, -1.0, 1.0),
            Vec3::new(1.0, 1.0, 1.0),
            Vec3::new(-1.0, 1.0, 1.0),
            Vec3::new(-1.0, -1.0, -1.0),
            Vec3::new(-1.0, 1.0, -1.0),
            Vec3::new(1.0, 1.0, -1.0),
            Vec3::new(1.0, -1.0, -1.0),
        ];
        let normals = positions.iter().map(|p| p.normalize()).collect();
        let tex_coords = vec![
            Vec2::new(0.0, 0.0),
            Vec2::new(1.0, 0.0),
            Vec2::new(1.0, 1.0),
            Vec2::new(0.0, 1.0),
            Vec2::new(1.0, 0.0),
            Vec2::new(1.0, 1.0),
            Vec2::new(0.0, 1.0),
            Vec2::new(0.0, 0.0),
        ];

        let indices = vec![
            0, 1, 2, 2, 3, 0, // front
            4, 5, 6, 6, 7, 4, // back
            4, 0, 3, 3, 5, 4, // left
            1, 7, 6, 6, 2, 1, // right
            3, 2, 6, 6, 5, 3, // top
            4, 7, 1, 1, 0, 4, // bottom
        ];

        Self {
            name: "Cube".to_string(),
            positions,
            normals,
            tex_coords,
            indices,
            ..Default::default()
        }
    }
}
