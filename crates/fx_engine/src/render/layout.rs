//! Vertex input layout derivation and geometry packing
//!
//! A shader pass declares its vertex inputs as a signature: a list of
//! semantics with register masks, in declaration order. The layout derived
//! here determines both the byte layout consumers must write into vertex
//! buffers and the cumulative per-vertex stride, so the derivation has to be
//! deterministic: the same signature always yields the same layout.
//!
//! [`VertexLayout::pack`] interleaves a [`Mesh`]'s attribute arrays to match
//! the derived layout, substituting defaults for attributes the mesh lacks.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::render::mesh::Mesh;

/// Errors produced while deriving a vertex layout from a shader signature
#[derive(Debug, Error)]
pub enum LayoutError {
    /// The signature names a semantic the engine does not recognize
    #[error("unknown vertex semantic: {0}")]
    UnknownSemantic(String),

    /// The register mask is not one of the contiguous component masks
    #[error("unsupported register mask {mask:#x} for semantic {semantic}")]
    UnsupportedMask {
        /// Offending mask value
        mask: u8,
        /// Semantic the mask was declared for
        semantic: String,
    },
}

/// Vertex attribute semantics understood by the geometry packer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VertexSemantic {
    /// Object-space position
    Position,
    /// Surface normal
    Normal,
    /// Texture coordinates
    TexCoord,
    /// Per-vertex color
    Color,
    /// Tangent vector
    Tangent,
    /// Binormal (bitangent) vector
    Binormal,
}

impl VertexSemantic {
    /// Parse a semantic from its shader signature name (case-insensitive)
    pub fn parse(name: &str) -> Option<Self> {
        match name.to_ascii_uppercase().as_str() {
            "POSITION" => Some(Self::Position),
            "NORMAL" => Some(Self::Normal),
            "TEXCOORD" => Some(Self::TexCoord),
            "COLOR" => Some(Self::Color),
            "TANGENT" => Some(Self::Tangent),
            "BINORMAL" => Some(Self::Binormal),
            _ => None,
        }
    }

    /// The semantic's canonical signature name
    pub fn name(&self) -> &'static str {
        match self {
            Self::Position => "POSITION",
            Self::Normal => "NORMAL",
            Self::TexCoord => "TEXCOORD",
            Self::Color => "COLOR",
            Self::Tangent => "TANGENT",
            Self::Binormal => "BINORMAL",
        }
    }
}

/// One element of a vertex shader's input signature, as reflected from the
/// compiled program
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignatureElement {
    /// Semantic name, e.g. "POSITION"
    pub semantic: String,
    /// Semantic index for repeated semantics (TEXCOORD1, ...)
    #[serde(default)]
    pub semantic_index: u32,
    /// Register component mask: 0x1, 0x3, 0x7, or 0xF
    pub mask: u8,
}

/// One attribute slot in a derived vertex layout
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayoutElement {
    /// Attribute semantic
    pub semantic: VertexSemantic,
    /// Semantic index
    pub semantic_index: u32,
    /// Number of 32-bit components (1..=4)
    pub components: u32,
    /// Byte offset of this attribute within a vertex
    pub offset: u32,
}

/// A derived vertex input layout: ordered attribute slots plus total stride
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct VertexLayout {
    elements: Vec<LayoutElement>,
    stride: u32,
}

impl VertexLayout {
    /// Derive a layout from a vertex-stage input signature
    ///
    /// Elements are laid out in declaration order with four bytes per
    /// component and no padding between attributes; the stride is the sum of
    /// all element sizes. The mapping is purely a function of the signature.
    pub fn from_signature(signature: &[SignatureElement]) -> Result<Self, LayoutError> {
        let mut elements = Vec::with_capacity(signature.len());
        let mut offset = 0u32;

        for entry in signature {
            let semantic = VertexSemantic::parse(&entry.semantic)
                .ok_or_else(|| LayoutError::UnknownSemantic(entry.semantic.clone()))?;

            let components = match entry.mask & 0xF {
                0x1 => 1,
                0x3 => 2,
                0x7 => 3,
                0xF => 4,
                _ => {
                    return Err(LayoutError::UnsupportedMask {
                        mask: entry.mask,
                        semantic: entry.semantic.clone(),
                    })
                }
            };

            elements.push(LayoutElement {
                semantic,
                semantic_index: entry.semantic_index,
                components,
                offset,
            });
            offset += components * 4;
        }

        Ok(Self {
            elements,
            stride: offset,
        })
    }

    /// The ordered attribute slots
    pub fn elements(&self) -> &[LayoutElement] {
        &self.elements
    }

    /// Per-vertex byte stride
    pub fn stride(&self) -> u32 {
        self.stride
    }

    /// Interleave a mesh's attribute arrays to match this layout
    ///
    /// Attributes the mesh does not carry are filled with defaults: positions
    /// pad their fourth component with 1.0, texture coordinates default to
    /// the texel center (0.5, 0.5), colors default to opaque white, and the
    /// vector attributes (normal, tangent, binormal) default to zero. Extra
    /// components beyond an attribute's natural width are zero-padded.
    pub fn pack(&self, mesh: &Mesh) -> Vec<f32> {
        let vertex_count = mesh.vertex_count();
        let floats_per_vertex = (self.stride / 4) as usize;
        let mut data = Vec::with_capacity(vertex_count * floats_per_vertex);

        for i in 0..vertex_count {
            for element in &self.elements {
                match element.semantic {
                    VertexSemantic::Position => {
                        let p = mesh.positions[i];
                        data.extend_from_slice(&[p.x, p.y, p.z]);
                        if element.components > 3 {
                            data.push(1.0);
                        }
                    }
                    VertexSemantic::Color => {
                        if let Some(c) = mesh.colors.get(i) {
                            data.extend_from_slice(&[c.x, c.y, c.z, c.w]);
                        } else {
                            data.extend_from_slice(&[1.0, 1.0, 1.0, 1.0]);
                        }
                    }
                    VertexSemantic::TexCoord => {
                        if let Some(uv) = mesh.tex_coords.get(i) {
                            data.extend_from_slice(&[uv.x, uv.y]);
                        } else {
                            data.extend_from_slice(&[0.5, 0.5]);
                        }
                        for _ in 2..element.components {
                            data.push(0.0);
                        }
                    }
                    VertexSemantic::Normal => {
                        Self::push_vec3_or_zero(&mut data, mesh.normals.get(i), element.components);
                    }
                    VertexSemantic::Tangent => {
                        Self::push_vec3_or_zero(&mut data, mesh.tangents.get(i), element.components);
                    }
                    VertexSemantic::Binormal => {
                        Self::push_vec3_or_zero(&mut data, mesh.binormals.get(i), element.components);
                    }
                }
            }
        }

        data
    }

    fn push_vec3_or_zero(
        data: &mut Vec<f32>,
        value: Option<&crate::foundation::math::Vec3>,
        components: u32,
    ) {
        if let Some(v) = value {
            data.extend_from_slice(&[v.x, v.y, v.z]);
        } else {
            data.extend_from_slice(&[0.0, 0.0, 0.0]);
        }
        if components > 3 {
            data.push(0.0);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::{Vec2, Vec3};

    fn signature(entries: &[(&str, u8)]) -> Vec<SignatureElement> {
        entries
            .iter()
            .map(|(name, mask)| SignatureElement {
                semantic: (*name).to_string(),
                semantic_index: 0,
                mask: *mask,
            })
            .collect()
    }

    #[test]
    fn test_layout_derivation_is_deterministic() {
        let sig = signature(&[("POSITION", 0x7), ("NORMAL", 0x7), ("TEXCOORD", 0x3)]);

        let a = VertexLayout::from_signature(&sig).unwrap();
        let b = VertexLayout::from_signature(&sig).unwrap();

        assert_eq!(a, b, "Repeated derivation must yield identical layouts");
        assert_eq!(a.stride(), 32, "3 + 3 + 2 floats = 32 bytes");
    }

    #[test]
    fn test_layout_offsets_follow_declaration_order() {
        let sig = signature(&[("POSITION", 0xF), ("COLOR", 0xF), ("TEXCOORD", 0x3)]);
        let layout = VertexLayout::from_signature(&sig).unwrap();

        let offsets: Vec<u32> = layout.elements().iter().map(|e| e.offset).collect();
        assert_eq!(offsets, vec![0, 16, 32]);
        assert_eq!(layout.stride(), 40);
    }

    #[test]
    fn test_mask_to_component_count() {
        let sig = signature(&[("POSITION", 0x1), ("NORMAL", 0x3), ("TEXCOORD", 0x7), ("COLOR", 0xF)]);
        let layout = VertexLayout::from_signature(&sig).unwrap();

        let components: Vec<u32> = layout.elements().iter().map(|e| e.components).collect();
        assert_eq!(components, vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_unknown_semantic_is_rejected() {
        let sig = signature(&[("BLENDWEIGHT", 0x7)]);
        assert!(matches!(
            VertexLayout::from_signature(&sig),
            Err(LayoutError::UnknownSemantic(_))
        ));
    }

    #[test]
    fn test_non_contiguous_mask_is_rejected() {
        let sig = signature(&[("POSITION", 0x5)]);
        assert!(matches!(
            VertexLayout::from_signature(&sig),
            Err(LayoutError::UnsupportedMask { .. })
        ));
    }

    #[test]
    fn test_pack_position_w_pad() {
        let mut mesh = Mesh::new("tri");
        mesh.positions = vec![Vec3::new(1.0, 2.0, 3.0)];

        let layout =
            VertexLayout::from_signature(&signature(&[("POSITION", 0xF)])).unwrap();
        let packed = layout.pack(&mesh);

        assert_eq!(packed, vec![1.0, 2.0, 3.0, 1.0], "4-wide POSITION pads w with 1.0");
    }

    #[test]
    fn test_pack_defaults_for_missing_attributes() {
        let mut mesh = Mesh::new("bare");
        mesh.positions = vec![Vec3::zeros()];

        let layout = VertexLayout::from_signature(&signature(&[
            ("POSITION", 0x7),
            ("NORMAL", 0x7),
            ("TEXCOORD", 0x3),
            ("COLOR", 0xF),
        ]))
        .unwrap();
        let packed = layout.pack(&mesh);

        assert_eq!(
            packed,
            vec![
                0.0, 0.0, 0.0, // position
                0.0, 0.0, 0.0, // default normal
                0.5, 0.5, // default UV at texel center
                1.0, 1.0, 1.0, 1.0, // default opaque white
            ]
        );
    }

    #[test]
    fn test_pack_interleaves_real_attributes() {
        let mut mesh = Mesh::new("quad");
        mesh.positions = vec![Vec3::new(1.0, 0.0, 0.0), Vec3::new(0.0, 1.0, 0.0)];
        mesh.normals = vec![Vec3::new(0.0, 0.0, 1.0); 2];
        mesh.tex_coords = vec![Vec2::new(0.0, 0.0), Vec2::new(1.0, 1.0)];

        let layout = VertexLayout::from_signature(&signature(&[
            ("POSITION", 0x7),
            ("NORMAL", 0x7),
            ("TEXCOORD", 0x3),
        ]))
        .unwrap();
        let packed = layout.pack(&mesh);

        assert_eq!(packed.len(), 2 * 8);
        assert_eq!(&packed[0..8], &[1.0, 0.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0]);
        assert_eq!(&packed[8..16], &[0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 1.0, 1.0]);
    }
}
