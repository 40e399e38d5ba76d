//! Effect reflection layer
//!
//! An [`Effect`] is a loaded, reflectable shader program: it owns a set of
//! named [`Technique`]s (each an ordered list of [`Pass`]es) and a set of
//! named [`Variable`]s (bindable shader parameters). All of this structure is
//! enumerated exactly once at construction from an [`EffectDesc`], the
//! deserialized reflection data of the compiled program, so lookups during
//! rendering are plain map hits.
//!
//! Variable writes are type-checked against the variable's declared kind.
//! A mismatch is an authoring bug in the shader or the engine code binding
//! it, not a runtime condition: it logs and panics rather than silently
//! corrupting state. Name lookups return `Option`; call sites that cannot
//! proceed without the binding use the `expect_*` variants, which apply the
//! same fatal policy.

mod export;

use std::collections::HashMap;
use std::sync::{Mutex, RwLock};

use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::foundation::math::{Mat4, Vec4};
use crate::render::device::{BufferHandle, PrimitiveTopology, RenderDevice, ResourceHandle};
use crate::render::layout::{LayoutError, SignatureElement, VertexLayout};
use crate::render::mesh::Mesh;

/// Errors produced while constructing an effect from its description
#[derive(Debug, Error)]
pub enum EffectError {
    /// A pass declared an invalid vertex input signature
    #[error(transparent)]
    Layout(#[from] LayoutError),

    /// A vector variable declared an out-of-range column count
    #[error("variable '{variable}': vector columns must be 2..=4, got {columns}")]
    InvalidColumns {
        /// Variable name
        variable: String,
        /// Declared column count
        columns: u32,
    },
}

bitflags! {
    /// Optional shader stages a pass binds beyond vertex and pixel
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
    pub struct ShaderStages: u32 {
        /// Geometry shader present
        const GEOMETRY = 1 << 0;
        /// Hull (tessellation control) shader present
        const HULL = 1 << 1;
        /// Domain (tessellation evaluation) shader present
        const DOMAIN = 1 << 2;
    }
}

// ============================================================================
// Reflection descriptions (deserialized from RON by the resource cache)
// ============================================================================

/// Reflected description of a compiled shader program
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EffectDesc {
    /// Effect name, used as the resource-cache key
    pub name: String,
    /// Path of the source the program was compiled from
    #[serde(default)]
    pub source_path: String,
    /// Techniques in declaration order
    pub techniques: Vec<TechniqueDesc>,
    /// Global variables in declaration order
    #[serde(default)]
    pub variables: Vec<VariableDesc>,
}

/// Reflected description of one technique
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TechniqueDesc {
    /// Technique name
    pub name: String,
    /// Passes in declaration order
    pub passes: Vec<PassDesc>,
}

/// Reflected description of one pass
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PassDesc {
    /// Pass name
    pub name: String,
    /// Vertex-stage input signature in declaration order
    #[serde(default)]
    pub vertex_signature: Vec<SignatureElement>,
    /// Whether the pass binds a geometry shader
    #[serde(default)]
    pub has_geometry_shader: bool,
    /// Whether the pass binds a hull shader
    #[serde(default)]
    pub has_hull_shader: bool,
    /// Whether the pass binds a domain shader
    #[serde(default)]
    pub has_domain_shader: bool,
    /// Semantics of the hull shader's patch-constant signature
    #[serde(default)]
    pub patch_constant_signature: Vec<String>,
}

/// Reflected description of one global variable
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VariableDesc {
    /// Variable name
    pub name: String,
    /// Optional shader semantic
    #[serde(default)]
    pub semantic: Option<String>,
    /// Type name as declared in the shader, e.g. "float4x4"
    #[serde(default)]
    pub type_name: String,
    /// Column count for vector variables (defaults to 4)
    #[serde(default)]
    pub columns: Option<u32>,
    /// Initial value; its variant fixes the variable's kind
    pub value: VariableValue,
    /// Shader annotations attached to the variable
    #[serde(default)]
    pub annotations: Vec<AnnotationDesc>,
}

/// Reflected description of one annotation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnnotationDesc {
    /// Annotation name
    pub name: String,
    /// Annotation value
    pub value: AnnotationValue,
}

/// The value of a shader annotation (strings and floats, per the reflection API)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum AnnotationValue {
    /// String annotation
    String(String),
    /// Float annotation
    Float(f32),
}

// ============================================================================
// Variable values and kinds
// ============================================================================

/// Fixed-function state objects an effect variable may reference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StateObjectKind {
    /// Rasterizer state block
    Rasterizer,
    /// Blend state block
    Blend,
    /// Depth-stencil state block
    DepthStencil,
}

/// Closed tagged union of every representation a shader variable can take
///
/// The variant stored at construction fixes the variable's [`VariableKind`];
/// setters only replace the value within the same kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum VariableValue {
    /// Scalar float
    Float(f32),
    /// Scalar int
    Int(i32),
    /// Scalar float array
    FloatArray(Vec<f32>),
    /// Vector (stored 4-wide; the variable's column count bounds the live part)
    Vector([f32; 4]),
    /// Array of vectors
    VectorArray(Vec<[f32; 4]>),
    /// 4x4 matrix in row-major element order
    Matrix([[f32; 4]; 4]),
    /// Array of 4x4 matrices
    MatrixArray(Vec<[[f32; 4]; 4]>),
    /// Shader resource view handle (texture, cube map)
    Resource(Option<ResourceHandle>),
    /// Opaque fixed-function state object
    StateObject(StateObjectKind),
}

/// The declared representation class of a variable
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VariableKind {
    /// Float/int scalars and scalar arrays
    Scalar,
    /// 2- to 4-component vectors and vector arrays
    Vector,
    /// 4x4 matrices and matrix arrays
    Matrix,
    /// Shader resource views
    Resource,
    /// Fixed-function state objects
    StateObject,
}

impl VariableValue {
    /// The representation class of this value
    pub fn kind(&self) -> VariableKind {
        match self {
            Self::Float(_) | Self::Int(_) | Self::FloatArray(_) => VariableKind::Scalar,
            Self::Vector(_) | Self::VectorArray(_) => VariableKind::Vector,
            Self::Matrix(_) | Self::MatrixArray(_) => VariableKind::Matrix,
            Self::Resource(_) => VariableKind::Resource,
            Self::StateObject(_) => VariableKind::StateObject,
        }
    }
}

fn mat_to_rows(m: &Mat4) -> [[f32; 4]; 4] {
    let mut rows = [[0.0f32; 4]; 4];
    for (i, row) in rows.iter_mut().enumerate() {
        for (j, cell) in row.iter_mut().enumerate() {
            *cell = m[(i, j)];
        }
    }
    rows
}

// ============================================================================
// Variable
// ============================================================================

/// A shader annotation: a name/value pair attached to a variable
#[derive(Debug, Clone)]
pub struct Annotation {
    name: String,
    value: String,
}

impl Annotation {
    fn from_desc(desc: &AnnotationDesc) -> Self {
        let value = match &desc.value {
            AnnotationValue::String(s) => s.clone(),
            AnnotationValue::Float(f) => f.to_string(),
        };
        Self {
            name: desc.name.to_lowercase(),
            value,
        }
    }

    /// Annotation name (lowercased at construction)
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Annotation value as text
    pub fn value(&self) -> &str {
        &self.value
    }
}

/// A named, typed shader parameter
///
/// The value is interior-mutable: variables are written every frame through a
/// shared effect while the structure around them stays immutable.
#[derive(Debug)]
pub struct Variable {
    name: String,
    semantic: Option<String>,
    type_name: String,
    kind: VariableKind,
    columns: u32,
    annotations: Vec<Annotation>,
    value: RwLock<VariableValue>,
}

impl Variable {
    fn from_desc(desc: VariableDesc) -> Result<Self, EffectError> {
        let kind = desc.value.kind();

        let columns = match kind {
            VariableKind::Vector => {
                let columns = desc.columns.unwrap_or(4);
                if !(2..=4).contains(&columns) {
                    return Err(EffectError::InvalidColumns {
                        variable: desc.name,
                        columns,
                    });
                }
                columns
            }
            _ => 0,
        };

        Ok(Self {
            name: desc.name,
            semantic: desc.semantic.map(|s| s.to_lowercase()),
            type_name: desc.type_name,
            kind,
            columns,
            annotations: desc.annotations.iter().map(Annotation::from_desc).collect(),
            value: RwLock::new(desc.value),
        })
    }

    /// Variable name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Shader semantic, lowercased, if declared
    pub fn semantic(&self) -> Option<&str> {
        self.semantic.as_deref()
    }

    /// Type name as declared in the shader
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// The variable's representation class
    pub fn kind(&self) -> VariableKind {
        self.kind
    }

    /// Column count for vector variables (0 otherwise)
    pub fn columns(&self) -> u32 {
        self.columns
    }

    /// Annotations attached to the variable
    pub fn annotations(&self) -> &[Annotation] {
        &self.annotations
    }

    /// Snapshot of the current value
    pub fn value(&self) -> VariableValue {
        self.value.read().unwrap().clone()
    }

    /// Format the current value as text for export and debugging
    ///
    /// Scalars and vectors print their components space-separated; matrices
    /// print all 16 elements in row-major order; resources and state objects
    /// have no textual value.
    pub fn value_string(&self) -> String {
        fn join(values: impl IntoIterator<Item = String>) -> String {
            values.into_iter().collect::<Vec<_>>().join(" ")
        }

        match &*self.value.read().unwrap() {
            VariableValue::Float(v) => v.to_string(),
            VariableValue::Int(v) => v.to_string(),
            VariableValue::FloatArray(values) => join(values.iter().map(f32::to_string)),
            VariableValue::Vector(v) => {
                join(v[..self.columns as usize].iter().map(f32::to_string))
            }
            VariableValue::VectorArray(vectors) => join(
                vectors
                    .iter()
                    .flat_map(|v| v[..self.columns as usize].iter())
                    .map(f32::to_string),
            ),
            VariableValue::Matrix(rows) => {
                join(rows.iter().flatten().map(f32::to_string))
            }
            VariableValue::MatrixArray(matrices) => join(
                matrices
                    .iter()
                    .flat_map(|rows| rows.iter().flatten())
                    .map(f32::to_string),
            ),
            VariableValue::Resource(_) | VariableValue::StateObject(_) => String::new(),
        }
    }

    fn expect_kind(&self, expected: VariableKind, op: &str) {
        if self.kind != expected {
            log::error!(
                "invalid {} on effect variable '{}': declared kind is {:?}",
                op,
                self.name,
                self.kind
            );
            panic!("invalid {} on effect variable '{}'", op, self.name);
        }
    }

    fn store(&self, value: VariableValue) {
        *self.value.write().unwrap() = value;
    }

    /// Write a scalar float; fatal if the variable is not scalar
    pub fn set_float(&self, value: f32) {
        self.expect_kind(VariableKind::Scalar, "set_float");
        self.store(VariableValue::Float(value));
    }

    /// Write a scalar float array; fatal if the variable is not scalar
    pub fn set_float_array(&self, values: &[f32]) {
        self.expect_kind(VariableKind::Scalar, "set_float_array");
        self.store(VariableValue::FloatArray(values.to_vec()));
    }

    /// Write a scalar int; fatal if the variable is not scalar
    pub fn set_int(&self, value: i32) {
        self.expect_kind(VariableKind::Scalar, "set_int");
        self.store(VariableValue::Int(value));
    }

    /// Write a vector; fatal if the variable is not a vector
    pub fn set_vector(&self, value: Vec4) {
        self.expect_kind(VariableKind::Vector, "set_vector");
        self.store(VariableValue::Vector([value.x, value.y, value.z, value.w]));
    }

    /// Write a vector array; fatal if the variable is not a vector
    pub fn set_vector_array(&self, values: &[Vec4]) {
        self.expect_kind(VariableKind::Vector, "set_vector_array");
        self.store(VariableValue::VectorArray(
            values.iter().map(|v| [v.x, v.y, v.z, v.w]).collect(),
        ));
    }

    /// Write a matrix; fatal if the variable is not a matrix
    pub fn set_matrix(&self, value: &Mat4) {
        self.expect_kind(VariableKind::Matrix, "set_matrix");
        self.store(VariableValue::Matrix(mat_to_rows(value)));
    }

    /// Write a matrix array; fatal if the variable is not a matrix
    pub fn set_matrix_array(&self, values: &[Mat4]) {
        self.expect_kind(VariableKind::Matrix, "set_matrix_array");
        self.store(VariableValue::MatrixArray(
            values.iter().map(mat_to_rows).collect(),
        ));
    }

    /// Write a shader resource view; fatal if the variable is not a resource
    pub fn set_resource(&self, value: Option<ResourceHandle>) {
        self.expect_kind(VariableKind::Resource, "set_resource");
        self.store(VariableValue::Resource(value));
    }
}

// ============================================================================
// Pass and Technique
// ============================================================================

/// One concrete pipeline-state-and-shader-binding step of a technique
///
/// The pass derives its vertex input layout and per-vertex stride from the
/// vertex-stage input signature at construction; the derivation is a pure
/// function of the signature (see [`VertexLayout::from_signature`]).
#[derive(Debug, Clone)]
pub struct Pass {
    name: String,
    layout: VertexLayout,
    stages: ShaderStages,
    tess_primitive: u32,
}

impl Pass {
    fn from_desc(desc: &PassDesc) -> Result<Self, EffectError> {
        let layout = VertexLayout::from_signature(&desc.vertex_signature)?;

        let mut stages = ShaderStages::empty();
        if desc.has_geometry_shader {
            stages |= ShaderStages::GEOMETRY;
        }
        if desc.has_hull_shader {
            stages |= ShaderStages::HULL;
        }
        if desc.has_domain_shader {
            stages |= ShaderStages::DOMAIN;
        }

        let tess_primitive = desc
            .patch_constant_signature
            .iter()
            .filter(|semantic| semantic.eq_ignore_ascii_case("SV_TessFactor"))
            .count() as u32;

        Ok(Self {
            name: desc.name.clone(),
            layout,
            stages,
            tess_primitive,
        })
    }

    /// Pass name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The derived vertex input layout
    pub fn layout(&self) -> &VertexLayout {
        &self.layout
    }

    /// Per-vertex byte stride of the derived layout
    pub fn vertex_stride(&self) -> u32 {
        self.layout.stride()
    }

    /// Optional shader stages the pass binds
    pub fn stages(&self) -> ShaderStages {
        self.stages
    }

    /// Whether the pass binds a geometry shader
    pub fn has_geometry_shader(&self) -> bool {
        self.stages.contains(ShaderStages::GEOMETRY)
    }

    /// Whether the pass binds a hull shader
    pub fn has_hull_shader(&self) -> bool {
        self.stages.contains(ShaderStages::HULL)
    }

    /// Whether the pass binds a domain shader
    pub fn has_domain_shader(&self) -> bool {
        self.stages.contains(ShaderStages::DOMAIN)
    }

    /// Tessellation primitive size derived from SV_TessFactor entries
    pub fn tess_primitive(&self) -> u32 {
        self.tess_primitive
    }

    /// Create an immutable vertex buffer from raw bytes
    ///
    /// Device failure is logged and yields `None`; the caller keeps the empty
    /// handle and skips dependent draws.
    pub fn create_vertex_buffer(
        &self,
        device: &mut dyn RenderDevice,
        data: &[u8],
    ) -> Option<BufferHandle> {
        match device.create_vertex_buffer(data) {
            Ok(handle) => Some(handle),
            Err(e) => {
                log::error!("vertex buffer creation failed for pass '{}': {}", self.name, e);
                None
            }
        }
    }

    /// Create an immutable index buffer from raw bytes
    pub fn create_index_buffer(
        &self,
        device: &mut dyn RenderDevice,
        data: &[u8],
    ) -> Option<BufferHandle> {
        match device.create_index_buffer(data) {
            Ok(handle) => Some(handle),
            Err(e) => {
                log::error!("index buffer creation failed for pass '{}': {}", self.name, e);
                None
            }
        }
    }

    /// Pack a mesh according to this pass's layout and upload it
    pub fn create_mesh_vertex_buffer(
        &self,
        device: &mut dyn RenderDevice,
        mesh: &Mesh,
    ) -> Option<BufferHandle> {
        let packed = self.layout.pack(mesh);
        self.create_vertex_buffer(device, bytemuck::cast_slice(&packed))
    }

    /// Bind this pass's pipeline state: topology and input layout
    pub fn apply(&self, device: &mut dyn RenderDevice, topology: PrimitiveTopology) {
        device.set_topology(topology);
        device.set_input_layout(&self.layout);
    }
}

/// A named rendering strategy: an ordered sequence of passes
#[derive(Debug, Clone)]
pub struct Technique {
    name: String,
    passes: Vec<Pass>,
    passes_by_name: HashMap<String, usize>,
}

impl Technique {
    fn from_desc(desc: &TechniqueDesc) -> Result<Self, EffectError> {
        let mut passes = Vec::with_capacity(desc.passes.len());
        let mut passes_by_name = HashMap::new();

        for pass_desc in &desc.passes {
            passes_by_name.insert(pass_desc.name.clone(), passes.len());
            passes.push(Pass::from_desc(pass_desc)?);
        }

        Ok(Self {
            name: desc.name.clone(),
            passes,
            passes_by_name,
        })
    }

    /// Technique name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Passes in declaration order
    pub fn passes(&self) -> &[Pass] {
        &self.passes
    }

    /// Exact-name pass lookup
    pub fn pass_by_name(&self, name: &str) -> Option<&Pass> {
        self.passes_by_name.get(name).map(|&i| &self.passes[i])
    }

    /// Exact-name pass lookup that treats absence as a fatal configuration error
    pub fn expect_pass(&self, name: &str) -> &Pass {
        self.pass_by_name(name).unwrap_or_else(|| {
            log::error!("pass does not exist: {}.{}", self.name, name);
            panic!("pass does not exist: {}.{}", self.name, name);
        })
    }
}

// ============================================================================
// Effect
// ============================================================================

/// An immutable, loaded shader program exposing techniques and variables
///
/// Structure never changes after construction; only variable values are
/// written per frame. Effects are shared between nodes through the resource
/// cache, so they are `Send + Sync`.
#[derive(Debug)]
pub struct Effect {
    name: String,
    source_path: String,
    techniques: Vec<Technique>,
    techniques_by_name: HashMap<String, usize>,
    variables: Vec<Variable>,
    variables_by_name: HashMap<String, usize>,
    pub(crate) xml_cache: Mutex<Option<String>>,
}

impl Effect {
    /// Construct an effect by enumerating a reflected program description
    ///
    /// All techniques, passes, and variables are discovered here; there is no
    /// lazy introspection afterwards.
    pub fn from_desc(desc: EffectDesc) -> Result<Self, EffectError> {
        let mut techniques = Vec::with_capacity(desc.techniques.len());
        let mut techniques_by_name = HashMap::new();
        for technique_desc in &desc.techniques {
            techniques_by_name.insert(technique_desc.name.clone(), techniques.len());
            techniques.push(Technique::from_desc(technique_desc)?);
        }

        let mut variables = Vec::with_capacity(desc.variables.len());
        let mut variables_by_name = HashMap::new();
        for variable_desc in desc.variables {
            variables_by_name.insert(variable_desc.name.clone(), variables.len());
            variables.push(Variable::from_desc(variable_desc)?);
        }

        Ok(Self {
            name: desc.name,
            source_path: desc.source_path,
            techniques,
            techniques_by_name,
            variables,
            variables_by_name,
            xml_cache: Mutex::new(None),
        })
    }

    /// Effect name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Path of the source the program was compiled from
    pub fn source_path(&self) -> &str {
        &self.source_path
    }

    /// Techniques in declaration order; the first is the default
    pub fn techniques(&self) -> &[Technique] {
        &self.techniques
    }

    /// Variables in declaration order
    pub fn variables(&self) -> &[Variable] {
        &self.variables
    }

    /// Exact-name technique lookup
    pub fn technique_by_name(&self, name: &str) -> Option<&Technique> {
        self.techniques_by_name.get(name).map(|&i| &self.techniques[i])
    }

    /// Exact-name variable lookup
    pub fn variable_by_name(&self, name: &str) -> Option<&Variable> {
        self.variables_by_name.get(name).map(|&i| &self.variables[i])
    }

    /// Technique lookup that treats absence as a fatal configuration error
    ///
    /// A missing technique means the material references a strategy the
    /// shader does not define: an authoring mismatch, not a runtime state.
    pub fn expect_technique(&self, name: &str) -> &Technique {
        self.technique_by_name(name).unwrap_or_else(|| {
            log::error!("technique does not exist: {}:{}", self.name, name);
            panic!("technique does not exist: {}:{}", self.name, name);
        })
    }

    /// Variable lookup that treats absence as a fatal configuration error
    pub fn expect_variable(&self, name: &str) -> &Variable {
        self.variable_by_name(name).unwrap_or_else(|| {
            log::error!("variable does not exist: {}:{}", self.name, name);
            panic!("variable does not exist: {}:{}", self.name, name);
        })
    }
}
