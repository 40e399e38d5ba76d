//! Rendering device abstraction
//!
//! The engine core never talks to a concrete graphics API. Nodes and passes
//! issue buffer-creation, pipeline-setup, and draw calls against the
//! [`RenderDevice`] trait; the host supplies a backend implementation.
//!
//! Resources are identified by opaque handles into device-owned tables, so a
//! node can drop or rebuild its buffers without touching backend objects
//! directly. A node that failed to acquire a buffer simply holds `None` and
//! skips its draws.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::render::layout::VertexLayout;

/// Result type for device operations
pub type DeviceResult<T> = Result<T, DeviceError>;

/// Handle to a buffer resource stored in the device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BufferHandle(pub u64);

/// Handle to a shader-resource view (texture, cube map) owned by the host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResourceHandle(pub u64);

/// Primitive topology for input assembly
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrimitiveTopology {
    /// Independent triangles
    TriangleList,
    /// Independent line segments
    LineList,
}

impl Default for PrimitiveTopology {
    fn default() -> Self {
        Self::TriangleList
    }
}

/// Index element format for index buffer binding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexFormat {
    /// 16-bit indices
    Uint16,
    /// 32-bit indices
    Uint32,
}

/// Errors reported by device operations
#[derive(Debug, Error)]
pub enum DeviceError {
    /// Buffer creation failed (out of memory, device lost, ...)
    #[error("buffer creation failed: {0}")]
    BufferCreation(String),

    /// An operation referenced a handle the device does not know
    #[error("unknown buffer handle: {0:?}")]
    UnknownBuffer(BufferHandle),
}

/// Graphics device abstraction consumed by the scene graph and effect layer
///
/// Implementations own the actual GPU objects; the core only sees handles.
/// All calls are issued from the single update/render thread.
pub trait RenderDevice {
    /// Create an immutable vertex buffer from raw bytes
    fn create_vertex_buffer(&mut self, data: &[u8]) -> DeviceResult<BufferHandle>;

    /// Create an immutable index buffer from raw bytes
    fn create_index_buffer(&mut self, data: &[u8]) -> DeviceResult<BufferHandle>;

    /// Release a buffer previously created by this device
    ///
    /// Releasing an unknown or already-released handle is a no-op.
    fn destroy_buffer(&mut self, handle: BufferHandle);

    /// Set the primitive topology for subsequent draws
    fn set_topology(&mut self, topology: PrimitiveTopology);

    /// Set the vertex input layout for subsequent draws
    fn set_input_layout(&mut self, layout: &VertexLayout);

    /// Bind a vertex buffer with the given per-vertex stride and byte offset
    fn set_vertex_buffer(&mut self, handle: BufferHandle, stride: u32, offset: u32);

    /// Bind an index buffer with the given element format and byte offset
    fn set_index_buffer(&mut self, handle: BufferHandle, format: IndexFormat, offset: u32);

    /// Submit an indexed draw using the currently bound state
    fn draw_indexed(&mut self, index_count: u32, first_index: u32, vertex_offset: i32);
}

/// A recorded draw call, as captured by [`HeadlessDevice`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DrawCall {
    /// Number of indices submitted
    pub index_count: u32,
    /// First index within the bound index buffer
    pub first_index: u32,
    /// Value added to each index before vertex lookup
    pub vertex_offset: i32,
    /// Topology active at submission time
    pub topology: PrimitiveTopology,
    /// Vertex buffer bound at submission time
    pub vertex_buffer: Option<BufferHandle>,
    /// Index buffer bound at submission time
    pub index_buffer: Option<BufferHandle>,
}

#[derive(Debug)]
struct BufferRecord {
    bytes: Vec<u8>,
}

/// A device implementation that records all calls without a GPU
///
/// Backs the test suite and offline tooling: buffers live in host memory and
/// every draw submission is captured with the state that was bound at the
/// time. Buffer-creation failure can be injected to exercise the degraded
/// rendering paths.
#[derive(Debug, Default)]
pub struct HeadlessDevice {
    buffers: HashMap<u64, BufferRecord>,
    next_handle: u64,
    buffers_created: u64,
    fail_buffer_creation: bool,

    topology: PrimitiveTopology,
    layout: Option<VertexLayout>,
    vertex_buffer: Option<BufferHandle>,
    index_buffer: Option<BufferHandle>,
    draw_calls: Vec<DrawCall>,
}

impl HeadlessDevice {
    /// Create an empty headless device
    pub fn new() -> Self {
        Self::default()
    }

    /// Inject buffer-creation failure for subsequent create calls
    pub fn set_fail_buffer_creation(&mut self, fail: bool) {
        self.fail_buffer_creation = fail;
    }

    /// Number of buffers currently alive
    pub fn buffer_count(&self) -> usize {
        self.buffers.len()
    }

    /// Total number of buffers ever created (survives destroys)
    pub fn buffers_created(&self) -> u64 {
        self.buffers_created
    }

    /// Get the contents of a buffer, if it exists
    pub fn buffer_bytes(&self, handle: BufferHandle) -> Option<&[u8]> {
        self.buffers.get(&handle.0).map(|b| b.bytes.as_slice())
    }

    /// All draw calls recorded since the last clear
    pub fn draw_calls(&self) -> &[DrawCall] {
        &self.draw_calls
    }

    /// The input layout most recently bound, if any
    pub fn bound_layout(&self) -> Option<&VertexLayout> {
        self.layout.as_ref()
    }

    /// Forget recorded draw calls (typically between frames in tests)
    pub fn clear_draw_calls(&mut self) {
        self.draw_calls.clear();
    }

    fn create_buffer(&mut self, data: &[u8]) -> DeviceResult<BufferHandle> {
        if self.fail_buffer_creation {
            return Err(DeviceError::BufferCreation(
                "allocation failure injected".to_string(),
            ));
        }

        self.next_handle += 1;
        self.buffers_created += 1;
        self.buffers.insert(
            self.next_handle,
            BufferRecord {
                bytes: data.to_vec(),
            },
        );
        Ok(BufferHandle(self.next_handle))
    }
}

impl RenderDevice for HeadlessDevice {
    fn create_vertex_buffer(&mut self, data: &[u8]) -> DeviceResult<BufferHandle> {
        self.create_buffer(data)
    }

    fn create_index_buffer(&mut self, data: &[u8]) -> DeviceResult<BufferHandle> {
        self.create_buffer(data)
    }

    fn destroy_buffer(&mut self, handle: BufferHandle) {
        self.buffers.remove(&handle.0);
        if self.vertex_buffer == Some(handle) {
            self.vertex_buffer = None;
        }
        if self.index_buffer == Some(handle) {
            self.index_buffer = None;
        }
    }

    fn set_topology(&mut self, topology: PrimitiveTopology) {
        self.topology = topology;
    }

    fn set_input_layout(&mut self, layout: &VertexLayout) {
        self.layout = Some(layout.clone());
    }

    fn set_vertex_buffer(&mut self, handle: BufferHandle, _stride: u32, _offset: u32) {
        self.vertex_buffer = Some(handle);
    }

    fn set_index_buffer(&mut self, handle: BufferHandle, _format: IndexFormat, _offset: u32) {
        self.index_buffer = Some(handle);
    }

    fn draw_indexed(&mut self, index_count: u32, first_index: u32, vertex_offset: i32) {
        self.draw_calls.push(DrawCall {
            index_count,
            first_index,
            vertex_offset,
            topology: self.topology,
            vertex_buffer: self.vertex_buffer,
            index_buffer: self.index_buffer,
        });
    }
}
