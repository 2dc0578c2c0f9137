//! GPU driver surface
//!
//! Everything the engine needs from the graphics driver goes through the
//! [`GpuDevice`] trait. Handles are plain integer newtypes so managers can
//! store them without being generic over the backend.
//!
//! - [`GlowDevice`] drives a real OpenGL context through `glow`.
//! - [`HeadlessDevice`] is a software stand-in used by tooling and tests.

#[cfg(not(target_arch = "wasm32"))]
pub mod glow_device;
pub mod headless;
pub mod state;

#[cfg(not(target_arch = "wasm32"))]
pub use glow_device::GlowDevice;
pub use headless::{ DeviceStats, HeadlessDevice, ProgramInterface, DEFAULT_UNIFORM_BUFFER_BINDINGS };
pub use state::{ Capability, CapabilityState };

use glam::{ Mat3, Mat4, Vec3, Vec4 };

/// Handle to a GPU buffer object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BufferHandle(pub u32);

/// Handle to a vertex array object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VertexArrayHandle(pub u32);

/// Handle to a compiled shader stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ShaderHandle(pub u32);

/// Handle to a linked program
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProgramHandle(pub u32);

/// Location of a uniform inside a linked program
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UniformLocation(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BufferTarget {
    Vertex,
    Index,
    Uniform,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BufferUsage {
    StaticDraw,
    DynamicDraw,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

/// Element type of a vertex attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum AttributeType {
    Float,
    UnsignedByte,
    Int,
}

impl AttributeType {
    pub fn size_in_bytes(&self) -> usize {
        match self {
            AttributeType::Float | AttributeType::Int => 4,
            AttributeType::UnsignedByte => 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DrawMode {
    Triangles,
    Lines,
}

/// Pointer layout of one vertex attribute inside the bound vertex buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttributePointer {
    pub components: i32,
    pub kind: AttributeType,
    pub normalized: bool,
    pub stride: i32,
    pub offset: i32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UniformValue {
    Int(i32),
    Float(f32),
    Vec3(Vec3),
    Vec4(Vec4),
    Mat3(Mat3),
    Mat4(Mat4),
}

/// Capability surface the engine calls into.
///
/// Fallible operations return the driver's message as a `String`, the same
/// way `glow` reports failures; managers wrap those in their own error types.
pub trait GpuDevice {
    // Buffers

    fn create_buffer(&mut self) -> Result<BufferHandle, String>;

    fn delete_buffer(&mut self, buffer: BufferHandle);

    fn bind_buffer(&mut self, target: BufferTarget, buffer: Option<BufferHandle>);

    /// Replace the whole store of the buffer bound to `target`
    fn buffer_data(&mut self, target: BufferTarget, data: &[u8], usage: BufferUsage);

    /// Overwrite part of the store of the buffer bound to `target`
    fn buffer_sub_data(&mut self, target: BufferTarget, offset: usize, data: &[u8]);

    /// Number of indexed uniform buffer binding points
    fn max_uniform_buffer_bindings(&self) -> u32;

    /// Attach a buffer to an indexed uniform binding point
    fn bind_buffer_base(&mut self, target: BufferTarget, binding: u32, buffer: Option<BufferHandle>);

    // Vertex arrays

    fn create_vertex_array(&mut self) -> Result<VertexArrayHandle, String>;

    fn delete_vertex_array(&mut self, vertex_array: VertexArrayHandle);

    fn bind_vertex_array(&mut self, vertex_array: Option<VertexArrayHandle>);

    fn enable_vertex_attribute(&mut self, location: u32);

    fn disable_vertex_attribute(&mut self, location: u32);

    fn vertex_attribute_pointer(&mut self, location: u32, pointer: &AttributePointer);

    // Shaders and programs

    /// Compile one stage; on failure the shader object is released and the
    /// info log is returned
    fn compile_shader(&mut self, stage: ShaderStage, source: &str) -> Result<ShaderHandle, String>;

    fn delete_shader(&mut self, shader: ShaderHandle);

    /// Link two stages; on failure the program object is released and the
    /// info log is returned
    fn link_program(
        &mut self,
        vertex: ShaderHandle,
        fragment: ShaderHandle
    ) -> Result<ProgramHandle, String>;

    fn delete_program(&mut self, program: ProgramHandle);

    fn use_program(&mut self, program: Option<ProgramHandle>);

    fn attribute_location(&self, program: ProgramHandle, name: &str) -> Option<u32>;

    fn uniform_location(&self, program: ProgramHandle, name: &str) -> Option<UniformLocation>;

    /// Byte size of the named uniform block as laid out by the linker
    fn uniform_block_size(&self, program: ProgramHandle, name: &str) -> Option<usize>;

    /// Route the named block of `program` to `binding`; false when the block
    /// does not exist in the program
    fn uniform_block_binding(&mut self, program: ProgramHandle, name: &str, binding: u32) -> bool;

    /// Write to a uniform of the program currently in use
    fn set_uniform(&mut self, location: UniformLocation, value: UniformValue);

    // Fixed function state and drawing

    fn set_capability(&mut self, capability: Capability, enabled: bool);

    fn viewport(&mut self, x: i32, y: i32, width: i32, height: i32);

    fn clear(&mut self, color: [f32; 4]);

    /// Indexed draw with `u32` indices from the bound element buffer
    fn draw_elements(&mut self, mode: DrawMode, count: usize, offset: usize);

    fn draw_arrays(&mut self, mode: DrawMode, first: usize, count: usize);
}
