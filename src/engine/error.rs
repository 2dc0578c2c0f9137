//! Error types
//!
//! Every manager reports failures through its own enum. The sentinel-returning
//! entry points (`load_mesh`, `create_context`, ...) log these and hand back
//! the reserved `ERROR` handle instead of propagating them.

use thiserror::Error;

use crate::engine::managers::{ BlockId, BlockPrintId, ContextId, MeshIndex, ShaderId };

#[derive(Error, Debug, Clone, PartialEq)]
pub enum GeometryError {
    #[error("mesh has no positions")]
    NoPositions,

    #[error("mesh has no triangles")]
    NoTriangles,

    #[error("mesh extent along {axis} is zero")]
    DegenerateExtent {
        axis: char,
    },

    #[error("mesh collapses to a single point")]
    DegenerateBounds,

    #[error("normal {index} has length {length}, expected a unit vector")]
    NonUnitNormal {
        index: usize,
        length: f32,
    },

    #[error("a sphere needs at least 2 slices and 3 stacks, got {slices}x{stacks}")]
    TooFewDivisions {
        slices: u32,
        stacks: u32,
    },
}

#[derive(Error, Debug)]
pub enum ImportError {
    #[error("asset not found: {0}")]
    NotFound(String),

    #[error("unsupported asset format: {0}")]
    UnsupportedFormat(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("glTF error: {0}")]
    Gltf(#[from] gltf::Error),

    #[error("asset {0} contains no triangle geometry")]
    NoGeometry(String),
}

#[derive(Error, Debug)]
pub enum MeshError {
    #[error("import failed: {0}")]
    Import(#[from] ImportError),

    #[error("triangle {triangle} references vertex {index} but the mesh has {vertex_count} vertices")]
    IndexOutOfRange {
        triangle: usize,
        index: u32,
        vertex_count: usize,
    },

    #[error("attribute stream {stream} has {len} entries, expected {expected}")]
    StreamLength {
        stream: &'static str,
        len: usize,
        expected: usize,
    },

    #[error("geometry error: {0}")]
    Geometry(#[from] GeometryError),

    #[error("GPU error: {0}")]
    Gpu(String),

    #[error("no mesh at index {0}")]
    InvalidIndex(MeshIndex),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ShaderError {
    #[error("shader {name} failed to compile: {log}")]
    Compile {
        name: String,
        log: String,
    },

    #[error("no shader with id {0}")]
    UnknownShader(ShaderId),

    #[error("shader source {0} could not be resolved")]
    MissingSource(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ContextError {
    #[error("program for context {name} failed to link: {log}")]
    Link {
        name: String,
        log: String,
    },

    #[error("a context named {0} already exists")]
    DuplicateName(String),

    #[error("no context with id {0}")]
    UnknownContext(ContextId),

    #[error("context {0} must be active to register or write attributes")]
    NotActive(ContextId),

    #[error("shader error: {0}")]
    Shader(#[from] ShaderError),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BlockError {
    #[error("a block print named {0} is already registered")]
    DuplicatePrint(String),

    #[error("no block print with id {0}")]
    UnknownPrint(BlockPrintId),

    #[error("no uniform block with id {0}")]
    UnknownBlock(BlockId),

    #[error("no host data supplied for block {0}")]
    MissingData(String),

    #[error("host data for block {name} is {len} bytes, print declares {declared}")]
    DataSize {
        name: String,
        len: usize,
        declared: usize,
    },

    #[error("invalid program for block {0}")]
    InvalidProgram(String),

    #[error("program does not define uniform block {0}")]
    NotInProgram(String),

    #[error("block {name} is {introspected} bytes in the program, print declares {declared}")]
    SizeMismatch {
        name: String,
        declared: usize,
        introspected: usize,
    },

    #[error("write of {len} bytes at offset {offset} overruns block {name}")]
    OutOfBounds {
        name: String,
        offset: usize,
        len: usize,
    },

    #[error("block {name} needs binding point {binding} but the device has {limit}")]
    NoFreeBinding {
        name: String,
        binding: u32,
        limit: u32,
    },

    #[error("GPU error: {0}")]
    Gpu(String),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}
