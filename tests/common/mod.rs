//! Shared fixtures for the integration tests

#![allow(dead_code)]

use glam::Vec3;

use phong_engine::engine::gpu::{ GpuDevice, HeadlessDevice, ShaderStage };
use phong_engine::engine::{
    ContextId,
    Engine,
    EngineConfig,
    ImportedMesh,
    MemoryImporter,
    RenderContextManager,
    Triangle,
    VertexAttribute,
    LIGHT_BLOCK,
    LIGHT_BLOCK_SIZE,
};

pub const EPSILON: f32 = 1e-5;

pub fn approx(a: f32, b: f32) -> bool {
    (a - b).abs() < EPSILON
}

pub fn approx_vec3(a: Vec3, b: Vec3) -> bool {
    (a - b).abs().max_element() < EPSILON
}

pub const FLAT_VERTEX: &str = r#"
    #version 330 core
    in vec3 position;
    in vec3 normal;
    uniform mat4 model;
    uniform mat4 view;
    void main() { gl_Position = view * model * vec4(position + normal * 0.0, 1.0); }
"#;

pub const FLAT_FRAGMENT: &str = r#"
    #version 330 core
    uniform vec3 color;
    out vec4 fragColor;
    void main() { fragColor = vec4(color, 1.0); }
"#;

pub const TINT_VERTEX: &str = r#"
    #version 330 core
    in vec3 position;
    in vec2 texcoord;
    in vec3 normal;
    uniform mat4 model;
    void main() { gl_Position = model * vec4(position, 1.0); }
"#;

pub const BLOCK_FRAGMENT: &str = r#"
    #version 330 core
    layout(std140) uniform Params {
        vec4 tint;
        vec4 scale;
    };
    out vec4 fragColor;
    void main() { fragColor = tint * scale; }
"#;

/// Axis-aligned cube centred on the origin with the given edge length.
/// Faces wind counter-clockwise seen from outside.
pub fn cube(edge: f32) -> ImportedMesh {
    let h = edge / 2.0;
    let positions = vec![
        Vec3::new(-h, -h, -h),
        Vec3::new(h, -h, -h),
        Vec3::new(h, h, -h),
        Vec3::new(-h, h, -h),
        Vec3::new(-h, -h, h),
        Vec3::new(h, -h, h),
        Vec3::new(h, h, h),
        Vec3::new(-h, h, h)
    ];
    let quads = [
        [4, 5, 6, 7], // +z
        [0, 3, 2, 1], // -z
        [1, 2, 6, 5], // +x
        [0, 4, 7, 3], // -x
        [3, 7, 6, 2], // +y
        [0, 1, 5, 4], // -y
    ];
    let triangles = quads
        .iter()
        .flat_map(|[a, b, c, d]| [Triangle::new(*a, *b, *c), Triangle::new(*a, *c, *d)])
        .collect();
    ImportedMesh::new(positions, triangles)
}

pub fn cube_importer() -> MemoryImporter {
    MemoryImporter::new().with_mesh("cube", cube(2.0)).with_mesh("small_cube", cube(0.5))
}

pub fn headless() -> HeadlessDevice {
    HeadlessDevice::new().with_block_size(LIGHT_BLOCK, LIGHT_BLOCK_SIZE)
}

/// Link a context from two sources and register the listed inputs on it.
/// The context is left active.
pub fn make_context(
    gpu: &mut HeadlessDevice,
    contexts: &mut RenderContextManager,
    name: &str,
    vertex: &str,
    fragment: &str,
    attributes: &[VertexAttribute],
    uniforms: &[&str]
) -> ContextId {
    let vs = gpu.compile_shader(ShaderStage::Vertex, vertex).unwrap();
    let fs = gpu.compile_shader(ShaderStage::Fragment, fragment).unwrap();
    let id = contexts.create_context(gpu, name, vs, fs);
    assert!(!id.is_error());
    assert!(contexts.set_context(gpu, id));
    for attribute in attributes {
        contexts.add_vertex_attribute(gpu, attribute.clone()).unwrap();
    }
    for uniform in uniforms {
        contexts.add_uniform_attribute(gpu, uniform).unwrap();
    }
    id
}

pub fn engine() -> Engine<HeadlessDevice> {
    Engine::new(headless(), EngineConfig::default(), Box::new(cube_importer()))
}
