//! Mesh Manager Tests
//!
//! Tests for:
//! - Load caching keyed by source id
//! - Sentinel index on failed loads
//! - Load pipeline options
//! - Dirty tracking and re-upload
//! - Drawing, including the error index

mod common;

use glam::{ Vec2, Vec3 };

use common::{ approx, cube, cube_importer, headless, make_context, FLAT_FRAGMENT, FLAT_VERTEX };
use phong_engine::engine::gpu::{ BufferUsage, GpuDevice, ShaderStage };
use phong_engine::engine::{
    build_mesh,
    calculate_widest_point,
    find_centroid,
    GeometryError,
    ImportError,
    MeshError,
    MeshIndex,
    MeshLoadOptions,
    MeshManager,
    MeshUsage,
    ProjectionKind,
    RenderContextManager,
    SphereParams,
    VertexAttribute,
    SPHERE_SOURCE,
};

fn manager() -> MeshManager {
    MeshManager::new(SphereParams::default(), MeshLoadOptions::default())
}

// ============================================================================
// Loading and caching
// ============================================================================

#[test]
fn loading_the_sphere_twice_returns_one_entry() {
    let mut gpu = headless();
    let importer = cube_importer();
    let mut meshes = manager();

    let first = meshes.load_mesh(&mut gpu, &importer, SPHERE_SOURCE);
    let second = meshes.load_mesh(&mut gpu, &importer, SPHERE_SOURCE);

    assert_eq!(first, second);
    assert!(!first.is_error());
    assert_eq!(meshes.len(), 1);

    let stats = gpu.stats();
    assert_eq!(stats.buffers_created, 2);
    assert_eq!(stats.vertex_arrays_created, 1);
    assert_eq!(stats.bytes_uploaded, 242 * 32 + 480 * 3 * 4);

    let mesh = meshes.mesh(first).unwrap();
    assert_eq!(mesh.vertex_count(), 242);
    assert!(!mesh.is_dirty());
    assert!(mesh.has_normals());
    assert!(mesh.has_texcoords());
}

#[test]
fn separate_sources_get_separate_indices() {
    let mut gpu = headless();
    let importer = cube_importer();
    let mut meshes = manager();

    let cube = meshes.load_mesh(&mut gpu, &importer, "cube");
    let small = meshes.load_mesh(&mut gpu, &importer, "small_cube");

    assert_ne!(cube, small);
    assert_eq!(meshes.find("small_cube"), Some(small));
    assert_eq!(meshes.source(cube), Some("cube"));
    assert_ne!(meshes.buffers(cube), meshes.buffers(small));
}

#[test]
fn missing_source_returns_the_error_index() {
    let mut gpu = headless();
    let importer = cube_importer();
    let mut meshes = manager();

    let index = meshes.load_mesh(&mut gpu, &importer, "teapot");
    assert_eq!(index, MeshIndex::ERROR);
    assert!(meshes.is_empty());
    assert_eq!(gpu.stats().buffers_created, 0);

    let err = meshes.try_load_mesh(&mut gpu, &importer, "teapot").unwrap_err();
    assert!(matches!(err, MeshError::Import(ImportError::NotFound(_))));
}

#[test]
fn failed_load_is_not_cached() {
    let mut gpu = headless();
    let mut importer = cube_importer();
    let mut meshes = manager();

    assert!(meshes.load_mesh(&mut gpu, &importer, "late").is_error());
    importer.insert("late", cube(1.0));
    assert!(!meshes.load_mesh(&mut gpu, &importer, "late").is_error());
}

#[test]
fn options_apply_on_first_load() {
    let mut gpu = headless();
    let importer = cube_importer();
    let mut meshes = manager();
    let options = MeshLoadOptions {
        scale_to_unit: true,
        center_origin: true,
        projection: Some(ProjectionKind::Planar),
        usage: MeshUsage::Dynamic,
        ..MeshLoadOptions::default()
    };

    let index = meshes.try_load_mesh_with(&mut gpu, &importer, "cube", &options).unwrap();
    let mesh = meshes.mesh(index).unwrap();
    assert!(approx(calculate_widest_point(mesh), 1.0));
    assert_eq!(mesh.texcoords()[2], Vec2::ONE);

    let buffers = meshes.buffers(index).unwrap();
    assert_eq!(gpu.buffer_usage(buffers.vertex_buffer), Some(BufferUsage::DynamicDraw));
}

// ============================================================================
// Pipeline
// ============================================================================

#[test]
fn pipeline_rejects_missing_positions_or_triangles() {
    let mut empty = cube(1.0);
    empty.positions.clear();
    assert!(matches!(
        build_mesh(empty, &MeshLoadOptions::default()),
        Err(MeshError::Geometry(GeometryError::NoPositions))
    ));

    let mut loose = cube(1.0);
    loose.triangles.clear();
    assert!(matches!(
        build_mesh(loose, &MeshLoadOptions::default()),
        Err(MeshError::Geometry(GeometryError::NoTriangles))
    ));
}

#[test]
fn pipeline_keeps_imported_streams() {
    let normals = vec![Vec3::Y; 8];
    let texcoords = vec![Vec2::new(0.25, 0.75); 8];
    let imported = cube(1.0).with_normals(normals).with_texcoords(texcoords);
    let options = MeshLoadOptions {
        flip_normals: true,
        ..MeshLoadOptions::default()
    };

    let mesh = build_mesh(imported, &options).unwrap();
    assert!(mesh.normals().iter().all(|n| *n == Vec3::NEG_Y));
    assert!(mesh.texcoords().iter().all(|uv| *uv == Vec2::new(0.25, 0.75)));
    assert_eq!(mesh.surface_normals().len(), 12);
}

#[test]
fn pipeline_recalculates_non_unit_imported_normals() {
    let mut normals = vec![Vec3::Z; 8];
    normals[0] = Vec3::ZERO;
    normals[1] = Vec3::new(5.0, 0.0, 0.0);
    let imported = cube(2.0).with_normals(normals);

    let mesh = build_mesh(imported, &MeshLoadOptions::default()).unwrap();
    for (normal, position) in mesh.normals().iter().zip(mesh.positions()) {
        assert!(approx(normal.length(), 1.0));
        assert!(normal.dot(*position) > 0.0);
    }
}

#[test]
fn non_unit_normals_cannot_be_set_directly() {
    let mut mesh = build_mesh(cube(1.0), &MeshLoadOptions::default()).unwrap();
    let before = mesh.normals().to_vec();

    let err = mesh.set_normals(vec![Vec3::ZERO; 8]).unwrap_err();
    assert!(matches!(err, MeshError::Geometry(GeometryError::NonUnitNormal { index: 0, .. })));
    assert_eq!(mesh.normals(), before.as_slice());
}

#[test]
fn pipeline_without_projection_zero_fills_texcoords() {
    let mesh = build_mesh(cube(1.0), &MeshLoadOptions::default()).unwrap();
    assert_eq!(mesh.texcoords().len(), 8);
    assert!(mesh.texcoords().iter().all(|uv| *uv == Vec2::ZERO));
    assert!(find_centroid(&mesh).unwrap().length() < 1e-5);
}

// ============================================================================
// Dirty tracking
// ============================================================================

#[test]
fn edits_are_uploaded_once_on_sync() {
    let mut gpu = headless();
    let importer = cube_importer();
    let mut meshes = manager();
    let index = meshes.load_mesh(&mut gpu, &importer, "cube");
    let uploads = gpu.stats().buffer_uploads;

    assert!(!meshes.sync_mesh(&mut gpu, index).unwrap());
    meshes.mesh_mut(index).unwrap().set_texcoords(vec![Vec2::ONE; 8]).unwrap();
    assert!(meshes.mesh(index).unwrap().is_dirty());

    assert!(meshes.sync_mesh(&mut gpu, index).unwrap());
    assert!(!meshes.sync_mesh(&mut gpu, index).unwrap());
    assert_eq!(gpu.stats().buffer_uploads, uploads + 2);
    assert_eq!(gpu.stats().buffers_created, 2);
}

#[test]
fn sync_of_unknown_index_is_an_error() {
    let mut gpu = headless();
    let mut meshes = manager();
    assert!(matches!(
        meshes.sync_mesh(&mut gpu, MeshIndex(4)),
        Err(MeshError::InvalidIndex(MeshIndex(4)))
    ));
}

// ============================================================================
// Drawing
// ============================================================================

#[test]
fn render_draws_every_index_with_the_active_layout() {
    let mut gpu = headless();
    let importer = cube_importer();
    let mut meshes = manager();
    let mut contexts = RenderContextManager::new();
    make_context(
        &mut gpu,
        &mut contexts,
        "Flat",
        FLAT_VERTEX,
        FLAT_FRAGMENT,
        &[VertexAttribute::position(), VertexAttribute::normal()],
        &["model", "view", "color"]
    );
    let index = meshes.load_mesh(&mut gpu, &importer, "cube");

    assert!(meshes.render_mesh(&mut gpu, &contexts, index));
    let stats = gpu.stats();
    assert_eq!(stats.draw_calls, 1);
    assert_eq!(stats.indices_drawn, 36);
    assert_eq!(stats.attribute_pointer_calls, 2);
    let vertex_array = meshes.buffers(index).unwrap().vertex_array;
    assert_eq!(gpu.attribute_pointer(vertex_array, 1), Some(VertexAttribute::normal().pointer()));

    // layout is recorded once per context
    assert!(meshes.render_mesh(&mut gpu, &contexts, index));
    assert_eq!(gpu.stats().attribute_pointer_calls, 2);
    assert_eq!(gpu.stats().draw_calls, 2);
}

const SWAPPED_VERTEX: &str = r#"
    #version 330 core
    in vec3 normal;
    in vec3 position;
    uniform mat4 model;
    uniform mat4 view;
    void main() { gl_Position = view * model * vec4(position + normal * 0.0, 1.0); }
"#;

#[test]
fn relinked_context_points_cached_meshes_again() {
    let mut gpu = headless();
    let importer = cube_importer();
    let mut meshes = manager();
    let mut contexts = RenderContextManager::new();
    let id = make_context(
        &mut gpu,
        &mut contexts,
        "Flat",
        FLAT_VERTEX,
        FLAT_FRAGMENT,
        &[VertexAttribute::position(), VertexAttribute::normal()],
        &["model", "view", "color"]
    );
    let index = meshes.load_mesh(&mut gpu, &importer, "cube");
    let vertex_array = meshes.buffers(index).unwrap().vertex_array;
    assert!(meshes.render_mesh(&mut gpu, &contexts, index));
    assert_eq!(gpu.attribute_pointer(vertex_array, 0), Some(VertexAttribute::position().pointer()));

    let vs = gpu.compile_shader(ShaderStage::Vertex, SWAPPED_VERTEX).unwrap();
    let fs = gpu.compile_shader(ShaderStage::Fragment, FLAT_FRAGMENT).unwrap();
    contexts.relink_context(&mut gpu, id, vs, fs).unwrap();
    let calls = gpu.stats().attribute_pointer_calls;

    assert!(meshes.render_mesh(&mut gpu, &contexts, index));
    assert_eq!(gpu.stats().attribute_pointer_calls, calls + 2);
    assert_eq!(gpu.attribute_pointer(vertex_array, 1), Some(VertexAttribute::position().pointer()));
    assert_eq!(gpu.attribute_pointer(vertex_array, 0), Some(VertexAttribute::normal().pointer()));
}

#[test]
fn dirty_mesh_is_synced_before_drawing() {
    let mut gpu = headless();
    let importer = cube_importer();
    let mut meshes = manager();
    let mut contexts = RenderContextManager::new();
    make_context(&mut gpu, &mut contexts, "Flat", FLAT_VERTEX, FLAT_FRAGMENT, &[VertexAttribute::position()], &[]);
    let index = meshes.load_mesh(&mut gpu, &importer, "cube");

    meshes.mesh_mut(index).unwrap().mark_dirty();
    assert!(meshes.render_mesh(&mut gpu, &contexts, index));
    assert!(!meshes.mesh(index).unwrap().is_dirty());
}

#[test]
fn error_index_is_skipped() {
    let mut gpu = headless();
    let mut meshes = manager();
    let mut contexts = RenderContextManager::new();
    make_context(&mut gpu, &mut contexts, "Flat", FLAT_VERTEX, FLAT_FRAGMENT, &[], &[]);

    assert!(!meshes.render_mesh(&mut gpu, &contexts, MeshIndex::ERROR));
    assert!(!meshes.render_mesh(&mut gpu, &contexts, MeshIndex(0)));
    assert_eq!(gpu.stats().draw_calls, 0);
}

#[test]
fn render_without_a_context_is_skipped() {
    let mut gpu = headless();
    let importer = cube_importer();
    let mut meshes = manager();
    let contexts = RenderContextManager::new();
    let index = meshes.load_mesh(&mut gpu, &importer, "cube");

    assert!(!meshes.render_mesh(&mut gpu, &contexts, index));
    assert_eq!(gpu.stats().draw_calls, 0);
}

#[test]
fn normal_overlay_draws_two_vertices_per_triangle() {
    let mut gpu = headless();
    let importer = cube_importer();
    let mut meshes = manager();
    let mut contexts = RenderContextManager::new();
    make_context(&mut gpu, &mut contexts, "Lines", FLAT_VERTEX, FLAT_FRAGMENT, &[VertexAttribute::position()], &[]);
    let index = meshes.load_mesh(&mut gpu, &importer, "cube");

    assert!(meshes.render_normals(&mut gpu, &contexts, index, 0.2));
    assert_eq!(gpu.stats().vertices_drawn, 24);
}

// ============================================================================
// Unloading
// ============================================================================

#[test]
fn unload_releases_every_buffer() {
    let mut gpu = headless();
    let importer = cube_importer();
    let mut meshes = manager();
    meshes.load_mesh(&mut gpu, &importer, "cube");
    meshes.load_mesh(&mut gpu, &importer, SPHERE_SOURCE);
    assert_eq!(gpu.live_buffer_count(), 4);

    meshes.unload_meshes(&mut gpu);
    assert!(meshes.is_empty());
    assert_eq!(gpu.live_buffer_count(), 0);
    assert_eq!(gpu.live_vertex_array_count(), 0);
}

#[test]
fn unload_on_an_empty_cache_does_nothing() {
    let mut gpu = headless();
    let mut meshes = manager();
    meshes.unload_meshes(&mut gpu);
    meshes.unload_meshes(&mut gpu);
    assert_eq!(gpu.stats().buffers_deleted, 0);
    assert_eq!(gpu.stats().vertex_arrays_deleted, 0);
}
