//! Engine Tests
//!
//! Tests for:
//! - Technique and uniform block setup on init
//! - Scene loading through the mesh cache
//! - Frame rendering: skipped objects, lights, skybox, normal overlay
//! - Technique reload and shutdown

mod common;

use glam::Vec3;

use common::{ approx, approx_vec3, cube_importer, engine, headless };
use phong_engine::engine::gpu::{ Capability, UniformValue };
use phong_engine::engine::{
    Component,
    ContextError,
    Engine,
    EngineConfig,
    HeadlessDevice,
    Light,
    Material,
    MeshIndex,
    RenderSettings,
    SceneFormat,
    SceneObject,
    SerializedComponent,
    TechniqueConfig,
    Transform,
    DEFAULT_TECHNIQUE,
    LIGHT_BLOCK,
    SPHERE_SOURCE,
};

fn mesh(source: &str) -> SerializedComponent {
    SerializedComponent::Mesh { source: source.to_string() }
}

fn material(technique: Option<&str>) -> SerializedComponent {
    SerializedComponent::Material(Material {
        technique: technique.map(str::to_string),
        ..Material::default()
    })
}

fn demo_scene() -> SceneFormat {
    let mut scene = SceneFormat::new("test");
    scene.add_object("ball", Transform::identity(), vec![mesh(SPHERE_SOURCE)]);
    scene.add_object("box", Transform::from_position(Vec3::new(2.0, 0.0, 0.0)), vec![mesh("cube"), material(None)]);
    scene.add_object("ghost", Transform::identity(), vec![mesh("missing.gltf")]);
    scene.lights.push(Light::new(Vec3::new(0.0, 5.0, 0.0), Vec3::ONE));
    scene.lights.push(Light::new(Vec3::new(3.0, 1.0, 0.0), Vec3::X));
    scene.skybox = Some(SPHERE_SOURCE.to_string());
    scene
}

fn ready_engine() -> Engine<HeadlessDevice> {
    let mut engine = engine();
    assert_eq!(engine.init(), 5);
    engine
}

// ============================================================================
// Init
// ============================================================================

#[test]
fn init_builds_every_stock_technique() {
    let engine = ready_engine();

    assert!(engine.is_initialized());
    assert_eq!(engine.contexts().len(), 5);
    assert!(engine.contexts().find_context(DEFAULT_TECHNIQUE).is_some());
    // the lit vertex stage is shared by Phong and Blinn-Phong
    assert_eq!(engine.shaders().len(), 9);
    assert_eq!(engine.gpu().stats().shaders_compiled, 9);
}

#[test]
fn light_block_is_shared_by_lit_techniques() {
    let engine = ready_engine();
    let block = engine.light_block().unwrap();
    assert_eq!(engine.blocks().find_block(LIGHT_BLOCK), Some(block));

    let block = engine.blocks().block(block).unwrap();
    assert_eq!(block.data().len(), 400);
    assert_eq!(block.programs().len(), 2);
    for name in ["Phong", "Blinn-Phong"] {
        let context = engine.contexts().find_context(name).unwrap();
        let program = engine.contexts().program(context).unwrap();
        assert_eq!(engine.gpu().block_binding(program, LIGHT_BLOCK), Some(block.binding()));
    }
}

#[test]
fn missing_block_size_leaves_no_light_block() {
    let mut engine = Engine::new(HeadlessDevice::new(), EngineConfig::default(), Box::new(cube_importer()));
    assert_eq!(engine.init(), 5);
    assert_eq!(engine.light_block(), None);
    assert_eq!(engine.blocks().block_count(), 0);
}

#[test]
fn broken_technique_does_not_stop_the_others() {
    let mut config = EngineConfig::default();
    config.techniques.push(TechniqueConfig {
        name: "Broken".to_string(),
        vertex_shader: "builtin:vertex_lit.glsl".to_string(),
        fragment_shader: "builtin:does_not_exist.glsl".to_string(),
        vertex_attributes: Vec::new(),
        uniforms: Vec::new(),
        blocks: Vec::new(),
    });
    let mut engine = Engine::new(headless(), config, Box::new(cube_importer()));

    assert_eq!(engine.init(), 5);
    assert!(engine.contexts().find_context("Broken").is_none());
}

#[test]
fn second_init_is_ignored() {
    let mut engine = ready_engine();
    let linked = engine.gpu().stats().programs_linked;
    assert_eq!(engine.init(), 5);
    assert_eq!(engine.gpu().stats().programs_linked, linked);
}

// ============================================================================
// Scene loading
// ============================================================================

#[test]
fn scene_meshes_go_through_the_cache() {
    let mut engine = ready_engine();
    let scene = engine.load_scene(&demo_scene());

    assert_eq!(scene.objects.len(), 3);
    assert_eq!(scene.lighting.active_light_count(), 2);
    let ball = scene.find_object("ball").unwrap().mesh().unwrap();
    assert_eq!(scene.skybox, Some(ball));
    assert_eq!(scene.find_object("ghost").unwrap().mesh(), Some(MeshIndex::ERROR));

    // sphere and cube, the skybox reuses the sphere
    assert_eq!(engine.meshes().len(), 2);
    assert_eq!(engine.gpu().stats().vertex_arrays_created, 2);
}

#[test]
fn scene_json_round_trips_through_the_engine() {
    let json = r#"{
        "scene_name": "json",
        "objects": [
            {
                "name": "ball",
                "transform": { "position": [0.0, 1.0, 0.0] },
                "components": [ { "type": "Mesh", "data": { "source": "sphere" } } ]
            }
        ],
        "camera": { "position": [0.0, 2.0, 6.0] }
    }"#;
    let format = SceneFormat::try_from_json_str(json).unwrap();
    let mut engine = ready_engine();
    let scene = engine.load_scene(&format);

    assert_eq!(scene.name, "json");
    assert!(approx_vec3(scene.objects[0].transform.position, Vec3::Y));
    assert!(approx_vec3(scene.camera.position, Vec3::new(0.0, 2.0, 6.0)));
    assert_eq!(scene.skybox, None);
}

// ============================================================================
// Frames
// ============================================================================

#[test]
fn frame_draws_loaded_objects_and_skips_failed_ones() {
    let mut engine = ready_engine();
    engine.load_scene(&demo_scene());
    engine.gpu_mut().reset_stats();

    let frame = engine.render_frame(&RenderSettings::default());
    assert_eq!(frame.objects_drawn, 2);
    assert_eq!(frame.objects_skipped, 1);
    assert_eq!(frame.lights, 2);
    assert!(frame.skybox_drawn);
    assert_eq!(frame.normal_overlays, 0);

    let stats = engine.gpu().stats();
    assert_eq!(stats.draw_calls, 3);
    assert_eq!(stats.clears, 1);
    assert_eq!(engine.gpu().viewport_rect(), [0, 0, 1280, 720]);
    assert!(engine.gpu().is_capability_enabled(Capability::DepthTest));
    assert!(engine.gpu().is_capability_enabled(Capability::CullFace));
}

#[test]
fn light_block_carries_the_scene_lights() {
    let mut engine = ready_engine();
    engine.load_scene(&demo_scene());
    engine.render_frame(&RenderSettings::default());

    let block = engine.blocks().block(engine.light_block().unwrap()).unwrap();
    let contents = engine.gpu().buffer_contents(block.buffer()).unwrap();
    let count = u32::from_ne_bytes([contents[384], contents[385], contents[386], contents[387]]);
    assert_eq!(count, 2);
    // second light's color.x
    let red = f32::from_ne_bytes([contents[64], contents[65], contents[66], contents[67]]);
    assert!(approx(red, 1.0));
}

#[test]
fn material_uniforms_reach_the_lit_program() {
    let mut engine = ready_engine();
    let mut format = SceneFormat::new("material");
    format.add_object("box", Transform::identity(), vec![
        mesh("cube"),
        SerializedComponent::Material(Material {
            diffuse: Vec3::new(0.2, 0.4, 0.6),
            shininess: 64.0,
            ..Material::default()
        })
    ]);
    engine.load_scene(&format);
    engine.render_frame(&RenderSettings::default());

    let context = engine.contexts().find_context(DEFAULT_TECHNIQUE).unwrap();
    let program = engine.contexts().program(context).unwrap();
    let gpu = engine.gpu();
    assert_eq!(gpu.uniform_value(program, "shininess"), Some(UniformValue::Float(64.0)));
    assert_eq!(gpu.uniform_value(program, "diffuseColor"), Some(UniformValue::Vec3(Vec3::new(0.2, 0.4, 0.6))));
    assert_eq!(gpu.uniform_value(program, "viewPosition"), Some(UniformValue::Vec3(Vec3::new(0.0, 0.0, 3.0))));
}

#[test]
fn material_technique_overrides_the_frame_default() {
    let mut engine = ready_engine();
    let mut format = SceneFormat::new("techniques");
    format.add_object("debug", Transform::identity(), vec![mesh("cube"), material(Some("Debug"))]);
    format.add_object("unknown", Transform::identity(), vec![mesh("cube"), material(Some("Toon"))]);
    engine.load_scene(&format);

    let frame = engine.render_frame(&RenderSettings::default());
    assert_eq!(frame.objects_drawn, 1);
    assert_eq!(frame.objects_skipped, 1);
    assert_eq!(engine.contexts().active(), engine.contexts().find_context("Debug"));
}

#[test]
fn objects_added_by_hand_with_the_error_index_are_skipped() {
    let mut engine = ready_engine();
    engine
        .scene_mut()
        .add_object(SceneObject::new("broken", Transform::identity()).with_component(Component::Mesh(MeshIndex::ERROR)));

    let frame = engine.render_frame(&RenderSettings::default());
    assert_eq!(frame.objects_skipped, 1);
    assert_eq!(engine.gpu().stats().draw_calls, 0);
}

#[test]
fn skybox_and_normals_follow_the_settings() {
    let mut engine = ready_engine();
    engine.load_scene(&demo_scene());
    let settings = RenderSettings {
        show_skybox: false,
        show_normals: true,
        ..RenderSettings::default()
    };

    let frame = engine.render_frame(&settings);
    assert!(!frame.skybox_drawn);
    assert_eq!(frame.normal_overlays, 2);
    // skybox pass restores culling and depth
    assert!(engine.gpu().is_capability_enabled(Capability::DepthTest));
}

#[test]
fn frame_before_init_draws_nothing() {
    let mut engine = engine();
    engine.load_scene(&demo_scene());
    let frame = engine.render_frame(&RenderSettings::default());
    assert_eq!(frame.objects_drawn, 0);
    assert_eq!(frame.objects_skipped, 3);
    assert!(!frame.skybox_drawn);
}

// ============================================================================
// Reload, camera and shutdown
// ============================================================================

#[test]
fn reload_relinks_and_rebinds_the_light_block() {
    let mut engine = ready_engine();
    let context = engine.contexts().find_context("Phong").unwrap();
    let old = engine.contexts().program(context).unwrap();

    engine.reload_technique("Phong").unwrap();
    let program = engine.contexts().program(context).unwrap();
    assert_ne!(program, old);
    let binding = engine.blocks().block(engine.light_block().unwrap()).unwrap().binding();
    assert_eq!(engine.gpu().block_binding(program, LIGHT_BLOCK), Some(binding));

    assert!(matches!(engine.reload_technique("Toon"), Err(ContextError::UnknownContext(_))));
}

#[test]
fn look_at_turns_the_camera() {
    let mut engine = ready_engine();
    engine.look_at(Vec3::new(0.0, 0.0, 5.0), Vec3::ZERO);
    assert!(approx_vec3(engine.scene().camera.forward(), Vec3::NEG_Z));

    engine.look_at(Vec3::ZERO, Vec3::new(4.0, 0.0, 0.0));
    assert!(approx_vec3(engine.scene().camera.forward(), Vec3::X));
    assert!(approx(engine.scene().camera.yaw, 90.0));
}

#[test]
fn shutdown_twice_is_safe() {
    let mut engine = ready_engine();
    engine.load_scene(&demo_scene());
    engine.render_frame(&RenderSettings::default());

    engine.shutdown();
    let deleted = engine.gpu().stats().buffers_deleted;
    engine.shutdown();

    assert!(!engine.is_initialized());
    assert!(engine.meshes().is_empty());
    assert_eq!(engine.gpu().live_buffer_count(), 0);
    assert_eq!(engine.gpu().live_vertex_array_count(), 0);
    assert_eq!(engine.gpu().live_program_count(), 0);
    assert_eq!(engine.gpu().stats().buffers_deleted, deleted);
}
