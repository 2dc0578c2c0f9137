//! Headless frame runner for phong-engine
//!
//! Builds the engine on the headless device, loads a scene and draws one
//! frame, then reports what the frame did.
//!
//! Usage: phong-engine [config.json] [scene.json]
//! Log level comes from RUST_LOG (defaults to info).

use glam::Vec3;

use phong_engine::engine::{
    Engine,
    EngineConfig,
    GltfImporter,
    HeadlessDevice,
    Light,
    Material,
    RenderSettings,
    SceneFormat,
    SerializedComponent,
    Transform,
    LIGHT_BLOCK,
    LIGHT_BLOCK_SIZE,
    SPHERE_SOURCE,
};

fn demo_scene() -> SceneFormat {
    let mut scene = SceneFormat::new("demo");
    scene.add_object("ball", Transform::identity(), vec![
        SerializedComponent::Mesh { source: SPHERE_SOURCE.to_string() },
        SerializedComponent::Material(Material::default())
    ]);
    scene.add_object(
        "moon",
        Transform::from_position(Vec3::new(2.0, 0.5, -1.0)).with_scale(Vec3::splat(0.3)),
        vec![
            SerializedComponent::Mesh { source: SPHERE_SOURCE.to_string() },
            SerializedComponent::Material(Material {
                diffuse: Vec3::new(0.6, 0.6, 0.7),
                technique: Some("Phong".to_string()),
                ..Material::default()
            })
        ]
    );
    scene.lights.push(Light::new(Vec3::new(4.0, 4.0, 4.0), Vec3::ONE));
    scene.lights.push(Light::new(Vec3::new(-3.0, 1.0, 2.0), Vec3::new(0.3, 0.3, 0.8)));
    scene.skybox = Some(SPHERE_SOURCE.to_string());
    scene
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let mut args = std::env::args().skip(1);
    let config = match args.next() {
        Some(path) => EngineConfig::from_file(path)?,
        None => EngineConfig::default(),
    };
    let scene = match args.next() {
        Some(path) => SceneFormat::try_from_file(path)?,
        None => demo_scene(),
    };

    let gpu = HeadlessDevice::new().with_block_size(LIGHT_BLOCK, LIGHT_BLOCK_SIZE);
    let importer = Box::new(GltfImporter::new(config.asset_root.clone()));
    let mut engine = Engine::new(gpu, config, importer);

    let ready = engine.init();
    if ready == 0 {
        return Err("no technique could be built".into());
    }

    engine.load_scene(&scene);
    let settings = RenderSettings {
        show_normals: true,
        ..RenderSettings::default()
    };
    let frame = engine.render_frame(&settings);

    log::info!(
        "✅ Frame drawn: {} objects, {} skipped, {} lights, skybox {}, {} normal overlays",
        frame.objects_drawn,
        frame.objects_skipped,
        frame.lights,
        frame.skybox_drawn,
        frame.normal_overlays
    );
    let stats = engine.gpu().stats();
    log::info!(
        "📊 Device: {} draw calls, {} indices, {} buffers, {} programs, {} bytes uploaded",
        stats.draw_calls,
        stats.indices_drawn,
        stats.buffers_created,
        stats.programs_linked,
        stats.bytes_uploaded
    );

    engine.shutdown();
    Ok(())
}
