pub mod lighting;
pub mod renderer;
pub mod scene;
pub mod scene_format;
pub mod settings;

pub use lighting::{ GpuLight, Light, LightBlockData, LightingSystem, LIGHT_BLOCK_SIZE, MAX_LIGHTS };
pub use renderer::{ FrameResources, FrameStats, SceneRenderer };
pub use scene::{ Camera, Component, Material, Scene, SceneObject, Transform };
pub use scene_format::{ SceneFormat, SerializedComponent, SerializedObject };
pub use settings::RenderSettings;
