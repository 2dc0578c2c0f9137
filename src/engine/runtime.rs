//! Engine facade
//!
//! Owns the device, the importer, every manager and the current scene, and
//! wires them together the way a frame needs them.

use glam::Vec3;

use crate::engine::config::{ EngineConfig, TechniqueConfig, LIGHT_BLOCK };
use crate::engine::error::{ ContextError, MeshError, ShaderError };
use crate::engine::gpu::{ GpuDevice, ShaderHandle, ShaderStage };
use crate::engine::loaders::AssetImporter;
use crate::engine::managers::{
    BlockId,
    ContextId,
    MeshIndex,
    MeshManager,
    RenderContextManager,
    ShaderManager,
    UniformBlockManager,
};
use crate::engine::rendering::{
    Component,
    FrameResources,
    FrameStats,
    LightingSystem,
    RenderSettings,
    Scene,
    SceneFormat,
    SceneObject,
    SceneRenderer,
    SerializedComponent,
};

pub struct Engine<G: GpuDevice> {
    gpu: G,
    config: EngineConfig,
    importer: Box<dyn AssetImporter>,
    shaders: ShaderManager,
    contexts: RenderContextManager,
    blocks: UniformBlockManager,
    meshes: MeshManager,
    renderer: SceneRenderer,
    scene: Scene,
    initialized: bool,
}

impl<G: GpuDevice> Engine<G> {
    pub fn new(gpu: G, config: EngineConfig, importer: Box<dyn AssetImporter>) -> Self {
        let meshes = MeshManager::new(config.sphere, config.mesh_defaults);
        Self {
            gpu,
            config,
            importer,
            shaders: ShaderManager::new(),
            contexts: RenderContextManager::new(),
            blocks: UniformBlockManager::new(),
            meshes,
            renderer: SceneRenderer::new(),
            scene: Scene::default(),
            initialized: false,
        }
    }

    /// Build every configured technique and uniform block. A technique that
    /// fails is logged and left out; the others stay usable. Returns how many
    /// techniques are ready.
    pub fn init(&mut self) -> usize {
        if self.initialized {
            log::warn!("⚠️  Engine already initialized");
            return self.contexts.len();
        }
        log::info!("🔄 Initializing engine with {} techniques...", self.config.techniques.len());

        for print in &self.config.block_prints {
            self.blocks.register_block_print(print.clone());
        }

        let techniques = self.config.techniques.clone();
        for technique in &techniques {
            match self.build_technique(technique) {
                Ok(context) => self.attach_blocks(technique, context),
                Err(err) => log::error!("❌ Technique {} unavailable: {}", technique.name, err),
            }
        }

        self.renderer.set_light_block(self.blocks.find_block(LIGHT_BLOCK));
        self.initialized = true;
        log::info!("✅ Engine initialized: {} of {} techniques ready", self.contexts.len(), techniques.len());
        self.contexts.len()
    }

    fn build_technique(&mut self, technique: &TechniqueConfig) -> Result<ContextId, ContextError> {
        let vertex = self.compile_stage(&technique.vertex_shader, ShaderStage::Vertex)?;
        let fragment = self.compile_stage(&technique.fragment_shader, ShaderStage::Fragment)?;
        let context = self.contexts.try_create_context(&mut self.gpu, &technique.name, vertex, fragment)?;

        self.contexts.try_set_context(&mut self.gpu, context)?;
        for attribute in &technique.vertex_attributes {
            self.contexts.add_vertex_attribute(&mut self.gpu, attribute.clone())?;
        }
        for uniform in &technique.uniforms {
            self.contexts.add_uniform_attribute(&self.gpu, uniform)?;
        }
        Ok(context)
    }

    fn compile_stage(&mut self, reference: &str, stage: ShaderStage) -> Result<ShaderHandle, ShaderError> {
        let source = self.config.resolve_shader_source(reference)?;
        let id = self.shaders.try_load_shader(&mut self.gpu, reference, stage, &source)?;
        self.shaders.handle(id).ok_or(ShaderError::UnknownShader(id))
    }

    /// Create each block the technique reads, or route it to the block an
    /// earlier technique created
    fn attach_blocks(&mut self, technique: &TechniqueConfig, context: ContextId) {
        for name in &technique.blocks {
            let Some(print_id) = self.blocks.find_print(name) else {
                continue;
            };
            let result = match self.blocks.find_block(name) {
                Some(block) => self.blocks.attach_block(&mut self.gpu, &self.contexts, block, context),
                None => {
                    let size = self.blocks.print(print_id).map(|print| print.size).unwrap_or(0);
                    let zeroed = vec![0u8; size];
                    self.blocks
                        .try_create_block(&mut self.gpu, &self.contexts, print_id, context, &zeroed)
                        .map(|_| ())
                }
            };
            if let Err(err) = result {
                log::error!("❌ Block {} unavailable for {}: {}", name, technique.name, err);
            }
        }
    }

    // ========================================================================
    // Resources
    // ========================================================================

    pub fn load_mesh(&mut self, source: &str) -> MeshIndex {
        self.meshes.load_mesh(&mut self.gpu, self.importer.as_ref(), source)
    }

    pub fn try_load_mesh(&mut self, source: &str) -> Result<MeshIndex, MeshError> {
        self.meshes.try_load_mesh(&mut self.gpu, self.importer.as_ref(), source)
    }

    /// Replace the current scene. Meshes are loaded on the way; an object
    /// whose mesh fails keeps the error index and is skipped when drawing.
    pub fn load_scene(&mut self, format: &SceneFormat) -> &Scene {
        log::info!("🔄 Loading scene {} ({} objects)", format.scene_name, format.object_count());

        let mut scene = Scene::new(&format.scene_name);
        scene.camera = format.camera;

        let mut lighting = LightingSystem::new();
        for light in &format.lights {
            lighting.add_light(*light);
        }
        scene.lighting = lighting;

        for serialized in &format.objects {
            let mut object = SceneObject::new(&serialized.name, serialized.transform);
            for component in &serialized.components {
                match component {
                    SerializedComponent::Mesh { source } => {
                        let index = self.load_mesh(source);
                        object.add_component(Component::Mesh(index));
                    }
                    SerializedComponent::Material(material) => {
                        object.add_component(Component::Material(material.clone()));
                    }
                }
            }
            scene.add_object(object);
        }

        scene.skybox = format.skybox.as_deref().map(|source| self.load_mesh(source));

        self.scene = scene;
        log::info!(
            "✅ Scene {} ready: {} objects, {} lights",
            self.scene.name,
            self.scene.objects.len(),
            self.scene.lighting.active_light_count()
        );
        &self.scene
    }

    // ========================================================================
    // Frame
    // ========================================================================

    pub fn render_frame(&mut self, settings: &RenderSettings) -> FrameStats {
        if !self.initialized {
            log::warn!("⚠️  render_frame called before init");
        }
        let resources = FrameResources {
            meshes: &mut self.meshes,
            contexts: &mut self.contexts,
            blocks: &mut self.blocks,
        };
        self.renderer.render_frame(&mut self.gpu, resources, &self.scene, settings)
    }

    /// Recompile a technique's shaders from their current sources and relink
    /// its context. On failure the previous program stays in use.
    pub fn reload_technique(&mut self, name: &str) -> Result<(), ContextError> {
        let context = self.contexts
            .find_context(name)
            .ok_or(ContextError::UnknownContext(ContextId::ERROR))?;
        let technique = self.config
            .technique(name)
            .cloned()
            .ok_or(ContextError::UnknownContext(context))?;

        let mut handles = Vec::with_capacity(2);
        for reference in [&technique.vertex_shader, &technique.fragment_shader] {
            let source = self.config.resolve_shader_source(reference)?;
            let id = self.shaders
                .find(reference)
                .ok_or_else(|| ShaderError::MissingSource(reference.clone()))?;
            handles.push(self.shaders.reload_shader(&mut self.gpu, id, &source)?);
        }

        self.contexts.relink_context(&mut self.gpu, context, handles[0], handles[1])?;
        // relinking drops the block bindings of the old program
        self.attach_blocks(&technique, context);
        Ok(())
    }

    /// Release every GPU resource. Safe to call more than once.
    pub fn shutdown(&mut self) {
        if !self.initialized && self.meshes.is_empty() {
            return;
        }
        log::info!("🔄 Shutting down engine...");
        self.meshes.unload_meshes(&mut self.gpu);
        self.blocks.unload_all(&mut self.gpu);
        self.contexts.destroy_all(&mut self.gpu);
        self.shaders.unload_all(&mut self.gpu);
        self.renderer.set_light_block(None);
        self.scene = Scene::default();
        self.initialized = false;
        log::info!("✅ Engine shut down");
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    pub fn gpu(&self) -> &G {
        &self.gpu
    }

    pub fn gpu_mut(&mut self) -> &mut G {
        &mut self.gpu
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn meshes(&self) -> &MeshManager {
        &self.meshes
    }

    pub fn meshes_mut(&mut self) -> &mut MeshManager {
        &mut self.meshes
    }

    pub fn contexts(&self) -> &RenderContextManager {
        &self.contexts
    }

    pub fn blocks(&self) -> &UniformBlockManager {
        &self.blocks
    }

    pub fn shaders(&self) -> &ShaderManager {
        &self.shaders
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn scene_mut(&mut self) -> &mut Scene {
        &mut self.scene
    }

    pub fn light_block(&self) -> Option<BlockId> {
        self.renderer.light_block()
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Point the camera at `target` from `position`
    pub fn look_at(&mut self, position: Vec3, target: Vec3) {
        let direction = (target - position).normalize_or_zero();
        if direction == Vec3::ZERO {
            return;
        }
        let camera = &mut self.scene.camera;
        camera.position = position;
        camera.pitch = direction.y.clamp(-1.0, 1.0).asin().to_degrees();
        camera.yaw = direction.x.atan2(-direction.z).to_degrees();
    }
}

impl<G: GpuDevice> Drop for Engine<G> {
    fn drop(&mut self) {
        self.shutdown();
    }
}
