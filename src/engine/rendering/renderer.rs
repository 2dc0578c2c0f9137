//! Frame orchestration
//!
//! One frame runs: state setup and clear, light block upload, skybox, scene
//! objects, normal overlay. Any object whose resources failed to load is
//! skipped and counted; the rest of the frame still draws.

use glam::{ Mat3, Mat4, Vec3 };

use super::scene::{ Material, Scene };
use super::settings::RenderSettings;
use crate::engine::config::{ NORMALS_TECHNIQUE, SKYBOX_TECHNIQUE };
use crate::engine::gpu::{ Capability, CapabilityState, GpuDevice, UniformValue };
use crate::engine::managers::{ BlockId, MeshManager, RenderContextManager, UniformBlockManager };

const NORMAL_LINE_COLOR: Vec3 = Vec3::new(1.0, 1.0, 0.0);
const SKY_TOP: Vec3 = Vec3::new(0.35, 0.55, 0.85);
const SKY_BOTTOM: Vec3 = Vec3::new(0.85, 0.85, 0.9);

/// What happened during one frame
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameStats {
    pub objects_drawn: usize,
    pub objects_skipped: usize,
    pub lights: usize,
    pub skybox_drawn: bool,
    pub normal_overlays: usize,
}

/// Mutable views of the managers a frame draws with
pub struct FrameResources<'a> {
    pub meshes: &'a mut MeshManager,
    pub contexts: &'a mut RenderContextManager,
    pub blocks: &'a mut UniformBlockManager,
}

#[derive(Debug, Default)]
pub struct SceneRenderer {
    capabilities: CapabilityState,
    light_block: Option<BlockId>,
}

impl SceneRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Uniform block the lighting data is staged into every frame
    pub fn set_light_block(&mut self, block: Option<BlockId>) {
        self.light_block = block.filter(|block| !block.is_error());
    }

    pub fn light_block(&self) -> Option<BlockId> {
        self.light_block
    }

    pub fn capabilities(&self) -> &CapabilityState {
        &self.capabilities
    }

    pub fn render_frame(
        &mut self,
        gpu: &mut impl GpuDevice,
        resources: FrameResources<'_>,
        scene: &Scene,
        settings: &RenderSettings
    ) -> FrameStats {
        let FrameResources { meshes, contexts, blocks } = resources;
        let mut stats = FrameStats::default();

        // ====================================================================
        // Frame setup
        // ====================================================================

        let [width, height] = settings.viewport;
        gpu.viewport(0, 0, width as i32, height as i32);
        self.capabilities.set(gpu, Capability::DepthTest, true);
        self.capabilities.set(gpu, Capability::CullFace, true);
        self.capabilities.set(gpu, Capability::Blend, false);
        gpu.clear(settings.clear_color);

        let view = scene.camera.view_matrix();
        let projection = scene.camera.projection_matrix(settings.aspect_ratio());

        // ====================================================================
        // Lights
        // ====================================================================

        stats.lights = scene.lighting.active_light_count();
        if let Some(block) = self.light_block {
            let data = scene.lighting.block_data();
            match blocks.write_pod(block, &data) {
                Ok(()) => {
                    blocks.send_data(gpu, block);
                }
                Err(err) => log::error!("❌ Light block not updated: {}", err),
            }
        }

        // ====================================================================
        // Skybox
        // ====================================================================

        if settings.show_skybox {
            if let (Some(skybox), Some(context)) = (scene.skybox, contexts.find_context(SKYBOX_TECHNIQUE)) {
                let saved = self.capabilities.snapshot();
                self.capabilities.set(gpu, Capability::DepthTest, false);
                self.capabilities.set(gpu, Capability::CullFace, false);

                if contexts.set_context(gpu, context) {
                    let rotation_only = Mat4::from_mat3(Mat3::from_mat4(view));
                    contexts.set_uniform(gpu, "view", UniformValue::Mat4(rotation_only));
                    contexts.set_uniform(gpu, "projection", UniformValue::Mat4(projection));
                    contexts.set_uniform(gpu, "skyTop", UniformValue::Vec3(SKY_TOP));
                    contexts.set_uniform(gpu, "skyBottom", UniformValue::Vec3(SKY_BOTTOM));
                    stats.skybox_drawn = meshes.render_mesh(gpu, contexts, skybox);
                }

                self.capabilities.restore(gpu, saved);
            }
        }

        // ====================================================================
        // Scene objects
        // ====================================================================

        let default_material = Material::default();
        for object in &scene.objects {
            let Some(mesh) = object.mesh() else {
                continue;
            };
            if mesh.is_error() {
                log::debug!("Skipping {}: mesh failed to load", object.name);
                stats.objects_skipped += 1;
                continue;
            }

            let material = object.material().unwrap_or(&default_material);
            let technique = material.technique.as_deref().unwrap_or(settings.technique.as_str());
            let Some(context) = contexts.find_context(technique) else {
                log::error!("❌ Skipping {}: no render context named {}", object.name, technique);
                stats.objects_skipped += 1;
                continue;
            };
            if !contexts.set_context(gpu, context) {
                stats.objects_skipped += 1;
                continue;
            }

            let uniforms = [
                ("model", UniformValue::Mat4(object.transform.matrix())),
                ("view", UniformValue::Mat4(view)),
                ("projection", UniformValue::Mat4(projection)),
                ("normalMatrix", UniformValue::Mat3(object.transform.normal_matrix())),
                ("viewPosition", UniformValue::Vec3(scene.camera.position)),
                ("ambientColor", UniformValue::Vec3(settings.ambient_color)),
                ("diffuseColor", UniformValue::Vec3(material.diffuse)),
                ("specularColor", UniformValue::Vec3(material.specular)),
                ("shininess", UniformValue::Float(material.shininess)),
            ];
            for (name, value) in uniforms {
                contexts.set_uniform(gpu, name, value);
            }

            if meshes.render_mesh(gpu, contexts, mesh) {
                stats.objects_drawn += 1;
            } else {
                stats.objects_skipped += 1;
            }
        }

        // ====================================================================
        // Normal overlay
        // ====================================================================

        if settings.show_normals {
            match contexts.find_context(NORMALS_TECHNIQUE) {
                Some(context) if contexts.set_context(gpu, context) => {
                    contexts.set_uniform(gpu, "view", UniformValue::Mat4(view));
                    contexts.set_uniform(gpu, "projection", UniformValue::Mat4(projection));
                    contexts.set_uniform(gpu, "lineColor", UniformValue::Vec3(NORMAL_LINE_COLOR));
                    for object in &scene.objects {
                        let Some(mesh) = object.mesh().filter(|mesh| !mesh.is_error()) else {
                            continue;
                        };
                        contexts.set_uniform(gpu, "model", UniformValue::Mat4(object.transform.matrix()));
                        if meshes.render_normals(gpu, contexts, mesh, settings.normal_length) {
                            stats.normal_overlays += 1;
                        }
                    }
                }
                _ => log::warn!("⚠️  Normal overlay requested but the {} technique is unavailable", NORMALS_TECHNIQUE),
            }
        }

        log::debug!(
            "Frame done: {} drawn, {} skipped, {} lights",
            stats.objects_drawn,
            stats.objects_skipped,
            stats.lights
        );
        stats
    }
}
