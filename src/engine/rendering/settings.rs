use glam::Vec3;
use serde::{ Deserialize, Serialize };

use crate::engine::config::DEFAULT_TECHNIQUE;

/// Everything the frame needs to know beyond the scene itself. Built once per
/// frame by whoever drives the engine and never mutated during the frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderSettings {
    /// Technique used for objects whose material does not pick one
    pub technique: String,
    pub viewport: [u32; 2],
    pub clear_color: [f32; 4],
    pub ambient_color: Vec3,
    pub show_normals: bool,
    pub normal_length: f32,
    pub show_skybox: bool,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            technique: DEFAULT_TECHNIQUE.to_string(),
            viewport: [1280, 720],
            clear_color: [0.1, 0.1, 0.1, 1.0],
            ambient_color: Vec3::splat(0.1),
            show_normals: false,
            normal_length: 0.1,
            show_skybox: true,
        }
    }
}

impl RenderSettings {
    pub fn with_technique(mut self, technique: &str) -> Self {
        self.technique = technique.to_string();
        self
    }

    pub fn aspect_ratio(&self) -> f32 {
        let [width, height] = self.viewport;
        if height == 0 {
            1.0
        } else {
            (width as f32) / (height as f32)
        }
    }
}
