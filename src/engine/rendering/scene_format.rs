use std::path::Path;

use serde::{ Deserialize, Serialize };

use super::lighting::Light;
use super::scene::{ Camera, Material, Transform };
use crate::engine::error::ConfigError;

/// Individual component in the scene format
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "type", content = "data")]
pub enum SerializedComponent {
    /// Mesh source id, resolved through the mesh manager on load
    Mesh {
        source: String,
    },
    Material(Material),
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct SerializedObject {
    pub name: String,
    #[serde(default)]
    pub transform: Transform,
    #[serde(default)]
    pub components: Vec<SerializedComponent>,
}

/// Scene file format
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct SceneFormat {
    pub scene_name: String,
    #[serde(default)]
    pub objects: Vec<SerializedObject>,
    #[serde(default)]
    pub lights: Vec<Light>,
    #[serde(default)]
    pub camera: Camera,
    /// Mesh drawn behind everything with the skybox technique
    #[serde(default)]
    pub skybox: Option<String>,
}

impl Default for SceneFormat {
    fn default() -> Self {
        Self::new("no_name")
    }
}

impl SceneFormat {
    pub fn new(scene_name: &str) -> Self {
        Self {
            scene_name: scene_name.to_string(),
            objects: Vec::new(),
            lights: Vec::new(),
            camera: Camera::default(),
            skybox: None,
        }
    }

    pub fn add_object(&mut self, name: &str, transform: Transform, components: Vec<SerializedComponent>) {
        self.objects.push(SerializedObject {
            name: name.to_string(),
            transform,
            components,
        });
    }

    pub fn object_count(&self) -> usize {
        self.objects.len()
    }

    pub fn try_from_json_str(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn try_from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path)?;
        Self::try_from_json_str(&json)
    }

    pub fn try_to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
