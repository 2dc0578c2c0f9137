//! Engine configuration
//!
//! Loaded from JSON; every field falls back to the built-in defaults, which
//! describe the five stock techniques and the light block.

use std::path::{ Path, PathBuf };

use serde::{ Deserialize, Serialize };

use crate::engine::error::{ ConfigError, ShaderError };
use crate::engine::managers::{ BlockPrint, MeshLoadOptions, SphereParams, VertexAttribute };
use crate::engine::rendering::lighting::LIGHT_BLOCK_SIZE;

pub const DEFAULT_TECHNIQUE: &str = "Blinn-Phong";
pub const SKYBOX_TECHNIQUE: &str = "Skybox";
pub const NORMALS_TECHNIQUE: &str = "Normals";
pub const LIGHT_BLOCK: &str = "LightBlock";

/// Prefix of shader references compiled into the binary
pub const BUILTIN_PREFIX: &str = "builtin:";

const LIT_UNIFORMS: [&str; 9] = [
    "model",
    "view",
    "projection",
    "normalMatrix",
    "viewPosition",
    "ambientColor",
    "diffuseColor",
    "specularColor",
    "shininess",
];

/// GLSL sources shipped with the engine, by file name
pub fn builtin_shader(name: &str) -> Option<&'static str> {
    let source = match name {
        "vertex_lit.glsl" => include_str!("../assets/shaders/vertex_lit.glsl"),
        "fragment_phong.glsl" => include_str!("../assets/shaders/fragment_phong.glsl"),
        "fragment_blinn_phong.glsl" => include_str!("../assets/shaders/fragment_blinn_phong.glsl"),
        "vertex_debug.glsl" => include_str!("../assets/shaders/vertex_debug.glsl"),
        "fragment_debug.glsl" => include_str!("../assets/shaders/fragment_debug.glsl"),
        "vertex_normals.glsl" => include_str!("../assets/shaders/vertex_normals.glsl"),
        "fragment_normals.glsl" => include_str!("../assets/shaders/fragment_normals.glsl"),
        "vertex_skybox.glsl" => include_str!("../assets/shaders/vertex_skybox.glsl"),
        "fragment_skybox.glsl" => include_str!("../assets/shaders/fragment_skybox.glsl"),
        _ => {
            return None;
        }
    };
    Some(source)
}

/// One way of drawing: shader pair plus the inputs registered on its context
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct TechniqueConfig {
    pub name: String,
    pub vertex_shader: String,
    pub fragment_shader: String,
    #[serde(default = "default_vertex_attributes")]
    pub vertex_attributes: Vec<VertexAttribute>,
    #[serde(default)]
    pub uniforms: Vec<String>,
    /// Uniform block prints the program reads
    #[serde(default)]
    pub blocks: Vec<String>,
}

fn default_vertex_attributes() -> Vec<VertexAttribute> {
    vec![VertexAttribute::position(), VertexAttribute::normal(), VertexAttribute::texcoord()]
}

impl TechniqueConfig {
    fn builtin(
        name: &str,
        vertex: &str,
        fragment: &str,
        vertex_attributes: Vec<VertexAttribute>,
        uniforms: &[&str],
        blocks: &[&str]
    ) -> Self {
        Self {
            name: name.to_string(),
            vertex_shader: format!("{}{}", BUILTIN_PREFIX, vertex),
            fragment_shader: format!("{}{}", BUILTIN_PREFIX, fragment),
            vertex_attributes,
            uniforms: uniforms.iter().map(|u| u.to_string()).collect(),
            blocks: blocks.iter().map(|b| b.to_string()).collect(),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct EngineConfig {
    /// Directory importers and file shader references resolve against
    pub asset_root: PathBuf,
    pub sphere: SphereParams,
    pub mesh_defaults: MeshLoadOptions,
    pub techniques: Vec<TechniqueConfig>,
    pub block_prints: Vec<BlockPrint>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        let lit = default_vertex_attributes;
        let position_only = || vec![VertexAttribute::position()];
        Self {
            asset_root: PathBuf::from("assets"),
            sphere: SphereParams::default(),
            mesh_defaults: MeshLoadOptions::default(),
            techniques: vec![
                TechniqueConfig::builtin(
                    "Phong",
                    "vertex_lit.glsl",
                    "fragment_phong.glsl",
                    lit(),
                    &LIT_UNIFORMS,
                    &[LIGHT_BLOCK]
                ),
                TechniqueConfig::builtin(
                    "Blinn-Phong",
                    "vertex_lit.glsl",
                    "fragment_blinn_phong.glsl",
                    lit(),
                    &LIT_UNIFORMS,
                    &[LIGHT_BLOCK]
                ),
                TechniqueConfig::builtin(
                    "Debug",
                    "vertex_debug.glsl",
                    "fragment_debug.glsl",
                    vec![VertexAttribute::position(), VertexAttribute::normal()],
                    &["model", "view", "projection", "normalMatrix"],
                    &[]
                ),
                TechniqueConfig::builtin(
                    NORMALS_TECHNIQUE,
                    "vertex_normals.glsl",
                    "fragment_normals.glsl",
                    position_only(),
                    &["model", "view", "projection", "lineColor"],
                    &[]
                ),
                TechniqueConfig::builtin(
                    SKYBOX_TECHNIQUE,
                    "vertex_skybox.glsl",
                    "fragment_skybox.glsl",
                    position_only(),
                    &["view", "projection", "skyTop", "skyBottom"],
                    &[]
                )
            ],
            block_prints: vec![BlockPrint::new(LIGHT_BLOCK, LIGHT_BLOCK_SIZE)],
        }
    }
}

impl EngineConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        log::info!("🔄 Loading engine config from {}", path.display());
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sphere.slices < 2 || self.sphere.stacks < 3 {
            return Err(
                ConfigError::Invalid(
                    format!(
                        "sphere needs at least 2 slices and 3 stacks, got {}x{}",
                        self.sphere.slices,
                        self.sphere.stacks
                    )
                )
            );
        }

        for (i, print) in self.block_prints.iter().enumerate() {
            if print.size == 0 {
                return Err(ConfigError::Invalid(format!("block print {} has zero size", print.name)));
            }
            if self.block_prints[..i].iter().any(|other| other.name == print.name) {
                return Err(ConfigError::Invalid(format!("block print {} declared twice", print.name)));
            }
        }

        for (i, technique) in self.techniques.iter().enumerate() {
            if technique.name.is_empty() {
                return Err(ConfigError::Invalid(format!("technique #{} has no name", i)));
            }
            if self.techniques[..i].iter().any(|other| other.name == technique.name) {
                return Err(ConfigError::Invalid(format!("technique {} declared twice", technique.name)));
            }
            if technique.vertex_shader.is_empty() || technique.fragment_shader.is_empty() {
                return Err(
                    ConfigError::Invalid(format!("technique {} is missing a shader", technique.name))
                );
            }
            if let Some(block) = technique.blocks.iter().find(|block| self.print(block).is_none()) {
                return Err(
                    ConfigError::Invalid(
                        format!("technique {} reads undeclared block {}", technique.name, block)
                    )
                );
            }
        }
        Ok(())
    }

    pub fn technique(&self, name: &str) -> Option<&TechniqueConfig> {
        self.techniques.iter().find(|technique| technique.name == name)
    }

    pub fn print(&self, name: &str) -> Option<&BlockPrint> {
        self.block_prints.iter().find(|print| print.name == name)
    }

    /// Source text of a shader reference: a `builtin:` name or a path under
    /// the asset root
    pub fn resolve_shader_source(&self, reference: &str) -> Result<String, ShaderError> {
        if let Some(name) = reference.strip_prefix(BUILTIN_PREFIX) {
            return builtin_shader(name)
                .map(str::to_string)
                .ok_or_else(|| ShaderError::MissingSource(reference.to_string()));
        }
        let path = self.asset_root.join(reference);
        std::fs::read_to_string(&path).map_err(|err| {
            log::error!("❌ Cannot read shader {}: {}", path.display(), err);
            ShaderError::MissingSource(reference.to_string())
        })
    }
}
