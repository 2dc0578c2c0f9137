//! Asset importers
//!
//! Importers turn a source id into raw vertex and index streams. They know
//! nothing about the GPU; the mesh manager runs the load pipeline and the
//! upload on top of what they return.

pub mod gltf_importer;

pub use gltf_importer::GltfImporter;

use std::collections::HashMap;

use glam::{ Vec2, Vec3 };

use crate::engine::error::ImportError;
use crate::engine::geometry::Triangle;

/// Raw streams produced by an importer. `normals` and `texcoords` are `None`
/// when the source does not carry them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImportedMesh {
    pub positions: Vec<Vec3>,
    pub normals: Option<Vec<Vec3>>,
    pub texcoords: Option<Vec<Vec2>>,
    pub triangles: Vec<Triangle>,
}

impl ImportedMesh {
    pub fn new(positions: Vec<Vec3>, triangles: Vec<Triangle>) -> Self {
        Self {
            positions,
            triangles,
            ..Self::default()
        }
    }

    pub fn with_normals(mut self, normals: Vec<Vec3>) -> Self {
        self.normals = Some(normals);
        self
    }

    pub fn with_texcoords(mut self, texcoords: Vec<Vec2>) -> Self {
        self.texcoords = Some(texcoords);
        self
    }
}

pub trait AssetImporter {
    fn import(&self, source_id: &str) -> Result<ImportedMesh, ImportError>;
}

/// Importer backed by meshes registered in memory. Used for generated content
/// and in tests.
#[derive(Debug, Clone, Default)]
pub struct MemoryImporter {
    meshes: HashMap<String, ImportedMesh>,
}

impl MemoryImporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, source_id: &str, mesh: ImportedMesh) {
        self.meshes.insert(source_id.to_string(), mesh);
    }

    pub fn with_mesh(mut self, source_id: &str, mesh: ImportedMesh) -> Self {
        self.insert(source_id, mesh);
        self
    }

    pub fn len(&self) -> usize {
        self.meshes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.meshes.is_empty()
    }
}

impl AssetImporter for MemoryImporter {
    fn import(&self, source_id: &str) -> Result<ImportedMesh, ImportError> {
        self.meshes
            .get(source_id)
            .cloned()
            .ok_or_else(|| ImportError::NotFound(source_id.to_string()))
    }
}
