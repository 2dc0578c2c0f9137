use std::path::{ Path, PathBuf };

use glam::{ Vec2, Vec3 };

use super::{ AssetImporter, ImportedMesh };
use crate::engine::error::ImportError;
use crate::engine::geometry::Triangle;

/// Reads `.gltf` and `.glb` files relative to an asset root.
///
/// Every triangle-list primitive of every mesh in the document is merged into
/// one stream. Normals and texcoords are only reported when all merged
/// primitives carry them.
#[derive(Debug, Clone)]
pub struct GltfImporter {
    root: PathBuf,
}

impl GltfImporter {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, source_id: &str) -> Result<PathBuf, ImportError> {
        let path = self.root.join(source_id);
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase());
        match extension.as_deref() {
            Some("gltf") | Some("glb") => {}
            _ => {
                return Err(ImportError::UnsupportedFormat(source_id.to_string()));
            }
        }
        if !path.is_file() {
            return Err(ImportError::NotFound(path.display().to_string()));
        }
        Ok(path)
    }
}

impl AssetImporter for GltfImporter {
    fn import(&self, source_id: &str) -> Result<ImportedMesh, ImportError> {
        let path = self.resolve(source_id)?;
        log::debug!("🔄 Reading glTF document {}", path.display());

        let gltf = gltf::Gltf::open(&path)?;
        let buffers = gltf::import_buffers(&gltf.document, path.parent(), gltf.blob.clone())?;

        let mut merged = MergedStreams::default();
        for mesh in gltf.document.meshes() {
            for primitive in mesh.primitives() {
                if primitive.mode() != gltf::mesh::Mode::Triangles {
                    log::warn!(
                        "⚠️  Skipping {:?} primitive in mesh {:?} of {}",
                        primitive.mode(),
                        mesh.name(),
                        source_id
                    );
                    continue;
                }
                let reader = primitive.reader(|buffer| {
                    buffers.get(buffer.index()).map(|data| data.0.as_slice())
                });
                let Some(positions) = reader.read_positions() else {
                    continue;
                };
                let positions: Vec<Vec3> = positions.map(Vec3::from).collect();
                let normals = reader
                    .read_normals()
                    .map(|normals| normals.map(Vec3::from).collect::<Vec<_>>());
                let texcoords = reader
                    .read_tex_coords(0)
                    .map(|texcoords| texcoords.into_f32().map(Vec2::from).collect::<Vec<_>>());
                let indices: Vec<u32> = match reader.read_indices() {
                    Some(indices) => indices.into_u32().collect(),
                    None => (0..positions.len() as u32).collect(),
                };
                merged.append(positions, normals, texcoords, &indices);
            }
        }

        if merged.positions.is_empty() || merged.triangles.is_empty() {
            return Err(ImportError::NoGeometry(source_id.to_string()));
        }

        log::info!(
            "✅ Imported {}: {} vertices, {} triangles",
            source_id,
            merged.positions.len(),
            merged.triangles.len()
        );
        Ok(merged.finish())
    }
}

#[derive(Default)]
struct MergedStreams {
    positions: Vec<Vec3>,
    normals: Vec<Vec3>,
    texcoords: Vec<Vec2>,
    triangles: Vec<Triangle>,
    all_normals: bool,
    all_texcoords: bool,
    primitives: usize,
}

impl MergedStreams {
    fn append(
        &mut self,
        positions: Vec<Vec3>,
        normals: Option<Vec<Vec3>>,
        texcoords: Option<Vec<Vec2>>,
        indices: &[u32]
    ) {
        let base = self.positions.len() as u32;
        let count = positions.len();

        if self.primitives == 0 {
            self.all_normals = true;
            self.all_texcoords = true;
        }
        self.primitives += 1;

        match normals {
            Some(normals) if normals.len() == count => self.normals.extend(normals),
            _ => {
                self.all_normals = false;
            }
        }
        match texcoords {
            Some(texcoords) if texcoords.len() == count => self.texcoords.extend(texcoords),
            _ => {
                self.all_texcoords = false;
            }
        }

        self.positions.extend(positions);
        // trailing indices that do not form a full triangle are dropped
        self.triangles.extend(
            indices.chunks_exact(3).map(|tri| Triangle::new(base + tri[0], base + tri[1], base + tri[2]))
        );
    }

    fn finish(self) -> ImportedMesh {
        ImportedMesh {
            normals: self.all_normals.then_some(self.normals),
            texcoords: self.all_texcoords.then_some(self.texcoords),
            positions: self.positions,
            triangles: self.triangles,
        }
    }
}
