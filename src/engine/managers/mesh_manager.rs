//! Mesh resource cache
//!
//! Owns every loaded [`Mesh`] together with the GPU objects holding its
//! interleaved vertex buffer and index buffer. Loads are keyed by source id:
//! asking for the same id twice returns the same [`MeshIndex`] without
//! touching the GPU again.

use serde::{ Deserialize, Serialize };

use crate::engine::error::{ GeometryError, MeshError };
use crate::engine::geometry::{
    calculate_normals,
    calculate_surface_normals,
    generate_sphere,
    generate_texcoords,
    reset_origin_to_centroid,
    scale_to_unit_size,
    Mesh,
    MeshUsage,
    ProjectionKind,
};
use crate::engine::gpu::{
    AttributePointer,
    AttributeType,
    BufferHandle,
    BufferTarget,
    BufferUsage,
    DrawMode,
    GpuDevice,
    VertexArrayHandle,
};
use crate::engine::loaders::{ AssetImporter, ImportedMesh };
use crate::engine::managers::{ ContextId, MeshIndex, RenderContextManager };

/// Source id that selects the procedural sphere instead of the importer
pub const SPHERE_SOURCE: &str = "sphere";

/// Subdivision of the procedural sphere
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SphereParams {
    pub radius: f32,
    pub slices: u32,
    pub stacks: u32,
}

impl Default for SphereParams {
    fn default() -> Self {
        Self {
            radius: 1.0,
            slices: 16,
            stacks: 16,
        }
    }
}

/// Steps of the load pipeline that depend on the caller
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MeshLoadOptions {
    pub flip_normals: bool,
    /// Projection used when the source carries no texcoords. `None`, or a
    /// projection that fails on the mesh, leaves every texcoord at (0, 0).
    pub projection: Option<ProjectionKind>,
    pub scale_to_unit: bool,
    pub center_origin: bool,
    pub usage: MeshUsage,
}

/// GPU objects backing one mesh
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MeshBuffers {
    pub vertex_array: VertexArrayHandle,
    pub vertex_buffer: BufferHandle,
    pub index_buffer: BufferHandle,
}

#[derive(Debug)]
struct MeshEntry {
    source: String,
    mesh: Mesh,
    buffers: MeshBuffers,
    // context and layout generation last recorded into the vertex array
    applied_layout: Option<(ContextId, u32)>,
}

#[derive(Debug, Clone, Copy)]
struct LineBuffers {
    vertex_array: VertexArrayHandle,
    vertex_buffer: BufferHandle,
}

#[derive(Debug, Default)]
pub struct MeshManager {
    entries: Vec<MeshEntry>,
    sphere: SphereParams,
    defaults: MeshLoadOptions,
    normal_lines: Option<LineBuffers>,
}

impl MeshManager {
    pub fn new(sphere: SphereParams, defaults: MeshLoadOptions) -> Self {
        Self {
            entries: Vec::new(),
            sphere,
            defaults,
            normal_lines: None,
        }
    }

    pub fn defaults(&self) -> &MeshLoadOptions {
        &self.defaults
    }

    // ========================================================================
    // Loading
    // ========================================================================

    pub fn try_load_mesh(
        &mut self,
        gpu: &mut impl GpuDevice,
        importer: &dyn AssetImporter,
        source: &str
    ) -> Result<MeshIndex, MeshError> {
        let options = self.defaults;
        self.try_load_mesh_with(gpu, importer, source, &options)
    }

    /// Load with explicit pipeline options. Options only apply to the first
    /// load of a source; later calls return the cached entry.
    pub fn try_load_mesh_with(
        &mut self,
        gpu: &mut impl GpuDevice,
        importer: &dyn AssetImporter,
        source: &str,
        options: &MeshLoadOptions
    ) -> Result<MeshIndex, MeshError> {
        if let Some(index) = self.find(source) {
            log::debug!("Mesh {} already loaded as {}", source, index);
            return Ok(index);
        }

        let mut mesh = if source == SPHERE_SOURCE {
            let sphere = generate_sphere(self.sphere.slices, self.sphere.stacks, self.sphere.radius)?;
            let imported = ImportedMesh::new(sphere.positions, sphere.triangles);
            let options = MeshLoadOptions {
                projection: Some(ProjectionKind::Spherical),
                ..*options
            };
            build_mesh(imported, &options)?
        } else {
            build_mesh(importer.import(source)?, options)?
        };

        let buffers = upload(gpu, &mut mesh)?;
        self.entries.push(MeshEntry {
            source: source.to_string(),
            mesh,
            buffers,
            applied_layout: None,
        });

        let index = MeshIndex::from_index(self.entries.len() - 1);
        log::info!(
            "✅ Loaded mesh {} as {} ({} vertices, {} triangles)",
            source,
            index,
            self.entries[index.index()].mesh.vertex_count(),
            self.entries[index.index()].mesh.triangle_count()
        );
        Ok(index)
    }

    /// Sentinel form of [`Self::try_load_mesh`]: failures are logged and
    /// reported as [`MeshIndex::ERROR`]
    pub fn load_mesh(
        &mut self,
        gpu: &mut impl GpuDevice,
        importer: &dyn AssetImporter,
        source: &str
    ) -> MeshIndex {
        self.try_load_mesh(gpu, importer, source).unwrap_or_else(|err| {
            log::error!("❌ Failed to load mesh {}: {}", source, err);
            MeshIndex::ERROR
        })
    }

    // ========================================================================
    // Access
    // ========================================================================

    pub fn find(&self, source: &str) -> Option<MeshIndex> {
        self.entries
            .iter()
            .position(|entry| entry.source == source)
            .map(MeshIndex::from_index)
    }

    pub fn mesh(&self, index: MeshIndex) -> Option<&Mesh> {
        self.entries.get(index.index()).map(|entry| &entry.mesh)
    }

    /// Edit a mesh in place. Mutations mark it dirty and the buffers are
    /// rebuilt on the next [`Self::sync_mesh`] or [`Self::render_mesh`].
    pub fn mesh_mut(&mut self, index: MeshIndex) -> Option<&mut Mesh> {
        self.entries.get_mut(index.index()).map(|entry| &mut entry.mesh)
    }

    pub fn source(&self, index: MeshIndex) -> Option<&str> {
        self.entries.get(index.index()).map(|entry| entry.source.as_str())
    }

    pub fn buffers(&self, index: MeshIndex) -> Option<MeshBuffers> {
        self.entries.get(index.index()).map(|entry| entry.buffers)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    // ========================================================================
    // GPU side
    // ========================================================================

    /// Re-upload a dirty mesh into its existing buffers. Returns whether an
    /// upload happened.
    pub fn sync_mesh(&mut self, gpu: &mut impl GpuDevice, index: MeshIndex) -> Result<bool, MeshError> {
        let entry = self.entries.get_mut(index.index()).ok_or(MeshError::InvalidIndex(index))?;
        if !entry.mesh.is_dirty() {
            return Ok(false);
        }
        entry.mesh.validate()?;
        write_buffers(gpu, &entry.buffers, &entry.mesh);
        entry.mesh.clear_dirty();
        log::debug!("Re-uploaded mesh {}", entry.source);
        Ok(true)
    }

    /// Draw a mesh with the active render context. The sentinel index, an
    /// unknown index or a missing context is logged and skipped.
    pub fn render_mesh(
        &mut self,
        gpu: &mut impl GpuDevice,
        contexts: &RenderContextManager,
        index: MeshIndex
    ) -> bool {
        if index.is_error() {
            log::error!("❌ Tried to render the error mesh index");
            return false;
        }
        if let Err(err) = self.sync_mesh(gpu, index) {
            log::error!("❌ Cannot render {}: {}", index, err);
            return false;
        }
        let (Some(entry), Some(active_id), Some(active)) = (
            self.entries.get_mut(index.index()),
            contexts.active(),
            contexts.active_context(),
        ) else {
            log::error!("❌ Cannot render {}: no active render context", index);
            return false;
        };

        let layout = (active_id, active.layout_generation());
        gpu.bind_vertex_array(Some(entry.buffers.vertex_array));
        if entry.applied_layout != Some(layout) {
            gpu.bind_buffer(BufferTarget::Vertex, Some(entry.buffers.vertex_buffer));
            for attribute in active.vertex_attributes() {
                if let Some(location) = attribute.location {
                    gpu.vertex_attribute_pointer(location, &attribute.descriptor.pointer());
                    gpu.enable_vertex_attribute(location);
                }
            }
            entry.applied_layout = Some(layout);
        }
        gpu.draw_elements(DrawMode::Triangles, entry.mesh.index_count(), 0);
        gpu.bind_vertex_array(None);
        true
    }

    /// Draw the surface normals of a mesh as a line list with the active
    /// context. Only its `position` attribute is fed.
    pub fn render_normals(
        &mut self,
        gpu: &mut impl GpuDevice,
        contexts: &RenderContextManager,
        index: MeshIndex,
        length: f32
    ) -> bool {
        let Some(entry) = self.entries.get(index.index()) else {
            log::error!("❌ Cannot draw normals of {}", index);
            return false;
        };
        let Some(location) = contexts.active_context().and_then(|context| {
            context
                .vertex_attributes()
                .iter()
                .find(|attribute| attribute.descriptor.name == "position")
                .and_then(|attribute| attribute.location)
        }) else {
            log::warn!("⚠️  Normal overlay needs an active context with a position attribute");
            return false;
        };

        let lines = entry.mesh.normal_lines(length);
        if lines.is_empty() {
            return false;
        }

        let line_buffers = match self.normal_lines {
            Some(buffers) => buffers,
            None => {
                match create_line_buffers(gpu) {
                    Ok(buffers) => {
                        self.normal_lines = Some(buffers);
                        buffers
                    }
                    Err(err) => {
                        log::error!("❌ {}", err);
                        return false;
                    }
                }
            }
        };

        gpu.bind_vertex_array(Some(line_buffers.vertex_array));
        gpu.bind_buffer(BufferTarget::Vertex, Some(line_buffers.vertex_buffer));
        gpu.buffer_data(BufferTarget::Vertex, bytemuck::cast_slice(&lines), BufferUsage::DynamicDraw);
        gpu.vertex_attribute_pointer(location, &AttributePointer {
            components: 3,
            kind: AttributeType::Float,
            normalized: false,
            stride: 12,
            offset: 0,
        });
        gpu.enable_vertex_attribute(location);
        gpu.draw_arrays(DrawMode::Lines, 0, lines.len());
        gpu.bind_vertex_array(None);
        true
    }

    /// Release every GPU object and forget all meshes. Safe on an empty cache.
    pub fn unload_meshes(&mut self, gpu: &mut impl GpuDevice) {
        if self.entries.is_empty() && self.normal_lines.is_none() {
            log::debug!("No meshes to unload");
            return;
        }
        let count = self.entries.len();
        for entry in self.entries.drain(..) {
            delete_buffers(gpu, &entry.buffers);
        }
        if let Some(lines) = self.normal_lines.take() {
            gpu.delete_buffer(lines.vertex_buffer);
            gpu.delete_vertex_array(lines.vertex_array);
        }
        log::info!("🗑️  Unloaded {} meshes", count);
    }
}

/// Run the load pipeline on imported streams: validation, normals,
/// texcoords, then the optional unit scale and recentering.
pub fn build_mesh(imported: ImportedMesh, options: &MeshLoadOptions) -> Result<Mesh, MeshError> {
    let ImportedMesh { positions, normals, texcoords, triangles } = imported;
    if positions.is_empty() {
        return Err(GeometryError::NoPositions.into());
    }
    if triangles.is_empty() {
        return Err(GeometryError::NoTriangles.into());
    }

    let mut mesh = Mesh::from_parts(positions, triangles, options.usage)?;

    match normals {
        Some(normals) => {
            let normals = if options.flip_normals {
                normals.into_iter().map(|normal| -normal).collect()
            } else {
                normals
            };
            match mesh.set_normals(normals) {
                Ok(()) => calculate_surface_normals(&mut mesh, options.flip_normals)?,
                Err(MeshError::Geometry(err @ GeometryError::NonUnitNormal { .. })) => {
                    log::warn!("⚠️  Imported normals rejected ({}), calculating them instead", err);
                    calculate_normals(&mut mesh, options.flip_normals)?;
                }
                Err(err) => {
                    return Err(err);
                }
            }
        }
        None => calculate_normals(&mut mesh, options.flip_normals)?,
    }

    match (texcoords, options.projection) {
        (Some(texcoords), _) => mesh.set_texcoords(texcoords)?,
        (None, Some(kind)) => {
            if generate_texcoords(&mut mesh, kind).is_err() {
                log::warn!("⚠️  {:?} projection failed, using (0, 0) texcoords", kind);
                mesh.fill_default_texcoords();
            }
        }
        (None, None) => mesh.fill_default_texcoords(),
    }

    if options.scale_to_unit {
        scale_to_unit_size(&mut mesh)?;
    }
    if options.center_origin {
        reset_origin_to_centroid(&mut mesh)?;
    }

    mesh.validate()?;
    Ok(mesh)
}

fn upload(gpu: &mut impl GpuDevice, mesh: &mut Mesh) -> Result<MeshBuffers, MeshError> {
    let vertex_array = gpu.create_vertex_array().map_err(MeshError::Gpu)?;
    let vertex_buffer = match gpu.create_buffer() {
        Ok(buffer) => buffer,
        Err(err) => {
            gpu.delete_vertex_array(vertex_array);
            return Err(MeshError::Gpu(err));
        }
    };
    let index_buffer = match gpu.create_buffer() {
        Ok(buffer) => buffer,
        Err(err) => {
            gpu.delete_buffer(vertex_buffer);
            gpu.delete_vertex_array(vertex_array);
            return Err(MeshError::Gpu(err));
        }
    };

    let buffers = MeshBuffers {
        vertex_array,
        vertex_buffer,
        index_buffer,
    };
    write_buffers(gpu, &buffers, mesh);
    mesh.clear_dirty();
    Ok(buffers)
}

fn write_buffers(gpu: &mut impl GpuDevice, buffers: &MeshBuffers, mesh: &Mesh) {
    let usage = match mesh.usage() {
        MeshUsage::Static => BufferUsage::StaticDraw,
        MeshUsage::Dynamic => BufferUsage::DynamicDraw,
    };
    let vertices = mesh.vertex_data();

    gpu.bind_vertex_array(Some(buffers.vertex_array));
    gpu.bind_buffer(BufferTarget::Vertex, Some(buffers.vertex_buffer));
    gpu.buffer_data(BufferTarget::Vertex, bytemuck::cast_slice(&vertices), usage);
    gpu.bind_buffer(BufferTarget::Index, Some(buffers.index_buffer));
    gpu.buffer_data(BufferTarget::Index, bytemuck::cast_slice(mesh.index_data()), usage);
    gpu.bind_vertex_array(None);
    gpu.bind_buffer(BufferTarget::Vertex, None);
}

fn delete_buffers(gpu: &mut impl GpuDevice, buffers: &MeshBuffers) {
    gpu.delete_buffer(buffers.vertex_buffer);
    gpu.delete_buffer(buffers.index_buffer);
    gpu.delete_vertex_array(buffers.vertex_array);
}

fn create_line_buffers(gpu: &mut impl GpuDevice) -> Result<LineBuffers, MeshError> {
    let vertex_array = gpu.create_vertex_array().map_err(MeshError::Gpu)?;
    match gpu.create_buffer() {
        Ok(vertex_buffer) => Ok(LineBuffers { vertex_array, vertex_buffer }),
        Err(err) => {
            gpu.delete_vertex_array(vertex_array);
            Err(MeshError::Gpu(err))
        }
    }
}
