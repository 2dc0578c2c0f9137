use bytemuck::{ Pod, Zeroable };
use glam::{ Vec2, Vec3 };
use serde::{ Deserialize, Serialize };

use crate::engine::error::{ GeometryError, MeshError };

/// Three vertex indices; winding decides which side the surface normal faces
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Pod, Zeroable)]
pub struct Triangle(pub [u32; 3]);

impl Triangle {
    pub fn new(i1: u32, i2: u32, i3: u32) -> Self {
        Self([i1, i2, i3])
    }

    pub fn indices(&self) -> [usize; 3] {
        [self.0[0] as usize, self.0[1] as usize, self.0[2] as usize]
    }
}

/// Interleaved vertex as uploaded to the vertex buffer (32 bytes)
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Default, Pod, Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub texcoord: [f32; 2],
}

impl Vertex {
    pub const STRIDE: usize = std::mem::size_of::<Vertex>();
    pub const POSITION_OFFSET: usize = 0;
    pub const NORMAL_OFFSET: usize = 12;
    pub const TEXCOORD_OFFSET: usize = 24;
}

/// Per-triangle normal anchored at the triangle's centroid
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SurfaceNormal {
    pub position: Vec3,
    pub direction: Vec3,
}

/// Upload hint for the GPU buffers of a mesh
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum MeshUsage {
    #[default]
    Static,
    Dynamic,
}

/// Indexed triangle mesh.
///
/// `positions`, `normals` and `texcoords` are parallel once the load pipeline
/// has run; before that the attribute streams may be empty. Every triangle
/// index is below the vertex count, which constructors and `rebuild` check.
#[derive(Debug, Clone, Default)]
pub struct Mesh {
    pub(crate) positions: Vec<Vec3>,
    pub(crate) normals: Vec<Vec3>,
    pub(crate) texcoords: Vec<Vec2>,
    pub(crate) triangles: Vec<Triangle>,
    pub(crate) surface_normals: Vec<SurfaceNormal>,
    pub(crate) origin: Vec3,
    pub(crate) usage: MeshUsage,
    pub(crate) dirty: bool,
}

impl Mesh {
    pub fn new(usage: MeshUsage) -> Self {
        Self {
            usage,
            ..Self::default()
        }
    }

    /// Build a mesh from raw positions and triangles
    pub fn from_parts(
        positions: Vec<Vec3>,
        triangles: Vec<Triangle>,
        usage: MeshUsage
    ) -> Result<Self, MeshError> {
        let mut mesh = Self::new(usage);
        mesh.rebuild(positions, triangles)?;
        Ok(mesh)
    }

    /// Replace the geometry wholesale. Attribute streams and derived data are
    /// dropped since they no longer describe the new vertices.
    pub fn rebuild(&mut self, positions: Vec<Vec3>, triangles: Vec<Triangle>) -> Result<(), MeshError> {
        check_triangles(&triangles, positions.len())?;
        self.positions = positions;
        self.triangles = triangles;
        self.normals.clear();
        self.texcoords.clear();
        self.surface_normals.clear();
        self.dirty = true;
        Ok(())
    }

    /// Replace the vertex normals. Every normal must be unit length.
    pub fn set_normals(&mut self, normals: Vec<Vec3>) -> Result<(), MeshError> {
        check_stream("normals", normals.len(), self.positions.len())?;
        check_unit_normals(&normals)?;
        self.normals = normals;
        self.dirty = true;
        Ok(())
    }

    pub fn set_texcoords(&mut self, texcoords: Vec<Vec2>) -> Result<(), MeshError> {
        check_stream("texcoords", texcoords.len(), self.positions.len())?;
        self.texcoords = texcoords;
        self.dirty = true;
        Ok(())
    }

    /// Give every vertex the (0, 0) texcoord
    pub fn fill_default_texcoords(&mut self) {
        self.texcoords = vec![Vec2::ZERO; self.positions.len()];
        self.dirty = true;
    }

    pub fn positions(&self) -> &[Vec3] {
        &self.positions
    }

    pub fn normals(&self) -> &[Vec3] {
        &self.normals
    }

    pub fn texcoords(&self) -> &[Vec2] {
        &self.texcoords
    }

    pub fn triangles(&self) -> &[Triangle] {
        &self.triangles
    }

    pub fn surface_normals(&self) -> &[SurfaceNormal] {
        &self.surface_normals
    }

    pub fn origin(&self) -> Vec3 {
        self.origin
    }

    pub fn usage(&self) -> MeshUsage {
        self.usage
    }

    pub fn set_usage(&mut self, usage: MeshUsage) {
        self.usage = usage;
    }

    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.triangles.len()
    }

    pub fn index_count(&self) -> usize {
        self.triangles.len() * 3
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty() || self.triangles.is_empty()
    }

    pub fn has_normals(&self) -> bool {
        !self.positions.is_empty() && self.normals.len() == self.positions.len()
    }

    pub fn has_texcoords(&self) -> bool {
        !self.positions.is_empty() && self.texcoords.len() == self.positions.len()
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    /// Only the GPU upload path may call this
    pub(crate) fn clear_dirty(&mut self) {
        self.dirty = false;
    }

    /// Check the parallel-stream and index-range invariants
    pub fn validate(&self) -> Result<(), MeshError> {
        let vertex_count = self.positions.len();
        check_triangles(&self.triangles, vertex_count)?;
        if !self.normals.is_empty() {
            check_stream("normals", self.normals.len(), vertex_count)?;
        }
        if !self.texcoords.is_empty() {
            check_stream("texcoords", self.texcoords.len(), vertex_count)?;
        }
        Ok(())
    }

    /// Interleave the attribute streams; missing streams read as zero
    pub fn vertex_data(&self) -> Vec<Vertex> {
        self.positions
            .iter()
            .enumerate()
            .map(|(i, position)| Vertex {
                position: position.to_array(),
                normal: self.normals.get(i).copied().unwrap_or(Vec3::ZERO).to_array(),
                texcoord: self.texcoords.get(i).copied().unwrap_or(Vec2::ZERO).to_array(),
            })
            .collect()
    }

    pub fn index_data(&self) -> &[u32] {
        bytemuck::cast_slice(&self.triangles)
    }

    /// Line list from each triangle centroid along its surface normal
    pub fn normal_lines(&self, length: f32) -> Vec<Vec3> {
        self.surface_normals
            .iter()
            .flat_map(|normal| [normal.position, normal.position + normal.direction * length])
            .collect()
    }
}

fn check_triangles(triangles: &[Triangle], vertex_count: usize) -> Result<(), MeshError> {
    for (triangle, tri) in triangles.iter().enumerate() {
        if let Some(&index) = tri.0.iter().find(|&&index| (index as usize) >= vertex_count) {
            return Err(MeshError::IndexOutOfRange { triangle, index, vertex_count });
        }
    }
    Ok(())
}

/// Allowed deviation of a normal's length from 1
pub const NORMAL_TOLERANCE: f32 = 1e-3;

fn check_unit_normals(normals: &[Vec3]) -> Result<(), GeometryError> {
    for (index, normal) in normals.iter().enumerate() {
        let length = normal.length();
        if !length.is_finite() || (length - 1.0).abs() > NORMAL_TOLERANCE {
            return Err(GeometryError::NonUnitNormal { index, length });
        }
    }
    Ok(())
}

fn check_stream(stream: &'static str, len: usize, expected: usize) -> Result<(), MeshError> {
    if len != expected {
        return Err(MeshError::StreamLength { stream, len, expected });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quad() -> Mesh {
        Mesh::from_parts(
            vec![
                Vec3::new(0.0, 0.0, 0.0),
                Vec3::new(1.0, 0.0, 0.0),
                Vec3::new(1.0, 1.0, 0.0),
                Vec3::new(0.0, 1.0, 0.0)
            ],
            vec![Triangle::new(0, 1, 2), Triangle::new(0, 2, 3)],
            MeshUsage::Static
        ).unwrap()
    }

    #[test]
    fn vertex_layout_is_32_bytes() {
        assert_eq!(Vertex::STRIDE, 32);
        assert_eq!(std::mem::size_of::<Triangle>(), 12);
    }

    #[test]
    fn from_parts_rejects_out_of_range_index() {
        let err = Mesh::from_parts(
            vec![Vec3::ZERO, Vec3::X, Vec3::Y],
            vec![Triangle::new(0, 1, 3)],
            MeshUsage::Static
        ).unwrap_err();
        assert!(
            matches!(err, MeshError::IndexOutOfRange { triangle: 0, index: 3, vertex_count: 3 })
        );
    }

    #[test]
    fn stream_length_must_match_vertex_count() {
        let mut mesh = quad();
        assert!(mesh.set_normals(vec![Vec3::Z; 3]).is_err());
        assert!(!mesh.has_normals());
        assert!(mesh.set_normals(vec![Vec3::Z; 4]).is_ok());
        assert!(mesh.has_normals());
    }

    #[test]
    fn normals_must_be_unit_length() {
        let mut mesh = quad();
        let err = mesh.set_normals(vec![Vec3::Z, Vec3::ZERO, Vec3::Z, Vec3::Z]).unwrap_err();
        assert!(matches!(err, MeshError::Geometry(GeometryError::NonUnitNormal { index: 1, .. })));

        let err = mesh.set_normals(vec![Vec3::Z, Vec3::Z, Vec3::new(5.0, 0.0, 0.0), Vec3::Z]).unwrap_err();
        assert!(
            matches!(err, MeshError::Geometry(GeometryError::NonUnitNormal { index: 2, length }) if length == 5.0)
        );
        assert!(!mesh.has_normals());
    }

    #[test]
    fn rebuild_drops_derived_streams() {
        let mut mesh = quad();
        mesh.fill_default_texcoords();
        mesh.clear_dirty();

        mesh.rebuild(vec![Vec3::ZERO, Vec3::X, Vec3::Y], vec![Triangle::new(0, 1, 2)]).unwrap();

        assert!(mesh.is_dirty());
        assert!(mesh.texcoords().is_empty());
        assert_eq!(mesh.triangle_count(), 1);
    }

    #[test]
    fn vertex_data_zero_fills_missing_streams() {
        let mesh = quad();
        let vertices = mesh.vertex_data();
        assert_eq!(vertices.len(), 4);
        assert_eq!(vertices[2].position, [1.0, 1.0, 0.0]);
        assert_eq!(vertices[2].normal, [0.0; 3]);
        assert_eq!(vertices[2].texcoord, [0.0; 2]);
        assert_eq!(mesh.index_data(), &[0, 1, 2, 0, 2, 3]);
    }
}
