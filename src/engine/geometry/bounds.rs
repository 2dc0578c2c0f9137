use glam::Vec3;

use super::Mesh;
use crate::engine::error::GeometryError;

/// Axis-aligned box. An empty box is inverted (min = +inf, max = -inf).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min: Vec3,
    pub max: Vec3,
}

impl Default for BoundingBox {
    fn default() -> Self {
        Self::empty()
    }
}

impl BoundingBox {
    pub fn empty() -> Self {
        Self {
            min: Vec3::splat(f32::INFINITY),
            max: Vec3::splat(f32::NEG_INFINITY),
        }
    }

    pub fn from_points<'a>(points: impl IntoIterator<Item = &'a Vec3>) -> Self {
        points.into_iter().fold(Self::empty(), |mut bbox, point| {
            bbox.expand(*point);
            bbox
        })
    }

    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x || self.min.y > self.max.y || self.min.z > self.max.z
    }

    pub fn expand(&mut self, point: Vec3) {
        self.min = self.min.min(point);
        self.max = self.max.max(point);
    }

    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    pub fn size(&self) -> Vec3 {
        self.max - self.min
    }

    /// Largest of the three extents
    pub fn widest(&self) -> f32 {
        self.size().max_element()
    }

    pub fn contains(&self, point: Vec3) -> bool {
        point.cmpge(self.min).all() && point.cmple(self.max).all()
    }
}

pub fn calculate_bounding_box(mesh: &Mesh) -> BoundingBox {
    BoundingBox::from_points(&mesh.positions)
}

/// Largest bounding-box extent; negative infinity for an empty mesh
pub fn calculate_widest_point(mesh: &Mesh) -> f32 {
    calculate_bounding_box(mesh).widest()
}

/// Scale the mesh so its widest extent becomes 1. Returns the factor applied.
pub fn scale_to_unit_size(mesh: &mut Mesh) -> Result<f32, GeometryError> {
    if mesh.positions.is_empty() {
        log::error!("cannot scale an empty mesh");
        return Err(GeometryError::NoPositions);
    }
    let widest = calculate_widest_point(mesh);
    if !widest.is_finite() || widest <= f32::EPSILON {
        log::error!("cannot scale a mesh that collapses to a point (widest extent {})", widest);
        return Err(GeometryError::DegenerateBounds);
    }

    let factor = 1.0 / widest;
    for position in &mut mesh.positions {
        *position *= factor;
    }
    for normal in &mut mesh.surface_normals {
        normal.position *= factor;
    }
    mesh.dirty = true;
    Ok(factor)
}

/// Midpoint of the bounding box (not the vertex mean)
pub fn find_centroid(mesh: &Mesh) -> Result<Vec3, GeometryError> {
    if mesh.positions.is_empty() {
        return Err(GeometryError::NoPositions);
    }
    Ok(calculate_bounding_box(mesh).center())
}

/// Move the geometry so its centroid sits at the local origin. The offset is
/// accumulated into `Mesh::origin` and returned.
pub fn reset_origin_to_centroid(mesh: &mut Mesh) -> Result<Vec3, GeometryError> {
    let centroid = find_centroid(mesh).inspect_err(|_| {
        log::error!("cannot recenter an empty mesh");
    })?;

    for position in &mut mesh.positions {
        *position -= centroid;
    }
    for normal in &mut mesh.surface_normals {
        normal.position -= centroid;
    }
    mesh.origin += centroid;
    mesh.dirty = true;
    Ok(centroid)
}
