use std::f32::consts::{ PI, TAU };

use glam::{ Vec2, Vec3 };
use serde::{ Deserialize, Serialize };

use super::{ calculate_bounding_box, Mesh };
use crate::engine::error::GeometryError;

/// Below this both horizontal components count as zero (pole singularity)
const AXIS_EPSILON: f32 = 1e-6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProjectionKind {
    Planar,
    Spherical,
    Cylindrical,
}

/// Overwrite every texcoord of the mesh with the chosen projection. On error
/// the mesh is not modified.
pub fn generate_texcoords(mesh: &mut Mesh, kind: ProjectionKind) -> Result<(), GeometryError> {
    if mesh.positions.is_empty() {
        log::error!("cannot generate texcoords: mesh has no positions");
        return Err(GeometryError::NoPositions);
    }
    let texcoords = match kind {
        ProjectionKind::Planar => planar(mesh),
        ProjectionKind::Spherical => Ok(spherical(mesh)),
        ProjectionKind::Cylindrical => cylindrical(mesh),
    }.inspect_err(|err| log::error!("{:?} projection failed: {}", kind, err))?;

    mesh.texcoords = texcoords;
    mesh.dirty = true;
    Ok(())
}

/// Angle around the vertical axis in [0, 2pi), measured from +x towards +z.
/// The axis itself (x and z both ~0) maps to 0.
pub fn azimuth(x: f32, z: f32) -> f32 {
    if x.abs() < AXIS_EPSILON && z.abs() < AXIS_EPSILON {
        return 0.0;
    }
    let theta = z.atan2(x);
    let theta = if theta < 0.0 { theta + TAU } else { theta };
    // -0.0 + TAU can round up to TAU itself
    if theta >= TAU { 0.0 } else { theta }
}

fn checked_extent(extent: f32, axis: char) -> Result<f32, GeometryError> {
    if extent.abs() <= f32::EPSILON {
        return Err(GeometryError::DegenerateExtent { axis });
    }
    Ok(extent)
}

fn planar(mesh: &Mesh) -> Result<Vec<Vec2>, GeometryError> {
    let bbox = calculate_bounding_box(mesh);
    let size = bbox.size();
    let width = checked_extent(size.x, 'x')?;
    let height = checked_extent(size.y, 'y')?;

    Ok(
        mesh.positions
            .iter()
            .map(|p| Vec2::new((p.x - bbox.min.x) / width, (p.y - bbox.min.y) / height))
            .collect()
    )
}

fn spherical(mesh: &Mesh) -> Vec<Vec2> {
    let center = calculate_bounding_box(mesh).center();
    mesh.positions
        .iter()
        .map(|p| {
            let d: Vec3 = *p - center;
            let theta = azimuth(d.x, d.z);
            let radius = d.length();
            let phi = if radius > AXIS_EPSILON {
                (d.y / radius).clamp(-1.0, 1.0).acos()
            } else {
                PI / 2.0
            };
            Vec2::new(theta / TAU, (PI - phi) / PI)
        })
        .collect()
}

fn cylindrical(mesh: &Mesh) -> Result<Vec<Vec2>, GeometryError> {
    let bbox = calculate_bounding_box(mesh);
    let center = bbox.center();
    let height = checked_extent(bbox.size().y, 'y')?;

    Ok(
        mesh.positions
            .iter()
            .map(|p| {
                let theta = azimuth(p.x - center.x, p.z - center.z);
                Vec2::new(theta / TAU, (p.y - bbox.min.y) / height)
            })
            .collect()
    )
}
