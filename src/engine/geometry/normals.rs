use glam::Vec3;

use super::{ Mesh, SurfaceNormal };
use crate::engine::error::GeometryError;

fn check_calculable(mesh: &Mesh) -> Result<(), GeometryError> {
    if mesh.positions.is_empty() {
        log::error!("cannot calculate normals: mesh has no positions");
        return Err(GeometryError::NoPositions);
    }
    if mesh.triangles.is_empty() {
        log::error!("cannot calculate normals: mesh has no triangles");
        return Err(GeometryError::NoTriangles);
    }
    Ok(())
}

fn surface_normals(mesh: &Mesh, flip: bool) -> Vec<SurfaceNormal> {
    let sign = if flip { -1.0 } else { 1.0 };
    mesh.triangles
        .iter()
        .map(|triangle| {
            let [a, b, c] = triangle.indices();
            let (v1, v2, v3) = (mesh.positions[a], mesh.positions[b], mesh.positions[c]);
            let e1 = v2 - v1;
            let e2 = v3 - v1;
            SurfaceNormal {
                position: (v1 + v2 + v3) / 3.0,
                // zero-area triangles contribute nothing instead of NaN
                direction: e1.cross(e2).normalize_or_zero() * sign,
            }
        })
        .collect()
}

/// Recompute only the per-triangle normals and their centroids
pub fn calculate_surface_normals(mesh: &mut Mesh, flip: bool) -> Result<(), GeometryError> {
    check_calculable(mesh)?;
    mesh.surface_normals = surface_normals(mesh, flip);
    mesh.dirty = true;
    Ok(())
}

/// Per-triangle normals, then per-vertex normals as the equal-weight average
/// of the adjacent triangles' normals (renormalized). Vertices no triangle
/// touches keep a zero normal.
pub fn calculate_normals(mesh: &mut Mesh, flip: bool) -> Result<(), GeometryError> {
    check_calculable(mesh)?;

    let surface = surface_normals(mesh, flip);
    let mut sums = vec![Vec3::ZERO; mesh.positions.len()];
    let mut counts = vec![0u32; mesh.positions.len()];

    for (triangle, normal) in mesh.triangles.iter().zip(&surface) {
        for index in triangle.indices() {
            sums[index] += normal.direction;
            counts[index] += 1;
        }
    }

    mesh.normals = sums
        .into_iter()
        .zip(counts)
        .map(|(sum, count)| {
            if count == 0 {
                Vec3::ZERO
            } else {
                (sum / (count as f32)).normalize_or_zero()
            }
        })
        .collect();
    mesh.surface_normals = surface;
    mesh.dirty = true;
    Ok(())
}
