//! Procedural meshes.

use std::f32::consts::{ PI, TAU };

use glam::Vec3;

use super::{ Mesh, MeshUsage, Triangle };
use crate::engine::error::GeometryError;

/// UV sphere with `slices` bands from pole to pole and `stacks` segments
/// around the equator.
///
/// The grid holds `slices - 1` rings of `stacks` vertices, followed by the two
/// pole vertices, for `stacks * (slices - 1) + 2` vertices. Each band between
/// neighbouring rings is split into two triangles per segment and each pole is
/// fanned, for `2 * stacks * (slices - 2) + 2 * stacks` triangles. Triangles
/// wind counter-clockwise seen from outside.
pub fn generate_sphere(slices: u32, stacks: u32, radius: f32) -> Result<Mesh, GeometryError> {
    if slices < 2 || stacks < 3 {
        return Err(GeometryError::TooFewDivisions { slices, stacks });
    }

    let rings = slices - 1;
    let mut positions = Vec::with_capacity((stacks * rings + 2) as usize);

    for ring in 1..slices {
        let theta = (ring as f32) * PI / (slices as f32);
        let (sin_theta, cos_theta) = theta.sin_cos();
        for segment in 0..stacks {
            let phi = (segment as f32) * TAU / (stacks as f32);
            let (sin_phi, cos_phi) = phi.sin_cos();
            positions.push(Vec3::new(sin_theta * cos_phi, cos_theta, sin_theta * sin_phi) * radius);
        }
    }

    let north = positions.len() as u32;
    positions.push(Vec3::Y * radius);
    let south = positions.len() as u32;
    positions.push(Vec3::NEG_Y * radius);

    let vertex = |ring: u32, segment: u32| ring * stacks + (segment % stacks);
    let mut triangles = Vec::with_capacity((2 * stacks * rings) as usize);

    for segment in 0..stacks {
        triangles.push(Triangle::new(north, vertex(0, segment + 1), vertex(0, segment)));
    }

    for ring in 0..rings - 1 {
        for segment in 0..stacks {
            let a = vertex(ring, segment);
            let b = vertex(ring, segment + 1);
            let c = vertex(ring + 1, segment);
            let d = vertex(ring + 1, segment + 1);
            triangles.push(Triangle::new(a, b, c));
            triangles.push(Triangle::new(b, d, c));
        }
    }

    for segment in 0..stacks {
        triangles.push(Triangle::new(vertex(rings - 1, segment), vertex(rings - 1, segment + 1), south));
    }

    // indices are in range by construction
    Ok(Mesh {
        positions,
        triangles,
        dirty: true,
        ..Mesh::new(MeshUsage::Static)
    })
}
