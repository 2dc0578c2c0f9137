//! Mesh data model and the algorithms that derive normals, texcoords and
//! bounds from it.

pub mod bounds;
pub mod mesh;
pub mod normals;
pub mod primitives;
pub mod texcoords;

pub use bounds::{
    calculate_bounding_box,
    calculate_widest_point,
    find_centroid,
    reset_origin_to_centroid,
    scale_to_unit_size,
    BoundingBox,
};
pub use mesh::{ Mesh, MeshUsage, SurfaceNormal, Triangle, Vertex };
pub use normals::{ calculate_normals, calculate_surface_normals };
pub use primitives::generate_sphere;
pub use texcoords::{ azimuth, generate_texcoords, ProjectionKind };
