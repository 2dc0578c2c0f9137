//! Resource managers
//!
//! Each manager hands out a small integer id for the resources it owns. A
//! failed load yields the id's reserved `ERROR` value, which every consumer
//! checks for and skips.

pub mod context_manager;
pub mod mesh_manager;
pub mod shader_manager;
pub mod uniform_block_manager;

pub use context_manager::{
    BoundAttribute,
    RenderContext,
    RenderContextManager,
    UniformAttribute,
    VertexAttribute,
};
pub use mesh_manager::{ build_mesh, MeshBuffers, MeshLoadOptions, MeshManager, SphereParams, SPHERE_SOURCE };
pub use shader_manager::ShaderManager;
pub use uniform_block_manager::{ BlockPrint, UniformBlock, UniformBlockManager };

macro_rules! sentinel_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(pub u32);

        impl $name {
            /// Reserved value handed out when a load or creation fails
            pub const ERROR: $name = $name(u32::MAX);

            pub fn is_error(&self) -> bool {
                *self == Self::ERROR
            }

            pub(crate) fn from_index(index: usize) -> Self {
                $name(index as u32)
            }

            pub(crate) fn index(&self) -> usize {
                self.0 as usize
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                if self.is_error() {
                    write!(f, "{}(ERROR)", stringify!($name))
                } else {
                    write!(f, "{}({})", stringify!($name), self.0)
                }
            }
        }
    };
}

sentinel_id!(
    /// Index of a mesh in the [`MeshManager`]
    MeshIndex
);
sentinel_id!(
    /// Compiled shader stage in the [`ShaderManager`]
    ShaderId
);
sentinel_id!(
    /// Render context (linked program plus attribute layout)
    ContextId
);
sentinel_id!(
    /// Registered uniform block layout
    BlockPrintId
);
sentinel_id!(
    /// Uniform block instance with its own GPU buffer
    BlockId
);
