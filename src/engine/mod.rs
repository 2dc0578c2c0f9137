pub mod config;
pub mod error;
pub mod geometry;
pub mod gpu;
pub mod loaders;
pub mod managers;
pub mod rendering;
pub mod runtime;

// Re-export all commonly used items for easy access
pub use config::{ EngineConfig, TechniqueConfig, DEFAULT_TECHNIQUE, LIGHT_BLOCK };
pub use error::*;
pub use geometry::*;
#[cfg(not(target_arch = "wasm32"))]
pub use gpu::GlowDevice;
pub use gpu::{ GpuDevice, HeadlessDevice };
pub use loaders::{ AssetImporter, GltfImporter, ImportedMesh, MemoryImporter };
pub use managers::*;
pub use rendering::*;
pub use runtime::Engine;
