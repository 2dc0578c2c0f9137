//! Mesh geometry processing and OpenGL resource binding for a small
//! Phong/Blinn-Phong renderer.
//!
//! The [`engine::Engine`] facade owns a [`engine::GpuDevice`] and the
//! managers that cache meshes, shader programs and uniform blocks on it.
//! [`engine::HeadlessDevice`] implements the device without a GL context
//! and is what the tests draw with.

pub mod engine;

pub use engine::*;
