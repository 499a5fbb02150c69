// src/gfx/resources/mod.rs
//! GPU resource management
//!
//! Uniform layouts, the depth buffer and the per-mesh buffer cache.

pub mod global_bindings;
pub mod mesh_cache;
pub mod texture_resource;

// Re-export main types
pub use global_bindings::{DrawUniformContent, GlobalBindings, GlobalUBO, GlobalUBOContent};
pub use mesh_cache::{GpuMesh, MeshCache};
pub use texture_resource::TextureResource;
