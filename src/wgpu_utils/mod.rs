// src/wgpu_utils/mod.rs
//! WGPU utility functions and helpers
//!
//! Thin wrappers for the uniform buffers and single-binding bind groups the
//! renderer uses.

pub mod binding_types;
pub mod uniform_buffer;

// Re-export main types
pub use binding_types::{single_uniform_bind_group, single_uniform_layout};
pub use uniform_buffer::UniformBuffer;
