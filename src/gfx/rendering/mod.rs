// src/gfx/rendering/mod.rs
//! Core rendering functionality
//!
//! Handles render pipelines, the vertex format and frame rendering.

pub mod pipeline_manager;
pub mod render_engine;
pub mod vertex;

// Re-export main types
pub use pipeline_manager::{PipelineConfig, PipelineManager};
pub use render_engine::RenderEngine;
pub use vertex::Vertex3D;
