//! # Graphics Module
//!
//! Everything between the scene data and the pixels on screen.
//!
//! - **Camera** ([`camera`]) - orbit camera and its mouse/keyboard controller
//! - **Picking** ([`picking`]) - rays, bounding boxes and triangle hits
//! - **Scene** ([`scene`]) - scene graph, meshes, materials and lights
//! - **Rendering** ([`rendering`]) - wgpu surface, pipelines and the frame loop
//! - **Resources** ([`resources`]) - uniforms, depth buffer and GPU mesh cache
//!
//! Only [`rendering`] and [`resources`] touch the GPU; the rest is plain data
//! and is what the paint pipeline works on.

pub mod camera;
pub mod picking;
pub mod rendering;
pub mod resources;
pub mod scene;

// Re-export commonly used types
pub use camera::orbit_camera::OrbitCamera;
pub use rendering::render_engine::RenderEngine;
