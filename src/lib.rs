// src/lib.rs
//! meshpaint
//!
//! A viewer for zipped glTF bundles that paints flat colors onto the
//! triangles you click, built on wgpu, winit and imgui.
//!
//! The load and paint pipelines ([`assets`], [`paint`], [`viewer`]) have no
//! GPU state and run headless; [`app`] wires them to a window.

pub mod app;
pub mod assets;
pub mod config;
pub mod error;
pub mod gfx;
pub mod paint;
pub mod prelude;
pub mod ui;
pub mod viewer;
pub mod wgpu_utils;

#[cfg(test)]
mod test_support;

// Re-export main types for convenience
pub use app::MeshPaintApp;
pub use config::ViewerConfig;
pub use viewer::Viewer;
