//! # User Interface Module
//!
//! Dear ImGui overlay drawn after the 3D pass.
//!
//! - [`UiManager`] - ImGui integration with winit and wgpu, and input capture
//! - [`panel`] - the fixed side panel: upload, paint color, status, statistics
//!
//! While ImGui wants the mouse, clicks and drags never reach picking or the
//! camera.

pub mod manager;
pub mod panel;

// Re-export main types
pub use manager::UiManager;
pub use panel::{side_panel, PanelAction};
