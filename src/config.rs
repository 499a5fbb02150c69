//! Viewer configuration
//!
//! All knobs default to the layout and look of the bundles this viewer was
//! written for. Use the `with_*` builder methods to override them.

use crate::paint::PaintColor;

/// Where the loader looks for things inside an uploaded archive
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveLayout {
    /// Exact path of the scene description document
    pub document: String,
    /// Exact path, and canonical reference name, of the binary geometry payload
    pub binary: String,
    /// Path prefix under which texture images live
    pub texture_prefix: String,
}

impl Default for ArchiveLayout {
    fn default() -> Self {
        Self {
            document: "scene.gltf".to_string(),
            binary: "scene.bin".to_string(),
            texture_prefix: "textures/".to_string(),
        }
    }
}

/// Baseline lights re-inserted after every load
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LightingConfig {
    /// Direction the directional light shines *from* (normalized on use)
    pub directional_position: [f32; 3],
    pub directional_color: [f32; 3],
    pub directional_intensity: f32,
    pub ambient_color: [f32; 3],
}

impl Default for LightingConfig {
    fn default() -> Self {
        Self {
            directional_position: [5.0, 5.0, 5.0],
            directional_color: [1.0, 1.0, 1.0],
            directional_intensity: 2.0,
            // 0x808080
            ambient_color: [128.0 / 255.0, 128.0 / 255.0, 128.0 / 255.0],
        }
    }
}

/// Top-level viewer settings
#[derive(Debug, Clone, PartialEq)]
pub struct ViewerConfig {
    pub layout: ArchiveLayout,
    pub lighting: LightingConfig,
    pub window_size: (u32, u32),
    /// Width in physical pixels of the side panel left of the 3D viewport
    pub panel_width: f32,
    pub background: [f32; 3],
    /// Vertical field of view in degrees
    pub fov_degrees: f32,
    pub znear: f32,
    pub zfar: f32,
    pub paint_color: PaintColor,
    /// Pointer travel in pixels beyond which a press/release is a drag, not a click
    pub click_tolerance: f32,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            layout: ArchiveLayout::default(),
            lighting: LightingConfig::default(),
            window_size: (1200, 800),
            panel_width: 300.0,
            // 0xf0f0f0
            background: [240.0 / 255.0, 240.0 / 255.0, 240.0 / 255.0],
            fov_degrees: 75.0,
            znear: 0.1,
            zfar: 1000.0,
            paint_color: PaintColor::new(1.0, 0.0, 0.0),
            click_tolerance: 4.0,
        }
    }
}

impl ViewerConfig {
    pub fn with_layout(mut self, layout: ArchiveLayout) -> Self {
        self.layout = layout;
        self
    }

    pub fn with_lighting(mut self, lighting: LightingConfig) -> Self {
        self.lighting = lighting;
        self
    }

    pub fn with_window_size(mut self, width: u32, height: u32) -> Self {
        self.window_size = (width, height);
        self
    }

    pub fn with_panel_width(mut self, width: f32) -> Self {
        self.panel_width = width.max(0.0);
        self
    }

    pub fn with_background(mut self, r: f32, g: f32, b: f32) -> Self {
        self.background = [r, g, b];
        self
    }

    pub fn with_projection(mut self, fov_degrees: f32, znear: f32, zfar: f32) -> Self {
        self.fov_degrees = fov_degrees;
        self.znear = znear;
        self.zfar = zfar;
        self
    }

    pub fn with_paint_color(mut self, color: PaintColor) -> Self {
        self.paint_color = color;
        self
    }

    pub fn with_click_tolerance(mut self, pixels: f32) -> Self {
        self.click_tolerance = pixels.max(0.0);
        self
    }
}
