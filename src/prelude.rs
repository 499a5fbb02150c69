//! # meshpaint Prelude
//!
//! Commonly used types in one import:
//!
//! ```no_run
//! use meshpaint::prelude::*;
//!
//! let mut viewer = Viewer::new(ViewerConfig::default());
//! let bytes = std::fs::read("model.zip").unwrap();
//! let result = pollster::block_on(viewer.load(bytes));
//! viewer.finish_load(result);
//! viewer.set_paint_color("#00ff00".parse().unwrap());
//! let _ = viewer.click((600.0, 400.0));
//! ```

pub use crate::app::MeshPaintApp;
pub use crate::assets::{load_archive, BlobStore, LoadReport, LoadedModel};
pub use crate::config::{ArchiveLayout, LightingConfig, ViewerConfig};
pub use crate::error::{ColorParseError, LoadError, PaintError};
pub use crate::gfx::camera::OrbitCamera;
pub use crate::gfx::picking::{Raycaster, Viewport};
pub use crate::gfx::scene::{Material, MaterialKind, Mesh, Scene, SceneGraph};
pub use crate::paint::{PaintColor, PaintEngine, PickOutcome, PickedFace, Selection};
pub use crate::viewer::Viewer;
