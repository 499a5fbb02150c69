//! Viewer state and the operations the UI drives
//!
//! [`Viewer`] owns everything the event handlers touch: the scene, the
//! camera, the paint engine, the current paint color and the handles keeping
//! the on-screen model's blobs alive. It has no GPU state, so the whole
//! load → install → click → paint flow can be exercised headless.

use std::future::Future;

use cgmath::{Deg, Vector3, Zero};
use log::{error, info, warn};

use crate::{
    assets::{
        blob::{BlobStore, ResolvedAssetSet},
        loader::{load_archive, normalize_model, LoadReport, LoadedModel},
    },
    config::ViewerConfig,
    error::{LoadError, PaintError},
    gfx::{
        camera::orbit_camera::OrbitCamera,
        picking::Viewport,
        scene::{scene::Scene, SceneStatistics},
    },
    paint::{PaintColor, PaintEngine, PickOutcome, PickedFace, Selection},
};

pub struct Viewer {
    config: ViewerConfig,
    scene: Scene,
    camera: OrbitCamera,
    viewport: Viewport,
    paint: PaintEngine,
    paint_color: PaintColor,
    store: BlobStore,
    /// Handles of the model on screen; replaced (and so released) by the next install
    assets: Option<ResolvedAssetSet>,
    report: Option<LoadReport>,
    status: String,
}

impl Viewer {
    pub fn new(config: ViewerConfig) -> Self {
        let (width, height) = config.window_size;
        let viewport = viewport_for(&config, width as f32, height as f32);

        let mut camera = OrbitCamera::new(5.0, 0.0, 0.0, Vector3::zero(), viewport.aspect())
            .with_projection(Deg(config.fov_degrees), config.znear, config.zfar);
        camera.reset_to_default();

        let mut scene = Scene::new(config.background);
        scene.ensure_baseline_lighting(&config.lighting);

        Self {
            paint_color: config.paint_color,
            config,
            scene,
            camera,
            viewport,
            paint: PaintEngine::new(),
            store: BlobStore::new(),
            assets: None,
            report: None,
            status: "Open a model archive to begin".to_string(),
        }
    }

    /// Starts loading `bytes`; the returned future does not borrow the viewer
    ///
    /// Loads are not serialized. Whichever completion is handed to
    /// [`Viewer::finish_load`] last decides what is on screen.
    pub fn load(&self, bytes: Vec<u8>) -> impl Future<Output = Result<LoadedModel, LoadError>> + 'static {
        info!("loading archive ({} bytes)", bytes.len());
        load_archive(bytes, self.store.clone(), self.config.layout.clone())
    }

    /// Installs a finished load, or logs its failure leaving the scene untouched
    pub fn finish_load(&mut self, result: Result<LoadedModel, LoadError>) {
        match result {
            Ok(model) => self.install(model),
            Err(err) => {
                error!("failed to load archive: {}", err);
                self.status = format!("Load failed: {}", err);
            }
        }
    }

    /// Recenters the model, frames it, and swaps it in for the current one
    pub fn install(&mut self, model: LoadedModel) {
        let LoadedModel {
            mut graph,
            assets,
            report,
        } = model;

        match normalize_model(&mut graph) {
            Some(bounds) => {
                info!(
                    "model bounds: center {:?}, size {:?}",
                    bounds.center, bounds.size
                );
                self.camera.frame_model(bounds.size);
            }
            None => {
                warn!("model has no geometry");
                self.camera.reset_to_default();
            }
        }

        self.scene.ensure_baseline_lighting(&self.config.lighting);
        self.scene.attach(graph);
        self.paint.reset();

        // Dropping the previous set releases its blobs
        self.assets = Some(assets);
        self.status = format!(
            "Loaded {} meshes, {} textures",
            report.mesh_count, report.texture_count
        );
        self.report = Some(report);
    }

    /// Handles a click at `pointer` (window pixels)
    ///
    /// Paint failures are logged and shown in the status line before being returned.
    pub fn click(&mut self, pointer: (f32, f32)) -> Result<PickOutcome, PaintError> {
        let result = self.paint.pick_and_paint(
            pointer,
            &self.viewport,
            &self.camera,
            &mut self.scene,
            self.paint_color,
        );

        match &result {
            Ok(PickOutcome::Painted(picked)) => {
                self.status = format!("Painted face {} {}", picked.face_index, self.paint_color);
            }
            Ok(PickOutcome::Missed) => self.status = "Nothing selected".to_string(),
            Ok(PickOutcome::Ignored) => {}
            Err(err) => self.report_paint_error(err),
        }
        result
    }

    /// Re-applies the current color to the last picked triangle
    pub fn paint_selection(&mut self) -> Result<PickedFace, PaintError> {
        let result = self.paint.paint_selection(&mut self.scene, self.paint_color);
        if let Err(err) = &result {
            self.report_paint_error(err);
        }
        result
    }

    fn report_paint_error(&mut self, err: &PaintError) {
        match err {
            PaintError::MaterialMissing { .. } => error!("{}", err),
            _ => warn!("{}", err),
        }
        self.status = err.to_string();
    }

    pub fn paint_color(&self) -> PaintColor {
        self.paint_color
    }

    pub fn set_paint_color(&mut self, color: PaintColor) {
        self.paint_color = color;
    }

    /// Applies a new window size in physical pixels
    pub fn resize(&mut self, width: f32, height: f32) {
        self.viewport = viewport_for(&self.config, width, height);
        self.camera
            .resize_projection(self.viewport.width, self.viewport.height);
    }

    pub fn config(&self) -> &ViewerConfig {
        &self.config
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn camera(&self) -> &OrbitCamera {
        &self.camera
    }

    pub fn camera_mut(&mut self) -> &mut OrbitCamera {
        &mut self.camera
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn selection(&self) -> Selection {
        self.paint.selection()
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    pub fn report(&self) -> Option<&LoadReport> {
        self.report.as_ref()
    }

    pub fn statistics(&self) -> Option<SceneStatistics> {
        self.scene.model().map(|m| m.statistics())
    }

    pub fn store(&self) -> &BlobStore {
        &self.store
    }
}

/// The 3D viewport: the window minus the side panel on the left
fn viewport_for(config: &ViewerConfig, width: f32, height: f32) -> Viewport {
    let panel = config.panel_width.clamp(0.0, width.max(0.0));
    Viewport::new(panel, 0.0, (width - panel).max(0.0), height.max(0.0))
}
