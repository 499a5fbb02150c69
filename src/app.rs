//! Window, event loop and GPU glue around a [`Viewer`]
//!
//! Loads run on a single-threaded [`LocalPool`] polled from `about_to_wait`.
//! Their results come back over a channel and are applied in completion
//! order, so the last load to finish decides what is on screen.

use std::{path::Path, sync::Arc};

use anyhow::Context as _;
use futures::{
    channel::mpsc,
    executor::{LocalPool, LocalSpawner},
    task::LocalSpawnExt,
};
use log::{error, info};
use winit::{
    application::ApplicationHandler,
    dpi::{PhysicalPosition, PhysicalSize},
    event::{ElementState, Event, MouseButton, WindowEvent},
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    keyboard::{KeyCode, PhysicalKey},
    window::{Window, WindowAttributes, WindowId},
};

use crate::{
    assets::LoadedModel,
    config::ViewerConfig,
    error::LoadError,
    gfx::{camera::CameraController, rendering::RenderEngine},
    ui::{side_panel, PanelAction, UiManager},
    viewer::Viewer,
};

type LoadResult = Result<LoadedModel, LoadError>;

pub struct MeshPaintApp {
    event_loop: Option<EventLoop<()>>,
    app_state: AppState,
}

struct AppState {
    window: Option<Arc<Window>>,
    render_engine: Option<RenderEngine>,
    ui_manager: Option<UiManager>,
    viewer: Viewer,
    controller: CameraController,
    pool: LocalPool,
    spawner: LocalSpawner,
    loads_tx: mpsc::UnboundedSender<LoadResult>,
    loads_rx: mpsc::UnboundedReceiver<LoadResult>,
    pending_loads: usize,
    cursor: Option<(f32, f32)>,
    /// Where the left button went down, if it went down inside the viewport
    press: Option<(f32, f32)>,
    init_error: Option<anyhow::Error>,
}

impl MeshPaintApp {
    pub fn new(config: ViewerConfig) -> anyhow::Result<Self> {
        let event_loop = EventLoop::new().context("failed to create event loop")?;
        let pool = LocalPool::new();
        let spawner = pool.spawner();
        let (loads_tx, loads_rx) = mpsc::unbounded();

        Ok(Self {
            event_loop: Some(event_loop),
            app_state: AppState {
                window: None,
                render_engine: None,
                ui_manager: None,
                viewer: Viewer::new(config),
                controller: CameraController::new(0.005, 0.1),
                pool,
                spawner,
                loads_tx,
                loads_rx,
                pending_loads: 0,
                cursor: None,
                press: None,
                init_error: None,
            },
        })
    }

    /// Queues `path` to be loaded once the event loop is running
    pub fn open(&mut self, path: &Path) {
        self.app_state.open_path(path);
    }

    /// Runs the event loop until the window is closed
    pub fn run(mut self) -> anyhow::Result<()> {
        let event_loop = self
            .event_loop
            .take()
            .context("event loop already consumed")?;
        event_loop.set_control_flow(ControlFlow::Wait);
        event_loop
            .run_app(&mut self.app_state)
            .context("event loop failed")?;

        match self.app_state.init_error.take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

impl AppState {
    fn open_path(&mut self, path: &Path) {
        match std::fs::read(path) {
            Ok(bytes) => {
                info!("opening {}", path.display());
                self.start_load(bytes);
            }
            Err(err) => {
                error!("failed to read {}: {}", path.display(), err);
            }
        }
    }

    fn start_load(&mut self, bytes: Vec<u8>) {
        let load = self.viewer.load(bytes);
        let tx = self.loads_tx.clone();
        let spawned = self.spawner.spawn_local(async move {
            // The receiver lives as long as the app
            let _ = tx.unbounded_send(load.await);
        });
        match spawned {
            Ok(()) => self.pending_loads += 1,
            Err(err) => error!("failed to start load: {}", err),
        }
    }

    fn pick_archive(&mut self) {
        if let Some(path) = rfd::FileDialog::new()
            .add_filter("Model archive", &["zip"])
            .pick_file()
        {
            self.open_path(&path);
        }
    }

    /// Polls pending loads and installs every result that has arrived
    fn drain_loads(&mut self) -> bool {
        self.pool.run_until_stalled();

        let mut changed = false;
        while let Ok(Some(result)) = self.loads_rx.try_next() {
            self.pending_loads = self.pending_loads.saturating_sub(1);
            self.viewer.finish_load(result);
            changed = true;
        }
        changed
    }

    fn request_redraw(&self) {
        if let Some(window) = self.window.as_ref() {
            window.request_redraw();
        }
    }

    fn handle_mouse_button(&mut self, state: ElementState) {
        let Some(cursor) = self.cursor else {
            return;
        };
        let ui_wants_mouse = self
            .ui_manager
            .as_ref()
            .is_some_and(|ui| ui.wants_mouse());

        match state {
            ElementState::Pressed => {
                if !ui_wants_mouse && self.viewer.viewport().contains(cursor) {
                    self.press = Some(cursor);
                    self.controller.set_mouse_pressed(true);
                }
            }
            ElementState::Released => {
                self.controller.set_mouse_pressed(false);
                let Some(press) = self.press.take() else {
                    return;
                };
                let travel = ((cursor.0 - press.0).powi(2) + (cursor.1 - press.1).powi(2)).sqrt();
                if travel <= self.viewer.config().click_tolerance {
                    // Errors are logged and shown by the viewer
                    let _ = self.viewer.click(cursor);
                }
            }
        }
        self.request_redraw();
    }

    fn render(&mut self) {
        let (Some(window), Some(render_engine)) =
            (self.window.as_ref(), self.render_engine.as_mut())
        else {
            return;
        };

        render_engine.update(self.viewer.camera(), self.viewer.scene());

        let viewer = &self.viewer;
        let mut actions = Vec::new();
        match self.ui_manager.as_mut() {
            Some(ui_manager) => {
                render_engine.render_frame(
                    viewer.scene(),
                    viewer.viewport(),
                    |device, queue, encoder, color_attachment| {
                        ui_manager.draw(device, queue, encoder, window, color_attachment, |ui| {
                            actions = side_panel(ui, viewer);
                        });
                    },
                );
            }
            None => render_engine.render_frame(viewer.scene(), viewer.viewport(), |_, _, _, _| {}),
        }

        for action in actions {
            match action {
                PanelAction::OpenArchive => self.pick_archive(),
                PanelAction::PaintSelection => {
                    // Errors are logged and shown by the viewer
                    let _ = self.viewer.paint_selection();
                }
                PanelAction::SetPaintColor(color) => self.viewer.set_paint_color(color),
            }
            self.request_redraw();
        }
    }
}

impl ApplicationHandler for AppState {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }

        let (width, height) = self.viewer.config().window_size;
        let window = match event_loop.create_window(
            WindowAttributes::default()
                .with_title("meshpaint")
                .with_inner_size(PhysicalSize::new(width, height)),
        ) {
            Ok(window) => Arc::new(window),
            Err(err) => {
                self.init_error = Some(anyhow::Error::new(err).context("failed to create window"));
                event_loop.exit();
                return;
            }
        };

        let PhysicalSize { width, height } = window.inner_size();
        let renderer = match pollster::block_on(RenderEngine::new(window.clone(), width, height)) {
            Ok(renderer) => renderer,
            Err(err) => {
                self.init_error = Some(err);
                event_loop.exit();
                return;
            }
        };

        self.ui_manager = Some(UiManager::new(
            renderer.device(),
            renderer.queue(),
            renderer.surface_format(),
            &window,
        ));
        self.viewer.resize(width as f32, height as f32);
        self.render_engine = Some(renderer);
        self.window = Some(window);
        self.request_redraw();
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, window_id: WindowId, event: WindowEvent) {
        let Some(window) = self.window.clone() else {
            return;
        };

        if let Some(ui_manager) = self.ui_manager.as_mut() {
            let ui_event: Event<()> = Event::WindowEvent {
                window_id,
                event: event.clone(),
            };
            ui_manager.handle_input(&window, &ui_event);
        }

        match event {
            WindowEvent::CloseRequested => event_loop.exit(),
            WindowEvent::KeyboardInput {
                event: key_event, ..
            } => {
                if key_event.physical_key == PhysicalKey::Code(KeyCode::Escape) {
                    event_loop.exit();
                    return;
                }
                let ui_wants_input = self
                    .ui_manager
                    .as_ref()
                    .is_some_and(|ui| ui.wants_input());
                if !ui_wants_input {
                    self.controller
                        .process_keyed_events(&key_event, self.viewer.camera_mut());
                    window.request_redraw();
                }
            }
            WindowEvent::Resized(PhysicalSize { width, height }) => {
                if let Some(render_engine) = self.render_engine.as_mut() {
                    render_engine.resize(width, height);
                }
                self.viewer.resize(width as f32, height as f32);
                window.request_redraw();
            }
            WindowEvent::CursorMoved {
                position: PhysicalPosition { x, y },
                ..
            } => {
                self.cursor = Some((x as f32, y as f32));
                window.request_redraw();
            }
            WindowEvent::CursorLeft { .. } => self.cursor = None,
            WindowEvent::MouseInput {
                state,
                button: MouseButton::Left,
                ..
            } => self.handle_mouse_button(state),
            WindowEvent::DroppedFile(path) => {
                self.open_path(&path);
            }
            WindowEvent::RedrawRequested => self.render(),
            _ => (),
        }
    }

    fn device_event(
        &mut self,
        _event_loop: &ActiveEventLoop,
        _device_id: winit::event::DeviceId,
        event: winit::event::DeviceEvent,
    ) {
        let Some(window) = self.window.clone() else {
            return;
        };

        if let Some(ui_manager) = self.ui_manager.as_ref() {
            if ui_manager.wants_input() && self.press.is_none() {
                return;
            }
        }

        // Wheel zoom only while the pointer is over the viewport
        let over_viewport = self
            .cursor
            .is_some_and(|c| self.viewer.viewport().contains(c));
        if over_viewport || self.press.is_some() {
            self.controller
                .process_events(&event, &window, self.viewer.camera_mut());
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        if self.drain_loads() {
            self.request_redraw();
        }
        // Keep polling while a load has not reported back
        if self.pending_loads > 0 {
            event_loop.set_control_flow(ControlFlow::Poll);
        } else {
            event_loop.set_control_flow(ControlFlow::Wait);
        }
    }
}
