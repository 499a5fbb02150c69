use log::debug;
use winit::{
    dpi::PhysicalPosition,
    event::{DeviceEvent, ElementState, KeyEvent, MouseScrollDelta},
    keyboard::{KeyCode, PhysicalKey},
    window::Window,
};

use super::orbit_camera::OrbitCamera;

/// What a left-button drag does to the camera
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Drag {
    Orbit,
    Pan,
}

/// Orbit controls: drag to rotate, shift-drag to pan, wheel to zoom
///
/// The app decides when a drag starts (only inside the 3D viewport) and
/// tells the controller through [`CameraController::set_mouse_pressed`].
pub struct CameraController {
    pub rotate_speed: f32,
    pub zoom_speed: f32,
    pub pan_speed: f32,
    shift: bool,
    dragging: bool,
}

impl CameraController {
    pub fn new(rotate_speed: f32, zoom_speed: f32) -> Self {
        Self {
            rotate_speed,
            zoom_speed,
            pan_speed: 0.01,
            shift: false,
            dragging: false,
        }
    }

    pub fn set_mouse_pressed(&mut self, pressed: bool) {
        self.dragging = pressed;
    }

    fn drag(&self) -> Option<Drag> {
        match (self.dragging, self.shift) {
            (false, _) => None,
            (true, false) => Some(Drag::Orbit),
            (true, true) => Some(Drag::Pan),
        }
    }

    pub fn process_events(&mut self, event: &DeviceEvent, window: &Window, camera: &mut OrbitCamera) {
        if self.apply_device_event(event, camera) {
            window.request_redraw();
        }
    }

    /// Returns whether the camera moved
    fn apply_device_event(&mut self, event: &DeviceEvent, camera: &mut OrbitCamera) -> bool {
        match event {
            DeviceEvent::MouseWheel { delta } => {
                let lines = match delta {
                    MouseScrollDelta::LineDelta(_, y) => *y,
                    MouseScrollDelta::PixelDelta(PhysicalPosition { y, .. }) => *y as f32 / 20.0,
                };
                camera.add_distance(-lines * self.zoom_speed);
                true
            }
            DeviceEvent::MouseMotion { delta: (dx, dy) } => {
                let (dx, dy) = (*dx as f32, *dy as f32);
                match self.drag() {
                    Some(Drag::Orbit) => {
                        camera.add_yaw(-dx * self.rotate_speed);
                        camera.add_pitch(dy * self.rotate_speed);
                        true
                    }
                    Some(Drag::Pan) => {
                        camera.pan((-dx * self.pan_speed, dy * self.pan_speed));
                        true
                    }
                    None => false,
                }
            }
            _ => false,
        }
    }

    pub fn process_keyed_events(&mut self, event: &KeyEvent, camera: &mut OrbitCamera) {
        if let PhysicalKey::Code(code) = event.physical_key {
            self.apply_key(code, event.state == ElementState::Pressed, camera);
        }
    }

    fn apply_key(&mut self, code: KeyCode, pressed: bool, camera: &mut OrbitCamera) {
        match code {
            KeyCode::ShiftLeft | KeyCode::ShiftRight => self.shift = pressed,
            // Shift+C
            KeyCode::KeyC if pressed && self.shift => {
                debug!("resetting camera to default position");
                camera.reset_to_default();
            }
            _ => (),
        }
    }
}
