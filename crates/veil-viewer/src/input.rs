//! Maps window input to camera commands.

use veil_engine::camera::OrbitCamera;
use winit::event::{ElementState, MouseButton, MouseScrollDelta, WindowEvent};
use winit::keyboard::{KeyCode, PhysicalKey};

/// Radians of rotation per pixel of mouse drag.
pub const ROTATE_PER_PIXEL: f32 = 0.008;

/// Pixel scroll is converted to wheel lines at this rate.
const PIXELS_PER_LINE: f64 = 40.0;

#[derive(Debug, Copy, Clone, PartialEq)]
pub enum CameraCommand {
    Pan { dx: f32, dy: f32 },
    Zoom(f32),
    Rotate { yaw: f32, pitch: f32 },
}

impl CameraCommand {
    pub fn apply(self, camera: &mut OrbitCamera) {
        match self {
            CameraCommand::Pan { dx, dy } => camera.pan(dx, dy),
            CameraCommand::Zoom(delta) => camera.zoom(delta),
            CameraCommand::Rotate { yaw, pitch } => camera.rotate(yaw, pitch),
        }
    }
}

#[derive(Debug, Default, Clone, Copy)]
struct HeldKeys {
    w: bool,
    s: bool,
    a: bool,
    d: bool,
}

/// Input state of the viewer window.
///
/// Drag and wheel produce commands as events arrive; held movement keys produce
/// one command per frame through [`held_command`](Self::held_command).
#[derive(Debug, Default)]
pub struct CameraInput {
    held: HeldKeys,
    dragging: bool,
    cursor: Option<(f64, f64)>,
}

impl CameraInput {
    pub fn handle(&mut self, event: &WindowEvent) -> Option<CameraCommand> {
        match event {
            WindowEvent::KeyboardInput { event, .. } => {
                if let PhysicalKey::Code(code) = event.physical_key {
                    self.key(code, event.state == ElementState::Pressed);
                }
                None
            }
            WindowEvent::MouseInput { state, button, .. } => {
                self.mouse_button(*button, *state == ElementState::Pressed);
                None
            }
            WindowEvent::CursorMoved { position, .. } => self.cursor_moved(position.x, position.y),
            WindowEvent::CursorLeft { .. } => {
                self.cursor = None;
                None
            }
            WindowEvent::MouseWheel { delta, .. } => Some(Self::wheel(*delta)),
            WindowEvent::Focused(false) => {
                self.held = HeldKeys::default();
                self.dragging = false;
                None
            }
            _ => None,
        }
    }

    pub fn key(&mut self, code: KeyCode, pressed: bool) {
        match code {
            KeyCode::KeyW => self.held.w = pressed,
            KeyCode::KeyS => self.held.s = pressed,
            KeyCode::KeyA => self.held.a = pressed,
            KeyCode::KeyD => self.held.d = pressed,
            _ => {}
        }
    }

    pub fn mouse_button(&mut self, button: MouseButton, pressed: bool) {
        if button == MouseButton::Left {
            self.dragging = pressed;
        }
    }

    /// Rotation for a left-drag step; the cursor is tracked either way.
    pub fn cursor_moved(&mut self, x: f64, y: f64) -> Option<CameraCommand> {
        let prev = self.cursor.replace((x, y));
        if !self.dragging {
            return None;
        }
        let (px, py) = prev?;
        let (dx, dy) = ((x - px) as f32, (y - py) as f32);
        if dx == 0.0 && dy == 0.0 {
            return None;
        }
        Some(CameraCommand::Rotate {
            yaw: -dx * ROTATE_PER_PIXEL,
            pitch: -dy * ROTATE_PER_PIXEL,
        })
    }

    /// Scrolling up moves toward the focus.
    pub fn wheel(delta: MouseScrollDelta) -> CameraCommand {
        let lines = match delta {
            MouseScrollDelta::LineDelta(_, y) => y,
            MouseScrollDelta::PixelDelta(p) => (p.y / PIXELS_PER_LINE) as f32,
        };
        CameraCommand::Zoom(-lines)
    }

    /// Movement for this frame. One key at a time, W before S before A before D.
    pub fn held_command(&self) -> Option<CameraCommand> {
        let h = self.held;
        if h.w {
            Some(CameraCommand::Zoom(-2.0))
        } else if h.s {
            Some(CameraCommand::Zoom(1.0))
        } else if h.a {
            Some(CameraCommand::Pan { dx: -1.0, dy: 0.0 })
        } else if h.d {
            Some(CameraCommand::Pan { dx: 1.0, dy: 0.0 })
        } else {
            None
        }
    }
}
