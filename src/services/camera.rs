//! Camera controller - pointer/keyboard glue over the pure camera math
//!
//! States: `Idle` and `Dragging`. Pointer-down starts a drag, pointer-move
//! applies the delta from the last sampled position, pointer-up/leave ends
//! it. Keys apply discrete deltas in either state. After `detach()` every
//! input is ignored so a closed session cannot move the camera.

use crate::domain::camera::{self, CameraDelta, CameraLimits, CameraState};
use crate::domain::types::AngularPosition;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Discrete keyboard inputs from the input contract
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyInput {
    Left,
    Right,
    Up,
    Down,
    ZoomIn,
    ZoomOut,
    /// `R`
    Reset,
    /// `T`
    ToggleMode,
    /// `F`, handled by the session
    Fullscreen,
    /// `Escape`, handled by the session
    Escape,
}

impl std::str::FromStr for KeyInput {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.to_ascii_lowercase().as_str() {
            "left" | "arrowleft" => KeyInput::Left,
            "right" | "arrowright" => KeyInput::Right,
            "up" | "arrowup" => KeyInput::Up,
            "down" | "arrowdown" => KeyInput::Down,
            "+" | "=" | "plus" => KeyInput::ZoomIn,
            "-" | "minus" => KeyInput::ZoomOut,
            "r" => KeyInput::Reset,
            "t" => KeyInput::ToggleMode,
            "f" => KeyInput::Fullscreen,
            "esc" | "escape" => KeyInput::Escape,
            other => return Err(format!("unknown key '{}'", other)),
        })
    }
}

/// Pointer events in viewport pixels
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PointerEvent {
    Down { x: f64, y: f64 },
    Move { x: f64, y: f64 },
    Up,
    Leave,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DragState {
    Idle,
    Dragging { origin: (f64, f64), last: (f64, f64) },
}

/// Discrete step sizes for keyboard and wheel input
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraSteps {
    pub rotate_deg: f64,
    pub pan_px: f64,
    pub zoom: f64,
    /// Zoom change per wheel unit; positive wheel deltas zoom out
    pub wheel_zoom: f64,
}

impl Default for CameraSteps {
    fn default() -> Self {
        Self { rotate_deg: 5.0, pan_px: 20.0, zoom: 0.1, wheel_zoom: 0.001 }
    }
}

pub struct CameraController {
    state: CameraState,
    home: CameraState,
    drag: DragState,
    limits: CameraLimits,
    steps: CameraSteps,
    attached: bool,
    /// Degrees per second, None when the tour disables auto-rotate
    auto_rotate: Option<f64>,
    auto_rotate_paused: bool,
}

impl CameraController {
    pub fn new(home: CameraState, limits: CameraLimits, steps: CameraSteps) -> Self {
        Self {
            state: home,
            home,
            drag: DragState::Idle,
            limits,
            steps,
            attached: true,
            auto_rotate: None,
            auto_rotate_paused: false,
        }
    }

    pub fn with_auto_rotate(mut self, degrees_per_sec: f64) -> Self {
        self.auto_rotate = Some(degrees_per_sec).filter(|s| s.is_finite() && *s != 0.0);
        self
    }

    #[inline]
    pub fn state(&self) -> &CameraState {
        &self.state
    }

    pub fn home(&self) -> &CameraState {
        &self.home
    }

    pub fn drag_state(&self) -> DragState {
        self.drag
    }

    pub fn limits(&self) -> &CameraLimits {
        &self.limits
    }

    pub fn is_attached(&self) -> bool {
        self.attached
    }

    pub fn is_auto_rotating(&self) -> bool {
        self.attached && self.auto_rotate.is_some() && !self.auto_rotate_paused
    }

    fn apply(&mut self, delta: CameraDelta) -> bool {
        let next = camera::apply(&self.state, delta, &self.limits);
        let changed = next != self.state;
        self.state = next;
        changed
    }

    /// User input stops auto-rotate until the next reset
    fn user_input(&mut self) {
        self.auto_rotate_paused = true;
    }

    /// Feed one pointer event. Returns true when the camera moved.
    pub fn pointer(&mut self, event: PointerEvent) -> bool {
        if !self.attached {
            return false;
        }
        match event {
            PointerEvent::Down { x, y } => {
                self.user_input();
                self.drag = DragState::Dragging { origin: (x, y), last: (x, y) };
                false
            }
            PointerEvent::Move { x, y } => {
                let DragState::Dragging { origin, last } = self.drag else {
                    return false;
                };
                if !(x.is_finite() && y.is_finite()) {
                    return false;
                }
                self.drag = DragState::Dragging { origin, last: (x, y) };
                self.apply(CameraDelta::Drag { dx: x - last.0, dy: y - last.1 })
            }
            PointerEvent::Up | PointerEvent::Leave => {
                if let DragState::Dragging { origin, last } = self.drag {
                    debug!(
                        dx = %(last.0 - origin.0),
                        dy = %(last.1 - origin.1),
                        yaw = %self.state.yaw,
                        pitch = %self.state.pitch,
                        "drag_ended"
                    );
                }
                self.drag = DragState::Idle;
                false
            }
        }
    }

    /// Apply a camera key. Fullscreen and Escape are not camera keys and
    /// leave the state untouched.
    pub fn key(&mut self, key: KeyInput) -> bool {
        if !self.attached {
            return false;
        }
        let rotate = self.state.mode == camera::InteractionMode::Rotate;
        let r = self.steps.rotate_deg;
        let p = self.steps.pan_px;
        let delta = match key {
            KeyInput::Left if rotate => CameraDelta::Rotate { yaw: -r, pitch: 0.0 },
            KeyInput::Right if rotate => CameraDelta::Rotate { yaw: r, pitch: 0.0 },
            KeyInput::Up if rotate => CameraDelta::Rotate { yaw: 0.0, pitch: r },
            KeyInput::Down if rotate => CameraDelta::Rotate { yaw: 0.0, pitch: -r },
            KeyInput::Left => CameraDelta::Pan { x: -p, y: 0.0 },
            KeyInput::Right => CameraDelta::Pan { x: p, y: 0.0 },
            KeyInput::Up => CameraDelta::Pan { x: 0.0, y: -p },
            KeyInput::Down => CameraDelta::Pan { x: 0.0, y: p },
            KeyInput::ZoomIn => CameraDelta::Zoom(self.steps.zoom),
            KeyInput::ZoomOut => CameraDelta::Zoom(-self.steps.zoom),
            KeyInput::Reset => return self.reset(),
            KeyInput::ToggleMode => {
                self.toggle_mode();
                return true;
            }
            KeyInput::Fullscreen | KeyInput::Escape => return false,
        };
        self.user_input();
        self.apply(delta)
    }

    /// Mouse wheel; positive deltas (scrolling down) zoom out
    pub fn wheel(&mut self, delta: f64) -> bool {
        if !self.attached {
            return false;
        }
        self.user_input();
        self.apply(CameraDelta::Zoom(-delta * self.steps.wheel_zoom))
    }

    /// Pinch gesture; `scale` > 1 zooms in
    pub fn pinch(&mut self, scale: f64) -> bool {
        if !self.attached {
            return false;
        }
        self.user_input();
        self.apply(CameraDelta::ZoomFactor(scale))
    }

    /// Back to the viewpoint's declared rotation and the tour's default zoom
    pub fn reset(&mut self) -> bool {
        if !self.attached {
            return false;
        }
        let changed = self.state != self.home;
        self.state = self.home;
        self.auto_rotate_paused = false;
        changed
    }

    /// Swap drag interpretation; numeric values are untouched
    pub fn toggle_mode(&mut self) {
        if !self.attached {
            return;
        }
        self.state = self.state.with_mode_toggled();
        debug!(mode = %self.state.mode.as_str(), "camera_mode_toggled");
    }

    /// New viewpoint: adopt its home and reset onto it
    pub fn set_home(&mut self, rotation: AngularPosition, zoom: f64) {
        self.home = CameraState::home(rotation, zoom, &self.limits);
        self.drag = DragState::Idle;
        self.reset();
    }

    /// Advance auto-rotation by `dt`. Returns true when the camera moved.
    pub fn advance_auto_rotate(&mut self, dt: std::time::Duration) -> bool {
        let Some(speed) = self.auto_rotate else {
            return false;
        };
        if !self.attached || self.auto_rotate_paused || self.drag != DragState::Idle {
            return false;
        }
        self.apply(CameraDelta::Rotate { yaw: speed * dt.as_secs_f64(), pitch: 0.0 })
    }

    /// Remove input listeners; the camera is frozen from here on
    pub fn detach(&mut self) {
        self.attached = false;
        self.drag = DragState::Idle;
    }
}
