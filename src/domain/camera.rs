//! Camera state and its pure transition function
//!
//! Every constructor and transition returns a state that is already within
//! bounds: yaw in [0, 360), pitch in [-90, 90], zoom in [zoom_min, zoom_max],
//! pan within ±max_pan. Non-finite inputs count as zero.

use crate::domain::types::AngularPosition;
use serde::{Deserialize, Serialize};

pub const PITCH_LIMIT_DEG: f64 = 90.0;

/// How drag deltas are interpreted
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InteractionMode {
    #[default]
    Rotate,
    Move,
}

impl InteractionMode {
    pub fn toggled(self) -> Self {
        match self {
            InteractionMode::Rotate => InteractionMode::Move,
            InteractionMode::Move => InteractionMode::Rotate,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            InteractionMode::Rotate => "rotate",
            InteractionMode::Move => "move",
        }
    }
}

/// Screen-space pan offset in pixels
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PanOffset {
    pub x: f64,
    pub y: f64,
}

impl PanOffset {
    /// Neutral offset restored on reset
    pub const NEUTRAL: PanOffset = PanOffset { x: 0.0, y: 0.0 };
}

/// Bounds and sensitivities applied by every transition
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraLimits {
    pub zoom_min: f64,
    pub zoom_max: f64,
    pub max_pan: f64,
    /// Degrees of rotation per dragged pixel
    pub drag_sensitivity: f64,
}

impl Default for CameraLimits {
    fn default() -> Self {
        Self { zoom_min: 0.5, zoom_max: 3.0, max_pan: 1000.0, drag_sensitivity: 0.25 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CameraState {
    pub yaw: f64,
    pub pitch: f64,
    pub zoom: f64,
    pub pan: PanOffset,
    pub mode: InteractionMode,
}

/// One discrete change request
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CameraDelta {
    /// Relative rotation in degrees
    Rotate { yaw: f64, pitch: f64 },
    /// Relative pan in pixels
    Pan { x: f64, y: f64 },
    /// Additive zoom change
    Zoom(f64),
    /// Multiplicative zoom change (pinch)
    ZoomFactor(f64),
    /// Raw pointer movement in pixels, interpreted by the current mode
    Drag { dx: f64, dy: f64 },
}

/// Wrap any angle into [0, 360)
#[inline]
pub fn wrap_yaw(deg: f64) -> f64 {
    if !deg.is_finite() {
        return 0.0;
    }
    let wrapped = deg.rem_euclid(360.0);
    // rem_euclid can round up to exactly 360 for tiny negative inputs
    if wrapped >= 360.0 {
        0.0
    } else {
        wrapped
    }
}

#[inline]
pub fn clamp_pitch(deg: f64) -> f64 {
    if deg.is_nan() {
        return 0.0;
    }
    deg.clamp(-PITCH_LIMIT_DEG, PITCH_LIMIT_DEG)
}

#[inline]
fn finite_or_zero(v: f64) -> f64 {
    if v.is_finite() {
        v
    } else {
        0.0
    }
}

impl CameraLimits {
    #[inline]
    pub fn clamp_zoom(&self, zoom: f64) -> f64 {
        if zoom.is_nan() {
            return self.zoom_min;
        }
        zoom.clamp(self.zoom_min, self.zoom_max)
    }

    #[inline]
    pub fn clamp_pan(&self, pan: f64) -> f64 {
        if pan.is_nan() {
            return 0.0;
        }
        pan.clamp(-self.max_pan, self.max_pan)
    }
}

impl CameraState {
    /// State looking along `rotation` at `zoom`, pan neutral, rotate mode
    pub fn home(rotation: AngularPosition, zoom: f64, limits: &CameraLimits) -> Self {
        Self {
            yaw: wrap_yaw(rotation.yaw),
            pitch: clamp_pitch(rotation.pitch),
            zoom: limits.clamp_zoom(zoom),
            pan: PanOffset::NEUTRAL,
            mode: InteractionMode::Rotate,
        }
    }

    pub fn direction(&self) -> AngularPosition {
        AngularPosition::new(self.yaw, self.pitch)
    }

    /// Same numbers, other drag interpretation
    pub fn with_mode_toggled(self) -> Self {
        Self { mode: self.mode.toggled(), ..self }
    }

    /// True when every field is inside its declared bounds
    pub fn is_within(&self, limits: &CameraLimits) -> bool {
        (0.0..360.0).contains(&self.yaw)
            && (-PITCH_LIMIT_DEG..=PITCH_LIMIT_DEG).contains(&self.pitch)
            && (limits.zoom_min..=limits.zoom_max).contains(&self.zoom)
            && self.pan.x.abs() <= limits.max_pan
            && self.pan.y.abs() <= limits.max_pan
    }
}

/// Apply one delta and clamp the result in the same step
pub fn apply(state: &CameraState, delta: CameraDelta, limits: &CameraLimits) -> CameraState {
    let mut next = *state;
    match delta {
        CameraDelta::Rotate { yaw, pitch } => {
            next.yaw = wrap_yaw(state.yaw + finite_or_zero(yaw));
            next.pitch = clamp_pitch(state.pitch + finite_or_zero(pitch));
        }
        CameraDelta::Pan { x, y } => {
            next.pan.x = limits.clamp_pan(state.pan.x + finite_or_zero(x));
            next.pan.y = limits.clamp_pan(state.pan.y + finite_or_zero(y));
        }
        CameraDelta::Zoom(dz) => {
            next.zoom = limits.clamp_zoom(state.zoom + finite_or_zero(dz));
        }
        CameraDelta::ZoomFactor(factor) => {
            let factor = if factor.is_finite() && factor > 0.0 { factor } else { 1.0 };
            next.zoom = limits.clamp_zoom(state.zoom * factor);
        }
        CameraDelta::Drag { dx, dy } => {
            let (dx, dy) = (finite_or_zero(dx), finite_or_zero(dy));
            return match state.mode {
                // Grab-and-drag: the panorama follows the pointer
                InteractionMode::Rotate => apply(
                    state,
                    CameraDelta::Rotate {
                        yaw: -dx * limits.drag_sensitivity,
                        pitch: dy * limits.drag_sensitivity,
                    },
                    limits,
                ),
                InteractionMode::Move => apply(state, CameraDelta::Pan { x: dx, y: dy }, limits),
            };
        }
    }
    next
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limits() -> CameraLimits {
        CameraLimits { zoom_min: 0.5, zoom_max: 3.0, max_pan: 400.0, drag_sensitivity: 0.5 }
    }

    fn state_at(yaw: f64, pitch: f64) -> CameraState {
        CameraState::home(AngularPosition::new(yaw, pitch), 1.0, &limits())
    }

    #[test]
    fn test_yaw_wraps_past_360() {
        let s = apply(&state_at(350.0, 0.0), CameraDelta::Rotate { yaw: 20.0, pitch: 0.0 }, &limits());
        assert!((s.yaw - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_yaw_wraps_below_zero() {
        let s = apply(&state_at(5.0, 0.0), CameraDelta::Rotate { yaw: -10.0, pitch: 0.0 }, &limits());
        assert!((s.yaw - 355.0).abs() < 1e-9);
    }

    #[test]
    fn test_wrap_yaw_edges() {
        assert_eq!(wrap_yaw(360.0), 0.0);
        assert_eq!(wrap_yaw(-360.0), 0.0);
        assert_eq!(wrap_yaw(720.5), 0.5);
        assert!(wrap_yaw(-1e-18) < 360.0);
        assert_eq!(wrap_yaw(f64::NAN), 0.0);
        assert_eq!(wrap_yaw(f64::INFINITY), 0.0);
    }

    #[test]
    fn test_pitch_clamped() {
        let up = apply(&state_at(0.0, 80.0), CameraDelta::Rotate { yaw: 0.0, pitch: 45.0 }, &limits());
        assert_eq!(up.pitch, 90.0);
        let down =
            apply(&state_at(0.0, -80.0), CameraDelta::Rotate { yaw: 0.0, pitch: -45.0 }, &limits());
        assert_eq!(down.pitch, -90.0);
    }

    #[test]
    fn test_zoom_clamped_both_ways() {
        let s = state_at(0.0, 0.0);
        assert_eq!(apply(&s, CameraDelta::Zoom(10.0), &limits()).zoom, 3.0);
        assert_eq!(apply(&s, CameraDelta::Zoom(-10.0), &limits()).zoom, 0.5);
        assert_eq!(apply(&s, CameraDelta::ZoomFactor(2.0), &limits()).zoom, 2.0);
        assert_eq!(apply(&s, CameraDelta::ZoomFactor(100.0), &limits()).zoom, 3.0);
    }

    #[test]
    fn test_malformed_deltas_are_ignored() {
        let s = state_at(45.0, 10.0);
        let l = limits();
        assert_eq!(apply(&s, CameraDelta::Rotate { yaw: f64::NAN, pitch: f64::INFINITY }, &l), s);
        assert_eq!(apply(&s, CameraDelta::Zoom(f64::NAN), &l), s);
        assert_eq!(apply(&s, CameraDelta::ZoomFactor(-2.0), &l), s);
        assert_eq!(apply(&s, CameraDelta::ZoomFactor(0.0), &l), s);
        assert_eq!(apply(&s, CameraDelta::Drag { dx: f64::NAN, dy: f64::NEG_INFINITY }, &l), s);
    }

    #[test]
    fn test_drag_rotates_in_rotate_mode() {
        let s = apply(&state_at(100.0, 0.0), CameraDelta::Drag { dx: 20.0, dy: -10.0 }, &limits());
        assert!((s.yaw - 90.0).abs() < 1e-9);
        assert!((s.pitch - -5.0).abs() < 1e-9);
        assert_eq!(s.pan, PanOffset::NEUTRAL);
    }

    #[test]
    fn test_drag_pans_in_move_mode() {
        let start = state_at(100.0, 0.0).with_mode_toggled();
        let s = apply(&start, CameraDelta::Drag { dx: 20.0, dy: -10.0 }, &limits());
        assert_eq!(s.yaw, 100.0);
        assert_eq!(s.pan, PanOffset { x: 20.0, y: -10.0 });
    }

    #[test]
    fn test_pan_clamped() {
        let start = state_at(0.0, 0.0);
        let s = apply(&start, CameraDelta::Pan { x: 1000.0, y: -1000.0 }, &limits());
        assert_eq!(s.pan, PanOffset { x: 400.0, y: -400.0 });
    }

    #[test]
    fn test_toggle_keeps_numbers() {
        let s = apply(&state_at(33.0, 12.0), CameraDelta::Zoom(0.5), &limits());
        let toggled = s.with_mode_toggled();
        assert_eq!(toggled.mode, InteractionMode::Move);
        assert_eq!((toggled.yaw, toggled.pitch, toggled.zoom), (s.yaw, s.pitch, s.zoom));
        assert_eq!(toggled.with_mode_toggled(), s);
    }

    #[test]
    fn test_home_normalizes_declared_rotation() {
        let s = CameraState::home(AngularPosition::new(-90.0, 120.0), 9.0, &limits());
        assert_eq!(s.yaw, 270.0);
        assert_eq!(s.pitch, 90.0);
        assert_eq!(s.zoom, 3.0);
        assert!(s.is_within(&limits()));
    }

    #[test]
    fn test_invariants_hold_over_a_long_input_sequence() {
        let l = limits();
        let mut s = state_at(0.0, 0.0);
        let deltas = [
            CameraDelta::Rotate { yaw: 725.0, pitch: 300.0 },
            CameraDelta::Drag { dx: -9000.0, dy: 4000.0 },
            CameraDelta::Zoom(-7.0),
            CameraDelta::ZoomFactor(40.0),
            CameraDelta::Pan { x: 1e9, y: -1e9 },
            CameraDelta::Rotate { yaw: -1e7, pitch: -1e7 },
        ];
        for (i, d) in deltas.iter().cycle().take(60).enumerate() {
            if i % 7 == 0 {
                s = s.with_mode_toggled();
            }
            s = apply(&s, *d, &l);
            assert!(s.is_within(&l), "out of bounds after step {}: {:?}", i, s);
        }
    }
}
