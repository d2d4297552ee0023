//! Marker projector - angular positions to screen anchors
//!
//! Rectilinear (gnomonic) perspective: the direction is rotated into the
//! camera frame (un-yaw, then un-pitch) and divided by depth. Horizontal
//! field of view is `base_hfov / zoom`, never wider than `MAX_HFOV_DEG`. Anything behind the camera or
//! outside the viewport rectangle is reported hidden at (0, 0) instead of
//! being placed somewhere misleading.
//!
//! Work per frame is bounded by the active viewpoint's hotspots and seat
//! list; the rest of the layout is never touched.

use crate::domain::camera::CameraState;
use crate::domain::types::{AngularPosition, HotspotStyle, MarkerKind, SeatId, SeatStatus, Viewpoint};
use crate::services::selection::SelectionController;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

/// Directions closer than this to the image plane count as behind the camera
const MIN_DEPTH: f64 = 1e-6;
/// Widest horizontal fov a rectilinear view can show; zooming out further
/// only holds the view here
pub const MAX_HFOV_DEG: f64 = 150.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
    /// Horizontal field of view at zoom 1.0
    pub base_hfov_deg: f64,
}

impl Default for Viewport {
    fn default() -> Self {
        Self { width: 1280.0, height: 720.0, base_hfov_deg: 90.0 }
    }
}

impl Viewport {
    /// Same fov, new size. Degenerate sizes are rejected.
    pub fn resized(&self, width: f64, height: f64) -> Option<Viewport> {
        let ok = |v: f64| v.is_finite() && v > 0.0;
        (ok(width) && ok(height)).then_some(Viewport { width, height, ..*self })
    }

    /// Effective horizontal fov in degrees at `zoom`, capped at `MAX_HFOV_DEG`
    pub fn hfov_deg(&self, zoom: f64) -> f64 {
        if !(zoom.is_finite() && zoom > 0.0) {
            return MAX_HFOV_DEG;
        }
        (self.base_hfov_deg / zoom).min(MAX_HFOV_DEG)
    }

    /// Pixels per unit of tangent at `zoom`
    fn focal_length(&self, zoom: f64) -> f64 {
        (self.width / 2.0) / (self.hfov_deg(zoom).to_radians() / 2.0).tan()
    }

    fn contains(&self, x: f64, y: f64) -> bool {
        (0.0..=self.width).contains(&x) && (0.0..=self.height).contains(&y)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Projection {
    pub x: f64,
    pub y: f64,
    pub visible: bool,
}

impl Projection {
    pub const HIDDEN: Projection = Projection { x: 0.0, y: 0.0, visible: false };
}

/// Map one angular position to the screen under `camera`
pub fn project(position: AngularPosition, camera: &CameraState, viewport: &Viewport) -> Projection {
    let (yaw, pitch) = (position.yaw.to_radians(), position.pitch.to_radians());
    let (cam_yaw, cam_pitch) = (camera.yaw.to_radians(), camera.pitch.to_radians());

    // Unit direction: x right, y up, z forward at yaw 0
    let dx = pitch.cos() * yaw.sin();
    let dy = pitch.sin();
    let dz = pitch.cos() * yaw.cos();

    let x1 = dx * cam_yaw.cos() - dz * cam_yaw.sin();
    let z1 = dx * cam_yaw.sin() + dz * cam_yaw.cos();

    let y2 = dy * cam_pitch.cos() - z1 * cam_pitch.sin();
    let z2 = dy * cam_pitch.sin() + z1 * cam_pitch.cos();

    if z2.is_nan() || z2 <= MIN_DEPTH {
        return Projection::HIDDEN;
    }

    let f = viewport.focal_length(camera.zoom);
    let x = viewport.width / 2.0 + f * x1 / z2 + camera.pan.x;
    let y = viewport.height / 2.0 - f * y2 / z2 + camera.pan.y;

    if !viewport.contains(x, y) {
        return Projection::HIDDEN;
    }
    Projection { x, y, visible: true }
}

/// One marker of the active viewpoint, ready for the presentation layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectedMarker {
    /// Hotspot id, or the seat id for seats listed without a hotspot
    pub id: String,
    #[serde(flatten)]
    pub kind: MarkerKind,
    pub position: AngularPosition,
    /// Effective status for seat markers
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seat_status: Option<SeatStatus>,
    #[serde(default)]
    pub selected: bool,
    #[serde(default)]
    pub style: HotspotStyle,
    pub projection: Projection,
}

/// Project every marker of `viewpoint`: hotspots in declared order, then the
/// viewpoint's seats not already covered by a seat hotspot.
pub fn project_viewpoint(
    viewpoint: &Viewpoint,
    selection: &SelectionController,
    camera: &CameraState,
    viewport: &Viewport,
) -> Vec<ProjectedMarker> {
    let inventory = selection.inventory();
    let mut markers = Vec::with_capacity(viewpoint.hotspots.len() + viewpoint.seat_ids.len());
    let mut covered: SmallVec<[&SeatId; 8]> = SmallVec::new();

    for hotspot in &viewpoint.hotspots {
        let (seat_status, selected) = match &hotspot.kind {
            MarkerKind::Seat { seat_id } => {
                covered.push(seat_id);
                (inventory.status(seat_id), selection.is_selected(seat_id))
            }
            _ => (None, false),
        };
        markers.push(ProjectedMarker {
            id: hotspot.id.clone(),
            kind: hotspot.kind.clone(),
            position: hotspot.position,
            seat_status,
            selected,
            style: hotspot.style.clone(),
            projection: project(hotspot.position, camera, viewport),
        });
    }

    for seat_id in &viewpoint.seat_ids {
        if covered.contains(&seat_id) {
            continue;
        }
        let Some(seat) = inventory.get(seat_id) else {
            continue;
        };
        markers.push(ProjectedMarker {
            id: seat.id.to_string(),
            kind: MarkerKind::Seat { seat_id: seat.id.clone() },
            position: seat.angular,
            seat_status: Some(seat.status),
            selected: selection.is_selected(&seat.id),
            style: HotspotStyle::default(),
            projection: project(seat.angular, camera, viewport),
        });
    }

    markers
}
