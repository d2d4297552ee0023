//! Tour content model: seats, hotspots, viewpoints, layout and settings
//!
//! Everything here is supplied once by the tour content provider and is
//! read-only for the lifetime of a session. Only seat status, the selection
//! and the camera mutate, and those live in the services layer.

use crate::domain::booking::{PricingMode, RouteInfo};
use crate::domain::error::TourDataError;
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};

/// Newtype wrapper for seat ids ("3B", "12A")
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SeatId(pub String);

impl SeatId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SeatId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SeatId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Newtype wrapper for viewpoint ids
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ViewpointId(pub String);

impl ViewpointId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ViewpointId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ViewpointId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Availability of a seat. Selection is NOT a status: it is membership in
/// the selection set, owned by the selection controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SeatStatus {
    Available,
    Occupied,
    Reserved,
    Disabled,
}

impl SeatStatus {
    #[inline]
    pub fn as_str(&self) -> &'static str {
        match self {
            SeatStatus::Available => "available",
            SeatStatus::Occupied => "occupied",
            SeatStatus::Reserved => "reserved",
            SeatStatus::Disabled => "disabled",
        }
    }

    #[inline]
    pub fn is_available(&self) -> bool {
        matches!(self, SeatStatus::Available)
    }
}

impl std::str::FromStr for SeatStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "available" => Ok(SeatStatus::Available),
            "occupied" => Ok(SeatStatus::Occupied),
            "reserved" => Ok(SeatStatus::Reserved),
            "disabled" => Ok(SeatStatus::Disabled),
            other => Err(format!("unknown seat status '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SeatType {
    Standard,
    Premium,
    Accessible,
    Sleeper,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SeatPosition {
    Window,
    Aisle,
    Middle,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Accessibility {
    #[serde(default)]
    pub wheelchair_accessible: bool,
    #[serde(default)]
    pub extra_legroom: bool,
}

/// Direction inside the panorama, in degrees.
/// Yaw grows to the right, pitch grows upwards.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct AngularPosition {
    pub yaw: f64,
    pub pitch: f64,
}

impl AngularPosition {
    pub const fn new(yaw: f64, pitch: f64) -> Self {
        Self { yaw, pitch }
    }
}

/// A single seat in the vehicle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Seat {
    pub id: SeatId,
    pub row: u32,
    pub column: char,
    #[serde(rename = "type")]
    pub seat_type: SeatType,
    pub position: SeatPosition,
    pub status: SeatStatus,
    pub price: f64,
    #[serde(default)]
    pub accessibility: Accessibility,
    /// Where the seat sits in the panorama of the viewpoints that show it
    pub angular: AngularPosition,
}

/// Presentation hints for a hotspot; opaque to the engine
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HotspotStyle {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scale: Option<f64>,
}

/// What a marker points at. Each variant carries only what its kind needs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MarkerKind {
    Seat { seat_id: SeatId },
    Amenity { label: String },
    Navigation { target: ViewpointId, label: String },
    Info { title: String, body: String },
}

impl MarkerKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MarkerKind::Seat { .. } => "seat",
            MarkerKind::Amenity { .. } => "amenity",
            MarkerKind::Navigation { .. } => "navigation",
            MarkerKind::Info { .. } => "info",
        }
    }
}

/// An interactive marker placed inside a viewpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hotspot {
    pub id: String,
    pub position: AngularPosition,
    #[serde(flatten)]
    pub kind: MarkerKind,
    #[serde(default)]
    pub style: HotspotStyle,
}

/// A named camera anchor inside the vehicle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Viewpoint {
    pub id: ViewpointId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub default_rotation: AngularPosition,
    #[serde(default)]
    pub hotspots: Vec<Hotspot>,
    /// Seats visible and selectable from here, in presentation order
    #[serde(default)]
    pub seat_ids: Vec<SeatId>,
}

impl Viewpoint {
    pub fn hotspot(&self, id: &str) -> Option<&Hotspot> {
        self.hotspots.iter().find(|h| h.id == id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AisleConfig {
    Single,
    Double,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Left,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmergencyExit {
    pub row: u32,
    pub side: Side,
}

/// Full seat collection plus the static layout furniture
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BusLayout {
    pub seats: Vec<Seat>,
    #[serde(default)]
    pub emergency_exits: Vec<EmergencyExit>,
    pub aisle: AisleConfig,
}

impl BusLayout {
    pub fn is_exit_row(&self, row: u32) -> bool {
        self.emergency_exits.iter().any(|e| e.row == row)
    }
}

fn default_zoom_min() -> f64 {
    0.5
}

fn default_zoom_max() -> f64 {
    3.0
}

fn default_zoom() -> f64 {
    1.0
}

fn default_rotate_speed() -> f64 {
    2.0
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TourSettings {
    #[serde(default = "default_zoom_min")]
    pub zoom_min: f64,
    #[serde(default = "default_zoom_max")]
    pub zoom_max: f64,
    #[serde(default = "default_zoom")]
    pub zoom_default: f64,
    #[serde(default)]
    pub auto_rotate: bool,
    /// Auto-rotate speed in degrees per second
    #[serde(default = "default_rotate_speed")]
    pub rotate_speed: f64,
    /// Declared booking total formula; never inferred from seat prices
    pub pricing: PricingMode,
}

/// Aggregate root handed over by the tour content provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tour {
    pub id: String,
    pub name: String,
    pub viewpoints: Vec<Viewpoint>,
    pub default_viewpoint: ViewpointId,
    pub layout: BusLayout,
    pub settings: TourSettings,
    pub route: RouteInfo,
}

impl Tour {
    pub fn viewpoint_index(&self, id: &ViewpointId) -> Option<usize> {
        self.viewpoints.iter().position(|v| &v.id == id)
    }

    pub fn viewpoint(&self, id: &ViewpointId) -> Option<&Viewpoint> {
        self.viewpoints.iter().find(|v| &v.id == id)
    }

    /// Index of the viewpoint a session should open on.
    ///
    /// Returns `(index, fell_back)`; a missing default degrades to the first
    /// declared viewpoint. Fails only when there is no viewpoint at all.
    pub fn initial_viewpoint(&self) -> Result<(usize, bool), TourDataError> {
        if self.viewpoints.is_empty() {
            return Err(TourDataError::NoViewpoints);
        }
        match self.viewpoint_index(&self.default_viewpoint) {
            Some(idx) => Ok((idx, false)),
            None => Ok((0, true)),
        }
    }

    /// Structural checks run once at session construction
    pub fn validate(&self) -> Result<(), TourDataError> {
        if self.viewpoints.is_empty() {
            return Err(TourDataError::NoViewpoints);
        }

        let s = &self.settings;
        let zoom_ok = s.zoom_min.is_finite()
            && s.zoom_max.is_finite()
            && s.zoom_default.is_finite()
            && s.zoom_min > 0.0
            && s.zoom_min <= s.zoom_default
            && s.zoom_default <= s.zoom_max;
        if !zoom_ok {
            return Err(TourDataError::InvalidZoom {
                min: s.zoom_min,
                default: s.zoom_default,
                max: s.zoom_max,
            });
        }
        s.pricing.validate()?;

        let mut seat_ids: FxHashSet<&SeatId> = FxHashSet::default();
        for seat in &self.layout.seats {
            if !seat_ids.insert(&seat.id) {
                return Err(TourDataError::DuplicateSeat(seat.id.clone()));
            }
        }

        let viewpoint_ids: FxHashSet<&ViewpointId> =
            self.viewpoints.iter().map(|v| &v.id).collect();

        for viewpoint in &self.viewpoints {
            for seat_id in &viewpoint.seat_ids {
                if !seat_ids.contains(seat_id) {
                    return Err(TourDataError::UnknownSeat {
                        viewpoint: viewpoint.id.clone(),
                        seat: seat_id.clone(),
                    });
                }
            }
            for hotspot in &viewpoint.hotspots {
                match &hotspot.kind {
                    MarkerKind::Seat { seat_id } if !seat_ids.contains(seat_id) => {
                        return Err(TourDataError::UnknownSeat {
                            viewpoint: viewpoint.id.clone(),
                            seat: seat_id.clone(),
                        });
                    }
                    MarkerKind::Navigation { target, .. } if !viewpoint_ids.contains(target) => {
                        return Err(TourDataError::UnknownNavigationTarget {
                            hotspot: hotspot.id.clone(),
                            target: target.clone(),
                        });
                    }
                    _ => {}
                }
            }
        }

        Ok(())
    }
}
