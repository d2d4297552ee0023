//! Domain models - tour content, camera math, booking payloads and errors
//!
//! This module contains the canonical data types used throughout the engine:
//! - `types` - seats, hotspots, viewpoints, layout and the `Tour` aggregate
//! - `camera` - `CameraState` and its pure, clamping transition function
//! - `booking` - pricing modes and the booking handoff payload
//! - `error` - selection, tour data and session errors

pub mod booking;
pub mod camera;
pub mod error;
pub mod types;

// Re-export commonly used types at module level
pub use booking::{BookingRequest, PricingMode, RouteInfo};
pub use camera::{CameraDelta, CameraLimits, CameraState, InteractionMode, PanOffset};
pub use error::{SelectionError, SessionError, TourDataError};
pub use types::{
    AngularPosition, BusLayout, Hotspot, MarkerKind, Seat, SeatId, SeatPosition, SeatStatus,
    SeatType, Tour, TourSettings, Viewpoint, ViewpointId,
};
