//! Error taxonomy for selection, tour data and session operations

use crate::domain::types::{SeatId, SeatStatus, ViewpointId};
use thiserror::Error;

/// Rejected selection attempts. None of these change state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SelectionError {
    #[error("seat {seat} is {} and cannot be selected", .status.as_str())]
    SeatUnavailable { seat: SeatId, status: SeatStatus },
    #[error("selection limit of {max} seats reached")]
    SelectionLimitReached { max: usize },
    #[error("unknown seat {0}")]
    UnknownSeat(SeatId),
}

impl SelectionError {
    pub fn as_str(&self) -> &'static str {
        match self {
            SelectionError::SeatUnavailable { .. } => "seat_unavailable",
            SelectionError::SelectionLimitReached { .. } => "selection_limit_reached",
            SelectionError::UnknownSeat(_) => "unknown_seat",
        }
    }
}

/// Structurally invalid tour content
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TourDataError {
    #[error("tour declares no viewpoints")]
    NoViewpoints,
    #[error("seat {0} is declared more than once")]
    DuplicateSeat(SeatId),
    #[error("viewpoint {viewpoint} references unknown seat {seat}")]
    UnknownSeat { viewpoint: ViewpointId, seat: SeatId },
    #[error("hotspot {hotspot} navigates to unknown viewpoint {target}")]
    UnknownNavigationTarget { hotspot: String, target: ViewpointId },
    #[error("invalid zoom settings: min={min} default={default} max={max}")]
    InvalidZoom { min: f64, default: f64, max: f64 },
    #[error("invalid route price {0}")]
    InvalidPricing(f64),
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("session is closed")]
    Closed,
    #[error(transparent)]
    Selection(#[from] SelectionError),
    #[error("unknown viewpoint {0}")]
    UnknownViewpoint(ViewpointId),
    #[error("unknown hotspot {0} in the active viewpoint")]
    UnknownHotspot(String),
    #[error("hotspot {0} is not a navigation hotspot")]
    NotNavigable(String),
    #[error("nothing selected")]
    EmptySelection,
    #[error("booking handoff failed: {0:#}")]
    Handoff(anyhow::Error),
}
