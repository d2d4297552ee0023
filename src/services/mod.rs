//! Services - session state and the logic that mutates it
//!
//! This module contains the core services:
//! - `inventory` - Seat lookup by id and layout order
//! - `selection` - Single writer of the selection set and seat statuses
//! - `recommend` - Deterministic seat suggestions
//! - `feed` - Status feed sources (simulated timer, off) and task guard
//! - `camera` - Pointer/keyboard glue over the pure camera math
//! - `projector` - Panorama-to-screen marker projection
//! - `session` - Tour session orchestrator

pub mod camera;
pub mod feed;
pub mod inventory;
pub mod projector;
pub mod recommend;
pub mod selection;
pub mod session;

// Re-export commonly used types
pub use camera::{CameraController, CameraSteps, KeyInput, PointerEvent};
pub use feed::{NullFeed, ProposalGenerator, SimulatedFeed, StatusFeed};
pub use selection::{SelectionController, StatusChange};
pub use session::{CloseReason, SessionEvent, SessionOptions, SessionSummary, TourSession};
