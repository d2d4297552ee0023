//! IO modules - external collaborators
//!
//! This module contains all external IO operations:
//! - `tour_loader` - Tour content provider (JSON files)
//! - `presentation` - Typed channel towards the presentation layer
//! - `handoff` - Booking handoff (JSONL output)
//! - `mqtt_feed` - Push-based seat status feed over MQTT
//! - `commands` - Line commands for the headless console

pub mod commands;
pub mod handoff;
pub mod mqtt_feed;
pub mod presentation;
pub mod tour_loader;

// Re-export commonly used types
pub use commands::{parse_command, ConsoleCommand};
pub use handoff::{BookingHandoff, JsonlHandoff};
pub use mqtt_feed::{MqttFeedSettings, MqttStatusFeed};
pub use presentation::{
    create_presentation_channel, Notice, PresentationMessage, PresentationReceiver, SessionUpdate,
    UpdateSender,
};
pub use tour_loader::{load_tour, parse_tour};
