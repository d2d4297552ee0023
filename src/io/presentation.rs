//! Typed channel towards the presentation layer
//!
//! The session pushes a full `SessionUpdate` after every state change and
//! discrete `Notice`s for things the user must be told about. Sending never
//! blocks the session: when the view lags, surplus updates are dropped and
//! counted, but notices always arrive.

use crate::domain::camera::CameraState;
use crate::domain::types::{SeatId, SeatStatus, ViewpointId};
use crate::infra::metrics::Metrics;
use crate::services::projector::ProjectedMarker;
use crate::services::selection::SeatView;
use crate::services::session::SessionSummary;
use serde::Serialize;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TryRecvError;
use tracing::debug;

/// Everything a view needs to redraw
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionUpdate {
    pub viewpoint: ViewpointId,
    pub viewpoint_name: String,
    pub camera: CameraState,
    pub fullscreen: bool,
    /// Active viewpoint only
    pub markers: Vec<ProjectedMarker>,
    /// Selection order
    pub selection: Vec<SeatId>,
    pub max_selectable: usize,
    /// Every seat with its effective status, layout order
    pub seats: Vec<SeatView>,
    /// Empty when recommendations are disabled
    pub recommendations: Vec<SeatId>,
    pub total_price: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "notice", rename_all = "snake_case")]
pub enum Notice {
    /// A selected seat was taken by the live feed
    SelectionRevoked { seat_id: SeatId, status: SeatStatus },
    SelectRejected { seat_id: SeatId, reason: &'static str, message: String },
    ViewpointChanged { from: ViewpointId, to: ViewpointId },
    BookingSubmitted { booking_id: String, seat_ids: Vec<SeatId>, total_price: f64 },
    BookingFailed { error: String },
    /// The tour's default viewpoint is missing; the first one is used
    DefaultViewpointFallback { requested: ViewpointId, used: ViewpointId },
    FullscreenChanged { fullscreen: bool },
}

impl Notice {
    pub fn as_str(&self) -> &'static str {
        match self {
            Notice::SelectionRevoked { .. } => "selection_revoked",
            Notice::SelectRejected { .. } => "select_rejected",
            Notice::ViewpointChanged { .. } => "viewpoint_changed",
            Notice::BookingSubmitted { .. } => "booking_submitted",
            Notice::BookingFailed { .. } => "booking_failed",
            Notice::DefaultViewpointFallback { .. } => "default_viewpoint_fallback",
            Notice::FullscreenChanged { .. } => "fullscreen_changed",
        }
    }
}

#[derive(Debug, Clone)]
pub enum PresentationMessage {
    Update(Box<SessionUpdate>),
    Notice(Notice),
    /// Final message of a session
    Closed(SessionSummary),
}

/// Non-blocking sender for presentation messages.
///
/// Updates are full snapshots: while `capacity` of them are still unread,
/// further ones are dropped and the view catches up with the next one sent.
/// Notices and the final `Closed` are never dropped. Everything is received
/// in send order.
#[derive(Clone)]
pub struct UpdateSender {
    tx: mpsc::UnboundedSender<PresentationMessage>,
    /// Updates sent but not yet received
    pending_updates: Arc<AtomicUsize>,
    capacity: usize,
    metrics: Arc<Metrics>,
}

impl UpdateSender {
    pub fn send_update(&self, update: SessionUpdate) {
        if self.pending_updates.fetch_add(1, Ordering::Relaxed) >= self.capacity {
            self.pending_updates.fetch_sub(1, Ordering::Relaxed);
            self.metrics.record_update_dropped();
            debug!("presentation_update_dropped");
            return;
        }
        if !self.send(PresentationMessage::Update(Box::new(update))) {
            self.pending_updates.fetch_sub(1, Ordering::Relaxed);
        }
    }

    pub fn send_notice(&self, notice: Notice) {
        self.send(PresentationMessage::Notice(notice));
    }

    pub fn send_closed(&self, summary: SessionSummary) {
        self.send(PresentationMessage::Closed(summary));
    }

    fn send(&self, msg: PresentationMessage) -> bool {
        match self.tx.send(msg) {
            Ok(()) => {
                self.metrics.record_update_sent();
                true
            }
            // View already gone; nothing to tell
            Err(_) => false,
        }
    }
}

/// Receiving end of the presentation channel
pub struct PresentationReceiver {
    rx: mpsc::UnboundedReceiver<PresentationMessage>,
    pending_updates: Arc<AtomicUsize>,
}

impl PresentationReceiver {
    /// Next message; `None` once the session side is gone and drained
    pub async fn recv(&mut self) -> Option<PresentationMessage> {
        let msg = self.rx.recv().await?;
        Some(self.delivered(msg))
    }

    pub fn try_recv(&mut self) -> Result<PresentationMessage, TryRecvError> {
        self.rx.try_recv().map(|msg| self.delivered(msg))
    }

    fn delivered(&self, msg: PresentationMessage) -> PresentationMessage {
        if matches!(msg, PresentationMessage::Update(_)) {
            self.pending_updates.fetch_sub(1, Ordering::Relaxed);
        }
        msg
    }
}

/// Create a presentation channel holding at most `capacity` pending updates
pub fn create_presentation_channel(
    capacity: usize,
    metrics: Arc<Metrics>,
) -> (UpdateSender, PresentationReceiver) {
    let (tx, rx) = mpsc::unbounded_channel();
    let pending_updates = Arc::new(AtomicUsize::new(0));
    let sender = UpdateSender { tx, pending_updates: pending_updates.clone(), capacity, metrics };
    (sender, PresentationReceiver { rx, pending_updates })
}
