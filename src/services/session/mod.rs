//! Tour session - owns one tour, its selection, camera and feed
//!
//! The session is the only component that talks to the presentation layer
//! and the booking handoff. It is also the only writer: every user input,
//! feed proposal and frame tick is applied here, one at a time, in arrival
//! order. After each mutation it republishes a full `SessionUpdate` and the
//! eligible-seat snapshot the feed draws from.
//!
//! Closing (explicitly, via Escape, when input ends, or on drop) disposes
//! the feed, detaches camera input and makes every later call a no-op.

mod handlers;

use crate::domain::camera::{CameraLimits, CameraState};
use crate::domain::error::{SessionError, TourDataError};
use crate::domain::types::{MarkerKind, SeatId, Tour, Viewpoint, ViewpointId};
use crate::infra::config::Config;
use crate::infra::metrics::Metrics;
use crate::io::handoff::BookingHandoff;
use crate::io::presentation::{Notice, SessionUpdate, UpdateSender};
use crate::services::camera::{CameraController, CameraSteps, KeyInput, PointerEvent};
use crate::services::feed::{EligibleSeats, FeedContext, StatusFeed};
use crate::services::inventory::SeatInventory;
use crate::services::projector::{project_viewpoint, Viewport};
use crate::services::selection::{SelectionController, StatusChange};
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, watch};
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};

/// Shortest frame tick `run` will schedule
const MIN_FRAME_INTERVAL: Duration = Duration::from_millis(1);

/// Typed session options, built once from configuration
#[derive(Debug, Clone)]
pub struct SessionOptions {
    pub max_selectable_seats: usize,
    pub show_recommendations: bool,
    /// Clear the selection on close; otherwise it is returned in the summary
    pub clear_selection_on_close: bool,
    pub fullscreen_enabled: bool,
    pub steps: CameraSteps,
    /// Degrees per dragged pixel
    pub drag_sensitivity: f64,
    pub max_pan_px: f64,
    pub viewport: Viewport,
    /// Frame tick for auto-rotate
    pub frame_interval: Duration,
    /// Buffered feed proposals
    pub proposal_capacity: usize,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

impl SessionOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            max_selectable_seats: config.max_selectable_seats(),
            show_recommendations: config.show_recommendations(),
            clear_selection_on_close: config.clear_selection_on_close(),
            fullscreen_enabled: config.fullscreen_enabled(),
            steps: CameraSteps {
                rotate_deg: config.rotate_step_deg(),
                pan_px: config.pan_step_px(),
                zoom: config.zoom_step(),
                wheel_zoom: config.wheel_zoom_step(),
            },
            drag_sensitivity: config.drag_sensitivity(),
            max_pan_px: config.max_pan_px(),
            viewport: Viewport {
                width: config.viewport_width(),
                height: config.viewport_height(),
                base_hfov_deg: config.base_hfov_deg(),
            },
            frame_interval: Duration::from_millis(config.frame_interval_ms()),
            proposal_capacity: 64,
        }
    }
}

/// Inputs the session understands
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    Select(SeatId),
    Deselect(SeatId),
    ToggleSeat(SeatId),
    ChangeViewpoint(ViewpointId),
    ActivateHotspot(String),
    Pointer(PointerEvent),
    Key(KeyInput),
    Wheel(f64),
    Pinch(f64),
    Resize { width: f64, height: f64 },
    Confirm,
    Close,
}

/// Result of activating a hotspot
#[derive(Debug, Clone, PartialEq)]
pub enum HotspotActivation {
    Navigated(ViewpointId),
    SeatToggled { seat_id: SeatId, selected: bool },
    /// Amenity or info marker: nothing changes, the view shows the payload
    Displayed(MarkerKind),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CloseReason {
    UserRequest,
    Escape,
    /// The input channel was closed
    InputClosed,
    /// The session was dropped without an explicit close
    Dropped,
}

impl CloseReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            CloseReason::UserRequest => "user_request",
            CloseReason::Escape => "escape",
            CloseReason::InputClosed => "input_closed",
            CloseReason::Dropped => "dropped",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSummary {
    pub tour_id: String,
    pub reason: CloseReason,
    pub viewpoint: ViewpointId,
    /// Only non-empty when the selection survives close
    pub retained_selection: Vec<SeatId>,
    /// Booking ids handed off during the session
    pub bookings: Vec<String>,
}

pub struct TourSession {
    pub(crate) tour: Arc<Tour>,
    pub(crate) options: SessionOptions,
    pub(crate) metrics: Arc<Metrics>,
    pub(crate) selection: SelectionController,
    pub(crate) camera: CameraController,
    pub(crate) viewpoint_idx: usize,
    pub(crate) viewport: Viewport,
    pub(crate) fullscreen: bool,
    pub(crate) presentation: Option<UpdateSender>,
    /// Raised before a presentation layer was attached
    pub(crate) pending_notices: Vec<Notice>,
    pub(crate) feed: Option<Box<dyn StatusFeed>>,
    pub(crate) proposal_tx: mpsc::Sender<StatusChange>,
    pub(crate) proposal_rx: Option<mpsc::Receiver<StatusChange>>,
    pub(crate) eligible_tx: watch::Sender<EligibleSeats>,
    pub(crate) bookings: Vec<String>,
    pub(crate) summary: Option<SessionSummary>,
}

impl TourSession {
    /// Validate the tour and open a session on its default viewpoint
    pub fn new(
        tour: Arc<Tour>,
        options: SessionOptions,
        metrics: Arc<Metrics>,
    ) -> Result<Self, TourDataError> {
        let (viewpoint_idx, fell_back) = tour.initial_viewpoint()?;
        tour.validate()?;

        let mut pending_notices = Vec::new();
        let viewpoint = &tour.viewpoints[viewpoint_idx];
        if fell_back {
            warn!(
                requested = %tour.default_viewpoint,
                used = %viewpoint.id,
                "default_viewpoint_missing"
            );
            pending_notices.push(Notice::DefaultViewpointFallback {
                requested: tour.default_viewpoint.clone(),
                used: viewpoint.id.clone(),
            });
        }

        let limits = CameraLimits {
            zoom_min: tour.settings.zoom_min,
            zoom_max: tour.settings.zoom_max,
            max_pan: options.max_pan_px,
            drag_sensitivity: options.drag_sensitivity,
        };
        let home = CameraState::home(viewpoint.default_rotation, tour.settings.zoom_default, &limits);
        let mut camera = CameraController::new(home, limits, options.steps);
        if tour.settings.auto_rotate {
            camera = camera.with_auto_rotate(tour.settings.rotate_speed);
        }

        let selection = SelectionController::new(
            SeatInventory::from_layout(&tour.layout),
            options.max_selectable_seats,
        );
        let (eligible_tx, _) = watch::channel::<EligibleSeats>(selection.eligible_seat_ids().into());
        let (proposal_tx, proposal_rx) = mpsc::channel(options.proposal_capacity.max(1));

        info!(
            tour_id = %tour.id,
            viewpoint = %viewpoint.id,
            seats = %selection.inventory().len(),
            max_selectable = %options.max_selectable_seats,
            pricing = %tour.settings.pricing.as_str(),
            "session_opened"
        );

        Ok(Self {
            viewport: options.viewport,
            tour,
            options,
            metrics,
            selection,
            camera,
            viewpoint_idx,
            fullscreen: false,
            presentation: None,
            pending_notices,
            feed: None,
            proposal_tx,
            proposal_rx: Some(proposal_rx),
            eligible_tx,
            bookings: Vec::new(),
            summary: None,
        })
    }

    /// Connect the presentation layer; it immediately receives any pending
    /// notices and a full update.
    pub fn attach_presentation(&mut self, sender: UpdateSender) {
        if self.is_closed() {
            return;
        }
        self.presentation = Some(sender);
        for notice in std::mem::take(&mut self.pending_notices) {
            self.notify(notice);
        }
        self.publish(false);
    }

    /// Subscribe a status feed, replacing (and disposing) any previous one
    pub fn start_feed(&mut self, mut feed: Box<dyn StatusFeed>) -> anyhow::Result<()> {
        if self.is_closed() {
            anyhow::bail!(SessionError::Closed);
        }
        if let Some(mut previous) = self.feed.take() {
            previous.dispose();
        }
        let ctx = FeedContext {
            proposals: self.proposal_tx.clone(),
            eligible: self.eligible_tx.subscribe(),
        };
        feed.subscribe(ctx)?;
        info!(feed = %feed.name(), "feed_attached");
        self.feed = Some(feed);
        Ok(())
    }

    pub fn tour(&self) -> &Tour {
        &self.tour
    }

    pub fn viewpoint(&self) -> &Viewpoint {
        &self.tour.viewpoints[self.viewpoint_idx]
    }

    pub fn camera(&self) -> &CameraState {
        self.camera.state()
    }

    pub fn selection(&self) -> &[SeatId] {
        self.selection.selection()
    }

    pub fn selection_controller(&self) -> &SelectionController {
        &self.selection
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn is_fullscreen(&self) -> bool {
        self.fullscreen
    }

    #[inline]
    pub fn is_closed(&self) -> bool {
        self.summary.is_some()
    }

    /// Full view state for the active viewpoint
    pub fn snapshot(&self) -> SessionUpdate {
        let viewpoint = self.viewpoint();
        SessionUpdate {
            viewpoint: viewpoint.id.clone(),
            viewpoint_name: viewpoint.name.clone(),
            camera: *self.camera.state(),
            fullscreen: self.fullscreen,
            markers: project_viewpoint(viewpoint, &self.selection, self.camera.state(), &self.viewport),
            selection: self.selection.selection().to_vec(),
            max_selectable: self.selection.max_selectable(),
            seats: self.selection.seat_views(),
            recommendations: self.recommendations(),
            total_price: self.quote(),
        }
    }

    /// Push state out. `seats_changed` also refreshes the feed's eligible set.
    pub(crate) fn publish(&mut self, seats_changed: bool) {
        if seats_changed {
            self.eligible_tx.send_replace(self.selection.eligible_seat_ids().into());
        }
        if let Some(presentation) = &self.presentation {
            presentation.send_update(self.snapshot());
        }
    }

    pub(crate) fn notify(&mut self, notice: Notice) {
        debug!(notice = %notice.as_str(), "notice_raised");
        match &self.presentation {
            Some(presentation) => presentation.send_notice(notice),
            None => self.pending_notices.push(notice),
        }
    }

    /// Handle one input event
    pub async fn process_event(
        &mut self,
        event: SessionEvent,
        handoff: &dyn BookingHandoff,
    ) -> Result<(), SessionError> {
        let process_start = Instant::now();

        let result = match event {
            SessionEvent::Select(id) => self.select(&id).map(|_| ()),
            SessionEvent::Deselect(id) => self.deselect(&id).map(|_| ()),
            SessionEvent::ToggleSeat(id) => self.toggle_seat(&id).map(|_| ()),
            SessionEvent::ChangeViewpoint(id) => self.change_viewpoint(&id),
            SessionEvent::ActivateHotspot(id) => self.activate_hotspot(&id).map(|_| ()),
            SessionEvent::Pointer(pointer) => {
                self.handle_pointer(pointer);
                Ok(())
            }
            SessionEvent::Key(key) => {
                self.handle_key(key);
                Ok(())
            }
            SessionEvent::Wheel(delta) => {
                self.handle_wheel(delta);
                Ok(())
            }
            SessionEvent::Pinch(scale) => {
                self.handle_pinch(scale);
                Ok(())
            }
            SessionEvent::Resize { width, height } => {
                self.resize(width, height);
                Ok(())
            }
            SessionEvent::Confirm => self.confirm_with(handoff).await.map(|_| ()),
            SessionEvent::Close => {
                self.close(CloseReason::UserRequest);
                Ok(())
            }
        };

        let latency_us = process_start.elapsed().as_micros() as u64;
        self.metrics.record_event_processed(latency_us);
        result
    }

    /// Run until closed: user events, feed proposals and the frame tick are
    /// applied one at a time. Ends when the session closes or `events` ends.
    pub async fn run(
        mut self,
        mut events: mpsc::Receiver<SessionEvent>,
        handoff: Arc<dyn BookingHandoff>,
    ) -> SessionSummary {
        let Some(mut proposals) = self.proposal_rx.take() else {
            warn!("session_already_running");
            return self.close(CloseReason::UserRequest);
        };

        let mut frame = interval(self.options.frame_interval.max(MIN_FRAME_INTERVAL));
        frame.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut last_frame = Instant::now();

        self.publish(true);
        info!(tour_id = %self.tour.id, "session_running");

        while !self.is_closed() {
            tokio::select! {
                event = events.recv() => match event {
                    Some(event) => {
                        if let Err(e) = self.process_event(event, handoff.as_ref()).await {
                            debug!(error = %e, "session_event_rejected");
                        }
                    }
                    None => {
                        self.close(CloseReason::InputClosed);
                    }
                },
                Some(change) = proposals.recv() => {
                    self.apply_proposal(change);
                }
                _ = frame.tick() => {
                    let now = Instant::now();
                    self.tick(now.duration_since(last_frame));
                    last_frame = now;
                }
            }
        }

        self.close(CloseReason::UserRequest)
    }

    /// Close the session. Idempotent: later calls return the first summary.
    pub fn close(&mut self, reason: CloseReason) -> SessionSummary {
        if let Some(summary) = &self.summary {
            return summary.clone();
        }

        if let Some(mut feed) = self.feed.take() {
            feed.dispose();
        }
        self.camera.detach();

        let retained_selection = if self.options.clear_selection_on_close {
            self.selection.clear();
            Vec::new()
        } else {
            self.selection.selection().to_vec()
        };

        let summary = SessionSummary {
            tour_id: self.tour.id.clone(),
            reason,
            viewpoint: self.viewpoint().id.clone(),
            retained_selection,
            bookings: self.bookings.clone(),
        };
        self.summary = Some(summary.clone());

        if let Some(presentation) = self.presentation.take() {
            presentation.send_closed(summary.clone());
        }

        info!(
            tour_id = %summary.tour_id,
            reason = %reason.as_str(),
            retained = %summary.retained_selection.len(),
            bookings = %summary.bookings.len(),
            "session_closed"
        );
        summary
    }
}

impl Drop for TourSession {
    fn drop(&mut self) {
        if !self.is_closed() {
            self.close(CloseReason::Dropped);
        }
    }
}
