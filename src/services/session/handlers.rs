//! Operation handlers for TourSession

use super::{CloseReason, HotspotActivation, TourSession};
use crate::domain::booking::BookingRequest;
use crate::domain::error::SessionError;
use crate::domain::types::{MarkerKind, SeatId, ViewpointId};
use crate::io::handoff::BookingHandoff;
use crate::io::presentation::Notice;
use crate::services::camera::{KeyInput, PointerEvent};
use crate::services::recommend::recommend;
use crate::services::selection::{ReconcileOutcome, SelectOutcome, StatusChange};
use std::time::Duration;
use tracing::{debug, error, info};

impl TourSession {
    #[inline]
    fn ensure_open(&self) -> Result<(), SessionError> {
        if self.is_closed() {
            Err(SessionError::Closed)
        } else {
            Ok(())
        }
    }

    /// Add a seat to the selection. Rejections leave state untouched and are
    /// surfaced both to the caller and as a notice.
    pub fn select(&mut self, id: &SeatId) -> Result<SelectOutcome, SessionError> {
        self.ensure_open()?;
        match self.selection.select(id) {
            Ok(SelectOutcome::Added) => {
                self.metrics.record_select();
                self.publish(true);
                Ok(SelectOutcome::Added)
            }
            Ok(SelectOutcome::AlreadySelected) => Ok(SelectOutcome::AlreadySelected),
            Err(e) => {
                self.metrics.record_select_rejected(&e);
                self.notify(Notice::SelectRejected {
                    seat_id: id.clone(),
                    reason: e.as_str(),
                    message: e.to_string(),
                });
                Err(e.into())
            }
        }
    }

    /// Remove a seat; absent ids are a no-op
    pub fn deselect(&mut self, id: &SeatId) -> Result<bool, SessionError> {
        self.ensure_open()?;
        let removed = self.selection.deselect(id);
        if removed {
            self.metrics.record_deselect();
            self.publish(true);
        }
        Ok(removed)
    }

    /// Select when unselected, deselect otherwise. Returns the new membership.
    pub fn toggle_seat(&mut self, id: &SeatId) -> Result<bool, SessionError> {
        if self.selection.is_selected(id) {
            self.deselect(id)?;
            Ok(false)
        } else {
            self.select(id)?;
            Ok(true)
        }
    }

    /// Route one feed proposal through reconciliation. Returns None once the
    /// session is closed.
    pub fn apply_proposal(&mut self, change: StatusChange) -> Option<ReconcileOutcome> {
        if self.is_closed() {
            self.metrics.record_proposal_ignored();
            debug!(seat_id = %change.seat_id, "proposal_after_close_ignored");
            return None;
        }

        let outcome = self.selection.reconcile(change);
        match &outcome {
            ReconcileOutcome::Applied { .. } => {
                self.metrics.record_proposal(true);
                self.publish(true);
            }
            ReconcileOutcome::Revoked { seat_id, status, .. } => {
                self.metrics.record_proposal(true);
                self.metrics.record_revocation();
                self.notify(Notice::SelectionRevoked { seat_id: seat_id.clone(), status: *status });
                self.publish(true);
            }
            ReconcileOutcome::Unchanged { .. } | ReconcileOutcome::UnknownSeat { .. } => {
                self.metrics.record_proposal(false);
            }
        }
        Some(outcome)
    }

    /// Apply every proposal already queued by the feed
    pub fn drain_proposals(&mut self) -> usize {
        let Some(mut rx) = self.proposal_rx.take() else {
            return 0;
        };
        let mut applied = 0;
        while let Ok(change) = rx.try_recv() {
            self.apply_proposal(change);
            applied += 1;
        }
        self.proposal_rx = Some(rx);
        applied
    }

    /// Switch viewpoint; the camera resets onto the new viewpoint's home.
    /// Selecting the active viewpoint again only resets the camera.
    pub fn change_viewpoint(&mut self, id: &ViewpointId) -> Result<(), SessionError> {
        self.ensure_open()?;
        let idx = self
            .tour
            .viewpoint_index(id)
            .ok_or_else(|| SessionError::UnknownViewpoint(id.clone()))?;

        let from = self.viewpoint().id.clone();
        self.viewpoint_idx = idx;
        let rotation = self.tour.viewpoints[idx].default_rotation;
        self.camera.set_home(rotation, self.tour.settings.zoom_default);

        if from != *id {
            self.metrics.record_viewpoint_change();
            info!(from = %from, to = %id, "viewpoint_changed");
            self.notify(Notice::ViewpointChanged { from, to: id.clone() });
        }
        self.publish(false);
        Ok(())
    }

    /// Follow a navigation hotspot of the active viewpoint
    pub fn navigate(&mut self, hotspot_id: &str) -> Result<ViewpointId, SessionError> {
        self.ensure_open()?;
        let hotspot = self
            .viewpoint()
            .hotspot(hotspot_id)
            .ok_or_else(|| SessionError::UnknownHotspot(hotspot_id.to_string()))?;
        let MarkerKind::Navigation { target, .. } = &hotspot.kind else {
            return Err(SessionError::NotNavigable(hotspot_id.to_string()));
        };
        let target = target.clone();
        self.change_viewpoint(&target)?;
        Ok(target)
    }

    /// Activate any hotspot of the active viewpoint
    pub fn activate_hotspot(&mut self, hotspot_id: &str) -> Result<HotspotActivation, SessionError> {
        self.ensure_open()?;
        let kind = self
            .viewpoint()
            .hotspot(hotspot_id)
            .map(|h| h.kind.clone())
            .ok_or_else(|| SessionError::UnknownHotspot(hotspot_id.to_string()))?;

        match kind {
            MarkerKind::Navigation { .. } => self.navigate(hotspot_id).map(HotspotActivation::Navigated),
            MarkerKind::Seat { seat_id } => {
                let selected = self.toggle_seat(&seat_id)?;
                Ok(HotspotActivation::SeatToggled { seat_id, selected })
            }
            other => {
                debug!(hotspot = %hotspot_id, kind = %other.as_str(), "hotspot_displayed");
                Ok(HotspotActivation::Displayed(other))
            }
        }
    }

    fn camera_moved(&mut self, moved: bool) -> bool {
        if moved {
            self.metrics.record_camera_update();
            self.publish(false);
        }
        moved
    }

    pub fn handle_pointer(&mut self, event: PointerEvent) -> bool {
        let moved = self.camera.pointer(event);
        self.camera_moved(moved)
    }

    /// Keyboard input. Escape leaves fullscreen first and closes otherwise.
    pub fn handle_key(&mut self, key: KeyInput) -> bool {
        if self.is_closed() {
            return false;
        }
        match key {
            KeyInput::Escape => {
                if self.fullscreen {
                    self.set_fullscreen(false);
                } else {
                    self.close(CloseReason::Escape);
                }
                true
            }
            KeyInput::Fullscreen => {
                if !self.options.fullscreen_enabled {
                    return false;
                }
                self.set_fullscreen(!self.fullscreen);
                true
            }
            key => {
                let moved = self.camera.key(key);
                self.camera_moved(moved)
            }
        }
    }

    pub fn handle_wheel(&mut self, delta: f64) -> bool {
        let moved = self.camera.wheel(delta);
        self.camera_moved(moved)
    }

    pub fn handle_pinch(&mut self, scale: f64) -> bool {
        let moved = self.camera.pinch(scale);
        self.camera_moved(moved)
    }

    /// Viewport size change; invalid sizes are ignored
    pub fn resize(&mut self, width: f64, height: f64) -> bool {
        if self.is_closed() {
            return false;
        }
        let Some(viewport) = self.viewport.resized(width, height) else {
            debug!(width = %width, height = %height, "resize_ignored");
            return false;
        };
        self.viewport = viewport;
        self.publish(false);
        true
    }

    /// Frame tick: advances auto-rotate
    pub fn tick(&mut self, dt: Duration) -> bool {
        if self.is_closed() {
            return false;
        }
        let moved = self.camera.advance_auto_rotate(dt);
        if moved {
            self.publish(false);
        }
        moved
    }

    pub(crate) fn set_fullscreen(&mut self, fullscreen: bool) {
        if self.fullscreen == fullscreen {
            return;
        }
        self.fullscreen = fullscreen;
        self.notify(Notice::FullscreenChanged { fullscreen });
        self.publish(false);
    }

    /// Up to three suggested seats; empty when disabled
    pub fn recommendations(&self) -> Vec<SeatId> {
        if !self.options.show_recommendations {
            return Vec::new();
        }
        recommend(self.selection.inventory().seats(), self.selection.selection())
    }

    /// Running total for the current selection under the tour's pricing mode
    pub fn quote(&self) -> f64 {
        self.selection.total_price(&self.tour.settings.pricing)
    }

    /// Build the booking request and consume the selection
    pub fn confirm(&mut self) -> Result<BookingRequest, SessionError> {
        self.ensure_open()?;
        if self.selection.selection().is_empty() {
            return Err(SessionError::EmptySelection);
        }

        let total_price = self.quote();
        let seat_ids = self.selection.take_selection();
        let request = BookingRequest::new(
            &self.tour.id,
            seat_ids,
            total_price,
            self.tour.settings.pricing,
            self.tour.route.clone(),
        );
        info!(
            booking_id = %request.booking_id,
            seats = %request.seat_ids.len(),
            total_price = %request.total_price,
            "booking_confirmed"
        );
        self.publish(true);
        Ok(request)
    }

    /// Confirm and submit through `handoff`. A failed submission puts the
    /// seats back into the selection (where still available).
    pub async fn confirm_with(
        &mut self,
        handoff: &dyn BookingHandoff,
    ) -> Result<BookingRequest, SessionError> {
        let request = self.confirm()?;

        match handoff.submit(&request).await {
            Ok(()) => {
                self.metrics.record_booking(true);
                self.bookings.push(request.booking_id.clone());
                self.notify(Notice::BookingSubmitted {
                    booking_id: request.booking_id.clone(),
                    seat_ids: request.seat_ids.clone(),
                    total_price: request.total_price,
                });
                Ok(request)
            }
            Err(e) => {
                self.metrics.record_booking(false);
                error!(booking_id = %request.booking_id, error = %format!("{:#}", e), "booking_handoff_failed");
                self.selection.restore_selection(request.seat_ids);
                self.notify(Notice::BookingFailed { error: format!("{:#}", e) });
                self.publish(true);
                Err(SessionError::Handoff(e))
            }
        }
    }
}
