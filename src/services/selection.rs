//! Selection controller - the single writer of the selection set
//!
//! Owns the seat inventory and the user's ordered selection. Both the
//! panoramic view and the 2D map read from here; there is no per-view copy.
//!
//! Key behaviors:
//! - select/deselect are idempotent
//! - a seat is only ever added while its status is available
//! - feed proposals arrive through `reconcile`, never as direct writes
//! - a proposal that makes a selected seat unavailable revokes the selection
//!   and still applies the new status

use crate::domain::booking::PricingMode;
use crate::domain::error::SelectionError;
use crate::domain::types::{Seat, SeatId, SeatStatus};
use crate::services::inventory::SeatInventory;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use tracing::{debug, info, warn};

/// A proposed status change, usually from the status feed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusChange {
    pub seat_id: SeatId,
    pub status: SeatStatus,
}

impl StatusChange {
    pub fn new(seat_id: impl Into<SeatId>, status: SeatStatus) -> Self {
        Self { seat_id: seat_id.into(), status }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectOutcome {
    Added,
    AlreadySelected,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// Status written to the inventory
    Applied { seat_id: SeatId, previous: SeatStatus, status: SeatStatus },
    /// Seat already had that status
    Unchanged { seat_id: SeatId },
    /// Seat was selected: selection dropped, status written
    Revoked { seat_id: SeatId, previous: SeatStatus, status: SeatStatus },
    /// Proposal referenced a seat the layout doesn't have
    UnknownSeat { seat_id: SeatId },
}

impl ReconcileOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReconcileOutcome::Applied { .. } => "applied",
            ReconcileOutcome::Unchanged { .. } => "unchanged",
            ReconcileOutcome::Revoked { .. } => "revoked",
            ReconcileOutcome::UnknownSeat { .. } => "unknown_seat",
        }
    }
}

/// Effective per-seat state for rendering
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeatView {
    pub id: SeatId,
    pub row: u32,
    pub column: char,
    pub status: SeatStatus,
    pub selected: bool,
    pub price: f64,
}

pub struct SelectionController {
    inventory: SeatInventory,
    /// Ordered set; insertion order is the booking order
    selected: SmallVec<[SeatId; 8]>,
    max_selectable: usize,
}

impl SelectionController {
    pub fn new(inventory: SeatInventory, max_selectable: usize) -> Self {
        Self { inventory, selected: SmallVec::new(), max_selectable }
    }

    pub fn inventory(&self) -> &SeatInventory {
        &self.inventory
    }

    pub fn selection(&self) -> &[SeatId] {
        &self.selected
    }

    pub fn max_selectable(&self) -> usize {
        self.max_selectable
    }

    #[inline]
    pub fn is_selected(&self, id: &SeatId) -> bool {
        self.selected.contains(id)
    }

    pub fn is_full(&self) -> bool {
        self.selected.len() >= self.max_selectable
    }

    /// Add a seat to the selection
    pub fn select(&mut self, id: &SeatId) -> Result<SelectOutcome, SelectionError> {
        if self.is_selected(id) {
            return Ok(SelectOutcome::AlreadySelected);
        }

        let seat = self.inventory.get(id).ok_or_else(|| SelectionError::UnknownSeat(id.clone()))?;
        if !seat.status.is_available() {
            debug!(seat_id = %id, status = %seat.status.as_str(), "select_rejected_unavailable");
            return Err(SelectionError::SeatUnavailable { seat: id.clone(), status: seat.status });
        }

        if self.is_full() {
            debug!(seat_id = %id, max = %self.max_selectable, "select_rejected_limit");
            return Err(SelectionError::SelectionLimitReached { max: self.max_selectable });
        }

        self.selected.push(id.clone());
        info!(seat_id = %id, selected = %self.selected.len(), "seat_selected");
        Ok(SelectOutcome::Added)
    }

    /// Remove a seat from the selection; no-op when absent
    pub fn deselect(&mut self, id: &SeatId) -> bool {
        let Some(pos) = self.selected.iter().position(|s| s == id) else {
            return false;
        };
        self.selected.remove(pos);
        info!(seat_id = %id, selected = %self.selected.len(), "seat_deselected");
        true
    }

    /// Resolve a proposed status change against the selection
    pub fn reconcile(&mut self, change: StatusChange) -> ReconcileOutcome {
        let StatusChange { seat_id, status } = change;

        let Some(previous) = self.inventory.status(&seat_id) else {
            warn!(seat_id = %seat_id, "status_change_unknown_seat");
            return ReconcileOutcome::UnknownSeat { seat_id };
        };

        if self.is_selected(&seat_id) && !status.is_available() {
            self.selected.retain(|s| s != &seat_id);
            self.inventory.set_status(&seat_id, status);
            warn!(
                seat_id = %seat_id,
                previous = %previous.as_str(),
                status = %status.as_str(),
                "selection_revoked"
            );
            return ReconcileOutcome::Revoked { seat_id, previous, status };
        }

        if previous == status {
            return ReconcileOutcome::Unchanged { seat_id };
        }

        self.inventory.set_status(&seat_id, status);
        debug!(
            seat_id = %seat_id,
            previous = %previous.as_str(),
            status = %status.as_str(),
            "status_applied"
        );
        ReconcileOutcome::Applied { seat_id, previous, status }
    }

    pub fn clear(&mut self) {
        self.selected.clear();
    }

    /// Hand the selection over (booking) leaving it empty
    pub fn take_selection(&mut self) -> Vec<SeatId> {
        std::mem::take(&mut self.selected).into_vec()
    }

    /// Put a previously taken selection back, skipping seats that are no
    /// longer selectable
    pub fn restore_selection(&mut self, seats: Vec<SeatId>) {
        for id in seats {
            let _ = self.select(&id);
        }
    }

    /// Selected seats in selection order
    pub fn selected_seats(&self) -> impl Iterator<Item = &Seat> + '_ {
        self.selected.iter().filter_map(|id| self.inventory.get(id))
    }

    /// Seats that are available and not selected, in layout order
    pub fn eligible_seat_ids(&self) -> Vec<SeatId> {
        self.inventory
            .with_status(SeatStatus::Available)
            .filter(|s| !self.is_selected(&s.id))
            .map(|s| s.id.clone())
            .collect()
    }

    pub fn seat_view(&self, seat: &Seat) -> SeatView {
        SeatView {
            id: seat.id.clone(),
            row: seat.row,
            column: seat.column,
            status: seat.status,
            selected: self.is_selected(&seat.id),
            price: seat.price,
        }
    }

    pub fn seat_views(&self) -> Vec<SeatView> {
        self.inventory.seats().iter().map(|s| self.seat_view(s)).collect()
    }

    pub fn total_price(&self, pricing: &PricingMode) -> f64 {
        pricing.total(self.selected_seats())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{ids, sample_tour};

    fn controller(max: usize) -> SelectionController {
        SelectionController::new(SeatInventory::from_layout(&sample_tour().layout), max)
    }

    fn id(s: &str) -> SeatId {
        SeatId::new(s)
    }

    #[test]
    fn test_select_available_seat() {
        let mut c = controller(4);
        assert_eq!(c.select(&id("1A")), Ok(SelectOutcome::Added));
        assert_eq!(c.selection(), ids(&["1A"]).as_slice());
    }

    #[test]
    fn test_select_is_idempotent() {
        let mut c = controller(4);
        c.select(&id("1A")).unwrap();
        assert_eq!(c.select(&id("1A")), Ok(SelectOutcome::AlreadySelected));
        assert_eq!(c.selection().len(), 1);
    }

    #[test]
    fn test_select_unavailable_fails_without_change() {
        let mut c = controller(4);
        let err = c.select(&id("2C")).unwrap_err();
        assert_eq!(
            err,
            SelectionError::SeatUnavailable { seat: id("2C"), status: SeatStatus::Occupied }
        );
        assert!(c.selection().is_empty());
        assert!(matches!(c.select(&id("5D")), Err(SelectionError::SeatUnavailable { .. })));
        assert!(matches!(c.select(&id("4D")), Err(SelectionError::SeatUnavailable { .. })));
    }

    #[test]
    fn test_limit_is_enforced() {
        let mut c = controller(2);
        c.select(&id("1A")).unwrap();
        c.select(&id("1B")).unwrap();
        assert_eq!(
            c.select(&id("1C")),
            Err(SelectionError::SelectionLimitReached { max: 2 })
        );
        assert_eq!(c.selection(), ids(&["1A", "1B"]).as_slice());
        // Re-selecting a member at capacity is still a no-op, not an error
        assert_eq!(c.select(&id("1B")), Ok(SelectOutcome::AlreadySelected));
    }

    #[test]
    fn test_unavailable_reported_before_limit() {
        let mut c = controller(1);
        c.select(&id("1A")).unwrap();
        assert!(matches!(c.select(&id("2C")), Err(SelectionError::SeatUnavailable { .. })));
    }

    #[test]
    fn test_unknown_seat() {
        let mut c = controller(4);
        assert_eq!(c.select(&id("42Q")), Err(SelectionError::UnknownSeat(id("42Q"))));
    }

    #[test]
    fn test_deselect_absent_is_noop() {
        let mut c = controller(4);
        c.select(&id("1A")).unwrap();
        assert!(!c.deselect(&id("3B")));
        assert!(c.deselect(&id("1A")));
        assert!(!c.deselect(&id("1A")));
        assert!(c.selection().is_empty());
    }

    #[test]
    fn test_selection_keeps_order_after_removal() {
        let mut c = controller(4);
        for s in ["3A", "1A", "4B"] {
            c.select(&id(s)).unwrap();
        }
        c.deselect(&id("1A"));
        c.select(&id("1B")).unwrap();
        assert_eq!(c.selection(), ids(&["3A", "4B", "1B"]).as_slice());
    }

    #[test]
    fn test_reconcile_unselected_applies_status() {
        let mut c = controller(4);
        let outcome = c.reconcile(StatusChange::new("3B", SeatStatus::Occupied));
        assert_eq!(
            outcome,
            ReconcileOutcome::Applied {
                seat_id: id("3B"),
                previous: SeatStatus::Available,
                status: SeatStatus::Occupied
            }
        );
        assert!(matches!(c.select(&id("3B")), Err(SelectionError::SeatUnavailable { .. })));
    }

    #[test]
    fn test_reconcile_selected_revokes_and_applies() {
        let mut c = controller(4);
        c.select(&id("5A")).unwrap();
        let outcome = c.reconcile(StatusChange::new("5A", SeatStatus::Occupied));
        assert!(matches!(outcome, ReconcileOutcome::Revoked { .. }));
        assert!(!c.is_selected(&id("5A")));
        assert_eq!(c.inventory().status(&id("5A")), Some(SeatStatus::Occupied));
    }

    #[test]
    fn test_reconcile_available_on_selected_keeps_selection() {
        let mut c = controller(4);
        c.select(&id("5A")).unwrap();
        let outcome = c.reconcile(StatusChange::new("5A", SeatStatus::Available));
        assert_eq!(outcome, ReconcileOutcome::Unchanged { seat_id: id("5A") });
        assert!(c.is_selected(&id("5A")));
    }

    #[test]
    fn test_reconcile_can_free_a_seat() {
        let mut c = controller(4);
        let outcome = c.reconcile(StatusChange::new("2C", SeatStatus::Available));
        assert!(matches!(outcome, ReconcileOutcome::Applied { .. }));
        assert_eq!(c.select(&id("2C")), Ok(SelectOutcome::Added));
    }

    #[test]
    fn test_reconcile_unknown_seat() {
        let mut c = controller(4);
        let outcome = c.reconcile(StatusChange::new("77X", SeatStatus::Reserved));
        assert_eq!(outcome, ReconcileOutcome::UnknownSeat { seat_id: id("77X") });
    }

    #[test]
    fn test_selection_only_ever_holds_available_seats() {
        let mut c = controller(6);
        let proposals = [
            ("1A", SeatStatus::Reserved),
            ("3B", SeatStatus::Occupied),
            ("2A", SeatStatus::Available),
        ];
        for s in ["1A", "1B", "3B", "2A"] {
            c.select(&id(s)).unwrap();
        }
        for (seat, status) in proposals {
            c.reconcile(StatusChange::new(seat, status));
            for selected in c.selection() {
                assert_eq!(c.inventory().status(selected), Some(SeatStatus::Available));
            }
        }
        assert_eq!(c.selection(), ids(&["1B", "2A"]).as_slice());
    }

    #[test]
    fn test_eligible_excludes_selected_and_unavailable() {
        let mut c = controller(4);
        c.select(&id("1A")).unwrap();
        let eligible = c.eligible_seat_ids();
        assert_eq!(eligible.len(), 16);
        assert!(!eligible.contains(&id("1A")));
        assert!(!eligible.contains(&id("2C")));
    }

    #[test]
    fn test_take_and_restore_selection() {
        let mut c = controller(4);
        c.select(&id("1A")).unwrap();
        c.select(&id("3C")).unwrap();
        let taken = c.take_selection();
        assert_eq!(taken, ids(&["1A", "3C"]));
        assert!(c.selection().is_empty());

        c.reconcile(StatusChange::new("3C", SeatStatus::Occupied));
        c.restore_selection(taken);
        assert_eq!(c.selection(), ids(&["1A"]).as_slice());
    }

    #[test]
    fn test_total_price_uses_selected_seats() {
        let mut c = controller(4);
        c.select(&id("1A")).unwrap(); // premium 250
        c.select(&id("3B")).unwrap(); // standard 150
        let based = PricingMode::SeatPlusBase { route_base_price: 700.0 };
        let flat = PricingMode::FlatPerSeat { route_price: 900.0 };
        assert_eq!(c.total_price(&based), 250.0 + 150.0 + 1400.0);
        assert_eq!(c.total_price(&flat), 1800.0);
    }

    #[test]
    fn test_seat_views_reflect_selection() {
        let mut c = controller(4);
        c.select(&id("1B")).unwrap();
        let views = c.seat_views();
        assert_eq!(views.len(), 20);
        let view = views.iter().find(|v| v.id == id("1B")).unwrap();
        assert!(view.selected);
        assert_eq!(view.status, SeatStatus::Available);
        assert!(!views.iter().find(|v| v.id == id("2C")).unwrap().selected);
    }
}
