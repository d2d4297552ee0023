//! Seat inventory - read-only lookups over the layout's seats
//!
//! Layout order is preserved everywhere; recommendation and the 2D map both
//! depend on it. Status writes are crate-private and only the selection
//! controller performs them.

use crate::domain::types::{BusLayout, Seat, SeatId, SeatPosition, SeatStatus, SeatType};
use rustc_hash::FxHashMap;

pub struct SeatInventory {
    /// Seats in layout-declared order
    seats: Vec<Seat>,
    /// seat id -> index into `seats`
    index: FxHashMap<SeatId, usize>,
}

impl SeatInventory {
    pub fn new(seats: Vec<Seat>) -> Self {
        let index = seats.iter().enumerate().map(|(i, s)| (s.id.clone(), i)).collect();
        Self { seats, index }
    }

    pub fn from_layout(layout: &BusLayout) -> Self {
        Self::new(layout.seats.clone())
    }

    #[inline]
    pub fn get(&self, id: &SeatId) -> Option<&Seat> {
        self.index.get(id).map(|&i| &self.seats[i])
    }

    #[inline]
    pub fn status(&self, id: &SeatId) -> Option<SeatStatus> {
        self.get(id).map(|s| s.status)
    }

    #[inline]
    pub fn contains(&self, id: &SeatId) -> bool {
        self.index.contains_key(id)
    }

    pub fn seats(&self) -> &[Seat] {
        &self.seats
    }

    pub fn len(&self) -> usize {
        self.seats.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seats.is_empty()
    }

    pub fn by_row(&self, row: u32) -> impl Iterator<Item = &Seat> + '_ {
        self.seats.iter().filter(move |s| s.row == row)
    }

    pub fn with_status(&self, status: SeatStatus) -> impl Iterator<Item = &Seat> + '_ {
        self.seats.iter().filter(move |s| s.status == status)
    }

    pub fn with_position(&self, position: SeatPosition) -> impl Iterator<Item = &Seat> + '_ {
        self.seats.iter().filter(move |s| s.position == position)
    }

    pub fn with_type(&self, seat_type: SeatType) -> impl Iterator<Item = &Seat> + '_ {
        self.seats.iter().filter(move |s| s.seat_type == seat_type)
    }

    /// Distinct row numbers, ascending
    pub fn rows(&self) -> Vec<u32> {
        let mut rows: Vec<u32> = self.seats.iter().map(|s| s.row).collect();
        rows.sort_unstable();
        rows.dedup();
        rows
    }

    /// Overwrite a seat's status, returning the previous one
    pub(crate) fn set_status(&mut self, id: &SeatId, status: SeatStatus) -> Option<SeatStatus> {
        let &i = self.index.get(id)?;
        let seat = &mut self.seats[i];
        let previous = seat.status;
        seat.status = status;
        Some(previous)
    }
}
