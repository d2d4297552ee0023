//! Seat recommendations
//!
//! Pure and deterministic: the same seats and selection always produce the
//! same ids in the same order.

use crate::domain::types::{Seat, SeatId, SeatPosition, SeatType};
use smallvec::SmallVec;

/// Seats taken from each group
const PER_GROUP: usize = 2;
/// Overall cap on the result
const MAX_RECOMMENDATIONS: usize = 3;

/// Suggest up to three available, unselected seats: two window seats then
/// two premium seats, in layout order, each seat listed at most once.
pub fn recommend(seats: &[Seat], selection: &[SeatId]) -> Vec<SeatId> {
    let eligible = || {
        seats
            .iter()
            .filter(|s| s.status.is_available() && !selection.contains(&s.id))
    };

    let window = eligible().filter(|s| s.position == SeatPosition::Window).take(PER_GROUP);
    let premium = eligible().filter(|s| s.seat_type == SeatType::Premium).take(PER_GROUP);

    let mut picked: SmallVec<[&SeatId; 4]> = SmallVec::new();
    for seat in window.chain(premium) {
        if !picked.contains(&&seat.id) {
            picked.push(&seat.id);
        }
    }

    picked.into_iter().take(MAX_RECOMMENDATIONS).cloned().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::SeatStatus;
    use crate::testing::{ids, sample_tour, seat};

    #[test]
    fn test_window_then_premium_capped_at_three() {
        let tour = sample_tour();
        // Window: 1A, 1D (both also premium), premium: 1A, 1B -> 1A, 1D, 1B
        let recs = recommend(&tour.layout.seats, &[]);
        assert_eq!(recs, ids(&["1A", "1D", "1B"]));
    }

    #[test]
    fn test_selected_seats_are_skipped() {
        let tour = sample_tour();
        let recs = recommend(&tour.layout.seats, &ids(&["1A", "1D"]));
        // Window: 2A, 2D; premium: 1B, 1C
        assert_eq!(recs, ids(&["2A", "2D", "1B"]));
    }

    #[test]
    fn test_unavailable_seats_are_skipped() {
        let seats = vec![
            seat("1A", 1, 'A', SeatPosition::Window, SeatType::Standard, SeatStatus::Occupied),
            seat("1D", 1, 'D', SeatPosition::Window, SeatType::Standard, SeatStatus::Available),
            seat("2A", 2, 'A', SeatPosition::Window, SeatType::Premium, SeatStatus::Disabled),
            seat("2B", 2, 'B', SeatPosition::Aisle, SeatType::Premium, SeatStatus::Available),
        ];
        assert_eq!(recommend(&seats, &[]), ids(&["1D", "2B"]));
    }

    #[test]
    fn test_deterministic() {
        let tour = sample_tour();
        let selection = ids(&["3A"]);
        let first = recommend(&tour.layout.seats, &selection);
        let second = recommend(&tour.layout.seats, &selection);
        assert_eq!(first, second);
    }

    #[test]
    fn test_no_window_or_premium_left_yields_empty() {
        // 4 window + 4 aisle standard seats, all windows selected
        let mut seats = Vec::new();
        for row in 1..=2u32 {
            for (col, pos) in [
                ('A', SeatPosition::Window),
                ('B', SeatPosition::Aisle),
                ('C', SeatPosition::Aisle),
                ('D', SeatPosition::Window),
            ] {
                let id = format!("{}{}", row, col);
                seats.push(seat(&id, row, col, pos, SeatType::Standard, SeatStatus::Available));
            }
        }
        let selection = ids(&["1A", "1D", "2A", "2D"]);
        assert!(recommend(&seats, &selection).is_empty());
    }

    #[test]
    fn test_empty_layout() {
        assert!(recommend(&[], &[]).is_empty());
    }
}
