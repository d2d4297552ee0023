//! Booking handoff payload and pricing
//!
//! Two sibling products computed totals with different formulas. The tour
//! declares which one applies; nothing here looks at seat prices to guess.

use crate::domain::error::TourDataError;
use crate::domain::types::{Seat, SeatId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Generate a new UUIDv7 (time-sortable)
pub fn new_uuid_v7() -> String {
    Uuid::now_v7().to_string()
}

/// How a booking total is computed
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum PricingMode {
    /// `total = seats × route_price`
    FlatPerSeat { route_price: f64 },
    /// `total = Σ seat.price + seats × route_base_price`
    SeatPlusBase { route_base_price: f64 },
}

impl PricingMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            PricingMode::FlatPerSeat { .. } => "flat_per_seat",
            PricingMode::SeatPlusBase { .. } => "seat_plus_base",
        }
    }

    pub fn validate(&self) -> Result<(), TourDataError> {
        let price = match self {
            PricingMode::FlatPerSeat { route_price } => *route_price,
            PricingMode::SeatPlusBase { route_base_price } => *route_base_price,
        };
        if price.is_finite() && price >= 0.0 {
            Ok(())
        } else {
            Err(TourDataError::InvalidPricing(price))
        }
    }

    /// Total for the given seats under this mode
    pub fn total<'a, I>(&self, seats: I) -> f64
    where
        I: IntoIterator<Item = &'a Seat>,
    {
        match self {
            PricingMode::FlatPerSeat { route_price } => {
                seats.into_iter().count() as f64 * route_price
            }
            PricingMode::SeatPlusBase { route_base_price } => seats
                .into_iter()
                .map(|seat| seat.price + route_base_price)
                .sum(),
        }
    }
}

/// Route metadata forwarded with every booking
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteInfo {
    pub origin: String,
    pub destination: String,
    pub bus_type: String,
    pub departure: DateTime<Utc>,
    pub duration_minutes: u32,
}

/// What the booking handoff receives on user confirmation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookingRequest {
    pub booking_id: String,
    pub tour_id: String,
    /// Selection order is preserved
    pub seat_ids: Vec<SeatId>,
    pub total_price: f64,
    pub pricing: PricingMode,
    pub route: RouteInfo,
    pub created_at: DateTime<Utc>,
}

impl BookingRequest {
    pub fn new(
        tour_id: &str,
        seat_ids: Vec<SeatId>,
        total_price: f64,
        pricing: PricingMode,
        route: RouteInfo,
    ) -> Self {
        Self {
            booking_id: new_uuid_v7(),
            tour_id: tour_id.to_string(),
            seat_ids,
            total_price,
            pricing,
            route,
            created_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::seat;
    use crate::domain::types::{SeatPosition, SeatStatus, SeatType};

    fn priced(id: &str, price: f64) -> Seat {
        let mut s = seat(id, 1, 'A', SeatPosition::Window, SeatType::Standard, SeatStatus::Available);
        s.price = price;
        s
    }

    #[test]
    fn test_seat_plus_base_total() {
        let seats = [priced("1A", 150.0), priced("1B", 150.0)];
        let mode = PricingMode::SeatPlusBase { route_base_price: 700.0 };
        assert_eq!(mode.total(&seats), 1700.0);
    }

    #[test]
    fn test_flat_per_seat_total() {
        let seats = [priced("1A", 150.0), priced("1B", 150.0)];
        let mode = PricingMode::FlatPerSeat { route_price: 850.0 };
        assert_eq!(mode.total(&seats), 1700.0);
    }

    #[test]
    fn test_modes_diverge_on_uneven_prices() {
        let seats = [priced("1A", 100.0), priced("1B", 320.0), priced("1C", 80.0)];
        let flat = PricingMode::FlatPerSeat { route_price: 600.0 };
        let based = PricingMode::SeatPlusBase { route_base_price: 450.0 };
        assert_eq!(flat.total(&seats), 1800.0);
        assert_eq!(based.total(&seats), 100.0 + 320.0 + 80.0 + 3.0 * 450.0);
    }

    #[test]
    fn test_empty_selection_totals_zero() {
        let none: [Seat; 0] = [];
        assert_eq!(PricingMode::FlatPerSeat { route_price: 850.0 }.total(&none), 0.0);
        assert_eq!(PricingMode::SeatPlusBase { route_base_price: 700.0 }.total(&none), 0.0);
    }

    #[test]
    fn test_pricing_mode_tagged_json() {
        let mode: PricingMode =
            serde_json::from_str(r#"{ "mode": "flat_per_seat", "route_price": 850 }"#).unwrap();
        assert_eq!(mode, PricingMode::FlatPerSeat { route_price: 850.0 });
        assert!(serde_json::from_str::<PricingMode>(r#"{ "route_price": 850 }"#).is_err());
    }

    #[test]
    fn test_negative_price_invalid() {
        assert!(PricingMode::FlatPerSeat { route_price: -1.0 }.validate().is_err());
        assert!(PricingMode::SeatPlusBase { route_base_price: f64::NAN }.validate().is_err());
    }

    #[test]
    fn test_booking_request_json() {
        let route = crate::testing::sample_route();
        let req = BookingRequest::new(
            "tour-1",
            vec![SeatId::new("3B"), SeatId::new("1A")],
            1700.0,
            PricingMode::SeatPlusBase { route_base_price: 700.0 },
            route,
        );
        assert_eq!(req.booking_id.len(), 36);

        let parsed: serde_json::Value = serde_json::from_str(&serde_json::to_string(&req).unwrap()).unwrap();
        assert_eq!(parsed["seat_ids"], serde_json::json!(["3B", "1A"]));
        assert_eq!(parsed["total_price"], 1700.0);
        assert_eq!(parsed["pricing"]["mode"], "seat_plus_base");
        assert_eq!(parsed["route"]["origin"], "Chennai");
    }
}
