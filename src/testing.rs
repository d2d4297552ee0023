//! Shared fixtures for unit tests

use crate::domain::booking::{PricingMode, RouteInfo};
use crate::domain::types::{
    Accessibility, AisleConfig, AngularPosition, BusLayout, EmergencyExit, Hotspot, HotspotStyle,
    MarkerKind, Seat, SeatId, SeatPosition, SeatStatus, SeatType, Side, Tour, TourSettings,
    Viewpoint, ViewpointId,
};
use chrono::{TimeZone, Utc};

pub fn seat(
    id: &str,
    row: u32,
    column: char,
    position: SeatPosition,
    seat_type: SeatType,
    status: SeatStatus,
) -> Seat {
    let col_yaw = match column {
        'A' => -40.0,
        'B' => -15.0,
        'C' => 15.0,
        _ => 40.0,
    };
    Seat {
        id: SeatId::new(id),
        row,
        column,
        seat_type,
        position,
        status,
        price: if seat_type == SeatType::Premium { 250.0 } else { 150.0 },
        accessibility: Accessibility::default(),
        angular: AngularPosition::new(col_yaw, -5.0 - row as f64 * 3.0),
    }
}

pub fn sample_route() -> RouteInfo {
    RouteInfo {
        origin: "Chennai".to_string(),
        destination: "Bengaluru".to_string(),
        bus_type: "AC Sleeper".to_string(),
        departure: Utc.with_ymd_and_hms(2026, 11, 2, 21, 30, 0).unwrap(),
        duration_minutes: 375,
    }
}

/// Five rows of A(window) B(aisle) | C(aisle) D(window).
///
/// Row 1 is premium, 2C occupied, 4D reserved, 5D disabled, exit row 3.
/// Viewpoint "front" (default) shows rows 1-3, "rear" shows rows 3-5.
pub fn sample_tour() -> Tour {
    let mut seats = Vec::new();
    for row in 1..=5u32 {
        for column in ['A', 'B', 'C', 'D'] {
            let id = format!("{}{}", row, column);
            let position = match column {
                'A' | 'D' => SeatPosition::Window,
                _ => SeatPosition::Aisle,
            };
            let seat_type = if row == 1 { SeatType::Premium } else { SeatType::Standard };
            let status = match id.as_str() {
                "2C" => SeatStatus::Occupied,
                "4D" => SeatStatus::Reserved,
                "5D" => SeatStatus::Disabled,
                _ => SeatStatus::Available,
            };
            seats.push(seat(&id, row, column, position, seat_type, status));
        }
    }

    let ids = |rows: std::ops::RangeInclusive<u32>| -> Vec<SeatId> {
        rows.flat_map(|r| ['A', 'B', 'C', 'D'].map(|c| SeatId::new(format!("{}{}", r, c))))
            .collect()
    };

    let front = Viewpoint {
        id: ViewpointId::new("front"),
        name: "Front cabin".to_string(),
        description: "View from the driver partition".to_string(),
        default_rotation: AngularPosition::new(0.0, -10.0),
        hotspots: vec![
            Hotspot {
                id: "to-rear".to_string(),
                position: AngularPosition::new(0.0, -2.0),
                kind: MarkerKind::Navigation {
                    target: ViewpointId::new("rear"),
                    label: "Rear cabin".to_string(),
                },
                style: HotspotStyle::default(),
            },
            Hotspot {
                id: "charging".to_string(),
                position: AngularPosition::new(70.0, 0.0),
                kind: MarkerKind::Amenity { label: "USB charging".to_string() },
                style: HotspotStyle::default(),
            },
            Hotspot {
                id: "premium-1a".to_string(),
                position: AngularPosition::new(-42.0, -8.0),
                kind: MarkerKind::Seat { seat_id: SeatId::new("1A") },
                style: HotspotStyle::default(),
            },
        ],
        seat_ids: ids(1..=3),
    };

    let rear = Viewpoint {
        id: ViewpointId::new("rear"),
        name: "Rear cabin".to_string(),
        description: String::new(),
        default_rotation: AngularPosition::new(180.0, -5.0),
        hotspots: vec![
            Hotspot {
                id: "to-front".to_string(),
                position: AngularPosition::new(180.0, 0.0),
                kind: MarkerKind::Navigation {
                    target: ViewpointId::new("front"),
                    label: "Front cabin".to_string(),
                },
                style: HotspotStyle::default(),
            },
            Hotspot {
                id: "exit-info".to_string(),
                position: AngularPosition::new(90.0, 0.0),
                kind: MarkerKind::Info {
                    title: "Emergency exit".to_string(),
                    body: "Row 3, right side".to_string(),
                },
                style: HotspotStyle::default(),
            },
        ],
        seat_ids: ids(3..=5),
    };

    Tour {
        id: "tour-chn-blr".to_string(),
        name: "Chennai - Bengaluru sleeper".to_string(),
        viewpoints: vec![front, rear],
        default_viewpoint: ViewpointId::new("front"),
        layout: BusLayout {
            seats,
            emergency_exits: vec![EmergencyExit { row: 3, side: Side::Right }],
            aisle: AisleConfig::Single,
        },
        settings: TourSettings {
            zoom_min: 0.5,
            zoom_max: 3.0,
            zoom_default: 1.0,
            auto_rotate: false,
            rotate_speed: 2.0,
            pricing: PricingMode::SeatPlusBase { route_base_price: 700.0 },
        },
        route: sample_route(),
    }
}

pub fn ids(list: &[&str]) -> Vec<SeatId> {
    list.iter().map(|s| SeatId::new(*s)).collect()
}
