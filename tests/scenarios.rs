//! End-to-end session scenarios through the public API

use seatview::domain::booking::{BookingRequest, PricingMode};
use seatview::domain::error::{SelectionError, SessionError};
use seatview::domain::types::{SeatId, SeatStatus, Tour, ViewpointId};
use seatview::infra::Metrics;
use seatview::io::{
    create_presentation_channel, load_tour, parse_tour, JsonlHandoff, Notice, PresentationMessage,
};
use seatview::services::selection::{ReconcileOutcome, StatusChange};
use seatview::services::{
    CloseReason, KeyInput, PointerEvent, SessionEvent, SessionOptions, TourSession,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tempfile::TempDir;
use tokio::sync::mpsc;

/// Two viewpoints over a 2x4 coach: A and D are window seats
fn coach_json(pricing: Value, default_yaw: f64, statuses: &[(&str, &str)]) -> String {
    let mut seats = Vec::new();
    for row in 1..=2u32 {
        for (column, position, yaw) in
            [('A', "window", -40.0), ('B', "aisle", -15.0), ('C', "aisle", 15.0), ('D', "window", 40.0)]
        {
            let id = format!("{}{}", row, column);
            let status = statuses
                .iter()
                .find(|(seat, _)| *seat == id)
                .map(|(_, status)| *status)
                .unwrap_or("available");
            seats.push(json!({
                "id": id,
                "row": row,
                "column": column.to_string(),
                "type": "standard",
                "position": position,
                "status": status,
                "price": 150.0,
                "angular": { "yaw": yaw, "pitch": -5.0 * row as f64 }
            }));
        }
    }

    json!({
        "id": "coach-8",
        "name": "Eight seat coach",
        "default_viewpoint": "cabin",
        "viewpoints": [
            {
                "id": "cabin",
                "name": "Cabin",
                "default_rotation": { "yaw": default_yaw, "pitch": 0.0 },
                "hotspots": [
                    {
                        "id": "to-door",
                        "position": { "yaw": 180.0, "pitch": 0.0 },
                        "type": "navigation",
                        "target": "door",
                        "label": "Door"
                    }
                ],
                "seat_ids": ["1A", "1B", "1C", "1D", "2A", "2B", "2C", "2D"]
            },
            {
                "id": "door",
                "name": "Door",
                "default_rotation": { "yaw": 90.0, "pitch": 0.0 },
                "hotspots": [
                    {
                        "id": "to-cabin",
                        "position": { "yaw": 270.0, "pitch": 0.0 },
                        "type": "navigation",
                        "target": "cabin",
                        "label": "Cabin"
                    }
                ]
            }
        ],
        "layout": {
            "seats": seats,
            "emergency_exits": [{ "row": 2, "side": "left" }],
            "aisle": "single"
        },
        "settings": { "zoom_min": 0.5, "zoom_max": 3.0, "zoom_default": 1.0, "pricing": pricing },
        "route": {
            "origin": "Pune",
            "destination": "Mumbai",
            "bus_type": "Seater (2+2)",
            "departure": "2026-12-01T06:00:00Z",
            "duration_minutes": 210
        }
    })
    .to_string()
}

fn seat_plus_base() -> Value {
    json!({ "mode": "seat_plus_base", "route_base_price": 700.0 })
}

fn coach() -> Tour {
    parse_tour(&coach_json(seat_plus_base(), 0.0, &[])).unwrap()
}

fn open(tour: Tour, max_selectable_seats: usize) -> TourSession {
    let options = SessionOptions { max_selectable_seats, ..SessionOptions::default() };
    TourSession::new(Arc::new(tour), options, Arc::new(Metrics::new())).unwrap()
}

fn ids(raw: &[&str]) -> Vec<SeatId> {
    raw.iter().map(|s| SeatId::new(*s)).collect()
}

fn assert_close(actual: f64, expected: f64) {
    assert!((actual - expected).abs() < 1e-9, "expected {}, got {}", expected, actual);
}

#[test]
fn test_scenario_window_seats_exhaust_recommendations() {
    let mut session = open(coach(), 4);
    assert_eq!(session.recommendations(), ids(&["1A", "1D"]));

    for seat in ["1A", "1D", "2A", "2D"] {
        session.select(&SeatId::new(seat)).unwrap();
    }

    assert_eq!(session.selection(), ids(&["1A", "1D", "2A", "2D"]).as_slice());
    assert!(session.recommendations().is_empty());

    let err = session.select(&SeatId::new("1B")).unwrap_err();
    assert!(matches!(
        err,
        SessionError::Selection(SelectionError::SelectionLimitReached { max: 4 })
    ));
}

#[test]
fn test_scenario_feed_blocks_later_select() {
    let mut session = open(parse_tour(&coach_json(seat_plus_base(), 0.0, &[])).unwrap(), 6);
    let seat = SeatId::new("1B");

    let outcome = session.apply_proposal(StatusChange::new("1B", SeatStatus::Occupied));
    assert!(matches!(outcome, Some(ReconcileOutcome::Applied { .. })));

    let err = session.select(&seat).unwrap_err();
    assert!(matches!(
        err,
        SessionError::Selection(SelectionError::SeatUnavailable { status: SeatStatus::Occupied, .. })
    ));
    assert!(session.selection().is_empty());
}

#[test]
fn test_scenario_selected_seat_is_revoked() {
    let mut session = open(coach(), 6);
    let (presentation, mut rx) = create_presentation_channel(64, Arc::new(Metrics::new()));
    session.attach_presentation(presentation);

    session.select(&SeatId::new("2A")).unwrap();
    session.select(&SeatId::new("2B")).unwrap();

    let outcome = session.apply_proposal(StatusChange::new("2A", SeatStatus::Occupied));
    assert!(matches!(outcome, Some(ReconcileOutcome::Revoked { .. })));
    assert_eq!(session.selection(), ids(&["2B"]).as_slice());

    let view = session.snapshot();
    let seat = view.seats.iter().find(|s| s.id.as_str() == "2A").unwrap();
    assert_eq!(seat.status, SeatStatus::Occupied);
    assert!(!seat.selected);

    let mut revoked = false;
    while let Ok(msg) = rx.try_recv() {
        if let PresentationMessage::Notice(Notice::SelectionRevoked { seat_id, status }) = msg {
            assert_eq!(seat_id.as_str(), "2A");
            assert_eq!(status, SeatStatus::Occupied);
            revoked = true;
        }
    }
    assert!(revoked);
}

#[test]
fn test_scenario_yaw_wraps_past_north() {
    let tour = parse_tour(&coach_json(seat_plus_base(), 350.0, &[])).unwrap();
    let mut session = open(tour, 6);
    assert_close(session.camera().yaw, 350.0);

    // 80 px to the left at 0.25 deg/px turns the view 20 degrees right
    session.handle_pointer(PointerEvent::Down { x: 400.0, y: 300.0 });
    session.handle_pointer(PointerEvent::Move { x: 320.0, y: 300.0 });
    session.handle_pointer(PointerEvent::Up);
    assert_close(session.camera().yaw, 10.0);

    session.handle_key(KeyInput::Reset);
    for _ in 0..4 {
        session.handle_key(KeyInput::Right);
    }
    assert_close(session.camera().yaw, 10.0);
}

#[test]
fn test_scenario_pricing_modes_use_their_own_formula() {
    let seats = ids(&["1B", "2B"]);

    let mut plus_base = open(coach(), 6);
    for seat in &seats {
        plus_base.select(seat).unwrap();
    }
    // 150 + 150 + 2 x 700
    assert_close(plus_base.quote(), 1700.0);

    let flat = parse_tour(&coach_json(
        json!({ "mode": "flat_per_seat", "route_price": 900.0 }),
        0.0,
        &[],
    ))
    .unwrap();
    let mut flat = open(flat, 6);
    for seat in &seats {
        flat.select(seat).unwrap();
    }
    // 2 x 900, seat prices ignored
    assert_close(flat.quote(), 1800.0);

    let request = flat.confirm().unwrap();
    assert_eq!(request.pricing, PricingMode::FlatPerSeat { route_price: 900.0 });
    assert_close(request.total_price, 1800.0);
    assert_eq!(request.seat_ids, seats);
}

#[test]
fn test_reset_restores_home_after_any_input() {
    let mut session = open(coach(), 6);
    let home = *session.camera();

    session.handle_key(KeyInput::Left);
    session.handle_key(KeyInput::Up);
    session.handle_wheel(-250.0);
    session.handle_key(KeyInput::ToggleMode);
    session.handle_key(KeyInput::Right);
    session.handle_pinch(1.7);
    assert_ne!(*session.camera(), home);

    session.handle_key(KeyInput::Reset);
    assert_eq!(*session.camera(), home);
}

#[test]
fn test_camera_stays_within_limits_under_extreme_input() {
    let mut session = open(coach(), 6);
    let tour = coach();

    for _ in 0..200 {
        session.handle_key(KeyInput::Up);
        session.handle_key(KeyInput::ZoomIn);
    }
    session.handle_wheel(f64::NAN);
    session.handle_pinch(-3.0);
    session.handle_pointer(PointerEvent::Down { x: 0.0, y: 0.0 });
    session.handle_pointer(PointerEvent::Move { x: 1.0e9, y: -1.0e9 });
    session.handle_pointer(PointerEvent::Leave);

    let camera = session.camera();
    assert!((0.0..360.0).contains(&camera.yaw));
    assert!((-90.0..=90.0).contains(&camera.pitch));
    assert!(camera.zoom >= tour.settings.zoom_min && camera.zoom <= tour.settings.zoom_max);
    assert!(camera.pitch.is_finite() && camera.zoom.is_finite());
}

#[test]
fn test_select_and_deselect_are_idempotent() {
    let mut session = open(coach(), 6);
    let seat = SeatId::new("1C");

    session.select(&seat).unwrap();
    session.select(&seat).unwrap();
    assert_eq!(session.selection(), ids(&["1C"]).as_slice());

    assert!(session.deselect(&seat).unwrap());
    assert!(!session.deselect(&seat).unwrap());
    assert!(session.selection().is_empty());
}

#[test]
fn test_navigation_round_trip_resets_camera() {
    let mut session = open(coach(), 6);
    session.handle_key(KeyInput::ZoomIn);

    let door = session.navigate("to-door").unwrap();
    assert_eq!(door, ViewpointId::new("door"));
    assert_close(session.camera().yaw, 90.0);
    assert_close(session.camera().zoom, 1.0);

    session.navigate("to-cabin").unwrap();
    assert_eq!(session.viewpoint().id, ViewpointId::new("cabin"));
    assert_close(session.camera().yaw, 0.0);

    assert!(matches!(session.navigate("to-door-2"), Err(SessionError::UnknownHotspot(_))));
}

#[test]
fn test_seat_markers_follow_the_camera() {
    let mut session = open(coach(), 6);
    let marker_x = |session: &TourSession, id: &str| {
        session
            .snapshot()
            .markers
            .into_iter()
            .find(|m| m.id == id)
            .map(|m| m.projection)
            .unwrap()
    };

    let before = marker_x(&session, "1A");
    assert!(before.visible);
    assert!(before.x < session.viewport().width / 2.0);

    // Looking behind hides the cabin seats
    for _ in 0..36 {
        session.handle_key(KeyInput::Right);
    }
    assert_close(session.camera().yaw, 180.0);
    assert!(!marker_x(&session, "1A").visible);
}

#[test]
fn test_closed_session_ignores_everything() {
    let mut session = open(coach(), 6);
    session.select(&SeatId::new("1A")).unwrap();

    let summary = session.close(CloseReason::UserRequest);
    assert!(summary.retained_selection.is_empty());
    assert!(session.selection().is_empty());

    assert!(matches!(session.select(&SeatId::new("1B")), Err(SessionError::Closed)));
    assert!(!session.handle_key(KeyInput::Left));
    assert!(session.apply_proposal(StatusChange::new("1B", SeatStatus::Occupied)).is_none());
    assert_eq!(session.close(CloseReason::Escape).reason, CloseReason::UserRequest);
}

#[test]
fn test_demo_tour_loads() {
    let tour = load_tour("tours/demo_bus.json").unwrap();
    assert!(tour.validate().is_ok());
    assert!(tour.viewpoint(&tour.default_viewpoint).is_some());
    assert!(tour.layout.is_exit_row(4));
}

#[tokio::test]
async fn test_session_run_books_and_closes() {
    let dir = TempDir::new().unwrap();
    let handoff_path = dir.path().join("bookings.jsonl");

    let mut session = open(coach(), 6);
    let (presentation, mut presentation_rx) =
        create_presentation_channel(1000, Arc::new(Metrics::new()));
    session.attach_presentation(presentation);

    let (event_tx, event_rx) = mpsc::channel(16);
    let handle = tokio::spawn(session.run(event_rx, Arc::new(JsonlHandoff::new(&handoff_path))));

    for event in [
        SessionEvent::Select(SeatId::new("1A")),
        SessionEvent::Select(SeatId::new("1B")),
        SessionEvent::Confirm,
        SessionEvent::Key(KeyInput::Escape),
    ] {
        event_tx.send(event).await.unwrap();
    }

    let summary = handle.await.unwrap();
    assert_eq!(summary.reason, CloseReason::Escape);
    assert_eq!(summary.bookings.len(), 1);

    let mut submitted = None;
    let mut closed = false;
    while let Some(msg) = presentation_rx.recv().await {
        match msg {
            PresentationMessage::Notice(Notice::BookingSubmitted { booking_id, .. }) => {
                submitted = Some(booking_id)
            }
            PresentationMessage::Closed(_) => closed = true,
            _ => {}
        }
    }
    assert!(closed);
    assert_eq!(submitted.as_ref(), summary.bookings.first());

    let contents = std::fs::read_to_string(&handoff_path).unwrap();
    let lines: Vec<&str> = contents.lines().collect();
    assert_eq!(lines.len(), 1);
    let request: BookingRequest = serde_json::from_str(lines[0]).unwrap();
    assert_eq!(request.tour_id, "coach-8");
    assert_eq!(request.seat_ids, ids(&["1A", "1B"]));
    assert_close(request.total_price, 1700.0);
    assert_eq!(request.route.destination, "Mumbai");
}
