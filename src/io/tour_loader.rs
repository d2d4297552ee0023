//! Tour content provider adapter - reads a tour aggregate from JSON
//!
//! Loading only parses; structural validation is the session's job so an
//! in-memory tour gets exactly the same checks.

use crate::domain::types::Tour;
use anyhow::Context;
use std::fs;
use std::path::Path;
use tracing::info;

/// Parse a tour from a JSON string
pub fn parse_tour(json: &str) -> anyhow::Result<Tour> {
    serde_json::from_str(json).context("Failed to parse tour JSON")
}

/// Load a tour from a JSON file
pub fn load_tour<P: AsRef<Path>>(path: P) -> anyhow::Result<Tour> {
    let path = path.as_ref();
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read tour file {}", path.display()))?;
    let tour = parse_tour(&content).with_context(|| format!("Invalid tour file {}", path.display()))?;

    info!(
        tour_id = %tour.id,
        viewpoints = %tour.viewpoints.len(),
        seats = %tour.layout.seats.len(),
        pricing = %tour.settings.pricing.as_str(),
        "tour_loaded"
    );
    Ok(tour)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::booking::PricingMode;
    use crate::domain::types::{MarkerKind, SeatId, SeatStatus, ViewpointId};
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn demo_path() -> std::path::PathBuf {
        Path::new(env!("CARGO_MANIFEST_DIR")).join("tours/demo_bus.json")
    }

    #[test]
    fn test_demo_tour_loads_and_validates() {
        let tour = load_tour(demo_path()).unwrap();
        assert!(tour.validate().is_ok());
        assert_eq!(tour.default_viewpoint, ViewpointId::new("front"));
        assert_eq!(tour.layout.seats.len(), 32);
        assert!(matches!(tour.settings.pricing, PricingMode::SeatPlusBase { .. }));
    }

    #[test]
    fn test_demo_tour_marker_variants() {
        let tour = load_tour(demo_path()).unwrap();
        let kinds: Vec<&str> = tour
            .viewpoints
            .iter()
            .flat_map(|v| v.hotspots.iter().map(|h| h.kind.as_str()))
            .collect();
        for kind in ["seat", "amenity", "navigation", "info"] {
            assert!(kinds.contains(&kind), "missing {} hotspot", kind);
        }
        let seat_hotspot = tour
            .viewpoints
            .iter()
            .flat_map(|v| &v.hotspots)
            .find_map(|h| match &h.kind {
                MarkerKind::Seat { seat_id } => Some(seat_id.clone()),
                _ => None,
            })
            .unwrap();
        assert!(tour.layout.seats.iter().any(|s| s.id == seat_hotspot));
    }

    #[test]
    fn test_demo_tour_has_unavailable_seats() {
        let tour = load_tour(demo_path()).unwrap();
        let occupied = tour.layout.seats.iter().filter(|s| s.status == SeatStatus::Occupied).count();
        assert!(occupied > 0);
        let three_b = tour.layout.seats.iter().find(|s| s.id == SeatId::new("3B")).unwrap();
        assert_eq!(three_b.status, SeatStatus::Available);
    }

    #[test]
    fn test_missing_file_errors_with_path() {
        let err = load_tour("/nonexistent/tour.json").unwrap_err();
        assert!(format!("{:#}", err).contains("/nonexistent/tour.json"));
    }

    #[test]
    fn test_malformed_json_errors() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "{{ \"id\": \"broken\" }}").unwrap();
        assert!(load_tour(file.path()).is_err());
    }

    #[test]
    fn test_missing_pricing_mode_is_rejected() {
        let json = std::fs::read_to_string(demo_path()).unwrap();
        let mut value: serde_json::Value = serde_json::from_str(&json).unwrap();
        value["settings"]["pricing"].as_object_mut().unwrap().remove("mode");
        assert!(parse_tour(&value.to_string()).is_err());
    }
}
