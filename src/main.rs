//! seatview - headless seat selection console
//!
//! Loads a tour, opens one session on it and drives the session from line
//! commands on stdin. Everything the presentation layer would draw is
//! logged instead.
//!
//! Module structure:
//! - `domain/` - Tour content, camera math, booking payloads
//! - `services/` - Selection, feed, camera, projection, session
//! - `io/` - Tour loader, presentation channel, booking handoff, MQTT feed
//! - `infra/` - Config, metrics

use clap::Parser;
use parking_lot::Mutex;
use seatview::infra::{Config, Metrics};
use seatview::io::commands::HELP;
use seatview::io::{
    create_presentation_channel, load_tour, parse_command, BookingHandoff, ConsoleCommand,
    JsonlHandoff, PresentationMessage, SessionUpdate,
};
use seatview::services::feed::build_feed;
use seatview::services::{SessionEvent, SessionOptions, TourSession};
use std::io::BufRead;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use tracing_subscriber::fmt::time::UtcTime;
use tracing_subscriber::EnvFilter;

/// Seat selection and viewpoint navigation console
#[derive(Parser, Debug)]
#[command(name = "seatview", version, about)]
struct Args {
    /// Path to TOML configuration file (default: $CONFIG_FILE, then config/dev.toml)
    #[arg(short, long)]
    config: Option<String>,

    /// Tour JSON file (overrides session.tour_file)
    #[arg(short, long)]
    tour: Option<String>,
}

type LatestUpdate = Arc<Mutex<Option<SessionUpdate>>>;

fn log_presentation(msg: &PresentationMessage, latest: &LatestUpdate) {
    match msg {
        PresentationMessage::Update(update) => {
            let visible = update.markers.iter().filter(|m| m.projection.visible).count();
            debug!(
                viewpoint = %update.viewpoint,
                yaw = format!("{:.1}", update.camera.yaw),
                pitch = format!("{:.1}", update.camera.pitch),
                zoom = format!("{:.2}", update.camera.zoom),
                mode = %update.camera.mode.as_str(),
                visible_markers = %visible,
                selected = %update.selection.len(),
                total_price = %update.total_price,
                "session_update"
            );
            *latest.lock() = Some((**update).clone());
        }
        PresentationMessage::Notice(notice) => {
            let detail = serde_json::to_string(notice).unwrap_or_default();
            info!(notice = %notice.as_str(), detail = %detail, "notice");
        }
        PresentationMessage::Closed(summary) => {
            info!(
                reason = %summary.reason.as_str(),
                retained = ?summary.retained_selection,
                bookings = ?summary.bookings,
                "session_closed_notice"
            );
        }
    }
}

fn print_status(latest: &LatestUpdate) {
    let guard = latest.lock();
    let Some(update) = guard.as_ref() else {
        info!("no_session_state_yet");
        return;
    };
    let selection: Vec<&str> = update.selection.iter().map(|s| s.as_str()).collect();
    let unavailable: Vec<&str> = update
        .seats
        .iter()
        .filter(|s| !s.status.is_available())
        .map(|s| s.id.as_str())
        .collect();
    let markers: Vec<String> = update
        .markers
        .iter()
        .filter(|m| m.projection.visible)
        .map(|m| format!("{}@({:.0},{:.0})", m.id, m.projection.x, m.projection.y))
        .collect();
    info!(
        viewpoint = %update.viewpoint,
        name = %update.viewpoint_name,
        yaw = format!("{:.1}", update.camera.yaw),
        pitch = format!("{:.1}", update.camera.pitch),
        zoom = format!("{:.2}", update.camera.zoom),
        mode = %update.camera.mode.as_str(),
        fullscreen = %update.fullscreen,
        selection = ?selection,
        max_selectable = %update.max_selectable,
        unavailable = ?unavailable,
        visible_markers = ?markers,
        total_price = %update.total_price,
        "status"
    );
}

fn print_recommendations(latest: &LatestUpdate) {
    let guard = latest.lock();
    let recommended: Vec<&str> = guard
        .as_ref()
        .map(|u| u.recommendations.iter().map(|s| s.as_str()).collect())
        .unwrap_or_default();
    info!(seats = ?recommended, "recommendations");
}

/// Read stdin line by line until EOF or a close command.
///
/// Runs on its own thread: a blocking stdin read inside the runtime would
/// hold up shutdown after Ctrl+C.
fn read_commands(event_tx: mpsc::Sender<SessionEvent>, latest: LatestUpdate) {
    info!("{}", HELP);

    for line in std::io::stdin().lock().lines() {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                warn!(error = %e, "stdin_read_failed");
                break;
            }
        };

        match parse_command(&line) {
            Ok(None) => {}
            Ok(Some(ConsoleCommand::Session(events))) => {
                for event in events {
                    if event_tx.blocking_send(event).is_err() {
                        return;
                    }
                }
            }
            Ok(Some(ConsoleCommand::Recommend)) => print_recommendations(&latest),
            Ok(Some(ConsoleCommand::Status)) => print_status(&latest),
            Ok(Some(ConsoleCommand::Help)) => info!("{}", HELP),
            Err(e) => warn!(input = %line.trim(), error = %e, "command_rejected"),
        }
    }

    debug!("stdin_closed");
    let _ = event_tx.blocking_send(SessionEvent::Close);
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize structured logging with configurable level via RUST_LOG env var
    // Default: INFO, use RUST_LOG=debug to see every session update
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_timer(UtcTime::rfc_3339())
        .with_target(false)
        .init();

    info!(version = %env!("CARGO_PKG_VERSION"), git_hash = %env!("GIT_HASH"), "seatview starting");

    let args = Args::parse();
    let config = Config::load_from_path(
        &args.config.clone().unwrap_or_else(|| Config::resolve_config_path(&[])),
    );

    info!(
        config_file = %config.config_file(),
        tour_file = %config.tour_file(),
        feed_mode = %config.feed_mode().as_str(),
        max_selectable_seats = %config.max_selectable_seats(),
        clear_selection_on_close = %config.clear_selection_on_close(),
        handoff_file = %config.handoff_file(),
        "config_loaded"
    );

    let tour_file = args.tour.as_deref().unwrap_or(config.tour_file());
    let tour = load_tour(tour_file)?;

    let metrics = Arc::new(Metrics::new());
    let mut session =
        TourSession::new(Arc::new(tour), SessionOptions::from_config(&config), metrics.clone())?;

    let (presentation, mut presentation_rx) = create_presentation_channel(1000, metrics.clone());
    session.attach_presentation(presentation);
    session.start_feed(build_feed(&config))?;

    let handoff: Arc<dyn BookingHandoff> = Arc::new(JsonlHandoff::new(config.handoff_file()));

    // Presentation consumer: logs and keeps the latest state for `status`
    let latest: LatestUpdate = Arc::new(Mutex::new(None));
    let presentation_latest = latest.clone();
    let presentation_task = tokio::spawn(async move {
        while let Some(msg) = presentation_rx.recv().await {
            log_presentation(&msg, &presentation_latest);
            if matches!(msg, PresentationMessage::Closed(_)) {
                break;
            }
        }
    });

    // Start metrics reporter
    let metrics_clone = metrics.clone();
    let metrics_interval = config.metrics_interval_secs();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(std::time::Duration::from_secs(metrics_interval));
        // First tick completes immediately
        interval.tick().await;
        loop {
            interval.tick().await;
            metrics_clone.report().log();
        }
    });

    // Create event channel (bounded for backpressure)
    let (event_tx, event_rx) = mpsc::channel(256);

    let input_tx = event_tx.clone();
    std::thread::spawn(move || read_commands(input_tx, latest));

    // Close the session on Ctrl+C
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("shutdown_signal_received");
        let _ = event_tx.send(SessionEvent::Close).await;
    });

    // Run session - consumes events until closed
    let summary = session.run(event_rx, handoff).await;
    let _ = presentation_task.await;

    metrics.report().log();
    info!(
        reason = %summary.reason.as_str(),
        bookings = %summary.bookings.len(),
        "seatview shutdown complete"
    );
    Ok(())
}
