//! Seatview TUI - interactive terminal front end for a tour session
//!
//! Drives one session through the same channels the headless console uses:
//! - Header: viewpoint and camera state
//! - Seat map: the 2D layout with a seat cursor
//! - Panorama: projected markers of the active viewpoint
//! - Selection, recommendations and notices
//!
//! Keys: arrows rotate (pan in move mode), +/- zoom, r reset, t mode,
//! f fullscreen, Esc leaves fullscreen or closes, h/j/k/l move the seat
//! cursor, space toggles the seat, 1-9 activate hotspots, Tab cycles
//! viewpoints, c confirms, q quits. Mouse drag and wheel drive the camera.

use clap::Parser;
use crossterm::{
    event::{
        self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind, MouseButton,
        MouseEventKind,
    },
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, Paragraph, Wrap},
    Frame, Terminal,
};
use seatview::domain::types::{MarkerKind, SeatId, SeatStatus, Tour, ViewpointId};
use seatview::infra::{Config, Metrics};
use seatview::io::{
    create_presentation_channel, load_tour, BookingHandoff, JsonlHandoff, Notice,
    PresentationMessage, SessionUpdate,
};
use seatview::services::feed::build_feed;
use seatview::services::selection::SeatView;
use seatview::services::{
    KeyInput, PointerEvent, SessionEvent, SessionOptions, SessionSummary, TourSession,
};
use std::collections::VecDeque;
use std::io;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, Mutex};
use tracing_subscriber::fmt::time::UtcTime;
use tracing_subscriber::EnvFilter;

/// Notices kept on screen
const MAX_NOTICES: usize = 8;
/// Pixels per terminal cell, used to turn mouse cells into pointer pixels
const CELL_WIDTH_PX: f64 = 8.0;
const CELL_HEIGHT_PX: f64 = 16.0;
/// Wheel delta per scroll notch
const WHEEL_NOTCH: f64 = 100.0;

/// Seatview TUI - seat selection with a panoramic marker view
#[derive(Parser, Debug)]
#[command(name = "seatview-tui", version, about)]
struct Args {
    /// Path to TOML configuration file (default: $CONFIG_FILE, then config/dev.toml)
    #[arg(short, long)]
    config: Option<String>,

    /// Tour JSON file (overrides session.tour_file)
    #[arg(short, long)]
    tour: Option<String>,

    /// Write JSON logs to this file; nothing is logged otherwise
    #[arg(long)]
    log_file: Option<String>,
}

/// View state shared between the presentation consumer and the UI
#[derive(Debug, Default)]
struct ViewState {
    update: Option<SessionUpdate>,
    notices: VecDeque<String>,
    closed: Option<SessionSummary>,
    /// Layout index of the seat under the cursor
    cursor: usize,
}

impl ViewState {
    fn handle_message(&mut self, msg: PresentationMessage) {
        match msg {
            PresentationMessage::Update(update) => {
                let seats = update.seats.len();
                self.update = Some(*update);
                if self.cursor >= seats {
                    self.cursor = seats.saturating_sub(1);
                }
            }
            PresentationMessage::Notice(notice) => self.push_notice(describe_notice(&notice)),
            PresentationMessage::Closed(summary) => self.closed = Some(summary),
        }
    }

    fn push_notice(&mut self, text: String) {
        self.notices.push_front(text);
        if self.notices.len() > MAX_NOTICES {
            self.notices.pop_back();
        }
    }

    fn cursor_seat(&self) -> Option<&SeatView> {
        self.update.as_ref().and_then(|u| u.seats.get(self.cursor))
    }

    /// Move by whole rows (`dr`) or columns (`dc`) across the layout
    fn move_cursor(&mut self, dr: i64, dc: i64) {
        let Some(update) = &self.update else {
            return;
        };
        let Some(current) = update.seats.get(self.cursor) else {
            return;
        };
        let target = if dr != 0 {
            let row = current.row as i64 + dr;
            let in_row = |s: &&SeatView| s.row as i64 == row;
            update
                .seats
                .iter()
                .position(|s| in_row(&s) && s.column == current.column)
                .or_else(|| update.seats.iter().position(|s| in_row(&s)))
        } else {
            let idx = self.cursor as i64 + dc;
            (0..update.seats.len() as i64).contains(&idx).then_some(idx as usize)
        };
        if let Some(target) = target {
            self.cursor = target;
        }
    }
}

type SharedState = Arc<Mutex<ViewState>>;

fn describe_notice(notice: &Notice) -> String {
    match notice {
        Notice::SelectionRevoked { seat_id, status } => {
            format!("Seat {} was just {} and left your selection", seat_id, status.as_str())
        }
        Notice::SelectRejected { message, .. } => message.clone(),
        Notice::ViewpointChanged { to, .. } => format!("Now viewing {}", to),
        Notice::BookingSubmitted { booking_id, seat_ids, total_price } => format!(
            "Booked {} seat(s) for {:.2} ({})",
            seat_ids.len(),
            total_price,
            booking_id
        ),
        Notice::BookingFailed { error } => format!("Booking failed: {}", error),
        Notice::DefaultViewpointFallback { requested, used } => {
            format!("Viewpoint {} missing, opened {}", requested, used)
        }
        Notice::FullscreenChanged { fullscreen } => {
            if *fullscreen { "Fullscreen on".to_string() } else { "Fullscreen off".to_string() }
        }
    }
}

fn init_logging(log_file: Option<&str>) -> anyhow::Result<()> {
    let Some(path) = log_file else {
        return Ok(());
    };
    let file = std::fs::OpenOptions::new().create(true).append(true).open(path)?;
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_timer(UtcTime::rfc_3339())
        .with_target(false)
        .json()
        .with_ansi(false)
        .with_writer(std::sync::Mutex::new(file))
        .init();
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_logging(args.log_file.as_deref())?;
    tracing::info!(version = %env!("CARGO_PKG_VERSION"), git_hash = %env!("GIT_HASH"), "seatview-tui starting");

    let config = Config::load_from_path(
        &args.config.clone().unwrap_or_else(|| Config::resolve_config_path(&[])),
    );
    let tour = Arc::new(load_tour(args.tour.as_deref().unwrap_or(config.tour_file()))?);

    let metrics = Arc::new(Metrics::new());
    let mut session =
        TourSession::new(tour.clone(), SessionOptions::from_config(&config), metrics.clone())?;
    let (presentation, mut presentation_rx) = create_presentation_channel(1000, metrics);
    session.attach_presentation(presentation);
    session.start_feed(build_feed(&config))?;

    let handoff: Arc<dyn BookingHandoff> = Arc::new(JsonlHandoff::new(config.handoff_file()));
    let (event_tx, event_rx) = mpsc::channel(256);
    let session_handle = tokio::spawn(session.run(event_rx, handoff));

    let state: SharedState = Arc::new(Mutex::new(ViewState::default()));
    let presentation_state = state.clone();
    let presentation_handle = tokio::spawn(async move {
        while let Some(msg) = presentation_rx.recv().await {
            presentation_state.lock().await.handle_message(msg);
        }
    });

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run_ui(&mut terminal, state, &tour, event_tx).await;

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen, DisableMouseCapture)?;
    terminal.show_cursor()?;

    // Dropping the event sender ends the session if the UI did not close it
    let summary = session_handle.await?;
    presentation_handle.abort();
    tracing::info!(
        reason = %summary.reason.as_str(),
        bookings = %summary.bookings.len(),
        "seatview-tui shutdown complete"
    );
    for booking in &summary.bookings {
        println!("booking handed off: {}", booking);
    }

    result
}

/// Viewport in pointer pixels for a terminal area
fn viewport_px(area: Rect) -> (f64, f64) {
    (area.width.max(1) as f64 * CELL_WIDTH_PX, area.height.max(1) as f64 * CELL_HEIGHT_PX)
}

fn map_key(code: KeyCode) -> Option<KeyInput> {
    Some(match code {
        KeyCode::Left => KeyInput::Left,
        KeyCode::Right => KeyInput::Right,
        KeyCode::Up => KeyInput::Up,
        KeyCode::Down => KeyInput::Down,
        KeyCode::Char('+') | KeyCode::Char('=') => KeyInput::ZoomIn,
        KeyCode::Char('-') => KeyInput::ZoomOut,
        KeyCode::Char('r') => KeyInput::Reset,
        KeyCode::Char('t') => KeyInput::ToggleMode,
        KeyCode::Char('f') => KeyInput::Fullscreen,
        KeyCode::Esc => KeyInput::Escape,
        _ => return None,
    })
}

fn next_viewpoint(tour: &Tour, current: Option<&ViewpointId>) -> Option<ViewpointId> {
    let idx = current.and_then(|id| tour.viewpoint_index(id)).unwrap_or(0);
    let next = (idx + 1) % tour.viewpoints.len().max(1);
    tour.viewpoints.get(next).map(|v| v.id.clone())
}

/// Hotspot ids of the active viewpoint, in declared order
fn hotspot_ids(tour: &Tour, current: Option<&ViewpointId>) -> Vec<String> {
    current
        .and_then(|id| tour.viewpoint(id))
        .map(|v| v.hotspots.iter().map(|h| h.id.clone()).collect())
        .unwrap_or_default()
}

async fn run_ui(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    state: SharedState,
    tour: &Tour,
    event_tx: mpsc::Sender<SessionEvent>,
) -> anyhow::Result<()> {
    let tick_rate = Duration::from_millis(50);
    let mut last_tick = Instant::now();
    let mut last_size: Option<(f64, f64)> = None;

    loop {
        let s = state.lock().await;
        if s.closed.is_some() {
            return Ok(());
        }
        let mut panorama_area = Rect::default();
        terminal.draw(|f| panorama_area = draw_ui(f, &s, tour))?;
        let current_viewpoint = s.update.as_ref().map(|u| u.viewpoint.clone());
        let cursor_seat = s.cursor_seat().map(|seat| seat.id.clone());
        drop(s);

        let size = viewport_px(panorama_area);
        if last_size != Some(size) {
            last_size = Some(size);
            let _ = event_tx.send(SessionEvent::Resize { width: size.0, height: size.1 }).await;
        }

        let timeout = tick_rate.saturating_sub(last_tick.elapsed());
        if event::poll(timeout)? {
            let mut events: Vec<SessionEvent> = Vec::new();
            match event::read()? {
                Event::Key(key) if key.kind == KeyEventKind::Press => match key.code {
                    KeyCode::Char('q') => {
                        let _ = event_tx.send(SessionEvent::Close).await;
                        return Ok(());
                    }
                    KeyCode::Char('h') => state.lock().await.move_cursor(0, -1),
                    KeyCode::Char('l') => state.lock().await.move_cursor(0, 1),
                    KeyCode::Char('k') => state.lock().await.move_cursor(-1, 0),
                    KeyCode::Char('j') => state.lock().await.move_cursor(1, 0),
                    KeyCode::Char(' ') => {
                        if let Some(seat) = cursor_seat {
                            events.push(SessionEvent::ToggleSeat(seat));
                        }
                    }
                    KeyCode::Char('c') => events.push(SessionEvent::Confirm),
                    KeyCode::Tab => {
                        if let Some(next) = next_viewpoint(tour, current_viewpoint.as_ref()) {
                            events.push(SessionEvent::ChangeViewpoint(next));
                        }
                    }
                    KeyCode::Char(d @ '1'..='9') => {
                        let idx = d as usize - '1' as usize;
                        if let Some(id) = hotspot_ids(tour, current_viewpoint.as_ref()).get(idx) {
                            events.push(SessionEvent::ActivateHotspot(id.clone()));
                        }
                    }
                    code => {
                        if let Some(key) = map_key(code) {
                            events.push(SessionEvent::Key(key));
                        }
                    }
                },
                Event::Mouse(mouse) => {
                    let x = mouse.column.saturating_sub(panorama_area.x) as f64 * CELL_WIDTH_PX;
                    let y = mouse.row.saturating_sub(panorama_area.y) as f64 * CELL_HEIGHT_PX;
                    match mouse.kind {
                        MouseEventKind::Down(MouseButton::Left) => {
                            events.push(SessionEvent::Pointer(PointerEvent::Down { x, y }))
                        }
                        MouseEventKind::Drag(MouseButton::Left) => {
                            events.push(SessionEvent::Pointer(PointerEvent::Move { x, y }))
                        }
                        MouseEventKind::Up(MouseButton::Left) => {
                            events.push(SessionEvent::Pointer(PointerEvent::Up))
                        }
                        MouseEventKind::ScrollUp => events.push(SessionEvent::Wheel(-WHEEL_NOTCH)),
                        MouseEventKind::ScrollDown => events.push(SessionEvent::Wheel(WHEEL_NOTCH)),
                        _ => {}
                    }
                }
                Event::FocusLost => events.push(SessionEvent::Pointer(PointerEvent::Leave)),
                _ => {}
            }

            for event in events {
                if event_tx.send(event).await.is_err() {
                    // Session task is gone
                    return Ok(());
                }
            }
        }

        if last_tick.elapsed() >= tick_rate {
            last_tick = Instant::now();
        }
    }
}

/// Draw everything; returns the panorama area so mouse input can be mapped
fn draw_ui(f: &mut Frame, state: &ViewState, tour: &Tour) -> Rect {
    let fullscreen = state.update.as_ref().is_some_and(|u| u.fullscreen);

    let main_chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header
            Constraint::Min(0),    // Body
            Constraint::Length(if fullscreen { 0 } else { 7 }), // Footer
        ])
        .split(f.area());

    draw_header(f, main_chunks[0], state, tour);

    if fullscreen {
        return draw_panorama(f, main_chunks[1], state);
    }

    let body_chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Length(34),      // Seat map
            Constraint::Percentage(100), // Panorama + markers
        ])
        .split(main_chunks[1]);

    draw_seat_map(f, body_chunks[0], state, tour);

    let right_chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Percentage(65), Constraint::Percentage(35)])
        .split(body_chunks[1]);

    let panorama = draw_panorama(f, right_chunks[0], state);
    draw_marker_list(f, right_chunks[1], state, tour);

    let footer_chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(45), Constraint::Percentage(55)])
        .split(main_chunks[2]);

    draw_selection_panel(f, footer_chunks[0], state);
    draw_notice_panel(f, footer_chunks[1], state);

    panorama
}

fn draw_header(f: &mut Frame, area: Rect, state: &ViewState, tour: &Tour) {
    let mut spans = vec![
        Span::styled("Seatview ", Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)),
        Span::raw(format!("| {} ", tour.name)),
    ];
    if let Some(update) = &state.update {
        let camera = &update.camera;
        spans.extend([
            Span::raw("| "),
            Span::styled(update.viewpoint_name.clone(), Style::default().fg(Color::Yellow)),
            Span::raw(format!(
                " | yaw {:>5.1} pitch {:>5.1} zoom {:.2} ",
                camera.yaw, camera.pitch, camera.zoom
            )),
            Span::styled(
                camera.mode.as_str().to_uppercase(),
                Style::default().fg(Color::Magenta),
            ),
        ]);
        if update.fullscreen {
            spans.push(Span::styled(" FULLSCREEN", Style::default().fg(Color::Green)));
        }
    }
    spans.push(Span::raw(" | q quit"));

    let header = Paragraph::new(Line::from(spans)).block(Block::default().borders(Borders::ALL));
    f.render_widget(header, area);
}

fn seat_style(seat: &SeatView, under_cursor: bool) -> Style {
    let mut style = if seat.selected {
        Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)
    } else {
        match seat.status {
            SeatStatus::Available => Style::default().fg(Color::Green),
            SeatStatus::Occupied => Style::default().fg(Color::Red),
            SeatStatus::Reserved => Style::default().fg(Color::Yellow),
            SeatStatus::Disabled => Style::default().fg(Color::DarkGray),
        }
    };
    if under_cursor {
        style = style.add_modifier(Modifier::REVERSED);
    }
    style
}

fn draw_seat_map(f: &mut Frame, area: Rect, state: &ViewState, tour: &Tour) {
    let mut lines: Vec<Line> = Vec::new();

    if let Some(update) = &state.update {
        let mut rows: Vec<u32> = update.seats.iter().map(|s| s.row).collect();
        rows.dedup();
        for row in rows {
            let mut spans = vec![Span::raw(format!("{:>2} ", row))];
            let row_seats: Vec<(usize, &SeatView)> =
                update.seats.iter().enumerate().filter(|(_, s)| s.row == row).collect();
            let aisle_after = row_seats.len() / 2;
            for (n, (idx, seat)) in row_seats.iter().enumerate() {
                if n == aisle_after {
                    spans.push(Span::raw("  "));
                }
                let label = if seat.selected { format!("[{}]", seat.id) } else { format!(" {} ", seat.id) };
                spans.push(Span::styled(label, seat_style(seat, *idx == state.cursor)));
            }
            if tour.layout.is_exit_row(row) {
                spans.push(Span::styled(" EXIT", Style::default().fg(Color::Red)));
            }
            lines.push(Line::from(spans));
        }
    }

    lines.push(Line::from(""));
    lines.push(Line::from(vec![
        Span::styled("■ free ", Style::default().fg(Color::Green)),
        Span::styled("■ taken ", Style::default().fg(Color::Red)),
        Span::styled("■ held ", Style::default().fg(Color::Yellow)),
        Span::styled("■ yours", Style::default().fg(Color::Cyan)),
    ]));
    if let Some(seat) = state.cursor_seat() {
        lines.push(Line::from(format!(
            "{} row {} {} {:.2}",
            seat.id,
            seat.row,
            seat.status.as_str(),
            seat.price
        )));
    }

    let map = Paragraph::new(lines).block(
        Block::default()
            .title(" Seats (hjkl, space) ")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Blue)),
    );
    f.render_widget(map, area);
}

fn marker_glyph(kind: &MarkerKind) -> (&'static str, Color) {
    match kind {
        MarkerKind::Seat { .. } => ("■", Color::Green),
        MarkerKind::Navigation { .. } => ("➜", Color::Cyan),
        MarkerKind::Amenity { .. } => ("✚", Color::Magenta),
        MarkerKind::Info { .. } => ("i", Color::Yellow),
    }
}

/// Markers placed by their projected position; returns the inner area
fn draw_panorama(f: &mut Frame, area: Rect, state: &ViewState) -> Rect {
    let block = Block::default()
        .title(" Panorama (drag, wheel) ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan));
    let inner = block.inner(area);
    f.render_widget(block, area);

    let Some(update) = &state.update else {
        return inner;
    };

    let (width_px, height_px) = viewport_px(inner);
    let mut grid: Vec<Vec<Span>> =
        vec![vec![Span::raw(" "); inner.width as usize]; inner.height as usize];

    for marker in update.markers.iter().filter(|m| m.projection.visible) {
        let col = (marker.projection.x / width_px * inner.width as f64) as usize;
        let row = (marker.projection.y / height_px * inner.height as f64) as usize;
        let (Some(line), true) = (grid.get_mut(row), col < inner.width as usize) else {
            continue;
        };
        let (glyph, color) = marker_glyph(&marker.kind);
        let color = match marker.seat_status {
            _ if marker.selected => Color::Cyan,
            Some(SeatStatus::Occupied) => Color::Red,
            Some(SeatStatus::Reserved) => Color::Yellow,
            Some(SeatStatus::Disabled) => Color::DarkGray,
            _ => color,
        };
        line[col] = Span::styled(glyph, Style::default().fg(color));
    }

    let lines: Vec<Line> = grid.into_iter().map(Line::from).collect();
    f.render_widget(Paragraph::new(lines), inner);
    inner
}

fn draw_marker_list(f: &mut Frame, area: Rect, state: &ViewState, tour: &Tour) {
    let current = state.update.as_ref().map(|u| &u.viewpoint);
    let hotspots = hotspot_ids(tour, current);

    let items: Vec<ListItem> = state
        .update
        .iter()
        .flat_map(|u| u.markers.iter())
        .filter(|m| !matches!(m.kind, MarkerKind::Seat { .. }) || hotspots.contains(&m.id))
        .map(|m| {
            let key = hotspots
                .iter()
                .position(|h| *h == m.id)
                .map(|i| format!("{} ", i + 1))
                .unwrap_or_else(|| "  ".to_string());
            let (glyph, color) = marker_glyph(&m.kind);
            let label = match &m.kind {
                MarkerKind::Seat { seat_id } => format!("seat {}", seat_id),
                MarkerKind::Amenity { label } => label.clone(),
                MarkerKind::Navigation { label, .. } => format!("go to {}", label),
                MarkerKind::Info { title, body } => format!("{}: {}", title, body),
            };
            let visibility = if m.projection.visible { "" } else { " (off screen)" };
            ListItem::new(Line::from(vec![
                Span::raw(key),
                Span::styled(glyph, Style::default().fg(color)),
                Span::raw(format!(" {}", label)),
                Span::styled(visibility, Style::default().fg(Color::DarkGray)),
            ]))
        })
        .collect();

    let list = List::new(items).block(
        Block::default()
            .title(" Hotspots (1-9, Tab next view) ")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan)),
    );
    f.render_widget(list, area);
}

fn seat_list(ids: &[SeatId]) -> String {
    if ids.is_empty() {
        return "-".to_string();
    }
    ids.iter().map(|s| s.as_str()).collect::<Vec<_>>().join(", ")
}

fn draw_selection_panel(f: &mut Frame, area: Rect, state: &ViewState) {
    let lines = match &state.update {
        Some(update) => vec![
            Line::from(vec![
                Span::raw("Selected: "),
                Span::styled(seat_list(&update.selection), Style::default().fg(Color::Cyan)),
                Span::raw(format!(" ({}/{})", update.selection.len(), update.max_selectable)),
            ]),
            Line::from(vec![
                Span::raw("Total: "),
                Span::styled(
                    format!("{:.2}", update.total_price),
                    Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
                ),
            ]),
            Line::from(vec![
                Span::raw("Suggested: "),
                Span::styled(seat_list(&update.recommendations), Style::default().fg(Color::Green)),
            ]),
            Line::from(Span::styled("c to confirm", Style::default().fg(Color::DarkGray))),
        ],
        None => vec![Line::from("waiting for session")],
    };

    let panel = Paragraph::new(lines).block(
        Block::default()
            .title(" Booking ")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Yellow)),
    );
    f.render_widget(panel, area);
}

fn draw_notice_panel(f: &mut Frame, area: Rect, state: &ViewState) {
    let lines: Vec<Line> = state.notices.iter().map(|n| Line::from(n.as_str())).collect();
    let panel = Paragraph::new(lines).wrap(Wrap { trim: true }).block(
        Block::default()
            .title(" Notices ")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Magenta)),
    );
    f.render_widget(panel, area);
}
