//! Line commands for the headless console
//!
//! ```text
//! select 3B | deselect 3B | toggle 3B
//! view rear | go to-rear
//! key left|right|up|down|+|-|r|t|f|esc
//! drag <dx> <dy> | wheel <delta> | pinch <scale> | resize <w> <h>
//! recommend | status | confirm | help | quit
//! ```

use crate::domain::types::{SeatId, ViewpointId};
use crate::services::camera::{KeyInput, PointerEvent};
use crate::services::session::SessionEvent;

/// Where a drag gesture starts; only deltas matter to the camera
const DRAG_ORIGIN: (f64, f64) = (0.0, 0.0);

#[derive(Debug, Clone, PartialEq)]
pub enum ConsoleCommand {
    /// Forwarded to the session in order
    Session(Vec<SessionEvent>),
    /// Print the latest recommendations
    Recommend,
    /// Print the latest session state
    Status,
    Help,
}

pub const HELP: &str = "commands: select <seat> | deselect <seat> | toggle <seat> | view <viewpoint> | \
go <hotspot> | key <left|right|up|down|+|-|r|t|f|esc> | drag <dx> <dy> | wheel <delta> | \
pinch <scale> | resize <w> <h> | recommend | status | confirm | help | quit";

fn number(arg: Option<&str>, name: &str) -> Result<f64, String> {
    let raw = arg.ok_or_else(|| format!("missing {}", name))?;
    let value: f64 = raw.parse().map_err(|_| format!("invalid {} '{}'", name, raw))?;
    if value.is_finite() {
        Ok(value)
    } else {
        Err(format!("invalid {} '{}'", name, raw))
    }
}

fn word<'a>(arg: Option<&'a str>, name: &str) -> Result<&'a str, String> {
    arg.ok_or_else(|| format!("missing {}", name))
}

/// Parse one input line. Blank lines yield `Ok(None)`.
pub fn parse_command(line: &str) -> Result<Option<ConsoleCommand>, String> {
    let mut parts = line.split_whitespace();
    let Some(verb) = parts.next() else {
        return Ok(None);
    };

    let one = |event: SessionEvent| ConsoleCommand::Session(vec![event]);
    let command = match verb.to_ascii_lowercase().as_str() {
        "select" => one(SessionEvent::Select(SeatId::new(word(parts.next(), "seat")?))),
        "deselect" => one(SessionEvent::Deselect(SeatId::new(word(parts.next(), "seat")?))),
        "toggle" => one(SessionEvent::ToggleSeat(SeatId::new(word(parts.next(), "seat")?))),
        "view" => one(SessionEvent::ChangeViewpoint(ViewpointId::new(word(parts.next(), "viewpoint")?))),
        "go" => one(SessionEvent::ActivateHotspot(word(parts.next(), "hotspot")?.to_string())),
        "key" => one(SessionEvent::Key(word(parts.next(), "key")?.parse::<KeyInput>()?)),
        "drag" => {
            let dx = number(parts.next(), "dx")?;
            let dy = number(parts.next(), "dy")?;
            let (x, y) = DRAG_ORIGIN;
            ConsoleCommand::Session(vec![
                SessionEvent::Pointer(PointerEvent::Down { x, y }),
                SessionEvent::Pointer(PointerEvent::Move { x: x + dx, y: y + dy }),
                SessionEvent::Pointer(PointerEvent::Up),
            ])
        }
        "wheel" => one(SessionEvent::Wheel(number(parts.next(), "delta")?)),
        "pinch" => one(SessionEvent::Pinch(number(parts.next(), "scale")?)),
        "resize" => one(SessionEvent::Resize {
            width: number(parts.next(), "width")?,
            height: number(parts.next(), "height")?,
        }),
        "confirm" | "book" => one(SessionEvent::Confirm),
        "quit" | "exit" | "close" => one(SessionEvent::Close),
        "recommend" => ConsoleCommand::Recommend,
        "status" => ConsoleCommand::Status,
        "help" | "?" => ConsoleCommand::Help,
        other => return Err(format!("unknown command '{}'", other)),
    };
    Ok(Some(command))
}
