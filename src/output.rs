//! Presentation of snapshots.
//!
//! Supports a plain-text board for terminals plus pretty-printed and JSON logging.

use std::fmt::Write;

use anyhow::Result;
use chrono::Local;
use tracing::{debug, info};

use crate::model::{Snapshot, TrainEvent};

/// Logs a snapshot using Rust's debug pretty-print format.
pub fn print_pretty(snapshot: &Snapshot) {
    debug!("{:#?}", snapshot);
}

/// Logs a snapshot as pretty-printed JSON.
pub fn print_json(snapshot: &Snapshot) -> Result<()> {
    info!("{}", serde_json::to_string_pretty(snapshot)?);
    Ok(())
}

/// Renders the board shown to the user: last update, departures, arrivals
/// and the two statistics. Times are shown in the local timezone.
pub fn render_board(snapshot: &Snapshot, station: &str) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "Trains - {station}");
    if let Some(ts) = snapshot.last_update {
        let _ = writeln!(out, "Last update: {}", ts.with_timezone(&Local).format("%H:%M:%S"));
    }
    if snapshot.loading {
        let _ = writeln!(out, "Loading...");
    }

    let _ = writeln!(out, "\nDepartures from {station}");
    render_section(&mut out, &snapshot.departures, "No departures found.");

    let _ = writeln!(out, "\nArrivals at {station}");
    render_section(&mut out, &snapshot.arrivals, "No arrivals found.");

    let _ = writeln!(out, "\nStatistics");
    let _ = writeln!(
        out,
        "  Average delay (next hour): {:.1} min",
        snapshot.stats.avg_delay_next_hour_minutes
    );
    let _ = writeln!(
        out,
        "  Cancellation rate (last 3 h): {:.1}%",
        snapshot.stats.cancelled_percent_last_3h
    );

    out
}

fn render_section(out: &mut String, events: &[TrainEvent], empty: &str) {
    if events.is_empty() {
        let _ = writeln!(out, "  {empty}");
        return;
    }
    for ev in events {
        let _ = writeln!(out, "  {}", render_line(ev));
    }
}

fn render_line(ev: &TrainEvent) -> String {
    let marker = if ev.canceled {
        " [CANCELLED]"
    } else if ev.is_late() {
        " [LATE]"
    } else {
        ""
    };
    let platform = ev
        .platform
        .as_deref()
        .map(|p| format!("  platform {p}"))
        .unwrap_or_default();
    format!(
        "{}  {:<28} +{} min{}{}",
        ev.scheduled.with_timezone(&Local).format("%H:%M"),
        ev.display_name(),
        ev.delay_minutes_rounded(),
        platform,
        marker
    )
}
