//! JSON parser for iRail liveboard responses.
//!
//! The board encodes most numbers as strings and flags cancellation with the
//! sentinel `"1"`; both quirks are normalized here so the rest of the crate
//! only sees typed [`TrainEvent`]s.

use chrono::{DateTime, TimeZone, Utc};
use serde_json::Value;
use tracing::warn;

use crate::error::{FetchError, ParseWarning};
use crate::fetch::Direction;
use crate::model::TrainEvent;

/// Parsed content of one direction of a live board.
#[derive(Debug, Default)]
pub struct Liveboard {
    /// Events in feed order.
    pub events: Vec<TrainEvent>,
    pub warnings: Vec<ParseWarning>,
}

/// Decodes a liveboard body.
///
/// A missing `departures`/`arrivals` container yields an empty board.
///
/// # Errors
///
/// Returns an error only if `bytes` is not JSON.
pub fn parse_liveboard(bytes: &[u8], direction: Direction) -> Result<Liveboard, FetchError> {
    let json: Value = serde_json::from_slice(bytes)?;

    let records = match direction {
        Direction::Departure => &json["departures"]["departure"],
        Direction::Arrival => &json["arrivals"]["arrival"],
    };

    let mut board = Liveboard::default();
    let Some(records) = records.as_array() else {
        return Ok(board);
    };

    for (index, record) in records.iter().enumerate() {
        if let Some(event) = parse_record(record, index, direction, &mut board.warnings) {
            board.events.push(event);
        }
    }

    for w in &board.warnings {
        warn!(direction = %direction, warning = %w, "Liveboard record degraded");
    }

    Ok(board)
}

fn parse_record(
    record: &Value,
    index: usize,
    direction: Direction,
    warnings: &mut Vec<ParseWarning>,
) -> Option<TrainEvent> {
    let scheduled = match &record["time"] {
        Value::Null => {
            warnings.push(ParseWarning::MissingTime { index });
            return None;
        }
        raw => match as_i64(raw).and_then(epoch_secs) {
            Some(t) => t,
            None => {
                warnings.push(ParseWarning::InvalidTime {
                    index,
                    raw: raw_text(raw),
                });
                return None;
            }
        },
    };

    let delay_seconds = match &record["delay"] {
        Value::Null => 0,
        raw => match as_i64(raw) {
            Some(d) => d.clamp(0, i64::from(u32::MAX)) as u32,
            None => {
                warnings.push(ParseWarning::InvalidDelay {
                    index,
                    raw: raw_text(raw),
                });
                0
            }
        },
    };

    Some(TrainEvent {
        kind: direction.kind(),
        scheduled,
        counterpart_name: non_empty_str(&record["station"]),
        direction_name: non_empty_str(&record["direction"])
            .or_else(|| non_empty_str(&record["direction"]["name"])),
        delay_seconds,
        canceled: is_sentinel_true(&record["canceled"]),
        vehicle: non_empty_str(&record["vehicle"]),
        platform: non_empty_str(&record["platform"]),
    })
}

fn epoch_secs(secs: i64) -> Option<DateTime<Utc>> {
    Utc.timestamp_opt(secs, 0).single()
}

/// Accepts both `"360"` and `360`.
fn as_i64(v: &Value) -> Option<i64> {
    match v {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// `"1"` or `1` means true; anything else, including absence, is false.
fn is_sentinel_true(v: &Value) -> bool {
    match v {
        Value::String(s) => s == "1",
        Value::Number(n) => n.as_i64() == Some(1),
        _ => false,
    }
}

fn non_empty_str(v: &Value) -> Option<String> {
    v.as_str()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn raw_text(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::EventKind;

    #[test]
    fn test_parse_departures_with_string_fields() {
        let body = br#"{
            "station": "Nivelles",
            "departures": {
                "number": "2",
                "departure": [
                    {"time": "1700000600", "station": "Bruxelles-Midi", "delay": "360",
                     "canceled": "0", "vehicle": "BE.NMBS.IC2311", "platform": "3"},
                    {"time": 1700001200, "station": "Charleroi-Central", "delay": 0,
                     "canceled": "1"}
                ]
            }
        }"#;
        let board = parse_liveboard(body, Direction::Departure).unwrap();
        assert!(board.warnings.is_empty());
        assert_eq!(board.events.len(), 2);

        let first = &board.events[0];
        assert_eq!(first.kind, EventKind::Departure);
        assert_eq!(first.scheduled_time_ms(), 1_700_000_600_000);
        assert_eq!(first.counterpart_name.as_deref(), Some("Bruxelles-Midi"));
        assert_eq!(first.delay_seconds, 360);
        assert!(!first.canceled);
        assert_eq!(first.platform.as_deref(), Some("3"));

        assert!(board.events[1].canceled);
    }

    #[test]
    fn test_parse_arrivals_container() {
        let body = br#"{"arrivals": {"arrival": [{"time": "1700000000", "station": "Charleroi-Central"}]}}"#;
        let board = parse_liveboard(body, Direction::Arrival).unwrap();
        assert_eq!(board.events.len(), 1);
        assert_eq!(board.events[0].kind, EventKind::Arrival);
        // Asking for the other half of the same body finds nothing.
        let board = parse_liveboard(body, Direction::Departure).unwrap();
        assert!(board.events.is_empty());
    }

    #[test]
    fn test_missing_fields_degrade() {
        let body = br#"{"departures": {"departure": [{"time": "1700000000"}]}}"#;
        let board = parse_liveboard(body, Direction::Departure).unwrap();
        let ev = &board.events[0];
        assert_eq!(ev.delay_seconds, 0);
        assert!(!ev.canceled);
        assert!(ev.counterpart_name.is_none());
        assert!(board.warnings.is_empty());
    }

    #[test]
    fn test_bad_records_produce_warnings() {
        let body = br#"{"departures": {"departure": [
            {"station": "Bruxelles-Midi"},
            {"time": "soon", "station": "Bruxelles-Midi"},
            {"time": "1700000000", "delay": "n/a", "station": "Bruxelles-Midi"}
        ]}}"#;
        let board = parse_liveboard(body, Direction::Departure).unwrap();
        assert_eq!(board.events.len(), 1);
        assert_eq!(board.events[0].delay_seconds, 0);
        assert_eq!(
            board.warnings,
            vec![
                ParseWarning::MissingTime { index: 0 },
                ParseWarning::InvalidTime {
                    index: 1,
                    raw: "soon".into()
                },
                ParseWarning::InvalidDelay {
                    index: 2,
                    raw: "n/a".into()
                },
            ]
        );
    }

    #[test]
    fn test_negative_delay_clamped() {
        let body = br#"{"departures": {"departure": [{"time": "1700000000", "delay": "-60"}]}}"#;
        let board = parse_liveboard(body, Direction::Departure).unwrap();
        assert_eq!(board.events[0].delay_seconds, 0);
    }

    #[test]
    fn test_direction_object_name() {
        let body = br#"{"departures": {"departure": [
            {"time": "1700000000", "direction": {"name": "Bruxelles-Nord"}}
        ]}}"#;
        let board = parse_liveboard(body, Direction::Departure).unwrap();
        assert_eq!(board.events[0].direction_name.as_deref(), Some("Bruxelles-Nord"));
    }

    #[test]
    fn test_missing_container_is_empty() {
        let board = parse_liveboard(br#"{"error": 404}"#, Direction::Departure).unwrap();
        assert!(board.events.is_empty());
    }

    #[test]
    fn test_invalid_json() {
        let result = parse_liveboard(b"<html>502</html>", Direction::Departure);
        assert!(matches!(result, Err(FetchError::Json(_))));
    }
}
