//! Value types shared by the fetch, filter, stats and scheduler stages.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Delay above which a train is shown as late, in seconds.
const LATE_THRESHOLD_SECS: u32 = 5 * 60;

/// Whether an event leaves from or arrives at the watched station.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    Departure,
    Arrival,
}

/// One scheduled movement at the watched station.
///
/// Built once by the parser and never mutated afterwards; every poll cycle
/// produces a fresh set.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrainEvent {
    pub kind: EventKind,
    pub scheduled: DateTime<Utc>,
    /// Destination for a departure, origin for an arrival.
    pub counterpart_name: Option<String>,
    /// Secondary heading reported by some boards; also checked by the route filter.
    pub direction_name: Option<String>,
    pub delay_seconds: u32,
    pub canceled: bool,
    pub vehicle: Option<String>,
    pub platform: Option<String>,
}

impl TrainEvent {
    pub fn new(kind: EventKind, scheduled: DateTime<Utc>) -> Self {
        Self {
            kind,
            scheduled,
            counterpart_name: None,
            direction_name: None,
            delay_seconds: 0,
            canceled: false,
            vehicle: None,
            platform: None,
        }
    }

    pub fn with_counterpart(mut self, name: &str) -> Self {
        self.counterpart_name = Some(name.to_string());
        self
    }

    pub fn with_delay(mut self, delay_seconds: u32) -> Self {
        self.delay_seconds = delay_seconds;
        self
    }

    pub fn with_canceled(mut self, canceled: bool) -> Self {
        self.canceled = canceled;
        self
    }

    pub fn scheduled_time_ms(&self) -> i64 {
        self.scheduled.timestamp_millis()
    }

    pub fn delay_minutes(&self) -> f64 {
        f64::from(self.delay_seconds) / 60.0
    }

    pub fn delay_minutes_rounded(&self) -> i64 {
        self.delay_minutes().round() as i64
    }

    pub fn is_late(&self) -> bool {
        self.delay_seconds > LATE_THRESHOLD_SECS
    }

    /// Name shown on the board: the counterpart, falling back to the direction.
    pub fn display_name(&self) -> &str {
        self.counterpart_name
            .as_deref()
            .or(self.direction_name.as_deref())
            .unwrap_or("?")
    }
}

/// Rolling statistics, both rounded to one decimal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Stats {
    pub avg_delay_next_hour_minutes: f64,
    pub cancelled_percent_last_3h: f64,
}

/// The aggregator's published state. Always replaced as a whole.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Snapshot {
    pub departures: Vec<TrainEvent>,
    pub arrivals: Vec<TrainEvent>,
    pub stats: Stats,
    pub last_update: Option<DateTime<Utc>>,
    pub loading: bool,
}

impl Snapshot {
    /// The state before any cycle has run: empty, with the first fetch pending.
    pub fn initial() -> Self {
        Self {
            departures: Vec::new(),
            arrivals: Vec::new(),
            stats: Stats::default(),
            last_update: None,
            loading: true,
        }
    }

    /// Copy of this snapshot with only the loading flag changed.
    pub fn with_loading(&self, loading: bool) -> Self {
        Self {
            loading,
            ..self.clone()
        }
    }
}

impl Default for Snapshot {
    fn default() -> Self {
        Self::initial()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    #[test]
    fn test_initial_snapshot_is_loading_and_empty() {
        let snap = Snapshot::initial();
        assert!(snap.loading);
        assert!(snap.departures.is_empty());
        assert!(snap.arrivals.is_empty());
        assert_eq!(snap.stats, Stats::default());
        assert!(snap.last_update.is_none());
    }

    #[test]
    fn test_late_threshold_is_strict() {
        let on_edge = TrainEvent::new(EventKind::Departure, at(0)).with_delay(300);
        let over = TrainEvent::new(EventKind::Departure, at(0)).with_delay(301);
        assert!(!on_edge.is_late());
        assert!(over.is_late());
    }

    #[test]
    fn test_delay_minutes_rounded() {
        let ev = TrainEvent::new(EventKind::Arrival, at(0)).with_delay(90);
        assert_eq!(ev.delay_minutes(), 1.5);
        assert_eq!(ev.delay_minutes_rounded(), 2);
    }

    #[test]
    fn test_display_name_falls_back_to_direction() {
        let mut ev = TrainEvent::new(EventKind::Departure, at(0));
        assert_eq!(ev.display_name(), "?");
        ev.direction_name = Some("Charleroi-Central".into());
        assert_eq!(ev.display_name(), "Charleroi-Central");
        let ev = ev.with_counterpart("Bruxelles-Midi");
        assert_eq!(ev.display_name(), "Bruxelles-Midi");
    }

    #[test]
    fn test_scheduled_time_ms() {
        let ev = TrainEvent::new(EventKind::Departure, at(1_700_000_000));
        assert_eq!(ev.scheduled_time_ms(), 1_700_000_000_000);
    }
}
