//! Route and time-horizon filtering of board events.

use chrono::{DateTime, Duration, Utc};

use crate::model::TrainEvent;

/// Case-insensitive substring matcher over station names.
#[derive(Debug, Clone)]
pub struct RouteMatcher {
    fragments: Vec<String>,
}

impl RouteMatcher {
    pub fn new<I, S>(fragments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            fragments: fragments
                .into_iter()
                .map(|f| f.as_ref().to_lowercase())
                .collect(),
        }
    }

    pub fn matches_name(&self, name: &str) -> bool {
        let lower = name.to_lowercase();
        self.fragments.iter().any(|f| lower.contains(f.as_str()))
    }

    /// True if the counterpart or the direction name matches. An event with
    /// neither never matches.
    pub fn matches(&self, event: &TrainEvent) -> bool {
        [&event.counterpart_name, &event.direction_name]
            .into_iter()
            .flatten()
            .any(|name| self.matches_name(name))
    }
}

/// `now + offset`, clamped to the representable range.
pub fn saturating_offset(now: DateTime<Utc>, offset: Duration) -> DateTime<Utc> {
    match now.checked_add_signed(offset) {
        Some(t) => t,
        None if offset < Duration::zero() => DateTime::<Utc>::MIN_UTC,
        None => DateTime::<Utc>::MAX_UTC,
    }
}

/// True if `event` lies strictly between `now` and `now + horizon`.
pub fn within_horizon(event: &TrainEvent, now: DateTime<Utc>, horizon: Duration) -> bool {
    event.scheduled > now && event.scheduled < saturating_offset(now, horizon)
}

/// Keeps the events that are upcoming within `horizon` and on the route.
///
/// Feed order is preserved.
pub fn filter_route(
    events: &[TrainEvent],
    now: DateTime<Utc>,
    horizon: Duration,
    route: &RouteMatcher,
) -> Vec<TrainEvent> {
    events
        .iter()
        .filter(|e| within_horizon(e, now, horizon))
        .filter(|e| route.matches(e))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::EventKind;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000, 0).unwrap()
    }

    fn dep(offset: Duration, name: &str) -> TrainEvent {
        TrainEvent::new(EventKind::Departure, now() + offset).with_counterpart(name)
    }

    fn route() -> RouteMatcher {
        RouteMatcher::new(["bruxelles", "brussel", "charleroi"])
    }

    #[test]
    fn test_horizon_bounds_are_exclusive() {
        let horizon = Duration::hours(2);
        let events = vec![
            dep(Duration::zero(), "Bruxelles-Midi"),
            dep(Duration::milliseconds(1), "Bruxelles-Midi"),
            dep(horizon - Duration::milliseconds(1), "Bruxelles-Midi"),
            dep(horizon, "Bruxelles-Midi"),
        ];
        let kept = filter_route(&events, now(), horizon, &route());
        assert_eq!(kept, vec![events[1].clone(), events[2].clone()]);
    }

    #[test]
    fn test_past_events_excluded() {
        let events = vec![dep(Duration::minutes(-5), "Bruxelles-Midi")];
        assert!(filter_route(&events, now(), Duration::hours(2), &route()).is_empty());
    }

    #[test]
    fn test_route_match_is_case_insensitive() {
        assert!(route().matches_name("BRUXELLES-MIDI"));
        assert!(route().matches_name("Brussel-Zuid"));
        assert!(RouteMatcher::new(["BRUXELLES"]).matches_name("bruxelles-central"));
        assert!(!route().matches_name("Namur"));
    }

    #[test]
    fn test_event_without_name_excluded() {
        let ev = TrainEvent::new(EventKind::Arrival, now() + Duration::minutes(10));
        assert!(!route().matches(&ev));
    }

    #[test]
    fn test_direction_name_can_match() {
        let mut ev = dep(Duration::minutes(10), "Nivelles");
        assert!(!route().matches(&ev));
        ev.direction_name = Some("Charleroi-Central".into());
        assert!(route().matches(&ev));
    }

    #[test]
    fn test_order_preserved() {
        let events = vec![
            dep(Duration::minutes(40), "Charleroi-Central"),
            dep(Duration::minutes(20), "Namur"),
            dep(Duration::minutes(10), "Bruxelles-Midi"),
        ];
        let kept = filter_route(&events, now(), Duration::hours(2), &route());
        let names: Vec<_> = kept.iter().map(|e| e.display_name()).collect();
        assert_eq!(names, vec!["Charleroi-Central", "Bruxelles-Midi"]);
    }

    #[test]
    fn test_huge_horizon_saturates() {
        let events = vec![dep(Duration::minutes(10), "Bruxelles-Midi")];
        let kept = filter_route(&events, now(), Duration::MAX, &route());
        assert_eq!(kept.len(), 1);
        assert_eq!(saturating_offset(now(), Duration::MAX), DateTime::<Utc>::MAX_UTC);
        assert_eq!(saturating_offset(now(), Duration::MIN), DateTime::<Utc>::MIN_UTC);
    }
}
