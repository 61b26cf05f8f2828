use chrono::{DateTime, Duration, Utc};

use crate::filter::saturating_offset;
use crate::model::{Stats, TrainEvent};

pub fn pct(part: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        (part as f64 / total as f64) * 100.0
    }
}

/// Rounds to one fraction digit.
pub fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Mean delay in minutes of the events scheduled before `now + window`.
///
/// Cancelled events count with whatever delay they carry. Returns 0.0 when
/// the window is empty.
pub fn avg_delay_minutes<'a, I>(events: I, now: DateTime<Utc>, window: Duration) -> f64
where
    I: IntoIterator<Item = &'a TrainEvent>,
{
    let end = saturating_offset(now, window);
    let (sum, count) = events
        .into_iter()
        .filter(|e| e.scheduled < end)
        .fold((0.0, 0usize), |(sum, n), e| (sum + e.delay_minutes(), n + 1));

    if count == 0 {
        0.0
    } else {
        round1(sum / count as f64)
    }
}

/// Share of cancelled events among those scheduled after `now - window`.
///
/// Only ever sees events that already passed the forward horizon filter, so
/// the backward window effectively covers `(now, now + horizon)`.
pub fn cancelled_percent<'a, I>(events: I, now: DateTime<Utc>, window: Duration) -> f64
where
    I: IntoIterator<Item = &'a TrainEvent>,
{
    let start = saturating_offset(now, -window);
    let (cancelled, total) = events
        .into_iter()
        .filter(|e| e.scheduled > start)
        .fold((0usize, 0usize), |(c, n), e| (c + usize::from(e.canceled), n + 1));

    round1(pct(cancelled, total))
}

/// Both statistics over the already filtered departures and arrivals combined.
pub fn compute_stats(
    departures: &[TrainEvent],
    arrivals: &[TrainEvent],
    now: DateTime<Utc>,
    next_hour_window: Duration,
    recent_window: Duration,
) -> Stats {
    Stats {
        avg_delay_next_hour_minutes: avg_delay_minutes(
            departures.iter().chain(arrivals),
            now,
            next_hour_window,
        ),
        cancelled_percent_last_3h: cancelled_percent(
            departures.iter().chain(arrivals),
            now,
            recent_window,
        ),
    }
}
