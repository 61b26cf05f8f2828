//! Static configuration of the aggregator.

use chrono::Duration;

/// Default iRail liveboard endpoint.
pub const DEFAULT_BASE_URL: &str = "https://api.irail.be/liveboard/";

pub const DEFAULT_STATION: &str = "Nivelles";

/// Fragments that identify the Brussels - Charleroi line, lower case.
pub const DEFAULT_ROUTE_SUBSTRINGS: &[&str] = &["bruxelles", "brussel", "charleroi"];

/// Everything the aggregator needs to know about what to poll and how to window it.
#[derive(Debug, Clone)]
pub struct AggregatorConfig {
    /// Station whose live board is polled
    pub station: String,
    /// Case-insensitive fragments matched against counterpart names
    pub route_substrings: Vec<String>,
    /// Forward look-ahead for listed events
    pub horizon: Duration,
    /// Delay between two cycle starts
    pub poll_interval: std::time::Duration,
    /// Forward window of the average delay statistic
    pub next_hour_window: Duration,
    /// Backward window of the cancellation statistic
    pub recent_window: Duration,
    /// Liveboard endpoint (overridable for testing)
    pub base_url: String,
    /// Per-request timeout
    pub request_timeout: std::time::Duration,
    pub user_agent: String,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            station: DEFAULT_STATION.to_string(),
            route_substrings: DEFAULT_ROUTE_SUBSTRINGS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            horizon: Duration::hours(2),
            poll_interval: std::time::Duration::from_secs(60),
            next_hour_window: Duration::hours(1),
            recent_window: Duration::hours(3),
            base_url: DEFAULT_BASE_URL.to_string(),
            request_timeout: std::time::Duration::from_secs(30),
            user_agent: format!("liveboard_watch/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl AggregatorConfig {
    pub fn new(station: impl Into<String>) -> Self {
        Self {
            station: station.into(),
            ..Self::default()
        }
    }

    /// Replace the route fragments. Empty entries are dropped.
    pub fn with_route_substrings<I, S>(mut self, substrings: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.route_substrings = substrings
            .into_iter()
            .map(|s| s.as_ref().trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        self
    }

    pub fn with_horizon(mut self, horizon: Duration) -> Self {
        self.horizon = horizon;
        self
    }

    pub fn with_poll_interval(mut self, interval: std::time::Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_next_hour_window(mut self, window: Duration) -> Self {
        self.next_hour_window = window;
        self
    }

    pub fn with_recent_window(mut self, window: Duration) -> Self {
        self.recent_window = window;
        self
    }

    /// Set a custom base URL (for testing).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn with_request_timeout(mut self, timeout: std::time::Duration) -> Self {
        self.request_timeout = timeout;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = AggregatorConfig::default();
        assert_eq!(cfg.station, "Nivelles");
        assert_eq!(cfg.horizon, Duration::hours(2));
        assert_eq!(cfg.poll_interval, std::time::Duration::from_secs(60));
        assert_eq!(cfg.next_hour_window, Duration::hours(1));
        assert_eq!(cfg.recent_window, Duration::hours(3));
        assert_eq!(cfg.route_substrings, vec!["bruxelles", "brussel", "charleroi"]);
    }

    #[test]
    fn test_route_substrings_drop_blanks() {
        let cfg = AggregatorConfig::new("Ottignies").with_route_substrings(["namur", " ", "louvain"]);
        assert_eq!(cfg.station, "Ottignies");
        assert_eq!(cfg.route_substrings, vec!["namur", "louvain"]);
    }
}
