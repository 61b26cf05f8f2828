//! Live-board feed client.
//!
//! [`fetch_liveboard`] issues one GET against the liveboard endpoint and
//! hands the body to the parser. [`LiveboardSource`] is the seam the
//! scheduler depends on; [`FeedClient`] is its HTTP implementation.

mod basic;
mod client;

pub use basic::BasicClient;
pub use client::HttpClient;

use std::fmt;

use async_trait::async_trait;
use reqwest::Url;
use tracing::debug;

use crate::config::AggregatorConfig;
use crate::error::FetchError;
use crate::model::EventKind;
use crate::parser::{Liveboard, parse_liveboard};

/// Which half of the live board to request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Departure,
    Arrival,
}

impl Direction {
    /// Value of the `arrdep` query parameter.
    pub fn as_str(self) -> &'static str {
        match self {
            Direction::Departure => "departure",
            Direction::Arrival => "arrival",
        }
    }

    pub fn kind(self) -> EventKind {
        match self {
            Direction::Departure => EventKind::Departure,
            Direction::Arrival => EventKind::Arrival,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Builds `{base}?station=..&arrdep=..&format=json`.
pub fn liveboard_url(base_url: &str, station: &str, direction: Direction) -> Result<Url, FetchError> {
    Url::parse_with_params(
        base_url,
        &[
            ("station", station),
            ("arrdep", direction.as_str()),
            ("format", "json"),
        ],
    )
    .map_err(|e| FetchError::InvalidUrl(format!("{base_url}: {e}")))
}

/// Fetches and parses one direction of a station's live board.
///
/// # Errors
///
/// Fails on transport errors, non-2xx statuses and bodies that are not JSON.
#[tracing::instrument(skip_all, fields(station = %station, direction = %direction))]
pub async fn fetch_liveboard<C: HttpClient>(
    client: &C,
    base_url: &str,
    station: &str,
    direction: Direction,
) -> Result<Liveboard, FetchError> {
    let url = liveboard_url(base_url, station, direction)?;
    let req = reqwest::Request::new(reqwest::Method::GET, url);

    let resp = client.execute(req).await?;
    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(FetchError::Status {
            status: status.as_u16(),
            body,
        });
    }

    let bytes = resp.bytes().await?;
    debug!(bytes = bytes.len(), "Liveboard body received, parsing");
    parse_liveboard(&bytes, direction)
}

/// Anything that can produce a parsed live board for a station and direction.
#[async_trait]
pub trait LiveboardSource: Send + Sync {
    async fn fetch_liveboard(&self, station: &str, direction: Direction) -> Result<Liveboard, FetchError>;
}

/// [`LiveboardSource`] backed by an [`HttpClient`].
pub struct FeedClient<C = BasicClient> {
    http: C,
    base_url: String,
}

impl FeedClient<BasicClient> {
    pub fn from_config(config: &AggregatorConfig) -> Result<Self, FetchError> {
        Ok(Self::new(BasicClient::from_config(config)?, &config.base_url))
    }
}

impl<C: HttpClient> FeedClient<C> {
    pub fn new(http: C, base_url: &str) -> Self {
        Self {
            http,
            base_url: base_url.to_string(),
        }
    }
}

#[async_trait]
impl<C: HttpClient> LiveboardSource for FeedClient<C> {
    async fn fetch_liveboard(&self, station: &str, direction: Direction) -> Result<Liveboard, FetchError> {
        fetch_liveboard(&self.http, &self.base_url, station, direction).await
    }
}
