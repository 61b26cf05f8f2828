//! Polling loop that turns live boards into published [`Snapshot`]s.
//!
//! One [`Aggregator`] owns the snapshot. A cycle fetches both directions
//! concurrently, filters them, computes the statistics and replaces the
//! snapshot in one step. At most one cycle is in flight at a time; a failed
//! cycle leaves the previous data in place.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{DateTime, Utc};
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info};

use crate::config::AggregatorConfig;
use crate::error::FetchError;
use crate::fetch::{Direction, LiveboardSource};
use crate::filter::{RouteMatcher, filter_route};
use crate::model::Snapshot;
use crate::stats::compute_stats;

/// What happened to a requested cycle.
#[derive(Debug)]
pub enum CycleOutcome {
    /// A new snapshot replaced the previous one.
    Published,
    /// A fetch failed; only `loading` changed.
    Failed(FetchError),
    /// Another cycle was already in flight; nothing was fetched.
    Skipped,
    /// The aggregator was stopped before the cycle finished; its result was dropped.
    Discarded,
}

pub struct Aggregator<S> {
    source: S,
    config: AggregatorConfig,
    route: RouteMatcher,
    snapshot: watch::Sender<Arc<Snapshot>>,
    in_flight: AtomicBool,
    stopped: AtomicBool,
}

impl<S: LiveboardSource> Aggregator<S> {
    pub fn new(source: S, config: AggregatorConfig) -> Self {
        let (snapshot, _) = watch::channel(Arc::new(Snapshot::initial()));
        Self {
            route: RouteMatcher::new(&config.route_substrings),
            source,
            config,
            snapshot,
            in_flight: AtomicBool::new(false),
            stopped: AtomicBool::new(false),
        }
    }

    pub fn config(&self) -> &AggregatorConfig {
        &self.config
    }

    /// The most recently published snapshot.
    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.snapshot.borrow().clone()
    }

    /// A receiver notified on every publish.
    pub fn subscribe(&self) -> watch::Receiver<Arc<Snapshot>> {
        self.snapshot.subscribe()
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }

    /// Stops accepting cycles. A cycle still in flight completes but is discarded.
    pub fn stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);
    }

    pub async fn run_cycle(&self) -> CycleOutcome {
        self.run_cycle_at(Utc::now()).await
    }

    /// Runs one fetch-filter-compute-publish pass with `now` as the reference time.
    #[tracing::instrument(skip(self), fields(station = %self.config.station))]
    pub async fn run_cycle_at(&self, now: DateTime<Utc>) -> CycleOutcome {
        if self.is_stopped() {
            return CycleOutcome::Discarded;
        }
        let Some(_guard) = CycleGuard::acquire(self) else {
            debug!("Cycle already in flight, tick dropped");
            return CycleOutcome::Skipped;
        };

        self.set_loading(true);
        let result = self.build_snapshot(now).await;

        if self.is_stopped() {
            debug!("Aggregator stopped during cycle, result discarded");
            return CycleOutcome::Discarded;
        }

        match result {
            Ok(snapshot) => {
                info!(
                    departures = snapshot.departures.len(),
                    arrivals = snapshot.arrivals.len(),
                    avg_delay = snapshot.stats.avg_delay_next_hour_minutes,
                    cancelled_pct = snapshot.stats.cancelled_percent_last_3h,
                    "Snapshot published"
                );
                self.snapshot.send_replace(Arc::new(snapshot));
                CycleOutcome::Published
            }
            Err(e) => {
                error!(error = %e, "Liveboard cycle failed, keeping previous snapshot");
                CycleOutcome::Failed(e)
            }
        }
    }

    async fn build_snapshot(&self, now: DateTime<Utc>) -> Result<Snapshot, FetchError> {
        let station = self.config.station.as_str();
        let (departures, arrivals) = tokio::join!(
            self.source.fetch_liveboard(station, Direction::Departure),
            self.source.fetch_liveboard(station, Direction::Arrival),
        );
        let (departures, arrivals) = (departures?, arrivals?);

        let departures = filter_route(&departures.events, now, self.config.horizon, &self.route);
        let arrivals = filter_route(&arrivals.events, now, self.config.horizon, &self.route);
        let stats = compute_stats(
            &departures,
            &arrivals,
            now,
            self.config.next_hour_window,
            self.config.recent_window,
        );

        Ok(Snapshot {
            departures,
            arrivals,
            stats,
            last_update: Some(Utc::now()),
            loading: false,
        })
    }

    fn set_loading(&self, loading: bool) {
        self.snapshot.send_if_modified(|current| {
            if current.loading == loading {
                return false;
            }
            *current = Arc::new(current.with_loading(loading));
            true
        });
    }
}

/// Holds the in-flight flag for one cycle.
///
/// Dropping it returns the aggregator to idle and clears `loading`, whether
/// the cycle resolved, was cancelled at an await point, or panicked.
struct CycleGuard<'a, S: LiveboardSource> {
    aggregator: &'a Aggregator<S>,
}

impl<'a, S: LiveboardSource> CycleGuard<'a, S> {
    fn acquire(aggregator: &'a Aggregator<S>) -> Option<Self> {
        aggregator
            .in_flight
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .ok()
            .map(|_| Self { aggregator })
    }
}

impl<S: LiveboardSource> Drop for CycleGuard<'_, S> {
    fn drop(&mut self) {
        self.aggregator.set_loading(false);
        self.aggregator.in_flight.store(false, Ordering::SeqCst);
    }
}

impl<S: LiveboardSource + 'static> Aggregator<S> {
    /// Starts the polling timer: one cycle immediately, then one per interval.
    ///
    /// Each cycle runs in its own task so that shutting down never cancels
    /// a fetch pair mid-flight.
    pub fn spawn(self: Arc<Self>) -> SchedulerHandle<S> {
        let (shutdown_tx, mut shutdown_rx) = oneshot::channel();
        let aggregator = self.clone();

        let task = tokio::spawn(async move {
            let mut interval = tokio::time::interval(aggregator.config.poll_interval);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            info!(
                station = %aggregator.config.station,
                interval_secs = aggregator.config.poll_interval.as_secs(),
                "Polling started"
            );

            loop {
                tokio::select! {
                    _ = &mut shutdown_rx => break,
                    _ = interval.tick() => {
                        let aggregator = aggregator.clone();
                        tokio::spawn(async move {
                            aggregator.run_cycle().await;
                        });
                    }
                }
            }

            info!("Polling stopped");
        });

        SchedulerHandle {
            aggregator: self,
            shutdown: shutdown_tx,
            task,
        }
    }
}

/// Owner of a running polling loop.
pub struct SchedulerHandle<S> {
    aggregator: Arc<Aggregator<S>>,
    shutdown: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

impl<S: LiveboardSource> SchedulerHandle<S> {
    pub fn aggregator(&self) -> &Arc<Aggregator<S>> {
        &self.aggregator
    }

    /// Cancels the timer and waits for the loop to exit. No cycle starts or
    /// publishes after this returns.
    pub async fn shutdown(self) {
        self.aggregator.stop();
        let _ = self.shutdown.send(());
        if let Err(e) = self.task.await {
            error!(error = %e, "Polling task ended abnormally");
        }
    }
}
