//! The poll loop.
//!
//! Every tick selects the feed with the oldest (or no) `last_fetched_at`,
//! marks it fetched, fetches it and hands the entries to ingestion. Marking
//! happens before the network call so a slow or failing feed cannot be
//! selected again on the next tick, which also keeps concurrent schedulers on
//! the same database spread across different feeds.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::task::{JoinError, JoinHandle};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use crate::fetcher::{FeedSource, FetchError, DEFAULT_TIMEOUT};
use crate::ingestion::{self, IngestReport};
use crate::registry::{Feed, FeedRegistry, PostStore, RegistryError};
use crate::telemetry::{self};
use crate::telemetry::ops::agg::Phase as AggPhase;

#[derive(Debug)]
pub enum TickOutcome {
    /// No feeds registered.
    Idle,
    Polled { feed: Feed, found: usize, report: IngestReport },
    FetchFailed { feed: Feed, error: FetchError },
    /// Selecting or marking the feed failed; nothing was fetched.
    Failed(RegistryError),
}

pub struct Scheduler {
    registry: Arc<dyn FeedRegistry>,
    posts: Arc<dyn PostStore>,
    source: Arc<dyn FeedSource>,
    interval: Duration,
    fetch_timeout: Duration,
}

impl Scheduler {
    pub fn new(
        registry: Arc<dyn FeedRegistry>,
        posts: Arc<dyn PostStore>,
        source: Arc<dyn FeedSource>,
        interval: Duration,
    ) -> Self {
        Self { registry, posts, source, interval, fetch_timeout: DEFAULT_TIMEOUT }
    }

    /// Upper bound on one fetch, independent of the source's own timeouts.
    pub fn with_fetch_timeout(mut self, fetch_timeout: Duration) -> Self {
        self.fetch_timeout = fetch_timeout;
        self
    }

    /// One tick: select, mark fetched, fetch, ingest. Never panics or bubbles
    /// errors; the outcome says what happened.
    pub async fn poll_once(&self, ct: &CancellationToken) -> TickOutcome {
        let log = telemetry::agg();
        self.tick(ct).instrument(log.span(&AggPhase::Tick)).await
    }

    async fn tick(&self, ct: &CancellationToken) -> TickOutcome {
        let log = telemetry::agg();

        let feed = match self.registry.next_feed_to_poll().instrument(log.span(&AggPhase::Select)).await {
            Ok(feed) => feed,
            Err(RegistryError::NotFound) => {
                log.info("💤 No feeds registered; nothing to poll");
                return TickOutcome::Idle;
            }
            Err(e) => {
                log.error_kv("❌ selecting next feed failed", [("error", e.to_string())]);
                return TickOutcome::Failed(e);
            }
        };
        log.info_kv(&format!("🔄 Polling {}", feed.name), [("feed_id", feed.id.to_string()), ("url", feed.url.clone())]);

        let marked = self
            .registry
            .mark_fetched(feed.id, Utc::now())
            .instrument(log.span(&AggPhase::MarkFetched))
            .await;
        if let Err(e) = marked {
            log.error_kv("❌ marking feed fetched failed", [("feed", feed.name.clone()), ("error", e.to_string())]);
            return TickOutcome::Failed(e);
        }

        let fetched = tokio::time::timeout(self.fetch_timeout, self.source.fetch(&feed.url, ct))
            .instrument(log.span_kv(&AggPhase::Fetch, [("url", feed.url.clone())]))
            .await
            .unwrap_or(Err(FetchError::Timeout));
        let parsed = match fetched {
            Ok(parsed) => parsed,
            Err(error) => {
                log.warn_kv("⚠️ fetch failed", [("feed", feed.name.clone()), ("error", error.to_string())]);
                return TickOutcome::FetchFailed { feed, error };
            }
        };

        let found = parsed.entries.len();
        let report = ingestion::ingest(&*self.posts, feed.id, &parsed.entries)
            .instrument(log.span(&AggPhase::Ingest))
            .await;
        log.tick_summary(&feed.name, found, &report);
        TickOutcome::Polled { feed, found, report }
    }

    /// Poll immediately, then once per interval until `ct` is cancelled.
    /// Returns the number of ticks run.
    pub async fn run(&self, ct: CancellationToken) -> u64 {
        let log = telemetry::agg();
        log.info(format!("⏱️ Collecting feeds every {:?}", self.interval));

        let mut timer = tokio::time::interval(self.interval);
        timer.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut ticks = 0u64;
        let mut totals = IngestReport::default();
        loop {
            tokio::select! {
                biased;
                _ = ct.cancelled() => break,
                _ = timer.tick() => {}
            }
            ticks += 1;
            if let TickOutcome::Polled { report, .. } = self.poll_once(&ct).await {
                totals.merge(report);
            }
        }

        log.stopped(ticks, &totals);
        ticks
    }

    pub fn spawn(self) -> SchedulerHandle {
        let ct = CancellationToken::new();
        let token = ct.clone();
        let task = tokio::spawn(async move { self.run(token).await });
        SchedulerHandle { ct, task }
    }
}

/// Owner side of a spawned scheduler.
pub struct SchedulerHandle {
    ct: CancellationToken,
    task: JoinHandle<u64>,
}

impl SchedulerHandle {
    /// The loop's cancellation token; cancelling it ends the loop without
    /// waiting for it.
    pub fn token(&self) -> CancellationToken {
        self.ct.clone()
    }

    /// Cancel the loop (and any in-flight fetch) and wait for it to finish.
    pub async fn stop(self) -> Result<u64, JoinError> {
        self.ct.cancel();
        self.task.await
    }
}
