use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{error, info};

use crate::fetcher::Fetcher;
use crate::registry::FeedRegistry;
use crate::throttle::Throttle;

#[derive(Debug, Error)]
pub enum AggregateError {
    #[error("Aggregation already in progress")]
    AlreadyRunning,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregationSummary {
    pub total_inserted: usize,
    pub feeds_attempted: usize,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregationStatus {
    pub running: bool,
    pub last_run: Option<AggregationSummary>,
}

/// Walks the feed registry and runs the fetcher on every feed, one at a time.
///
/// Only one run may be in flight: the existence check and insert in the
/// fetcher are not atomic, so overlapping runs are refused rather than queued.
pub struct Aggregator {
    registry: FeedRegistry,
    fetcher: Fetcher,
    throttle: Arc<dyn Throttle>,
    running: AtomicBool,
    last_run: RwLock<Option<AggregationSummary>>,
}

impl Aggregator {
    pub fn new(registry: FeedRegistry, fetcher: Fetcher, throttle: Arc<dyn Throttle>) -> Self {
        Self {
            registry,
            fetcher,
            throttle,
            running: AtomicBool::new(false),
            last_run: RwLock::new(None),
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub async fn status(&self) -> AggregationStatus {
        AggregationStatus {
            running: self.is_running(),
            last_run: self.last_run.read().await.clone(),
        }
    }

    pub async fn aggregate_content(&self) -> Result<AggregationSummary, AggregateError> {
        // Held until this future completes or is dropped
        let _guard = match RunGuard::acquire(&self.running) {
            Some(guard) => guard,
            None => {
                info!("Aggregation already in progress, skipping");
                return Err(AggregateError::AlreadyRunning);
            }
        };

        let summary = self.aggregate_all().await;
        *self.last_run.write().await = Some(summary.clone());

        Ok(summary)
    }

    async fn aggregate_all(&self) -> AggregationSummary {
        info!(
            "Starting content aggregation over {} feeds",
            self.registry.feed_count()
        );
        let started_at = Utc::now();

        let mut total_inserted = 0;
        let mut feeds_attempted = 0;
        for source in self.registry.sources() {
            total_inserted += self
                .fetcher
                .fetch_from_feed(&source.url, &source.category_slug)
                .await;
            feeds_attempted += 1;

            self.throttle.pause().await;
        }

        info!(
            "Content aggregation completed. Total new articles: {}",
            total_inserted
        );

        AggregationSummary {
            total_inserted,
            feeds_attempted,
            started_at,
            finished_at: Utc::now(),
        }
    }
}

/// Clears the running flag on drop, so a cancelled run frees the slot.
struct RunGuard<'a> {
    running: &'a AtomicBool,
}

impl<'a> RunGuard<'a> {
    fn acquire(running: &'a AtomicBool) -> Option<Self> {
        running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .ok()
            .map(|_| Self { running })
    }
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
    }
}

/// Run once immediately, then every `interval` for the life of the process.
pub async fn run_scheduler(aggregator: Arc<Aggregator>, interval: Duration) {
    info!("Running initial content aggregation");
    if let Err(e) = aggregator.aggregate_content().await {
        error!("Initial content aggregation failed: {}", e);
    }

    loop {
        tokio::time::sleep(interval).await;
        info!("Running scheduled content aggregation");
        if let Err(e) = aggregator.aggregate_content().await {
            error!("Scheduled content aggregation failed: {}", e);
        }
    }
}
