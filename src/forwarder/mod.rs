pub mod filter;
pub mod progress;

use anyhow::{Context, Result};
use chrono::Duration;
use log::info;

use crate::clock::Clock;
use crate::forwarder::filter::{FilterStats, collect_batch};
use crate::forwarder::progress::{Progress, ProgressSink};
use crate::store::repo::LogStore;
use crate::webhook::{Delivery, Dispatcher};

/// How far back each run looks.
pub const WINDOW_HOURS: i64 = 24;
/// Upper bound on rows read per run.
pub const SCAN_LIMIT: u32 = 50;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub sent_count: usize,
    pub stats: FilterStats,
    pub delivery: Delivery,
}

/// Scans the log store, keeps the rows that carry a delivery error and posts
/// them to the webhook in one batch.
pub struct Forwarder {
    store: Box<dyn LogStore>,
    dispatcher: Box<dyn Dispatcher>,
    clock: Box<dyn Clock>,
    domain: String,
}

impl Forwarder {
    pub fn new(
        store: Box<dyn LogStore>,
        dispatcher: Box<dyn Dispatcher>,
        clock: Box<dyn Clock>,
        domain: impl Into<String>,
    ) -> Self {
        Self {
            store,
            dispatcher,
            clock,
            domain: domain.into(),
        }
    }

    /// One complete run. Only a store failure is returned as an error;
    /// delivery problems show up as a zero `sent_count`.
    pub fn run(&self, progress: &mut dyn ProgressSink) -> Result<RunSummary> {
        let now = self.clock.now();
        let since = now - Duration::hours(WINDOW_HOURS);

        let rows = self
            .store
            .scan_recent(since, SCAN_LIMIT)
            .context("Failed to scan mail log")?;

        let (batch, stats) = collect_batch(&rows, &self.domain, progress);

        let delivery = if batch.is_empty() {
            Delivery::Skipped
        } else {
            self.dispatcher.deliver(&batch)
        };
        progress.report(Progress::Delivery(delivery.clone()));

        let summary = RunSummary {
            sent_count: delivery.sent_count(),
            stats,
            delivery,
        };
        info!(
            "error check since {since}: {} scanned, {} queued, {} sent",
            rows.len(),
            summary.stats.queued,
            summary.sent_count
        );
        Ok(summary)
    }
}
