// src/poll.rs
//! The always-on loop: Idle → Fetch → Filter → Dispatch → Sleep → Idle.
//!
//! One failure boundary wraps the whole cycle body. Cycles never overlap:
//! the next fetch starts only after the previous dispatch phase has finished
//! and the fixed interval has elapsed.

use chrono::{DateTime, Utc};
use futures::FutureExt;
use metrics::{counter, gauge};
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use crate::config::PipelineSettings;
use crate::dedup::{InMemorySeenSet, SeenStore};
use crate::dispatch::Dispatcher;
use crate::error::Result;
use crate::image_cache::{HttpImageFetcher, ImageCache};
use crate::ingest::filter::AcceptanceWindow;
use crate::ingest::providers::graphql::GraphqlCampaignQuery;
use crate::ingest::source::CampaignSource;
use crate::notify::Notifier;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Fetch,
    Filter,
    Dispatch,
    Sleep,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub fetched: usize,
    pub valid: usize,
    pub dispatched: usize,
    pub failed: usize,
}

pub struct PollLoop {
    source: CampaignSource,
    images: ImageCache,
    dispatcher: Dispatcher,
    seen: Box<dyn SeenStore>,
    cutoff: DateTime<Utc>,
    description_max_chars: usize,
    interval: Duration,
    phase: Phase,
}

impl PollLoop {
    pub fn new(
        source: CampaignSource,
        images: ImageCache,
        dispatcher: Dispatcher,
        seen: Box<dyn SeenStore>,
        settings: &PipelineSettings,
    ) -> Self {
        Self {
            source,
            images,
            dispatcher,
            seen,
            cutoff: settings.cutoff,
            description_max_chars: settings.description_max_chars,
            interval: settings.poll_interval(),
            phase: Phase::Idle,
        }
    }

    /// Production wiring: GraphQL feed, HTTP image fetcher, in-memory seen-set.
    pub fn from_settings(settings: &PipelineSettings, notifier: Arc<dyn Notifier>) -> Result<Self> {
        let timeout = settings.http_timeout();
        let query = GraphqlCampaignQuery::new(settings.graphql_endpoint.clone(), timeout)?;
        let source = CampaignSource::new(Arc::new(query), settings.page_size, settings.max_pages);
        let images = ImageCache::new(
            Arc::new(HttpImageFetcher::new(timeout)?),
            settings.image_dir.clone(),
            settings.image_quality,
        );
        let dispatcher = Dispatcher::new(notifier, settings.campaign_link_base.clone());
        Ok(Self::new(
            source,
            images,
            dispatcher,
            Box::new(InMemorySeenSet::new()),
            settings,
        ))
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn seen(&self) -> &dyn SeenStore {
        self.seen.as_ref()
    }

    fn enter(&mut self, phase: Phase) {
        tracing::trace!(from = ?self.phase, to = ?phase, "poll phase");
        self.phase = phase;
    }

    /// One full pass with "now" taken at cycle start.
    pub async fn run_cycle(&mut self) -> CycleReport {
        self.run_cycle_at(Utc::now()).await
    }

    pub async fn run_cycle_at(&mut self, now: DateTime<Utc>) -> CycleReport {
        let window = AcceptanceWindow::new(self.cutoff, now);

        self.enter(Phase::Fetch);
        let raw = self.source.fetch_all().await;

        self.enter(Phase::Filter);
        let outcome =
            crate::ingest::filter_batch(raw, self.seen.as_ref(), &window, self.description_max_chars);

        self.enter(Phase::Dispatch);
        let mut report = CycleReport {
            fetched: outcome.fetched,
            valid: outcome.valid.len(),
            ..Default::default()
        };
        for campaign in &outcome.valid {
            if self.seen.contains(&campaign.identifier) {
                tracing::debug!(identifier = %campaign.identifier, "skipping already sent campaign");
                continue;
            }
            let image = if campaign.picture_url.is_empty() {
                None
            } else {
                self.images
                    .materialize(&campaign.picture_url, &campaign.identifier)
                    .await
            };
            if self
                .dispatcher
                .deliver(campaign, image, self.seen.as_mut())
                .await
            {
                report.dispatched += 1;
            } else {
                report.failed += 1;
            }
        }

        self.enter(Phase::Idle);
        report
    }

    /// Poll forever. A failing or panicking cycle is logged and the loop
    /// sleeps the full interval before trying again. Never returns.
    pub async fn run_forever(mut self) {
        tracing::info!(
            cutoff = %self.cutoff.format("%d/%m/%Y"),
            interval_secs = self.interval.as_secs(),
            "poll loop started"
        );
        loop {
            match AssertUnwindSafe(self.run_cycle()).catch_unwind().await {
                Ok(report) => {
                    counter!("poll_cycles_total").increment(1);
                    gauge!("poll_last_cycle_ts").set(Utc::now().timestamp() as f64);
                    tracing::info!(
                        fetched = report.fetched,
                        valid = report.valid,
                        dispatched = report.dispatched,
                        failed = report.failed,
                        seen = self.seen.len(),
                        "poll cycle finished"
                    );
                }
                Err(panic) => {
                    counter!("poll_cycle_panics_total").increment(1);
                    tracing::error!(error = panic_message(panic.as_ref()), "poll cycle aborted");
                }
            }

            self.enter(Phase::Sleep);
            tokio::time::sleep(self.interval).await;
            self.enter(Phase::Idle);
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(s) = panic.downcast_ref::<&'static str>() {
        s
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.as_str()
    } else {
        "unknown panic"
    }
}
