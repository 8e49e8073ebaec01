// src/ingest/source.rs
use metrics::counter;
use std::sync::Arc;

use crate::ingest::types::{CampaignQuery, RawCampaign};

/// How many records of each scan are echoed at debug level.
const SAMPLE_LOG_LEN: usize = 10;

/// Pages through the remote collection until an empty page or the page cap.
pub struct CampaignSource {
    query: Arc<dyn CampaignQuery>,
    page_size: u32,
    max_pages: u32,
}

impl CampaignSource {
    pub fn new(query: Arc<dyn CampaignQuery>, page_size: u32, max_pages: u32) -> Self {
        Self {
            query,
            page_size,
            max_pages,
        }
    }

    /// Concatenate pages `1..=max_pages` in fetch order. Never fails: a page
    /// error is logged and treated like an empty page, which also ends the scan.
    pub async fn fetch_all(&self) -> Vec<RawCampaign> {
        let mut all = Vec::new();
        tracing::info!(
            provider = self.query.name(),
            max_pages = self.max_pages,
            "starting campaign scan"
        );

        for page in 1..=self.max_pages {
            counter!("campaign_pages_fetched_total").increment(1);
            let batch = match self.query.fetch_page(page, self.page_size).await {
                Ok(v) => v,
                Err(e) => {
                    tracing::warn!(error = %e, page, provider = self.query.name(), "page fetch failed");
                    counter!("campaign_page_errors_total").increment(1);
                    Vec::new()
                }
            };
            if batch.is_empty() {
                tracing::debug!(page, "no more campaigns, stopping");
                break;
            }
            all.extend(batch);
        }

        counter!("campaigns_fetched_total").increment(all.len() as u64);
        tracing::info!(total = all.len(), "campaigns fetched");
        for (i, c) in all.iter().take(SAMPLE_LOG_LEN).enumerate() {
            tracing::debug!(
                n = i + 1,
                identifier = %c.identifier,
                starting = ?c.starting,
                "sample campaign"
            );
        }
        all
    }
}
