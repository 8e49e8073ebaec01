// src/ingest/types.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Result;

/// Campaign exactly as the feed returns it. `starting`/`ending` stay raw JSON
/// because the feed mixes seconds, milliseconds, nulls and the odd string.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RawCampaign {
    pub identifier: String,
    pub name: Option<String>,
    pub description: Option<String>,
    pub picture: Option<String>,
    pub starting: Option<Value>,
    pub ending: Option<Value>,
    pub creator: Option<Creator>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Creator {
    pub address: Option<String>,
}

impl RawCampaign {
    pub fn creator_address(&self) -> &str {
        self.creator
            .as_ref()
            .and_then(|c| c.address.as_deref())
            .unwrap_or("N/A")
    }
}

/// Campaign that passed the acceptance window; lives for one cycle only.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Campaign {
    pub identifier: String,
    pub name: String,
    /// Already truncated to the display limit.
    pub description: String,
    /// Empty when the campaign has no picture.
    pub picture_url: String,
    pub starting: DateTime<Utc>,
    pub starting_display: String,
    pub ending_display: String,
    pub creator_address: String,
}

/// Remote query port: one page of the campaign collection.
#[async_trait::async_trait]
pub trait CampaignQuery: Send + Sync {
    /// `page` starts at 1. An empty vec means the collection is exhausted.
    async fn fetch_page(&self, page: u32, page_size: u32) -> Result<Vec<RawCampaign>>;
    fn name(&self) -> &'static str;
}
