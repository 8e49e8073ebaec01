// src/ingest/filter.rs
use chrono::{DateTime, Utc};
use std::collections::HashMap;

use crate::dedup::SeenStore;
use crate::ingest::timestamp::normalize_timestamp;
use crate::ingest::types::{Campaign, RawCampaign};

/// Closed instant range `[cutoff, now]` a campaign start must fall into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AcceptanceWindow {
    pub cutoff: DateTime<Utc>,
    pub now: DateTime<Utc>,
}

impl AcceptanceWindow {
    pub fn new(cutoff: DateTime<Utc>, now: DateTime<Utc>) -> Self {
        Self { cutoff, now }
    }

    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        instant >= self.cutoff && instant <= self.now
    }
}

/// Counters for one filter pass, mostly for logs and metrics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FilterStats {
    pub skipped_seen: usize,
    pub excluded: usize,
    pub collapsed: usize,
}

/// Truncate to `max` characters (not bytes).
pub fn truncate_chars(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => s[..idx].to_string(),
        None => s.to_string(),
    }
}

fn normalize(
    raw: RawCampaign,
    starting: DateTime<Utc>,
    starting_display: String,
    max_chars: usize,
) -> Campaign {
    let ending_display = normalize_timestamp(raw.ending.as_ref()).display;
    let creator_address = raw.creator_address().to_string();
    Campaign {
        name: raw.name.unwrap_or_else(|| "N/A".to_string()),
        description: truncate_chars(raw.description.as_deref().unwrap_or("N/A"), max_chars),
        picture_url: raw.picture.unwrap_or_default(),
        starting,
        starting_display,
        ending_display,
        creator_address,
        identifier: raw.identifier,
    }
}

/// Select campaigns that are not yet announced and started inside `window`.
///
/// Duplicate identifiers within one batch collapse onto the slot of the first
/// occurrence, carrying the data of the last valid one. The result is sorted
/// ascending by start; the sort is stable, so ties keep fetch order.
pub fn select_valid(
    raw: Vec<RawCampaign>,
    seen: &dyn SeenStore,
    window: &AcceptanceWindow,
    description_max_chars: usize,
) -> (Vec<Campaign>, FilterStats) {
    let mut stats = FilterStats::default();
    let mut slots: HashMap<String, usize> = HashMap::new();
    let mut valid: Vec<Campaign> = Vec::new();

    for rc in raw {
        if seen.contains(&rc.identifier) {
            tracing::debug!(identifier = %rc.identifier, "skipping already sent campaign");
            stats.skipped_seen += 1;
            continue;
        }

        let start = normalize_timestamp(rc.starting.as_ref());
        let in_window = start.instant.is_some_and(|dt| window.contains(dt));
        tracing::debug!(
            identifier = %rc.identifier,
            raw_start = ?rc.starting,
            start = %start.display,
            in_window,
            "filter decision"
        );

        let Some(starting) = start.instant.filter(|_| in_window) else {
            stats.excluded += 1;
            continue;
        };

        let campaign = normalize(rc, starting, start.display, description_max_chars);
        match slots.get(&campaign.identifier) {
            Some(&idx) => {
                stats.collapsed += 1;
                valid[idx] = campaign;
            }
            None => {
                slots.insert(campaign.identifier.clone(), valid.len());
                valid.push(campaign);
            }
        }
    }

    valid.sort_by(|a, b| a.starting.cmp(&b.starting));
    (valid, stats)
}
