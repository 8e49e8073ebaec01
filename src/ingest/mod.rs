// src/ingest/mod.rs
pub mod filter;
pub mod providers;
pub mod source;
pub mod timestamp;
pub mod types;

use metrics::counter;

use crate::dedup::SeenStore;
use crate::ingest::filter::{select_valid, AcceptanceWindow, FilterStats};
use crate::ingest::types::{Campaign, RawCampaign};

/// Outcome of the filter half of a cycle.
#[derive(Debug, Clone, Default)]
pub struct IngestOutcome {
    pub fetched: usize,
    pub valid: Vec<Campaign>,
    pub stats: FilterStats,
}

/// Select the campaigns that should be announced now, ordered by start,
/// and record the filter telemetry.
pub fn filter_batch(
    raw: Vec<RawCampaign>,
    seen: &dyn SeenStore,
    window: &AcceptanceWindow,
    description_max_chars: usize,
) -> IngestOutcome {
    crate::metrics::ensure_described();
    let fetched = raw.len();

    tracing::info!(
        cutoff = %window.cutoff.format("%d/%m/%Y"),
        current = %window.now.format("%d/%m/%Y"),
        "filtering campaigns"
    );
    let (valid, stats) = select_valid(raw, seen, window, description_max_chars);

    counter!("campaigns_skipped_seen_total").increment(stats.skipped_seen as u64);
    counter!("campaigns_excluded_total").increment(stats.excluded as u64);
    counter!("campaigns_valid_total").increment(valid.len() as u64);

    tracing::info!(
        fetched,
        valid = valid.len(),
        skipped_seen = stats.skipped_seen,
        excluded = stats.excluded,
        "found valid campaigns after filtering"
    );

    IngestOutcome {
        fetched,
        valid,
        stats,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dedup::InMemorySeenSet;
    use chrono::{TimeZone, Utc};
    use serde_json::json;

    fn raw(id: &str, start: i64) -> RawCampaign {
        RawCampaign {
            identifier: id.into(),
            name: Some(id.into()),
            description: None,
            picture: None,
            starting: Some(json!(start)),
            ending: None,
            creator: None,
        }
    }

    #[test]
    fn filter_batch_counts_fetched_and_keeps_only_new_in_window() {
        let window = AcceptanceWindow::new(
            Utc.timestamp_opt(1_700_000_000, 0).unwrap(),
            Utc.timestamp_opt(1_700_100_000, 0).unwrap(),
        );
        let mut seen = InMemorySeenSet::new();
        seen.mark_seen("old");

        let out = filter_batch(
            vec![
                raw("old", 1_700_000_500),
                raw("b", 1_700_050_000),
                raw("later", 1_700_200_000),
                raw("a", 1_700_000_100),
            ],
            &seen,
            &window,
            2000,
        );

        assert_eq!(out.fetched, 4);
        let ids: Vec<_> = out.valid.iter().map(|c| c.identifier.as_str()).collect();
        assert_eq!(ids, ["a", "b"]);
        assert_eq!(out.stats.skipped_seen, 1);
    }
}
