use metrics::{describe_counter, describe_gauge};
use metrics_exporter_prometheus::PrometheusBuilder;
use once_cell::sync::OnceCell;
use std::net::SocketAddr;

/// One-time metrics registration (so series show up on /metrics).
pub fn ensure_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("campaign_pages_fetched_total", "Feed pages requested.");
        describe_counter!(
            "campaign_page_errors_total",
            "Feed pages that failed and were treated as empty."
        );
        describe_counter!("campaigns_fetched_total", "Raw campaigns received from the feed.");
        describe_counter!(
            "campaigns_skipped_seen_total",
            "Campaigns skipped because they were already announced."
        );
        describe_counter!(
            "campaigns_excluded_total",
            "Campaigns outside the acceptance window or without a usable start."
        );
        describe_counter!("campaigns_valid_total", "Campaigns selected for dispatch.");
        describe_counter!("dispatch_success_total", "Confirmed announcements.");
        describe_counter!("dispatch_failure_total", "Announcements that failed to send.");
        describe_counter!(
            "image_cache_failures_total",
            "Thumbnails that could not be fetched or converted."
        );
        describe_counter!("poll_cycles_total", "Completed poll cycles.");
        describe_counter!("poll_cycle_panics_total", "Poll cycles aborted by a panic.");
        describe_gauge!("poll_last_cycle_ts", "Unix ts when the last poll cycle finished.");
        describe_gauge!("seen_set_size", "Identifiers announced during this process lifetime.");
    });
}

/// Install the Prometheus recorder with its own HTTP listener.
/// Must be called from inside a Tokio runtime.
pub fn install_exporter(addr: SocketAddr) -> anyhow::Result<()> {
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| anyhow::anyhow!("prometheus exporter on {addr}: {e}"))?;
    ensure_described();
    tracing::info!(%addr, "prometheus exporter listening");
    Ok(())
}
