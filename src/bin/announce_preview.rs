//! Runs a single cycle against the live feed with a dry-run notifier and
//! prints every announcement that would have been posted, one JSON per line.
//! Needs no Discord credentials.

use std::sync::Arc;

use campaign_herald::config::load_settings_default;
use campaign_herald::notify::dry_run::DryRunNotifier;
use campaign_herald::PollLoop;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt().with_target(false).init();

    let settings = load_settings_default()?;
    let notifier = Arc::new(DryRunNotifier::new());
    let mut poll = PollLoop::from_settings(&settings, notifier.clone())?;

    let report = poll.run_cycle().await;
    for n in notifier.take() {
        println!("{}", serde_json::to_string(&n)?);
    }

    eprintln!(
        "announce-preview done: fetched={} valid={} would_post={}",
        report.fetched, report.valid, report.dispatched
    );
    Ok(())
}
