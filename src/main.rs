//! Campaign Herald binary entrypoint.
//! Resolves the Discord channel, then polls the campaign feed forever.

use std::sync::Arc;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use campaign_herald::config::{load_settings_default, AppConfig};
use campaign_herald::notify::discord::DiscordNotifier;
use campaign_herald::PollLoop;

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("campaign_herald=info,warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env in local/dev; no-op when the file is absent.
    let _ = dotenvy::dotenv();
    init_tracing();

    let settings = load_settings_default()?;
    let config = AppConfig::from_env(settings)?;
    tracing::info!(config = ?config, "configuration loaded");

    if let Some(addr) = config.settings.metrics_addr {
        if let Err(e) = campaign_herald::metrics::install_exporter(addr) {
            tracing::warn!(error = %e, "metrics exporter disabled");
        }
    }

    // Fatal: without the destination channel there is no point in polling.
    let notifier = DiscordNotifier::resolve(
        &config.settings.discord_api_base,
        &config.discord_token,
        config.channel_id,
        config.settings.http_timeout(),
    )
    .await?;

    let poll = PollLoop::from_settings(&config.settings, Arc::new(notifier))?;

    tokio::select! {
        _ = poll.run_forever() => {}
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("received shutdown signal, stopping");
        }
    }

    Ok(())
}
