// src/config/mod.rs
pub mod pipeline;

pub use pipeline::{load_settings_default, load_settings_from, PipelineSettings};

use crate::error::{HeraldError, Result};

pub const ENV_DISCORD_BOT_TOKEN: &str = "DISCORD_BOT_TOKEN";
pub const ENV_DISCORD_CHANNEL_ID: &str = "DISCORD_CHANNEL_ID";

/// Process configuration: the two required external inputs plus the fixed
/// pipeline parameters.
#[derive(Clone)]
pub struct AppConfig {
    pub discord_token: String,
    pub channel_id: u64,
    pub settings: PipelineSettings,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // never print the credential, only its length
        f.debug_struct("AppConfig")
            .field("discord_token_len", &self.discord_token.len())
            .field("channel_id", &self.channel_id)
            .field("settings", &self.settings)
            .finish()
    }
}

impl AppConfig {
    /// Read credentials from the process environment and attach settings.
    /// Loading `.env` is the binary's job.
    pub fn from_env(settings: PipelineSettings) -> Result<Self> {
        let discord_token = std::env::var(ENV_DISCORD_BOT_TOKEN)
            .ok()
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .ok_or_else(|| {
                HeraldError::Config(format!("{ENV_DISCORD_BOT_TOKEN} environment variable is required"))
            })?;

        let raw_channel = std::env::var(ENV_DISCORD_CHANNEL_ID).map_err(|_| {
            HeraldError::Config(format!("{ENV_DISCORD_CHANNEL_ID} environment variable is required"))
        })?;
        let channel_id = parse_channel_id(&raw_channel)?;

        Ok(Self {
            discord_token,
            channel_id,
            settings,
        })
    }
}

/// Discord channel ids are non-zero 64-bit snowflakes.
pub fn parse_channel_id(raw: &str) -> Result<u64> {
    match raw.trim().parse::<u64>() {
        Ok(id) if id > 0 => Ok(id),
        _ => Err(HeraldError::Config(format!(
            "{ENV_DISCORD_CHANNEL_ID} must be a positive integer, got {raw:?}"
        ))),
    }
}
