// src/config/pipeline.rs
use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const ENV_PIPELINE_CONFIG_PATH: &str = "PIPELINE_CONFIG_PATH";
pub const DEFAULT_PIPELINE_CONFIG_PATH: &str = "config/pipeline.toml";

/// Fixed pipeline parameters. Every field has a default, so an absent or
/// partial `pipeline.toml` is fine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineSettings {
    pub graphql_endpoint: String,
    pub page_size: u32,
    pub max_pages: u32,
    pub poll_interval_secs: u64,
    /// Lower bound of the acceptance window (inclusive), RFC 3339 string in TOML.
    pub cutoff: DateTime<Utc>,
    pub description_max_chars: usize,
    pub image_quality: u8,
    pub image_dir: PathBuf,
    pub campaign_link_base: String,
    pub http_timeout_secs: u64,
    pub discord_api_base: String,
    pub metrics_addr: Option<SocketAddr>,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            graphql_endpoint: "https://graph.9lives.so/graphql".to_string(),
            page_size: 100,
            max_pages: 100,
            poll_interval_secs: 90,
            cutoff: default_cutoff(),
            description_max_chars: 2000,
            image_quality: 85,
            image_dir: PathBuf::from("images"),
            campaign_link_base: "https://9lives.so/campaign/".to_string(),
            http_timeout_secs: 30,
            discord_api_base: "https://discord.com/api/v10".to_string(),
            metrics_addr: None,
        }
    }
}

fn default_cutoff() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 2, 16, 0, 0, 0)
        .single()
        .unwrap_or_default()
}

impl PipelineSettings {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    /// Clamp values that would make the loop misbehave.
    fn sanitized(mut self) -> Self {
        if self.page_size == 0 {
            self.page_size = 100;
        }
        if self.max_pages == 0 {
            self.max_pages = 100;
        }
        if self.poll_interval_secs == 0 {
            self.poll_interval_secs = 90;
        }
        if self.image_quality == 0 || self.image_quality > 100 {
            self.image_quality = 85;
        }
        if self.http_timeout_secs == 0 {
            self.http_timeout_secs = 30;
        }
        self
    }
}

/// Load settings from an explicit TOML file.
pub fn load_settings_from(path: &Path) -> Result<PipelineSettings> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("reading pipeline settings from {}", path.display()))?;
    parse_settings(&content).with_context(|| format!("parsing {}", path.display()))
}

/// Load settings using env var + fallbacks:
/// 1) $PIPELINE_CONFIG_PATH (must exist)
/// 2) config/pipeline.toml
/// 3) built-in defaults
pub fn load_settings_default() -> Result<PipelineSettings> {
    if let Ok(p) = std::env::var(ENV_PIPELINE_CONFIG_PATH) {
        let pb = PathBuf::from(p);
        if pb.exists() {
            return load_settings_from(&pb);
        }
        return Err(anyhow!(
            "{ENV_PIPELINE_CONFIG_PATH} points to non-existent path"
        ));
    }
    let fallback = PathBuf::from(DEFAULT_PIPELINE_CONFIG_PATH);
    if fallback.exists() {
        return load_settings_from(&fallback);
    }
    Ok(PipelineSettings::default())
}

pub fn parse_settings(s: &str) -> Result<PipelineSettings> {
    let settings: PipelineSettings = toml::from_str(s)?;
    Ok(settings.sanitized())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_fixed_parameters() {
        let s = PipelineSettings::default();
        assert_eq!(s.page_size, 100);
        assert_eq!(s.max_pages, 100);
        assert_eq!(s.poll_interval(), Duration::from_secs(90));
        assert_eq!(s.description_max_chars, 2000);
        assert_eq!(s.image_quality, 85);
        assert_eq!(s.cutoff.to_rfc3339(), "2025-02-16T00:00:00+00:00");
    }

    #[test]
    fn partial_toml_keeps_defaults_and_clamps() {
        let s = parse_settings(
            r#"
page_size = 0
poll_interval_secs = 0
image_quality = 250
cutoff = "2025-03-01T12:00:00Z"
metrics_addr = "127.0.0.1:9100"
"#,
        )
        .unwrap();
        assert_eq!(s.page_size, 100);
        assert_eq!(s.poll_interval(), Duration::from_secs(90));
        assert_eq!(s.image_quality, 85);
        assert_eq!(s.max_pages, 100);
        assert_eq!(s.cutoff.to_rfc3339(), "2025-03-01T12:00:00+00:00");
        assert_eq!(s.metrics_addr, Some("127.0.0.1:9100".parse().unwrap()));
    }

    #[test]
    fn garbage_is_an_error() {
        assert!(parse_settings("page_size = \"many\"").is_err());
    }
}
