use reqwest::header::{AUTHORIZATION, RETRY_AFTER};
use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;

use super::{Notification, Notifier};
use crate::error::{HeraldError, Result};
use crate::ingest::filter::truncate_chars;

pub const THUMBNAIL_FILENAME: &str = "thumbnail.jpg";
/// Discord rejects embeds with longer titles.
const MAX_TITLE_CHARS: usize = 256;

const COMPONENT_ACTION_ROW: u8 = 1;
const COMPONENT_BUTTON: u8 = 2;
const BUTTON_STYLE_LINK: u8 = 5;

/// Used when a 429 carries no usable retry hint.
const DEFAULT_RATE_LIMIT_WAIT: Duration = Duration::from_secs(1);

#[derive(Debug, Deserialize)]
struct ChannelInfo {
    id: String,
    #[serde(default)]
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RateLimitBody {
    retry_after: f64,
}

/// Posts messages to one Discord channel through the bot REST API.
#[derive(Clone)]
pub struct DiscordNotifier {
    api_base: String,
    token: String,
    channel_id: u64,
    client: Client,
    /// Longest we sleep on a rate limit before the single re-send.
    max_rate_limit_wait: Duration,
}

impl DiscordNotifier {
    /// Look the channel up once. Any failure here is a configuration error:
    /// without a reachable channel there is nothing to announce to.
    pub async fn resolve(
        api_base: &str,
        token: &str,
        channel_id: u64,
        timeout: Duration,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| HeraldError::Config(format!("http client: {e}")))?;
        let notifier = Self {
            api_base: api_base.trim_end_matches('/').to_string(),
            token: token.to_string(),
            channel_id,
            client,
            max_rate_limit_wait: timeout,
        };

        let resp = notifier
            .client
            .get(notifier.channel_url())
            .header(AUTHORIZATION, notifier.auth_header())
            .send()
            .await
            .map_err(|e| {
                HeraldError::Config(format!("cannot reach Discord channel {channel_id}: {e}"))
            })?;
        let status = resp.status();
        if !status.is_success() {
            return Err(HeraldError::Config(format!(
                "cannot find Discord channel {channel_id} (HTTP {status})"
            )));
        }
        let info: ChannelInfo = resp.json().await.map_err(|e| {
            HeraldError::Config(format!("unexpected channel payload for {channel_id}: {e}"))
        })?;
        tracing::info!(
            channel_id = %info.id,
            channel = info.name.as_deref().unwrap_or("?"),
            "Discord channel resolved"
        );
        Ok(notifier)
    }

    fn channel_url(&self) -> String {
        format!("{}/channels/{}", self.api_base, self.channel_id)
    }

    fn auth_header(&self) -> String {
        format!("Bot {}", self.token)
    }

    fn messages_request(&self, payload: &Value, image: Option<&[u8]>) -> Result<RequestBuilder> {
        let req = self
            .client
            .post(format!("{}/messages", self.channel_url()))
            .header(AUTHORIZATION, self.auth_header());
        Ok(match image {
            Some(bytes) => {
                let part = Part::bytes(bytes.to_vec())
                    .file_name(THUMBNAIL_FILENAME)
                    .mime_str("image/jpeg")?;
                let form = Form::new()
                    .text("payload_json", payload.to_string())
                    .part("files[0]", part);
                req.multipart(form)
            }
            None => req.json(payload),
        })
    }

    /// How long to wait after a 429. The JSON `retry_after` (seconds, may be
    /// fractional) wins over the `Retry-After` header; the result is capped.
    pub fn rate_limit_delay(retry_after_header: Option<&str>, body: &str, cap: Duration) -> Duration {
        let from_body = serde_json::from_str::<RateLimitBody>(body)
            .ok()
            .map(|b| b.retry_after);
        let from_header = retry_after_header.and_then(|h| h.trim().parse::<f64>().ok());
        from_body
            .or(from_header)
            .and_then(|secs| Duration::try_from_secs_f64(secs).ok())
            .unwrap_or(DEFAULT_RATE_LIMIT_WAIT)
            .min(cap)
    }

    /// Message body for `POST /channels/{id}/messages`.
    pub fn build_payload(n: &Notification, with_attachment: bool) -> Value {
        let mut embed = json!({
            "description": n.description,
            "color": n.color,
            "fields": n.fields,
        });
        if !n.title.is_empty() {
            embed["title"] = json!(truncate_chars(&n.title, MAX_TITLE_CHARS));
        }
        if let Some(url) = &n.url {
            embed["url"] = json!(url);
        }
        if with_attachment {
            embed["thumbnail"] = json!({ "url": format!("attachment://{THUMBNAIL_FILENAME}") });
        }

        let mut payload = json!({ "embeds": [embed] });
        if let Some(button) = &n.link_button {
            payload["components"] = json!([{
                "type": COMPONENT_ACTION_ROW,
                "components": [{
                    "type": COMPONENT_BUTTON,
                    "style": BUTTON_STYLE_LINK,
                    "label": button.label,
                    "url": button.url,
                }],
            }]);
        }
        if with_attachment {
            payload["attachments"] = json!([{ "id": 0, "filename": THUMBNAIL_FILENAME }]);
        }
        payload
    }
}

#[async_trait::async_trait]
impl Notifier for DiscordNotifier {
    async fn deliver(&self, n: &Notification) -> Result<()> {
        let image = match &n.thumbnail {
            Some(path) => match tokio::fs::read(path).await {
                Ok(bytes) => Some(bytes),
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "thumbnail unreadable, sending without it");
                    None
                }
            },
            None => None,
        };

        let payload = Self::build_payload(n, image.is_some());
        let mut resp = self
            .messages_request(&payload, image.as_deref())?
            .send()
            .await?;

        if resp.status() == StatusCode::TOO_MANY_REQUESTS {
            let header = resp
                .headers()
                .get(RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .map(str::to_owned);
            let body = resp.text().await.unwrap_or_default();
            let wait = Self::rate_limit_delay(header.as_deref(), &body, self.max_rate_limit_wait);
            tracing::warn!(wait_ms = wait.as_millis() as u64, "Discord rate limit hit, re-sending once");
            tokio::time::sleep(wait).await;
            resp = self
                .messages_request(&payload, image.as_deref())?
                .send()
                .await?;
        }

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(HeraldError::Transport(format!(
                "Discord API error ({status}): {body}"
            )));
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "discord"
    }
}
