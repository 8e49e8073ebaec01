// src/dispatch.rs
use metrics::{counter, gauge};
use std::path::PathBuf;
use std::sync::Arc;

use crate::dedup::SeenStore;
use crate::ingest::types::Campaign;
use crate::notify::{EmbedField, LinkButton, Notification, Notifier};

pub const EMBED_COLOR: u32 = 0x00ff00;
pub const START_LABEL: &str = "🕒 Start";
pub const END_LABEL: &str = "⏃ End";
pub const CREATOR_LABEL: &str = "👤 Creator";
pub const BUTTON_LABEL: &str = "Go to Campaign";

/// Renders campaigns and hands them to the notifier; marks them seen on success.
pub struct Dispatcher {
    notifier: Arc<dyn Notifier>,
    link_base: String,
}

impl Dispatcher {
    pub fn new(notifier: Arc<dyn Notifier>, link_base: impl Into<String>) -> Self {
        let mut link_base = link_base.into();
        if !link_base.ends_with('/') {
            link_base.push('/');
        }
        Self {
            notifier,
            link_base,
        }
    }

    pub fn campaign_link(&self, identifier: &str) -> String {
        format!("{}{}", self.link_base, identifier)
    }

    pub fn render(&self, c: &Campaign, image: Option<PathBuf>) -> Notification {
        let link = self.campaign_link(&c.identifier);
        Notification {
            title: c.name.clone(),
            description: c.description.clone(),
            url: Some(link.clone()),
            color: EMBED_COLOR,
            fields: vec![
                EmbedField {
                    name: START_LABEL.to_string(),
                    value: c.starting_display.clone(),
                    inline: true,
                },
                EmbedField {
                    name: END_LABEL.to_string(),
                    value: c.ending_display.clone(),
                    inline: true,
                },
                EmbedField {
                    name: CREATOR_LABEL.to_string(),
                    value: format!("`{}`", c.creator_address),
                    inline: false,
                },
            ],
            link_button: Some(LinkButton {
                label: BUTTON_LABEL.to_string(),
                url: link,
            }),
            thumbnail: image,
        }
    }

    /// Send one campaign. Returns `true` only on confirmed delivery, in which
    /// case the identifier has been added to `seen`.
    pub async fn deliver(
        &self,
        c: &Campaign,
        image: Option<PathBuf>,
        seen: &mut dyn SeenStore,
    ) -> bool {
        let with_image = image.is_some();
        let notification = self.render(c, image);

        match self.notifier.deliver(&notification).await {
            Ok(()) => {
                seen.mark_seen(&c.identifier);
                counter!("dispatch_success_total").increment(1);
                gauge!("seen_set_size").set(seen.len() as f64);
                tracing::info!(
                    identifier = %c.identifier,
                    name = %c.name,
                    with_image,
                    notifier = self.notifier.name(),
                    "posted new campaign"
                );
                true
            }
            Err(e) => {
                counter!("dispatch_failure_total").increment(1);
                tracing::warn!(identifier = %c.identifier, error = %e, "failed to send campaign");
                false
            }
        }
    }
}
