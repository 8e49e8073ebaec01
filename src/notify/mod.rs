pub mod discord;
pub mod dry_run;

use serde::Serialize;
use std::path::PathBuf;

use crate::error::Result;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmbedField {
    pub name: String,
    pub value: String,
    pub inline: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LinkButton {
    pub label: String,
    pub url: String,
}

/// Transport-agnostic rendered announcement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub title: String,
    pub description: String,
    pub url: Option<String>,
    pub color: u32,
    pub fields: Vec<EmbedField>,
    pub link_button: Option<LinkButton>,
    /// Local image attached as thumbnail, if any.
    pub thumbnail: Option<PathBuf>,
}

/// Notification port. `Ok(())` means the destination confirmed delivery.
#[async_trait::async_trait]
pub trait Notifier: Send + Sync {
    async fn deliver(&self, notification: &Notification) -> Result<()>;
    fn name(&self) -> &'static str;
}
