// src/notify/dry_run.rs
use std::sync::Mutex;

use super::{Notification, Notifier};
use crate::error::Result;

/// Accepts every notification without sending it anywhere.
#[derive(Debug, Default)]
pub struct DryRunNotifier {
    delivered: Mutex<Vec<Notification>>,
}

impl DryRunNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drain what was "sent" so far.
    pub fn take(&self) -> Vec<Notification> {
        std::mem::take(&mut *self.delivered.lock().unwrap_or_else(|e| e.into_inner()))
    }
}

#[async_trait::async_trait]
impl Notifier for DryRunNotifier {
    async fn deliver(&self, n: &Notification) -> Result<()> {
        tracing::info!(title = %n.title, url = ?n.url, thumbnail = n.thumbnail.is_some(), "dry-run delivery");
        self.delivered
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(n.clone());
        Ok(())
    }

    fn name(&self) -> &'static str {
        "dry-run"
    }
}
