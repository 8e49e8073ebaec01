// src/lib.rs
// Public library surface for the binaries and integration tests.

pub mod config;
pub mod dedup;
pub mod dispatch;
pub mod error;
pub mod image_cache;
pub mod ingest;
pub mod metrics;
pub mod notify;
pub mod poll;

// ---- Re-exports for stable public API ----
pub use crate::error::{HeraldError, Result};
pub use crate::notify::{Notification, Notifier};
pub use crate::poll::{CycleReport, PollLoop};
