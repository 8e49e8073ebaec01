// src/ingest/timestamp.rs
//! Raw feed timestamp → (display string, instant).
//!
//! The feed does not say whether a value is in seconds or milliseconds, so the
//! unit is guessed by magnitude: anything above 1e12 is milliseconds. Values
//! near the boundaries are ambiguous; the heuristic is kept as-is for
//! compatibility with the data already published.

use chrono::{DateTime, Datelike, Utc};
use serde_json::Value;
use thiserror::Error;

pub const NO_DATE: &str = "No date";
pub const INVALID_TIMESTAMP: &str = "Invalid timestamp";
pub const INVALID_DATE: &str = "Invalid date";

/// Above this the raw value is read as milliseconds.
pub const MILLIS_THRESHOLD: f64 = 1e12;
/// Below this (after unit conversion) the value is rejected.
pub const MIN_PLAUSIBLE_SECS: f64 = 1e9;

const DISPLAY_FORMAT: &str = "%d/%m/%Y";

#[derive(Debug, Clone, PartialEq, Error)]
pub enum TimestampError {
    #[error("timestamp is absent or zero")]
    Missing,
    #[error("timestamp {0} is below the plausible range")]
    OutOfRange(f64),
    #[error("timestamp {0} cannot be converted to a date")]
    Malformed(String),
}

impl TimestampError {
    pub fn display(&self) -> &'static str {
        match self {
            TimestampError::Missing => NO_DATE,
            TimestampError::OutOfRange(_) => INVALID_TIMESTAMP,
            TimestampError::Malformed(_) => INVALID_DATE,
        }
    }
}

/// Display string and instant, always derived from the same raw value.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedTimestamp {
    pub display: String,
    pub instant: Option<DateTime<Utc>>,
}

/// Total over its input: never fails, falls back to a sentinel display.
pub fn normalize_timestamp(raw: Option<&Value>) -> NormalizedTimestamp {
    match parse_instant(raw) {
        Ok(dt) => {
            let display = dt.format(DISPLAY_FORMAT).to_string();
            let shown = &display;
            tracing::debug!(raw = ?raw, display = %shown, "converted timestamp");
            NormalizedTimestamp {
                display,
                instant: Some(dt),
            }
        }
        Err(e) => {
            tracing::debug!(raw = ?raw, reason = %e, "timestamp not usable");
            NormalizedTimestamp {
                display: e.display().to_string(),
                instant: None,
            }
        }
    }
}

pub fn parse_instant(raw: Option<&Value>) -> Result<DateTime<Utc>, TimestampError> {
    let value = match raw {
        None | Some(Value::Null) => return Err(TimestampError::Missing),
        Some(v) => v,
    };

    let n = match value {
        Value::Number(n) => n
            .as_f64()
            .ok_or_else(|| TimestampError::Malformed(n.to_string()))?,
        Value::Bool(b) => f64::from(u8::from(*b)),
        other => return Err(TimestampError::Malformed(other.to_string())),
    };

    if n == 0.0 {
        return Err(TimestampError::Missing);
    }

    let secs = if n > MILLIS_THRESHOLD {
        n / 1000.0
    } else if n < MIN_PLAUSIBLE_SECS {
        return Err(TimestampError::OutOfRange(n));
    } else {
        n
    };

    from_unix_secs(secs).ok_or_else(|| TimestampError::Malformed(value.to_string()))
}

fn from_unix_secs(secs: f64) -> Option<DateTime<Utc>> {
    if !secs.is_finite() || secs >= i64::MAX as f64 {
        return None;
    }
    let whole = secs.floor();
    let nanos = (((secs - whole) * 1e9).round() as u32).min(999_999_999);
    let dt = DateTime::<Utc>::from_timestamp(whole as i64, nanos)?;
    // four-digit years only, anything later is garbage in this feed
    (dt.year() <= 9999).then_some(dt)
}
