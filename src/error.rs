// src/error.rs
use thiserror::Error;

/// Failure categories shared by every port in the pipeline. Malformed
/// timestamps have their own `TimestampError` and never reach this type.
///
/// Transport and Decode are always recovered close to where they happen
/// (empty page, text-only dispatch). Only `Config` is allowed to abort the
/// process, and only during startup.
#[derive(Debug, Error)]
pub enum HeraldError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<reqwest::Error> for HeraldError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            HeraldError::Decode(e.to_string())
        } else {
            HeraldError::Transport(e.to_string())
        }
    }
}

impl From<serde_json::Error> for HeraldError {
    fn from(e: serde_json::Error) -> Self {
        HeraldError::Decode(e.to_string())
    }
}

impl From<image::ImageError> for HeraldError {
    fn from(e: image::ImageError) -> Self {
        HeraldError::Decode(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, HeraldError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_errors_are_decode_errors() {
        let err: HeraldError = serde_json::from_str::<u32>("nope").unwrap_err().into();
        assert!(matches!(err, HeraldError::Decode(_)));
        assert!(err.to_string().starts_with("Decode error"));
    }
}
