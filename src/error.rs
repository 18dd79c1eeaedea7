//! Error type shared by every stage of the tracker.
//!
//! Fetch, parse and validation failures all end up here so the refresh loop can
//! treat them as one outcome: keep the previous map state and show the error
//! status. Only the log line tells the causes apart.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, TrackerError>;

#[derive(Debug, Error)]
pub enum TrackerError {
    /// Transport failure (connect, timeout, body download).
    #[cfg(feature = "http")]
    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// The server answered, but not with a success status.
    #[error("HTTP {status} for {url}")]
    Status { url: String, status: u16 },

    /// The body was not valid JSON.
    #[error("malformed JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Valid JSON with the wrong shape for the document it claims to be.
    #[error("invalid {document} document: {reason}")]
    InvalidDocument { document: &'static str, reason: String },

    /// A map surface precondition was violated (e.g. re-adding an existing layer).
    #[error("map surface: {0}")]
    Surface(String),

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl TrackerError {
    pub(crate) fn invalid(document: &'static str, reason: impl Into<String>) -> Self {
        TrackerError::InvalidDocument { document, reason: reason.into() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_error_message() {
        let err = TrackerError::Status { url: "./data/track.geojson".into(), status: 404 };
        assert_eq!(err.to_string(), "HTTP 404 for ./data/track.geojson");
    }

    #[test]
    fn test_json_error_converts() {
        let parse: std::result::Result<serde_json::Value, _> = serde_json::from_str("{nope");
        let err: TrackerError = parse.unwrap_err().into();
        assert!(matches!(err, TrackerError::Json(_)));
    }
}
