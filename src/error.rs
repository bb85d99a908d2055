// src/error.rs

//! Unified error handling for the results client.

use std::fmt;

use thiserror::Error;

/// Result type alias for client operations.
pub type Result<T> = std::result::Result<T, AppError>;

/// Unified application error type.
#[derive(Error, Debug)]
pub enum AppError {
    /// Caller-supplied argument is malformed
    #[error("Validation error: {0}")]
    Validation(String),

    /// A single field mapping could not be turned into a record
    #[error("Invalid {record}: {message}")]
    InvalidRecord {
        record: &'static str,
        message: String,
    },

    /// Transport-level failure talking to the results site
    #[error("Network error for {url}{}: {message}", status_suffix(.status))]
    Network {
        url: String,
        status: Option<u16>,
        message: String,
    },

    /// Page structure was not recognized
    #[error("Parse error in {context}: {message}")]
    Parse { context: String, message: String },

    /// HTTP client failed outside of a request (e.g. builder)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing failed
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// URL parsing failed
    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),

    /// CSS selector parsing failed
    #[error("Invalid selector '{selector}': {message}")]
    Selector { selector: String, message: String },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

fn status_suffix(status: &Option<u16>) -> String {
    status.map(|s| format!(" (HTTP {s})")).unwrap_or_default()
}

impl AppError {
    /// Create an argument validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create a record construction error.
    pub fn invalid_record(record: &'static str, message: impl fmt::Display) -> Self {
        Self::InvalidRecord {
            record,
            message: message.to_string(),
        }
    }

    /// Create a record error for a missing required field.
    pub fn missing_field(record: &'static str, field: &str) -> Self {
        Self::invalid_record(record, format!("missing required field '{field}'"))
    }

    /// Create a network error.
    pub fn network(url: impl Into<String>, status: Option<u16>, message: impl fmt::Display) -> Self {
        Self::Network {
            url: url.into(),
            status,
            message: message.to_string(),
        }
    }

    /// Create a parse error with context.
    pub fn parse(context: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Parse {
            context: context.into(),
            message: message.to_string(),
        }
    }

    /// Create a selector parsing error.
    pub fn selector(selector: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Selector {
            selector: selector.into(),
            message: message.to_string(),
        }
    }

    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn network_message_includes_status() {
        let err = AppError::network("https://example.com", Some(503), "unavailable");
        assert_eq!(
            err.to_string(),
            "Network error for https://example.com (HTTP 503): unavailable"
        );
    }

    #[test]
    fn network_message_without_status() {
        let err = AppError::network("https://example.com", None, "timed out");
        assert_eq!(err.to_string(), "Network error for https://example.com: timed out");
    }

    #[test]
    fn missing_field_names_the_field() {
        let err = AppError::missing_field("Rider", "name");
        assert!(matches!(err, AppError::InvalidRecord { record: "Rider", .. }));
        assert!(err.to_string().contains("missing required field 'name'"));
    }
}
