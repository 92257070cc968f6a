//! Error types for the mate reconciliation engine
//!
//! This module defines all error types used throughout the crate.

use thiserror::Error;

/// Result type alias for mate operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for the reconciliation engine
#[derive(Error, Debug)]
pub enum Error {
    /// No hosted zone is a label-aligned suffix of the name
    #[error("No hosted zone found for {0}")]
    ZoneNotFound(String),

    /// Provider-specific error
    #[error("Provider error ({provider}): {message}")]
    Provider {
        /// Provider name
        provider: String,
        /// Error message
        message: String,
    },

    /// One or more zones failed during a reconciliation pass.
    /// Zones that succeeded are not rolled back.
    #[error("{count} zone(s) failed: {summary}")]
    ZoneFailures {
        /// Number of failed zones
        count: usize,
        /// `zone: reason` pairs joined with "; "
        summary: String,
    },

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// HTTP client errors (from provider APIs)
    #[error("HTTP error: {0}")]
    Http(String),

    /// Authentication errors
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Rate limiting errors
    #[error("Rate limited: {0}")]
    RateLimited(String),

    /// Record or zone not found at the provider
    #[error("Not found: {0}")]
    NotFound(String),

    /// A caller-supplied value the engine cannot act on
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// I/O errors (endpoint files, config files, stdout)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Create a zone-not-found error
    pub fn zone_not_found(name: impl Into<String>) -> Self {
        Self::ZoneNotFound(name.into())
    }

    /// Create a provider-specific error
    pub fn provider(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Provider {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// Collapse per-zone failures into a single error
    pub fn zone_failures(failures: &[(String, String)]) -> Self {
        let summary = failures
            .iter()
            .map(|(zone, reason)| format!("{}: {}", zone, reason))
            .collect::<Vec<_>>()
            .join("; ");
        Self::ZoneFailures {
            count: failures.len(),
            summary,
        }
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an HTTP error
    pub fn http(msg: impl Into<String>) -> Self {
        Self::Http(msg.into())
    }

    /// Create an authentication error
    pub fn auth(msg: impl Into<String>) -> Self {
        Self::Authentication(msg.into())
    }

    /// Create a rate limit error
    pub fn rate_limited(msg: impl Into<String>) -> Self {
        Self::RateLimited(msg.into())
    }

    /// Create a "not found" error
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create an invalid input error
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Whether this error means the requested name has no hosted zone
    pub fn is_zone_not_found(&self) -> bool {
        matches!(self, Self::ZoneNotFound(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zone_failures_summary() {
        let err = Error::zone_failures(&[
            ("Z1".to_string(), "throttled".to_string()),
            ("Z2".to_string(), "denied".to_string()),
        ]);

        assert_eq!(err.to_string(), "2 zone(s) failed: Z1: throttled; Z2: denied");
    }

    #[test]
    fn test_zone_not_found_predicate() {
        assert!(Error::zone_not_found("a.example.org.").is_zone_not_found());
        assert!(!Error::config("x").is_zone_not_found());
    }
}
