//! Error handling and custom error types
//!
//! Provides unified error handling across the adapter using thiserror.

use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("{0}")]
    RateLimited(String),

    #[error("Failed to create task: HTTP {status}{}", body_suffix(.body))]
    Submission { status: u16, body: String },

    #[error("Failed to create task: {0}")]
    SubmissionRejected(String),

    #[error("Failed to query task status: {0}")]
    PollTransport(String),

    #[error("{0}")]
    ProviderFailure(String),

    #[error("Generation timeout after {} ({attempts} polls)", describe_wait(.waited))]
    Timeout { attempts: u32, waited: Duration },

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Failed to upload file: {0}")]
    Upload(String),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Environment variable error: {0}")]
    EnvVar(#[from] dotenvy::Error),
}

impl Error {
    /// True when the caller may resubmit after backing off.
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, Error::RateLimited(_))
    }
}

fn body_suffix(body: &str) -> String {
    if body.is_empty() {
        String::new()
    } else {
        format!(": {}", body)
    }
}

fn describe_wait(waited: &Duration) -> String {
    let secs = waited.as_secs();
    if secs >= 60 && secs % 60 == 0 {
        format!("{} minutes", secs / 60)
    } else {
        format!("{} seconds", secs)
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_submission_message_appends_body() {
        let err = Error::Submission {
            status: 500,
            body: "boom".to_string(),
        };
        assert_eq!(err.to_string(), "Failed to create task: HTTP 500: boom");

        let err = Error::Submission {
            status: 502,
            body: String::new(),
        };
        assert_eq!(err.to_string(), "Failed to create task: HTTP 502");
    }

    #[test]
    fn test_timeout_message_uses_minutes_when_exact() {
        let err = Error::Timeout {
            attempts: 200,
            waited: Duration::from_secs(600),
        };
        assert_eq!(err.to_string(), "Generation timeout after 10 minutes (200 polls)");

        let err = Error::Timeout {
            attempts: 3,
            waited: Duration::from_millis(3),
        };
        assert!(err.to_string().contains("0 seconds"));
    }
}
