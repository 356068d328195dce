//! fal.ai queue and storage payloads.

use serde::{Deserialize, Serialize};

/// Response to a queue submission.
#[derive(Debug, Clone, Deserialize)]
pub struct QueueSubmission {
    pub request_id: String,
    pub status_url: String,
    pub response_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct QueueStatus {
    pub status: String,
    #[serde(default)]
    pub queue_position: Option<u32>,
    #[serde(default)]
    pub logs: Option<Vec<QueueLog>>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct QueueLog {
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct InitiateUploadRequest<'a> {
    pub content_type: &'a str,
    pub file_name: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct InitiateUploadResponse {
    pub upload_url: String,
    pub file_url: String,
}

/// Error body fal returns on rejected requests; `detail` is either a
/// message or a list of validation errors.
#[derive(Debug, Deserialize)]
pub struct ErrorBody {
    pub detail: serde_json::Value,
}

impl ErrorBody {
    pub fn message(body: &str) -> String {
        match serde_json::from_str::<ErrorBody>(body) {
            Ok(ErrorBody {
                detail: serde_json::Value::String(message),
            }) => message,
            Ok(ErrorBody { detail }) => detail.to_string(),
            Err(_) => body.to_string(),
        }
    }
}
