//! Kie AI request/response payloads.

use crate::ai::normalize::{lenient_seed, ImageEntry, KieOutcome};
use serde::{Deserialize, Serialize};

/// Body of `POST /api/v1/jobs/createTask`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CreateTaskRequest {
    pub model: String,
    pub input: serde_json::Map<String, serde_json::Value>,
}

/// `{ code, msg, data }` wrapper used by every jobs endpoint.
#[derive(Debug, Deserialize)]
pub struct KieEnvelope<T> {
    pub code: i64,
    #[serde(default)]
    pub msg: Option<String>,
    pub data: Option<T>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTaskData {
    #[serde(default)]
    pub task_id: Option<String>,
}

/// `data` of `GET /api/v1/jobs/recordInfo`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskRecord {
    #[serde(default)]
    pub task_id: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub result_json: Option<String>,
    #[serde(default)]
    pub fail_msg: Option<String>,
    #[serde(default)]
    pub images: Option<Vec<ImageEntry>>,
    #[serde(default, deserialize_with = "lenient_seed")]
    pub seed: Option<i64>,
    #[serde(default)]
    pub prompt: Option<String>,
}

impl TaskRecord {
    pub fn into_outcome(self) -> KieOutcome {
        KieOutcome {
            result_json: self.result_json,
            images: self.images,
            seed: self.seed,
            prompt: self.prompt,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub msg: Option<String>,
    #[serde(default)]
    pub data: Option<UploadData>,
    #[serde(default)]
    pub file_url: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadData {
    #[serde(default)]
    pub file_url: Option<String>,
    #[serde(default)]
    pub download_url: Option<String>,
}

impl UploadResponse {
    pub fn file_url(self) -> Option<String> {
        self.data
            .and_then(|d| d.file_url.or(d.download_url))
            .or(self.file_url)
    }
}
