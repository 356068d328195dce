use super::types::{
    CreateTaskData, CreateTaskRequest, KieEnvelope, TaskRecord, UploadResponse,
};
use crate::ai::task::{ProviderState, StatusSnapshot, TaskStatusSource};
use crate::ai::UploadFile;
use crate::models::{DEFAULT_KIE_API_BASE, DEFAULT_KIE_UPLOAD_BASE};
use crate::{Error, Result};
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, StatusCode};

/// Thin REST client for the Kie AI jobs and file-upload endpoints.
pub struct KieHttpClient {
    pub(crate) client: Client,
    api_key: Option<String>,
    pub(crate) base_url: String,
    pub(crate) upload_base_url: String,
}

impl KieHttpClient {
    pub fn new(api_key: Option<String>) -> Self {
        Self::new_with_client(api_key, Client::new())
    }

    pub fn new_with_client(api_key: Option<String>, client: Client) -> Self {
        Self {
            client,
            api_key,
            base_url: DEFAULT_KIE_API_BASE.to_string(),
            upload_base_url: DEFAULT_KIE_UPLOAD_BASE.to_string(),
        }
    }

    pub fn with_base_urls(mut self, base_url: String, upload_base_url: String) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self.upload_base_url = upload_base_url.trim_end_matches('/').to_string();
        self
    }

    pub(crate) fn api_key(&self) -> Result<&str> {
        self.api_key
            .as_deref()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| {
                Error::Config(
                    "Kie AI API key is not configured. Set KIE_API_KEY to your key.".to_string(),
                )
            })
    }

    /// Creates a remote task and returns its id.
    pub async fn create_task(&self, request: &CreateTaskRequest) -> Result<String> {
        let api_key = self.api_key()?;
        tracing::debug!("Creating Kie AI task for model {}", request.model);

        let response = self
            .client
            .post(format!("{}/api/v1/jobs/createTask", self.base_url))
            .bearer_auth(api_key)
            .json(request)
            .send()
            .await
            .map_err(|e| {
                tracing::error!("Failed to send request to Kie AI: {}", e);
                e
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(match status {
                StatusCode::UNAUTHORIZED => Error::Config(
                    "Invalid Kie AI API key. Please check your API key.".to_string(),
                ),
                StatusCode::TOO_MANY_REQUESTS => Error::RateLimited(
                    "Rate limit reached (20 requests per 10 seconds). Please wait and try again."
                        .to_string(),
                ),
                _ => {
                    let body = response.text().await.unwrap_or_default();
                    tracing::error!("Kie AI createTask error (status {}): {}", status, body);
                    Error::Submission {
                        status: status.as_u16(),
                        body,
                    }
                }
            });
        }

        let envelope: KieEnvelope<CreateTaskData> = response.json().await?;
        if envelope.code != 200 {
            return Err(Error::SubmissionRejected(
                envelope
                    .msg
                    .unwrap_or_else(|| format!("provider returned code {}", envelope.code)),
            ));
        }

        envelope
            .data
            .and_then(|d| d.task_id)
            .filter(|id| !id.is_empty())
            .ok_or_else(|| Error::SubmissionRejected("No task ID returned from Kie AI".to_string()))
    }

    /// Fetches the current record for `task_id`. Every failure here is a
    /// transport failure of the status query itself.
    pub async fn record_info(&self, task_id: &str) -> Result<TaskRecord> {
        let api_key = self.api_key()?;

        let response = self
            .client
            .get(format!("{}/api/v1/jobs/recordInfo", self.base_url))
            .query(&[("taskId", task_id)])
            .bearer_auth(api_key)
            .send()
            .await
            .map_err(|e| Error::PollTransport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            tracing::error!("Kie AI recordInfo error (status {})", status);
            return Err(Error::PollTransport(format!("HTTP {}", status.as_u16())));
        }

        let body = response
            .text()
            .await
            .map_err(|e| Error::PollTransport(e.to_string()))?;
        let envelope: KieEnvelope<TaskRecord> = serde_json::from_str(&body).map_err(|e| {
            tracing::error!("Failed to parse Kie AI status: {}\nBody: {}", e, body);
            Error::PollTransport(format!("unreadable status response: {}", e))
        })?;

        if envelope.code != 200 {
            return Err(Error::PollTransport(
                envelope
                    .msg
                    .unwrap_or_else(|| format!("provider returned code {}", envelope.code)),
            ));
        }

        Ok(envelope.data.unwrap_or_default())
    }

    /// Streams one file to Kie storage and returns its public URL.
    pub async fn upload(&self, file: &UploadFile) -> Result<String> {
        let api_key = self.api_key()?;

        let part = Part::bytes(file.bytes.clone())
            .file_name(file.file_name.clone())
            .mime_str(&file.content_type)
            .map_err(|e| Error::Upload(format!("invalid content type: {}", e)))?;
        let form = Form::new()
            .part("file", part)
            .text("uploadPath", "images")
            .text("fileName", file.file_name.clone());

        let response = self
            .client
            .post(format!("{}/api/file-stream-upload", self.upload_base_url))
            .bearer_auth(api_key)
            .multipart(form)
            .send()
            .await
            .map_err(|e| Error::Upload(e.to_string()))?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            return Err(Error::Config(
                "Invalid Kie AI API key. Please check your API key.".to_string(),
            ));
        }
        if !status.is_success() {
            return Err(Error::Upload(format!("HTTP {}", status.as_u16())));
        }

        let result: UploadResponse = response
            .json()
            .await
            .map_err(|e| Error::Upload(format!("unreadable upload response: {}", e)))?;

        if !result.success {
            return Err(Error::Upload(
                result.msg.unwrap_or_else(|| "Upload failed".to_string()),
            ));
        }

        result.file_url().ok_or_else(|| {
            tracing::error!("No file URL in Kie AI upload response for {}", file.file_name);
            Error::Upload("No file URL in upload response".to_string())
        })
    }
}

#[async_trait]
impl TaskStatusSource for KieHttpClient {
    type Payload = TaskRecord;

    async fn fetch_status(&self, task_id: &str) -> Result<StatusSnapshot<TaskRecord>> {
        let record = self.record_info(task_id).await?;
        let state = ProviderState::from_kie(record.state.as_deref().unwrap_or_default());
        let fail_message = record.fail_msg.clone();

        let mut snapshot = StatusSnapshot::new(state, record);
        snapshot.fail_message = fail_message;
        Ok(snapshot)
    }
}
