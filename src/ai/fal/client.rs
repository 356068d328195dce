use super::types::{
    ErrorBody, InitiateUploadRequest, InitiateUploadResponse, QueueStatus, QueueSubmission,
};
use crate::ai::task::{ProviderState, StatusSnapshot, TaskStatusSource};
use crate::ai::UploadFile;
use crate::models::{DEFAULT_FAL_QUEUE_BASE, DEFAULT_FAL_REST_BASE};
use crate::{Error, Result};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Serialize;

/// REST client for the fal.ai queue and storage APIs.
pub struct FalHttpClient {
    pub(crate) client: Client,
    api_key: Option<String>,
    pub(crate) queue_base_url: String,
    pub(crate) rest_base_url: String,
}

impl FalHttpClient {
    pub fn new(api_key: Option<String>) -> Self {
        Self::new_with_client(api_key, Client::new())
    }

    pub fn new_with_client(api_key: Option<String>, client: Client) -> Self {
        Self {
            client,
            api_key,
            queue_base_url: DEFAULT_FAL_QUEUE_BASE.to_string(),
            rest_base_url: DEFAULT_FAL_REST_BASE.to_string(),
        }
    }

    pub fn with_base_urls(mut self, queue_base_url: String, rest_base_url: String) -> Self {
        self.queue_base_url = queue_base_url.trim_end_matches('/').to_string();
        self.rest_base_url = rest_base_url.trim_end_matches('/').to_string();
        self
    }

    pub(crate) fn api_key(&self) -> Result<&str> {
        self.api_key
            .as_deref()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| {
                Error::Config("fal.ai API key is not configured. Set FAL_KEY to your key.".to_string())
            })
    }

    fn authorization(&self) -> Result<String> {
        Ok(format!("Key {}", self.api_key()?))
    }

    /// Enqueues `input` for `endpoint` (e.g. `fal-ai/nano-banana-pro/edit`).
    pub async fn submit<Req: Serialize + ?Sized>(
        &self,
        endpoint: &str,
        input: &Req,
    ) -> Result<QueueSubmission> {
        let authorization = self.authorization()?;
        let url = format!("{}/{}", self.queue_base_url, endpoint);
        tracing::debug!("Submitting request to fal.ai queue: {}", url);

        let response = self
            .client
            .post(&url)
            .header("Authorization", authorization)
            .json(input)
            .send()
            .await
            .map_err(|e| {
                tracing::error!("Failed to send request to fal.ai: {}", e);
                e
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(match status {
                StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Error::Config(
                    "Invalid fal.ai API key. Please check your API key.".to_string(),
                ),
                StatusCode::TOO_MANY_REQUESTS => Error::RateLimited(
                    "fal.ai rate limit reached (too many concurrent requests). Please wait and try again."
                        .to_string(),
                ),
                _ => {
                    let body = response.text().await.unwrap_or_default();
                    tracing::error!("fal.ai queue error (status {}): {}", status, body);
                    Error::Submission {
                        status: status.as_u16(),
                        body,
                    }
                }
            });
        }

        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|e| {
            tracing::error!("Failed to parse fal.ai submission: {}\nBody: {}", e, body);
            Error::SubmissionRejected(format!("unreadable queue response: {}", e))
        })
    }

    pub async fn status(&self, status_url: &str) -> Result<QueueStatus> {
        let authorization = self.authorization()?;

        let response = self
            .client
            .get(status_url)
            .query(&[("logs", "1")])
            .header("Authorization", authorization)
            .send()
            .await
            .map_err(|e| Error::PollTransport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            tracing::error!("fal.ai status error (status {})", status);
            return Err(Error::PollTransport(format!("HTTP {}", status.as_u16())));
        }

        response
            .json()
            .await
            .map_err(|e| Error::PollTransport(format!("unreadable status response: {}", e)))
    }

    /// Fetches the raw output of a completed request. A non-2xx here means
    /// the model itself rejected or failed the request.
    pub async fn result(&self, response_url: &str) -> Result<String> {
        let authorization = self.authorization()?;

        let response = self
            .client
            .get(response_url)
            .header("Authorization", authorization)
            .send()
            .await
            .map_err(|e| Error::PollTransport(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| Error::PollTransport(e.to_string()))?;

        if !status.is_success() {
            tracing::error!("fal.ai request failed (status {}): {}", status, body);
            return Err(Error::ProviderFailure(ErrorBody::message(&body)));
        }

        Ok(body)
    }

    /// Two-step storage upload: reserve a signed URL, then PUT the bytes.
    pub async fn upload(&self, file: &UploadFile) -> Result<String> {
        let authorization = self.authorization()?;

        let response = self
            .client
            .post(format!("{}/storage/upload/initiate", self.rest_base_url))
            .query(&[("storage_type", "fal-cdn-v3")])
            .header("Authorization", authorization)
            .json(&InitiateUploadRequest {
                content_type: &file.content_type,
                file_name: &file.file_name,
            })
            .send()
            .await
            .map_err(|e| Error::Upload(e.to_string()))?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(Error::Config(
                "Invalid fal.ai API key. Please check your API key.".to_string(),
            ));
        }
        if !status.is_success() {
            return Err(Error::Upload(format!("HTTP {}", status.as_u16())));
        }

        let initiated: InitiateUploadResponse = response
            .json()
            .await
            .map_err(|e| Error::Upload(format!("unreadable initiate response: {}", e)))?;

        let put = self
            .client
            .put(&initiated.upload_url)
            .header("Content-Type", file.content_type.as_str())
            .body(file.bytes.clone())
            .send()
            .await
            .map_err(|e| Error::Upload(e.to_string()))?;

        if !put.status().is_success() {
            return Err(Error::Upload(format!(
                "storage rejected bytes: HTTP {}",
                put.status().as_u16()
            )));
        }

        Ok(initiated.file_url)
    }
}

/// Status source bound to one queued request.
pub struct FalQueueHandle<'a> {
    pub(crate) http: &'a FalHttpClient,
    pub(crate) submission: QueueSubmission,
}

#[async_trait]
impl TaskStatusSource for FalQueueHandle<'_> {
    type Payload = ();

    async fn fetch_status(&self, _task_id: &str) -> Result<StatusSnapshot<()>> {
        let status = self.http.status(&self.submission.status_url).await?;

        let state = match (ProviderState::from_fal(&status.status), status.error) {
            (ProviderState::Success, Some(error)) => {
                let mut snapshot = StatusSnapshot::new(ProviderState::Failed, ());
                snapshot.fail_message = Some(error);
                return Ok(snapshot);
            }
            (state, _) => state,
        };

        let mut snapshot = StatusSnapshot::new(state, ());
        snapshot.queue_position = status.queue_position;
        snapshot.logs = status
            .logs
            .unwrap_or_default()
            .into_iter()
            .map(|log| log.message)
            .collect();
        Ok(snapshot)
    }
}
