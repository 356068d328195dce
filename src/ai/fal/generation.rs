use super::client::{FalHttpClient, FalQueueHandle};
use super::payload;
use crate::ai::normalize::normalize_fal;
use crate::ai::task::{poll_until_terminal, PollPolicy, Task};
use crate::ai::{GenerationService, ProgressSink, UploadFile};
use crate::models::{Config, GenerationRequest, NormalizedResult, ProviderKind, QueueUpdate};
use crate::Result;
use async_trait::async_trait;

/// fal.ai implementation of [`GenerationService`] over the queue API.
pub struct FalGenerationClient {
    http: FalHttpClient,
    policy: PollPolicy,
}

impl FalGenerationClient {
    pub fn new(api_key: Option<String>, policy: PollPolicy) -> Self {
        Self::new_with_client(api_key, policy, reqwest::Client::new())
    }

    pub fn new_with_client(
        api_key: Option<String>,
        policy: PollPolicy,
        client: reqwest::Client,
    ) -> Self {
        Self {
            http: FalHttpClient::new_with_client(api_key, client),
            policy,
        }
    }

    pub fn from_config(config: &Config, client: reqwest::Client) -> Self {
        Self::new_with_client(
            config.credentials.fal_api_key.clone(),
            config.poll_policy(),
            client,
        )
        .with_base_urls(config.fal_queue_base.clone(), config.fal_rest_base.clone())
    }

    pub fn with_base_urls(mut self, queue_base_url: String, rest_base_url: String) -> Self {
        self.http = self.http.with_base_urls(queue_base_url, rest_base_url);
        self
    }
}

#[async_trait]
impl GenerationService for FalGenerationClient {
    fn provider(&self) -> ProviderKind {
        ProviderKind::Fal
    }

    async fn generate(
        &self,
        request: &GenerationRequest,
        progress: &dyn ProgressSink,
    ) -> Result<NormalizedResult> {
        request.validate()?;
        let (endpoint, input) = payload::build_input(request)?;
        self.http.api_key()?;

        tracing::info!(
            "Submitting {} request to fal.ai ({})",
            request.options.model_label(),
            endpoint
        );

        progress.on_update(QueueUpdate::Starting);
        let submission = self.http.submit(endpoint, &input).await?;
        tracing::info!("fal.ai request queued: {}", submission.request_id);

        let mut task = Task::new(submission.request_id.clone());
        let handle = FalQueueHandle {
            http: &self.http,
            submission,
        };
        poll_until_terminal(&handle, &mut task, &self.policy, progress).await?;

        let body = self.http.result(&handle.submission.response_url).await?;
        Ok(normalize_fal(request.kind, &body, &task.id))
    }

    async fn upload_file(&self, file: &UploadFile) -> Result<String> {
        tracing::debug!(
            "Uploading {} ({} bytes) to fal.ai storage",
            file.file_name,
            file.bytes.len()
        );
        self.http.upload(file).await
    }
}
