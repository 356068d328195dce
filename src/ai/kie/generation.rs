use super::client::KieHttpClient;
use super::payload;
use crate::ai::normalize::normalize_kie;
use crate::ai::task::{poll_until_terminal, PollPolicy, Task};
use crate::ai::{GenerationService, ProgressSink, UploadFile};
use crate::models::{Config, GenerationRequest, NormalizedResult, ProviderKind, QueueUpdate};
use crate::Result;
use async_trait::async_trait;

/// Kie AI implementation of [`GenerationService`]: create a task, poll
/// `recordInfo` until it settles, then normalize `resultJson`.
pub struct KieGenerationClient {
    http: KieHttpClient,
    policy: PollPolicy,
}

impl KieGenerationClient {
    pub fn new(api_key: Option<String>, policy: PollPolicy) -> Self {
        Self::new_with_client(api_key, policy, reqwest::Client::new())
    }

    pub fn new_with_client(
        api_key: Option<String>,
        policy: PollPolicy,
        client: reqwest::Client,
    ) -> Self {
        Self {
            http: KieHttpClient::new_with_client(api_key, client),
            policy,
        }
    }

    pub fn from_config(config: &Config, client: reqwest::Client) -> Self {
        Self::new_with_client(
            config.credentials.kie_api_key.clone(),
            config.poll_policy(),
            client,
        )
        .with_base_urls(config.kie_api_base.clone(), config.kie_upload_base.clone())
    }

    pub fn with_base_urls(mut self, base_url: String, upload_base_url: String) -> Self {
        self.http = self.http.with_base_urls(base_url, upload_base_url);
        self
    }
}

#[async_trait]
impl GenerationService for KieGenerationClient {
    fn provider(&self) -> ProviderKind {
        ProviderKind::Kie
    }

    async fn generate(
        &self,
        request: &GenerationRequest,
        progress: &dyn ProgressSink,
    ) -> Result<NormalizedResult> {
        request.validate()?;
        self.http.api_key()?;

        let task_request = payload::build_task(request);
        tracing::info!(
            "Submitting {} request to Kie AI (model {})",
            request.options.model_label(),
            task_request.model
        );

        progress.on_update(QueueUpdate::Starting);
        let task_id = self.http.create_task(&task_request).await?;
        tracing::info!("Kie AI task created: {}", task_id);

        let mut task = Task::new(task_id);
        let record = poll_until_terminal(&self.http, &mut task, &self.policy, progress).await?;

        Ok(normalize_kie(request.kind, record.into_outcome(), &task.id))
    }

    async fn upload_file(&self, file: &UploadFile) -> Result<String> {
        tracing::debug!(
            "Uploading {} ({} bytes) to Kie AI storage",
            file.file_name,
            file.bytes.len()
        );
        self.http.upload(file).await
    }
}
