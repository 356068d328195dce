//! Application orchestration for command-line generation runs.

use crate::ai::{ProviderRouter, ProviderSession, UploadFile};
use crate::models::{Config, GenerationRequest, ModelOptions, NormalizedResult, ProviderKind, QueueUpdate};
use crate::{Error, Result};
use std::path::PathBuf;
use tracing::{info, warn};

/// One generation run: the prompt, where its reference images come from, and
/// which model to use.
#[derive(Debug, Clone)]
pub struct GenerateJob {
    pub provider: Option<ProviderKind>,
    pub prompt: String,
    pub image_urls: Vec<String>,
    /// Local images uploaded to the provider before submission; their URLs
    /// are appended after `image_urls`.
    pub image_files: Vec<PathBuf>,
    pub options: ModelOptions,
}

/// Coordinates uploads and generation against the selected provider.
pub struct App {
    router: ProviderRouter,
    default_provider: ProviderKind,
}

impl App {
    /// Build an app from an existing router, e.g. one holding mock services.
    pub fn with_router(router: ProviderRouter, default_provider: ProviderKind) -> Self {
        Self {
            router,
            default_provider,
        }
    }

    /// Construct an app from environment configuration (`Config::from_env`).
    pub fn new() -> Result<Self> {
        let config = Config::from_env()?;
        Ok(Self::from_config(&config))
    }

    pub fn from_config(config: &Config) -> Self {
        for provider in [ProviderKind::Fal, ProviderKind::Kie] {
            if !config.credentials.is_configured(provider) {
                warn!("{} API key is not configured", provider.display_name());
            }
        }

        // One connection pool for every provider client.
        let http_client = reqwest::Client::new();
        Self::with_router(
            ProviderRouter::from_config(config, http_client),
            config.provider,
        )
    }

    fn session(&self, provider: Option<ProviderKind>) -> Result<ProviderSession> {
        let provider = provider.unwrap_or(self.default_provider);
        info!("Using provider: {}", provider.display_name());
        self.router.session(provider)
    }

    pub async fn generate(&self, job: GenerateJob) -> Result<NormalizedResult> {
        validate_prompt(&job.prompt)?;
        let session = self.session(job.provider)?;

        let mut image_urls = job.image_urls;
        if !job.image_files.is_empty() {
            let files = job
                .image_files
                .iter()
                .map(|path| UploadFile::from_path(path))
                .collect::<Result<Vec<_>>>()?;
            image_urls.extend(session.upload_files(&files, log_upload_progress).await?);
        }

        let request = match job.options {
            ModelOptions::Seedream(options) => {
                GenerationRequest::seedream_edit(&job.prompt, image_urls, options)
            }
            ModelOptions::NanoBanana(options) => {
                GenerationRequest::nano_banana(&job.prompt, image_urls, options)
            }
            ModelOptions::Veo(options) => GenerationRequest::veo(&job.prompt, image_urls, options),
            ModelOptions::Qwen(options) => {
                let mut urls = image_urls.into_iter();
                let image_url = urls.next().ok_or_else(|| {
                    Error::InvalidRequest("Qwen image-to-image needs an input image".to_string())
                })?;
                if urls.next().is_some() {
                    warn!("Qwen takes a single input image; extra images are ignored");
                }
                GenerationRequest::qwen(&job.prompt, image_url, options)
            }
        };

        let result = session.submit(&request, &log_queue_update).await?;
        if result.is_empty() {
            warn!("Request {} finished without any output", result.request_id);
        }
        info!(
            "Generation finished: {} image(s), video: {}",
            result.images().len(),
            result.video().is_some()
        );
        Ok(result)
    }

    pub async fn upload(
        &self,
        provider: Option<ProviderKind>,
        paths: &[PathBuf],
    ) -> Result<Vec<String>> {
        let session = self.session(provider)?;
        let files = paths
            .iter()
            .map(|path| UploadFile::from_path(path))
            .collect::<Result<Vec<_>>>()?;
        session.upload_files(&files, log_upload_progress).await
    }
}

/// Rejects blank prompts before any provider call. Length limits are left to
/// each model's payload mapping, which truncates instead of rejecting.
pub fn validate_prompt(prompt: &str) -> Result<()> {
    if prompt.trim().is_empty() {
        return Err(Error::InvalidRequest("Please enter a prompt".to_string()));
    }
    Ok(())
}

fn log_upload_progress(current: usize, total: usize) {
    info!("Uploading image {}/{}...", current, total);
}

fn log_queue_update(update: QueueUpdate) {
    match update {
        QueueUpdate::Starting => info!("Submitting request..."),
        QueueUpdate::InQueue { position } => info!("In queue (position {})", position),
        QueueUpdate::InProgress { logs } => {
            for line in logs {
                info!("{}", line);
            }
        }
        QueueUpdate::Completed => info!("Request completed"),
        QueueUpdate::Failed { message } => warn!("Request failed: {}", message),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::MockGenerationClient;
    use crate::models::{QwenOptions, SeedreamOptions, VeoOptions};
    use std::sync::Arc;

    fn app_with(fal: Arc<MockGenerationClient>, kie: Arc<MockGenerationClient>) -> App {
        App::with_router(
            ProviderRouter::new().with_service(fal).with_service(kie),
            ProviderKind::Fal,
        )
    }

    fn job(prompt: &str, options: ModelOptions) -> GenerateJob {
        GenerateJob {
            provider: None,
            prompt: prompt.to_string(),
            image_urls: vec!["https://img/1.png".to_string()],
            image_files: vec![],
            options,
        }
    }

    #[test]
    fn test_validate_prompt_rejects_only_blank() {
        assert!(validate_prompt("").is_err());
        assert!(validate_prompt("  \n\t ").is_err());
        assert!(validate_prompt("hi").is_ok());
        assert!(validate_prompt(&"x".repeat(60_000)).is_ok());
    }

    #[tokio::test]
    async fn test_blank_prompt_never_reaches_provider() {
        let fal = Arc::new(MockGenerationClient::new(ProviderKind::Fal));
        let app = app_with(fal.clone(), Arc::new(MockGenerationClient::new(ProviderKind::Kie)));

        let err = app
            .generate(job("    ", ModelOptions::Seedream(SeedreamOptions::default())))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidRequest(_)));
        assert_eq!(fal.get_call_count(), 0);
    }

    #[tokio::test]
    async fn test_short_and_long_prompts_are_submitted() {
        let fal = Arc::new(MockGenerationClient::new(ProviderKind::Fal));
        let app = app_with(fal.clone(), Arc::new(MockGenerationClient::new(ProviderKind::Kie)));

        app.generate(job("hi", ModelOptions::Seedream(SeedreamOptions::default())))
            .await
            .unwrap();

        let long_prompt = "y".repeat(60_000);
        let result = app
            .generate(job(&long_prompt, ModelOptions::Veo(VeoOptions::default())))
            .await
            .unwrap();

        assert!(result.video().is_some());
        assert_eq!(fal.get_call_count(), 2);
        assert_eq!(fal.requests()[1].prompt.chars().count(), 60_000);
    }

    #[tokio::test]
    async fn test_generate_uses_default_or_explicit_provider() {
        let fal = Arc::new(MockGenerationClient::new(ProviderKind::Fal));
        let kie = Arc::new(MockGenerationClient::new(ProviderKind::Kie));
        let app = app_with(fal.clone(), kie.clone());

        app.generate(job("make it blue", ModelOptions::Seedream(SeedreamOptions::default())))
            .await
            .unwrap();

        let mut explicit = job("a slow pan", ModelOptions::Veo(VeoOptions::default()));
        explicit.provider = Some(ProviderKind::Kie);
        let result = app.generate(explicit).await.unwrap();

        assert!(result.video().is_some());
        assert_eq!(fal.get_call_count(), 1);
        assert_eq!(kie.get_call_count(), 1);
    }

    #[tokio::test]
    async fn test_local_files_uploaded_before_generation() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ref.png");
        std::fs::write(&path, [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A]).unwrap();

        let kie = Arc::new(MockGenerationClient::new(ProviderKind::Kie));
        let app = app_with(Arc::new(MockGenerationClient::new(ProviderKind::Fal)), kie.clone());

        let mut qwen = job("restyle this", ModelOptions::Qwen(QwenOptions::default()));
        qwen.provider = Some(ProviderKind::Kie);
        qwen.image_urls.clear();
        qwen.image_files = vec![path];
        app.generate(qwen).await.unwrap();

        assert_eq!(kie.uploaded_files(), vec!["ref.png"]);
        let sent = kie.requests();
        assert_eq!(sent[0].reference_image_urls, vec!["https://mock.kie/files/ref.png"]);
    }
}
