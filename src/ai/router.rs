//! Routes generation calls to the provider a session was opened for.

use super::{FalGenerationClient, GenerationService, KieGenerationClient, ProgressSink, UploadFile};
use crate::models::{
    Config, GenerationRequest, NanoBananaOptions, NormalizedResult, ProviderKind, QwenOptions,
    SeedreamOptions, VeoOptions,
};
use crate::{Error, Result};
use std::collections::HashMap;
use std::sync::Arc;

/// Holds one [`GenerationService`] per provider.
#[derive(Clone, Default)]
pub struct ProviderRouter {
    services: HashMap<ProviderKind, Arc<dyn GenerationService>>,
}

impl ProviderRouter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the real HTTP clients for both providers, sharing `client`.
    pub fn from_config(config: &Config, client: reqwest::Client) -> Self {
        Self::new()
            .with_service(Arc::new(FalGenerationClient::from_config(
                config,
                client.clone(),
            )))
            .with_service(Arc::new(KieGenerationClient::from_config(config, client)))
    }

    /// Registers `service` under the provider it reports, replacing any
    /// previous one.
    pub fn with_service(mut self, service: Arc<dyn GenerationService>) -> Self {
        self.services.insert(service.provider(), service);
        self
    }

    pub fn session(&self, provider: ProviderKind) -> Result<ProviderSession> {
        let service = self.services.get(&provider).cloned().ok_or_else(|| {
            Error::Config(format!(
                "No generation service registered for {}",
                provider.display_name()
            ))
        })?;
        Ok(ProviderSession { provider, service })
    }
}

/// A caller's choice of provider. Every operation goes to that provider.
#[derive(Clone)]
pub struct ProviderSession {
    provider: ProviderKind,
    service: Arc<dyn GenerationService>,
}

impl ProviderSession {
    pub fn provider(&self) -> ProviderKind {
        self.provider
    }

    pub async fn submit(
        &self,
        request: &GenerationRequest,
        progress: &dyn ProgressSink,
    ) -> Result<NormalizedResult> {
        tracing::debug!(
            "Routing {} request to {}",
            request.options.model_label(),
            self.provider.display_name()
        );
        self.service.generate(request, progress).await
    }

    pub async fn submit_edit(
        &self,
        prompt: &str,
        image_urls: Vec<String>,
        options: SeedreamOptions,
        progress: &dyn ProgressSink,
    ) -> Result<NormalizedResult> {
        let request = GenerationRequest::seedream_edit(prompt, image_urls, options);
        self.submit(&request, progress).await
    }

    pub async fn submit_multi_ref(
        &self,
        prompt: &str,
        image_urls: Vec<String>,
        options: NanoBananaOptions,
        progress: &dyn ProgressSink,
    ) -> Result<NormalizedResult> {
        let request = GenerationRequest::nano_banana(prompt, image_urls, options);
        self.submit(&request, progress).await
    }

    pub async fn submit_video(
        &self,
        prompt: &str,
        image_urls: Vec<String>,
        options: VeoOptions,
        progress: &dyn ProgressSink,
    ) -> Result<NormalizedResult> {
        let request = GenerationRequest::veo(prompt, image_urls, options);
        self.submit(&request, progress).await
    }

    pub async fn submit_qwen(
        &self,
        prompt: &str,
        image_url: String,
        options: QwenOptions,
        progress: &dyn ProgressSink,
    ) -> Result<NormalizedResult> {
        let request = GenerationRequest::qwen(prompt, image_url, options);
        self.submit(&request, progress).await
    }

    pub async fn upload_file(&self, file: &UploadFile) -> Result<String> {
        self.service.upload_file(file).await
    }

    /// Uploads `files` one at a time, in order. `on_progress` receives
    /// `(current, total)` before each upload starts; the first failure aborts
    /// the rest.
    pub async fn upload_files<F>(&self, files: &[UploadFile], mut on_progress: F) -> Result<Vec<String>>
    where
        F: FnMut(usize, usize),
    {
        let total = files.len();
        let mut urls = Vec::with_capacity(total);

        for (index, file) in files.iter().enumerate() {
            on_progress(index + 1, total);
            urls.push(self.upload_file(file).await?);
        }

        Ok(urls)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::{MockGenerationClient, NoProgress};
    use crate::models::RequestKind;
    use pretty_assertions::assert_eq;

    fn router() -> (ProviderRouter, Arc<MockGenerationClient>, Arc<MockGenerationClient>) {
        let fal = Arc::new(MockGenerationClient::new(ProviderKind::Fal));
        let kie = Arc::new(MockGenerationClient::new(ProviderKind::Kie));
        let router = ProviderRouter::new()
            .with_service(fal.clone())
            .with_service(kie.clone());
        (router, fal, kie)
    }

    #[tokio::test]
    async fn test_session_routes_only_to_its_provider() {
        let (router, fal, kie) = router();
        let session = router.session(ProviderKind::Kie).unwrap();

        session
            .submit_edit("p", vec!["https://img/1.png".to_string()], SeedreamOptions::default(), &NoProgress)
            .await
            .unwrap();
        session
            .submit_video("p", vec![], VeoOptions::default(), &NoProgress)
            .await
            .unwrap();

        assert_eq!(kie.get_call_count(), 2);
        assert_eq!(fal.get_call_count(), 0);
        let kinds: Vec<RequestKind> = kie.requests().iter().map(|r| r.kind).collect();
        assert_eq!(kinds, vec![RequestKind::ImageEdit, RequestKind::TextToVideo]);
    }

    #[tokio::test]
    async fn test_sessions_are_independent() {
        let (router, fal, kie) = router();
        let fal_session = router.session(ProviderKind::Fal).unwrap();
        let kie_session = router.session(ProviderKind::Kie).unwrap();

        fal_session
            .submit_multi_ref("p", vec![], NanoBananaOptions::default(), &NoProgress)
            .await
            .unwrap();
        kie_session
            .submit_qwen("p", "https://img/q.png".to_string(), QwenOptions::default(), &NoProgress)
            .await
            .unwrap();

        assert_eq!(fal.get_call_count(), 1);
        assert_eq!(kie.get_call_count(), 1);
        assert_eq!(fal_session.provider(), ProviderKind::Fal);
    }

    #[tokio::test]
    async fn test_upload_files_reports_progress_in_order() {
        let (router, fal, _) = router();
        let session = router.session(ProviderKind::Fal).unwrap();
        let files = vec![
            UploadFile::from_bytes("a.png", vec![1]),
            UploadFile::from_bytes("b.png", vec![2]),
            UploadFile::from_bytes("c.png", vec![3]),
        ];

        let mut progress = Vec::new();
        let urls = session
            .upload_files(&files, |current, total| progress.push((current, total)))
            .await
            .unwrap();

        assert_eq!(progress, vec![(1, 3), (2, 3), (3, 3)]);
        assert_eq!(urls.len(), 3);
        assert!(urls[1].ends_with("/b.png"));
        assert_eq!(fal.uploaded_files(), vec!["a.png", "b.png", "c.png"]);
    }

    #[test]
    fn test_missing_provider_is_config_error() {
        let router = ProviderRouter::new()
            .with_service(Arc::new(MockGenerationClient::new(ProviderKind::Fal)));
        let err = router.session(ProviderKind::Kie).err().unwrap();
        assert!(matches!(err, Error::Config(_)));
    }
}
