use super::{GenerationService, ProgressSink, UploadFile};
use crate::models::{
    GenerationOutput, GenerationRequest, ImageOutput, NormalizedResult, ProviderKind, QueueUpdate,
    VideoOutput,
};
use crate::{Error, Result};
use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

/// In-memory [`GenerationService`] that answers instantly.
pub struct MockGenerationClient {
    provider: ProviderKind,
    image_urls: Arc<Mutex<Vec<String>>>,
    failure: Arc<Mutex<Option<String>>>,
    requests: Arc<Mutex<Vec<GenerationRequest>>>,
    uploads: Arc<Mutex<Vec<String>>>,
    call_count: Arc<Mutex<usize>>,
}

impl MockGenerationClient {
    pub fn new(provider: ProviderKind) -> Self {
        Self {
            provider,
            image_urls: Arc::new(Mutex::new(Vec::new())),
            failure: Arc::new(Mutex::new(None)),
            requests: Arc::new(Mutex::new(Vec::new())),
            uploads: Arc::new(Mutex::new(Vec::new())),
            call_count: Arc::new(Mutex::new(0)),
        }
    }

    pub fn with_image_url(self, url: &str) -> Self {
        self.image_urls.lock().unwrap().push(url.to_string());
        self
    }

    /// Makes every `generate` call fail with `message`.
    pub fn with_failure(self, message: &str) -> Self {
        *self.failure.lock().unwrap() = Some(message.to_string());
        self
    }

    pub fn get_call_count(&self) -> usize {
        *self.call_count.lock().unwrap()
    }

    pub fn requests(&self) -> Vec<GenerationRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn uploaded_files(&self) -> Vec<String> {
        self.uploads.lock().unwrap().clone()
    }

    fn mock_url(&self, name: &str) -> String {
        format!("https://mock.{}/files/{}", self.provider.as_str(), name)
    }
}

#[async_trait]
impl GenerationService for MockGenerationClient {
    fn provider(&self) -> ProviderKind {
        self.provider
    }

    async fn generate(
        &self,
        request: &GenerationRequest,
        progress: &dyn ProgressSink,
    ) -> Result<NormalizedResult> {
        request.validate()?;
        *self.call_count.lock().unwrap() += 1;
        self.requests.lock().unwrap().push(request.clone());

        progress.on_update(QueueUpdate::Starting);
        if let Some(message) = self.failure.lock().unwrap().clone() {
            progress.on_update(QueueUpdate::Failed {
                message: message.clone(),
            });
            return Err(Error::ProviderFailure(message));
        }
        progress.on_update(QueueUpdate::Completed);

        let request_id = Uuid::new_v4().to_string();
        let output = if request.kind.is_video() {
            GenerationOutput::Video {
                video: Some(VideoOutput {
                    url: self.mock_url(&format!("{}.mp4", request_id)),
                    content_type: Some("video/mp4".to_string()),
                }),
            }
        } else {
            let configured = self.image_urls.lock().unwrap().clone();
            let urls = if configured.is_empty() {
                vec![self.mock_url(&format!("{}.png", request_id))]
            } else {
                configured
            };
            GenerationOutput::Images {
                images: urls
                    .into_iter()
                    .map(|url| ImageOutput {
                        url,
                        width: None,
                        height: None,
                        content_type: Some("image/png".to_string()),
                    })
                    .collect(),
            }
        };

        Ok(NormalizedResult {
            output,
            seed: None,
            prompt: Some(request.prompt.clone()),
            request_id,
        })
    }

    async fn upload_file(&self, file: &UploadFile) -> Result<String> {
        *self.call_count.lock().unwrap() += 1;
        self.uploads.lock().unwrap().push(file.file_name.clone());
        Ok(self.mock_url(&file.file_name))
    }
}
