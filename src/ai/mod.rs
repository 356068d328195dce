//! Generation provider integration
//!
//! Submits image and video requests to fal.ai or Kie AI, tracks the remote task
//! until it settles, and hands back a provider-independent [`NormalizedResult`].

pub mod fal;
pub mod kie;
pub mod mime;
pub mod mock;
pub mod normalize;
pub mod router;
pub mod task;
pub mod upload;

pub use fal::FalGenerationClient;
pub use kie::KieGenerationClient;
pub use mock::MockGenerationClient;
pub use normalize::NormalizationWarning;
pub use router::{ProviderRouter, ProviderSession};
pub use task::{PollPolicy, ProviderState, Task, TaskState};
pub use upload::UploadFile;

use crate::models::{GenerationRequest, NormalizedResult, ProviderKind, QueueUpdate};
use crate::Result;
use async_trait::async_trait;

/// Receives progress events while a request is queued and running.
pub trait ProgressSink: Send + Sync {
    fn on_update(&self, update: QueueUpdate);
}

impl<F> ProgressSink for F
where
    F: Fn(QueueUpdate) + Send + Sync,
{
    fn on_update(&self, update: QueueUpdate) {
        self(update)
    }
}

/// Discards progress events.
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn on_update(&self, _update: QueueUpdate) {}
}

#[async_trait]
pub trait GenerationService: Send + Sync {
    fn provider(&self) -> ProviderKind;

    /// Submits `request`, waits for the remote task to finish and normalizes
    /// its output.
    async fn generate(
        &self,
        request: &GenerationRequest,
        progress: &dyn ProgressSink,
    ) -> Result<NormalizedResult>;

    /// Stores `file` with the provider and returns its public URL.
    async fn upload_file(&self, file: &UploadFile) -> Result<String>;
}

/// Cuts `s` to at most `limit` characters.
pub(crate) fn truncate_chars(s: &str, limit: usize) -> String {
    match s.char_indices().nth(limit) {
        Some((end, _)) => s[..end].to_string(),
        None => s.to_string(),
    }
}
