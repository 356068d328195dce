//! Data models and structures
//!
//! Defines generation requests, the normalized result contract shared by all
//! providers, queue progress events, and environment configuration.

use crate::ai::PollPolicy;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    Fal,
    Kie,
}

impl ProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::Fal => "fal",
            ProviderKind::Kie => "kie",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            ProviderKind::Fal => "fal.ai",
            ProviderKind::Kie => "Kie AI",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fal" | "fal.ai" => Ok(ProviderKind::Fal),
            "kie" | "kie.ai" => Ok(ProviderKind::Kie),
            other => Err(Error::Config(format!(
                "Unknown provider '{}'. Expected 'fal' or 'kie'",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RequestKind {
    ImageEdit,
    MultiRefEdit,
    TextToVideo,
    ImageToVideo,
}

impl RequestKind {
    pub fn is_video(&self) -> bool {
        matches!(self, RequestKind::TextToVideo | RequestKind::ImageToVideo)
    }
}

/// SeeDream 4.5 edit options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeedreamOptions {
    pub image_size: String,
    pub enable_safety_checker: bool,
}

impl Default for SeedreamOptions {
    fn default() -> Self {
        Self {
            image_size: "square_hd".to_string(),
            enable_safety_checker: true,
        }
    }
}

/// Nano Banana Pro multi-reference options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NanoBananaOptions {
    pub num_images: u32,
    pub aspect_ratio: String,
    pub resolution: String,
    pub output_format: String,
    pub enable_web_search: bool,
}

impl Default for NanoBananaOptions {
    fn default() -> Self {
        Self {
            num_images: 1,
            aspect_ratio: "auto".to_string(),
            resolution: "1K".to_string(),
            output_format: "png".to_string(),
            enable_web_search: false,
        }
    }
}

/// Veo 3.1 video options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VeoOptions {
    pub aspect_ratio: String,
    pub duration: String,
    pub resolution: String,
    pub generate_audio: bool,
    pub auto_fix: bool,
}

impl Default for VeoOptions {
    fn default() -> Self {
        Self {
            aspect_ratio: "16:9".to_string(),
            duration: "8s".to_string(),
            resolution: "720p".to_string(),
            generate_audio: true,
            auto_fix: false,
        }
    }
}

/// Qwen image-to-image options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QwenOptions {
    pub strength: f64,
    pub output_format: String,
    pub acceleration: String,
    pub negative_prompt: String,
    pub seed: Option<i64>,
    pub num_inference_steps: u32,
    pub guidance_scale: f64,
    pub enable_safety_checker: bool,
}

impl Default for QwenOptions {
    fn default() -> Self {
        Self {
            strength: 0.8,
            output_format: "png".to_string(),
            acceleration: "none".to_string(),
            negative_prompt: "blurry, ugly".to_string(),
            seed: None,
            num_inference_steps: 30,
            guidance_scale: 2.5,
            enable_safety_checker: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "model", rename_all = "kebab-case")]
pub enum ModelOptions {
    Seedream(SeedreamOptions),
    NanoBanana(NanoBananaOptions),
    Veo(VeoOptions),
    Qwen(QwenOptions),
}

impl ModelOptions {
    pub fn model_label(&self) -> &'static str {
        match self {
            ModelOptions::Seedream(_) => "SeeDream 4.5",
            ModelOptions::NanoBanana(_) => "Nano Banana Pro",
            ModelOptions::Veo(_) => "Veo 3.1",
            ModelOptions::Qwen(_) => "Qwen image-to-image",
        }
    }

    fn accepts(&self, kind: RequestKind) -> bool {
        match self {
            ModelOptions::Seedream(_) | ModelOptions::Qwen(_) => kind == RequestKind::ImageEdit,
            ModelOptions::NanoBanana(_) => kind == RequestKind::MultiRefEdit,
            ModelOptions::Veo(_) => kind.is_video(),
        }
    }
}

/// A prompt plus reference images bound for one model. Built through the
/// per-model constructors so `kind` always agrees with `options`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub kind: RequestKind,
    pub prompt: String,
    pub reference_image_urls: Vec<String>,
    pub options: ModelOptions,
}

impl GenerationRequest {
    pub fn seedream_edit(prompt: &str, image_urls: Vec<String>, options: SeedreamOptions) -> Self {
        Self {
            kind: RequestKind::ImageEdit,
            prompt: prompt.to_string(),
            reference_image_urls: image_urls,
            options: ModelOptions::Seedream(options),
        }
    }

    pub fn nano_banana(prompt: &str, image_urls: Vec<String>, options: NanoBananaOptions) -> Self {
        Self {
            kind: RequestKind::MultiRefEdit,
            prompt: prompt.to_string(),
            reference_image_urls: image_urls,
            options: ModelOptions::NanoBanana(options),
        }
    }

    pub fn veo(prompt: &str, image_urls: Vec<String>, options: VeoOptions) -> Self {
        let kind = if image_urls.is_empty() {
            RequestKind::TextToVideo
        } else {
            RequestKind::ImageToVideo
        };
        Self {
            kind,
            prompt: prompt.to_string(),
            reference_image_urls: image_urls,
            options: ModelOptions::Veo(options),
        }
    }

    pub fn qwen(prompt: &str, image_url: String, options: QwenOptions) -> Self {
        Self {
            kind: RequestKind::ImageEdit,
            prompt: prompt.to_string(),
            reference_image_urls: vec![image_url],
            options: ModelOptions::Qwen(options),
        }
    }

    /// Checks the invariants the constructors establish, for requests that
    /// were deserialized or assembled by hand.
    pub fn validate(&self) -> Result<()> {
        if !self.options.accepts(self.kind) {
            return Err(Error::InvalidRequest(format!(
                "{} cannot serve a {:?} request",
                self.options.model_label(),
                self.kind
            )));
        }

        if self.kind == RequestKind::TextToVideo && !self.reference_image_urls.is_empty() {
            return Err(Error::InvalidRequest(
                "Text-to-video requests take no reference images".to_string(),
            ));
        }

        if self.kind == RequestKind::ImageToVideo && self.reference_image_urls.is_empty() {
            return Err(Error::InvalidRequest(
                "Image-to-video requests need at least one reference image".to_string(),
            ));
        }

        if matches!(self.options, ModelOptions::Qwen(_)) && self.reference_image_urls.is_empty() {
            return Err(Error::InvalidRequest(
                "Qwen image-to-image needs an input image".to_string(),
            ));
        }

        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageOutput {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoOutput {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
}

/// Either an image list or a (possibly absent) video, never both.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum GenerationOutput {
    Images { images: Vec<ImageOutput> },
    Video { video: Option<VideoOutput> },
}

/// Provider-independent result of a finished generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedResult {
    #[serde(flatten)]
    pub output: GenerationOutput,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
    #[serde(rename = "requestId")]
    pub request_id: String,
}

impl NormalizedResult {
    pub fn images(&self) -> &[ImageOutput] {
        match &self.output {
            GenerationOutput::Images { images } => images,
            GenerationOutput::Video { .. } => &[],
        }
    }

    pub fn video(&self) -> Option<&VideoOutput> {
        match &self.output {
            GenerationOutput::Video { video } => video.as_ref(),
            GenerationOutput::Images { .. } => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.images().is_empty() && self.video().is_none()
    }
}

/// Caller-visible progress, shaped like fal.ai queue updates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QueueUpdate {
    Starting,
    InQueue { position: u32 },
    InProgress { logs: Vec<String> },
    Completed,
    Failed { message: String },
}

/// API keys per provider. Read-only once loaded.
#[derive(Debug, Clone, Default)]
pub struct Credentials {
    pub fal_api_key: Option<String>,
    pub kie_api_key: Option<String>,
}

impl Credentials {
    pub fn api_key_for(&self, provider: ProviderKind) -> Option<&str> {
        let key = match provider {
            ProviderKind::Fal => self.fal_api_key.as_deref(),
            ProviderKind::Kie => self.kie_api_key.as_deref(),
        };
        key.filter(|k| !k.trim().is_empty())
    }

    pub fn is_configured(&self, provider: ProviderKind) -> bool {
        self.api_key_for(provider).is_some()
    }
}

// Configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub provider: ProviderKind,
    pub credentials: Credentials,
    pub kie_api_base: String,
    pub kie_upload_base: String,
    pub fal_queue_base: String,
    pub fal_rest_base: String,
    pub poll_interval: Duration,
    pub max_poll_attempts: u32,
}

pub const DEFAULT_KIE_API_BASE: &str = "https://api.kie.ai";
pub const DEFAULT_KIE_UPLOAD_BASE: &str = "https://kieai.redpandaai.co";
pub const DEFAULT_FAL_QUEUE_BASE: &str = "https://queue.fal.run";
pub const DEFAULT_FAL_REST_BASE: &str = "https://rest.alpha.fal.ai";

impl Config {
    pub fn from_env() -> Result<Self> {
        tolerate_missing_env_file(dotenvy::dotenv())?;
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let provider = match lookup("GENERATION_PROVIDER") {
            Some(value) => value.parse()?,
            None => ProviderKind::Fal,
        };

        let poll_interval_ms = parse_number(&lookup, "POLL_INTERVAL_MS", 3000u64)?;
        let max_poll_attempts = parse_number(&lookup, "MAX_POLL_ATTEMPTS", 200u32)?;
        if max_poll_attempts == 0 {
            return Err(Error::Config(
                "MAX_POLL_ATTEMPTS must be at least 1".to_string(),
            ));
        }

        Ok(Self {
            provider,
            credentials: Credentials {
                fal_api_key: lookup("FAL_KEY"),
                kie_api_key: lookup("KIE_API_KEY"),
            },
            kie_api_base: lookup("KIE_API_BASE").unwrap_or_else(|| DEFAULT_KIE_API_BASE.to_string()),
            kie_upload_base: lookup("KIE_UPLOAD_BASE")
                .unwrap_or_else(|| DEFAULT_KIE_UPLOAD_BASE.to_string()),
            fal_queue_base: lookup("FAL_QUEUE_BASE")
                .unwrap_or_else(|| DEFAULT_FAL_QUEUE_BASE.to_string()),
            fal_rest_base: lookup("FAL_REST_BASE")
                .unwrap_or_else(|| DEFAULT_FAL_REST_BASE.to_string()),
            poll_interval: Duration::from_millis(poll_interval_ms),
            max_poll_attempts,
        })
    }

    pub fn poll_policy(&self) -> PollPolicy {
        PollPolicy {
            interval: self.poll_interval,
            max_attempts: self.max_poll_attempts,
        }
    }
}

/// A missing `.env` is fine; an unreadable or malformed one is not.
fn tolerate_missing_env_file<T>(result: dotenvy::Result<T>) -> Result<()> {
    match result {
        Ok(_) => Ok(()),
        Err(e) if e.not_found() => Ok(()),
        Err(e) => Err(e.into()),
    }
}

fn parse_number<F, T>(lookup: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| Error::Config(format!("{} must be a number (got '{}')", key, raw))),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_config_defaults() {
        let config = Config::from_lookup(lookup_from(&[])).unwrap();
        assert_eq!(config.provider, ProviderKind::Fal);
        assert_eq!(config.poll_interval, Duration::from_secs(3));
        assert_eq!(config.max_poll_attempts, 200);
        assert_eq!(config.kie_api_base, DEFAULT_KIE_API_BASE);
        assert!(!config.credentials.is_configured(ProviderKind::Kie));
    }

    #[test]
    fn test_config_reads_provider_and_keys() {
        let config = Config::from_lookup(lookup_from(&[
            ("GENERATION_PROVIDER", "kie"),
            ("KIE_API_KEY", "kie-secret"),
            ("FAL_KEY", "   "),
            ("POLL_INTERVAL_MS", "250"),
        ]))
        .unwrap();

        assert_eq!(config.provider, ProviderKind::Kie);
        assert_eq!(config.credentials.api_key_for(ProviderKind::Kie), Some("kie-secret"));
        assert_eq!(config.credentials.api_key_for(ProviderKind::Fal), None);
        assert_eq!(config.poll_policy().interval, Duration::from_millis(250));
    }

    #[test]
    fn test_config_rejects_bad_values() {
        let err = Config::from_lookup(lookup_from(&[("GENERATION_PROVIDER", "midjourney")]))
            .unwrap_err();
        assert!(matches!(err, Error::Config(_)));

        let err = Config::from_lookup(lookup_from(&[("MAX_POLL_ATTEMPTS", "lots")])).unwrap_err();
        assert!(err.to_string().contains("MAX_POLL_ATTEMPTS"));

        let err = Config::from_lookup(lookup_from(&[("MAX_POLL_ATTEMPTS", "0")])).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_veo_kind_follows_image_count() {
        let text = GenerationRequest::veo("waves", vec![], VeoOptions::default());
        assert_eq!(text.kind, RequestKind::TextToVideo);

        let image = GenerationRequest::veo("waves", vec!["a".into()], VeoOptions::default());
        assert_eq!(image.kind, RequestKind::ImageToVideo);
        assert!(image.kind.is_video());
    }

    #[test]
    fn test_validate_rejects_mismatched_kind() {
        let mut request =
            GenerationRequest::seedream_edit("edit", vec!["a".into()], SeedreamOptions::default());
        assert!(request.validate().is_ok());

        request.kind = RequestKind::TextToVideo;
        assert!(matches!(request.validate(), Err(Error::InvalidRequest(_))));

        let mut qwen = GenerationRequest::qwen("x", "a".into(), QwenOptions::default());
        qwen.reference_image_urls.clear();
        assert!(matches!(qwen.validate(), Err(Error::InvalidRequest(_))));
    }

    #[test]
    fn test_normalized_result_serializes_in_fal_shape() {
        let result = NormalizedResult {
            output: GenerationOutput::Images {
                images: vec![ImageOutput {
                    url: "https://cdn/a.jpg".to_string(),
                    width: None,
                    height: None,
                    content_type: Some("image/jpeg".to_string()),
                }],
            },
            seed: Some(42),
            prompt: None,
            request_id: "task-1".to_string(),
        };

        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "images": [{ "url": "https://cdn/a.jpg", "content_type": "image/jpeg" }],
                "seed": 42,
                "requestId": "task-1"
            })
        );
        assert!(result.video().is_none());
        assert!(!result.is_empty());
    }

    #[test]
    fn test_queue_update_uses_fal_status_tags() {
        let json = serde_json::to_value(QueueUpdate::InQueue { position: 2 }).unwrap();
        assert_eq!(json, serde_json::json!({ "status": "IN_QUEUE", "position": 2 }));
    }

    #[test]
    fn test_missing_env_file_is_tolerated_but_malformed_is_not() {
        let dir = tempfile::tempdir().unwrap();

        let missing = dotenvy::from_path(dir.path().join("absent.env"));
        assert!(tolerate_missing_env_file(missing).is_ok());

        let malformed_path = dir.path().join("broken.env");
        std::fs::write(&malformed_path, "this line has no equals sign\n").unwrap();
        let malformed = dotenvy::from_path(&malformed_path);
        let err = tolerate_missing_env_file(malformed).unwrap_err();
        assert!(matches!(err, Error::EnvVar(_)));
    }
}
