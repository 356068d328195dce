//! Converts provider payloads into [`NormalizedResult`].
//!
//! Decode failures never abort a finished generation: they become a
//! [`NormalizationWarning`], get logged, and the caller receives an empty
//! result of the right kind.

use crate::models::{GenerationOutput, ImageOutput, NormalizedResult, RequestKind, VideoOutput};
use serde::{Deserialize, Deserializer};
use std::fmt;

const KIE_IMAGE_CONTENT_TYPE: &str = "image/jpeg";
const KIE_VIDEO_CONTENT_TYPE: &str = "video/mp4";

/// Image reference as providers send it: a bare URL or an object.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum ImageEntry {
    Url(String),
    Object {
        url: String,
        #[serde(default)]
        width: Option<u32>,
        #[serde(default)]
        height: Option<u32>,
        #[serde(default)]
        content_type: Option<String>,
    },
    Other(serde_json::Value),
}

impl ImageEntry {
    fn into_output(self, default_content_type: Option<&str>) -> Option<ImageOutput> {
        let fallback = default_content_type.map(str::to_string);
        match self {
            ImageEntry::Url(url) => Some(ImageOutput {
                url,
                width: None,
                height: None,
                content_type: fallback,
            }),
            ImageEntry::Object {
                url,
                width,
                height,
                content_type,
            } => Some(ImageOutput {
                url,
                width,
                height,
                content_type: content_type.or(fallback),
            }),
            ImageEntry::Other(value) => {
                tracing::warn!("Dropping image entry without a URL: {}", value);
                None
            }
        }
    }
}

fn collect_images(entries: Vec<ImageEntry>, default_content_type: Option<&str>) -> Vec<ImageOutput> {
    entries
        .into_iter()
        .filter_map(|entry| entry.into_output(default_content_type))
        .collect()
}

/// Seeds arrive as numbers, occasionally as strings or out of `i64` range.
pub(crate) fn lenient_seed<'de, D>(deserializer: D) -> std::result::Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::Number(n)) => n.as_i64(),
        Some(serde_json::Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    })
}

/// A payload that could not be decoded into a result.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizationWarning {
    pub request_id: String,
    pub reason: String,
}

impl fmt::Display for NormalizationWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "unparseable result for request {}: {}",
            self.request_id, self.reason
        )
    }
}

/// Decoded body of Kie's `resultJson` string.
#[derive(Debug, Default, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KieResultJson {
    #[serde(default)]
    pub result_urls: Option<Vec<ImageEntry>>,
    #[serde(default)]
    pub video_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ResultPayload {
    Decoded(KieResultJson),
    Missing,
    Unparseable(NormalizationWarning),
}

impl ResultPayload {
    pub fn decode(raw: Option<&str>, request_id: &str) -> Self {
        let Some(raw) = raw.filter(|r| !r.trim().is_empty()) else {
            return ResultPayload::Missing;
        };

        match serde_json::from_str::<KieResultJson>(raw) {
            Ok(decoded) => ResultPayload::Decoded(decoded),
            Err(e) => ResultPayload::Unparseable(NormalizationWarning {
                request_id: request_id.to_string(),
                reason: e.to_string(),
            }),
        }
    }

    fn into_decoded(self) -> Option<KieResultJson> {
        match self {
            ResultPayload::Decoded(decoded) => Some(decoded),
            ResultPayload::Missing => None,
            ResultPayload::Unparseable(warning) => {
                tracing::warn!("Failed to parse resultJson: {}", warning);
                None
            }
        }
    }
}

/// Terminal Kie task fields relevant to normalization.
#[derive(Debug, Default, Clone)]
pub struct KieOutcome {
    pub result_json: Option<String>,
    pub images: Option<Vec<ImageEntry>>,
    pub seed: Option<i64>,
    pub prompt: Option<String>,
}

pub fn normalize_kie(kind: RequestKind, outcome: KieOutcome, task_id: &str) -> NormalizedResult {
    tracing::debug!("Normalizing Kie response for task {}", task_id);
    let decoded = ResultPayload::decode(outcome.result_json.as_deref(), task_id).into_decoded();

    let output = if kind.is_video() {
        let video = decoded.and_then(|d| d.video_url).map(|url| VideoOutput {
            url,
            content_type: Some(KIE_VIDEO_CONTENT_TYPE.to_string()),
        });
        GenerationOutput::Video { video }
    } else {
        let mut images = decoded
            .and_then(|d| d.result_urls)
            .map(|entries| collect_images(entries, Some(KIE_IMAGE_CONTENT_TYPE)))
            .unwrap_or_default();
        if images.is_empty() {
            if let Some(entries) = outcome.images {
                images = collect_images(entries, Some(KIE_IMAGE_CONTENT_TYPE));
            }
        }
        GenerationOutput::Images { images }
    };

    NormalizedResult {
        output,
        seed: outcome.seed,
        prompt: outcome.prompt,
        request_id: task_id.to_string(),
    }
}

#[derive(Debug, Default, Deserialize)]
struct FalOutput {
    #[serde(default)]
    images: Option<Vec<ImageEntry>>,
    #[serde(default)]
    video: Option<FalVideo>,
    #[serde(default, deserialize_with = "lenient_seed")]
    seed: Option<i64>,
    #[serde(default)]
    prompt: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum FalVideo {
    Object {
        url: String,
        #[serde(default)]
        content_type: Option<String>,
    },
    Url(String),
}

pub fn normalize_fal(kind: RequestKind, body: &str, request_id: &str) -> NormalizedResult {
    let output: FalOutput = serde_json::from_str(body).unwrap_or_else(|e| {
        let warning = NormalizationWarning {
            request_id: request_id.to_string(),
            reason: e.to_string(),
        };
        tracing::warn!("Failed to parse fal.ai result: {}", warning);
        FalOutput::default()
    });

    let generation = if kind.is_video() {
        let video = output.video.map(|video| match video {
            FalVideo::Object { url, content_type } => VideoOutput { url, content_type },
            FalVideo::Url(url) => VideoOutput {
                url,
                content_type: None,
            },
        });
        GenerationOutput::Video { video }
    } else {
        GenerationOutput::Images {
            images: collect_images(output.images.unwrap_or_default(), None),
        }
    };

    NormalizedResult {
        output: generation,
        seed: output.seed,
        prompt: output.prompt,
        request_id: request_id.to_string(),
    }
}
