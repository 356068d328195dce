//! Maps generation requests onto fal.ai endpoint inputs.

use crate::models::{GenerationRequest, ModelOptions};
use crate::{Error, Result};
use serde::Serialize;

pub const SEEDREAM_ENDPOINT: &str = "fal-ai/bytedance/seedream/v4.5/edit";
pub const NANO_BANANA_ENDPOINT: &str = "fal-ai/nano-banana-pro/edit";
pub const VEO_ENDPOINT: &str = "fal-ai/veo3.1/reference-to-video";

#[derive(Debug, Serialize, PartialEq)]
#[serde(untagged)]
pub enum FalInput<'a> {
    Seedream {
        prompt: &'a str,
        image_urls: &'a [String],
        enable_safety_checker: bool,
        image_size: &'a str,
    },
    NanoBanana {
        prompt: &'a str,
        image_urls: &'a [String],
        num_images: u32,
        aspect_ratio: &'a str,
        resolution: &'a str,
        output_format: &'a str,
        enable_web_search: bool,
    },
    Veo {
        prompt: &'a str,
        image_urls: &'a [String],
        aspect_ratio: &'a str,
        duration: &'a str,
        resolution: &'a str,
        generate_audio: bool,
        auto_fix: bool,
    },
}

/// Returns the queue endpoint and input body for `request`.
pub fn build_input(request: &GenerationRequest) -> Result<(&'static str, FalInput<'_>)> {
    let prompt = request.prompt.as_str();
    let image_urls = request.reference_image_urls.as_slice();

    match &request.options {
        ModelOptions::Seedream(options) => Ok((
            SEEDREAM_ENDPOINT,
            FalInput::Seedream {
                prompt,
                image_urls,
                enable_safety_checker: options.enable_safety_checker,
                image_size: &options.image_size,
            },
        )),
        ModelOptions::NanoBanana(options) => Ok((
            NANO_BANANA_ENDPOINT,
            FalInput::NanoBanana {
                prompt,
                image_urls,
                num_images: options.num_images,
                aspect_ratio: &options.aspect_ratio,
                resolution: &options.resolution,
                output_format: &options.output_format,
                enable_web_search: options.enable_web_search,
            },
        )),
        ModelOptions::Veo(options) => Ok((
            VEO_ENDPOINT,
            FalInput::Veo {
                prompt,
                image_urls,
                aspect_ratio: &options.aspect_ratio,
                duration: &options.duration,
                resolution: &options.resolution,
                generate_audio: options.generate_audio,
                auto_fix: options.auto_fix,
            },
        )),
        ModelOptions::Qwen(_) => Err(Error::InvalidRequest(
            "Qwen image-to-image is only available through Kie AI".to_string(),
        )),
    }
}
