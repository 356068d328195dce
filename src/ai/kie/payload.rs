//! Maps generation requests onto Kie AI model inputs.

use super::types::CreateTaskRequest;
use crate::ai::truncate_chars;
use crate::models::{
    GenerationRequest, ModelOptions, NanoBananaOptions, QwenOptions, SeedreamOptions, VeoOptions,
};
use serde_json::{json, Map, Value};

pub const SEEDREAM_MODEL: &str = "seedream/4.5-text-to-image";
pub const NANO_BANANA_MODEL: &str = "nano-banana-pro";
pub const VEO_MODEL: &str = "veo3_fast";
pub const QWEN_MODEL: &str = "qwen/image-to-image";

pub const SEEDREAM_PROMPT_LIMIT: usize = 3000;
pub const QWEN_PROMPT_LIMIT: usize = 5000;
pub const QWEN_NEGATIVE_PROMPT_LIMIT: usize = 500;
pub const NANO_BANANA_PROMPT_LIMIT: usize = 20000;
pub const NANO_BANANA_MAX_IMAGES: usize = 8;
pub const VEO_MAX_IMAGES: usize = 3;

/// Kie has no `image_size`; each preset becomes an aspect ratio and quality.
pub fn size_preset(image_size: &str) -> (&'static str, &'static str) {
    match image_size {
        "square" => ("1:1", "basic"),
        "portrait_4_3" => ("3:4", "basic"),
        "portrait_16_9" => ("9:16", "basic"),
        "landscape_4_3" => ("4:3", "basic"),
        "landscape_16_9" => ("16:9", "basic"),
        "auto_2K" => ("16:9", "basic"),
        "auto_4K" => ("16:9", "high"),
        _ => ("1:1", "high"),
    }
}

/// Veo generation mode chosen from how many frames were supplied.
pub fn veo_generation_type(image_count: usize) -> &'static str {
    match image_count {
        0 => "TEXT_2_VIDEO",
        1 | 2 => "FIRST_AND_LAST_FRAMES_2_VIDEO",
        _ => "REFERENCE_2_VIDEO",
    }
}

pub fn build_task(request: &GenerationRequest) -> CreateTaskRequest {
    let urls = &request.reference_image_urls;
    match &request.options {
        ModelOptions::Seedream(options) => seedream(&request.prompt, urls, options),
        ModelOptions::NanoBanana(options) => nano_banana(&request.prompt, urls, options),
        ModelOptions::Veo(options) => veo(&request.prompt, urls, options),
        ModelOptions::Qwen(options) => qwen(&request.prompt, urls, options),
    }
}

fn task(model: &str, input: Value) -> CreateTaskRequest {
    let input = match input {
        Value::Object(map) => map,
        _ => Map::new(),
    };
    CreateTaskRequest {
        model: model.to_string(),
        input,
    }
}

fn seedream(prompt: &str, urls: &[String], options: &SeedreamOptions) -> CreateTaskRequest {
    let (aspect_ratio, quality) = size_preset(&options.image_size);
    task(
        SEEDREAM_MODEL,
        json!({
            "prompt": truncate_chars(prompt, SEEDREAM_PROMPT_LIMIT),
            "aspect_ratio": aspect_ratio,
            "quality": quality,
            "image_urls": urls,
        }),
    )
}

fn nano_banana(prompt: &str, urls: &[String], options: &NanoBananaOptions) -> CreateTaskRequest {
    let mut request = task(
        NANO_BANANA_MODEL,
        json!({
            "prompt": truncate_chars(prompt, NANO_BANANA_PROMPT_LIMIT),
            "aspect_ratio": options.aspect_ratio,
            "resolution": options.resolution.to_uppercase(),
            "output_format": options.output_format.to_lowercase(),
        }),
    );
    if !urls.is_empty() {
        let capped: Vec<&String> = urls.iter().take(NANO_BANANA_MAX_IMAGES).collect();
        request.input.insert("image_input".to_string(), json!(capped));
    }
    request
}

fn veo(prompt: &str, urls: &[String], options: &VeoOptions) -> CreateTaskRequest {
    let mut request = task(
        VEO_MODEL,
        json!({
            "prompt": prompt,
            "aspect_ratio": options.aspect_ratio,
            "generationType": veo_generation_type(urls.len()),
            "enableTranslation": true,
        }),
    );
    if !urls.is_empty() {
        let capped: Vec<&String> = urls.iter().take(VEO_MAX_IMAGES).collect();
        request.input.insert("imageUrls".to_string(), json!(capped));
    }
    request
}

fn qwen(prompt: &str, urls: &[String], options: &QwenOptions) -> CreateTaskRequest {
    let mut request = task(
        QWEN_MODEL,
        json!({
            "prompt": truncate_chars(prompt, QWEN_PROMPT_LIMIT),
            "image_url": urls.first(),
            "strength": options.strength,
            "output_format": options.output_format.to_lowercase(),
            "acceleration": options.acceleration,
            "negative_prompt": truncate_chars(&options.negative_prompt, QWEN_NEGATIVE_PROMPT_LIMIT),
            "num_inference_steps": options.num_inference_steps,
            "guidance_scale": options.guidance_scale,
            "enable_safety_checker": options.enable_safety_checker,
        }),
    );
    if let Some(seed) = options.seed {
        request.input.insert("seed".to_string(), json!(seed));
    }
    request
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn urls(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("https://img/{i}.png")).collect()
    }

    fn prompt_of(request: &CreateTaskRequest) -> &str {
        request.input["prompt"].as_str().unwrap()
    }

    #[test]
    fn test_prompts_truncate_to_model_limits() {
        let long = "x".repeat(60_000);

        let seedream = build_task(&GenerationRequest::seedream_edit(
            &long,
            urls(1),
            SeedreamOptions::default(),
        ));
        assert_eq!(prompt_of(&seedream).chars().count(), SEEDREAM_PROMPT_LIMIT);

        let qwen = build_task(&GenerationRequest::qwen(
            &long,
            "https://img/q.png".to_string(),
            QwenOptions::default(),
        ));
        assert_eq!(prompt_of(&qwen).chars().count(), QWEN_PROMPT_LIMIT);

        let nano = build_task(&GenerationRequest::nano_banana(
            &long,
            urls(0),
            NanoBananaOptions::default(),
        ));
        assert_eq!(prompt_of(&nano).chars().count(), NANO_BANANA_PROMPT_LIMIT);

        let veo = build_task(&GenerationRequest::veo(&long, urls(0), VeoOptions::default()));
        assert_eq!(prompt_of(&veo).chars().count(), 60_000);
    }

    #[test]
    fn test_short_prompt_is_untouched() {
        let request = build_task(&GenerationRequest::seedream_edit(
            "make it blue",
            urls(1),
            SeedreamOptions::default(),
        ));
        assert_eq!(prompt_of(&request), "make it blue");
    }

    #[test]
    fn test_seedream_maps_size_preset() {
        let request = build_task(&GenerationRequest::seedream_edit(
            "p",
            urls(2),
            SeedreamOptions {
                image_size: "portrait_16_9".to_string(),
                enable_safety_checker: true,
            },
        ));

        assert_eq!(request.model, SEEDREAM_MODEL);
        assert_eq!(request.input["aspect_ratio"], "9:16");
        assert_eq!(request.input["quality"], "basic");
        assert_eq!(request.input["image_urls"].as_array().unwrap().len(), 2);
        assert_eq!(size_preset("unknown"), ("1:1", "high"));
        assert_eq!(size_preset("auto_4K"), ("16:9", "high"));
    }

    #[test]
    fn test_nano_banana_caps_images_and_normalizes_case() {
        let request = build_task(&GenerationRequest::nano_banana(
            "p",
            urls(11),
            NanoBananaOptions {
                resolution: "2k".to_string(),
                output_format: "PNG".to_string(),
                ..NanoBananaOptions::default()
            },
        ));

        assert_eq!(request.input["resolution"], "2K");
        assert_eq!(request.input["output_format"], "png");
        let images = request.input["image_input"].as_array().unwrap();
        assert_eq!(images.len(), NANO_BANANA_MAX_IMAGES);
        assert_eq!(images[7], "https://img/7.png");
    }

    #[test]
    fn test_nano_banana_omits_image_input_when_empty() {
        let request = build_task(&GenerationRequest::nano_banana(
            "p",
            vec![],
            NanoBananaOptions::default(),
        ));
        assert!(!request.input.contains_key("image_input"));
    }

    #[test]
    fn test_veo_generation_type_and_image_cap() {
        assert_eq!(veo_generation_type(0), "TEXT_2_VIDEO");
        assert_eq!(veo_generation_type(2), "FIRST_AND_LAST_FRAMES_2_VIDEO");
        assert_eq!(veo_generation_type(5), "REFERENCE_2_VIDEO");

        let request = build_task(&GenerationRequest::veo("p", urls(5), VeoOptions::default()));
        assert_eq!(request.model, VEO_MODEL);
        assert_eq!(request.input["generationType"], "REFERENCE_2_VIDEO");
        assert_eq!(request.input["enableTranslation"], true);
        assert_eq!(request.input["imageUrls"].as_array().unwrap().len(), VEO_MAX_IMAGES);
    }

    #[test]
    fn test_qwen_seed_only_when_set() {
        let without = build_task(&GenerationRequest::qwen(
            "p",
            "https://img/q.png".to_string(),
            QwenOptions::default(),
        ));
        assert!(!without.input.contains_key("seed"));
        assert_eq!(without.input["image_url"], "https://img/q.png");
        assert_eq!(without.input["negative_prompt"], "blurry, ugly");

        let with = build_task(&GenerationRequest::qwen(
            "p",
            "https://img/q.png".to_string(),
            QwenOptions {
                seed: Some(1234),
                negative_prompt: "n".repeat(900),
                ..QwenOptions::default()
            },
        ));
        assert_eq!(with.input["seed"], 1234);
        assert_eq!(
            with.input["negative_prompt"].as_str().unwrap().len(),
            QWEN_NEGATIVE_PROMPT_LIMIT
        );
    }
}
