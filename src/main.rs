use anyhow::Result;
use clap::{Args, Parser, Subcommand, ValueEnum};
use seedream_adapter::app::{App, GenerateJob};
use seedream_adapter::models::{
    ModelOptions, NanoBananaOptions, ProviderKind, QwenOptions, SeedreamOptions, VeoOptions,
};
use std::path::PathBuf;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[command(name = "seedream-adapter")]
#[command(about = "Submit image and video generation jobs to fal.ai or Kie AI")]
struct CliArgs {
    /// Provider to use instead of GENERATION_PROVIDER (fal or kie).
    #[arg(long, global = true, value_parser = parse_provider_arg)]
    provider: Option<ProviderKind>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run a generation and print the normalized result as JSON.
    Generate(GenerateArgs),
    /// Upload local files and print their public URLs.
    Upload {
        #[arg(value_name = "FILE", required = true)]
        files: Vec<PathBuf>,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ModelArg {
    Seedream,
    NanoBanana,
    Veo,
    Qwen,
}

#[derive(Debug, Args)]
struct GenerateArgs {
    #[arg(long, value_enum, default_value = "seedream")]
    model: ModelArg,

    #[arg(long)]
    prompt: String,

    /// Reference image URL; repeatable.
    #[arg(long = "image-url", value_name = "URL")]
    image_urls: Vec<String>,

    /// Local reference image, uploaded before submission; repeatable.
    #[arg(long = "image-file", value_name = "PATH")]
    image_files: Vec<PathBuf>,

    #[arg(long)]
    image_size: Option<String>,

    #[arg(long)]
    aspect_ratio: Option<String>,

    #[arg(long)]
    resolution: Option<String>,

    #[arg(long)]
    output_format: Option<String>,

    #[arg(long)]
    num_images: Option<u32>,

    #[arg(long)]
    duration: Option<String>,

    #[arg(long)]
    no_audio: bool,

    #[arg(long)]
    seed: Option<i64>,

    #[arg(long)]
    negative_prompt: Option<String>,

    #[arg(long)]
    strength: Option<f64>,
}

impl GenerateArgs {
    fn model_options(&self) -> ModelOptions {
        match self.model {
            ModelArg::Seedream => {
                let mut options = SeedreamOptions::default();
                if let Some(size) = &self.image_size {
                    options.image_size = size.clone();
                }
                ModelOptions::Seedream(options)
            }
            ModelArg::NanoBanana => {
                let mut options = NanoBananaOptions::default();
                if let Some(n) = self.num_images {
                    options.num_images = n;
                }
                if let Some(ratio) = &self.aspect_ratio {
                    options.aspect_ratio = ratio.clone();
                }
                if let Some(resolution) = &self.resolution {
                    options.resolution = resolution.clone();
                }
                if let Some(format) = &self.output_format {
                    options.output_format = format.clone();
                }
                ModelOptions::NanoBanana(options)
            }
            ModelArg::Veo => {
                let mut options = VeoOptions::default();
                if let Some(ratio) = &self.aspect_ratio {
                    options.aspect_ratio = ratio.clone();
                }
                if let Some(duration) = &self.duration {
                    options.duration = duration.clone();
                }
                if let Some(resolution) = &self.resolution {
                    options.resolution = resolution.clone();
                }
                options.generate_audio = !self.no_audio;
                ModelOptions::Veo(options)
            }
            ModelArg::Qwen => {
                let mut options = QwenOptions {
                    seed: self.seed,
                    ..QwenOptions::default()
                };
                if let Some(strength) = self.strength {
                    options.strength = strength;
                }
                if let Some(negative) = &self.negative_prompt {
                    options.negative_prompt = negative.clone();
                }
                if let Some(format) = &self.output_format {
                    options.output_format = format.clone();
                }
                ModelOptions::Qwen(options)
            }
        }
    }
}

fn parse_provider_arg(input: &str) -> std::result::Result<ProviderKind, String> {
    input.parse().map_err(|e: seedream_adapter::Error| e.to_string())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "seedream_adapter=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = CliArgs::parse();

    let app = match App::new() {
        Ok(app) => app,
        Err(e) => {
            error!("Failed to initialize application: {}", e);
            std::process::exit(1);
        }
    };

    let output = match args.command {
        Command::Generate(generate) => {
            let options = generate.model_options();
            let job = GenerateJob {
                provider: args.provider,
                prompt: generate.prompt,
                image_urls: generate.image_urls,
                image_files: generate.image_files,
                options,
            };
            app.generate(job)
                .await
                .and_then(|result| Ok(serde_json::to_string_pretty(&result)?))
        }
        Command::Upload { files } => app
            .upload(args.provider, &files)
            .await
            .and_then(|urls| Ok(serde_json::to_string_pretty(&urls)?)),
    };

    match output {
        Ok(json) => {
            println!("{}", json);
            info!("Done");
            Ok(())
        }
        Err(e) => {
            error!("Generation failed: {}", e);
            std::process::exit(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_provider_arg() {
        assert_eq!(parse_provider_arg("kie").unwrap(), ProviderKind::Kie);
        assert_eq!(parse_provider_arg("fal.ai").unwrap(), ProviderKind::Fal);
        assert!(parse_provider_arg("replicate").unwrap_err().contains("Unknown provider"));
    }

    #[test]
    fn test_generate_args_map_to_model_options() {
        let args = CliArgs::parse_from([
            "seedream-adapter",
            "--provider",
            "kie",
            "generate",
            "--model",
            "veo",
            "--prompt",
            "a calm sea",
            "--no-audio",
            "--duration",
            "6s",
        ]);
        assert_eq!(args.provider, Some(ProviderKind::Kie));
        let Command::Generate(generate) = args.command else {
            panic!("expected generate");
        };
        match generate.model_options() {
            ModelOptions::Veo(options) => {
                assert!(!options.generate_audio);
                assert_eq!(options.duration, "6s");
                assert_eq!(options.aspect_ratio, "16:9");
            }
            other => panic!("unexpected options {:?}", other),
        }
    }
}
