use anyhow::Result;
use clap::Parser;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use video_transcript::cli::{Cli, Commands, OutputFormat};
use video_transcript::config::Config;
use video_transcript::error::{ClassifiedError, ErrorKind};
use video_transcript::output::{self, ErrorResponse, FetchOutcome, TranscriptResponse};
use video_transcript::transcribe::{TranscriptPipeline, TranscriptRequest};
use video_transcript::utils;
use video_transcript::TranscriptCache;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_tracing(cli.verbose, cli.log_json);

    let config = Config::load().await?;
    let show_progress = !cli.quiet && console::Term::stderr().is_term();

    match cli.command {
        Commands::Fetch {
            videos,
            lang,
            format,
            output,
            no_asr,
        } => {
            let mut config = config;
            if no_asr {
                config.asr.enabled = false;
            }
            run_fetch(&config, &videos, &lang, format, output, show_progress).await?;
        }
        Commands::Config { show, init } => {
            if init {
                let path = Config::default().save().await?;
                println!("Configuration written to: {}", path.display());
            } else {
                config.display();
                if !show {
                    println!();
                    println!("Config file: {}", Config::config_path()?.display());
                }
            }
        }
        Commands::Check => {
            let missing = utils::check_dependencies(&config.downloader.yt_dlp_path).await;
            if config.asr.enabled && config.asr.api_key.is_none() {
                eprintln!(
                    "{} speech-to-text is enabled but OPENAI_API_KEY is not set",
                    style("warning:").yellow().bold()
                );
            }
            if !missing.is_empty() {
                eprintln!("{}", style("Missing dependencies:").red().bold());
                for dep in &missing {
                    eprintln!("   • {}", dep);
                }
                anyhow::bail!("{} required tool(s) not found", missing.len());
            }
            println!("{} all external tools are available", style("ok:").green().bold());
        }
    }

    Ok(())
}

/// Logs go to stderr so stdout carries only transcripts
fn init_tracing(verbose: bool, json: bool) {
    let default_filter = if verbose {
        "video_transcript=debug"
    } else {
        "video_transcript=info"
    };

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into()))
        .with(json.then(|| fmt::layer().json().with_writer(std::io::stderr)))
        .with((!json).then(|| fmt::layer().with_writer(std::io::stderr)))
        .init();
}

/// Turn one command-line input into a request; bad input is a missing parameter
fn parse_input(input: &str, lang: &str) -> std::result::Result<TranscriptRequest, ClassifiedError> {
    if input.trim().is_empty() {
        return Err(ClassifiedError::missing_parameter("video_id"));
    }

    let video_id = utils::extract_video_id(input)
        .map_err(|e| ClassifiedError::new(ErrorKind::MissingParameter, e.to_string()))?;

    TranscriptRequest::new(video_id, Some(lang))
}

async fn run_fetch(
    config: &Config,
    videos: &[String],
    lang: &str,
    format: OutputFormat,
    output_path: Option<PathBuf>,
    show_progress: bool,
) -> Result<()> {
    let requests: Vec<_> = videos
        .iter()
        .map(|input| (input.as_str(), parse_input(input, lang)))
        .collect();

    // Only build the chain when there is something to fetch
    let pipeline = if requests.iter().any(|(_, r)| r.is_ok()) {
        let missing = utils::check_dependencies(&config.downloader.yt_dlp_path).await;
        for dep in missing {
            tracing::warn!("Dependency not found: {} (continuing anyway)", dep);
        }

        let cache = Arc::new(TranscriptCache::new(config.cache_ttl()));
        Some(TranscriptPipeline::from_config(config, cache)?)
    } else {
        None
    };

    let mut outcomes = Vec::with_capacity(requests.len());

    for (input, parsed) in requests {
        let outcome = match (parsed, &pipeline) {
            (Ok(request), Some(pipeline)) => {
                let progress = show_progress.then(|| spinner(&request.video_id));
                let fetched = pipeline.fetch(&request).await;
                if let Some(progress) = progress {
                    progress.finish_and_clear();
                }

                match fetched {
                    Ok(result) => FetchOutcome::Success(TranscriptResponse::new(&request, result)),
                    Err(err) => FetchOutcome::Failure(ErrorResponse::new(Some(&request.video_id), &err)),
                }
            }
            (Ok(request), None) => FetchOutcome::Failure(ErrorResponse::new(
                Some(&request.video_id),
                &ClassifiedError::new(ErrorKind::Other, "Transcript pipeline is not available"),
            )),
            (Err(err), _) => FetchOutcome::Failure(ErrorResponse::new(Some(input.trim()), &err)),
        };
        outcomes.push(outcome);
    }

    if format == OutputFormat::Text {
        for outcome in &outcomes {
            if let FetchOutcome::Failure(failure) = outcome {
                eprintln!(
                    "{} {}{} ({})",
                    style("error:").red().bold(),
                    failure
                        .video_id
                        .as_deref()
                        .map(|id| format!("{}: ", id))
                        .unwrap_or_default(),
                    failure.error,
                    failure.code
                );
            }
        }
    }

    let content = output::render(&outcomes, format)?;
    match output_path {
        Some(path) => {
            output::save_to_file(&content, &path).await?;
            eprintln!("Transcript saved to: {}", path.display());
        }
        None => output::print_to_console(&content),
    }

    let failed = outcomes.iter().filter(|o| o.is_failure()).count();
    if failed > 0 {
        anyhow::bail!("{} of {} transcript(s) could not be fetched", failed, outcomes.len());
    }

    Ok(())
}

fn spinner(video_id: &str) -> ProgressBar {
    let progress = ProgressBar::new_spinner();
    progress.set_style(
        ProgressStyle::with_template("{spinner:.green} [{elapsed_precise}] {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    progress.set_message(format!("Fetching transcript for {}...", video_id));
    progress.enable_steady_tick(Duration::from_millis(100));
    progress
}
