use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::transcribe::DEFAULT_LANG;

#[derive(Parser)]
#[command(
    name = "transcript",
    about = "Fetch video transcripts through captions, scraped timed-text, yt-dlp subtitles and speech-to-text",
    version,
    long_about = "Fetches the transcript of a video as plain text. Tries the captions API first, then the scraped timed-text endpoint, then subtitles downloaded with yt-dlp, and finally speech-to-text on the downloaded audio. Successful transcripts are cached for the life of the process."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable progress indicators
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub log_json: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Fetch transcripts for one or more videos
    Fetch {
        /// Video IDs or video URLs (youtube.com, youtu.be, shorts, embed)
        #[arg(value_name = "VIDEO_OR_URL", required = true)]
        videos: Vec<String>,

        /// Transcript language code
        #[arg(short, long, value_name = "LANG", default_value = DEFAULT_LANG)]
        lang: String,

        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,

        /// Output file path (prints to console if not specified)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        /// Skip the speech-to-text fallback for this run
        #[arg(long)]
        no_asr: bool,
    },

    /// Show or initialise the configuration file
    Config {
        /// Show current configuration
        #[arg(short, long)]
        show: bool,

        /// Write a configuration file with default values
        #[arg(long, conflicts_with = "show")]
        init: bool,
    },

    /// Check that external tools are available
    Check,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    /// Plain transcript text
    Text,
    /// JSON objects with transcript and metadata
    Json,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}
