//! Video Transcript - fetch the transcript of a video through a tiered fallback chain
//!
//! The chain tries the captions API, the scraped timed-text endpoint, subtitles
//! downloaded with yt-dlp and finally speech-to-text on the downloaded audio.
//! Results are cached in memory with a TTL.

pub mod cache;
pub mod captions;
pub mod cli;
pub mod config;
pub mod credentials;
pub mod error;
pub mod output;
pub mod parsers;
pub mod speech;
pub mod tiers;
pub mod transcribe;
pub mod utils;
pub mod ytdlp;

pub use cache::{CachedTranscript, TranscriptCache};
pub use cli::{Cli, Commands, OutputFormat};
pub use config::Config;
pub use error::{classify, ClassifiedError, ErrorKind, TierFailure};
pub use tiers::{TierName, TranscriptTier};
pub use transcribe::{RetryPolicy, TranscriptPipeline, TranscriptRequest, TranscriptResult};

/// Result type used throughout the binary and configuration code
pub type Result<T> = anyhow::Result<T>;
