use serde::Serialize;
use std::sync::Arc;
use tracing::Instrument;

use crate::cache::{CachedTranscript, TranscriptCache};
use crate::captions::{CaptionSource, CaptionsClient};
use crate::config::Config;
use crate::credentials::CredentialResolver;
use crate::error::{classify, ClassifiedError, ErrorKind};
use crate::speech::WhisperClient;
use crate::tiers::{
    MediaDownloaderCaptionsTier, PrimaryCaptionsTier, ScrapedTimedTextTier, SpeechToTextTier,
    TierName, TranscriptTier,
};
use crate::utils::client_safe_message;
use crate::ytdlp::{MediaDownloader, YtDlp};

pub mod retry;

pub use retry::RetryPolicy;

/// Language used when the caller does not ask for one
pub const DEFAULT_LANG: &str = "en";

/// A single "transcript of video V in language L" request
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TranscriptRequest {
    pub video_id: String,
    pub lang: String,
}

impl TranscriptRequest {
    pub fn new(video_id: impl Into<String>, lang: Option<&str>) -> Result<Self, ClassifiedError> {
        let video_id = video_id.into().trim().to_string();
        if video_id.is_empty() {
            return Err(ClassifiedError::missing_parameter("video_id"));
        }

        let lang = lang
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .unwrap_or(DEFAULT_LANG)
            .to_string();

        Ok(Self { video_id, lang })
    }

    pub fn cache_key(&self) -> String {
        TranscriptCache::key(&self.video_id, &self.lang)
    }
}

/// A transcript and where it came from
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TranscriptResult {
    pub text: String,
    pub tier: TierName,
    /// Served from the cache; `tier` is the tier that originally produced it
    pub cached: bool,
}

struct Stage {
    tier: Box<dyn TranscriptTier>,
    retry: Option<RetryPolicy>,
    /// Disabled / not-available failures from this stage end the chain
    definitive: bool,
}

/// Cache-fronted, ordered fallback chain of transcript tiers
pub struct TranscriptPipeline {
    stages: Vec<Stage>,
    cache: Arc<TranscriptCache>,
    credentials: Arc<CredentialResolver>,
}

impl TranscriptPipeline {
    /// An empty chain; add tiers with [`with_primary`](Self::with_primary)
    /// and [`with_fallback`](Self::with_fallback).
    pub fn new(cache: Arc<TranscriptCache>, credentials: Arc<CredentialResolver>) -> Self {
        Self {
            stages: Vec::new(),
            cache,
            credentials,
        }
    }

    /// Standard chain: primary captions, scraped timed-text, downloader
    /// subtitles, and speech-to-text when ASR fallback is enabled.
    pub fn from_config(config: &Config, cache: Arc<TranscriptCache>) -> anyhow::Result<Self> {
        let credentials = Arc::new(CredentialResolver::from_config(&config.credentials));
        let captions: Arc<dyn CaptionSource> = Arc::new(CaptionsClient::new(config.http_timeout())?);
        let downloader: Arc<dyn MediaDownloader> =
            Arc::new(YtDlp::new(config.downloader.yt_dlp_path.clone()));

        let mut pipeline = Self::new(cache, credentials)
            .with_primary(
                Box::new(PrimaryCaptionsTier::new(captions.clone())),
                config.retry_policy(),
            )
            .with_fallback(Box::new(ScrapedTimedTextTier::new(captions)))
            .with_fallback(Box::new(MediaDownloaderCaptionsTier::new(downloader.clone())));

        if config.asr.enabled {
            let recognizer = Arc::new(WhisperClient::new(
                config.asr.api_base.clone(),
                config.asr.api_key.clone(),
                config.asr.model.clone(),
            ));
            pipeline = pipeline.with_fallback(Box::new(SpeechToTextTier::new(downloader, recognizer)));
        } else {
            tracing::info!("Speech-to-text fallback is disabled");
        }

        Ok(pipeline)
    }

    /// Append a tier that is retried on rate limits and whose disabled /
    /// not-available answers are final.
    pub fn with_primary(mut self, tier: Box<dyn TranscriptTier>, retry: RetryPolicy) -> Self {
        self.stages.push(Stage {
            tier,
            retry: Some(retry),
            definitive: true,
        });
        self
    }

    /// Append a tier tried once, whose failures always fall through
    pub fn with_fallback(mut self, tier: Box<dyn TranscriptTier>) -> Self {
        self.stages.push(Stage {
            tier,
            retry: None,
            definitive: false,
        });
        self
    }

    pub fn tiers(&self) -> Vec<TierName> {
        self.stages.iter().map(|s| s.tier.name()).collect()
    }

    pub fn cache(&self) -> &TranscriptCache {
        &self.cache
    }

    /// Fetch a transcript, cache first, then each tier in order.
    ///
    /// The first tier to succeed wins and is cached. When every tier fails
    /// the last tier's error is returned.
    pub async fn fetch(&self, request: &TranscriptRequest) -> Result<TranscriptResult, ClassifiedError> {
        let key = request.cache_key();

        if let Some(hit) = self.cache.get(&key) {
            tracing::info!(video_id = %request.video_id, tier = %hit.tier, "Serving transcript from cache");
            return Ok(TranscriptResult {
                text: hit.text,
                tier: hit.tier,
                cached: true,
            });
        }

        let credentials = self.credentials.resolve();

        tracing::info!(
            "Fetching transcript for video: {}, language: {}",
            request.video_id,
            request.lang
        );

        let mut last_error: Option<ClassifiedError> = None;

        for stage in &self.stages {
            let name = stage.tier.name();
            tracing::debug!(video_id = %request.video_id, tier = %name, "Trying tier");

            let span = tracing::info_span!("tier", video_id = %request.video_id, tier = %name);
            let outcome = match &stage.retry {
                Some(policy) => {
                    policy
                        .run(move || stage.tier.fetch(request, credentials))
                        .instrument(span)
                        .await
                }
                None => stage
                    .tier
                    .fetch(request, credentials)
                    .instrument(span)
                    .await
                    .map_err(|failure| classify(&failure)),
            };

            match outcome {
                Ok(text) => {
                    tracing::info!(video_id = %request.video_id, tier = %name, "Transcript acquired");
                    self.cache.set(
                        key,
                        CachedTranscript {
                            text: text.clone(),
                            tier: name,
                        },
                    );
                    return Ok(TranscriptResult {
                        text,
                        tier: name,
                        cached: false,
                    });
                }
                Err(err) => {
                    tracing::warn!(
                        video_id = %request.video_id,
                        tier = %name,
                        kind = err.kind.code(),
                        "Tier failed: {}",
                        client_safe_message(&err.message)
                    );

                    if stage.definitive && err.kind.is_definitive() {
                        return Err(err);
                    }
                    last_error = Some(err);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| {
            ClassifiedError::new(ErrorKind::Other, "No transcript tiers are configured")
        }))
    }
}
