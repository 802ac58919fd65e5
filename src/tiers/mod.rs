use async_trait::async_trait;
use serde::Serialize;
use std::fmt;

pub mod downloader;
pub mod primary;
pub mod scraped;
pub mod speech;

pub use downloader::MediaDownloaderCaptionsTier;
pub use primary::PrimaryCaptionsTier;
pub use scraped::ScrapedTimedTextTier;
pub use speech::SpeechToTextTier;

use crate::credentials::Credentials;
use crate::error::TierFailure;
use crate::transcribe::TranscriptRequest;

/// Identity of the tier that produced a transcript
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TierName {
    Primary,
    ScrapedTimedtext,
    MediaDownloader,
    SpeechToText,
}

impl TierName {
    pub fn as_str(&self) -> &'static str {
        match self {
            TierName::Primary => "primary",
            TierName::ScrapedTimedtext => "scraped_timedtext",
            TierName::MediaDownloader => "media_downloader",
            TierName::SpeechToText => "speech_to_text",
        }
    }
}

impl fmt::Display for TierName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One acquisition strategy in the fallback chain
#[async_trait]
pub trait TranscriptTier: Send + Sync {
    fn name(&self) -> TierName;

    /// Produce plain transcript text, or say why not
    async fn fetch(
        &self,
        request: &TranscriptRequest,
        credentials: &Credentials,
    ) -> Result<String, TierFailure>;
}
