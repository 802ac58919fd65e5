use async_trait::async_trait;
use std::sync::Arc;
use tempfile::TempDir;

use super::{TierName, TranscriptTier};
use crate::credentials::Credentials;
use crate::error::TierFailure;
use crate::parsers::parse_cue_text;
use crate::transcribe::TranscriptRequest;
use crate::ytdlp::{find_files_with_extension, MediaDownloader};

/// English fallbacks tried after the requested language
const FALLBACK_LANGUAGES: &[&str] = &["en", "en-US"];

/// Subtitles written by the media downloader, parsed as WebVTT
pub struct MediaDownloaderCaptionsTier {
    downloader: Arc<dyn MediaDownloader>,
}

impl MediaDownloaderCaptionsTier {
    pub fn new(downloader: Arc<dyn MediaDownloader>) -> Self {
        Self { downloader }
    }

    async fn try_language(
        &self,
        request: &TranscriptRequest,
        lang: &str,
        credentials: &Credentials,
    ) -> Result<String, TierFailure> {
        let dir = TempDir::new()?;

        self.downloader
            .download_subtitles(&request.video_id, lang, dir.path(), credentials.cookie_file())
            .await?;

        let files = find_files_with_extension(dir.path(), "vtt")?;
        let Some(first) = files.first() else {
            return Err(TierFailure::not_available(&request.video_id, lang));
        };

        let payload = fs_err::read_to_string(first)?;
        Ok(parse_cue_text(&payload)?)
    }
}

/// Requested language first, then the English fallbacks, skipping repeats
pub fn subtitle_languages(lang: &str) -> Vec<&str> {
    let mut langs = vec![lang];
    for fallback in FALLBACK_LANGUAGES {
        if !langs.contains(fallback) {
            langs.push(*fallback);
        }
    }
    langs
}

#[async_trait]
impl TranscriptTier for MediaDownloaderCaptionsTier {
    fn name(&self) -> TierName {
        TierName::MediaDownloader
    }

    async fn fetch(
        &self,
        request: &TranscriptRequest,
        credentials: &Credentials,
    ) -> Result<String, TierFailure> {
        let mut last_failure = TierFailure::not_available(&request.video_id, &request.lang);

        for lang in subtitle_languages(&request.lang) {
            match self.try_language(request, lang, credentials).await {
                Ok(text) => return Ok(text),
                Err(failure) => {
                    tracing::debug!(
                        "No downloader subtitles for {} in {}: {}",
                        request.video_id,
                        lang,
                        failure
                    );
                    last_failure = failure;
                }
            }
        }

        Err(last_failure)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::{Path, PathBuf};
    use std::sync::Mutex;

    /// Writes a VTT file only for the languages it knows
    struct FakeDownloader {
        available: Vec<(&'static str, &'static str)>,
        requested: Mutex<Vec<String>>,
        dirs: Mutex<Vec<PathBuf>>,
    }

    impl FakeDownloader {
        fn new(available: Vec<(&'static str, &'static str)>) -> Self {
            Self {
                available,
                requested: Mutex::new(Vec::new()),
                dirs: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl MediaDownloader for FakeDownloader {
        async fn download_subtitles(
            &self,
            video_id: &str,
            lang: &str,
            dir: &Path,
            _cookies: Option<&Path>,
        ) -> anyhow::Result<()> {
            self.requested.lock().unwrap().push(lang.to_string());
            self.dirs.lock().unwrap().push(dir.to_path_buf());

            if let Some((_, body)) = self.available.iter().find(|(l, _)| *l == lang) {
                fs_err::write(dir.join(format!("{}.{}.vtt", video_id, lang)), body)?;
            }
            Ok(())
        }

        async fn download_audio(&self, _: &str, _: &Path, _: Option<&Path>) -> anyhow::Result<()> {
            anyhow::bail!("not used")
        }
    }

    fn request(lang: &str) -> TranscriptRequest {
        TranscriptRequest::new("abc", Some(lang)).unwrap()
    }

    #[test]
    fn test_subtitle_languages_order() {
        assert_eq!(subtitle_languages("de"), vec!["de", "en", "en-US"]);
        assert_eq!(subtitle_languages("en"), vec!["en", "en-US"]);
        assert_eq!(subtitle_languages("en-US"), vec!["en-US", "en"]);
    }

    #[tokio::test]
    async fn test_falls_back_to_english() {
        let downloader = Arc::new(FakeDownloader::new(vec![(
            "en",
            "WEBVTT\n\n00:00:01.000 --> 00:00:02.000\nhello world\n",
        )]));
        let tier = MediaDownloaderCaptionsTier::new(downloader.clone());

        let text = tier.fetch(&request("de"), &Credentials::none()).await.unwrap();

        assert_eq!(text, "hello world");
        assert_eq!(*downloader.requested.lock().unwrap(), vec!["de", "en"]);
    }

    #[tokio::test]
    async fn test_nothing_found_is_not_available_and_cleaned_up() {
        let downloader = Arc::new(FakeDownloader::new(vec![]));
        let tier = MediaDownloaderCaptionsTier::new(downloader.clone());

        let err = tier.fetch(&request("de"), &Credentials::none()).await.unwrap_err();

        assert!(matches!(err, TierFailure::NotAvailable(_)));
        assert_eq!(downloader.requested.lock().unwrap().len(), 3);
        for dir in downloader.dirs.lock().unwrap().iter() {
            assert!(!dir.exists());
        }
    }
}
