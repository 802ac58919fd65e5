use async_trait::async_trait;
use std::sync::Arc;
use tempfile::TempDir;

use super::{TierName, TranscriptTier};
use crate::credentials::Credentials;
use crate::error::TierFailure;
use crate::speech::SpeechToText;
use crate::transcribe::TranscriptRequest;
use crate::ytdlp::{find_downloaded_file, MediaDownloader};

/// Longest `lang` still passed on as a language hint
const MAX_HINT_CHARS: usize = 5;

/// Last resort: download the audio and run it through speech-to-text
pub struct SpeechToTextTier {
    downloader: Arc<dyn MediaDownloader>,
    recognizer: Arc<dyn SpeechToText>,
}

impl SpeechToTextTier {
    pub fn new(downloader: Arc<dyn MediaDownloader>, recognizer: Arc<dyn SpeechToText>) -> Self {
        Self {
            downloader,
            recognizer,
        }
    }
}

/// Only short values look like language codes; anything longer is a
/// description and would confuse the recogniser
pub fn language_hint(lang: &str) -> Option<&str> {
    let count = lang.chars().count();
    (count > 0 && count <= MAX_HINT_CHARS).then_some(lang)
}

#[async_trait]
impl TranscriptTier for SpeechToTextTier {
    fn name(&self) -> TierName {
        TierName::SpeechToText
    }

    async fn fetch(
        &self,
        request: &TranscriptRequest,
        credentials: &Credentials,
    ) -> Result<String, TierFailure> {
        // Removed when this scope ends, whichever way it ends
        let dir = TempDir::new()?;

        self.downloader
            .download_audio(&request.video_id, dir.path(), credentials.cookie_file())
            .await?;

        let audio = find_downloaded_file(dir.path())?.ok_or_else(|| {
            TierFailure::upstream(format!("No audio was downloaded for video {}", request.video_id))
        })?;

        let text = self
            .recognizer
            .transcribe(&audio, language_hint(&request.lang))
            .await?;

        let text = text.trim();
        if text.is_empty() {
            return Err(TierFailure::upstream(format!(
                "Speech-to-text returned an empty transcript for video {}",
                request.video_id
            )));
        }

        Ok(text.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::{Path, PathBuf};
    use std::sync::Mutex;

    struct FakeAudioDownloader {
        dir: Mutex<Option<PathBuf>>,
    }

    #[async_trait]
    impl MediaDownloader for FakeAudioDownloader {
        async fn download_subtitles(&self, _: &str, _: &str, _: &Path, _: Option<&Path>) -> anyhow::Result<()> {
            anyhow::bail!("not used")
        }

        async fn download_audio(&self, video_id: &str, dir: &Path, _: Option<&Path>) -> anyhow::Result<()> {
            *self.dir.lock().unwrap() = Some(dir.to_path_buf());
            fs_err::write(dir.join(format!("{}.m4a", video_id)), b"fake audio")?;
            Ok(())
        }
    }

    struct FakeRecognizer {
        reply: String,
        hints: Mutex<Vec<Option<String>>>,
    }

    #[async_trait]
    impl SpeechToText for FakeRecognizer {
        async fn transcribe(&self, audio: &Path, language: Option<&str>) -> anyhow::Result<String> {
            assert!(audio.exists());
            self.hints.lock().unwrap().push(language.map(str::to_string));
            Ok(self.reply.clone())
        }
    }

    fn tier(reply: &str) -> (SpeechToTextTier, Arc<FakeAudioDownloader>, Arc<FakeRecognizer>) {
        let downloader = Arc::new(FakeAudioDownloader { dir: Mutex::new(None) });
        let recognizer = Arc::new(FakeRecognizer {
            reply: reply.to_string(),
            hints: Mutex::new(Vec::new()),
        });
        (
            SpeechToTextTier::new(downloader.clone(), recognizer.clone()),
            downloader,
            recognizer,
        )
    }

    #[test]
    fn test_language_hint() {
        assert_eq!(language_hint("en"), Some("en"));
        assert_eq!(language_hint("pt-BR"), Some("pt-BR"));
        assert_eq!(language_hint("english"), None);
        assert_eq!(language_hint(""), None);
    }

    #[tokio::test]
    async fn test_transcribes_and_cleans_up() {
        let (tier, downloader, recognizer) = tier("  spoken words \n");
        let request = TranscriptRequest::new("abc", Some("en")).unwrap();

        let text = tier.fetch(&request, &Credentials::none()).await.unwrap();

        assert_eq!(text, "spoken words");
        assert_eq!(*recognizer.hints.lock().unwrap(), vec![Some("en".to_string())]);
        let dir = downloader.dir.lock().unwrap().clone().unwrap();
        assert!(!dir.exists());
    }

    #[tokio::test]
    async fn test_long_lang_sent_without_hint() {
        let (tier, _, recognizer) = tier("words");
        let request = TranscriptRequest::new("abc", Some("english")).unwrap();

        tier.fetch(&request, &Credentials::none()).await.unwrap();

        assert_eq!(*recognizer.hints.lock().unwrap(), vec![None]);
    }

    #[tokio::test]
    async fn test_empty_transcript_is_failure() {
        let (tier, downloader, _) = tier("   ");
        let request = TranscriptRequest::new("abc", None).unwrap();

        let err = tier.fetch(&request, &Credentials::none()).await.unwrap_err();

        assert!(matches!(err, TierFailure::Upstream(ref m) if m.contains("empty transcript")));
        let dir = downloader.dir.lock().unwrap().clone().unwrap();
        assert!(!dir.exists());
    }
}
