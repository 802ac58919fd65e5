use async_trait::async_trait;
use std::sync::Arc;

use super::{TierName, TranscriptTier};
use crate::captions::{select_track, timed_text_url, CaptionSource};
use crate::credentials::Credentials;
use crate::error::TierFailure;
use crate::parsers::parse_timed_text;
use crate::transcribe::TranscriptRequest;

/// Caption table scraped from the watch page, fetched as raw timed-text
pub struct ScrapedTimedTextTier {
    source: Arc<dyn CaptionSource>,
}

impl ScrapedTimedTextTier {
    pub fn new(source: Arc<dyn CaptionSource>) -> Self {
        Self { source }
    }
}

#[async_trait]
impl TranscriptTier for ScrapedTimedTextTier {
    fn name(&self) -> TierName {
        TierName::ScrapedTimedtext
    }

    async fn fetch(
        &self,
        request: &TranscriptRequest,
        credentials: &Credentials,
    ) -> Result<String, TierFailure> {
        let cookie = credentials.cookie_header();
        let tracks = self
            .source
            .list_watch_page_tracks(&request.video_id, cookie)
            .await?;

        let track = select_track(&tracks, &request.lang)
            .ok_or_else(|| TierFailure::not_available(&request.video_id, &request.lang))?;

        let url = timed_text_url(track, &request.lang, false)?;
        let xml = self.source.fetch_timed_text(&url, cookie).await?;

        Ok(parse_timed_text(&xml)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::captions::CaptionTrack;
    use std::sync::Mutex;
    use url::Url;

    struct FakeWatchPage {
        tracks: Vec<CaptionTrack>,
        body: String,
        fetched: Mutex<Vec<(Url, Option<String>)>>,
    }

    #[async_trait]
    impl CaptionSource for FakeWatchPage {
        async fn list_player_tracks(&self, _: &str, _: Option<&str>) -> Result<Vec<CaptionTrack>, TierFailure> {
            Err(TierFailure::upstream("not used"))
        }

        async fn list_watch_page_tracks(&self, _: &str, _: Option<&str>) -> Result<Vec<CaptionTrack>, TierFailure> {
            Ok(self.tracks.clone())
        }

        async fn fetch_timed_text(&self, url: &Url, cookie: Option<&str>) -> Result<String, TierFailure> {
            self.fetched
                .lock()
                .unwrap()
                .push((url.clone(), cookie.map(str::to_string)));
            Ok(self.body.clone())
        }
    }

    fn source(tracks: Vec<CaptionTrack>, body: &str) -> Arc<FakeWatchPage> {
        Arc::new(FakeWatchPage {
            tracks,
            body: body.to_string(),
            fetched: Mutex::new(Vec::new()),
        })
    }

    fn generated(lang: &str) -> CaptionTrack {
        CaptionTrack {
            language_code: lang.to_string(),
            is_generated: true,
            source_url: format!("https://www.youtube.com/api/timedtext?v=abc&lang={}&fmt=json3", lang),
            is_translatable: false,
        }
    }

    #[tokio::test]
    async fn test_translates_and_keeps_format() {
        let source = source(
            vec![generated("es")],
            r#"<transcript><text start="0">hola &amp;amp; adi&amp;#243;s</text></transcript>"#,
        );
        let tier = ScrapedTimedTextTier::new(source.clone());
        let request = TranscriptRequest::new("abc", Some("en")).unwrap();

        let text = tier.fetch(&request, &Credentials::none()).await.unwrap();

        assert_eq!(text, "hola & adiós");
        let fetched = source.fetched.lock().unwrap();
        let url = &fetched[0].0;
        assert!(url.query_pairs().any(|(k, v)| k == "tlang" && v == "en"));
        assert!(url.query_pairs().any(|(k, v)| k == "fmt" && v == "json3"));
    }

    #[tokio::test]
    async fn test_no_tracks_is_not_available() {
        let source = source(Vec::new(), "");
        let tier = ScrapedTimedTextTier::new(source.clone());
        let request = TranscriptRequest::new("abc", Some("en")).unwrap();

        let err = tier.fetch(&request, &Credentials::none()).await.unwrap_err();

        assert!(matches!(err, TierFailure::NotAvailable(_)));
        assert!(source.fetched.lock().unwrap().is_empty());
    }
}
