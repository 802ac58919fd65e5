use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use url::Url;

pub mod client;

pub use client::CaptionsClient;

use crate::error::TierFailure;

/// Where caption listings and timed-text payloads come from
#[async_trait]
pub trait CaptionSource: Send + Sync {
    /// Tracks listed by the player endpoint
    async fn list_player_tracks(
        &self,
        video_id: &str,
        cookie_header: Option<&str>,
    ) -> Result<Vec<CaptionTrack>, TierFailure>;

    /// Tracks scraped from the watch page
    async fn list_watch_page_tracks(
        &self,
        video_id: &str,
        cookie_header: Option<&str>,
    ) -> Result<Vec<CaptionTrack>, TierFailure>;

    /// Download a timed-text document
    async fn fetch_timed_text(
        &self,
        url: &Url,
        cookie_header: Option<&str>,
    ) -> Result<String, TierFailure>;
}

/// One caption track offered for a video
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptionTrack {
    /// Language code as reported upstream ("en", "pt-BR", ...)
    pub language_code: String,

    /// Auto-generated (ASR) rather than authored
    pub is_generated: bool,

    /// Timed-text URL for this track
    pub source_url: String,

    /// Upstream can translate this track server-side
    pub is_translatable: bool,
}

/// Track entry as it appears in the player response and the watch page
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RawCaptionTrack {
    base_url: String,
    language_code: String,
    #[serde(default)]
    kind: Option<String>,
    #[serde(default)]
    is_translatable: bool,
}

impl From<RawCaptionTrack> for CaptionTrack {
    fn from(raw: RawCaptionTrack) -> Self {
        Self {
            language_code: raw.language_code,
            is_generated: raw.kind.as_deref() == Some("asr"),
            source_url: raw.base_url,
            is_translatable: raw.is_translatable,
        }
    }
}

/// Pick the track to fetch for `lang`.
///
/// Exact language match first (authored before generated), then the first
/// generated track, then whatever is listed first.
pub fn select_track<'a>(tracks: &'a [CaptionTrack], lang: &str) -> Option<&'a CaptionTrack> {
    tracks
        .iter()
        .find(|t| t.language_code == lang && !t.is_generated)
        .or_else(|| tracks.iter().find(|t| t.language_code == lang))
        .or_else(|| tracks.iter().find(|t| t.is_generated))
        .or_else(|| tracks.first())
}

/// Build the fetch URL for a track, requesting server-side translation when
/// the track's language differs from `lang`.
///
/// With `strip_format` the `fmt` parameter is dropped so upstream answers in
/// classic timed-text.
pub fn timed_text_url(
    track: &CaptionTrack,
    lang: &str,
    strip_format: bool,
) -> Result<Url, TierFailure> {
    let mut url = Url::parse(&track.source_url).map_err(|e| {
        TierFailure::upstream(format!("Invalid caption URL {}: {}", track.source_url, e))
    })?;

    let retained: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(k, _)| k != "tlang" && !(strip_format && k == "fmt"))
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    {
        let mut query = url.query_pairs_mut();
        query.clear();
        query.extend_pairs(retained);
        if track.language_code != lang {
            query.append_pair("tlang", lang);
        }
    }

    if url.query() == Some("") {
        url.set_query(None);
    }

    Ok(url)
}
