use async_trait::async_trait;
use serde_json::{json, Value};
use std::time::Duration;
use url::Url;

use super::{CaptionSource, CaptionTrack, RawCaptionTrack};
use crate::error::TierFailure;

const WATCH_URL: &str = "https://www.youtube.com/watch";
const PLAYER_URL: &str = "https://www.youtube.com/youtubei/v1/player?prettyPrint=false";
const PLAYER_CLIENT_NAME: &str = "ANDROID";
const PLAYER_CLIENT_VERSION: &str = "20.10.38";
const USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36";

/// HTTP access to caption listings and timed-text payloads
#[derive(Clone)]
pub struct CaptionsClient {
    http: reqwest::Client,
}

impl CaptionsClient {
    /// Every request made through this client is bounded by `timeout`.
    pub fn new(timeout: Duration) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self { http })
    }
}

#[async_trait]
impl CaptionSource for CaptionsClient {
    async fn list_player_tracks(
        &self,
        video_id: &str,
        cookie_header: Option<&str>,
    ) -> Result<Vec<CaptionTrack>, TierFailure> {
        tracing::debug!("Requesting player response for: {}", video_id);

        let body = json!({
            "context": {
                "client": {
                    "clientName": PLAYER_CLIENT_NAME,
                    "clientVersion": PLAYER_CLIENT_VERSION,
                    "hl": "en",
                }
            },
            "videoId": video_id,
        });

        let mut request = self.http.post(PLAYER_URL).json(&body);
        if let Some(cookie) = cookie_header {
            request = request.header(reqwest::header::COOKIE, cookie);
        }

        let response = request.send().await?.error_for_status()?;
        let player: Value = response.json().await?;

        parse_player_response(video_id, &player)
    }

    async fn list_watch_page_tracks(
        &self,
        video_id: &str,
        cookie_header: Option<&str>,
    ) -> Result<Vec<CaptionTrack>, TierFailure> {
        let mut url = Url::parse(WATCH_URL).map_err(|e| TierFailure::upstream(e.to_string()))?;
        url.query_pairs_mut().append_pair("v", video_id);

        tracing::debug!("Fetching watch page: {}", url);

        let mut request = self
            .http
            .get(url)
            .header(reqwest::header::ACCEPT_LANGUAGE, "en-US,en;q=0.8");
        if let Some(cookie) = cookie_header {
            request = request.header(reqwest::header::COOKIE, cookie);
        }

        let html = request.send().await?.error_for_status()?.text().await?;

        extract_watch_page_tracks(video_id, &html)
    }

    async fn fetch_timed_text(
        &self,
        url: &Url,
        cookie_header: Option<&str>,
    ) -> Result<String, TierFailure> {
        tracing::debug!("Fetching timed text: {}", url);

        let mut request = self.http.get(url.clone());
        if let Some(cookie) = cookie_header {
            request = request.header(reqwest::header::COOKIE, cookie);
        }

        let body = request.send().await?.error_for_status()?.text().await?;

        // An empty 200 means upstream refused to serve this client, not that
        // the track has no text
        if body.trim().is_empty() {
            return Err(TierFailure::upstream(
                "Timed-text endpoint returned an empty body",
            ));
        }

        Ok(body)
    }
}

/// Turn a player response into caption tracks.
///
/// A playable video without a caption block has subtitles disabled.
pub fn parse_player_response(
    video_id: &str,
    player: &Value,
) -> Result<Vec<CaptionTrack>, TierFailure> {
    let status = player["playabilityStatus"]["status"]
        .as_str()
        .unwrap_or("OK");

    if status != "OK" {
        let reason = player["playabilityStatus"]["reason"]
            .as_str()
            .unwrap_or("no reason given");
        return Err(TierFailure::upstream(format!(
            "Video {} is not playable ({}): {}",
            video_id, status, reason
        )));
    }

    let tracks = &player["captions"]["playerCaptionsTracklistRenderer"]["captionTracks"];
    if tracks.is_null() {
        return Err(TierFailure::Disabled(video_id.to_string()));
    }

    let raw: Vec<RawCaptionTrack> = serde_json::from_value(tracks.clone()).map_err(|e| {
        TierFailure::upstream(format!("Unexpected caption track listing: {}", e))
    })?;

    if raw.is_empty() {
        return Err(TierFailure::Disabled(video_id.to_string()));
    }

    Ok(raw.into_iter().map(CaptionTrack::from).collect())
}

/// Pull the `"captionTracks"` array out of watch page HTML
pub fn extract_watch_page_tracks(
    video_id: &str,
    html: &str,
) -> Result<Vec<CaptionTrack>, TierFailure> {
    const MARKER: &str = "\"captionTracks\":";

    if html.contains("class=\"g-recaptcha\"") {
        return Err(TierFailure::upstream(format!(
            "Watch page for {} answered with a captcha",
            video_id
        )));
    }

    let Some(start) = html.find(MARKER) else {
        if html.contains("\"LOGIN_REQUIRED\"") {
            return Err(TierFailure::upstream(format!(
                "Watch page for {} is LOGIN_REQUIRED (sign in to confirm you're not a bot)",
                video_id
            )));
        }
        return Err(TierFailure::NotAvailable(format!(
            "No caption tracks on the watch page for video {}",
            video_id
        )));
    };

    // The array is followed by more page script; read exactly one JSON value
    let rest = &html[start + MARKER.len()..];
    let raw = serde_json::Deserializer::from_str(rest)
        .into_iter::<Vec<RawCaptionTrack>>()
        .next()
        .ok_or_else(|| TierFailure::upstream("Caption track listing was truncated"))?
        .map_err(|e| TierFailure::upstream(format!("Unexpected caption track listing: {}", e)))?;

    if raw.is_empty() {
        return Err(TierFailure::NotAvailable(format!(
            "No caption tracks on the watch page for video {}",
            video_id
        )));
    }

    Ok(raw.into_iter().map(CaptionTrack::from).collect())
}
