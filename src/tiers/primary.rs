use async_trait::async_trait;
use std::sync::Arc;

use super::{TierName, TranscriptTier};
use crate::captions::{select_track, timed_text_url, CaptionSource};
use crate::credentials::Credentials;
use crate::error::TierFailure;
use crate::parsers::{parse_timed_text, ParseError};
use crate::transcribe::TranscriptRequest;

/// Captions listed by the player endpoint.
///
/// This is the only tier whose disabled / not-available answers are
/// definitive for the whole request.
pub struct PrimaryCaptionsTier {
    source: Arc<dyn CaptionSource>,
}

impl PrimaryCaptionsTier {
    pub fn new(source: Arc<dyn CaptionSource>) -> Self {
        Self { source }
    }
}

#[async_trait]
impl TranscriptTier for PrimaryCaptionsTier {
    fn name(&self) -> TierName {
        TierName::Primary
    }

    async fn fetch(
        &self,
        request: &TranscriptRequest,
        credentials: &Credentials,
    ) -> Result<String, TierFailure> {
        let cookie = credentials.cookie_header();
        let tracks = self.source.list_player_tracks(&request.video_id, cookie).await?;

        // Without an exact match this falls back to the first generated
        // track in listing order and asks upstream to translate it
        let track = select_track(&tracks, &request.lang)
            .ok_or_else(|| TierFailure::not_available(&request.video_id, &request.lang))?;

        if track.language_code != request.lang && !track.is_translatable {
            return Err(TierFailure::not_available(&request.video_id, &request.lang));
        }

        tracing::debug!(
            "Primary tier selected {} track ({}) for {}",
            track.language_code,
            if track.is_generated { "generated" } else { "authored" },
            request.video_id
        );

        let url = timed_text_url(track, &request.lang, true)?;
        let xml = self.source.fetch_timed_text(&url, cookie).await?;

        // A payload that is not timed-text (consent page, truncated body) says
        // nothing about whether captions exist, so it must not end the chain
        parse_timed_text(&xml).map_err(|err| match err {
            ParseError::Malformed(_) => TierFailure::upstream(err.to_string()),
            ParseError::Empty => err.into(),
        })
    }
}
