use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::Path;

use crate::cli::OutputFormat;
use crate::error::ClassifiedError;
use crate::tiers::TierName;
use crate::transcribe::{TranscriptRequest, TranscriptResult};

/// Successful fetch, shaped like the service response body
#[derive(Debug, Clone, Serialize)]
pub struct TranscriptResponse {
    pub video_id: String,
    pub lang: String,
    pub transcript: String,
    pub tier: TierName,
    pub cached: bool,
    pub fetched_at: DateTime<Utc>,
}

/// Failed fetch; `status` is the HTTP status the failure maps to
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video_id: Option<String>,
    pub error: String,
    pub code: &'static str,
    pub status: u16,
}

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum FetchOutcome {
    Success(TranscriptResponse),
    Failure(ErrorResponse),
}

impl TranscriptResponse {
    pub fn new(request: &TranscriptRequest, result: TranscriptResult) -> Self {
        Self {
            video_id: request.video_id.clone(),
            lang: request.lang.clone(),
            transcript: result.text,
            tier: result.tier,
            cached: result.cached,
            fetched_at: Utc::now(),
        }
    }
}

impl ErrorResponse {
    pub fn new(video_id: Option<&str>, error: &ClassifiedError) -> Self {
        Self {
            video_id: video_id.filter(|id| !id.is_empty()).map(str::to_string),
            error: error.client_message(),
            code: error.kind.code(),
            status: error.kind.http_status(),
        }
    }
}

impl FetchOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, FetchOutcome::Failure(_))
    }
}

/// Render outcomes in the requested format.
///
/// Text output carries transcripts only; failures are reported separately
/// by the caller. JSON output is a single object for one video and an array
/// otherwise.
pub fn render(outcomes: &[FetchOutcome], format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Text => Ok(format_as_text(outcomes)),
        OutputFormat::Json => format_as_json(outcomes),
    }
}

pub fn format_as_text(outcomes: &[FetchOutcome]) -> String {
    let successes: Vec<&TranscriptResponse> = outcomes
        .iter()
        .filter_map(|outcome| match outcome {
            FetchOutcome::Success(response) => Some(response),
            FetchOutcome::Failure(_) => None,
        })
        .collect();

    if outcomes.len() == 1 {
        return successes
            .first()
            .map(|response| response.transcript.clone())
            .unwrap_or_default();
    }

    successes
        .iter()
        .map(|response| {
            format!(
                "# {} [{}, {}]\n{}\n",
                response.video_id, response.lang, response.tier, response.transcript
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn format_as_json(outcomes: &[FetchOutcome]) -> Result<String> {
    let json = match outcomes {
        [single] => serde_json::to_string_pretty(single),
        many => serde_json::to_string_pretty(many),
    };
    json.context("Failed to serialize output")
}

/// Save rendered output to file
pub async fn save_to_file(content: &str, path: &Path) -> Result<()> {
    fs_err::write(path, content)
        .with_context(|| format!("Failed to write output to {}", path.display()))?;
    Ok(())
}

/// Print rendered output to stdout
pub fn print_to_console(content: &str) {
    if !content.is_empty() {
        println!("{}", content);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn success(video_id: &str, text: &str) -> FetchOutcome {
        let request = TranscriptRequest::new(video_id, Some("en")).unwrap();
        FetchOutcome::Success(TranscriptResponse::new(
            &request,
            TranscriptResult {
                text: text.to_string(),
                tier: TierName::Primary,
                cached: false,
            },
        ))
    }

    fn failure(video_id: &str, kind: ErrorKind, message: &str) -> FetchOutcome {
        FetchOutcome::Failure(ErrorResponse::new(
            Some(video_id),
            &ClassifiedError::new(kind, message),
        ))
    }

    #[test]
    fn test_single_text_is_bare_transcript() {
        assert_eq!(format_as_text(&[success("abc", "hello world")]), "hello world");
        assert_eq!(
            format_as_text(&[failure("abc", ErrorKind::Disabled, "off")]),
            ""
        );
    }

    #[test]
    fn test_multiple_text_has_headers_and_skips_failures() {
        let text = format_as_text(&[
            success("abc", "first"),
            failure("def", ErrorKind::NotAvailable, "none"),
            success("ghi", "third"),
        ]);
        assert_eq!(text, "# abc [en, primary]\nfirst\n\n# ghi [en, primary]\nthird\n");
    }

    #[test]
    fn test_json_success_shape() {
        let json = format_as_json(&[success("abc", "hello")]).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["video_id"], "abc");
        assert_eq!(value["lang"], "en");
        assert_eq!(value["transcript"], "hello");
        assert_eq!(value["tier"], "primary");
        assert_eq!(value["cached"], false);
        assert!(value["fetched_at"].is_string());
    }

    #[test]
    fn test_json_error_shape() {
        let err = ClassifiedError::missing_parameter("video_id");
        let outcome = FetchOutcome::Failure(ErrorResponse::new(Some(""), &err));
        let value: serde_json::Value =
            serde_json::from_str(&format_as_json(&[outcome]).unwrap()).unwrap();

        assert_eq!(value["error"], "Missing video_id");
        assert_eq!(value["code"], "missing_parameter");
        assert_eq!(value["status"], 400);
        assert!(value.get("video_id").is_none());
    }

    #[test]
    fn test_json_many_is_array() {
        let json = format_as_json(&[
            success("abc", "one"),
            failure("def", ErrorKind::RateLimited, "429"),
        ])
        .unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        let items = value.as_array().unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[1]["code"], "rate_limited");
        assert_eq!(items[1]["status"], 429);
    }

    #[test]
    fn test_generic_error_message_truncated() {
        let long = "x ".repeat(400);
        let outcome = ErrorResponse::new(Some("abc"), &ClassifiedError::new(ErrorKind::Other, long));
        assert_eq!(outcome.status, 500);
        assert!(outcome.error.chars().count() <= 220);
        assert!(outcome.error.ends_with("..."));
    }
}
