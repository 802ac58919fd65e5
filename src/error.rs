use serde::Serialize;

use crate::utils::client_safe_message;

/// Phrases upstream uses when it wants a human (or browser cookies) in the loop.
///
/// Upstream wording is not a stable contract; this list will drift.
const BOT_CHALLENGE_PHRASES: &[&str] = &[
    "sign in to confirm",
    "not a bot",
    "confirm you're not a bot",
    "confirm you’re not a bot",
    "captcha",
    "unusual traffic",
    "use --cookies",
    "cookies-from-browser",
    "login_required",
];

/// Failure reported by a single tier.
///
/// `Disabled` and `NotAvailable` are structural: a tier raises them when the
/// upstream answered definitively. Everything else is `Upstream` and carries
/// the upstream text for classification.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum TierFailure {
    #[error("Subtitles are disabled for video {0}")]
    Disabled(String),

    #[error("{0}")]
    NotAvailable(String),

    #[error("{0}")]
    Upstream(String),
}

impl TierFailure {
    pub fn not_available(video_id: &str, lang: &str) -> Self {
        TierFailure::NotAvailable(format!(
            "No subtitles available for video {} in language: {}",
            video_id, lang
        ))
    }

    pub fn upstream(message: impl Into<String>) -> Self {
        TierFailure::Upstream(message.into())
    }
}

impl From<anyhow::Error> for TierFailure {
    fn from(err: anyhow::Error) -> Self {
        TierFailure::Upstream(format!("{:#}", err))
    }
}

// Request URLs carry signatures and expiry stamps; only the status text is
// kept so it cannot be mistaken for a rate limit
impl From<reqwest::Error> for TierFailure {
    fn from(err: reqwest::Error) -> Self {
        if let Some(url) = err.url() {
            tracing::debug!("HTTP request to {} failed", url);
        }
        TierFailure::Upstream(err.without_url().to_string())
    }
}

impl From<std::io::Error> for TierFailure {
    fn from(err: std::io::Error) -> Self {
        TierFailure::Upstream(err.to_string())
    }
}

/// What the caller should do about a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    MissingParameter,
    RateLimited,
    BotChallenge,
    Disabled,
    NotAvailable,
    Other,
}

impl ErrorKind {
    /// Stable machine-readable code for service responses.
    pub fn code(&self) -> &'static str {
        match self {
            ErrorKind::MissingParameter => "missing_parameter",
            ErrorKind::RateLimited => "rate_limited",
            ErrorKind::BotChallenge => "bot_challenge",
            ErrorKind::Disabled => "transcripts_disabled",
            ErrorKind::NotAvailable => "no_transcript_available",
            ErrorKind::Other => "internal_error",
        }
    }

    pub fn http_status(&self) -> u16 {
        match self {
            ErrorKind::MissingParameter | ErrorKind::Disabled | ErrorKind::NotAvailable => 400,
            ErrorKind::RateLimited => 429,
            ErrorKind::BotChallenge => 503,
            ErrorKind::Other => 500,
        }
    }

    /// Disabled / not-available answers from the primary tier end the chain.
    pub fn is_definitive(&self) -> bool {
        matches!(self, ErrorKind::Disabled | ErrorKind::NotAvailable)
    }
}

/// A failure after classification.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct ClassifiedError {
    pub kind: ErrorKind,
    pub message: String,
}

impl ClassifiedError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn missing_parameter(name: &str) -> Self {
        Self::new(ErrorKind::MissingParameter, format!("Missing {}", name))
    }

    /// Message suitable for a client; generic failures are collapsed and truncated.
    pub fn client_message(&self) -> String {
        match self.kind {
            ErrorKind::Other => client_safe_message(&self.message),
            _ => self.message.clone(),
        }
    }
}

/// Map a tier failure onto an [`ErrorKind`].
pub fn classify(failure: &TierFailure) -> ClassifiedError {
    let kind = match failure {
        TierFailure::Disabled(_) => ErrorKind::Disabled,
        TierFailure::NotAvailable(_) => ErrorKind::NotAvailable,
        TierFailure::Upstream(message) => classify_message(message),
    };

    ClassifiedError::new(kind, failure.to_string())
}

fn classify_message(message: &str) -> ErrorKind {
    let lower = message.to_lowercase();

    if lower.contains("429") || lower.contains("too many requests") {
        ErrorKind::RateLimited
    } else if BOT_CHALLENGE_PHRASES.iter().any(|p| lower.contains(p)) {
        ErrorKind::BotChallenge
    } else {
        ErrorKind::Other
    }
}
