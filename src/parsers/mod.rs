//! Normalise raw subtitle payloads into plain text.

use quick_xml::escape::{resolve_html5_entity, unescape_with};

pub mod cue;
pub mod timedtext;

pub use cue::parse_cue_text;
pub use timedtext::parse_timed_text;

use crate::error::TierFailure;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("Malformed timed-text XML: {0}")]
    Malformed(String),

    #[error("Caption payload contained no text")]
    Empty,
}

impl From<ParseError> for TierFailure {
    fn from(err: ParseError) -> Self {
        TierFailure::NotAvailable(err.to_string())
    }
}

/// Decode XML/HTML character references, leaving text untouched when it
/// contains a bare `&` that is not a valid reference.
pub(crate) fn decode_entities(text: &str) -> String {
    if !text.contains('&') {
        return text.to_string();
    }

    match unescape_with(text, resolve_html5_entity) {
        Ok(decoded) => decoded.into_owned(),
        Err(_) => text.to_string(),
    }
}
