use once_cell::sync::Lazy;
use regex::Regex;

use super::{decode_entities, ParseError};
use crate::utils::collapse_whitespace;

/// `00:00:01.000 --> 00:00:04.000`, optionally followed by cue settings
static TIMESTAMP_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\d+:)?\d{1,2}:\d{2}[.,]\d{3}\s*-->\s*(\d+:)?\d{1,2}:\d{2}[.,]\d{3}(\s.*)?$")
        .expect("Invalid timestamp regex")
});

static INLINE_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]*>").expect("Invalid tag regex"));

/// Strip a WebVTT (or SRT) payload down to its spoken text.
///
/// Headers, metadata, comment blocks, indices and timing lines are dropped,
/// inline markup removed and a line identical to the one just kept is
/// skipped, which is how auto-generated captions repeat while scrolling.
pub fn parse_cue_text(payload: &str) -> Result<String, ParseError> {
    let payload = payload.trim_start_matches('\u{feff}');

    let mut kept: Vec<String> = Vec::new();
    let mut in_header = false;
    let mut in_comment = false;

    for raw in payload.lines() {
        let line = raw.trim();

        if line.is_empty() {
            in_header = false;
            in_comment = false;
            continue;
        }

        if TIMESTAMP_LINE.is_match(line) {
            in_header = false;
            continue;
        }

        if in_header || in_comment {
            continue;
        }

        if line.starts_with("WEBVTT") {
            in_header = true;
            continue;
        }

        if is_block_keyword(line) {
            in_comment = true;
            continue;
        }

        if line.chars().all(|c| c.is_ascii_digit()) {
            continue;
        }

        let stripped = INLINE_TAG.replace_all(line, "");
        let text = collapse_whitespace(&decode_entities(&stripped));
        if text.is_empty() {
            continue;
        }

        if kept.last() == Some(&text) {
            continue;
        }
        kept.push(text);
    }

    if kept.is_empty() {
        return Err(ParseError::Empty);
    }

    Ok(kept.join("\n"))
}

fn is_block_keyword(line: &str) -> bool {
    line == "NOTE" || line.starts_with("NOTE ") || line == "STYLE" || line == "REGION"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_index_timestamp_and_duplicate() {
        let payload = "WEBVTT\n\n1\n00:00:01.000 --> 00:00:02.500\nhello there\nhello there\n";
        assert_eq!(parse_cue_text(payload).unwrap(), "hello there");
    }

    #[test]
    fn test_metadata_and_inline_tags() {
        let payload = "\u{feff}WEBVTT\nKind: captions\nLanguage: en\n\n\
            00:00:00.000 --> 00:00:02.000 align:start position:0%\n\
            we<00:00:00.480><c> are</c><00:00:00.900><c> live</c>\n\n\
            00:00:02.000 --> 00:00:04.000 align:start position:0%\n\
            we are live\n\
            <b>Tom &amp; Jerry</b>\n";

        assert_eq!(parse_cue_text(payload).unwrap(), "we are live\nTom & Jerry");
    }

    #[test]
    fn test_only_adjacent_duplicates_collapse() {
        let payload = "WEBVTT\n\n00:01.000 --> 00:02.000\nyes\n\n00:02.000 --> 00:03.000\nno\n\n00:03.000 --> 00:04.000\nyes\n";
        assert_eq!(parse_cue_text(payload).unwrap(), "yes\nno\nyes");
    }

    #[test]
    fn test_note_blocks_dropped() {
        let payload = "WEBVTT\n\nNOTE this is a comment\nspanning lines\n\n00:00:01.000 --> 00:00:02.000\nspoken\n";
        assert_eq!(parse_cue_text(payload).unwrap(), "spoken");
    }

    #[test]
    fn test_srt_style_timestamps() {
        let payload = "1\r\n00:00:01,000 --> 00:00:02,000\r\nfirst   line\r\n\r\n2\r\n00:00:02,000 --> 00:00:03,000\r\nsecond\r\n";
        assert_eq!(parse_cue_text(payload).unwrap(), "first line\nsecond");
    }

    #[test]
    fn test_empty_payload_is_not_available() {
        assert_eq!(parse_cue_text("WEBVTT\n\n").unwrap_err(), ParseError::Empty);
        assert_eq!(
            parse_cue_text("WEBVTT\n\n1\n00:00:01.000 --> 00:00:02.000\n<c></c>\n").unwrap_err(),
            ParseError::Empty
        );
    }
}
