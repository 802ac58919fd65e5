use quick_xml::escape::resolve_html5_entity;
use quick_xml::events::Event;
use quick_xml::Reader;

use super::{decode_entities, ParseError};
use crate::utils::collapse_whitespace;

/// Cue elements: `<text>` in classic timed-text, `<p>` in the srv3 flavour.
fn is_cue_element(name: &[u8]) -> bool {
    name == b"text" || name == b"p"
}

/// Parse a timed-text XML document into newline-joined cue text.
///
/// Upstream double-escapes some entities (`&amp;#39;`), so cue text is
/// decoded once by the XML reader and once more afterwards.
pub fn parse_timed_text(xml: &str) -> Result<String, ParseError> {
    let mut reader = Reader::from_str(xml);

    let mut lines: Vec<String> = Vec::new();
    let mut depth: usize = 0;
    let mut cue_depth: Option<usize> = None;
    let mut current = String::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                depth += 1;
                if cue_depth.is_none() && is_cue_element(e.local_name().as_ref()) {
                    cue_depth = Some(depth);
                    current.clear();
                }
            }
            Ok(Event::End(_)) => {
                if cue_depth == Some(depth) {
                    push_line(&mut lines, &current);
                    cue_depth = None;
                }
                depth = depth.saturating_sub(1);
            }
            // <br/> inside a cue separates words
            Ok(Event::Empty(_)) if cue_depth.is_some() => current.push(' '),
            Ok(Event::Text(t)) if cue_depth.is_some() => {
                let text = t
                    .unescape_with(resolve_html5_entity)
                    .map_err(|e| ParseError::Malformed(e.to_string()))?;
                current.push_str(&text);
            }
            Ok(Event::CData(c)) if cue_depth.is_some() => {
                current.push_str(&String::from_utf8_lossy(&c));
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => {
                return Err(ParseError::Malformed(format!(
                    "{} at position {}",
                    e,
                    reader.buffer_position()
                )))
            }
        }
    }

    if depth != 0 {
        return Err(ParseError::Malformed("unexpected end of document".to_string()));
    }

    if lines.is_empty() {
        return Err(ParseError::Empty);
    }

    Ok(lines.join("\n"))
}

fn push_line(lines: &mut Vec<String>, raw: &str) {
    let text = collapse_whitespace(&decode_entities(raw));
    if !text.is_empty() {
        lines.push(text);
    }
}
