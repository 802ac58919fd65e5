use anyhow::Result;
use url::Url;

/// Longest message handed back to a client for a generic failure.
pub const MAX_CLIENT_MESSAGE_CHARS: usize = 220;

/// Collapse any run of whitespace (including newlines) into a single space
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Truncate to at most `max_chars` characters, marking the cut with "..."
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }

    let keep = max_chars.saturating_sub(3);
    let mut truncated: String = text.chars().take(keep).collect();
    truncated.push_str("...");
    truncated
}

/// Whitespace-collapsed, truncated form of an error message for display
pub fn client_safe_message(message: &str) -> String {
    truncate_chars(&collapse_whitespace(message), MAX_CLIENT_MESSAGE_CHARS)
}

/// Resolve a bare video id or a YouTube URL to the video id.
pub fn extract_video_id(input: &str) -> Result<String> {
    let input = input.trim();
    if input.is_empty() {
        anyhow::bail!("Missing video_id");
    }

    if !input.starts_with("http://") && !input.starts_with("https://") {
        if is_plausible_id(input) {
            return Ok(input.to_string());
        }
        anyhow::bail!("Not a video id or URL: {}", input);
    }

    let parsed = Url::parse(input)
        .map_err(|_| anyhow::anyhow!("Invalid URL format: {}", input))?;

    let host = parsed.host_str().unwrap_or_default().to_lowercase();
    let host = host.strip_prefix("www.").unwrap_or(&host);
    let host = host.strip_prefix("m.").unwrap_or(host);

    let candidate = match host {
        "youtu.be" => parsed
            .path_segments()
            .and_then(|mut segments| segments.next())
            .map(str::to_string),
        "youtube.com" | "music.youtube.com" => {
            if parsed.path() == "/watch" {
                parsed
                    .query_pairs()
                    .find(|(k, _)| k == "v")
                    .map(|(_, v)| v.into_owned())
            } else {
                let mut segments = parsed.path_segments().into_iter().flatten();
                match segments.next() {
                    Some("embed") | Some("shorts") | Some("v") | Some("live") => {
                        segments.next().map(str::to_string)
                    }
                    _ => None,
                }
            }
        }
        _ => anyhow::bail!("Unsupported URL: {}", input),
    };

    match candidate {
        Some(id) if is_plausible_id(&id) => Ok(id),
        _ => anyhow::bail!("Could not find a video id in URL: {}", input),
    }
}

fn is_plausible_id(id: &str) -> bool {
    !id.is_empty()
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

/// Check if the current environment has required tools
pub async fn check_dependencies(yt_dlp_path: &str) -> Vec<String> {
    let mut missing = Vec::new();

    if !check_command_available(yt_dlp_path).await {
        missing.push(format!(
            "{} - required for the subtitle download and speech-to-text tiers",
            yt_dlp_path
        ));
    }

    missing
}

/// Check if a command is available in PATH
async fn check_command_available(command: &str) -> bool {
    use tokio::process::Command;

    Command::new(command)
        .arg("--version")
        .output()
        .await
        .map(|output| output.status.success())
        .unwrap_or(false)
}
