use anyhow::Result;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;

/// Output template: files land in the target directory named by video id
const OUTPUT_TEMPLATE: &str = "%(id)s.%(ext)s";

/// External media downloader that writes subtitle or audio files to a directory
#[async_trait]
pub trait MediaDownloader: Send + Sync {
    /// Write WebVTT subtitles (authored or auto-generated) for `lang` into `dir`
    async fn download_subtitles(
        &self,
        video_id: &str,
        lang: &str,
        dir: &Path,
        cookies: Option<&Path>,
    ) -> Result<()>;

    /// Write the best available audio stream into `dir`
    async fn download_audio(&self, video_id: &str, dir: &Path, cookies: Option<&Path>) -> Result<()>;
}

/// yt-dlp driven downloader
pub struct YtDlp {
    yt_dlp_path: String,
}

impl YtDlp {
    pub fn new(yt_dlp_path: impl Into<String>) -> Self {
        Self {
            yt_dlp_path: yt_dlp_path.into(),
        }
    }

    async fn run(&self, args: Vec<String>) -> Result<()> {
        tracing::debug!("Running {} {}", self.yt_dlp_path, args.join(" "));

        let output = Command::new(&self.yt_dlp_path)
            .args(&args)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| anyhow::anyhow!("Failed to start {}: {}", self.yt_dlp_path, e))?;

        if !output.status.success() {
            let error = String::from_utf8_lossy(&output.stderr);
            anyhow::bail!("yt-dlp failed: {}", error.trim());
        }

        Ok(())
    }
}

fn watch_url(video_id: &str) -> String {
    format!("https://www.youtube.com/watch?v={}", video_id)
}

fn output_arg(dir: &Path) -> String {
    dir.join(OUTPUT_TEMPLATE).to_string_lossy().into_owned()
}

/// Arguments for a subtitle-only download
pub fn subtitle_args(video_id: &str, lang: &str, dir: &Path, cookies: Option<&Path>) -> Vec<String> {
    let mut args: Vec<String> = [
        "--skip-download",
        "--write-subs",
        "--write-auto-subs",
        "--sub-format",
        "vtt",
        "--sub-langs",
        lang,
        "--no-playlist",
        "--no-warnings",
        "--output",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect();

    args.push(output_arg(dir));
    push_cookies(&mut args, cookies);
    args.push(watch_url(video_id));
    args
}

/// Arguments for an audio-only download
pub fn audio_args(video_id: &str, dir: &Path, cookies: Option<&Path>) -> Vec<String> {
    let mut args: Vec<String> = [
        "--format",
        "bestaudio[ext=m4a]/bestaudio/best",
        "--no-playlist",
        "--no-warnings",
        "--output",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect();

    args.push(output_arg(dir));
    push_cookies(&mut args, cookies);
    args.push(watch_url(video_id));
    args
}

fn push_cookies(args: &mut Vec<String>, cookies: Option<&Path>) {
    if let Some(path) = cookies {
        args.push("--cookies".to_string());
        args.push(path.to_string_lossy().into_owned());
    }
}

#[async_trait]
impl MediaDownloader for YtDlp {
    async fn download_subtitles(
        &self,
        video_id: &str,
        lang: &str,
        dir: &Path,
        cookies: Option<&Path>,
    ) -> Result<()> {
        self.run(subtitle_args(video_id, lang, dir, cookies)).await
    }

    async fn download_audio(&self, video_id: &str, dir: &Path, cookies: Option<&Path>) -> Result<()> {
        self.run(audio_args(video_id, dir, cookies)).await
    }
}

/// Files in `dir` with the given extension, sorted by name
pub fn find_files_with_extension(dir: &Path, extension: &str) -> Result<Vec<PathBuf>> {
    let mut files: Vec<PathBuf> = fs_err::read_dir(dir)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| {
            path.is_file()
                && path
                    .extension()
                    .and_then(|e| e.to_str())
                    .map(|e| e.eq_ignore_ascii_case(extension))
                    .unwrap_or(false)
        })
        .collect();

    files.sort();
    Ok(files)
}

/// First finished download in `dir`, skipping yt-dlp's partial files
pub fn find_downloaded_file(dir: &Path) -> Result<Option<PathBuf>> {
    let mut files: Vec<PathBuf> = fs_err::read_dir(dir)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| {
            path.is_file()
                && !matches!(
                    path.extension().and_then(|e| e.to_str()),
                    Some("part") | Some("ytdl") | Some("tmp")
                )
        })
        .collect();

    files.sort();
    Ok(files.into_iter().next())
}
