use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use std::path::Path;

/// Speech-to-text service
#[async_trait]
pub trait SpeechToText: Send + Sync {
    /// Transcribe an audio file, optionally hinting the spoken language
    async fn transcribe(&self, audio: &Path, language: Option<&str>) -> Result<String>;
}

#[derive(Debug, Deserialize)]
struct TranscriptionResponse {
    #[serde(default)]
    text: String,
}

/// Client for an OpenAI-compatible `/audio/transcriptions` endpoint
pub struct WhisperClient {
    http: reqwest::Client,
    api_base: String,
    api_key: Option<String>,
    model: String,
}

impl WhisperClient {
    pub fn new(api_base: impl Into<String>, api_key: Option<String>, model: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_base: api_base.into(),
            api_key,
            model: model.into(),
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/audio/transcriptions", self.api_base.trim_end_matches('/'))
    }
}

#[async_trait]
impl SpeechToText for WhisperClient {
    async fn transcribe(&self, audio: &Path, language: Option<&str>) -> Result<String> {
        let api_key = self
            .api_key
            .as_deref()
            .context("Speech-to-text API key is not configured")?;

        let content = fs_err::read(audio).context("Failed to read downloaded audio")?;
        let file_name = audio
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "audio".to_string());

        tracing::info!(
            "Submitting {} ({} bytes) to speech-to-text model {}",
            file_name,
            content.len(),
            self.model
        );

        let mut form = Form::new()
            .part("file", Part::bytes(content).file_name(file_name))
            .text("model", self.model.clone())
            .text("response_format", "json");

        if let Some(lang) = language {
            form = form.text("language", lang.to_string());
        }

        let response = self
            .http
            .post(self.endpoint())
            .bearer_auth(api_key)
            .multipart(form)
            .send()
            .await
            .context("Failed to reach speech-to-text service")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Speech-to-text request failed: HTTP {}: {}", status, body.trim());
        }

        let parsed: TranscriptionResponse = response
            .json()
            .await
            .context("Failed to parse speech-to-text response")?;

        Ok(parsed.text)
    }
}
