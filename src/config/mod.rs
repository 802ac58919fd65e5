use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::transcribe::RetryPolicy;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Transcript cache settings
    pub cache: CacheConfig,

    /// Primary tier retry settings
    pub retry: RetryConfig,

    /// Speech-to-text fallback
    pub asr: AsrConfig,

    /// Cookie credentials for upstream requests
    pub credentials: CredentialsConfig,

    /// External media downloader
    pub downloader: DownloaderConfig,

    /// Outbound HTTP settings
    pub http: HttpConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Seconds a cached transcript stays valid
    pub ttl_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Attempts for the primary tier, including the first
    pub max_attempts: u32,

    /// Backoff base in seconds; doubles on every retry
    pub base_delay_secs: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AsrConfig {
    /// Run speech-to-text when no captions can be found
    pub enabled: bool,

    /// Speech-to-text model identifier
    pub model: String,

    /// Base URL of the OpenAI-compatible API
    pub api_base: String,

    /// API key (usually supplied through OPENAI_API_KEY)
    pub api_key: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CredentialsConfig {
    /// Netscape-format cookie file
    pub cookies_file: Option<PathBuf>,

    /// Base64-encoded cookie file contents
    pub cookies_b64: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DownloaderConfig {
    /// yt-dlp executable
    pub yt_dlp_path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Per-request timeout for direct HTTP calls
    pub timeout_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { ttl_secs: 3600 }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_secs: 1.0,
        }
    }
}

impl Default for AsrConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            model: "whisper-1".to_string(),
            api_base: "https://api.openai.com/v1".to_string(),
            api_key: None,
        }
    }
}

impl Default for DownloaderConfig {
    fn default() -> Self {
        Self {
            yt_dlp_path: "yt-dlp".to_string(),
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self { timeout_secs: 20 }
    }
}

impl Config {
    /// Load configuration from file (or defaults), then apply environment overrides
    pub async fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        let mut config = if config_path.exists() {
            let content = fs_err::read_to_string(&config_path)
                .context("Failed to read config file")?;

            serde_yaml::from_str(&content).context("Failed to parse config file")?
        } else {
            tracing::debug!("No config file at {}, using defaults", config_path.display());
            Self::default()
        };

        config.apply_overrides(|name| std::env::var(name).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to file
    pub async fn save(&self) -> Result<PathBuf> {
        let config_path = Self::config_path()?;

        if let Some(parent) = config_path.parent() {
            fs_err::create_dir_all(parent)?;
        }

        let content = serde_yaml::to_string(self)
            .context("Failed to serialize config")?;

        fs_err::write(&config_path, content)
            .context("Failed to write config file")?;

        Ok(config_path)
    }

    /// Get configuration file path
    pub fn config_path() -> Result<PathBuf> {
        // First try current directory for easy testing
        let local_config = PathBuf::from("config.yaml");
        if local_config.exists() {
            return Ok(local_config);
        }

        let config_dir = dirs::config_dir()
            .context("Could not determine config directory")?;

        Ok(config_dir.join("video-transcript").join("config.yaml"))
    }

    /// Apply overrides from a variable lookup (the process environment in `load`)
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(ttl) = parse_var(&lookup, "TRANSCRIPT_CACHE_TTL")? {
            self.cache.ttl_secs = ttl;
        }
        if let Some(attempts) = parse_var(&lookup, "TRANSCRIPT_MAX_RETRIES")? {
            self.retry.max_attempts = attempts;
        }
        if let Some(delay) = parse_var(&lookup, "TRANSCRIPT_RETRY_BASE_DELAY")? {
            self.retry.base_delay_secs = delay;
        }
        if let Some(value) = lookup("TRANSCRIPT_ASR_ENABLED") {
            self.asr.enabled = parse_bool(&value)
                .with_context(|| format!("TRANSCRIPT_ASR_ENABLED is not a boolean: {}", value))?;
        }
        if let Some(model) = non_empty(lookup("TRANSCRIPT_ASR_MODEL")) {
            self.asr.model = model;
        }
        if let Some(key) = non_empty(lookup("OPENAI_API_KEY")) {
            self.asr.api_key = Some(key);
        }
        if let Some(path) = non_empty(lookup("TRANSCRIPT_COOKIES_FILE")) {
            self.credentials.cookies_file = Some(PathBuf::from(path));
        }
        if let Some(blob) = non_empty(lookup("TRANSCRIPT_COOKIES_B64")) {
            self.credentials.cookies_b64 = Some(blob);
        }

        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.cache.ttl_secs == 0 {
            anyhow::bail!("cache.ttl_secs must be greater than zero");
        }

        if self.retry.max_attempts == 0 {
            anyhow::bail!("retry.max_attempts must be at least 1");
        }

        if !self.retry.base_delay_secs.is_finite() || self.retry.base_delay_secs < 0.0 {
            anyhow::bail!("retry.base_delay_secs must be a non-negative number");
        }

        if self.http.timeout_secs == 0 {
            anyhow::bail!("http.timeout_secs must be greater than zero");
        }

        if self.asr.enabled && self.asr.api_key.is_none() {
            tracing::warn!("Speech-to-text fallback is enabled but no API key is configured");
        }

        Ok(())
    }

    /// Display current configuration
    pub fn display(&self) {
        println!("Current Configuration:");
        println!("  Cache TTL: {}s", self.cache.ttl_secs);
        println!("  Max Retry Attempts: {}", self.retry.max_attempts);
        println!("  Retry Base Delay: {}s", self.retry.base_delay_secs);
        println!("  ASR Fallback: {}", if self.asr.enabled { "enabled" } else { "disabled" });
        println!("  ASR Model: {}", self.asr.model);
        println!("  ASR API Key: {}", if self.asr.api_key.is_some() { "set" } else { "not set" });
        match (&self.credentials.cookies_file, &self.credentials.cookies_b64) {
            (Some(path), _) => println!("  Cookies: file {}", path.display()),
            (None, Some(_)) => println!("  Cookies: base64 blob"),
            (None, None) => println!("  Cookies: none"),
        }
        println!("  yt-dlp: {}", self.downloader.yt_dlp_path);
        println!("  HTTP Timeout: {}s", self.http.timeout_secs);
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache.ttl_secs)
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http.timeout_secs)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.retry.max_attempts,
            Duration::from_secs_f64(self.retry.base_delay_secs.max(0.0)),
        )
    }
}

fn parse_var<T, F>(lookup: &F, name: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match non_empty(lookup(name)) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| anyhow::anyhow!("Invalid value for {}: {} ({})", name, raw, e)),
        None => Ok(None),
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.cache_ttl(), Duration::from_secs(3600));
        assert_eq!(config.retry_policy(), RetryPolicy::new(3, Duration::from_secs(1)));
        assert!(config.asr.enabled);
        assert_eq!(config.asr.model, "whisper-1");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let config: Config = serde_yaml::from_str("cache:\n  ttl_secs: 60\nasr:\n  enabled: false\n").unwrap();
        assert_eq!(config.cache.ttl_secs, 60);
        assert!(!config.asr.enabled);
        assert_eq!(config.retry.max_attempts, 3);
        assert_eq!(config.downloader.yt_dlp_path, "yt-dlp");
    }

    #[test]
    fn test_env_overrides() {
        let mut config = Config::default();
        config
            .apply_overrides(lookup(&[
                ("TRANSCRIPT_CACHE_TTL", "120"),
                ("TRANSCRIPT_MAX_RETRIES", "5"),
                ("TRANSCRIPT_RETRY_BASE_DELAY", "0.5"),
                ("TRANSCRIPT_ASR_ENABLED", "no"),
                ("TRANSCRIPT_ASR_MODEL", "whisper-large"),
                ("OPENAI_API_KEY", "sk-test"),
                ("TRANSCRIPT_COOKIES_B64", "Zm9v"),
                ("TRANSCRIPT_COOKIES_FILE", ""),
            ]))
            .unwrap();

        assert_eq!(config.cache.ttl_secs, 120);
        assert_eq!(config.retry_policy(), RetryPolicy::new(5, Duration::from_millis(500)));
        assert!(!config.asr.enabled);
        assert_eq!(config.asr.model, "whisper-large");
        assert_eq!(config.asr.api_key.as_deref(), Some("sk-test"));
        assert_eq!(config.credentials.cookies_b64.as_deref(), Some("Zm9v"));
        assert!(config.credentials.cookies_file.is_none());
    }

    #[test]
    fn test_bad_override_rejected() {
        let mut config = Config::default();
        assert!(config
            .apply_overrides(lookup(&[("TRANSCRIPT_CACHE_TTL", "soon")]))
            .is_err());
        assert!(config
            .apply_overrides(lookup(&[("TRANSCRIPT_ASR_ENABLED", "maybe")]))
            .is_err());
    }

    #[test]
    fn test_validation() {
        let mut config = Config::default();
        config.retry.max_attempts = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.retry.base_delay_secs = -1.0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.cache.ttl_secs = 0;
        assert!(config.validate().is_err());
    }
}
