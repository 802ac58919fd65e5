//! Cookie credentials for upstream requests.
//!
//! Cookies come either from a Netscape-format file on disk or from a base64
//! blob. The blob is written to a temporary file the first time it is needed
//! and that file lives as long as the resolver.

use anyhow::{Context, Result};
use base64::Engine;
use once_cell::sync::OnceCell;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

use crate::config::CredentialsConfig;

/// Domains whose cookies are sent on direct HTTP requests
const COOKIE_DOMAINS: &[&str] = &["youtube.com", "google.com"];

/// Where cookies come from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CookieSource {
    None,
    File(PathBuf),
    Base64(String),
}

/// Resolved credentials handed to tiers
#[derive(Debug, Clone, Default)]
pub struct Credentials {
    cookie_file: Option<PathBuf>,
    cookie_header: Option<String>,
}

impl Credentials {
    pub fn none() -> Self {
        Self::default()
    }

    /// Cookie file for tools that read it themselves (yt-dlp)
    pub fn cookie_file(&self) -> Option<&Path> {
        self.cookie_file.as_deref()
    }

    /// `Cookie` header value for direct HTTP requests
    pub fn cookie_header(&self) -> Option<&str> {
        self.cookie_header.as_deref()
    }
}

struct Resolved {
    credentials: Credentials,
    // Keeps the materialised blob on disk
    _blob_file: Option<NamedTempFile>,
}

/// Resolves cookies once and hands out the same result afterwards
pub struct CredentialResolver {
    source: CookieSource,
    resolved: OnceCell<Resolved>,
}

impl CredentialResolver {
    pub fn new(source: CookieSource) -> Self {
        Self {
            source,
            resolved: OnceCell::new(),
        }
    }

    /// A file path wins over a blob when both are configured
    pub fn from_config(config: &CredentialsConfig) -> Self {
        let source = match (&config.cookies_file, &config.cookies_b64) {
            (Some(path), _) => CookieSource::File(path.clone()),
            (None, Some(blob)) if !blob.trim().is_empty() => CookieSource::Base64(blob.clone()),
            _ => CookieSource::None,
        };
        Self::new(source)
    }

    pub fn source(&self) -> &CookieSource {
        &self.source
    }

    /// Resolve (first call) or return the memoised credentials.
    ///
    /// A source that cannot be resolved is reported once and then treated
    /// as no cookies for the life of the resolver.
    pub fn resolve(&self) -> &Credentials {
        let resolved = self.resolved.get_or_init(|| {
            self.materialize().unwrap_or_else(|e| {
                tracing::warn!("Continuing without cookies: {:#}", e);
                Resolved {
                    credentials: Credentials::none(),
                    _blob_file: None,
                }
            })
        });
        &resolved.credentials
    }

    fn materialize(&self) -> Result<Resolved> {
        match &self.source {
            CookieSource::None => Ok(Resolved {
                credentials: Credentials::none(),
                _blob_file: None,
            }),
            CookieSource::File(path) => {
                if !path.is_file() {
                    anyhow::bail!("Cookie file does not exist: {}", path.display());
                }
                let content = fs_err::read_to_string(path)
                    .context("Failed to read cookie file")?;

                tracing::info!("Using cookie file: {}", path.display());
                Ok(Resolved {
                    credentials: Credentials {
                        cookie_file: Some(path.clone()),
                        cookie_header: cookie_header_from_netscape(&content),
                    },
                    _blob_file: None,
                })
            }
            CookieSource::Base64(blob) => {
                let decoded = base64::engine::general_purpose::STANDARD
                    .decode(blob.trim())
                    .context("Cookie blob is not valid base64")?;

                let mut file = tempfile::Builder::new()
                    .prefix("cookies-")
                    .suffix(".txt")
                    .tempfile()
                    .context("Failed to create cookie file")?;
                file.write_all(&decoded)
                    .context("Failed to write cookie file")?;
                file.flush()?;

                let content = String::from_utf8_lossy(&decoded);
                tracing::info!("Materialised cookie blob to: {}", file.path().display());

                Ok(Resolved {
                    credentials: Credentials {
                        cookie_file: Some(file.path().to_path_buf()),
                        cookie_header: cookie_header_from_netscape(&content),
                    },
                    _blob_file: Some(file),
                })
            }
        }
    }
}

/// Build a `Cookie` header from a Netscape cookie file.
///
/// Only cookies for [`COOKIE_DOMAINS`] are kept. Returns `None` when nothing
/// matches.
pub fn cookie_header_from_netscape(content: &str) -> Option<String> {
    let pairs: Vec<String> = content
        .lines()
        .filter_map(|line| {
            let line = line.trim();
            let line = line.strip_prefix("#HttpOnly_").unwrap_or(line);
            if line.is_empty() || line.starts_with('#') {
                return None;
            }

            let fields: Vec<&str> = line.split('\t').collect();
            if fields.len() < 7 {
                return None;
            }

            let domain = fields[0].trim_start_matches('.');
            let wanted = COOKIE_DOMAINS
                .iter()
                .any(|d| domain == *d || domain.ends_with(&format!(".{}", d)));

            wanted.then(|| format!("{}={}", fields[5], fields[6]))
        })
        .collect();

    if pairs.is_empty() {
        None
    } else {
        Some(pairs.join("; "))
    }
}
