//! Configuration file parser for ~/.config/feedline/config.toml.
//!
//! The config file is optional; a missing file yields `Config::default()`.
//! Unknown keys are silently ignored by serde (with `deny_unknown_fields` off),
//! though we log a warning when the file contains potential typos.
use secrecy::SecretString;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

use crate::util::{validate_base_url, UrlValidationError};

/// Environment variable that overrides `api_token` from the file.
pub const API_TOKEN_ENV: &str = "FEEDLINE_API_TOKEN";

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid TOML in config file: {0}")]
    Parse(#[from] toml::de::Error),

    /// Config file exceeds maximum allowed size.
    #[error("Config file too large: {0}")]
    TooLarge(String),

    #[error("Invalid api_base_url: {0}")]
    BaseUrl(#[from] UrlValidationError),

    #[error("Invalid config value: {0}")]
    Invalid(String),
}

// ============================================================================
// Configuration Structs
// ============================================================================

/// Top-level configuration.
///
/// All fields use `#[serde(default)]` so any subset of keys can be specified.
/// Missing keys fall back to `Default::default()`.
///
/// Custom Debug impl masks `api_token` so it never reaches logs.
#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Base URL of the recommendations and interaction API.
    pub api_base_url: String,

    /// Articles requested per page.
    pub page_size: u32,

    /// Per-request timeout in seconds, covering connect and body read.
    pub request_timeout_secs: u64,

    /// Transport-level retries for transient failures (0 disables).
    pub max_retries: u32,

    /// Name of the feed that mirrors bookmarked articles.
    pub bookmarks_feed: String,

    /// Bearer token for the API (alternative to FEEDLINE_API_TOKEN env var).
    /// Env var takes precedence over config file.
    pub api_token: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: "https://api.feedline.app/v1".to_string(),
            page_size: 20,
            request_timeout_secs: 20,
            max_retries: 3,
            bookmarks_feed: "bookmarks".to_string(),
            api_token: None,
        }
    }
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("api_base_url", &self.api_base_url)
            .field("page_size", &self.page_size)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("max_retries", &self.max_retries)
            .field("bookmarks_feed", &self.bookmarks_feed)
            .field("api_token", &self.api_token.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

impl Config {
    /// Maximum config file size (1 MB).
    const MAX_FILE_SIZE: u64 = 1_048_576;

    const KNOWN_KEYS: [&'static str; 6] = [
        "api_base_url",
        "page_size",
        "request_timeout_secs",
        "max_retries",
        "bookmarks_feed",
        "api_token",
    ];

    /// Load configuration from a TOML file.
    ///
    /// - Missing file → `Ok(Config::default())`
    /// - Empty file → `Ok(Config::default())`
    /// - Invalid TOML → `Err(ConfigError::Parse)` with line number info
    /// - Unknown keys → silently accepted (serde default behavior), logged as warning
    /// - Out-of-range values → `Err(ConfigError::Invalid)` / `Err(ConfigError::BaseUrl)`
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::metadata(path) {
            Ok(meta) if meta.len() > Self::MAX_FILE_SIZE => {
                return Err(ConfigError::TooLarge(format!(
                    "Config file is {} bytes (max {} bytes)",
                    meta.len(),
                    Self::MAX_FILE_SIZE
                )));
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "No config file found, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
            Ok(_) => {}
        }

        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                // Race condition: file deleted between metadata and read
                tracing::debug!(path = %path.display(), "Config file disappeared, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
        };

        if content.trim().is_empty() {
            tracing::debug!(path = %path.display(), "Config file is empty, using defaults");
            return Ok(Self::default());
        }

        if let Ok(raw) = content.parse::<toml::Table>() {
            for key in raw.keys() {
                if !Self::KNOWN_KEYS.contains(&key.as_str()) {
                    tracing::warn!(key = %key, "Unknown key in config file, ignoring");
                }
            }
        }

        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        tracing::info!(
            path = %path.display(),
            api_base_url = %config.api_base_url,
            page_size = config.page_size,
            "Loaded configuration"
        );
        Ok(config)
    }

    /// Check value ranges that serde cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.page_size == 0 {
            return Err(ConfigError::Invalid("page_size must be greater than 0".into()));
        }
        if self.request_timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "request_timeout_secs must be greater than 0".into(),
            ));
        }
        if self.bookmarks_feed.trim().is_empty() {
            return Err(ConfigError::Invalid("bookmarks_feed must not be empty".into()));
        }
        validate_base_url(&self.api_base_url)?;
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Resolve the API token: environment first, then the file.
    pub fn api_token(&self) -> Option<SecretString> {
        pick_token(std::env::var(API_TOKEN_ENV).ok(), self.api_token.as_deref())
    }
}

/// An empty env value counts as unset.
fn pick_token(env: Option<String>, file: Option<&str>) -> Option<SecretString> {
    env.filter(|token| !token.is_empty())
        .or_else(|| file.map(str::to_owned))
        .map(SecretString::from)
}

// ============================================================================
// Tests
// ============================================================================
