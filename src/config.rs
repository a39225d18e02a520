//! Configuration file parser for ~/.config/mistree/config.toml.
//!
//! The config file is optional: a missing file yields `Config::default()`.
//! Unknown keys are ignored by serde but logged as warnings so typos are
//! visible.
use crate::feed::FeedIdentity;
use crate::util::validate_base_url;
use serde::Deserialize;
use std::path::Path;
use thiserror::Error;

/// Env var holding the API token. Takes precedence over the config file.
pub const API_TOKEN_ENV: &str = "MISTREE_API_TOKEN";

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

    /// A value parsed but is not usable.
    #[error("Invalid config value for `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}

// ============================================================================
// Configuration Structs
// ============================================================================

/// Top-level client configuration.
///
/// All fields use `#[serde(default)]` so any subset of keys can be specified.
///
/// `api_token` is masked in the `Debug` impl to keep it out of logs.
#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Forum base URL, e.g. `https://forum.example.com`.
    pub base_url: String,

    /// Topics requested per page. A shorter page ends the feed.
    pub page_size: u32,

    /// Per-request timeout in seconds.
    pub request_timeout_secs: u64,

    /// Bearer token for an already-established session.
    pub api_token: Option<String>,

    /// Add one tab per forum category after the built-in tabs.
    pub categories_as_tabs: bool,

    /// Feed shown at startup (`recent`, `popular`, `category:<id>`).
    pub default_feed: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:4567".to_string(),
            page_size: 20,
            request_timeout_secs: 30,
            api_token: None,
            categories_as_tabs: false,
            default_feed: "recent".to_string(),
        }
    }
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("base_url", &self.base_url)
            .field("page_size", &self.page_size)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("api_token", &self.api_token.as_ref().map(|_| "[REDACTED]"))
            .field("categories_as_tabs", &self.categories_as_tabs)
            .field("default_feed", &self.default_feed)
            .finish()
    }
}

impl Config {
    /// Maximum config file size (1 MB).
    const MAX_FILE_SIZE: u64 = 1_048_576;

    const KNOWN_KEYS: [&'static str; 6] = [
        "base_url",
        "page_size",
        "request_timeout_secs",
        "api_token",
        "categories_as_tabs",
        "default_feed",
    ];

    /// Load configuration from a TOML file.
    ///
    /// - Missing file → `Ok(Config::default())`
    /// - Empty file → `Ok(Config::default())`
    /// - Invalid TOML → `Err(ConfigError::Parse)` with line number info
    /// - Unknown keys → accepted, logged as warning
    /// - Unusable values → `Err(ConfigError::Invalid)`
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
        tracing::info!(path = %path.display(), base_url = %config.base_url, "Loaded configuration");
        Ok(config)
    }

    /// Check values that deserialize fine but cannot be used.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.page_size == 0 {
            return Err(ConfigError::Invalid {
                key: "page_size",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.request_timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                key: "request_timeout_secs",
                reason: "must be at least 1".to_string(),
            });
        }
        validate_base_url(&self.base_url).map_err(|e| ConfigError::Invalid {
            key: "base_url",
            reason: e.to_string(),
        })?;
        self.default_feed()?;
        Ok(())
    }

    /// The startup feed as a typed identity.
    pub fn default_feed(&self) -> Result<FeedIdentity, ConfigError> {
        self.default_feed
            .parse()
            .map_err(|e: crate::feed::FeedError| ConfigError::Invalid {
                key: "default_feed",
                reason: e.to_string(),
            })
    }

    /// Token from the environment, falling back to the config file.
    pub fn resolved_api_token(&self) -> Option<String> {
        self.api_token_with_env(std::env::var(API_TOKEN_ENV).ok())
    }

    /// A blank env value does not mask the file token.
    fn api_token_with_env(&self, env_token: Option<String>) -> Option<String> {
        env_token
            .filter(|t| !t.trim().is_empty())
            .or_else(|| self.api_token.clone())
    }
}

// ============================================================================
// Tests
// ============================================================================
