//! Configuration file parser for ~/.config/postfeed/config.toml.
//!
//! The config file is optional; a missing file yields `Config::default()`.
//! Unknown keys are accepted but logged, since they are usually typos.
use crate::feed::{
    SubjectId, DEFAULT_CACHE_CAPACITY, DEFAULT_EMPTY_GRACE, DEFAULT_STALE_TIME,
    DEFAULT_VISIBILITY_THRESHOLD,
};
use crate::util::{validate_base_url, UrlValidationError};
use secrecy::SecretString;
use serde::Deserialize;
use std::num::NonZeroUsize;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use url::Url;

pub const DEFAULT_BASE_URL: &str = "http://localhost:3000/api/";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid TOML in config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Config file too large: {0}")]
    TooLarge(String),

    #[error("Invalid base_url: {0}")]
    InvalidBaseUrl(#[from] UrlValidationError),
}

/// Top-level application configuration.
///
/// Every key is optional. `auth_token` is masked in `Debug` output.
#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// API root; the feed lives at `{base_url}posts`.
    pub base_url: String,

    /// Subject whose feed is shown at startup.
    pub subject: String,

    /// How long a cached feed counts as fresh.
    pub stale_time_secs: u64,

    /// Delay before an empty feed is reported as empty.
    pub empty_grace_ms: u64,

    /// Fraction of the end-of-list marker that must be on screen to load more.
    pub visibility_threshold: f32,

    /// Number of subjects whose feeds are kept in memory.
    pub cache_capacity: usize,

    /// Bearer token sent with feed requests.
    pub auth_token: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            subject: "all".to_string(),
            stale_time_secs: DEFAULT_STALE_TIME.as_secs(),
            empty_grace_ms: DEFAULT_EMPTY_GRACE.as_millis() as u64,
            visibility_threshold: DEFAULT_VISIBILITY_THRESHOLD,
            cache_capacity: DEFAULT_CACHE_CAPACITY,
            auth_token: None,
        }
    }
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("base_url", &self.base_url)
            .field("subject", &self.subject)
            .field("stale_time_secs", &self.stale_time_secs)
            .field("empty_grace_ms", &self.empty_grace_ms)
            .field("visibility_threshold", &self.visibility_threshold)
            .field("cache_capacity", &self.cache_capacity)
            .field("auth_token", &self.auth_token.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

const KNOWN_KEYS: [&str; 7] = [
    "base_url",
    "subject",
    "stale_time_secs",
    "empty_grace_ms",
    "visibility_threshold",
    "cache_capacity",
    "auth_token",
];

impl Config {
    /// Maximum config file size (1 MB).
    const MAX_FILE_SIZE: u64 = 1_048_576;

    /// Load configuration from a TOML file.
    ///
    /// - Missing or empty file → `Ok(Config::default())`
    /// - Invalid TOML → `Err(ConfigError::Parse)` with line number info
    /// - Unparseable `base_url` → `Err(ConfigError::InvalidBaseUrl)`
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
                if !KNOWN_KEYS.contains(&key.as_str()) {
                    tracing::warn!(key = %key, "Unknown key in config file, ignoring");
                }
            }
        }

        let config: Config = toml::from_str(&content)?;
        config.base_url()?;
        tracing::info!(
            path = %path.display(),
            base_url = %config.base_url,
            subject = %config.subject,
            "Loaded configuration"
        );
        Ok(config)
    }

    pub fn base_url(&self) -> Result<Url, ConfigError> {
        Ok(validate_base_url(&self.base_url)?)
    }

    pub fn subject(&self) -> SubjectId {
        SubjectId::new(self.subject.trim())
    }

    pub fn stale_time(&self) -> Duration {
        Duration::from_secs(self.stale_time_secs)
    }

    pub fn empty_grace(&self) -> Duration {
        Duration::from_millis(self.empty_grace_ms)
    }

    /// Cache capacity, with 0 treated as 1.
    pub fn cache_capacity(&self) -> NonZeroUsize {
        NonZeroUsize::new(self.cache_capacity).unwrap_or(NonZeroUsize::MIN)
    }

    /// Token from `POSTFEED_AUTH_TOKEN`, falling back to the config file.
    pub fn auth_token(&self) -> Option<SecretString> {
        std::env::var("POSTFEED_AUTH_TOKEN")
            .ok()
            .filter(|token| !token.trim().is_empty())
            .or_else(|| self.auth_token.clone())
            .map(SecretString::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn write_config(name: &str, content: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("postfeed_config_test_{name}"));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.toml");
        std::fs::write(&path, content).unwrap();
        path
    }

    fn cleanup(path: &Path) {
        if let Some(dir) = path.parent() {
            std::fs::remove_dir_all(dir).ok();
        }
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.stale_time(), Duration::from_secs(180));
        assert_eq!(config.empty_grace(), Duration::from_millis(300));
        assert_eq!(config.visibility_threshold, 0.1);
        assert_eq!(config.cache_capacity().get(), DEFAULT_CACHE_CAPACITY);
        assert!(config.auth_token.is_none());
    }

    #[test]
    fn test_missing_file_returns_default() {
        let path = Path::new("/tmp/postfeed_test_nonexistent_config.toml");
        let config = Config::load(path).unwrap();
        assert_eq!(config.subject, "all");
    }

    #[test]
    fn test_whitespace_file_returns_default() {
        let path = write_config("whitespace", "   \n  \n");
        let config = Config::load(&path).unwrap();
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        cleanup(&path);
    }

    #[test]
    fn test_partial_config_uses_defaults_for_missing() {
        let path = write_config("partial", "subject = \"u42\"\n");
        let config = Config::load(&path).unwrap();
        assert_eq!(config.subject().as_str(), "u42");
        assert_eq!(config.stale_time_secs, 180);
        cleanup(&path);
    }

    #[test]
    fn test_full_config() {
        let content = r#"
base_url = "https://social.example.com/api"
subject = "u7"
stale_time_secs = 60
empty_grace_ms = 500
visibility_threshold = 0.5
cache_capacity = 4
auth_token = "token-abc"
"#;
        let path = write_config("full", content);
        let config = Config::load(&path).unwrap();

        assert_eq!(
            config.base_url().unwrap().as_str(),
            "https://social.example.com/api/"
        );
        assert_eq!(config.subject().as_str(), "u7");
        assert_eq!(config.stale_time(), Duration::from_secs(60));
        assert_eq!(config.empty_grace(), Duration::from_millis(500));
        assert_eq!(config.visibility_threshold, 0.5);
        assert_eq!(config.cache_capacity().get(), 4);
        assert_eq!(config.auth_token.as_deref(), Some("token-abc"));
        cleanup(&path);
    }

    #[test]
    fn test_invalid_toml_returns_error() {
        let path = write_config("invalid", "this is not [valid toml");
        let err = Config::load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
        assert!(err.to_string().contains("Invalid TOML"));
        cleanup(&path);
    }

    #[test]
    fn test_invalid_base_url_rejected() {
        let path = write_config("bad_url", "base_url = \"ftp://example.com\"\n");
        assert!(matches!(
            Config::load(&path),
            Err(ConfigError::InvalidBaseUrl(_))
        ));
        cleanup(&path);
    }

    #[test]
    fn test_unknown_keys_accepted() {
        let path = write_config("unknown", "subject = \"u1\"\ntheme = \"dark\"\n");
        let config = Config::load(&path).unwrap();
        assert_eq!(config.subject, "u1");
        cleanup(&path);
    }

    #[test]
    fn test_wrong_type_returns_error() {
        let path = write_config("wrong_type", "cache_capacity = \"many\"\n");
        assert!(Config::load(&path).is_err());
        cleanup(&path);
    }

    #[test]
    fn test_zero_capacity_clamped() {
        let config = Config {
            cache_capacity: 0,
            ..Config::default()
        };
        assert_eq!(config.cache_capacity().get(), 1);
    }

    #[test]
    fn test_too_large_file_rejected() {
        let path = write_config("too_large", &"a".repeat(1_048_577));
        let err = Config::load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::TooLarge(_)));
        assert!(err.to_string().contains("too large"));
        cleanup(&path);
    }

    #[test]
    fn test_debug_masks_auth_token() {
        let config = Config {
            auth_token: Some("super-secret-token".to_string()),
            ..Config::default()
        };
        let debug_output = format!("{:?}", config);
        assert!(!debug_output.contains("super-secret-token"));
        assert!(debug_output.contains("[REDACTED]"));
    }
}
