//! Configuration file parser for ~/.config/bellwire/config.toml.
//!
//! Every key is optional. Keys the crate does not know are logged and
//! otherwise ignored, so a newer config file still loads on an older binary.
use crate::sync::{RollbackPolicy, SyncConfig};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use url::Url;

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Cannot read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config is not valid TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Config file too large: {0}")]
    TooLarge(String),

    #[error("Invalid config value: {0}")]
    Invalid(String),
}

// ============================================================================
// Configuration Structs
// ============================================================================

/// Settings for the notification client, read from TOML.
///
/// Absent keys take their `Default` value. `Debug` redacts `api_token`.
#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Notification API root, e.g. `https://jobs.example.com/api`.
    pub base_url: Option<String>,

    /// Site root used to resolve relative `actionUrl`s for navigation.
    /// Defaults to the origin of `base_url`.
    pub site_url: Option<String>,

    /// Seconds between background unread-count polls.
    pub poll_interval_secs: u64,

    /// Number of notifications fetched when the dropdown opens.
    pub fetch_limit: usize,

    /// Per-request timeout in seconds.
    pub request_timeout_secs: u64,

    /// Revert optimistic mark-read updates when the server rejects them.
    pub rollback_on_failure: bool,

    /// Bearer token (alternative to BELLWIRE_API_TOKEN env var).
    pub api_token: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: None,
            site_url: None,
            poll_interval_secs: 30,
            fetch_limit: 10,
            request_timeout_secs: 15,
            rollback_on_failure: false,
            api_token: None,
        }
    }
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("base_url", &self.base_url)
            .field("site_url", &self.site_url)
            .field("poll_interval_secs", &self.poll_interval_secs)
            .field("fetch_limit", &self.fetch_limit)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("rollback_on_failure", &self.rollback_on_failure)
            .field("api_token", &self.api_token.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

/// Every key `Config` understands. Anything else in the file is reported.
const KNOWN_KEYS: &[&str] = &[
    "base_url",
    "site_url",
    "poll_interval_secs",
    "fetch_limit",
    "request_timeout_secs",
    "rollback_on_failure",
    "api_token",
];

/// Log keys serde will silently drop; usually a typo.
fn warn_unknown_keys(content: &str) {
    let Ok(table) = content.parse::<toml::Table>() else {
        // toml::from_str reports the syntax error with a line number
        return;
    };
    table
        .keys()
        .filter(|key| !KNOWN_KEYS.contains(&key.as_str()))
        .for_each(|key| tracing::warn!(key = %key, "Ignoring unknown config key"));
}

impl Config {
    /// Largest config file we are willing to read.
    const MAX_FILE_SIZE: u64 = 1024 * 1024;

    /// Largest page the dropdown will ask for.
    pub const MAX_FETCH_LIMIT: usize = 100;

    /// Longest gap between count polls (one day).
    pub const MAX_POLL_INTERVAL_SECS: u64 = 24 * 60 * 60;

    /// Read and validate the config at `path`.
    ///
    /// A missing or blank file is not an error and yields the defaults.
    /// Oversized files, bad TOML and out-of-range values are.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let size = match std::fs::metadata(path) {
            Ok(meta) => meta.len(),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "No config file, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(e.into()),
        };
        if size > Self::MAX_FILE_SIZE {
            return Err(ConfigError::TooLarge(format!(
                "{} is {} bytes, limit is {}",
                path.display(),
                size,
                Self::MAX_FILE_SIZE
            )));
        }

        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            // Removed between the metadata call and the read
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => return Err(e.into()),
        };
        if content.trim().is_empty() {
            tracing::debug!(path = %path.display(), "Config file is blank, using defaults");
            return Ok(Self::default());
        }

        warn_unknown_keys(&content);
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        tracing::info!(
            path = %path.display(),
            poll_interval_secs = config.poll_interval_secs,
            fetch_limit = config.fetch_limit,
            rollback_on_failure = config.rollback_on_failure,
            "Loaded configuration"
        );
        Ok(config)
    }

    /// Reject values the sync core cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.poll_interval_secs == 0 || self.poll_interval_secs > Self::MAX_POLL_INTERVAL_SECS {
            return Err(ConfigError::Invalid(format!(
                "poll_interval_secs must be between 1 and {}",
                Self::MAX_POLL_INTERVAL_SECS
            )));
        }
        if self.fetch_limit == 0 || self.fetch_limit > Self::MAX_FETCH_LIMIT {
            return Err(ConfigError::Invalid(format!(
                "fetch_limit must be between 1 and {}",
                Self::MAX_FETCH_LIMIT
            )));
        }
        if let Some(base) = &self.base_url {
            Url::parse(base)
                .map_err(|e| ConfigError::Invalid(format!("base_url: {}", e)))?;
        }
        if let Some(site) = &self.site_url {
            Url::parse(site)
                .map_err(|e| ConfigError::Invalid(format!("site_url: {}", e)))?;
        }
        if self.request_timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "request_timeout_secs must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// The token to authenticate with: `BELLWIRE_API_TOKEN` wins over the file.
    pub fn resolve_api_token(&self) -> Option<String> {
        std::env::var("BELLWIRE_API_TOKEN")
            .ok()
            .filter(|t| !t.is_empty())
            .or_else(|| self.api_token.clone())
    }

    /// Root that relative `actionUrl`s resolve against: `site_url` if set,
    /// otherwise the origin of `base_url`.
    pub fn site_root(&self) -> Option<Url> {
        if let Some(site) = &self.site_url {
            return Url::parse(site).ok();
        }
        let base = Url::parse(self.base_url.as_deref()?).ok()?;
        Url::parse(&base.origin().ascii_serialization()).ok()
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Settings for the notification sync core.
    pub fn sync_config(&self) -> SyncConfig {
        SyncConfig {
            poll_interval: Duration::from_secs(self.poll_interval_secs),
            fetch_limit: self.fetch_limit,
            rollback: if self.rollback_on_failure {
                RollbackPolicy::Revert
            } else {
                RollbackPolicy::Keep
            },
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn write_config(name: &str, content: &str) -> std::path::PathBuf {
        let dir = std::env::temp_dir().join(format!("bellwire_config_test_{}", name));
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
        assert!(config.base_url.is_none());
        assert_eq!(config.poll_interval_secs, 30);
        assert_eq!(config.fetch_limit, 10);
        assert!(!config.rollback_on_failure);
        assert!(config.api_token.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_missing_file_returns_default() {
        let path = Path::new("/tmp/bellwire_test_nonexistent_config.toml");
        let config = Config::load(path).unwrap();
        assert_eq!(config.poll_interval_secs, 30);
    }

    #[test]
    fn test_whitespace_only_file_returns_default() {
        let path = write_config("whitespace", "   \n  \n  ");
        let config = Config::load(&path).unwrap();
        assert_eq!(config.fetch_limit, 10);
        cleanup(&path);
    }

    #[test]
    fn test_partial_config_uses_defaults_for_missing() {
        let path = write_config("partial", "poll_interval_secs = 5\n");
        let config = Config::load(&path).unwrap();
        assert_eq!(config.poll_interval_secs, 5);
        assert_eq!(config.fetch_limit, 10); // default
        cleanup(&path);
    }

    #[test]
    fn test_full_config() {
        let content = r#"
base_url = "https://jobs.example.com/api"
site_url = "https://jobs.example.com"
poll_interval_secs = 60
fetch_limit = 20
request_timeout_secs = 5
rollback_on_failure = true
api_token = "secret-token"
"#;
        let path = write_config("full", content);
        let config = Config::load(&path).unwrap();
        assert_eq!(config.base_url.as_deref(), Some("https://jobs.example.com/api"));
        assert_eq!(config.site_url.as_deref(), Some("https://jobs.example.com"));
        assert_eq!(config.poll_interval_secs, 60);
        assert_eq!(config.fetch_limit, 20);
        assert_eq!(config.request_timeout(), Duration::from_secs(5));
        assert_eq!(config.sync_config().rollback, RollbackPolicy::Revert);
        assert_eq!(config.api_token.as_deref(), Some("secret-token"));
        cleanup(&path);
    }

    #[test]
    fn test_invalid_toml_returns_error() {
        let path = write_config("invalid", "this is not [valid toml");
        let err = Config::load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
        assert!(err.to_string().contains("not valid TOML"));
        cleanup(&path);
    }

    #[test]
    fn test_unknown_keys_accepted() {
        let path = write_config("unknown", "fetch_limit = 5\ntheme = \"dark\"\n");
        let config = Config::load(&path).unwrap();
        assert_eq!(config.fetch_limit, 5);
        cleanup(&path);
    }

    #[test]
    fn test_zero_poll_interval_rejected() {
        let path = write_config("zero_poll", "poll_interval_secs = 0\n");
        let err = Config::load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
        cleanup(&path);
    }

    #[test]
    fn test_poll_interval_upper_bound() {
        let mut config = Config::default();
        config.poll_interval_secs = Config::MAX_POLL_INTERVAL_SECS;
        assert!(config.validate().is_ok());
        config.poll_interval_secs = u64::MAX;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_invalid_base_url_rejected() {
        let path = write_config("bad_base", "base_url = \"not a url\"\n");
        let err = Config::load(&path).unwrap_err();
        assert!(err.to_string().contains("base_url"));
        cleanup(&path);
    }

    #[test]
    fn test_fetch_limit_bounds() {
        let mut config = Config::default();
        config.fetch_limit = 0;
        assert!(config.validate().is_err());
        config.fetch_limit = Config::MAX_FETCH_LIMIT + 1;
        assert!(config.validate().is_err());
        config.fetch_limit = Config::MAX_FETCH_LIMIT;
        assert!(config.validate().is_ok());
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
    fn test_sync_config_defaults_keep_optimistic_state() {
        let sync = Config::default().sync_config();
        assert_eq!(sync.poll_interval, Duration::from_secs(30));
        assert_eq!(sync.fetch_limit, 10);
        assert_eq!(sync.rollback, RollbackPolicy::Keep);
    }

    #[test]
    fn test_debug_masks_api_token() {
        let mut config = Config::default();
        config.api_token = Some("super-secret-token-12345".to_string());

        let debug_output = format!("{:?}", config);
        assert!(!debug_output.contains("super-secret-token-12345"));
        assert!(debug_output.contains("[REDACTED]"));
    }

    #[test]
    fn test_site_root_defaults_to_base_origin() {
        let config = Config {
            base_url: Some("https://jobs.example.com/api/v1".to_string()),
            ..Config::default()
        };
        assert_eq!(
            config.site_root().map(|u| u.to_string()),
            Some("https://jobs.example.com/".to_string())
        );
    }

    #[test]
    fn test_site_root_prefers_site_url() {
        let config = Config {
            base_url: Some("https://api.example.com".to_string()),
            site_url: Some("https://www.example.com/app/".to_string()),
            ..Config::default()
        };
        assert_eq!(
            config.site_root().map(|u| u.to_string()),
            Some("https://www.example.com/app/".to_string())
        );
    }

    #[test]
    fn test_invalid_site_url_rejected() {
        let path = write_config("bad_site.toml", "site_url = \"not a url\"\n");
        let result = Config::load(&path);
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
        cleanup(&path);
    }
}
