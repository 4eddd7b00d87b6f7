//! Configuration management for the Ouroboros client
//!
//! Configuration is an explicit value handed to the client constructor.
//! Sources are layered: defaults, then `.oo/config.toml`, then `OO_*`
//! environment variables, then whatever the caller sets last.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::{OoError, Result};

/// Default location of the config file, relative to the working directory
pub const CONFIG_FILE: &str = ".oo/config.toml";

/// Client configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OoConfig {
    /// Base URL of the compute API
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Per-request timeout in seconds; 0 disables the timeout
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Retries after a transport failure (attempts = retries + 1)
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Backoff unit; retry `k` waits `retry_base_delay_ms * 2^k`
    #[serde(default = "default_retry_base_delay_ms")]
    pub retry_base_delay_ms: u64,

    /// Seconds between execution status checks
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,

    /// Seconds to wait for an execution before giving up
    #[serde(default = "default_max_wait_secs")]
    pub max_wait_secs: u64,

    /// Workspace directory forwarded to graph and workflow executions
    #[serde(default)]
    pub system_workspace: Option<String>,
}

// Default value providers
fn default_api_url() -> String {
    "http://localhost:5001".to_string()
}

fn default_timeout_secs() -> u64 {
    300
}

fn default_max_retries() -> u32 {
    3
}

fn default_retry_base_delay_ms() -> u64 {
    1000
}

fn default_poll_interval_secs() -> u64 {
    5
}

fn default_max_wait_secs() -> u64 {
    3600
}

impl OoConfig {
    /// Load configuration from `path`, or use defaults when it does not exist
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            toml::from_str(&content).map_err(|e| {
                OoError::Config(format!("Failed to parse {}: {}", path.display(), e))
            })
        } else {
            tracing::debug!("No config file at {}, using defaults", path.display());
            Ok(Self::default())
        }
    }

    /// Load `.oo/config.toml` from the working directory and apply `OO_*` overrides
    pub fn discover() -> Result<Self> {
        Self::load_or_default(Path::new(CONFIG_FILE))?.with_env_overrides()
    }

    /// Apply the `OO_*` environment variables (see `with_overrides_from`)
    pub fn with_env_overrides(self) -> Result<Self> {
        self.with_overrides_from(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary key lookup
    ///
    /// Keys: `OO_API_URL`, `OO_TIMEOUT_SECS`, `OO_MAX_RETRIES`,
    /// `OO_RETRY_BASE_DELAY_MS`, `OO_POLL_INTERVAL_SECS`, `OO_MAX_WAIT_SECS`,
    /// `OO_SYSTEM_WORKSPACE`.
    pub fn with_overrides_from<F>(mut self, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("OO_API_URL") {
            self.api_url = url;
        }
        if let Some(timeout) = lookup("OO_TIMEOUT_SECS") {
            self.timeout_secs = parse_number("OO_TIMEOUT_SECS", &timeout)?;
        }
        if let Some(retries) = lookup("OO_MAX_RETRIES") {
            self.max_retries = parse_number("OO_MAX_RETRIES", &retries)?;
        }
        if let Some(delay) = lookup("OO_RETRY_BASE_DELAY_MS") {
            self.retry_base_delay_ms = parse_number("OO_RETRY_BASE_DELAY_MS", &delay)?;
        }
        if let Some(interval) = lookup("OO_POLL_INTERVAL_SECS") {
            self.poll_interval_secs = parse_number("OO_POLL_INTERVAL_SECS", &interval)?;
        }
        if let Some(max_wait) = lookup("OO_MAX_WAIT_SECS") {
            self.max_wait_secs = parse_number("OO_MAX_WAIT_SECS", &max_wait)?;
        }
        if let Some(workspace) = lookup("OO_SYSTEM_WORKSPACE") {
            self.system_workspace = Some(workspace);
        }
        Ok(self)
    }

    /// Check the configuration and normalize the base URL
    pub fn validate(mut self) -> Result<Self> {
        let trimmed = self.api_url.trim().trim_end_matches('/');
        if trimmed.is_empty() {
            return Err(OoError::Config("api_url must not be empty".to_string()));
        }
        if !(trimmed.starts_with("http://") || trimmed.starts_with("https://")) {
            return Err(OoError::Config(format!(
                "api_url must start with http:// or https://, got {}",
                trimmed
            )));
        }
        self.api_url = trimmed.to_string();
        Ok(self)
    }

    /// Request timeout, `None` when disabled
    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_secs > 0).then(|| Duration::from_secs(self.timeout_secs))
    }

    pub fn retry_base_delay(&self) -> Duration {
        Duration::from_millis(self.retry_base_delay_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn max_wait(&self) -> Duration {
        Duration::from_secs(self.max_wait_secs)
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| OoError::Config(format!("{} must be a non-negative integer, got {:?}", key, value)))
}

impl Default for OoConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            timeout_secs: default_timeout_secs(),
            max_retries: default_max_retries(),
            retry_base_delay_ms: default_retry_base_delay_ms(),
            poll_interval_secs: default_poll_interval_secs(),
            max_wait_secs: default_max_wait_secs(),
            system_workspace: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = OoConfig::default();
        assert_eq!(config.api_url, "http://localhost:5001");
        assert_eq!(config.timeout(), Some(Duration::from_secs(300)));
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.retry_base_delay(), Duration::from_secs(1));
        assert_eq!(config.poll_interval(), Duration::from_secs(5));
        assert_eq!(config.max_wait(), Duration::from_secs(3600));
        assert!(config.system_workspace.is_none());
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = OoConfig::load_or_default(&dir.path().join("config.toml")).unwrap();
        assert_eq!(config, OoConfig::default());
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "api_url = \"https://compute.example.com/\"\nmax_retries = 5\n",
        )
        .unwrap();

        let config = OoConfig::load_or_default(&path).unwrap();
        assert_eq!(config.api_url, "https://compute.example.com/");
        assert_eq!(config.max_retries, 5);
        assert_eq!(config.timeout_secs, 300);
    }

    #[test]
    fn test_invalid_file_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "max_retries = \"many\"").unwrap();

        let err = OoConfig::load_or_default(&path).unwrap_err();
        assert!(matches!(err, OoError::Config(_)));
    }

    #[test]
    fn test_overrides() {
        let vars: HashMap<&str, &str> = [
            ("OO_API_URL", "http://compute:8080"),
            ("OO_TIMEOUT_SECS", "0"),
            ("OO_MAX_RETRIES", "1"),
            ("OO_SYSTEM_WORKSPACE", "/srv/workspace"),
        ]
        .into_iter()
        .collect();

        let config = OoConfig::default()
            .with_overrides_from(|key| vars.get(key).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.api_url, "http://compute:8080");
        assert_eq!(config.timeout(), None);
        assert_eq!(config.max_retries, 1);
        assert_eq!(config.system_workspace.as_deref(), Some("/srv/workspace"));
    }

    #[test]
    fn test_timing_overrides() {
        let vars: HashMap<&str, &str> = [
            ("OO_RETRY_BASE_DELAY_MS", "250"),
            ("OO_POLL_INTERVAL_SECS", "2"),
            ("OO_MAX_WAIT_SECS", "90"),
        ]
        .into_iter()
        .collect();

        let config = OoConfig::default()
            .with_overrides_from(|key| vars.get(key).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.retry_base_delay(), Duration::from_millis(250));
        assert_eq!(config.poll_interval(), Duration::from_secs(2));
        assert_eq!(config.max_wait(), Duration::from_secs(90));
        assert_eq!(config.max_retries, 3);

        let result = OoConfig::default().with_overrides_from(|key| {
            (key == "OO_MAX_WAIT_SECS").then(|| "-1".to_string())
        });
        assert!(matches!(result, Err(OoError::Config(_))));
    }

    #[test]
    fn test_bad_override_is_rejected() {
        let result = OoConfig::default().with_overrides_from(|key| {
            (key == "OO_MAX_RETRIES").then(|| "three".to_string())
        });
        assert!(matches!(result, Err(OoError::Config(_))));
    }

    #[test]
    fn test_validate_trims_trailing_slash() {
        let config = OoConfig {
            api_url: "http://localhost:5001///".to_string(),
            ..OoConfig::default()
        };
        assert_eq!(config.validate().unwrap().api_url, "http://localhost:5001");
    }

    #[test]
    fn test_validate_rejects_bad_urls() {
        for url in ["", "   ", "localhost:5001", "ftp://host"] {
            let config = OoConfig {
                api_url: url.to_string(),
                ..OoConfig::default()
            };
            assert!(config.validate().is_err(), "accepted {:?}", url);
        }
    }
}
