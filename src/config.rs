//! Runtime configuration.
//!
//! Layered as: defaults, then an optional TOML file, then `PAYGATE_*`
//! environment variables, then command-line flags (applied by the binary).

use crate::error::{PaymentError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub storage: StorageConfig,
    pub authorizer: AuthorizerConfig,
    pub ledger: LedgerConfig,
    pub log: LogConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// RocksDB directory. In-memory storage when absent.
    pub db_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum AuthorizerMode {
    Http,
    AlwaysApprove,
    AlwaysDeny,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthorizerConfig {
    pub mode: AuthorizerMode,
    pub url: Option<String>,
    pub timeout_ms: u64,
}

impl Default for AuthorizerConfig {
    fn default() -> Self {
        Self {
            mode: AuthorizerMode::AlwaysApprove,
            url: None,
            timeout_ms: 5_000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// Upper bound on waiting for a row lock.
    pub lock_timeout_ms: u64,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            lock_timeout_ms: 5_000,
        }
    }
}

impl LedgerConfig {
    pub fn lock_timeout(&self) -> Duration {
        Duration::from_millis(self.lock_timeout_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// `EnvFilter` directives; `RUST_LOG` wins when set.
    pub filter: String,
    pub json: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
            json: false,
        }
    }
}

impl Config {
    /// Load from a TOML file. Missing keys take their defaults.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content)
            .map_err(|e| PaymentError::Config(format!("Failed to parse config: {}", e)))
    }

    /// Overlay `PAYGATE_*` environment variables.
    pub fn apply_env(&mut self) -> Result<()> {
        self.apply_vars(|key| std::env::var(key).ok())
    }

    fn apply_vars(&mut self, var: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(path) = var("PAYGATE_DB_PATH") {
            self.storage.db_path = Some(PathBuf::from(path));
        }
        if let Some(mode) = var("PAYGATE_AUTHORIZER_MODE") {
            self.authorizer.mode = parse_mode(&mode)?;
        }
        if let Some(url) = var("PAYGATE_AUTHORIZER_URL") {
            self.authorizer.url = Some(url);
        }
        if let Some(ms) = var("PAYGATE_AUTHORIZER_TIMEOUT_MS") {
            self.authorizer.timeout_ms = parse_millis("PAYGATE_AUTHORIZER_TIMEOUT_MS", &ms)?;
        }
        if let Some(ms) = var("PAYGATE_LOCK_TIMEOUT_MS") {
            self.ledger.lock_timeout_ms = parse_millis("PAYGATE_LOCK_TIMEOUT_MS", &ms)?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.authorizer.timeout_ms == 0 {
            return Err(PaymentError::Config(
                "authorizer.timeout_ms must be greater than zero".to_string(),
            ));
        }
        if self.ledger.lock_timeout_ms == 0 {
            return Err(PaymentError::Config(
                "ledger.lock_timeout_ms must be greater than zero".to_string(),
            ));
        }
        if self.authorizer.mode == AuthorizerMode::Http && self.authorizer.url.is_none() {
            return Err(PaymentError::Config(
                "authorizer.url is required when authorizer.mode = \"http\"".to_string(),
            ));
        }
        Ok(())
    }
}

fn parse_mode(value: &str) -> Result<AuthorizerMode> {
    match value.trim().to_ascii_lowercase().as_str() {
        "http" => Ok(AuthorizerMode::Http),
        "always-approve" | "approve" => Ok(AuthorizerMode::AlwaysApprove),
        "always-deny" | "deny" => Ok(AuthorizerMode::AlwaysDeny),
        other => Err(PaymentError::Config(format!(
            "Unknown authorizer mode '{}'",
            other
        ))),
    }
}

fn parse_millis(key: &str, value: &str) -> Result<u64> {
    value
        .trim()
        .parse()
        .map_err(|_| PaymentError::Config(format!("{} must be a number of milliseconds", key)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.authorizer.mode, AuthorizerMode::AlwaysApprove);
        assert_eq!(config.authorizer.timeout_ms, 5_000);
        assert_eq!(config.ledger.lock_timeout(), Duration::from_secs(5));
        assert!(config.storage.db_path.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = Config::from_toml(
            r#"
            [authorizer]
            mode = "http"
            url = "http://localhost:9999/authorize"
            "#,
        )
        .unwrap();
        assert_eq!(config.authorizer.mode, AuthorizerMode::Http);
        assert_eq!(config.authorizer.timeout_ms, 5_000);
        assert_eq!(config.log.filter, "info");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_http_without_url_is_invalid() {
        let config = Config::from_toml("[authorizer]\nmode = \"http\"\n").unwrap();
        assert!(matches!(config.validate(), Err(PaymentError::Config(_))));
    }

    #[test]
    fn test_malformed_toml() {
        assert!(matches!(
            Config::from_toml("[ledger]\nlock_timeout_ms = \"soon\""),
            Err(PaymentError::Config(_))
        ));
    }

    #[test]
    fn test_env_overrides() {
        let vars: HashMap<&str, &str> = HashMap::from([
            ("PAYGATE_AUTHORIZER_MODE", "deny"),
            ("PAYGATE_LOCK_TIMEOUT_MS", "250"),
            ("PAYGATE_DB_PATH", "/tmp/ledger"),
        ]);
        let mut config = Config::default();
        config
            .apply_vars(|key| vars.get(key).map(|v| v.to_string()))
            .unwrap();
        assert_eq!(config.authorizer.mode, AuthorizerMode::AlwaysDeny);
        assert_eq!(config.ledger.lock_timeout_ms, 250);
        assert_eq!(config.storage.db_path, Some(PathBuf::from("/tmp/ledger")));
    }

    #[test]
    fn test_bad_env_value() {
        let mut config = Config::default();
        let result = config.apply_vars(|key| {
            (key == "PAYGATE_AUTHORIZER_TIMEOUT_MS").then(|| "fast".to_string())
        });
        assert!(matches!(result, Err(PaymentError::Config(_))));
    }
}
