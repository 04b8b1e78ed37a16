//! # Runtime Configuration
//!
//! Layered: defaults, then an optional TOML file, then environment, then
//! command-line flags (applied by the binary).
//!
//! ```toml
//! node_url = "ws://127.0.0.1:9944"
//! app_name = "Xenon DID Dashboard"
//!
//! [connection]
//! connect_timeout = "10s"
//! request_timeout = "30s"
//!
//! [engine]
//! confirmation = "finalized"
//! inclusion_timeout = "5m"
//! serialize_same_kind = true
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;
use xn_01_connection_manager::{ConnectionConfig, DEFAULT_NODE_URL};
use xn_04_submission_engine::{parse_deadline, EngineConfig};

/// Name the client announces to the account provider.
pub const DEFAULT_APP_NAME: &str = "Xenon DID Dashboard";

pub const ENV_NODE_URL: &str = "XENON_NODE_URL";
pub const ENV_CONFIRMATION: &str = "XENON_CONFIRMATION";
pub const ENV_INCLUSION_TIMEOUT: &str = "XENON_INCLUSION_TIMEOUT";

/// Complete client configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    pub node_url: String,
    pub app_name: String,
    pub connection: ConnectionConfig,
    pub engine: EngineConfig,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            node_url: DEFAULT_NODE_URL.to_string(),
            app_name: DEFAULT_APP_NAME.to_string(),
            connection: ConnectionConfig::default(),
            engine: EngineConfig::default(),
        }
    }
}

impl RuntimeConfig {
    /// Read `path` as TOML. Missing keys keep their defaults.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        let config = Self::from_toml(&content)?;
        info!(path = %path.display(), "Loaded configuration file");
        Ok(config)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Defaults, overlaid with `path` if given, then the process environment.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `XENON_*` overrides read through `lookup`.
    pub fn apply_env(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        if let Some(url) = lookup(ENV_NODE_URL) {
            self.node_url = url;
        }
        if let Some(value) = lookup(ENV_CONFIRMATION) {
            self.engine.confirmation = value.parse().map_err(|e| ConfigError::Env {
                var: ENV_CONFIRMATION,
                reason: format!("{e}"),
            })?;
        }
        if let Some(value) = lookup(ENV_INCLUSION_TIMEOUT) {
            self.engine.inclusion_timeout =
                parse_deadline(&value).map_err(|e| ConfigError::Env {
                    var: ENV_INCLUSION_TIMEOUT,
                    reason: e.to_string(),
                })?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.node_url.trim().is_empty() {
            return Err(ConfigError::Invalid("node_url cannot be empty".into()));
        }
        if self.app_name.trim().is_empty() {
            return Err(ConfigError::Invalid("app_name cannot be empty".into()));
        }
        self.connection.validate()?;
        self.engine.validate()?;
        Ok(())
    }
}

/// Configuration errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("cannot read {}: {reason}", path.display())]
    Read { path: PathBuf, reason: String },

    #[error("invalid configuration file: {0}")]
    Parse(String),

    #[error("invalid value in {var}: {reason}")]
    Env { var: &'static str, reason: String },

    #[error("invalid configuration: {0}")]
    Invalid(String),

    #[error("connection: {0}")]
    Connection(#[from] xn_01_connection_manager::ConfigError),

    #[error("engine: {0}")]
    Engine(#[from] xn_04_submission_engine::ConfigError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::time::Duration;
    use xn_04_submission_engine::Confirmation;

    #[test]
    fn test_defaults() {
        let config = RuntimeConfig::default();
        assert_eq!(config.node_url, "ws://127.0.0.1:9944");
        assert_eq!(config.app_name, "Xenon DID Dashboard");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_file() {
        let config = RuntimeConfig::from_toml(
            r#"
            node_url = "ws://node.example:9944"

            [engine]
            confirmation = "finalized"
            "#,
        )
        .unwrap();
        assert_eq!(config.node_url, "ws://node.example:9944");
        assert_eq!(config.engine.confirmation, Confirmation::Finalized);
        assert_eq!(config.connection, ConnectionConfig::default());
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            (ENV_NODE_URL, "ws://10.0.0.2:9944"),
            (ENV_CONFIRMATION, "finalized"),
            (ENV_INCLUSION_TIMEOUT, "90s"),
        ]
        .into_iter()
        .collect();

        let mut config = RuntimeConfig::default();
        config
            .apply_env(|key| env.get(key).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.node_url, "ws://10.0.0.2:9944");
        assert_eq!(config.engine.confirmation, Confirmation::Finalized);
        assert_eq!(config.engine.inclusion_timeout, Some(Duration::from_secs(90)));
    }

    #[test]
    fn test_bad_env_value() {
        let mut config = RuntimeConfig::default();
        let err = config
            .apply_env(|key| (key == ENV_CONFIRMATION).then(|| "soon".to_string()))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Env { var: ENV_CONFIRMATION, .. }));
    }

    #[test]
    fn test_zero_timeout_invalid() {
        let config = RuntimeConfig::from_toml(
            r#"
            [connection]
            request_timeout = "0s"
            "#,
        )
        .unwrap();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Connection(_))
        ));
    }
}
