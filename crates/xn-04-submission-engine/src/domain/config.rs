//! Engine configuration.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// How strong a confirmation resolves a submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Confirmation {
    /// Resolve once the operation is in a block.
    #[default]
    InBlock,
    /// Wait until that block is finalized.
    Finalized,
}

impl fmt::Display for Confirmation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Confirmation::InBlock => f.write_str("inBlock"),
            Confirmation::Finalized => f.write_str("finalized"),
        }
    }
}

impl FromStr for Confirmation {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "inBlock" => Ok(Confirmation::InBlock),
            "finalized" => Ok(Confirmation::Finalized),
            other => Err(ConfigError::UnknownConfirmation(other.to_string())),
        }
    }
}

/// Submission engine configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub confirmation: Confirmation,

    /// Deadline for reaching the required confirmation once submitted.
    /// `None` waits indefinitely.
    #[serde(with = "deadline")]
    pub inclusion_timeout: Option<Duration>,

    /// Run same-kind submissions from this engine one at a time, so that
    /// matching by event tag cannot confuse two of them.
    pub serialize_same_kind: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            confirmation: Confirmation::InBlock,
            inclusion_timeout: Some(Duration::from_secs(300)),
            serialize_same_kind: true,
        }
    }
}

impl EngineConfig {
    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.inclusion_timeout.is_some_and(|t| t.is_zero()) {
            return Err(ConfigError::InvalidTimeout(
                "inclusion_timeout cannot be 0 (use \"off\" to disable)".into(),
            ));
        }
        Ok(())
    }
}

/// Written in place of a duration to disable the inclusion deadline.
pub const NO_DEADLINE: &str = "off";

/// Parse an inclusion deadline: a duration such as `"90s"` or `"5m"`, or
/// `"off"`.
pub fn parse_deadline(s: &str) -> Result<Option<Duration>, ConfigError> {
    match s.trim() {
        NO_DEADLINE => Ok(None),
        other => humantime::parse_duration(other)
            .map(Some)
            .map_err(|e| ConfigError::InvalidTimeout(format!("`{other}`: {e}"))),
    }
}

mod deadline {
    use super::*;

    pub fn serialize<S: Serializer>(
        timeout: &Option<Duration>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match timeout {
            Some(d) => serializer.collect_str(&humantime::format_duration(*d)),
            None => serializer.serialize_str(NO_DEADLINE),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Duration>, D::Error> {
        let s = String::deserialize(deserializer)?;
        parse_deadline(&s).map_err(serde::de::Error::custom)
    }
}

/// Configuration errors
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("unknown confirmation `{0}` (expected inBlock or finalized)")]
    UnknownConfirmation(String),
    #[error("invalid timeout: {0}")]
    InvalidTimeout(String),
}
