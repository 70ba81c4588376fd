//! Pipeline timing configuration.
//!
//! Every delay is expressed in "time units" so a whole session can be sped
//! up or slowed down by changing `time_unit_ms` alone.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config json: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Length of one time unit in milliseconds.
    pub time_unit_ms: u64,
    /// Executing -> Completed.
    pub intent_execution_units: u32,
    /// Unverified -> Verified.
    pub prediction_verification_units: u32,
    /// Pending -> Completed.
    pub transaction_settlement_units: u32,
    /// Any non-terminal record older than this (counted from the start of
    /// its processing stage) is failed with "timed out".
    pub max_wait_units: u32,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            time_unit_ms: 1000,
            intent_execution_units: 5,
            prediction_verification_units: 3,
            transaction_settlement_units: 3,
            max_wait_units: 30,
        }
    }
}

impl PipelineConfig {
    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json_str(&raw)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.time_unit_ms == 0 {
            return Err(ConfigError::Invalid("time_unit_ms must be positive".into()));
        }
        let longest = self
            .intent_execution_units
            .max(self.prediction_verification_units)
            .max(self.transaction_settlement_units);
        if self.max_wait_units <= longest {
            return Err(ConfigError::Invalid(format!(
                "max_wait_units ({}) must exceed every stage delay ({longest})",
                self.max_wait_units
            )));
        }
        Ok(())
    }

    fn units(&self, n: u32) -> Duration {
        Duration::from_millis(self.time_unit_ms.saturating_mul(u64::from(n)))
    }

    pub fn intent_execution_delay(&self) -> Duration {
        self.units(self.intent_execution_units)
    }

    pub fn prediction_verification_delay(&self) -> Duration {
        self.units(self.prediction_verification_units)
    }

    pub fn transaction_settlement_delay(&self) -> Duration {
        self.units(self.transaction_settlement_units)
    }

    pub fn max_wait(&self) -> Duration {
        self.units(self.max_wait_units)
    }
}
