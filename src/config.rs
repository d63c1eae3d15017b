//! Model configuration parameters
//!
//! Tunables shared by the input sources and the control loop.  Loaded once
//! at startup, either from JSON (host tools, provisioning) or from a compact
//! postcard blob kept in flash.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Default debounce window for mechanical contacts (milliseconds).
pub const DEFAULT_DEBOUNCE_MS: u32 = 50;

/// Default control-loop sleep between iterations (milliseconds).
pub const DEFAULT_POLL_INTERVAL_MS: u32 = 100;

/// Core model configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Minimum time between two accepted level changes on one input
    pub debounce_ms: u32,
    /// Sleep between control-loop iterations; 0 spins without sleeping
    pub poll_interval_ms: u32,
    /// Report every accepted/ignored event and every state change at `info`
    pub debug: bool,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            debounce_ms: DEFAULT_DEBOUNCE_MS,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            debug: false,
        }
    }
}

impl ModelConfig {
    /// Reject values that would make inputs unusable or stall the loop.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.debounce_ms > 1_000 {
            return Err(ConfigError::ValidationFailed("debounce_ms must be <= 1000"));
        }
        if self.poll_interval_ms > 60_000 {
            return Err(ConfigError::ValidationFailed(
                "poll_interval_ms must be <= 60000",
            ));
        }
        Ok(())
    }

    /// Parse and validate a JSON document.  Missing fields take defaults.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Encode for flash storage.
    pub fn to_bytes(&self) -> Result<Vec<u8>, ConfigError> {
        postcard::to_allocvec(self).map_err(|_| ConfigError::Encode)
    }

    /// Decode and validate a blob produced by [`to_bytes`](Self::to_bytes).
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ConfigError> {
        let config: Self =
            postcard::from_bytes(bytes).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }
}
