//! Resonance configuration
//!
//! Engine tuning and gateway settings in one place. Loaded from TOML at
//! startup, falls back to defaults if no config file exists or it does not
//! parse.

use crate::error::{Error, Result};
use crate::types::GatewayConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Top-level configuration file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ResonanceConfig {
    /// Analytics engine parameters.
    pub engine: EngineConfig,
    /// Gateway bind/auth parameters.
    pub gateway: GatewayConfig,
}

/// Engine parameters. Immutable once the engine is built.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EngineConfig {
    /// Retained moments before the oldest are evicted.
    pub max_moments: usize,
    /// Retained-moment count at which a concept becomes a pattern.
    pub pattern_min_frequency: usize,
    /// Carried for compatibility. No pass gates on it.
    pub coupling_threshold: f64,
    /// Coherence window in milliseconds.
    pub coherence_window_ms: u64,
    /// Run the harmonic pass after every ingestion.
    pub enable_auto_amplification: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_moments: 1000,
            pattern_min_frequency: 2,
            coupling_threshold: 0.3,
            coherence_window_ms: 300_000,
            enable_auto_amplification: true,
        }
    }
}

impl EngineConfig {
    /// Coherence window in seconds, the unit moment timestamps use.
    pub fn coherence_window_secs(&self) -> f64 {
        self.coherence_window_ms as f64 / 1000.0
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_moments == 0 {
            return Err(Error::config("engine.max_moments must be at least 1"));
        }
        Ok(())
    }
}

// ============================================================
// Loading
// ============================================================

impl ResonanceConfig {
    /// Load config from a TOML file.
    ///
    /// A missing file or a TOML syntax error falls back to defaults. A file
    /// that parses but fails validation is an error, so a bad value never
    /// silently discards the rest of the file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!("No config at {}, using defaults", path.display());
                return Ok(Self::default());
            }
            Err(e) => return Err(e.into()),
        };
        let config: Self = match toml::from_str(&content) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!("Failed to parse {}, using defaults: {}", path.display(), e);
                return Ok(Self::default());
            }
        };
        config.engine.validate()?;
        tracing::info!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Parse and validate a TOML document.
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content).map_err(|e| Error::config(e.to_string()))?;
        config.engine.validate()?;
        Ok(config)
    }

    /// Write the current config as TOML (for generating a default config file).
    pub fn to_toml(&self) -> String {
        toml::to_string_pretty(self).unwrap_or_default()
    }
}
