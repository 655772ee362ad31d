//! Configuration Loader
//!
//! Loads and validates configuration from TOML files matching
//! config/default.toml structure.

use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use crate::domain::{AdmissionController, NetworkThresholds};

/// Main configuration structure matching the TOML file.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub tracking: TrackingSection,
    pub price_source: PriceSourceSection,
    pub database: DatabaseSection,
    pub logging: LoggingSection,
    #[serde(default)]
    pub admission: AdmissionSection,
}

/// Tracking scheduler section
#[derive(Debug, Clone, Deserialize)]
pub struct TrackingSection {
    /// Seconds between tracking cycles
    pub poll_interval_secs: u64,
    /// Hours after which an unresolved alert is force-closed as TIMEOUT
    pub expiry_horizon_hours: f64,
    /// Delay between price lookups inside a cycle (upstream rate limits)
    pub rate_delay_ms: u64,
}

/// Price source section
#[derive(Debug, Clone, Deserialize)]
pub struct PriceSourceSection {
    /// GeckoTerminal API base URL
    pub api_url: String,
    /// Per-call timeout; exceeding it counts as an adapter failure
    pub timeout_secs: u64,
}

/// Database section
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseSection {
    /// SQLite database path (~ is expanded)
    pub path: String,
}

impl DatabaseSection {
    /// Database path with `~` expanded and DATABASE_PATH env override.
    pub fn resolved_path(&self) -> String {
        let raw = std::env::var("DATABASE_PATH").unwrap_or_else(|_| self.path.clone());
        shellexpand::tilde(&raw).to_string()
    }
}

/// Logging section
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingSection {
    /// Log level: "trace", "debug", "info", "warn", "error"
    pub level: String,
}

/// Admission thresholds section. Omitting it keeps the calibrated
/// production table.
#[derive(Debug, Clone, Deserialize)]
pub struct AdmissionSection {
    pub default: NetworkThresholds,
    #[serde(default)]
    pub networks: HashMap<String, NetworkThresholds>,
}

impl Default for AdmissionSection {
    fn default() -> Self {
        Self {
            default: NetworkThresholds::conservative_default(),
            networks: HashMap::new(),
        }
    }
}

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Failed to parse TOML: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error("Validation failed: {0}")]
    ValidationError(String),
}

/// Load configuration from a TOML file.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let config: Config = toml::from_str(&content)?;
    config.validate()?;
    Ok(config)
}

impl Config {
    /// Validate all configuration parameters.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tracking.poll_interval_secs == 0 {
            return Err(ConfigError::ValidationError(
                "poll_interval_secs must be > 0".to_string(),
            ));
        }

        if self.tracking.expiry_horizon_hours <= 0.0 {
            return Err(ConfigError::ValidationError(format!(
                "expiry_horizon_hours must be > 0, got {}",
                self.tracking.expiry_horizon_hours
            )));
        }

        if self.price_source.api_url.is_empty() {
            return Err(ConfigError::ValidationError(
                "api_url cannot be empty".to_string(),
            ));
        }

        if self.price_source.timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "timeout_secs must be > 0".to_string(),
            ));
        }

        if self.database.path.is_empty() {
            return Err(ConfigError::ValidationError(
                "database path cannot be empty".to_string(),
            ));
        }

        let mut tables = vec![("default", &self.admission.default)];
        for (network, thresholds) in &self.admission.networks {
            tables.push((network.as_str(), thresholds));
        }
        for (name, t) in tables {
            if t.min_liquidity_usd < 0.0 || t.min_volume_24h_usd < 0.0 {
                return Err(ConfigError::ValidationError(format!(
                    "admission thresholds for '{}' must be non-negative",
                    name
                )));
            }
        }

        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.tracking.poll_interval_secs)
    }

    pub fn rate_delay(&self) -> Duration {
        Duration::from_millis(self.tracking.rate_delay_ms)
    }

    pub fn price_timeout(&self) -> Duration {
        Duration::from_secs(self.price_source.timeout_secs)
    }

    /// Build the admission controller from the configured table.
    pub fn admission_controller(&self) -> AdmissionController {
        AdmissionController::new(self.admission.networks.clone(), self.admission.default)
    }
}
