//! Core configuration, loaded from YAML.
//!
//! Every section has defaults, so an empty document is a valid configuration:
//!
//! ```yaml
//! endpoint:
//!   host: 192.168.4.1
//!   port: 10110
//!   protocol: auto
//! reconnect:
//!   ladder_ms: [1000, 2000, 4000, 8000, 15000]
//!   max_attempts: 10
//! history:
//!   capacity: 600
//!   window_secs: 3600
//! units:
//!   depth: foot
//!   boatSpeed: knot
//! thresholds:
//!   - key: depth/0/depth
//!     direction: below
//!     critical: 2.0
//!     warning: 5.0
//!     warning_hysteresis: 0.3
//! ```

use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

use crate::Result;
use crate::alarm::ThresholdConfig;
use crate::enrich::UnitPreferences;
use crate::store::HistoryConfig;
use crate::transport::{DEFAULT_MAX_BUFFER, Endpoint, ReconnectPolicy};
use crate::types::MetricKey;

/// A threshold bound to a metric key written as `sensor/instance/field`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThresholdEntry {
    pub key: String,
    #[serde(flatten)]
    pub config: ThresholdConfig,
}

impl ThresholdEntry {
    pub fn new(key: &MetricKey, config: ThresholdConfig) -> Self {
        Self { key: key.to_string(), config }
    }

    pub fn metric_key(&self) -> Result<MetricKey> {
        self.key.parse()
    }
}

/// Everything needed to build a [`crate::Bridgewatch`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoreConfig {
    /// Connected on start when present
    pub endpoint: Option<Endpoint>,
    pub reconnect: ReconnectPolicy,
    pub history: HistoryConfig,
    /// Bound on a partially received unit, in bytes
    pub max_buffer: usize,
    /// Reject sentences without a `*hh` checksum
    pub require_checksum: bool,
    pub units: UnitPreferences,
    pub thresholds: Vec<ThresholdEntry>,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            reconnect: ReconnectPolicy::default(),
            history: HistoryConfig::default(),
            max_buffer: DEFAULT_MAX_BUFFER,
            require_checksum: true,
            units: UnitPreferences::default(),
            thresholds: Vec::new(),
        }
    }
}

impl CoreConfig {
    /// Parse and validate a YAML document.
    pub fn from_yaml_str(yaml: &str) -> anyhow::Result<Self> {
        let config: CoreConfig =
            serde_yaml_ng::from_str(yaml).context("Failed to parse configuration YAML")?;
        config.validate().context("Configuration is invalid")?;
        Ok(config)
    }

    /// Read, parse and validate a YAML file.
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let yaml = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read configuration from {}", path.display()))?;
        let config = Self::from_yaml_str(&yaml)
            .with_context(|| format!("Failed to load configuration from {}", path.display()))?;
        info!(path = %path.display(), thresholds = config.thresholds.len(), "Configuration loaded");
        Ok(config)
    }

    pub fn to_yaml_string(&self) -> anyhow::Result<String> {
        serde_yaml_ng::to_string(self).context("Failed to serialize configuration")
    }

    pub fn validate(&self) -> Result<()> {
        if let Some(endpoint) = &self.endpoint {
            endpoint.validate()?;
        }
        self.reconnect.validate()?;
        self.history.validate()?;
        if self.max_buffer < 16 {
            return Err(crate::TelemetryError::config("max_buffer must be at least 16 bytes"));
        }
        self.units.validate()?;
        for (key, config) in self.threshold_pairs()? {
            config.validate(&key)?;
        }
        Ok(())
    }

    /// Thresholds with their keys parsed.
    pub fn threshold_pairs(&self) -> Result<Vec<(MetricKey, ThresholdConfig)>> {
        self.thresholds
            .iter()
            .map(|entry| Ok((entry.metric_key()?, entry.config)))
            .collect()
    }
}
