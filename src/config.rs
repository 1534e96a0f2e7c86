//! Simulator configuration
//!
//! Every key is optional; missing keys take their defaults.
//!
//! ```yaml
//! read_timeout_ms: 1000
//! cycle_interval_ms: 50
//! default_scaling: 0.5
//! reserved_ports: [COM1]
//! refresh_hz: 20
//! ```
//!
//! Strip dimensions, the baud rate and the failure threshold are fixed by the
//! controller firmware and are not configurable.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::debug;

use crate::transport::{BAUD_RATE, LinkSettings};
use crate::types::{RefreshRate, ScalingExponent};
use crate::{Result, SimulatorError};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SimulatorConfig {
    /// Upper bound on one serial read; an expired read counts as an empty frame
    pub read_timeout_ms: u64,

    /// Pause between cycles while disconnected or retrying a connect
    pub cycle_interval_ms: u64,

    /// Scaling exponent used until the consumer sets one
    pub default_scaling: ScalingExponent,

    /// Ports never offered by a scan nor accepted as targets
    pub reserved_ports: Vec<String>,

    /// Default rate for throttled snapshot subscriptions
    pub refresh_hz: u32,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            read_timeout_ms: 1000,
            cycle_interval_ms: 50,
            default_scaling: ScalingExponent::default(),
            reserved_ports: vec!["COM1".to_string()],
            refresh_hz: 20,
        }
    }
}

impl SimulatorConfig {
    /// Parse and validate a YAML document.
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: SimulatorConfig = if yaml.trim().is_empty() {
            SimulatorConfig::default()
        } else {
            serde_yaml_ng::from_str(yaml)?
        };
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a YAML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let yaml = std::fs::read_to_string(path)
            .map_err(|e| SimulatorError::file_error(path.to_path_buf(), e))?;
        let config = Self::from_yaml_str(&yaml)?;
        debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.read_timeout_ms == 0 {
            return Err(SimulatorError::config("read_timeout_ms", "must be greater than 0"));
        }
        if self.cycle_interval_ms == 0 {
            return Err(SimulatorError::config("cycle_interval_ms", "must be greater than 0"));
        }
        if self.reserved_ports.iter().any(|p| p.trim().is_empty()) {
            return Err(SimulatorError::config("reserved_ports", "entries must not be blank"));
        }
        Ok(())
    }

    pub fn link_settings(&self) -> LinkSettings {
        LinkSettings { baud_rate: BAUD_RATE, read_timeout: Duration::from_millis(self.read_timeout_ms) }
    }

    pub fn cycle_interval(&self) -> Duration {
        Duration::from_millis(self.cycle_interval_ms)
    }

    pub fn refresh_rate(&self) -> RefreshRate {
        RefreshRate::Max(self.refresh_hz)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::{Context, Result};
    use std::io::Write;

    #[test]
    fn defaults() {
        let config = SimulatorConfig::default();
        assert_eq!(config.link_settings().baud_rate, 115_200);
        assert_eq!(config.link_settings().read_timeout, Duration::from_millis(1000));
        assert_eq!(config.cycle_interval(), Duration::from_millis(50));
        assert_eq!(config.default_scaling.get(), 0.5);
        assert_eq!(config.reserved_ports, vec!["COM1".to_string()]);
        assert_eq!(config.refresh_rate(), RefreshRate::Max(20));
    }

    #[test]
    fn partial_yaml_keeps_defaults() -> Result<()> {
        let config = SimulatorConfig::from_yaml_str("default_scaling: 0.8\nreserved_ports: []\n")
            .context("parse partial config")?;
        assert_eq!(config.default_scaling.get(), 0.8);
        assert!(config.reserved_ports.is_empty());
        assert_eq!(config.read_timeout_ms, 1000);
        Ok(())
    }

    #[test]
    fn empty_yaml_is_default() -> Result<()> {
        assert_eq!(SimulatorConfig::from_yaml_str("")?, SimulatorConfig::default());
        Ok(())
    }

    #[test]
    fn invalid_values_are_rejected() {
        assert!(SimulatorConfig::from_yaml_str("default_scaling: 1.5").is_err());
        assert!(SimulatorConfig::from_yaml_str("default_scaling: 0").is_err());
        assert!(SimulatorConfig::from_yaml_str("read_timeout_ms: 0").is_err());
        assert!(SimulatorConfig::from_yaml_str("reserved_ports: ['  ']").is_err());
        assert!(SimulatorConfig::from_yaml_str("baud_rate: 9600").is_err());
    }

    #[test]
    fn yaml_round_trip() -> Result<()> {
        let config = SimulatorConfig { refresh_hz: 30, ..SimulatorConfig::default() };
        let yaml = serde_yaml_ng::to_string(&config)?;
        assert_eq!(SimulatorConfig::from_yaml_str(&yaml)?, config);
        Ok(())
    }

    #[test]
    fn load_from_file() -> Result<()> {
        let mut file = tempfile::NamedTempFile::new()?;
        writeln!(file, "cycle_interval_ms: 10")?;

        let config = SimulatorConfig::load(file.path())?;
        assert_eq!(config.cycle_interval(), Duration::from_millis(10));
        Ok(())
    }

    #[test]
    fn missing_file_reports_path() {
        let err = SimulatorConfig::load("/definitely/not/here.yaml").unwrap_err();
        assert!(matches!(err, SimulatorError::File { .. }));
        assert!(err.to_string().contains("here.yaml"));
    }
}
