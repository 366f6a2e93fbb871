use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config file: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid config: {0}")]
    Invalid(&'static str),
}

/// Front-end and filter constants. Fixed for the lifetime of a process.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// ADC resolution ceiling (4095 for a 12-bit converter).
    pub max_code: f64,
    pub supply_voltage: f64,
    pub reference_voltage: f64,
    pub gain: f64,
    /// Notch target in Hz.
    pub mains_frequency: f64,
    pub notch_quality_factor: f64,
    pub filter_order: usize,
    pub minimum_filter_samples: usize,
    /// Used when the sampling rate cannot be derived from timestamps.
    pub nominal_sample_rate: f64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_code: 4095.0,
            supply_voltage: 3.3,
            reference_voltage: 1.65,
            gain: 1000.0,
            mains_frequency: 50.0,
            notch_quality_factor: 30.0,
            filter_order: 4,
            minimum_filter_samples: 12,
            nominal_sample_rate: 256.0,
        }
    }
}

impl PipelineConfig {
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.max_code > 0.0) {
            return Err(ConfigError::Invalid("max_code must be greater than zero"));
        }
        if !(self.supply_voltage > 0.0) {
            return Err(ConfigError::Invalid("supply_voltage must be greater than zero"));
        }
        if !(self.gain.is_finite() && self.gain != 0.0) {
            return Err(ConfigError::Invalid("gain must be finite and non-zero"));
        }
        if !(self.mains_frequency > 0.0) {
            return Err(ConfigError::Invalid("mains_frequency must be greater than zero"));
        }
        if !(self.notch_quality_factor > 0.0) {
            return Err(ConfigError::Invalid("notch_quality_factor must be greater than zero"));
        }
        if self.filter_order == 0 {
            return Err(ConfigError::Invalid("filter_order must be at least 1"));
        }
        if !(self.nominal_sample_rate > 0.0) {
            return Err(ConfigError::Invalid("nominal_sample_rate must be greater than zero"));
        }
        Ok(())
    }

    /// Shortest recording the band-pass bank will filter.
    pub fn minimum_bandpass_samples(&self) -> usize {
        self.minimum_filter_samples.max(self.filter_order * 6)
    }

    /// Shortest batch the pipeline accepts.
    pub fn minimum_batch_samples(&self) -> usize {
        self.minimum_bandpass_samples()
    }
}
