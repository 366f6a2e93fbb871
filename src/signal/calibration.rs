//! Raw ADC code to microvolt conversion for the analog front end.
//!
//! `uv = ((code / max_code) * supply_voltage - reference_voltage) / gain * 1e6`
//!
//! Codes outside `[0, max_code]` are converted as-is, without clipping.
use crate::config::PipelineConfig;

/// Affine mapping from ADC counts to microvolts.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Calibration {
    pub max_code: f64,
    pub supply_voltage: f64,
    pub reference_voltage: f64,
    pub gain: f64,
}

impl Calibration {
    pub fn from_config(config: &PipelineConfig) -> Self {
        Self {
            max_code: config.max_code,
            supply_voltage: config.supply_voltage,
            reference_voltage: config.reference_voltage,
            gain: config.gain,
        }
    }

    pub fn to_microvolts(&self, code: i64) -> f64 {
        ((code as f64 / self.max_code) * self.supply_voltage - self.reference_voltage) / self.gain
            * 1e6
    }

    pub fn channel_to_microvolts(&self, codes: &[i64]) -> Vec<f64> {
        codes.iter().map(|&code| self.to_microvolts(code)).collect()
    }
}
