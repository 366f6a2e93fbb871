use ndarray::ArrayView1;
use serde::Serialize;

use crate::config::PipelineConfig;
use crate::signal::filter::bandpass_filter;
use crate::types::{Band, BandMap};

/// Keeps the relative-power denominator non-zero.
pub const POWER_EPSILON: f64 = 1e-20;

/// Splits one calibrated channel into the five canonical bands.
///
/// Bands are independent of each other; each branch only reads `signal`.
pub fn decompose(signal: &[f64], sample_rate_hz: f64, config: &PipelineConfig) -> BandMap<Vec<f64>> {
    BandMap::from_fn(|band| {
        let (low, high) = band.range_hz();
        bandpass_filter(
            signal,
            low,
            high,
            sample_rate_hz,
            config.filter_order,
            config.minimum_filter_samples,
        )
    })
}

/// Mean squared amplitude. Empty signals have zero power.
pub fn mean_power(signal: &[f64]) -> f64 {
    ArrayView1::from(signal)
        .mapv(|v| v * v)
        .mean()
        .unwrap_or(0.0)
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct BandPowers {
    pub absolute: BandMap<f64>,
    /// Percent of `total`.
    pub relative: BandMap<f64>,
    /// Sum of the absolute powers plus [`POWER_EPSILON`].
    pub total: f64,
}

impl BandPowers {
    pub fn from_absolute(absolute: BandMap<f64>) -> Self {
        let total = absolute.iter().map(|(_, power)| *power).sum::<f64>() + POWER_EPSILON;
        let relative = absolute.map(|power| 100.0 * power / total);
        Self {
            absolute,
            relative,
            total,
        }
    }

    pub fn from_signals(signals: &BandMap<Vec<f64>>) -> Self {
        Self::from_absolute(signals.map(|signal| mean_power(signal)))
    }

    pub fn relative(&self, band: Band) -> f64 {
        *self.relative.get(band)
    }

    pub fn absolute(&self, band: Band) -> f64 {
        *self.absolute.get(band)
    }
}
