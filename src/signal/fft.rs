use rustfft::{num_complex::Complex64, FftPlanner};
use serde::Serialize;

/// One-sided magnitude spectrum of a single channel.
#[derive(Clone, Debug)]
pub struct FrequencySpectrum {
    pub sample_rate_hz: f64,
    pub frequencies_hz: Vec<f64>,
    pub magnitudes: Vec<f64>,
}

/// Compact description of a spectrum kept in the analysis result.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct SpectrumSummary {
    pub dominant_frequency_hz: f64,
    pub dominant_magnitude: f64,
    pub resolution_hz: f64,
}

/// Computes FFTs over the whole recording, mean removed.
pub struct SpectrumBuilder;

impl SpectrumBuilder {
    pub fn compute(signal: &[f64], sample_rate_hz: f64) -> FrequencySpectrum {
        let fft_size = signal.len();
        if fft_size == 0 {
            return FrequencySpectrum {
                sample_rate_hz,
                frequencies_hz: Vec::new(),
                magnitudes: Vec::new(),
            };
        }
        let mean = signal.iter().sum::<f64>() / fft_size as f64;
        let mut buffer: Vec<Complex64> = signal
            .iter()
            .map(|&v| Complex64::new(v - mean, 0.0))
            .collect();
        let mut planner = FftPlanner::<f64>::new();
        planner.plan_fft_forward(fft_size).process(&mut buffer);

        let bins = fft_size / 2;
        let frequencies_hz = (0..bins)
            .map(|k| k as f64 * sample_rate_hz / fft_size as f64)
            .collect();
        let magnitudes = buffer
            .iter()
            .take(bins)
            .map(|c| c.norm() / fft_size as f64)
            .collect();
        FrequencySpectrum {
            sample_rate_hz,
            frequencies_hz,
            magnitudes,
        }
    }
}

impl FrequencySpectrum {
    /// Strongest non-DC bin, if any.
    pub fn summary(&self) -> Option<SpectrumSummary> {
        let (index, magnitude) = self
            .magnitudes
            .iter()
            .enumerate()
            .skip(1)
            .max_by(|a, b| a.1.total_cmp(b.1))?;
        let resolution_hz = self.frequencies_hz.get(1).copied().unwrap_or(0.0);
        Some(SpectrumSummary {
            dominant_frequency_hz: self.frequencies_hz[index],
            dominant_magnitude: *magnitude,
            resolution_hz,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    #[test]
    fn finds_dominant_tone() {
        let fs = 256.0;
        let signal: Vec<f64> = (0..2560)
            .map(|i| {
                let t = i as f64 / fs;
                3.0 + 10.0 * (2.0 * PI * 12.0 * t).sin() + (2.0 * PI * 40.0 * t).sin()
            })
            .collect();
        let spectrum = SpectrumBuilder::compute(&signal, fs);
        assert_eq!(spectrum.frequencies_hz.len(), 1280);
        let summary = spectrum.summary().unwrap();
        assert!((summary.dominant_frequency_hz - 12.0).abs() <= summary.resolution_hz);
        assert!((summary.resolution_hz - 0.1).abs() < 1e-12);
    }

    #[test]
    fn empty_signal_has_no_summary() {
        let spectrum = SpectrumBuilder::compute(&[], 256.0);
        assert!(spectrum.magnitudes.is_empty());
        assert!(spectrum.summary().is_none());
    }
}
