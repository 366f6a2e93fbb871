//! IIR filters as cascaded biquad sections, applied zero-phase.
//!
//! Designs follow the usual bilinear-transform recipes on a normalized
//! frequency axis where 1.0 is the Nyquist frequency. Zero-phase application
//! pads both ends with an odd extension of `3 * (order + 1)` samples, starts
//! every section at its steady state for the first padded sample, and runs the
//! chain forward then backward.
use std::f64::consts::PI;

use log::{debug, warn};
use rustfft::num_complex::Complex64;

use crate::signal::FilterError;

/// `H(z) = (b0 + b1 z^-1 + b2 z^-2) / (1 + a1 z^-1 + a2 z^-2)`
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BiquadCoeffs {
    pub b0: f64,
    pub b1: f64,
    pub b2: f64,
    pub a1: f64,
    pub a2: f64,
}

impl BiquadCoeffs {
    fn dc_gain(&self) -> f64 {
        (self.b0 + self.b1 + self.b2) / (1.0 + self.a1 + self.a2)
    }

    /// Both poles strictly inside the unit circle.
    fn is_stable(&self) -> bool {
        let finite = [self.b0, self.b1, self.b2, self.a1, self.a2]
            .iter()
            .all(|c| c.is_finite());
        finite && self.a2.abs() < 1.0 && self.a1.abs() < 1.0 + self.a2
    }
}

#[derive(Clone, Copy, Debug, Default)]
struct BiquadState {
    z1: f64,
    z2: f64,
}

#[derive(Clone, Copy, Debug)]
struct BiquadFilter {
    coeffs: BiquadCoeffs,
    state: BiquadState,
}

impl BiquadFilter {
    /// Section already settled on a constant input of `level`.
    fn at_rest(coeffs: BiquadCoeffs, level: f64) -> Self {
        let output = coeffs.dc_gain() * level;
        Self {
            coeffs,
            state: BiquadState {
                z1: output - coeffs.b0 * level,
                z2: coeffs.b2 * level - coeffs.a2 * output,
            },
        }
    }

    fn process(&mut self, input: f64) -> f64 {
        // Transposed direct form II
        let y = self.coeffs.b0 * input + self.state.z1;
        self.state.z1 = self.coeffs.b1 * input - self.coeffs.a1 * y + self.state.z2;
        self.state.z2 = self.coeffs.b2 * input - self.coeffs.a2 * y;
        y
    }
}

/// Stable cascade of second-order sections.
#[derive(Clone, Debug)]
pub struct FilterChain {
    sections: Vec<BiquadCoeffs>,
}

impl FilterChain {
    pub fn from_sections(sections: Vec<BiquadCoeffs>) -> Result<Self, FilterError> {
        if sections.is_empty() || !sections.iter().all(BiquadCoeffs::is_stable) {
            return Err(FilterError::Unstable);
        }
        Ok(Self { sections })
    }

    pub fn sections(&self) -> &[BiquadCoeffs] {
        &self.sections
    }

    /// Edge padding used by [`FilterChain::filtfilt`].
    pub fn pad_len(&self) -> usize {
        3 * (2 * self.sections.len() + 1)
    }

    /// Single causal pass, starting from the steady state of the first sample.
    pub fn process(&self, input: &[f64]) -> Vec<f64> {
        let Some(&first) = input.first() else {
            return Vec::new();
        };
        let mut level = first;
        let mut stages: Vec<BiquadFilter> = self
            .sections
            .iter()
            .map(|coeffs| {
                let stage = BiquadFilter::at_rest(*coeffs, level);
                level *= coeffs.dc_gain();
                stage
            })
            .collect();
        input
            .iter()
            .map(|&x| stages.iter_mut().fold(x, |acc, stage| stage.process(acc)))
            .collect()
    }

    /// Forward-backward filtering. Output has the input's length and no phase lag.
    pub fn filtfilt(&self, signal: &[f64]) -> Result<Vec<f64>, FilterError> {
        let pad = self.pad_len();
        if signal.len() <= pad {
            return Err(FilterError::SignalTooShort {
                len: signal.len(),
                pad,
            });
        }
        let extended = odd_extension(signal, pad);
        let mut forward = self.process(&extended);
        forward.reverse();
        let mut backward = self.process(&forward);
        backward.reverse();
        let output = backward[pad..pad + signal.len()].to_vec();
        if output.iter().all(|v| v.is_finite()) {
            Ok(output)
        } else {
            Err(FilterError::NonFinite)
        }
    }
}

/// Point-reflects `pad` samples about each endpoint. Requires `signal.len() > pad`.
fn odd_extension(signal: &[f64], pad: usize) -> Vec<f64> {
    let n = signal.len();
    let first = signal[0];
    let last = signal[n - 1];
    let mut out = Vec::with_capacity(n + 2 * pad);
    out.extend((1..=pad).rev().map(|i| 2.0 * first - signal[i]));
    out.extend_from_slice(signal);
    out.extend((1..=pad).map(|i| 2.0 * last - signal[n - 1 - i]));
    out
}

/// Second-order notch at `freq_hz` with quality factor `q`.
pub fn design_notch(freq_hz: f64, sample_rate_hz: f64, q: f64) -> Result<FilterChain, FilterError> {
    if !(sample_rate_hz > 0.0) {
        return Err(FilterError::InvalidSampleRate);
    }
    if !(q > 0.0) {
        return Err(FilterError::InvalidQuality);
    }
    let w0 = freq_hz / (0.5 * sample_rate_hz);
    if !(w0 > 0.0 && w0 < 1.0) {
        return Err(FilterError::CutoffOutOfRange(w0));
    }
    let bandwidth = w0 / q * PI;
    let w0 = w0 * PI;
    let gain = 1.0 / (1.0 + (bandwidth / 2.0).tan());
    let cos_w0 = w0.cos();
    FilterChain::from_sections(vec![BiquadCoeffs {
        b0: gain,
        b1: -2.0 * gain * cos_w0,
        b2: gain,
        a1: -2.0 * gain * cos_w0,
        a2: 2.0 * gain - 1.0,
    }])
}

/// Butterworth band-pass between normalized edges `low` and `high`.
///
/// An order-`n` design has `2n` poles and is realized as `n` sections, each
/// with a zero at DC and one at Nyquist. The overall gain sits on the first
/// section so a constant input settles to exactly zero.
pub fn design_butterworth_bandpass(
    low: f64,
    high: f64,
    order: usize,
) -> Result<FilterChain, FilterError> {
    if order == 0 {
        return Err(FilterError::InvalidOrder);
    }
    for edge in [low, high] {
        if !(edge > 0.0 && edge < 1.0) {
            return Err(FilterError::CutoffOutOfRange(edge));
        }
    }
    if low >= high {
        return Err(FilterError::InvertedBand { low, high });
    }

    // Pre-warped analog edges; the normalized axis implies fs = 2.
    let fs2 = 4.0;
    let warped_low = fs2 * (PI * low / 2.0).tan();
    let warped_high = fs2 * (PI * high / 2.0).tan();
    let bandwidth = warped_high - warped_low;
    let center_sq = warped_low * warped_high;

    // Low-pass prototype poles, shifted onto the band.
    let mut analog = Vec::with_capacity(2 * order);
    for k in 0..order {
        let m = 2 * k as i64 - (order as i64 - 1);
        let theta = PI * m as f64 / (2.0 * order as f64);
        let scaled = -Complex64::from_polar(1.0, theta) * (bandwidth / 2.0);
        let offset = (scaled * scaled - center_sq).sqrt();
        analog.push(scaled + offset);
        analog.push(scaled - offset);
    }

    let mut gain = Complex64::new((bandwidth * fs2).powi(order as i32), 0.0);
    let mut upper = Vec::with_capacity(order);
    let mut real = Vec::new();
    for pole in analog {
        gain /= fs2 - pole;
        let digital = (fs2 + pole) / (fs2 - pole);
        if digital.im > 1e-12 {
            upper.push(digital);
        } else if digital.im.abs() <= 1e-12 {
            real.push(digital.re);
        }
    }
    if real.len() % 2 != 0 {
        return Err(FilterError::Unstable);
    }

    let mut sections: Vec<BiquadCoeffs> = upper
        .iter()
        .map(|pole| BiquadCoeffs {
            b0: 1.0,
            b1: 0.0,
            b2: -1.0,
            a1: -2.0 * pole.re,
            a2: pole.norm_sqr(),
        })
        .collect();
    sections.extend(real.chunks(2).map(|pair| BiquadCoeffs {
        b0: 1.0,
        b1: 0.0,
        b2: -1.0,
        a1: -(pair[0] + pair[1]),
        a2: pair[0] * pair[1],
    }));
    if sections.len() != order {
        return Err(FilterError::Unstable);
    }
    let gain = gain.re;
    if let Some(first) = sections.first_mut() {
        first.b0 = gain;
        first.b2 = -gain;
    }
    FilterChain::from_sections(sections)
}

/// Zero-phase mains notch. Falls back to the input on short or degenerate signals.
pub fn notch_filter(
    signal: &[f64],
    freq_hz: f64,
    sample_rate_hz: f64,
    q: f64,
    min_samples: usize,
) -> Vec<f64> {
    if signal.len() < min_samples {
        debug!(
            "notch skipped: {} samples is below the minimum of {min_samples}",
            signal.len()
        );
        return signal.to_vec();
    }
    match design_notch(freq_hz, sample_rate_hz, q).and_then(|chain| chain.filtfilt(signal)) {
        Ok(filtered) => filtered,
        Err(err) => {
            warn!("notch at {freq_hz} Hz skipped, passing signal through: {err}");
            signal.to_vec()
        }
    }
}

/// Zero-phase Butterworth band-pass. Falls back to the input on short
/// signals, cutoffs at or past Nyquist, and numerical failures.
pub fn bandpass_filter(
    signal: &[f64],
    low_hz: f64,
    high_hz: f64,
    sample_rate_hz: f64,
    order: usize,
    min_samples: usize,
) -> Vec<f64> {
    let required = min_samples.max(order * 6);
    if signal.len() < required {
        debug!(
            "band-pass skipped: {} samples is below the minimum of {required}",
            signal.len()
        );
        return signal.to_vec();
    }
    let nyquist = 0.5 * sample_rate_hz;
    let low = low_hz / nyquist;
    let high = high_hz / nyquist;
    if low <= 0.0 || high >= 1.0 {
        debug!("band-pass {low_hz}-{high_hz} Hz skipped: outside (0, Nyquist) at {sample_rate_hz} Hz");
        return signal.to_vec();
    }
    match design_butterworth_bandpass(low, high, order).and_then(|chain| chain.filtfilt(signal)) {
        Ok(filtered) => filtered,
        Err(err) => {
            warn!("band-pass {low_hz}-{high_hz} Hz skipped, passing signal through: {err}");
            signal.to_vec()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine(freq_hz: f64, sample_rate_hz: f64, len: usize) -> Vec<f64> {
        (0..len)
            .map(|i| (2.0 * PI * freq_hz * i as f64 / sample_rate_hz).sin())
            .collect()
    }

    fn rms(data: &[f64]) -> f64 {
        (data.iter().map(|v| v * v).sum::<f64>() / data.len() as f64).sqrt()
    }

    /// |H(e^{jw})| with `w` in radians per sample.
    fn magnitude_at(chain: &FilterChain, w: f64) -> f64 {
        let z1 = Complex64::from_polar(1.0, -w);
        let z2 = z1 * z1;
        chain
            .sections()
            .iter()
            .map(|c| ((z1 * c.b1 + z2 * c.b2 + c.b0) / (z1 * c.a1 + z2 * c.a2 + 1.0)).norm())
            .product()
    }

    #[test]
    fn odd_extension_reflects_about_endpoints() {
        let ext = odd_extension(&[1.0, 2.0, 4.0, 7.0], 2);
        assert_eq!(ext, vec![-2.0, 0.0, 1.0, 2.0, 4.0, 7.0, 10.0, 12.0]);
    }

    #[test]
    fn unstable_sections_are_rejected() {
        let section = BiquadCoeffs {
            b0: 1.0,
            b1: 0.0,
            b2: 0.0,
            a1: 0.0,
            a2: 1.5,
        };
        assert_eq!(
            FilterChain::from_sections(vec![section]).unwrap_err(),
            FilterError::Unstable
        );
        assert!(FilterChain::from_sections(vec![]).is_err());
    }

    #[test]
    fn butterworth_bandpass_has_half_power_edges() {
        let (low, high) = (8.0 / 128.0, 13.0 / 128.0);
        let chain = design_butterworth_bandpass(low, high, 4).unwrap();
        assert_eq!(chain.sections().len(), 4);
        let edge = std::f64::consts::FRAC_1_SQRT_2;
        assert!((magnitude_at(&chain, PI * low) - edge).abs() < 1e-6);
        assert!((magnitude_at(&chain, PI * high) - edge).abs() < 1e-6);
        let warped_center = ((PI * low / 2.0).tan() * (PI * high / 2.0).tan()).sqrt();
        let center = 2.0 * warped_center.atan();
        assert!((magnitude_at(&chain, center) - 1.0).abs() < 1e-6);
        assert!(magnitude_at(&chain, 0.0) < 1e-9);
    }

    #[test]
    fn bandpass_design_rejects_bad_edges() {
        assert!(matches!(
            design_butterworth_bandpass(0.0, 0.5, 4),
            Err(FilterError::CutoffOutOfRange(_))
        ));
        assert!(matches!(
            design_butterworth_bandpass(0.5, 0.2, 4),
            Err(FilterError::InvertedBand { .. })
        ));
        assert_eq!(
            design_butterworth_bandpass(0.1, 0.2, 0).unwrap_err(),
            FilterError::InvalidOrder
        );
    }

    #[test]
    fn notch_removes_mains_and_keeps_alpha() {
        let fs = 256.0;
        let mains = sine(50.0, fs, 2560);
        let filtered = notch_filter(&mains, 50.0, fs, 30.0, 12);
        assert_eq!(filtered.len(), mains.len());
        assert!(rms(&filtered[512..2048]) < 0.05 * rms(&mains[512..2048]));

        let alpha = sine(10.0, fs, 2560);
        let kept = notch_filter(&alpha, 50.0, fs, 30.0, 12);
        assert!(rms(&kept[512..2048]) > 0.95 * rms(&alpha[512..2048]));
    }

    #[test]
    fn bandpass_selects_its_band() {
        let fs = 256.0;
        let inside = sine(10.0, fs, 2560);
        let passed = bandpass_filter(&inside, 8.0, 13.0, fs, 4, 12);
        assert!(rms(&passed[512..2048]) > 0.9 * rms(&inside[512..2048]));

        let outside = sine(40.0, fs, 2560);
        let rejected = bandpass_filter(&outside, 8.0, 13.0, fs, 4, 12);
        assert!(rms(&rejected[512..2048]) < 0.05 * rms(&outside[512..2048]));
    }

    #[test]
    fn short_signals_pass_through_unchanged() {
        let short: Vec<f64> = (0..11).map(|i| i as f64 * 1.5 - 3.0).collect();
        assert_eq!(notch_filter(&short, 50.0, 256.0, 30.0, 12), short);

        let below_bandpass: Vec<f64> = (0..23).map(|i| (i as f64).sin()).collect();
        assert_eq!(
            bandpass_filter(&below_bandpass, 8.0, 13.0, 256.0, 4, 12),
            below_bandpass
        );
    }

    #[test]
    fn cutoffs_beyond_nyquist_pass_through() {
        let signal = sine(5.0, 80.0, 400);
        assert_eq!(bandpass_filter(&signal, 30.0, 45.0, 80.0, 4, 12), signal);
        assert_eq!(notch_filter(&signal, 50.0, 90.0, 30.0, 12), signal);
    }

    #[test]
    fn zero_signal_stays_zero() {
        for len in [0_usize, 5, 30, 100, 1000] {
            let zeros = vec![0.0; len];
            assert!(notch_filter(&zeros, 50.0, 256.0, 30.0, 12)
                .iter()
                .all(|&v| v == 0.0));
            assert!(bandpass_filter(&zeros, 0.5, 4.0, 256.0, 4, 12)
                .iter()
                .all(|&v| v == 0.0));
        }
    }

    #[test]
    fn constant_input_settles_to_zero_through_bandpass() {
        let constant = vec![0.4; 512];
        let out = bandpass_filter(&constant, 4.0, 8.0, 256.0, 4, 12);
        assert!(out.iter().all(|&v| v == 0.0));
    }
}
