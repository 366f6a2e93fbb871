//! Heuristic scoring over one channel's band powers.
//!
//! Seven independent criteria, each a comparison of one statistic against a
//! fixed threshold. The pass count selects the diagnosis from a lookup table
//! (see [`Diagnosis::from_passed_count`]). The constants are heuristic and
//! are not clinically validated.
use log::debug;
use ndarray::{Array1, ArrayView1};
use serde::Serialize;

use crate::signal::BandPowers;
use crate::types::{Band, BandMap, ConfidenceLevel, Diagnosis};

/// Guards ratios against empty bands.
const RATIO_EPSILON: f64 = 1e-10;
/// Below this variance a z-normalized series carries no shape to correlate.
const DEGENERATE_VARIANCE: f64 = 1e-6;

pub const TOTAL_CRITERIA: usize = 7;

/// One evaluated criterion.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Criterion {
    pub name: &'static str,
    pub value: f64,
    pub threshold: f64,
    pub passed: bool,
    pub description: &'static str,
}

/// Everything the criteria read for one channel.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ChannelStatistics {
    pub powers: BandPowers,
    pub delta_variability: f64,
    /// 0.0 when the correlation cannot be computed.
    pub delta_gamma_correlation: f64,
}

impl ChannelStatistics {
    pub fn from_bands(bands: &BandMap<Vec<f64>>) -> Self {
        let correlation = normalized_correlation(&bands.delta, &bands.gamma).unwrap_or_else(|| {
            debug!("delta/gamma correlation is undefined, using 0.0");
            0.0
        });
        Self {
            powers: BandPowers::from_signals(bands),
            delta_variability: variability(&bands.delta),
            delta_gamma_correlation: correlation,
        }
    }
}

/// `std(x) / (mean(|x|) + 1e-10)`, population standard deviation.
pub fn variability(signal: &[f64]) -> f64 {
    let view = ArrayView1::from(signal);
    let Some(mean_abs) = view.mapv(f64::abs).mean() else {
        return 0.0;
    };
    view.std(0.0) / (mean_abs + RATIO_EPSILON)
}

fn z_normalize(signal: ArrayView1<f64>) -> Option<Array1<f64>> {
    let mean = signal.mean()?;
    let std = signal.std(0.0);
    Some(signal.mapv(|v| (v - mean) / (std + RATIO_EPSILON)))
}

/// Pearson correlation of the z-normalized series.
///
/// `None` for mismatched or too-short inputs, degenerate variance, or a
/// non-finite result.
pub fn normalized_correlation(a: &[f64], b: &[f64]) -> Option<f64> {
    if a.len() != b.len() || a.len() < 2 {
        return None;
    }
    let x = z_normalize(ArrayView1::from(a))?;
    let y = z_normalize(ArrayView1::from(b))?;
    let x = &x - x.mean()?;
    let y = &y - y.mean()?;
    let n = a.len() as f64;
    let sxx = x.dot(&x);
    let syy = y.dot(&y);
    if !(sxx / n >= DEGENERATE_VARIANCE && syy / n >= DEGENERATE_VARIANCE) {
        return None;
    }
    let r = x.dot(&y) / (sxx * syy).sqrt();
    r.is_finite().then(|| r.clamp(-1.0, 1.0))
}

#[derive(Clone, Copy)]
enum Pass {
    Above,
    Below,
}

struct Rule {
    name: &'static str,
    description: &'static str,
    threshold: f64,
    pass: Pass,
    statistic: fn(&ChannelStatistics) -> f64,
}

fn highest_non_delta(stats: &ChannelStatistics) -> f64 {
    [Band::Theta, Band::Alpha, Band::Beta, Band::Gamma]
        .into_iter()
        .map(|band| stats.powers.relative(band))
        .fold(f64::NEG_INFINITY, f64::max)
}

// Evaluation order is presentation order.
static RULES: [Rule; TOTAL_CRITERIA] = [
    Rule {
        name: "high_delta",
        description: "elevated delta power",
        threshold: 35.0,
        pass: Pass::Above,
        statistic: |s| s.powers.relative(Band::Delta),
    },
    Rule {
        name: "low_gamma",
        description: "reduced gamma power",
        threshold: 8.0,
        pass: Pass::Below,
        statistic: |s| s.powers.relative(Band::Gamma),
    },
    Rule {
        name: "delta_gamma_ratio",
        description: "high delta/gamma power ratio",
        threshold: 5.0,
        pass: Pass::Above,
        statistic: |s| s.powers.absolute(Band::Delta) / (s.powers.absolute(Band::Gamma) + RATIO_EPSILON),
    },
    Rule {
        name: "delta_variability",
        description: "high delta variability",
        threshold: 1.2,
        pass: Pass::Above,
        statistic: |s| s.delta_variability,
    },
    Rule {
        name: "delta_dominance",
        description: "delta dominates every other band by a margin",
        threshold: 10.0,
        pass: Pass::Above,
        statistic: |s| s.powers.relative(Band::Delta) - highest_non_delta(s),
    },
    Rule {
        name: "gamma_lowest",
        description: "gamma markedly below beta",
        threshold: 5.0,
        pass: Pass::Above,
        statistic: |s| s.powers.relative(Band::Beta) - s.powers.relative(Band::Gamma),
    },
    Rule {
        name: "delta_gamma_inverse",
        description: "negative delta-gamma correlation",
        threshold: -0.3,
        pass: Pass::Below,
        statistic: |s| s.delta_gamma_correlation,
    },
];

/// Aggregate outcome of the seven criteria.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CriteriaReport {
    pub criteria: Vec<Criterion>,
    pub passed: usize,
    pub total: usize,
    pub confidence_score: f64,
    pub diagnosis: Diagnosis,
    pub confidence: ConfidenceLevel,
    pub recommendation: &'static str,
}

impl CriteriaReport {
    pub fn from_criteria(criteria: Vec<Criterion>) -> Self {
        let passed = criteria.iter().filter(|c| c.passed).count();
        let diagnosis = Diagnosis::from_passed_count(passed);
        Self {
            passed,
            total: TOTAL_CRITERIA,
            confidence_score: 100.0 * passed as f64 / TOTAL_CRITERIA as f64,
            diagnosis,
            confidence: diagnosis.confidence(),
            recommendation: diagnosis.recommendation(),
            criteria,
        }
    }

    pub fn get(&self, name: &str) -> Option<&Criterion> {
        self.criteria.iter().find(|c| c.name == name)
    }
}

pub fn evaluate(stats: &ChannelStatistics) -> CriteriaReport {
    let criteria = RULES
        .iter()
        .map(|rule| {
            let value = (rule.statistic)(stats);
            let passed = match rule.pass {
                Pass::Above => value > rule.threshold,
                Pass::Below => value < rule.threshold,
            };
            Criterion {
                name: rule.name,
                value,
                threshold: rule.threshold,
                passed,
                description: rule.description,
            }
        })
        .collect();
    let report = CriteriaReport::from_criteria(criteria);
    debug!(
        "criteria passed {}/{} -> {}",
        report.passed, report.total, report.diagnosis
    );
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    fn stats(powers: [f64; 5], variability: f64, correlation: f64) -> ChannelStatistics {
        let [delta, theta, alpha, beta, gamma] = powers;
        ChannelStatistics {
            powers: BandPowers::from_absolute(BandMap {
                delta,
                theta,
                alpha,
                beta,
                gamma,
            }),
            delta_variability: variability,
            delta_gamma_correlation: correlation,
        }
    }

    #[test]
    fn criteria_keep_fixed_order() {
        let report = evaluate(&stats([20.0; 5], 0.0, 0.0));
        let names: Vec<_> = report.criteria.iter().map(|c| c.name).collect();
        assert_eq!(
            names,
            [
                "high_delta",
                "low_gamma",
                "delta_gamma_ratio",
                "delta_variability",
                "delta_dominance",
                "gamma_lowest",
                "delta_gamma_inverse"
            ]
        );
        assert_eq!(report.total, 7);
    }

    #[test]
    fn pass_count_follows_constructed_statistics() {
        let cases = [
            (stats([10.0, 20.0, 30.0, 20.0, 20.0], 1.0, 0.2), 0, Diagnosis::NoIndication),
            (stats([20.0, 30.0, 35.0, 10.0, 5.0], 1.0, 0.0), 1, Diagnosis::NoIndication),
            (stats([30.0, 30.0, 25.0, 10.0, 5.0], 1.0, 0.0), 2, Diagnosis::Borderline),
            (stats([40.0, 35.0, 10.0, 10.0, 5.0], 1.0, 0.0), 3, Diagnosis::Borderline),
            (stats([80.0, 5.0, 4.0, 6.0, 5.0], 1.0, 0.0), 4, Diagnosis::LowModerateIndication),
            (stats([80.0, 5.0, 4.0, 10.0, 1.0], 1.0, 0.0), 5, Diagnosis::LowModerateIndication),
            (stats([80.0, 5.0, 4.0, 10.0, 1.0], 1.0, -0.5), 6, Diagnosis::StrongIndication),
            (stats([80.0, 5.0, 4.0, 10.0, 1.0], 1.5, -0.5), 7, Diagnosis::StrongIndication),
        ];
        for (input, expected, diagnosis) in cases {
            let report = evaluate(&input);
            assert_eq!(report.passed, expected, "{:?}", report.criteria);
            assert_eq!(report.diagnosis, diagnosis);
            assert!((report.confidence_score - 100.0 * expected as f64 / 7.0).abs() < 1e-12);
        }
    }

    #[test]
    fn all_passing_values_are_exact() {
        let report = evaluate(&stats([80.0, 5.0, 4.0, 10.0, 1.0], 1.5, -0.5));
        let value = |name| report.get(name).unwrap().value;
        assert!((value("high_delta") - 80.0).abs() < 1e-9);
        assert!((value("low_gamma") - 1.0).abs() < 1e-9);
        assert!((value("delta_gamma_ratio") - 80.0).abs() < 1e-6);
        assert!((value("delta_dominance") - 70.0).abs() < 1e-9);
        assert!((value("gamma_lowest") - 9.0).abs() < 1e-9);
        assert_eq!(value("delta_gamma_inverse"), -0.5);
        assert_eq!(report.confidence, ConfidenceLevel::High);
        assert_eq!(report.recommendation, "strongly recommend professional follow-up evaluation");
    }

    #[test]
    fn pass_count_boundaries_from_flags() {
        for k in 0..=TOTAL_CRITERIA {
            let criteria = RULES
                .iter()
                .enumerate()
                .map(|(i, rule)| Criterion {
                    name: rule.name,
                    value: 0.0,
                    threshold: rule.threshold,
                    passed: i < k,
                    description: rule.description,
                })
                .collect();
            let report = CriteriaReport::from_criteria(criteria);
            assert_eq!(report.passed, k);
            assert_eq!(report.diagnosis, Diagnosis::from_passed_count(k));
        }
    }

    #[test]
    fn correlation_of_related_signals() {
        let a: Vec<f64> = (0..500).map(|i| (i as f64 * 0.1).sin()).collect();
        let negated: Vec<f64> = a.iter().map(|v| -3.0 * v + 1.0).collect();
        assert!((normalized_correlation(&a, &a).unwrap() - 1.0).abs() < 1e-9);
        assert!((normalized_correlation(&a, &negated).unwrap() + 1.0).abs() < 1e-9);
    }

    #[test]
    fn degenerate_correlation_is_undefined() {
        let a: Vec<f64> = (0..100).map(|i| (i as f64).sin()).collect();
        let flat = vec![2.5; 100];
        let dust: Vec<f64> = a.iter().map(|v| v * 1e-17).collect();
        assert_eq!(normalized_correlation(&a, &flat), None);
        assert_eq!(normalized_correlation(&a, &dust), None);
        assert_eq!(normalized_correlation(&a, &a[..50]), None);
        assert_eq!(normalized_correlation(&[], &[]), None);
    }

    #[test]
    fn flat_delta_fails_inverse_correlation() {
        let bands = BandMap {
            delta: vec![0.0; 64],
            theta: vec![0.0; 64],
            alpha: vec![0.0; 64],
            beta: vec![0.0; 64],
            gamma: (0..64).map(|i| (i as f64).sin()).collect(),
        };
        let stats = ChannelStatistics::from_bands(&bands);
        assert_eq!(stats.delta_gamma_correlation, 0.0);
        let report = evaluate(&stats);
        assert!(!report.get("delta_gamma_inverse").unwrap().passed);
    }

    #[test]
    fn sinusoid_variability() {
        let sine: Vec<f64> = (0..10_000)
            .map(|i| 100.0 * (2.0 * PI * i as f64 / 250.0).sin())
            .collect();
        let expected = PI / (2.0 * 2.0_f64.sqrt());
        assert!((variability(&sine) - expected).abs() < 1e-3);
        assert_eq!(variability(&[]), 0.0);
    }
}
