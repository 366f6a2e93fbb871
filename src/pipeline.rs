use std::path::Path;

use log::{info, warn};
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use thiserror::Error;

use crate::config::{ConfigError, PipelineConfig};
use crate::criteria::{self, ChannelStatistics, Criterion};
use crate::signal::{
    decompose, notch_filter, BandPowers, Calibration, CsvSource, SampleBatch, SampleSource,
    SourceError, SpectrumBuilder, SpectrumSummary,
};
use crate::types::{BandMap, ConfidenceLevel, Diagnosis};

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Source(#[from] SourceError),
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Outcome of one successful pipeline run. Immutable once built.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Analysis {
    pub diagnosis: Diagnosis,
    pub confidence_label: ConfidenceLevel,
    pub confidence_score: f64,
    pub criteria_passed_count: usize,
    pub total_criteria: usize,
    /// In evaluation order. Serialized as an ordered map keyed by name.
    #[serde(serialize_with = "criteria_by_name")]
    pub criteria: Vec<Criterion>,
    pub recommendation: &'static str,
    pub narrative: &'static str,
    /// Percent per band, primary (left) channel.
    pub relative_power: BandMap<f64>,
    /// Mean squared microvolts per band, primary channel.
    pub band_powers: BandMap<f64>,
    pub right_relative_power: BandMap<f64>,
    pub sample_rate_hz: f64,
    pub duration_seconds: f64,
    pub sample_count: usize,
    pub spectrum: Option<SpectrumSummary>,
    /// True when the input lacked raw-channel columns and placeholder data was analyzed.
    pub synthetic: bool,
}

impl Analysis {
    pub fn criterion(&self, name: &str) -> Option<&Criterion> {
        self.criteria.iter().find(|c| c.name == name)
    }
}

fn criteria_by_name<S: Serializer>(criteria: &[Criterion], serializer: S) -> Result<S::Ok, S::Error> {
    let mut map = serializer.serialize_map(Some(criteria.len()))?;
    for criterion in criteria {
        map.serialize_entry(criterion.name, criterion)?;
    }
    map.end()
}

/// Either an analysis or a human-readable failure. Serializes with an `ok` flag.
#[derive(Clone, Debug, PartialEq)]
pub enum AnalysisResult {
    Success(Box<Analysis>),
    Failure { message: String },
}

impl AnalysisResult {
    pub fn ok(&self) -> bool {
        matches!(self, AnalysisResult::Success(_))
    }

    pub fn analysis(&self) -> Option<&Analysis> {
        match self {
            AnalysisResult::Success(analysis) => Some(analysis),
            AnalysisResult::Failure { .. } => None,
        }
    }

    pub fn message(&self) -> Option<&str> {
        match self {
            AnalysisResult::Success(_) => None,
            AnalysisResult::Failure { message } => Some(message),
        }
    }
}

impl From<Result<Analysis, PipelineError>> for AnalysisResult {
    fn from(result: Result<Analysis, PipelineError>) -> Self {
        match result {
            Ok(analysis) => AnalysisResult::Success(Box::new(analysis)),
            Err(err) => {
                warn!("analysis failed: {err}");
                AnalysisResult::Failure {
                    message: err.to_string(),
                }
            }
        }
    }
}

#[derive(Serialize)]
struct SuccessRecord<'a> {
    ok: bool,
    #[serde(flatten)]
    analysis: &'a Analysis,
}

#[derive(Serialize)]
struct FailureRecord<'a> {
    ok: bool,
    message: &'a str,
}

impl Serialize for AnalysisResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            AnalysisResult::Success(analysis) => SuccessRecord {
                ok: true,
                analysis,
            }
            .serialize(serializer),
            AnalysisResult::Failure { message } => FailureRecord { ok: false, message }.serialize(serializer),
        }
    }
}

/// Loads the CSV at `path` and analyzes it. Never returns an error; failures
/// become [`AnalysisResult::Failure`].
pub fn run_pipeline(path: impl AsRef<Path>, config: &PipelineConfig) -> AnalysisResult {
    let mut source = CsvSource::new(path);
    run_source(&mut source, config)
}

pub fn run_source<S: SampleSource>(source: &mut S, config: &PipelineConfig) -> AnalysisResult {
    source
        .read_batch()
        .map_err(PipelineError::from)
        .and_then(|batch| analyze(&batch, config))
        .into()
}

/// Analyzes an already loaded batch.
pub fn analyze_batch(batch: &SampleBatch, config: &PipelineConfig) -> AnalysisResult {
    analyze(batch, config).into()
}

fn analyze(batch: &SampleBatch, config: &PipelineConfig) -> Result<Analysis, PipelineError> {
    config.validate()?;
    batch.validate(config.minimum_batch_samples())?;

    let sample_rate_hz = batch.sample_rate_hz(config.nominal_sample_rate);
    info!(
        "analyzing {} samples at {sample_rate_hz:.2} Hz{}",
        batch.len(),
        if batch.is_synthetic() { " (synthetic placeholder)" } else { "" }
    );

    let calibration = Calibration::from_config(config);
    let left = condition(&calibration.channel_to_microvolts(&batch.left), sample_rate_hz, config);
    let right = condition(&calibration.channel_to_microvolts(&batch.right), sample_rate_hz, config);

    let left_bands = decompose(&left, sample_rate_hz, config);
    let right_bands = decompose(&right, sample_rate_hz, config);

    let stats = ChannelStatistics::from_bands(&left_bands);
    let report = criteria::evaluate(&stats);
    let right_powers = BandPowers::from_signals(&right_bands);
    let spectrum = SpectrumBuilder::compute(&left, sample_rate_hz).summary();

    info!(
        "{} ({}/{} criteria, {:.1}%)",
        report.diagnosis, report.passed, report.total, report.confidence_score
    );

    Ok(Analysis {
        diagnosis: report.diagnosis,
        confidence_label: report.confidence,
        confidence_score: report.confidence_score,
        criteria_passed_count: report.passed,
        total_criteria: report.total,
        criteria: report.criteria,
        recommendation: report.recommendation,
        narrative: report.diagnosis.narrative(),
        relative_power: stats.powers.relative,
        band_powers: stats.powers.absolute,
        right_relative_power: right_powers.relative,
        sample_rate_hz,
        duration_seconds: batch.duration_seconds(),
        sample_count: batch.len(),
        spectrum,
        synthetic: batch.is_synthetic(),
    })
}

/// Mains notch on a calibrated channel.
fn condition(microvolts: &[f64], sample_rate_hz: f64, config: &PipelineConfig) -> Vec<f64> {
    notch_filter(
        microvolts,
        config.mains_frequency,
        sample_rate_hz,
        config.notch_quality_factor,
        config.minimum_filter_samples,
    )
}
