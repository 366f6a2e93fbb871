use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use log::{info, warn};
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::Serialize;

use crate::signal::SourceError;

pub const TIMESTAMP_COLUMN: &str = "Timestamp";
pub const LEFT_COLUMN: &str = "ADC_LEFT";
pub const RIGHT_COLUMN: &str = "ADC_RIGHT";
/// Header names written by the earlier acquisition tool.
const LEFT_ALIASES: [&str; 2] = [LEFT_COLUMN, "ADC_KIRI"];
const RIGHT_ALIASES: [&str; 2] = [RIGHT_COLUMN, "ADC_KANAN"];

/// Placeholder recording used when a file lacks the raw-channel columns.
pub const SYNTHETIC_SAMPLES: usize = 2560;
pub const SYNTHETIC_DURATION_SECONDS: f64 = 10.0;
const SYNTHETIC_SEED: u64 = 0x5EED_EE60;
const SYNTHETIC_CODE_RANGE: std::ops::Range<i64> = 1000..3000;

/// Where the samples of a batch came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SampleOrigin {
    Capture,
    Synthetic,
}

/// Timestamped dual-channel raw ADC readings.
#[derive(Clone, Debug, PartialEq)]
pub struct SampleBatch {
    pub timestamps: Vec<f64>,
    pub left: Vec<i64>,
    pub right: Vec<i64>,
    pub origin: SampleOrigin,
}

impl SampleBatch {
    pub fn new(
        timestamps: Vec<f64>,
        left: Vec<i64>,
        right: Vec<i64>,
        origin: SampleOrigin,
    ) -> Result<Self, SourceError> {
        if timestamps.len() != left.len() || left.len() != right.len() {
            return Err(SourceError::ChannelMismatch {
                timestamps: timestamps.len(),
                left: left.len(),
                right: right.len(),
            });
        }
        Ok(Self {
            timestamps,
            left,
            right,
            origin,
        })
    }

    /// Deterministic stand-in: 10 s at 256 Hz, codes from a fixed-seed RNG.
    pub fn synthetic() -> Self {
        let step = SYNTHETIC_DURATION_SECONDS / (SYNTHETIC_SAMPLES - 1) as f64;
        let timestamps = (0..SYNTHETIC_SAMPLES).map(|i| i as f64 * step).collect();
        let mut rng = StdRng::seed_from_u64(SYNTHETIC_SEED);
        let left = (0..SYNTHETIC_SAMPLES)
            .map(|_| rng.gen_range(SYNTHETIC_CODE_RANGE))
            .collect();
        let right = (0..SYNTHETIC_SAMPLES)
            .map(|_| rng.gen_range(SYNTHETIC_CODE_RANGE))
            .collect();
        Self {
            timestamps,
            left,
            right,
            origin: SampleOrigin::Synthetic,
        }
    }

    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    pub fn is_synthetic(&self) -> bool {
        self.origin == SampleOrigin::Synthetic
    }

    /// Enforces the minimum length. Out-of-order timestamps are only logged;
    /// a degenerate span makes [`SampleBatch::sample_rate_hz`] use the nominal rate.
    pub fn validate(&self, min_samples: usize) -> Result<(), SourceError> {
        if self.len() < min_samples {
            return Err(SourceError::InsufficientSamples {
                required: min_samples,
                actual: self.len(),
            });
        }
        if let Some(index) = self.timestamps.windows(2).position(|pair| !(pair[1] > pair[0])) {
            warn!(
                "timestamps are not strictly increasing from sample {}",
                index + 1
            );
        }
        Ok(())
    }

    pub fn duration_seconds(&self) -> f64 {
        match (self.timestamps.first(), self.timestamps.last()) {
            (Some(first), Some(last)) if self.len() > 1 => last - first,
            _ => 0.0,
        }
    }

    /// `len / duration`, or `nominal_hz` when the duration is degenerate.
    pub fn sample_rate_hz(&self, nominal_hz: f64) -> f64 {
        let duration = self.duration_seconds();
        if self.len() > 1 && duration > 0.0 {
            self.len() as f64 / duration
        } else {
            nominal_hz
        }
    }
}

/// Anything that can hand the pipeline one batch of raw samples.
pub trait SampleSource {
    fn read_batch(&mut self) -> Result<SampleBatch, SourceError>;
}

/// CSV file with a `Timestamp,ADC_LEFT,ADC_RIGHT` header.
pub struct CsvSource {
    path: PathBuf,
}

impl CsvSource {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

impl SampleSource for CsvSource {
    fn read_batch(&mut self) -> Result<SampleBatch, SourceError> {
        let file = File::open(&self.path)?;
        let batch = read_csv(file)?;
        info!(
            "loaded {} samples from {} ({:?})",
            batch.len(),
            self.path.display(),
            batch.origin
        );
        Ok(batch)
    }
}

/// In-memory source useful for tests and deterministic playback.
pub struct ManualSource {
    batch: Option<SampleBatch>,
}

impl ManualSource {
    pub fn new(batch: SampleBatch) -> Self {
        Self { batch: Some(batch) }
    }
}

impl SampleSource for ManualSource {
    fn read_batch(&mut self) -> Result<SampleBatch, SourceError> {
        self.batch.take().ok_or(SourceError::Empty)
    }
}

/// Parses CSV sample data. Missing raw-channel columns yield [`SampleBatch::synthetic`].
pub fn read_csv<R: Read>(reader: R) -> Result<SampleBatch, SourceError> {
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(reader);
    let headers = rdr.headers()?.clone();
    if headers.is_empty() {
        return Err(SourceError::Empty);
    }
    let find = |name: &str| headers.iter().position(|h| h.eq_ignore_ascii_case(name));
    let find_any = |names: &[&str]| names.iter().find_map(|name| find(*name));
    let (Some(left_col), Some(right_col)) = (find_any(&LEFT_ALIASES), find_any(&RIGHT_ALIASES)) else {
        warn!("raw channel columns {LEFT_COLUMN}/{RIGHT_COLUMN} not found, substituting synthetic data");
        return Ok(SampleBatch::synthetic());
    };
    let time_col = find(TIMESTAMP_COLUMN).ok_or(SourceError::MissingColumn(TIMESTAMP_COLUMN))?;

    let mut timestamps = Vec::new();
    let mut left = Vec::new();
    let mut right = Vec::new();
    for record in rdr.records() {
        let record = record?;
        let line = record.position().map(|p| p.line()).unwrap_or(0);
        timestamps.push(parse_timestamp(&record, time_col, line)?);
        left.push(parse_code(&record, left_col, line, LEFT_COLUMN)?);
        right.push(parse_code(&record, right_col, line, RIGHT_COLUMN)?);
    }
    SampleBatch::new(timestamps, left, right, SampleOrigin::Capture)
}

fn field<'r>(
    record: &'r csv::StringRecord,
    index: usize,
    line: u64,
    column: &'static str,
) -> Result<&'r str, SourceError> {
    match record.get(index) {
        Some(value) if !value.is_empty() => Ok(value),
        _ => Err(SourceError::MissingValue { line, column }),
    }
}

fn parse_timestamp(record: &csv::StringRecord, index: usize, line: u64) -> Result<f64, SourceError> {
    let value = field(record, index, line, TIMESTAMP_COLUMN)?;
    match value.parse::<f64>() {
        Ok(t) if t.is_finite() => Ok(t),
        _ => Err(SourceError::BadValue {
            line,
            column: TIMESTAMP_COLUMN,
            value: value.to_owned(),
        }),
    }
}

/// Integer ADC code; integral floats such as `2048.0` are accepted too.
fn parse_code(
    record: &csv::StringRecord,
    index: usize,
    line: u64,
    column: &'static str,
) -> Result<i64, SourceError> {
    let value = field(record, index, line, column)?;
    if let Ok(code) = value.parse::<i64>() {
        return Ok(code);
    }
    match value.parse::<f64>() {
        Ok(code) if code.is_finite() && code.fract() == 0.0 => Ok(code as i64),
        _ => Err(SourceError::BadValue {
            line,
            column,
            value: value.to_owned(),
        }),
    }
}
