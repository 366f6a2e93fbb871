use thiserror::Error;

/// Numerical failures inside filter design or application.
///
/// These never leave the filter bank: callers log them and fall back to the
/// unfiltered signal.
#[derive(Debug, Error, PartialEq)]
pub enum FilterError {
    #[error("sample rate must be greater than zero")]
    InvalidSampleRate,
    #[error("normalized frequency {0} is outside (0, 1)")]
    CutoffOutOfRange(f64),
    #[error("band edges are inverted: low {low} >= high {high}")]
    InvertedBand { low: f64, high: f64 },
    #[error("quality factor must be greater than zero")]
    InvalidQuality,
    #[error("filter order must be at least 1")]
    InvalidOrder,
    #[error("filter design produced unstable or non-finite coefficients")]
    Unstable,
    #[error("signal of {len} samples is too short, need more than {pad} for edge padding")]
    SignalTooShort { len: usize, pad: usize },
    #[error("filter output contains non-finite values")]
    NonFinite,
}

/// Failures while loading or validating a sample source.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("failed to read sample source: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed sample source: {0}")]
    Csv(#[from] csv::Error),
    #[error("sample source has no header row")]
    Empty,
    #[error("sample source is missing the `{0}` column")]
    MissingColumn(&'static str),
    #[error("line {line}: column `{column}` is not a number: {value:?}")]
    BadValue {
        line: u64,
        column: &'static str,
        value: String,
    },
    #[error("line {line}: missing value for column `{column}`")]
    MissingValue { line: u64, column: &'static str },
    #[error("need at least {required} samples, got {actual}")]
    InsufficientSamples { required: usize, actual: usize },
    #[error("channel length mismatch: {timestamps} timestamps, {left} left, {right} right")]
    ChannelMismatch {
        timestamps: usize,
        left: usize,
        right: usize,
    },
}
