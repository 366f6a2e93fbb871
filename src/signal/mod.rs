// src/signal/mod.rs
pub mod bands;
pub mod calibration;
pub mod error;
pub mod fft;
pub mod filter;
pub mod source;
// re-exports for the pipeline and binary
pub use bands::{decompose, mean_power, BandPowers, POWER_EPSILON};
pub use calibration::Calibration;
pub use error::{FilterError, SourceError};
pub use fft::{FrequencySpectrum, SpectrumBuilder, SpectrumSummary};
pub use filter::{bandpass_filter, notch_filter, FilterChain};
pub use source::{CsvSource, ManualSource, SampleBatch, SampleOrigin, SampleSource};
