//! Screening pipeline for a dual-channel EEG front end: calibration, mains
//! notch, band decomposition, band power and heuristic criteria scoring.
//!
//! The scoring thresholds are heuristic constants. This is not a validated
//! diagnostic instrument.
pub mod capture;
pub mod config;
pub mod criteria;
pub mod pipeline;
pub mod recorder;
pub mod report;
pub mod session;
pub mod signal;
pub mod types;

pub use config::{ConfigError, PipelineConfig};
pub use criteria::{CriteriaReport, Criterion};
pub use pipeline::{analyze_batch, run_pipeline, run_source, Analysis, AnalysisResult};
pub use types::{Band, BandMap, ConfidenceLevel, Diagnosis};
