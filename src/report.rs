// src/report.rs
use std::fmt;
use std::fs;
use std::io;
use std::path::Path;

use chrono::{DateTime, Local};
use thiserror::Error;

use crate::pipeline::{Analysis, AnalysisResult};

const WIDTH: usize = 60;

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("failed analyses have no report: {0}")]
    NoAnalysis(String),
    #[error("failed to write report: {0}")]
    Io(#[from] io::Error),
}

/// Fixed-layout plain-text report for one analysis.
pub struct Report<'a> {
    pub analysis: &'a Analysis,
    pub generated_at: DateTime<Local>,
}

impl fmt::Display for Report<'_> {
    fn fmt(&self, out: &mut fmt::Formatter<'_>) -> fmt::Result {
        let analysis = self.analysis;
        let heavy = "=".repeat(WIDTH);
        let light = "-".repeat(WIDTH);

        writeln!(out, "{heavy}")?;
        writeln!(out, "{:^WIDTH$}", "EEG READING SCREEN REPORT")?;
        writeln!(out, "{heavy}\n")?;
        writeln!(out, "Date: {}\n", self.generated_at.format("%Y-%m-%d %H:%M:%S"))?;
        writeln!(out, "RESULT: {}", analysis.diagnosis)?;
        writeln!(
            out,
            "Confidence: {:.1}% ({})\n",
            analysis.confidence_score, analysis.confidence_label
        )?;
        writeln!(out, "SUMMARY:\n{}\n", analysis.narrative)?;
        writeln!(out, "RECOMMENDATION:\n{}\n", analysis.recommendation)?;

        writeln!(out, "{light}")?;
        writeln!(
            out,
            "DETECTED PATTERNS ({}/{}):",
            analysis.criteria_passed_count, analysis.total_criteria
        )?;
        for criterion in &analysis.criteria {
            let mark = if criterion.passed { "[x]" } else { "[ ]" };
            writeln!(out, "{mark} {}", criterion.description)?;
        }

        writeln!(out, "\n{light}")?;
        writeln!(out, "TECHNICAL DETAILS:")?;
        writeln!(out, "Sampling rate: {:.2} Hz", analysis.sample_rate_hz)?;
        writeln!(
            out,
            "Duration: {:.2} s ({} samples)",
            analysis.duration_seconds, analysis.sample_count
        )?;
        let source = if analysis.synthetic {
            "synthetic placeholder (raw channel columns missing)"
        } else {
            "capture"
        };
        writeln!(out, "Source: {source}")?;
        if let Some(spectrum) = &analysis.spectrum {
            writeln!(out, "Dominant frequency: {:.2} Hz", spectrum.dominant_frequency_hz)?;
        }
        for criterion in &analysis.criteria {
            writeln!(
                out,
                "  {:<20} {:<4} value {:>10.3}  threshold {:>6.2}",
                criterion.name,
                if criterion.passed { "PASS" } else { "FAIL" },
                criterion.value,
                criterion.threshold
            )?;
        }

        writeln!(out, "\nRELATIVE BAND POWER (left / right):")?;
        for (band, left) in analysis.relative_power.iter() {
            let right = analysis.right_relative_power.get(band);
            writeln!(out, "  {:<20} {left:>6.2}% / {right:>6.2}%", band.label())?;
        }
        writeln!(out, "{heavy}")
    }
}

pub fn render_report(analysis: &Analysis, generated_at: DateTime<Local>) -> String {
    Report {
        analysis,
        generated_at,
    }
    .to_string()
}

/// Renders and writes the report for a successful result.
pub fn write_report(result: &AnalysisResult, path: impl AsRef<Path>) -> Result<(), ReportError> {
    let analysis = match result {
        AnalysisResult::Success(analysis) => analysis,
        AnalysisResult::Failure { message } => return Err(ReportError::NoAnalysis(message.clone())),
    };
    fs::write(path, render_report(analysis, Local::now()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PipelineConfig;
    use crate::pipeline::analyze_batch;
    use crate::signal::SampleBatch;
    use chrono::TimeZone;

    fn synthetic_analysis() -> Analysis {
        analyze_batch(&SampleBatch::synthetic(), &PipelineConfig::default())
            .analysis()
            .cloned()
            .unwrap()
    }

    #[test]
    fn report_has_fixed_sections() {
        let analysis = synthetic_analysis();
        let date = Local.with_ymd_and_hms(2024, 5, 1, 9, 30, 0).unwrap();
        let text = render_report(&analysis, date);

        assert!(text.starts_with(&"=".repeat(WIDTH)));
        assert!(text.trim_end().ends_with(&"=".repeat(WIDTH)));
        assert!(text.contains("Date: 2024-05-01 09:30:00"));
        assert!(text.contains(&format!("RESULT: {}", analysis.diagnosis.label())));
        assert!(text.contains("SUMMARY:"));
        assert!(text.contains(analysis.recommendation));
        assert!(text.contains("Source: synthetic placeholder"));
        for criterion in &analysis.criteria {
            assert!(text.contains(criterion.description), "{}", criterion.name);
            assert!(text.contains(criterion.name));
        }
        assert!(text.contains("Delta (0.5-4 Hz)"));
        assert!(text.contains("Gamma (30-45 Hz)"));
    }

    #[test]
    fn display_matches_rendered_text() {
        let analysis = synthetic_analysis();
        let date = Local.with_ymd_and_hms(2024, 5, 1, 9, 30, 0).unwrap();
        let report = Report {
            analysis: &analysis,
            generated_at: date,
        };
        assert_eq!(format!("{report}"), render_report(&analysis, date));
    }

    #[test]
    fn pattern_marks_follow_pass_flags() {
        let analysis = synthetic_analysis();
        let text = render_report(&analysis, Local::now());
        let marked = text.lines().filter(|l| l.starts_with("[x]")).count();
        let unmarked = text.lines().filter(|l| l.starts_with("[ ]")).count();
        assert_eq!(marked, analysis.criteria_passed_count);
        assert_eq!(marked + unmarked, analysis.total_criteria);
    }

    #[test]
    fn failures_are_not_written() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.txt");
        let failure = AnalysisResult::Failure {
            message: "no data".into(),
        };
        assert!(matches!(write_report(&failure, &path), Err(ReportError::NoAnalysis(_))));
        assert!(!path.exists());

        let success = analyze_batch(&SampleBatch::synthetic(), &PipelineConfig::default());
        write_report(&success, &path).unwrap();
        assert!(fs::read_to_string(&path).unwrap().contains("TECHNICAL DETAILS:"));
    }
}
