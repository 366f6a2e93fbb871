use std::fs::File;
use std::io::{self, Write};
use std::path::Path;

use crate::signal::source::{LEFT_COLUMN, RIGHT_COLUMN, TIMESTAMP_COLUMN};

/// Writes raw samples in the CSV layout the pipeline loads.
pub struct SampleRecorder<W: Write> {
    writer: csv::Writer<W>,
    rows: usize,
}

impl SampleRecorder<File> {
    pub fn create(path: impl AsRef<Path>) -> Result<Self, csv::Error> {
        Self::new(File::create(path)?)
    }
}

impl<W: Write> SampleRecorder<W> {
    pub fn new(inner: W) -> Result<Self, csv::Error> {
        let mut writer = csv::Writer::from_writer(inner);
        writer.write_record([TIMESTAMP_COLUMN, LEFT_COLUMN, RIGHT_COLUMN])?;
        Ok(Self { writer, rows: 0 })
    }

    /// `timestamp` is seconds since capture start.
    pub fn write_sample(&mut self, timestamp: f64, left: i64, right: i64) -> Result<(), csv::Error> {
        self.writer.write_record(&[
            format!("{timestamp:.6}"),
            left.to_string(),
            right.to_string(),
        ])?;
        self.rows += 1;
        Ok(())
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Flushes and hands back the underlying writer.
    pub fn finish(self) -> io::Result<W> {
        self.writer.into_inner().map_err(|err| err.into_error())
    }
}
