//! Serial acquisition from the two-channel front end.
//!
//! The board prints one `left,right` pair of ADC codes per line. Capture
//! writes them through [`SampleRecorder`] so the result loads straight into
//! the pipeline.
use std::io::{BufRead, BufReader, ErrorKind, Write};
use std::path::PathBuf;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use log::{debug, info, warn};

use crate::recorder::SampleRecorder;

pub const DEFAULT_BAUD: u32 = 115_200;
/// Boards reset when the port opens; samples before this are boot noise.
const RESET_DELAY: Duration = Duration::from_secs(2);
const READ_TIMEOUT: Duration = Duration::from_millis(1000);

/// Names of the serial ports visible to the OS.
pub fn list_ports() -> Result<Vec<String>> {
    let ports = serialport::available_ports().context("failed to enumerate serial ports")?;
    Ok(ports.into_iter().map(|p| p.port_name).collect())
}

/// Parses `left,right[,...]` into two codes. Extra fields are ignored.
pub fn parse_line(line: &str) -> Option<(i64, i64)> {
    let mut fields = line.trim().split(',');
    let left = fields.next()?.trim().parse().ok()?;
    let right = fields.next()?.trim().parse().ok()?;
    Some((left, right))
}

pub struct SerialCapture {
    pub port: String,
    pub baud: u32,
    pub out: PathBuf,
}

impl SerialCapture {
    pub fn new(port: impl Into<String>, out: impl Into<PathBuf>) -> Self {
        Self {
            port: port.into(),
            baud: DEFAULT_BAUD,
            out: out.into(),
        }
    }

    pub fn with_baud(mut self, baud: u32) -> Self {
        self.baud = baud;
        self
    }

    /// Records for `duration` and returns the number of rows written.
    pub fn record(&self, duration: Duration) -> Result<usize> {
        let port = serialport::new(&self.port, self.baud)
            .timeout(READ_TIMEOUT)
            .open()
            .with_context(|| format!("failed to open serial port {}", self.port))?;
        info!("opened {} at {} baud, waiting for board reset", self.port, self.baud);
        thread::sleep(RESET_DELAY);
        port.clear(serialport::ClearBuffer::Input)
            .context("failed to clear serial input buffer")?;

        let recorder = SampleRecorder::create(&self.out)
            .with_context(|| format!("failed to create {}", self.out.display()))?;
        let rows = capture_lines(BufReader::new(port), recorder, duration)?;
        info!("captured {rows} samples to {}", self.out.display());
        Ok(rows)
    }
}

/// Copies parsed lines from `reader` into `recorder` until `duration` elapses
/// or the reader is exhausted.
pub fn capture_lines<R: BufRead, W: Write>(
    mut reader: R,
    mut recorder: SampleRecorder<W>,
    duration: Duration,
) -> Result<usize> {
    let start = Instant::now();
    let mut line = String::new();
    let mut skipped = 0usize;
    while start.elapsed() < duration {
        line.clear();
        match reader.read_line(&mut line) {
            Ok(0) => break,
            Ok(_) => {}
            Err(e) if e.kind() == ErrorKind::TimedOut => continue,
            Err(e) if e.kind() == ErrorKind::InvalidData => {
                skipped += 1;
                continue;
            }
            Err(e) => return Err(e).context("serial read failed"),
        }
        let Some((left, right)) = parse_line(&line) else {
            debug!("skipping line {:?}", line.trim_end());
            skipped += 1;
            continue;
        };
        recorder
            .write_sample(start.elapsed().as_secs_f64(), left, right)
            .context("failed to write sample")?;
    }
    if skipped > 0 {
        warn!("skipped {skipped} unparseable lines");
    }
    let rows = recorder.rows();
    recorder.finish().context("failed to flush recording")?;
    Ok(rows)
}

/// Default output name, stamped with the local time.
pub fn default_output_path() -> PathBuf {
    PathBuf::from(format!(
        "eeg_record_{}.csv",
        chrono::Local::now().format("%Y%m%d_%H%M%S")
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signal::source::read_csv;
    use std::fs::File;

    #[test]
    fn parses_code_pairs() {
        assert_eq!(parse_line("2048,2050\r\n"), Some((2048, 2050)));
        assert_eq!(parse_line(" 1, 2 ,3"), Some((1, 2)));
        assert_eq!(parse_line("2048"), None);
        assert_eq!(parse_line("boot ok"), None);
        assert_eq!(parse_line("a,b"), None);
        assert_eq!(parse_line(""), None);
    }

    #[test]
    fn captures_until_input_ends() {
        let input = "ready\n2048,2047\n2050,2049\ngarbage\n2049,2048\n";
        let recorder = SampleRecorder::new(Vec::new()).unwrap();
        let rows = capture_lines(input.as_bytes(), recorder, Duration::from_secs(5)).unwrap();
        assert_eq!(rows, 3);
    }

    #[test]
    fn captured_file_loads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("capture.csv");
        let recorder = SampleRecorder::create(&path).unwrap();
        capture_lines("1,2\n3,4\n".as_bytes(), recorder, Duration::from_secs(5)).unwrap();
        let batch = read_csv(File::open(&path).unwrap()).unwrap();
        assert_eq!(batch.left, vec![1, 3]);
        assert_eq!(batch.right, vec![2, 4]);
    }

    #[test]
    fn default_output_is_csv() {
        let path = default_output_path();
        assert_eq!(path.extension().and_then(|e| e.to_str()), Some("csv"));
    }
}
