//! Bytes-moved and bandwidth figures.

use std::fmt;

use spatter_common::ELEMENT_SIZE;

/// Mean bandwidth over all timed runs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Bandwidth {
    /// Decimal megabytes per second.
    MbPerSec(f64),
    /// No measurable time elapsed, so no finite figure exists.
    Undefined,
}

impl Bandwidth {
    pub fn mb_per_sec(self) -> Option<f64> {
        match self {
            Self::MbPerSec(v) => Some(v),
            Self::Undefined => None,
        }
    }
}

impl fmt::Display for Bandwidth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MbPerSec(v) => write!(f, "{v:.6}"),
            Self::Undefined => f.write_str("undefined"),
        }
    }
}

/// Summary of a benchmark configuration's measurements.
///
/// Renders the four stable report lines:
///
/// ```text
/// 320 Total Bytes Moved
/// 32 Bytes Moved per Run
/// 10 Runs took 1.000000 Seconds
/// Average Bandwidth: 0.000320 MB/s
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Report {
    pub nruns: u64,
    pub pattern_len: usize,
    pub element_size: usize,
    pub seconds: f64,
}

impl Report {
    pub fn new(nruns: u64, pattern_len: usize, seconds: f64) -> Self {
        Self { nruns, pattern_len, element_size: ELEMENT_SIZE, seconds }
    }

    pub fn with_element_size(mut self, element_size: usize) -> Self {
        self.element_size = element_size;
        self
    }

    pub fn bytes_per_run(&self) -> u64 {
        (self.pattern_len as u64).saturating_mul(self.element_size as u64)
    }

    pub fn total_bytes(&self) -> u64 {
        self.nruns.saturating_mul(self.bytes_per_run())
    }

    /// `total_bytes / seconds / 1e6`, or [`Bandwidth::Undefined`] when the
    /// elapsed time is zero, negative or not finite.
    pub fn bandwidth(&self) -> Bandwidth {
        if !(self.seconds.is_finite() && self.seconds > 0.0) {
            return Bandwidth::Undefined;
        }
        Bandwidth::MbPerSec(self.total_bytes() as f64 / self.seconds / 1_000_000.0)
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} Total Bytes Moved", self.total_bytes())?;
        writeln!(f, "{} Bytes Moved per Run", self.bytes_per_run())?;
        writeln!(f, "{} Runs took {:.6} Seconds", self.nruns, self.seconds)?;
        writeln!(f, "Average Bandwidth: {} MB/s", self.bandwidth())
    }
}
