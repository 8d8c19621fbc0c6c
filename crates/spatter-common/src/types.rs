//! Kernel and backend selectors.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::SpatterError;

/// Bytes per moved element. Buffers hold `f64` values.
pub const ELEMENT_SIZE: usize = std::mem::size_of::<f64>();

/// The two semantic kernels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Kernel {
    /// `dense[i] = sparse[pattern[i]]`
    Gather,
    /// `sparse[pattern[i]] = dense[i]`
    Scatter,
}

impl Kernel {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Gather => "gather",
            Self::Scatter => "scatter",
        }
    }
}

impl fmt::Display for Kernel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Kernel {
    type Err = SpatterError;

    /// Case-insensitive; anything other than `gather`/`scatter` is rejected.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "gather" => Ok(Self::Gather),
            "scatter" => Ok(Self::Scatter),
            other => Err(SpatterError::config(format!(
                "invalid kernel type '{other}', expected 'gather' or 'scatter'"
            ))),
        }
    }
}

/// Execution substrate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// Single-threaded sequential loop.
    Serial,
    /// Fork-join data-parallel loop on a host thread pool.
    #[serde(alias = "openmp")]
    Parallel,
    /// Device-resident buffers and kernels on a CUDA GPU.
    Cuda,
}

impl Backend {
    pub const ALL: [Backend; 3] = [Backend::Serial, Backend::Parallel, Backend::Cuda];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Serial => "serial",
            Self::Parallel => "parallel",
            Self::Cuda => "cuda",
        }
    }

    /// Name used in report headers.
    pub fn display_name(self) -> &'static str {
        match self {
            Self::Serial => "Serial",
            Self::Parallel => "Parallel",
            Self::Cuda => "CUDA",
        }
    }

    /// Returns true if this backend keeps its buffers on a device.
    pub fn requires_gpu(self) -> bool {
        matches!(self, Self::Cuda)
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Backend {
    type Err = SpatterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "serial" => Ok(Self::Serial),
            "parallel" | "openmp" => Ok(Self::Parallel),
            "cuda" => Ok(Self::Cuda),
            other => Err(SpatterError::config(format!(
                "unknown backend '{other}', expected one of serial, parallel, cuda"
            ))),
        }
    }
}
