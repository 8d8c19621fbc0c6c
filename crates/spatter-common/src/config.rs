//! Benchmark configuration file format.
//!
//! Loads [`SpatterConfig`] from a TOML file (`spatter.toml`) with environment
//! variable overrides via `SPATTER_*` prefixed variables. Every field has a
//! default, so a file only needs the keys it wants to change.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::types::{Backend, Kernel};

/// Seed used when none is configured. Matches the implicit seed of the C
/// library `rand()` so unseeded runs stay comparable.
pub const DEFAULT_SEED: u64 = 1;

/// Benchmark configuration loaded from TOML with environment overrides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpatterConfig {
    /// Execution backend.
    /// Override: `SPATTER_BACKEND`
    pub backend: Backend,

    /// Kernel name (`gather` or `scatter`, case-insensitive).
    /// Override: `SPATTER_KERNEL`
    pub kernel: String,

    /// Pattern specification (explicit list or generator expression).
    /// Override: `SPATTER_PATTERN`
    pub pattern: String,

    /// Offset added per pattern repetition.
    /// Override: `SPATTER_DELTA`
    pub delta: usize,

    /// Number of pattern repetitions. Unset means 1, or the compiler's
    /// delta default when `delta` is non-zero.
    /// Override: `SPATTER_COUNT`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<usize>,

    /// Number of timed runs.
    /// Override: `SPATTER_NRUNS`
    pub nruns: u64,

    /// Diagnostic verbosity (0 = report only).
    /// Override: `SPATTER_VERBOSITY`
    pub verbosity: u8,

    /// Seed for buffer contents.
    /// Override: `SPATTER_SEED`
    pub seed: u64,

    /// Worker threads for the parallel backend (0 = all available CPUs).
    /// Override: `SPATTER_THREADS`
    pub threads: usize,

    /// Zero-based CUDA device index.
    /// Override: `SPATTER_DEVICE_INDEX`
    pub device_index: usize,

    /// Synchronize cooperating MPI processes before every kernel call.
    /// Override: `SPATTER_DISTRIBUTED`
    pub distributed: bool,
}

impl Default for SpatterConfig {
    fn default() -> Self {
        Self {
            backend: Backend::Serial,
            kernel: Kernel::Gather.to_string(),
            pattern: "UNIFORM:8:1".to_string(),
            delta: 0,
            count: None,
            nruns: 10,
            verbosity: 0,
            seed: DEFAULT_SEED,
            threads: 0,
            device_index: 0,
            distributed: false,
        }
    }
}

/// Errors that can occur when loading or validating a [`SpatterConfig`].
#[derive(Debug, thiserror::Error)]
pub enum ConfigFileError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("invalid environment override {key}={value}: {reason}")]
    EnvOverride { key: String, value: String, reason: String },
}

impl SpatterConfig {
    /// Generate a default configuration TOML string.
    pub fn default_toml() -> String {
        // A struct of plain scalars always serializes.
        toml::to_string_pretty(&Self::default()).unwrap_or_default()
    }

    /// Load configuration from a TOML file, then apply environment overrides.
    ///
    /// Not validated: callers layer their own overrides on top and then call
    /// [`SpatterConfig::validate`].
    pub fn load(path: &Path) -> Result<Self, ConfigFileError> {
        let contents = std::fs::read_to_string(path)?;
        let mut cfg: SpatterConfig = toml::from_str(&contents)?;
        cfg.apply_env_overrides()?;
        Ok(cfg)
    }

    /// Load from a TOML string, apply environment overrides and validate.
    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigFileError> {
        let mut cfg: SpatterConfig = toml::from_str(toml_str)?;
        cfg.apply_env_overrides()?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Load only from environment variables, starting from defaults.
    pub fn from_env() -> Result<Self, ConfigFileError> {
        let mut cfg = Self::default();
        cfg.apply_env_overrides()?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigFileError> {
        if let Err(e) = self.kernel.parse::<Kernel>() {
            return Err(ConfigFileError::Validation(e.to_string()));
        }
        if self.pattern.trim().is_empty() {
            return Err(ConfigFileError::Validation("pattern must not be empty".into()));
        }
        if self.nruns == 0 {
            return Err(ConfigFileError::Validation("nruns must be > 0".into()));
        }
        if self.count == Some(0) {
            return Err(ConfigFileError::Validation("count must be > 0".into()));
        }
        Ok(())
    }

    /// Apply `SPATTER_*` environment variable overrides.
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigFileError> {
        if let Ok(val) = std::env::var("SPATTER_BACKEND") {
            self.backend = val.parse::<Backend>().map_err(|e| ConfigFileError::EnvOverride {
                key: "SPATTER_BACKEND".into(),
                value: val.clone(),
                reason: e.to_string(),
            })?;
        }

        if let Ok(val) = std::env::var("SPATTER_KERNEL") {
            self.kernel = val;
        }

        if let Ok(val) = std::env::var("SPATTER_PATTERN") {
            self.pattern = val;
        }

        if let Ok(val) = std::env::var("SPATTER_DELTA") {
            self.delta = parse_env("SPATTER_DELTA", &val)?;
        }

        if let Ok(val) = std::env::var("SPATTER_COUNT") {
            self.count = Some(parse_env("SPATTER_COUNT", &val)?);
        }

        if let Ok(val) = std::env::var("SPATTER_NRUNS") {
            self.nruns = parse_env("SPATTER_NRUNS", &val)?;
        }

        if let Ok(val) = std::env::var("SPATTER_VERBOSITY") {
            self.verbosity = parse_env("SPATTER_VERBOSITY", &val)?;
        }

        if let Ok(val) = std::env::var("SPATTER_SEED") {
            self.seed = parse_env("SPATTER_SEED", &val)?;
        }

        if let Ok(val) = std::env::var("SPATTER_THREADS") {
            self.threads = parse_env("SPATTER_THREADS", &val)?;
        }

        if let Ok(val) = std::env::var("SPATTER_DEVICE_INDEX") {
            self.device_index = parse_env("SPATTER_DEVICE_INDEX", &val)?;
        }

        if let Ok(val) = std::env::var("SPATTER_DISTRIBUTED") {
            self.distributed = matches!(val.to_ascii_lowercase().as_str(), "1" | "true" | "yes");
        }

        Ok(())
    }

    /// Worker thread count, `None` meaning "all available CPUs".
    pub fn threads(&self) -> Option<usize> {
        (self.threads > 0).then_some(self.threads)
    }
}

fn parse_env<T>(key: &str, val: &str) -> Result<T, ConfigFileError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    val.trim().parse::<T>().map_err(|e| ConfigFileError::EnvOverride {
        key: key.into(),
        value: val.into(),
        reason: e.to_string(),
    })
}
