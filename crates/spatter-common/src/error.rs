//! Error taxonomy.
//!
//! Every failure in spatter is fatal for the run that hit it; there are no
//! retryable categories. The variants differ only in what they tell the
//! operator and which exit status the front end reports.

use thiserror::Error;

use crate::config::ConfigFileError;

/// Errors produced anywhere in the spatter pipeline.
#[derive(Debug, Error)]
pub enum SpatterError {
    /// Unknown kernel or backend, malformed or empty pattern, or lifecycle
    /// misuse. Raised before any buffer is allocated.
    #[error("configuration error: {reason}")]
    Configuration { reason: String },

    /// Host or device memory could not be acquired.
    #[error("failed to allocate {bytes} bytes for {buffer}: {reason}")]
    Allocation { buffer: &'static str, bytes: usize, reason: String },

    /// A process barrier could not complete. Fatal for the whole group.
    #[error("synchronization error: {reason}")]
    Synchronization { reason: String },

    /// Device runtime failure (context, compilation, launch, copy, events).
    #[error("device error: {reason}")]
    Device { reason: String },

    #[error(transparent)]
    ConfigFile(#[from] ConfigFileError),
}

/// Convenience result alias.
pub type Result<T> = std::result::Result<T, SpatterError>;

impl SpatterError {
    /// Build a [`SpatterError::Configuration`].
    pub fn config(reason: impl Into<String>) -> Self {
        Self::Configuration { reason: reason.into() }
    }

    /// Build a [`SpatterError::Device`].
    pub fn device(reason: impl Into<String>) -> Self {
        Self::Device { reason: reason.into() }
    }

    /// Build a [`SpatterError::Synchronization`].
    pub fn sync(reason: impl Into<String>) -> Self {
        Self::Synchronization { reason: reason.into() }
    }

    /// True for errors caused by bad input rather than the environment.
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration { .. } | Self::ConfigFile(_))
    }

    /// Process exit status for this error category.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Configuration { .. } | Self::ConfigFile(_) => 2,
            Self::Allocation { .. } => 3,
            Self::Synchronization { .. } => 4,
            Self::Device { .. } => 5,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_are_non_zero_and_distinct() {
        let errors = [
            SpatterError::config("x"),
            SpatterError::Allocation { buffer: "sparse", bytes: 8, reason: "oom".into() },
            SpatterError::sync("peer diverged"),
            SpatterError::device("launch failed"),
        ];
        let mut codes: Vec<i32> = errors.iter().map(SpatterError::exit_code).collect();
        assert!(codes.iter().all(|&c| c != 0));
        codes.dedup();
        assert_eq!(codes.len(), 4);
    }

    #[test]
    fn display_includes_reason() {
        let err = SpatterError::config("pattern must not be empty");
        assert_eq!(err.to_string(), "configuration error: pattern must not be empty");
        assert!(err.is_configuration());
    }

    #[test]
    fn allocation_display_names_buffer() {
        let err = SpatterError::Allocation {
            buffer: "dense",
            bytes: 1024,
            reason: "capacity overflow".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("dense"), "{msg}");
        assert!(msg.contains("1024"), "{msg}");
        assert!(!err.is_configuration());
    }
}
