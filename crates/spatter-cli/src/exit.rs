// Exit codes, one per error category
use spatter_common::{ConfigFileError, SpatterError};

pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_GENERIC_FAIL: i32 = 1;
pub const EXIT_CONFIGURATION: i32 = 2;
pub const EXIT_ALLOCATION: i32 = 3;
pub const EXIT_SYNCHRONIZATION: i32 = 4;
pub const EXIT_DEVICE: i32 = 5;

/// Map the first spatter error in the chain to its exit status.
pub fn exit_code_for(err: &anyhow::Error) -> i32 {
    for cause in err.chain() {
        if let Some(e) = cause.downcast_ref::<SpatterError>() {
            return e.exit_code();
        }
        if cause.downcast_ref::<ConfigFileError>().is_some() {
            return EXIT_CONFIGURATION;
        }
    }
    EXIT_GENERIC_FAIL
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;

    #[test]
    fn categories_map_to_constants() {
        let cases = [
            (SpatterError::config("x"), EXIT_CONFIGURATION),
            (
                SpatterError::Allocation { buffer: "dense buffer", bytes: 8, reason: "oom".into() },
                EXIT_ALLOCATION,
            ),
            (SpatterError::sync("x"), EXIT_SYNCHRONIZATION),
            (SpatterError::device("x"), EXIT_DEVICE),
        ];
        for (err, code) in cases {
            assert_eq!(err.exit_code(), code);
            assert_eq!(exit_code_for(&anyhow::Error::new(err)), code);
        }
    }

    #[test]
    fn context_does_not_hide_category() {
        let err: anyhow::Result<()> = Err(SpatterError::device("launch failed")).context("run failed");
        assert_eq!(exit_code_for(&err.unwrap_err()), EXIT_DEVICE);
    }

    #[test]
    fn config_file_errors_are_configuration() {
        let err = anyhow::Error::new(ConfigFileError::Validation("bad".into()));
        assert_eq!(exit_code_for(&err), EXIT_CONFIGURATION);
    }

    #[test]
    fn foreign_errors_are_generic() {
        let err = anyhow::anyhow!("stdout closed");
        assert_eq!(exit_code_for(&err), EXIT_GENERIC_FAIL);
        assert_ne!(EXIT_SUCCESS, EXIT_GENERIC_FAIL);
    }
}
