//! Error types for the jobgate CLI.
//!
//! Uses thiserror for derive macros. Lock contention and job outcomes are
//! not errors; they are returned as data (`Acquisition`, `JobRun`).

use crate::exit_codes;
use thiserror::Error;

/// Main error type for jobgate operations.
#[derive(Error, Debug)]
pub enum JobgateError {
    /// Invalid configuration value (empty name, negative duration, ...).
    #[error("Configuration error: {0}")]
    Config(String),

    /// Unrecoverable OS/filesystem error while setting up the instance lock.
    #[error("Lock environment error: {0}")]
    Environment(String),

    /// Filesystem operation failed outside of lock setup.
    #[error("I/O error: {0}")]
    Io(String),

    /// Anything else that should not happen.
    #[error("{0}")]
    Internal(String),
}

impl JobgateError {
    /// Returns the appropriate exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            JobgateError::Config(_) => exit_codes::CONFIG_ERROR,
            JobgateError::Environment(_) => exit_codes::CONFIG_ERROR,
            JobgateError::Io(_) => exit_codes::UNEXPECTED_ERROR,
            JobgateError::Internal(_) => exit_codes::UNEXPECTED_ERROR,
        }
    }
}

/// Result type alias for jobgate operations.
pub type Result<T> = std::result::Result<T, JobgateError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_error_has_correct_exit_code() {
        let err = JobgateError::Config("duration must not be negative".to_string());
        assert_eq!(err.exit_code(), exit_codes::CONFIG_ERROR);
    }

    #[test]
    fn environment_error_is_fatal_configuration() {
        let err = JobgateError::Environment("no writable lock directory".to_string());
        assert_eq!(err.exit_code(), exit_codes::CONFIG_ERROR);
    }

    #[test]
    fn io_and_internal_errors_are_unexpected() {
        assert_eq!(
            JobgateError::Io("disk full".to_string()).exit_code(),
            exit_codes::UNEXPECTED_ERROR
        );
        assert_eq!(
            JobgateError::Internal("bug".to_string()).exit_code(),
            exit_codes::UNEXPECTED_ERROR
        );
    }

    #[test]
    fn error_messages_are_descriptive() {
        let err = JobgateError::Config("instance name must not be empty".to_string());
        assert_eq!(
            err.to_string(),
            "Configuration error: instance name must not be empty"
        );

        let err = JobgateError::Environment("permission denied".to_string());
        assert_eq!(err.to_string(), "Lock environment error: permission denied");
    }
}
