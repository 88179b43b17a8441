//! Error types for the conversion and execution shell.
//!
//! The splitter and translator never fail; everything here belongs to file
//! handling, configuration and statement execution.

use thiserror::Error;

/// Exit code for configuration and invalid-input errors.
pub const EXIT_CONFIG_ERROR: u8 = 1;
/// Exit code when the MySQL connection could not be established.
pub const EXIT_CONNECTION_ERROR: u8 = 2;
/// Exit code when one or more statements failed to execute.
pub const EXIT_STATEMENTS_FAILED: u8 = 3;
/// Exit code for file-system errors.
pub const EXIT_IO_ERROR: u8 = 7;
/// Exit code after SIGINT/SIGTERM.
pub const EXIT_CANCELLED: u8 = 130;

/// Main error type for migration operations.
#[derive(Error, Debug)]
pub enum MigrateError {
    /// Configuration error (invalid YAML values, missing connection settings, etc.)
    #[error("Configuration error: {0}")]
    Config(String),

    /// The input SQL file is unusable (not a file, empty, ...)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Connection error with context
    #[error("Connection error: {message}\n  Context: {context}")]
    Connection { message: String, context: String },

    /// Target database error
    #[error("Target database error: {0}")]
    Target(#[from] mysql_async::Error),

    /// Some statements of a script failed (the rest were still executed)
    #[error("{failed} of {total} statements failed")]
    StatementsFailed { failed: usize, total: usize },

    /// IO error (file operations)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML serialization/deserialization error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Execution was cancelled (SIGINT, etc.)
    #[error("Execution cancelled")]
    Cancelled,
}

impl MigrateError {
    /// Create a Connection error with context about where it occurred
    pub fn connection(message: impl ToString, context: impl Into<String>) -> Self {
        MigrateError::Connection {
            message: message.to_string(),
            context: context.into(),
        }
    }

    /// Process exit code for this error.
    pub fn exit_code(&self) -> u8 {
        match self {
            MigrateError::Config(_) | MigrateError::InvalidInput(_) | MigrateError::Yaml(_) => {
                EXIT_CONFIG_ERROR
            }
            MigrateError::Connection { .. } => EXIT_CONNECTION_ERROR,
            MigrateError::Target(_) | MigrateError::StatementsFailed { .. } => {
                EXIT_STATEMENTS_FAILED
            }
            MigrateError::Io(_) | MigrateError::Json(_) => EXIT_IO_ERROR,
            MigrateError::Cancelled => EXIT_CANCELLED,
        }
    }

    /// Format error with full details including error chain
    pub fn format_detailed(&self) -> String {
        let mut output = format!("Error: {}\n", self);

        let mut source = std::error::Error::source(self);
        let mut depth = 1;
        while let Some(err) = source {
            output.push_str(&format!("\nCaused by:\n  {}: {}", depth, err));
            source = err.source();
            depth += 1;
        }

        output
    }
}

/// Result type alias for migration operations.
pub type Result<T> = std::result::Result<T, MigrateError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        assert_eq!(MigrateError::Config("x".into()).exit_code(), EXIT_CONFIG_ERROR);
        assert_eq!(
            MigrateError::connection("refused", "connecting").exit_code(),
            EXIT_CONNECTION_ERROR
        );
        assert_eq!(
            MigrateError::StatementsFailed { failed: 1, total: 3 }.exit_code(),
            EXIT_STATEMENTS_FAILED
        );
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        assert_eq!(MigrateError::from(io).exit_code(), EXIT_IO_ERROR);
        assert_eq!(MigrateError::Cancelled.exit_code(), EXIT_CANCELLED);
    }

    #[test]
    fn test_format_detailed_includes_chain() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing file");
        let detailed = MigrateError::from(io).format_detailed();
        assert!(detailed.starts_with("Error: IO error: missing file"));
    }

    #[test]
    fn test_statements_failed_display() {
        let err = MigrateError::StatementsFailed { failed: 2, total: 10 };
        assert_eq!(err.to_string(), "2 of 10 statements failed");
    }
}
