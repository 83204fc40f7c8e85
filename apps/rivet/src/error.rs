//! CLI error handling

use std::fmt;

use rivet_errors::UserFacingError;

/// CLI-specific error type
#[derive(Debug)]
pub enum CliError {
    /// Configuration error
    Config(rivet_errors::ConfigError),
    /// Error from one of the installer crates
    Core(rivet_errors::Error),
    /// The transaction ran and was rolled back
    TransactionFailed { status: String, message: String },
    /// Invalid command arguments
    InvalidArguments(String),
    /// I/O error
    Io(std::io::Error),
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::Config(e) => write!(f, "Configuration error: {e}"),
            CliError::Core(e) => {
                let message = e.user_message();
                write!(f, "{message}")?;
                if let Some(code) = e.user_code() {
                    write!(f, "\n  Code: {code}")?;
                }
                if let Some(hint) = e.user_hint() {
                    write!(f, "\n  Hint: {hint}")?;
                }
                if e.is_retryable() {
                    write!(f, "\n  Retry: safe to retry this operation.")?;
                }
                Ok(())
            }
            CliError::TransactionFailed { status, message } => {
                write!(f, "Transaction ended with status {status}: {message}")
            }
            CliError::InvalidArguments(msg) => write!(f, "Invalid arguments: {msg}"),
            CliError::Io(e) => write!(f, "I/O error: {e}"),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::Config(e) => Some(e),
            CliError::Core(e) => Some(e),
            CliError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<rivet_errors::ConfigError> for CliError {
    fn from(e: rivet_errors::ConfigError) -> Self {
        CliError::Config(e)
    }
}

impl From<rivet_errors::Error> for CliError {
    fn from(e: rivet_errors::Error) -> Self {
        CliError::Core(e)
    }
}

impl From<rivet_errors::ComponentError> for CliError {
    fn from(e: rivet_errors::ComponentError) -> Self {
        CliError::Core(e.into())
    }
}

impl From<std::io::Error> for CliError {
    fn from(e: std::io::Error) -> Self {
        CliError::Io(e)
    }
}
