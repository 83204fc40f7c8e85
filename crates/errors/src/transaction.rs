//! Transaction error types

use std::borrow::Cow;

use crate::UserFacingError;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TransactionError {
    #[error("operation {operation} failed: {message}")]
    OperationFailed { operation: String, message: String },

    #[error("transaction cancelled by user")]
    Cancelled,

    #[error("transaction already executed")]
    AlreadyExecuted,

    #[error("cleanup of {path} failed: {message}")]
    CleanupFailed { path: String, message: String },
}

impl UserFacingError for TransactionError {
    fn user_message(&self) -> Cow<'_, str> {
        Cow::Owned(self.to_string())
    }

    fn user_hint(&self) -> Option<&'static str> {
        match self {
            Self::OperationFailed { .. } => {
                Some("All performed operations were rolled back; fix the cause and retry.")
            }
            Self::AlreadyExecuted => Some("Build a fresh transaction from the resolved plan."),
            _ => None,
        }
    }

    fn is_retryable(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    fn user_code(&self) -> Option<&'static str> {
        let code = match self {
            Self::OperationFailed { .. } => "transaction.operation_failed",
            Self::Cancelled => "transaction.cancelled",
            Self::AlreadyExecuted => "transaction.already_executed",
            Self::CleanupFailed { .. } => "transaction.cleanup_failed",
        };
        Some(code)
    }
}
