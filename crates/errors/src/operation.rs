//! Operation error types
//!
//! Operations report failures through their error slot rather than through
//! `Result`; `OperationError` is the value held by that slot.

use std::borrow::Cow;
use std::fmt;

use crate::UserFacingError;
use thiserror::Error;

/// Kind recorded in an operation's error slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum OperationErrorKind {
    /// Malformed call, no mutation attempted
    InvalidArguments,
    /// Kind-specific runtime failure, mutation may be partial
    UserDefinedError,
}

impl fmt::Display for OperationErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidArguments => write!(f, "InvalidArguments"),
            Self::UserDefinedError => write!(f, "UserDefinedError"),
        }
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[error("{kind}: {message}")]
pub struct OperationError {
    pub kind: OperationErrorKind,
    pub message: String,
}

impl OperationError {
    pub fn invalid_arguments(message: impl Into<String>) -> Self {
        Self {
            kind: OperationErrorKind::InvalidArguments,
            message: message.into(),
        }
    }

    pub fn user_defined(message: impl Into<String>) -> Self {
        Self {
            kind: OperationErrorKind::UserDefinedError,
            message: message.into(),
        }
    }
}

/// Errors raised while building operations from names
#[derive(Debug, Clone, Error)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum RegistryError {
    #[error("unknown operation kind: {name}")]
    UnknownKind { name: String },

    #[error("operation kind already registered: {name}")]
    AlreadyRegistered { name: String },
}

impl UserFacingError for OperationError {
    fn user_message(&self) -> Cow<'_, str> {
        Cow::Borrowed(&self.message)
    }

    fn user_code(&self) -> Option<&'static str> {
        Some(match self.kind {
            OperationErrorKind::InvalidArguments => "operation.invalid_arguments",
            OperationErrorKind::UserDefinedError => "operation.user_defined",
        })
    }
}

impl UserFacingError for RegistryError {
    fn user_message(&self) -> Cow<'_, str> {
        Cow::Owned(self.to_string())
    }

    fn user_hint(&self) -> Option<&'static str> {
        match self {
            Self::UnknownKind { .. } => {
                Some("Check the operation name in the component definition for typos.")
            }
            Self::AlreadyRegistered { .. } => None,
        }
    }

    fn user_code(&self) -> Option<&'static str> {
        Some(match self {
            Self::UnknownKind { .. } => "operation.unknown_kind",
            Self::AlreadyRegistered { .. } => "operation.already_registered",
        })
    }
}
