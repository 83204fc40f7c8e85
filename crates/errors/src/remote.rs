//! Remote execution channel error types

use std::borrow::Cow;

use crate::UserFacingError;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum RemoteError {
    #[error("could not connect to {socket}: {message}")]
    ConnectFailed { socket: String, message: String },

    #[error("authorization rejected by {socket}: {reason}")]
    AuthorizationRejected { socket: String, reason: String },

    #[error("connection to remote peer lost: {message}")]
    ConnectionLost { message: String },

    #[error("protocol error: {message}")]
    Protocol { message: String },

    #[error("remote client is not connected")]
    NotConnected,

    #[error("could not bind {socket}: {message}")]
    BindFailed { socket: String, message: String },

    #[error("invalid remote session setup: {message}")]
    InvalidSetup { message: String },
}

impl UserFacingError for RemoteError {
    fn user_message(&self) -> Cow<'_, str> {
        Cow::Owned(self.to_string())
    }

    fn user_hint(&self) -> Option<&'static str> {
        match self {
            Self::ConnectFailed { .. } | Self::NotConnected => {
                Some("Start the elevated peer with `rivet start-server` and retry.")
            }
            Self::AuthorizationRejected { .. } => {
                Some("Use the same authorization key for the client and the peer process.")
            }
            Self::BindFailed { .. } => {
                Some("Remove the stale socket file or choose another socket name.")
            }
            _ => None,
        }
    }

    fn is_retryable(&self) -> bool {
        matches!(self, Self::ConnectFailed { .. })
    }

    fn user_code(&self) -> Option<&'static str> {
        let code = match self {
            Self::ConnectFailed { .. } => "remote.connect_failed",
            Self::AuthorizationRejected { .. } => "remote.authorization_rejected",
            Self::ConnectionLost { .. } => "remote.connection_lost",
            Self::Protocol { .. } => "remote.protocol",
            Self::NotConnected => "remote.not_connected",
            Self::BindFailed { .. } => "remote.bind_failed",
            Self::InvalidSetup { .. } => "remote.invalid_setup",
        };
        Some(code)
    }
}
