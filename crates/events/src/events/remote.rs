use serde::{Deserialize, Serialize};

/// Remote execution channel events
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum RemoteEvent {
    /// Server bound its socket and accepts sessions
    ServerListening { socket: String, mode: String },

    /// Server stopped accepting sessions
    ServerStopped { socket: String },

    /// Peer connected, handshake pending
    SessionOpened { session: u64 },

    /// Handshake accepted
    SessionAuthenticated { session: u64 },

    /// Handshake rejected
    SessionRejected { session: u64, reason: String },

    /// Session ended
    SessionClosed { session: u64 },

    /// Client connected and authenticated
    ClientConnected { socket: String },

    /// A forwarded operation finished on the peer
    RequestExecuted {
        session: u64,
        kind: String,
        step: usize,
        success: bool,
    },

    /// Connection dropped while a request was pending
    ConnectionLost { socket: String, message: String },
}

impl RemoteEvent {
    /// Server session the event belongs to, if any
    #[must_use]
    pub fn session(&self) -> Option<u64> {
        match self {
            Self::SessionOpened { session }
            | Self::SessionAuthenticated { session }
            | Self::SessionRejected { session, .. }
            | Self::SessionClosed { session }
            | Self::RequestExecuted { session, .. } => Some(*session),
            Self::ServerListening { .. }
            | Self::ServerStopped { .. }
            | Self::ClientConnected { .. }
            | Self::ConnectionLost { .. } => None,
        }
    }
}
