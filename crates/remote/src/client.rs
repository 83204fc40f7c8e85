//! Client side of the remote execution channel

use crate::protocol::{self, ExecuteRequest, ExecuteResponse, Request, Response};
use async_trait::async_trait;
use rivet_config::RemoteConfig;
use rivet_errors::{Error, RemoteError};
use rivet_events::{AppEvent, EventEmitter, EventMeta, EventSender, RemoteEvent};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::unix::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::UnixStream;
use tokio::sync::Mutex;
use tracing::debug;

/// Anything that can run an operation kind out of process
#[async_trait]
pub trait RemoteExecutor: Send + Sync + fmt::Debug {
    /// Forward one request and wait for its result
    async fn execute(&self, request: ExecuteRequest) -> Result<ExecuteResponse, RemoteError>;

    fn is_active(&self) -> bool;
}

struct Connection {
    reader: BufReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
}

impl Connection {
    async fn round_trip(&mut self, request: &Request) -> Result<Response, RemoteError> {
        let line = protocol::encode(request)?;
        self.writer
            .write_all(line.as_bytes())
            .await
            .map_err(|e| connection_lost(&e))?;
        self.writer.flush().await.map_err(|e| connection_lost(&e))?;

        let mut reply = String::new();
        let read = self
            .reader
            .read_line(&mut reply)
            .await
            .map_err(|e| connection_lost(&e))?;
        if read == 0 {
            return Err(RemoteError::ConnectionLost {
                message: "peer closed the connection".to_string(),
            });
        }
        protocol::decode(&reply)
    }
}

fn connection_lost(e: &std::io::Error) -> RemoteError {
    RemoteError::ConnectionLost {
        message: e.to_string(),
    }
}

/// Authenticated connection to an elevated peer
///
/// Requests are serialized: one is in flight at a time.
pub struct RemoteClient {
    socket: PathBuf,
    connection: Mutex<Option<Connection>>,
    active: AtomicBool,
    event_sender: Option<EventSender>,
}

impl fmt::Debug for RemoteClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteClient")
            .field("socket", &self.socket)
            .field("active", &self.is_active())
            .finish_non_exhaustive()
    }
}

impl EventEmitter for RemoteClient {
    fn event_sender(&self) -> Option<&EventSender> {
        self.event_sender.as_ref()
    }

    fn enrich_event_meta(&self, _event: &AppEvent, meta: EventMeta) -> EventMeta {
        meta.with_label("socket", self.socket.display().to_string())
    }
}

impl RemoteClient {
    /// Connect and authenticate
    ///
    /// # Errors
    ///
    /// Returns `ConnectFailed` if nothing listens on `socket`,
    /// `AuthorizationRejected` if the peer refuses `key`, and
    /// `ConnectionLost`/`Protocol` for a broken handshake.
    pub async fn connect(socket: &Path, key: &str) -> Result<Self, RemoteError> {
        let stream = UnixStream::connect(socket)
            .await
            .map_err(|e| RemoteError::ConnectFailed {
                socket: socket.display().to_string(),
                message: e.to_string(),
            })?;
        let (read_half, writer) = stream.into_split();
        let mut connection = Connection {
            reader: BufReader::new(read_half),
            writer,
        };

        let reply = connection
            .round_trip(&Request::Authenticate {
                key: key.to_string(),
            })
            .await?;
        match reply {
            Response::Authenticated => {}
            Response::Rejected { reason } => {
                return Err(RemoteError::AuthorizationRejected {
                    socket: socket.display().to_string(),
                    reason,
                })
            }
            other => {
                return Err(RemoteError::Protocol {
                    message: format!("unexpected handshake reply: {other:?}"),
                })
            }
        }

        debug!(socket = %socket.display(), "remote client authenticated");
        Ok(Self {
            socket: socket.to_path_buf(),
            connection: Mutex::new(Some(connection)),
            active: AtomicBool::new(true),
            event_sender: None,
        })
    }

    /// Connect using the socket and key resolved from configuration
    ///
    /// # Errors
    ///
    /// Returns a configuration error when production mode lacks a socket
    /// name or key, otherwise the errors of [`RemoteClient::connect`].
    pub async fn connect_with_config(config: &RemoteConfig) -> Result<Self, Error> {
        let socket = config.socket_path()?;
        let key = config.authorization_key()?;
        Ok(Self::connect(&socket, &key).await?)
    }

    #[must_use]
    pub fn with_event_sender(mut self, sender: EventSender) -> Self {
        self.event_sender = Some(sender);
        self.emit(AppEvent::Remote(RemoteEvent::ClientConnected {
            socket: self.socket.display().to_string(),
        }));
        self
    }

    #[must_use]
    pub fn socket(&self) -> &Path {
        &self.socket
    }

    /// Ask the server to stop and drop the connection
    pub async fn shutdown(&self) {
        let mut guard = self.connection.lock().await;
        if let Some(mut connection) = guard.take() {
            if let Err(e) = connection.round_trip(&Request::Shutdown).await {
                debug!(error = %e, "no shutdown acknowledgement");
            }
        }
        self.active.store(false, Ordering::SeqCst);
    }

    /// Drop the connection, leaving the server running
    pub async fn disconnect(&self) {
        self.connection.lock().await.take();
        self.active.store(false, Ordering::SeqCst);
    }
}

#[async_trait]
impl RemoteExecutor for RemoteClient {
    async fn execute(&self, request: ExecuteRequest) -> Result<ExecuteResponse, RemoteError> {
        let mut guard = self.connection.lock().await;
        let Some(connection) = guard.as_mut() else {
            return Err(RemoteError::NotConnected);
        };

        match connection.round_trip(&Request::Execute(request)).await {
            Ok(Response::Result(response)) => Ok(response),
            Ok(other) => Err(RemoteError::Protocol {
                message: format!("unexpected reply to execute: {other:?}"),
            }),
            Err(RemoteError::ConnectionLost { message }) => {
                guard.take();
                self.active.store(false, Ordering::SeqCst);
                self.emit(AppEvent::Remote(RemoteEvent::ConnectionLost {
                    socket: self.socket.display().to_string(),
                    message: message.clone(),
                }));
                Err(RemoteError::ConnectionLost { message })
            }
            Err(e) => Err(e),
        }
    }

    fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }
}
