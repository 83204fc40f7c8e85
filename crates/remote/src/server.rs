//! Elevated side of the remote execution channel

use crate::protocol::{self, ExecutePhase, ExecuteRequest, ExecuteResponse, Request, Response};
use rivet_config::constants::DEFAULT_AUTHORIZATION_KEY;
use rivet_config::RemoteConfig;
use rivet_errors::{Error, OperationErrorKind, RemoteError};
use rivet_events::{AppEvent, EventEmitter, EventMeta, EventSender, RemoteEvent};
use rivet_operations::OperationRegistry;
use rivet_types::RemoteMode;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{UnixListener, UnixStream};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Socket, mode and key of a listening server
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerSettings {
    pub socket: PathBuf,
    pub mode: RemoteMode,
    pub authorization_key: String,
}

impl ServerSettings {
    /// # Errors
    ///
    /// Returns a configuration error when production mode lacks a socket
    /// name or key.
    pub fn from_config(config: &RemoteConfig) -> Result<Self, Error> {
        Ok(Self {
            socket: config.socket_path()?,
            mode: config.mode,
            authorization_key: config.authorization_key()?,
        })
    }
}

/// Check a presented key against the server's settings
///
/// # Errors
///
/// Returns the rejection reason sent back to the client.
pub fn authorize(mode: RemoteMode, expected: &str, presented: &str) -> Result<(), String> {
    match mode {
        RemoteMode::Production if expected.is_empty() => {
            Err("server has no authorization key configured".to_string())
        }
        RemoteMode::Production if presented == expected => Ok(()),
        RemoteMode::Debug if presented == expected || presented == DEFAULT_AUTHORIZATION_KEY => {
            Ok(())
        }
        _ => Err("invalid authorization key".to_string()),
    }
}

struct SessionContext {
    settings: ServerSettings,
    registry: Arc<OperationRegistry>,
    event_sender: Option<EventSender>,
}

impl EventEmitter for SessionContext {
    fn event_sender(&self) -> Option<&EventSender> {
        self.event_sender.as_ref()
    }

    fn enrich_event_meta(&self, _event: &AppEvent, meta: EventMeta) -> EventMeta {
        meta.with_label("socket", self.settings.socket.display().to_string())
            .with_label("mode", self.settings.mode.to_string())
    }
}

/// Listens on a Unix socket and runs forwarded operations
pub struct RemoteServer {
    context: Arc<SessionContext>,
    listener: UnixListener,
}

impl std::fmt::Debug for RemoteServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteServer")
            .field("socket", &self.context.settings.socket)
            .field("mode", &self.context.settings.mode)
            .finish_non_exhaustive()
    }
}

impl RemoteServer {
    /// Bind the socket, replacing a stale one
    ///
    /// # Errors
    ///
    /// Returns `InvalidSetup` for a production server without a key and
    /// `BindFailed` when the socket cannot be created.
    pub async fn bind(
        settings: ServerSettings,
        registry: OperationRegistry,
    ) -> Result<Self, RemoteError> {
        if settings.mode == RemoteMode::Production && settings.authorization_key.is_empty() {
            return Err(RemoteError::InvalidSetup {
                message: "production mode requires a non-empty authorization key".to_string(),
            });
        }

        let socket = settings.socket.clone();
        let bind_failed = |e: std::io::Error| RemoteError::BindFailed {
            socket: socket.display().to_string(),
            message: e.to_string(),
        };

        if tokio::fs::symlink_metadata(&socket).await.is_ok() {
            tokio::fs::remove_file(&socket).await.map_err(bind_failed)?;
        }
        if let Some(parent) = socket.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(bind_failed)?;
        }

        let listener = UnixListener::bind(&socket).map_err(bind_failed)?;
        tokio::fs::set_permissions(&socket, std::fs::Permissions::from_mode(0o600))
            .await
            .map_err(bind_failed)?;

        info!(socket = %socket.display(), mode = %settings.mode, "remote server listening");
        Ok(Self {
            context: Arc::new(SessionContext {
                settings,
                registry: Arc::new(registry),
                event_sender: None,
            }),
            listener,
        })
    }

    /// Attach an event sender; call before `serve`
    #[must_use]
    pub fn with_event_sender(self, sender: EventSender) -> Self {
        let context = SessionContext {
            settings: self.context.settings.clone(),
            registry: Arc::clone(&self.context.registry),
            event_sender: Some(sender),
        };
        Self {
            context: Arc::new(context),
            listener: self.listener,
        }
    }

    #[must_use]
    pub fn socket_path(&self) -> &Path {
        &self.context.settings.socket
    }

    /// Accept sessions until `shutdown` fires or a client sends `Shutdown`
    ///
    /// Each session runs on its own task and handles its requests in order.
    /// The socket file is removed on return.
    ///
    /// # Errors
    ///
    /// Currently infallible once bound; accept errors are logged and skipped.
    pub async fn serve(self, shutdown: CancellationToken) -> Result<(), RemoteError> {
        let context = self.context;
        context.emit(AppEvent::Remote(RemoteEvent::ServerListening {
            socket: context.settings.socket.display().to_string(),
            mode: context.settings.mode.to_string(),
        }));

        let next_session = AtomicU64::new(1);
        loop {
            tokio::select! {
                () = shutdown.cancelled() => break,
                accepted = self.listener.accept() => match accepted {
                    Ok((stream, _addr)) => {
                        let session = next_session.fetch_add(1, Ordering::Relaxed);
                        let context = Arc::clone(&context);
                        let token = shutdown.clone();
                        tokio::spawn(async move {
                            if let Err(e) = run_session(&context, session, stream, &token).await {
                                debug!(session, error = %e, "session ended with error");
                            }
                            context.emit(AppEvent::Remote(RemoteEvent::SessionClosed { session }));
                        });
                    }
                    Err(e) => warn!(error = %e, "failed to accept remote session"),
                },
            }
        }

        if let Err(e) = tokio::fs::remove_file(&context.settings.socket).await {
            debug!(error = %e, "socket file already gone");
        }
        context.emit(AppEvent::Remote(RemoteEvent::ServerStopped {
            socket: context.settings.socket.display().to_string(),
        }));
        info!("remote server stopped");
        Ok(())
    }
}

async fn run_session(
    context: &SessionContext,
    session: u64,
    stream: UnixStream,
    shutdown: &CancellationToken,
) -> Result<(), RemoteError> {
    context.emit(AppEvent::Remote(RemoteEvent::SessionOpened { session }));
    let (read_half, mut writer) = stream.into_split();
    let mut reader = BufReader::new(read_half);
    let mut authenticated = false;

    loop {
        let mut line = String::new();
        let read = tokio::select! {
            () = shutdown.cancelled() => return Ok(()),
            read = reader.read_line(&mut line) => read.map_err(|e| RemoteError::ConnectionLost {
                message: e.to_string(),
            })?,
        };
        if read == 0 {
            return Ok(());
        }

        let request = match protocol::decode::<Request>(&line) {
            Ok(request) => request,
            Err(e) => {
                let reason = e.to_string();
                send(&mut writer, &Response::Rejected { reason }).await?;
                return Err(e);
            }
        };

        let (reply, close) = match request {
            Request::Authenticate { key } => {
                let settings = &context.settings;
                match authorize(settings.mode, &settings.authorization_key, &key) {
                    Ok(()) => {
                        authenticated = true;
                        context.emit(AppEvent::Remote(RemoteEvent::SessionAuthenticated {
                            session,
                        }));
                        (Response::Authenticated, false)
                    }
                    Err(reason) => {
                        context.emit(AppEvent::Remote(RemoteEvent::SessionRejected {
                            session,
                            reason: reason.clone(),
                        }));
                        (Response::Rejected { reason }, true)
                    }
                }
            }
            _ if !authenticated => (
                Response::Rejected {
                    reason: "session is not authenticated".to_string(),
                },
                true,
            ),
            Request::Execute(request) => {
                let kind = request.kind.clone();
                let step = request.step;
                let response = execute_request(&context.registry, request).await;
                context.emit(AppEvent::Remote(RemoteEvent::RequestExecuted {
                    session,
                    kind,
                    step,
                    success: response.success,
                }));
                (Response::Result(response), false)
            }
            Request::Shutdown => {
                shutdown.cancel();
                (Response::ShuttingDown, true)
            }
        };

        send(&mut writer, &reply).await?;
        if close {
            return Ok(());
        }
    }
}

async fn send(
    writer: &mut tokio::net::unix::OwnedWriteHalf,
    response: &Response,
) -> Result<(), RemoteError> {
    let line = protocol::encode(response)?;
    writer
        .write_all(line.as_bytes())
        .await
        .map_err(|e| RemoteError::ConnectionLost {
            message: e.to_string(),
        })?;
    writer
        .flush()
        .await
        .map_err(|e| RemoteError::ConnectionLost {
            message: e.to_string(),
        })
}

/// Run a request against a registry, as the server does for each session
pub async fn execute_request(
    registry: &OperationRegistry,
    request: ExecuteRequest,
) -> ExecuteResponse {
    let mut operation = match registry.create(&request.kind, request.arguments) {
        Ok(operation) => operation,
        Err(e) => {
            return ExecuteResponse {
                success: false,
                error_kind: Some(OperationErrorKind::InvalidArguments),
                error_message: Some(e.to_string()),
                values: request.values,
            }
        }
    };
    operation.state_mut().set_values(request.values);

    let success = match request.phase {
        ExecutePhase::Perform => {
            if operation.validate_arguments() {
                operation.backup().await;
                operation.perform_operation().await
            } else {
                false
            }
        }
        ExecutePhase::Undo => operation.undo_operation().await,
    };

    let state = operation.state();
    ExecuteResponse {
        success,
        error_kind: if success { None } else { state.error_kind() },
        error_message: if success {
            None
        } else {
            state.error().map(|e| e.message.clone())
        },
        values: state.values().clone(),
    }
}
