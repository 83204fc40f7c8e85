//! Integration tests for remote crate

#[cfg(test)]
mod tests {
    use rivet_config::constants::DEFAULT_AUTHORIZATION_KEY;
    use rivet_errors::{OperationErrorKind, RemoteError};
    use rivet_events::{AppEvent, RemoteEvent};
    use rivet_operations::{OperationEnvironment, OperationRegistry};
    use rivet_remote::*;
    use rivet_types::RemoteMode;
    use std::collections::BTreeMap;
    use std::path::Path;
    use std::time::Duration;
    use tokio::task::JoinHandle;
    use tokio_util::sync::CancellationToken;

    fn registry(root: &Path) -> OperationRegistry {
        OperationRegistry::with_builtin_kinds(&OperationEnvironment {
            user_settings_root: root.join("user"),
            system_settings_root: root.join("system"),
            speed_dial_dir: root.join("speed"),
            kit_extension: "kit".into(),
        })
    }

    async fn start(
        root: &Path,
        mode: RemoteMode,
        key: &str,
    ) -> (std::path::PathBuf, CancellationToken, JoinHandle<()>) {
        let socket = root.join("rivet.sock");
        let settings = ServerSettings {
            socket: socket.clone(),
            mode,
            authorization_key: key.to_string(),
        };
        let server = RemoteServer::bind(settings, registry(root)).await.unwrap();
        let token = CancellationToken::new();
        let serve_token = token.clone();
        let handle = tokio::spawn(async move {
            server.serve(serve_token).await.unwrap();
        });
        (socket, token, handle)
    }

    fn perform(kind: &str, arguments: Vec<String>, step: usize) -> ExecuteRequest {
        ExecuteRequest {
            kind: kind.to_string(),
            arguments,
            values: BTreeMap::new(),
            step,
            phase: ExecutePhase::Perform,
        }
    }

    #[tokio::test]
    async fn test_production_rejects_wrong_key() {
        let dir = tempfile::tempdir().unwrap();
        let (socket, token, handle) = start(dir.path(), RemoteMode::Production, "s3cret").await;

        let err = RemoteClient::connect(&socket, "wrong").await.unwrap_err();
        assert!(matches!(err, RemoteError::AuthorizationRejected { .. }));
        let err = RemoteClient::connect(&socket, DEFAULT_AUTHORIZATION_KEY)
            .await
            .unwrap_err();
        assert!(matches!(err, RemoteError::AuthorizationRejected { .. }));

        let client = RemoteClient::connect(&socket, "s3cret").await.unwrap();
        assert!(client.is_active());

        token.cancel();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_production_bind_requires_key() {
        let dir = tempfile::tempdir().unwrap();
        let settings = ServerSettings {
            socket: dir.path().join("rivet.sock"),
            mode: RemoteMode::Production,
            authorization_key: String::new(),
        };
        let err = RemoteServer::bind(settings, registry(dir.path()))
            .await
            .unwrap_err();
        assert!(matches!(err, RemoteError::InvalidSetup { .. }));
    }

    #[tokio::test]
    async fn test_debug_accepts_default_key_and_executes() {
        let dir = tempfile::tempdir().unwrap();
        let (socket, token, handle) = start(dir.path(), RemoteMode::Debug, "configured").await;
        let client = RemoteClient::connect(&socket, DEFAULT_AUTHORIZATION_KEY)
            .await
            .unwrap();

        let settings = dir.path().join("settings.toml");
        let arguments = vec![
            settings.to_string_lossy().into_owned(),
            "edition".to_string(),
            "pro".to_string(),
        ];
        let response = client
            .execute(perform("GlobalConfig", arguments.clone(), 0))
            .await
            .unwrap();
        assert!(response.success);
        assert!(tokio::fs::read_to_string(&settings)
            .await
            .unwrap()
            .contains("pro"));

        let undo = client
            .execute(ExecuteRequest {
                kind: "GlobalConfig".into(),
                arguments,
                values: response.values,
                step: 0,
                phase: ExecutePhase::Undo,
            })
            .await
            .unwrap();
        assert!(undo.success);
        assert!(!tokio::fs::read_to_string(&settings)
            .await
            .unwrap()
            .contains("pro"));

        token.cancel();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_failure_is_reported_in_result() {
        let dir = tempfile::tempdir().unwrap();
        let (socket, token, handle) = start(dir.path(), RemoteMode::Debug, "k").await;
        let client = RemoteClient::connect(&socket, "k").await.unwrap();

        let response = client
            .execute(perform("CreateLink", vec!["only-one".into()], 2))
            .await
            .unwrap();
        assert!(!response.success);
        assert_eq!(
            response.error_kind,
            Some(OperationErrorKind::InvalidArguments)
        );

        let response = client
            .execute(perform("NoSuchKind", vec![], 3))
            .await
            .unwrap();
        assert!(!response.success);
        assert!(response
            .error_message
            .unwrap()
            .contains("unknown operation kind"));

        token.cancel();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_shutdown_request_stops_server() {
        let dir = tempfile::tempdir().unwrap();
        let (socket, _token, handle) = start(dir.path(), RemoteMode::Debug, "k").await;
        let client = RemoteClient::connect(&socket, "k").await.unwrap();

        client.shutdown().await;
        assert!(!client.is_active());
        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .unwrap()
            .unwrap();
        assert!(!socket.exists());
    }

    #[tokio::test]
    async fn test_lost_connection_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let (socket, token, handle) = start(dir.path(), RemoteMode::Debug, "k").await;
        let (tx, mut rx) = rivet_events::channel();
        let client = RemoteClient::connect(&socket, "k")
            .await
            .unwrap()
            .with_event_sender(tx);

        token.cancel();
        handle.await.unwrap();
        // session tasks observe the same token and drop their streams
        tokio::time::sleep(Duration::from_millis(50)).await;

        let err = client
            .execute(perform("CreateLink", vec!["a".into(), "b".into()], 0))
            .await
            .unwrap_err();
        assert!(matches!(err, RemoteError::ConnectionLost { .. }));
        assert!(!client.is_active());

        let err = client
            .execute(perform("CreateLink", vec!["a".into(), "b".into()], 1))
            .await
            .unwrap_err();
        assert!(matches!(err, RemoteError::NotConnected));

        let mut saw_lost = false;
        while let Ok(message) = rx.try_recv() {
            if matches!(
                message.event,
                AppEvent::Remote(RemoteEvent::ConnectionLost { .. })
            ) {
                assert_eq!(
                    message.meta.labels.get("socket"),
                    Some(&socket.display().to_string())
                );
                saw_lost = true;
            }
        }
        assert!(saw_lost);
    }

    #[tokio::test]
    async fn test_connect_without_server() {
        let dir = tempfile::tempdir().unwrap();
        let err = RemoteClient::connect(&dir.path().join("absent.sock"), "k")
            .await
            .unwrap_err();
        assert!(matches!(err, RemoteError::ConnectFailed { .. }));
    }

    #[tokio::test]
    async fn test_session_events_are_correlated() {
        let dir = tempfile::tempdir().unwrap();
        let socket = dir.path().join("rivet.sock");
        let (tx, mut rx) = rivet_events::channel();
        let server = RemoteServer::bind(
            ServerSettings {
                socket: socket.clone(),
                mode: RemoteMode::Debug,
                authorization_key: "k".into(),
            },
            registry(dir.path()),
        )
        .await
        .unwrap()
        .with_event_sender(tx);
        let handle = tokio::spawn(server.serve(CancellationToken::new()));

        let client = RemoteClient::connect(&socket, "k").await.unwrap();
        client
            .execute(perform("CreateLink", vec!["only-one".into()], 4))
            .await
            .unwrap();
        client.shutdown().await;
        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .unwrap()
            .unwrap()
            .unwrap();

        let mut session_events = 0;
        while let Ok(message) = rx.try_recv() {
            let AppEvent::Remote(event) = &message.event else {
                continue;
            };
            assert_eq!(
                message.meta.labels.get("socket"),
                Some(&socket.display().to_string())
            );
            match event {
                RemoteEvent::SessionOpened { .. }
                | RemoteEvent::SessionAuthenticated { .. }
                | RemoteEvent::RequestExecuted { .. } => {
                    assert_eq!(message.meta.correlation_id.as_deref(), Some("session-1"));
                    session_events += 1;
                }
                RemoteEvent::ServerListening { .. } | RemoteEvent::ServerStopped { .. } => {
                    assert!(message.meta.correlation_id.is_none());
                }
                _ => {}
            }
        }
        assert_eq!(session_events, 3);
    }
}
