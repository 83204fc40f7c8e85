//! Integration tests for transaction crate

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use rivet_errors::{Error, OperationErrorKind, RemoteError, TransactionError};
    use rivet_events::{AppEvent, TransactionEvent};
    use rivet_operations::{
        Arity, Lifecycle, Operation, OperationEnvironment, OperationRegistry, OperationState,
    };
    use rivet_remote::{ExecuteRequest, ExecuteResponse, RemoteExecutor};
    use rivet_transaction::*;
    use rivet_types::{Direction, OperationSpec, PlanAction, PlannedOperation, TransactionPlan};
    use std::path::Path;
    use std::sync::{Arc, Mutex};
    use tokio_util::sync::CancellationToken;

    type Journal = Arc<Mutex<Vec<String>>>;

    /// Records every call; `fail` / `fail-undo` / `cancel` as second argument
    /// change its behaviour
    #[derive(Debug)]
    struct Recorder {
        state: OperationState,
        journal: Journal,
        token: CancellationToken,
    }

    impl Recorder {
        fn label(&self) -> String {
            self.state.argument(0).unwrap_or_default().to_string()
        }

        fn mode(&self) -> &str {
            self.state.argument(1).unwrap_or_default()
        }

        fn log(&self, what: &str) {
            self.journal
                .lock()
                .unwrap()
                .push(format!("{what}:{}", self.label()));
        }
    }

    #[async_trait]
    impl Operation for Recorder {
        fn state(&self) -> &OperationState {
            &self.state
        }

        fn state_mut(&mut self) -> &mut OperationState {
            &mut self.state
        }

        fn arity(&self) -> Arity {
            Arity::OneOf(&[1, 2])
        }

        async fn backup(&mut self) {
            self.state.set_value("backup", self.label());
            self.state.set_lifecycle(Lifecycle::BackedUp);
        }

        async fn perform_operation(&mut self) -> bool {
            self.log("perform");
            match self.mode() {
                "fail" => {
                    self.state.fail("forced failure");
                    false
                }
                "cancel" => {
                    self.token.cancel();
                    self.state.set_lifecycle(Lifecycle::Performed);
                    true
                }
                _ => {
                    self.state.set_lifecycle(Lifecycle::Performed);
                    true
                }
            }
        }

        async fn undo_operation(&mut self) -> bool {
            self.log("undo");
            if self.mode() == "fail-undo" {
                self.state.fail("undo refused");
                return false;
            }
            self.state.set_lifecycle(Lifecycle::Undone);
            true
        }

        fn clone_fresh(&self) -> Box<dyn Operation> {
            Box::new(Recorder {
                state: self.state.fresh(),
                journal: Arc::clone(&self.journal),
                token: self.token.clone(),
            })
        }
    }

    fn registry(root: &Path, journal: &Journal, token: &CancellationToken) -> OperationRegistry {
        let mut registry = OperationRegistry::with_builtin_kinds(&OperationEnvironment {
            user_settings_root: root.join("user"),
            system_settings_root: root.join("system"),
            speed_dial_dir: root.join("speed"),
            kit_extension: "kit".into(),
        });
        let journal = Arc::clone(journal);
        let token = token.clone();
        registry
            .register("Record", move |state| {
                Box::new(Recorder {
                    state,
                    journal: Arc::clone(&journal),
                    token: token.clone(),
                })
            })
            .unwrap();
        registry
    }

    fn plan(steps: &[&[&str]], direction: Direction) -> TransactionPlan {
        let action = match direction {
            Direction::Perform => PlanAction::Install,
            Direction::Revert => PlanAction::Uninstall,
        };
        TransactionPlan {
            action,
            components: vec!["app".into()],
            operations: steps
                .iter()
                .map(|args| PlannedOperation {
                    component: "app".into(),
                    spec: OperationSpec::new("Record", args.iter().copied()),
                    direction,
                })
                .collect(),
            required_space: 0,
        }
    }

    fn entries(journal: &Journal) -> Vec<String> {
        journal.lock().unwrap().clone()
    }

    #[tokio::test]
    async fn test_success_commits_every_step() {
        let dir = tempfile::tempdir().unwrap();
        let journal = Journal::default();
        let token = CancellationToken::new();
        let registry = registry(dir.path(), &journal, &token);

        let mut tx =
            Transaction::from_plan(&plan(&[&["a"], &["b"], &["c"]], Direction::Perform), &registry)
                .unwrap();
        let outcome = TransactionExecutor::default()
            .run(&mut tx, &token)
            .await
            .unwrap();

        assert!(outcome.is_success());
        assert_eq!(outcome.performed, 3);
        assert_eq!(tx.status(), TransactionStatus::Success);
        assert_eq!(entries(&journal), ["perform:a", "perform:b", "perform:c"]);
        for step in tx.steps() {
            assert_eq!(step.operation.state().lifecycle(), Lifecycle::Committed);
            assert!(step.operation.state().values().is_empty());
        }
    }

    #[tokio::test]
    async fn test_failure_rolls_back_in_reverse() {
        let dir = tempfile::tempdir().unwrap();
        let journal = Journal::default();
        let token = CancellationToken::new();
        let registry = registry(dir.path(), &journal, &token);
        let (tx_events, mut rx) = rivet_events::channel();

        let mut tx = Transaction::from_plan(
            &plan(
                &[&["a"], &["b"], &["c"], &["d", "fail"], &["e"]],
                Direction::Perform,
            ),
            &registry,
        )
        .unwrap();
        let outcome = TransactionExecutor::default()
            .with_event_sender(tx_events)
            .run(&mut tx, &token)
            .await
            .unwrap();

        assert_eq!(outcome.status, TransactionStatus::Failure);
        assert_eq!(outcome.performed, 3);
        assert_eq!(outcome.undone, 3);
        assert_eq!(outcome.undo_failures, 0);
        assert!(matches!(
            outcome.error,
            Some(Error::Transaction(TransactionError::OperationFailed { .. }))
        ));
        assert_eq!(
            entries(&journal),
            [
                "perform:a",
                "perform:b",
                "perform:c",
                "perform:d",
                "undo:c",
                "undo:b",
                "undo:a"
            ]
        );

        let mut kinds = Vec::new();
        while let Ok(message) = rx.try_recv() {
            if let AppEvent::Transaction(event) = message.event {
                kinds.push(match event {
                    TransactionEvent::Started { .. } => "started",
                    TransactionEvent::StepFailed { .. } => "step_failed",
                    TransactionEvent::RollbackStarted { .. } => "rollback_started",
                    TransactionEvent::RollbackCompleted { .. } => "rollback_completed",
                    TransactionEvent::Finished { .. } => "finished",
                    _ => continue,
                });
            }
        }
        assert_eq!(
            kinds,
            [
                "started",
                "step_failed",
                "rollback_started",
                "rollback_completed",
                "finished"
            ]
        );
    }

    #[tokio::test]
    async fn test_rollback_continues_past_undo_failure() {
        let dir = tempfile::tempdir().unwrap();
        let journal = Journal::default();
        let token = CancellationToken::new();
        let registry = registry(dir.path(), &journal, &token);

        let mut tx = Transaction::from_plan(
            &plan(
                &[&["a"], &["b", "fail-undo"], &["c"], &["d", "fail"]],
                Direction::Perform,
            ),
            &registry,
        )
        .unwrap();
        let outcome = TransactionExecutor::default()
            .run(&mut tx, &token)
            .await
            .unwrap();

        assert_eq!(outcome.status, TransactionStatus::Failure);
        assert_eq!(outcome.undone, 2);
        assert_eq!(outcome.undo_failures, 1);
        assert_eq!(
            &entries(&journal)[4..],
            ["undo:c", "undo:b", "undo:a"]
        );
    }

    #[tokio::test]
    async fn test_invalid_arguments_fail_before_backup() {
        let dir = tempfile::tempdir().unwrap();
        let journal = Journal::default();
        let token = CancellationToken::new();
        let registry = registry(dir.path(), &journal, &token);

        let mut tx = Transaction::from_plan(
            &plan(&[&["a"], &["b", "x", "too-many"]], Direction::Perform),
            &registry,
        )
        .unwrap();
        let outcome = TransactionExecutor::default()
            .run(&mut tx, &token)
            .await
            .unwrap();

        assert_eq!(outcome.status, TransactionStatus::Failure);
        assert_eq!(entries(&journal), ["perform:a", "undo:a"]);
        assert_eq!(
            tx.steps()[1].operation.state().error_kind(),
            Some(OperationErrorKind::InvalidArguments)
        );
        assert!(tx.steps()[1].operation.state().value("backup").is_none());
    }

    #[tokio::test]
    async fn test_cancellation_between_steps() {
        let dir = tempfile::tempdir().unwrap();
        let journal = Journal::default();
        let token = CancellationToken::new();
        let registry = registry(dir.path(), &journal, &token);

        let mut tx = Transaction::from_plan(
            &plan(&[&["a"], &["b", "cancel"], &["c"]], Direction::Perform),
            &registry,
        )
        .unwrap();
        let outcome = TransactionExecutor::default()
            .run(&mut tx, &token)
            .await
            .unwrap();

        assert_eq!(outcome.status, TransactionStatus::Canceled);
        assert_eq!(outcome.performed, 2);
        assert_eq!(outcome.undone, 2);
        assert!(matches!(
            outcome.error,
            Some(Error::Transaction(TransactionError::Cancelled))
        ));
        assert_eq!(
            entries(&journal),
            ["perform:a", "perform:b", "undo:b", "undo:a"]
        );
    }

    #[tokio::test]
    async fn test_revert_steps_undo_forward() {
        let dir = tempfile::tempdir().unwrap();
        let journal = Journal::default();
        let token = CancellationToken::new();
        let registry = registry(dir.path(), &journal, &token);

        let mut tx = Transaction::from_plan(
            &plan(&[&["a"], &["b"], &["c", "fail-undo"]], Direction::Revert),
            &registry,
        )
        .unwrap();
        let outcome = TransactionExecutor::default()
            .run(&mut tx, &token)
            .await
            .unwrap();

        assert_eq!(outcome.status, TransactionStatus::Failure);
        assert_eq!(
            entries(&journal),
            ["undo:a", "undo:b", "undo:c", "perform:b", "perform:a"]
        );
    }

    #[tokio::test]
    async fn test_second_run_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let journal = Journal::default();
        let token = CancellationToken::new();
        let registry = registry(dir.path(), &journal, &token);
        let executor = TransactionExecutor::default();

        let mut tx =
            Transaction::from_plan(&plan(&[&["a"]], Direction::Perform), &registry).unwrap();
        executor.run(&mut tx, &token).await.unwrap();
        let err = executor.run(&mut tx, &token).await.unwrap_err();
        assert!(matches!(
            err,
            Error::Transaction(TransactionError::AlreadyExecuted)
        ));
    }

    #[tokio::test]
    async fn test_unknown_kind_fails_before_running() {
        let dir = tempfile::tempdir().unwrap();
        let journal = Journal::default();
        let token = CancellationToken::new();
        let registry = registry(dir.path(), &journal, &token);

        let mut bad = plan(&[&["a"]], Direction::Perform);
        bad.operations.push(PlannedOperation {
            component: "app".into(),
            spec: OperationSpec::new("Execute", ["rm"]),
            direction: Direction::Perform,
        });
        let err = Transaction::from_plan(&bad, &registry).unwrap_err();
        assert!(matches!(err, Error::Registry(_)));
        assert!(entries(&journal).is_empty());
    }

    #[tokio::test]
    async fn test_target_dir_kept_when_not_empty() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("target");
        tokio::fs::create_dir_all(&target).await.unwrap();
        tokio::fs::write(target.join("dummy"), b"keep me").await.unwrap();

        let journal = Journal::default();
        let token = CancellationToken::new();
        let registry = registry(dir.path(), &journal, &token);
        let executor = TransactionExecutor::new(TransactionPolicy {
            target_dir: Some(target.clone()),
            remove_target_dir: true,
        });

        let mut tx = Transaction::from_plan(
            &plan(&[&["a"], &["b", "fail"]], Direction::Perform),
            &registry,
        )
        .unwrap();
        let outcome = executor.run(&mut tx, &token).await.unwrap();

        assert_eq!(outcome.status, TransactionStatus::Failure);
        assert_eq!(outcome.undone, 1);
        assert!(target.join("dummy").exists());
    }

    #[tokio::test]
    async fn test_empty_target_dir_removed() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("target");
        tokio::fs::create_dir_all(&target).await.unwrap();

        let journal = Journal::default();
        let token = CancellationToken::new();
        let registry = registry(dir.path(), &journal, &token);
        let executor = TransactionExecutor::new(TransactionPolicy {
            target_dir: Some(target.clone()),
            remove_target_dir: true,
        });

        let mut tx =
            Transaction::from_plan(&plan(&[&["a", "fail"]], Direction::Perform), &registry)
                .unwrap();
        executor.run(&mut tx, &token).await.unwrap();
        assert!(!target.exists());

        tokio::fs::create_dir_all(&target).await.unwrap();
        let keep = TransactionExecutor::new(TransactionPolicy {
            target_dir: Some(target.clone()),
            remove_target_dir: false,
        });
        let mut tx =
            Transaction::from_plan(&plan(&[&["a", "fail"]], Direction::Perform), &registry)
                .unwrap();
        keep.run(&mut tx, &token).await.unwrap();
        assert!(target.exists());
    }

    #[tokio::test]
    async fn test_filesystem_operations_rolled_back() {
        let dir = tempfile::tempdir().unwrap();
        let journal = Journal::default();
        let token = CancellationToken::new();
        let registry = registry(dir.path(), &journal, &token);

        let source = dir.path().join("payload.bin");
        let moved = dir.path().join("installed.bin");
        let link = dir.path().join("payload.link");
        tokio::fs::write(&source, b"data").await.unwrap();

        let path = |p: &Path| p.to_string_lossy().into_owned();
        let planned = |name: &str, args: Vec<String>| PlannedOperation {
            component: "app".into(),
            spec: OperationSpec::new(name, args),
            direction: Direction::Perform,
        };
        let plan = TransactionPlan {
            action: PlanAction::Install,
            components: vec!["app".into()],
            operations: vec![
                planned("SimpleMoveFile", vec![path(&source), path(&moved)]),
                planned("CreateLink", vec![path(&link), path(&moved)]),
                planned("Record", vec!["boom".into(), "fail".into()]),
            ],
            required_space: 0,
        };

        let mut tx = Transaction::from_plan(&plan, &registry).unwrap();
        let outcome = TransactionExecutor::default()
            .run(&mut tx, &token)
            .await
            .unwrap();

        assert_eq!(outcome.status, TransactionStatus::Failure);
        assert_eq!(outcome.undone, 2);
        assert!(source.exists());
        assert!(!moved.exists());
        assert!(tokio::fs::symlink_metadata(&link).await.is_err());
    }

    #[derive(Debug)]
    struct DroppedPeer;

    #[async_trait]
    impl RemoteExecutor for DroppedPeer {
        async fn execute(&self, _request: ExecuteRequest) -> Result<ExecuteResponse, RemoteError> {
            Err(RemoteError::ConnectionLost {
                message: "peer closed the connection".into(),
            })
        }

        fn is_active(&self) -> bool {
            false
        }
    }

    #[derive(Debug)]
    struct InProcessPeer {
        registry: OperationRegistry,
        requests: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl RemoteExecutor for InProcessPeer {
        async fn execute(&self, request: ExecuteRequest) -> Result<ExecuteResponse, RemoteError> {
            self.requests
                .lock()
                .unwrap()
                .push(format!("{}#{}", request.kind, request.step));
            Ok(rivet_remote::execute_request(&self.registry, request).await)
        }

        fn is_active(&self) -> bool {
            true
        }
    }

    #[tokio::test]
    async fn test_lost_remote_connection_triggers_rollback() {
        let dir = tempfile::tempdir().unwrap();
        let journal = Journal::default();
        let token = CancellationToken::new();
        let registry = registry(dir.path(), &journal, &token);
        let settings = dir.path().join("settings.toml");

        let mut steps = plan(&[&["a"], &["b"]], Direction::Perform);
        steps.operations.push(PlannedOperation {
            component: "app".into(),
            spec: OperationSpec::new(
                "GlobalConfig",
                [settings.to_string_lossy().into_owned(), "k".into(), "v".into()],
            ),
            direction: Direction::Perform,
        });

        let executor = TransactionExecutor::default()
            .with_remote(Arc::new(DroppedPeer), ["GlobalConfig"]);
        let mut tx = Transaction::from_plan(&steps, &registry).unwrap();
        let outcome = executor.run(&mut tx, &token).await.unwrap();

        assert_eq!(outcome.status, TransactionStatus::Failure);
        assert_eq!(outcome.undone, 2);
        assert_eq!(
            tx.steps()[2].operation.state().error_kind(),
            Some(OperationErrorKind::UserDefinedError)
        );
        assert!(!settings.exists());
        assert_eq!(
            entries(&journal),
            ["perform:a", "perform:b", "undo:b", "undo:a"]
        );
    }

    #[tokio::test]
    async fn test_elevated_steps_dispatched_remotely() {
        let dir = tempfile::tempdir().unwrap();
        let journal = Journal::default();
        let token = CancellationToken::new();
        let registry = registry(dir.path(), &journal, &token);
        let settings = dir.path().join("settings.toml");

        let mut steps = plan(&[&["a"]], Direction::Perform);
        steps.operations.push(PlannedOperation {
            component: "app".into(),
            spec: OperationSpec::new(
                "GlobalConfig",
                [settings.to_string_lossy().into_owned(), "k".into(), "v".into()],
            ),
            direction: Direction::Perform,
        });
        steps.operations.push(PlannedOperation {
            component: "app".into(),
            spec: OperationSpec::new("Record", ["z", "fail"]),
            direction: Direction::Perform,
        });

        let peer = Arc::new(InProcessPeer {
            registry: registry.clone(),
            requests: Mutex::new(Vec::new()),
        });
        let executor = TransactionExecutor::default()
            .with_remote(Arc::clone(&peer) as Arc<dyn RemoteExecutor>, ["GlobalConfig"]);
        let mut tx = Transaction::from_plan(&steps, &registry).unwrap();
        let outcome = executor.run(&mut tx, &token).await.unwrap();

        assert_eq!(outcome.status, TransactionStatus::Failure);
        assert_eq!(outcome.undone, 2);
        assert_eq!(
            *peer.requests.lock().unwrap(),
            ["GlobalConfig#1", "GlobalConfig#1"]
        );
        let contents = tokio::fs::read_to_string(&settings).await.unwrap();
        assert!(!contents.contains("k = "));
    }

    #[tokio::test]
    async fn test_events_carry_transaction_correlation() {
        let dir = tempfile::tempdir().unwrap();
        let journal = Journal::default();
        let token = CancellationToken::new();
        let registry = registry(dir.path(), &journal, &token);
        let (events, mut rx) = rivet_events::channel();

        let peer = Arc::new(InProcessPeer {
            registry: registry.clone(),
            requests: Mutex::new(Vec::new()),
        });
        let executor = TransactionExecutor::default()
            .with_event_sender(events)
            .with_remote(peer as Arc<dyn RemoteExecutor>, ["GlobalConfig", "CreateLink"]);
        let mut tx =
            Transaction::from_plan(&plan(&[&["a"], &["b"]], Direction::Perform), &registry)
                .unwrap();
        let id = tx.id().to_string();
        executor.run(&mut tx, &token).await.unwrap();
        drop(executor);

        let mut seen = 0;
        while let Ok(message) = rx.try_recv() {
            if matches!(message.event, AppEvent::Transaction(_) | AppEvent::Progress(_)) {
                assert_eq!(message.meta.correlation_id.as_deref(), Some(id.as_str()));
                assert_eq!(
                    message.meta.labels.get("elevated").map(String::as_str),
                    Some("CreateLink,GlobalConfig")
                );
                seen += 1;
            }
        }
        assert!(seen >= 6, "only {seen} correlated events");
    }
}
