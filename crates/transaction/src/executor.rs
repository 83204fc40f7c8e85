//! Sequential execution with reverse-order rollback

use crate::transaction::{Step, Transaction, TransactionStatus};
use rivet_config::Config;
use rivet_errors::{Error, OperationError, TransactionError};
use rivet_events::{
    AppEvent, EventEmitter, EventMeta, EventSender, FailureContext, TransactionEvent,
};
use rivet_operations::Lifecycle;
use rivet_remote::{ExecutePhase, ExecuteRequest, RemoteExecutor};
use rivet_types::Direction;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// What happens to the target directory after a rollback
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransactionPolicy {
    pub target_dir: Option<PathBuf>,
    /// Remove `target_dir` after rollback, only ever if it is empty
    pub remove_target_dir: bool,
}

impl TransactionPolicy {
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self {
            target_dir: config.transaction.target_dir.clone(),
            remove_target_dir: config.transaction.remove_target_dir,
        }
    }
}

/// Final report of a run
#[derive(Debug, Clone)]
pub struct TransactionOutcome {
    pub status: TransactionStatus,
    /// Steps that completed before the run ended
    pub performed: usize,
    /// Steps reversed during rollback
    pub undone: usize,
    pub undo_failures: usize,
    pub error: Option<Error>,
}

impl TransactionOutcome {
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status == TransactionStatus::Success
    }
}

/// Runs transactions one step at a time
#[derive(Debug, Clone, Default)]
pub struct TransactionExecutor {
    policy: TransactionPolicy,
    remote: Option<Arc<dyn RemoteExecutor>>,
    elevated: BTreeSet<String>,
    event_sender: Option<EventSender>,
}

impl EventEmitter for TransactionExecutor {
    fn event_sender(&self) -> Option<&EventSender> {
        self.event_sender.as_ref()
    }

    fn enrich_event_meta(&self, _event: &AppEvent, meta: EventMeta) -> EventMeta {
        if self.remote.is_none() {
            return meta;
        }
        let elevated: Vec<&str> = self.elevated.iter().map(String::as_str).collect();
        meta.with_label("elevated", elevated.join(","))
    }
}

enum StepResult {
    Done,
    Failed(OperationError),
}

impl TransactionExecutor {
    #[must_use]
    pub fn new(policy: TransactionPolicy) -> Self {
        Self {
            policy,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_event_sender(mut self, sender: EventSender) -> Self {
        self.event_sender = Some(sender);
        self
    }

    /// Forward the named kinds to `remote`
    #[must_use]
    pub fn with_remote<I, S>(mut self, remote: Arc<dyn RemoteExecutor>, elevated: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.remote = Some(remote);
        self.elevated = elevated.into_iter().map(Into::into).collect();
        self
    }

    fn dispatches_remotely(&self, kind: &str) -> bool {
        self.remote.is_some() && self.elevated.contains(kind)
    }

    /// Run every step in order, rolling back on failure or cancellation
    ///
    /// Cancellation is observed only between steps. On success every
    /// operation is committed and its value store dropped.
    ///
    /// # Errors
    ///
    /// Returns `TransactionError::AlreadyExecuted` if the transaction is not
    /// idle. Step failures are reported in the outcome, not as errors.
    pub async fn run(
        &self,
        transaction: &mut Transaction,
        cancel: &CancellationToken,
    ) -> Result<TransactionOutcome, Error> {
        if transaction.status != TransactionStatus::Idle {
            return Err(TransactionError::AlreadyExecuted.into());
        }

        let id = transaction.id().to_string();
        transaction.status = TransactionStatus::Running;
        self.emit(AppEvent::Transaction(TransactionEvent::Started {
            id: id.clone(),
            action: transaction.action().to_string(),
            steps: transaction.len(),
        }));
        info!(transaction = %id, steps = transaction.len(), "transaction started");
        let started = Instant::now();
        let total = u64::try_from(transaction.len()).ok();
        self.emit_progress_started(&id, format!("{} transaction", transaction.action()), total);

        let mut error: Option<Error> = None;
        let mut canceled = false;

        for index in 0..transaction.steps.len() {
            if cancel.is_cancelled() {
                self.emit(AppEvent::Transaction(TransactionEvent::CancellationObserved {
                    id: id.clone(),
                    performed: transaction.performed,
                }));
                canceled = true;
                error = Some(TransactionError::Cancelled.into());
                break;
            }

            let remote = self.dispatches_remotely(transaction.steps[index].operation.name());
            let step = &mut transaction.steps[index];
            self.emit(AppEvent::Transaction(TransactionEvent::StepStarted {
                id: id.clone(),
                step: index,
                component: step.component.clone(),
                operation: step.operation.name().to_string(),
                remote,
            }));

            match self.forward(step, index, remote).await {
                StepResult::Done => {
                    transaction.performed = index + 1;
                    self.emit_progress_updated(
                        &id,
                        u64::try_from(transaction.performed).unwrap_or(u64::MAX),
                        total,
                    );
                    self.emit(AppEvent::Transaction(TransactionEvent::StepCompleted {
                        id: id.clone(),
                        step: index,
                        operation: step.operation.name().to_string(),
                    }));
                }
                StepResult::Failed(failure) => {
                    let operation = step.operation.name().to_string();
                    warn!(
                        transaction = %id,
                        step = index,
                        operation = %operation,
                        error = %failure,
                        "step failed"
                    );
                    self.emit(AppEvent::Transaction(TransactionEvent::StepFailed {
                        id: id.clone(),
                        step: index,
                        operation: operation.clone(),
                        failure: FailureContext::from_error(&failure),
                    }));
                    error = Some(
                        TransactionError::OperationFailed {
                            operation,
                            message: failure.message,
                        }
                        .into(),
                    );
                    break;
                }
            }
        }

        if error.is_none() {
            for step in &mut transaction.steps {
                step.operation.state_mut().clear_values();
                step.operation.state_mut().set_lifecycle(Lifecycle::Committed);
            }
            transaction.status = TransactionStatus::Success;
            self.emit_progress_completed(&id, started.elapsed());
            self.emit_finished(&id, transaction);
            return Ok(TransactionOutcome {
                status: TransactionStatus::Success,
                performed: transaction.performed,
                undone: 0,
                undo_failures: 0,
                error: None,
            });
        }

        if let Some(err) = &error {
            self.emit_progress_failed(&id, FailureContext::from_error(err));
        }
        let (undone, undo_failures) = self.rollback(&id, transaction).await;
        self.apply_target_dir_policy(&id).await;

        transaction.status = if canceled {
            TransactionStatus::Canceled
        } else {
            TransactionStatus::Failure
        };
        self.emit_finished(&id, transaction);

        Ok(TransactionOutcome {
            status: transaction.status,
            performed: transaction.performed,
            undone,
            undo_failures,
            error,
        })
    }

    /// Undo every performed step, newest first, continuing past failures
    async fn rollback(&self, id: &str, transaction: &mut Transaction) -> (usize, usize) {
        transaction.status = TransactionStatus::RollingBack;
        let performed = transaction.performed;
        self.emit(AppEvent::Transaction(TransactionEvent::RollbackStarted {
            id: id.to_string(),
            performed,
        }));

        let mut undone = 0;
        let mut failures = 0;
        for index in (0..performed).rev() {
            let remote = self.dispatches_remotely(transaction.steps[index].operation.name());
            let step = &mut transaction.steps[index];
            match self.reverse(step, index, remote).await {
                StepResult::Done => undone += 1,
                StepResult::Failed(failure) => {
                    failures += 1;
                    warn!(
                        step = index,
                        operation = step.operation.name(),
                        error = %failure,
                        "undo failed, continuing rollback"
                    );
                    self.emit(AppEvent::Transaction(TransactionEvent::UndoFailed {
                        id: id.to_string(),
                        step: index,
                        operation: step.operation.name().to_string(),
                        message: failure.message,
                    }));
                }
            }
        }

        self.emit(AppEvent::Transaction(TransactionEvent::RollbackCompleted {
            id: id.to_string(),
            undone,
            undo_failures: failures,
        }));
        (undone, failures)
    }

    async fn apply_target_dir_policy(&self, id: &str) {
        let Some(dir) = self.policy.target_dir.as_deref() else {
            return;
        };
        if !self.policy.remove_target_dir {
            self.emit_kept(id, dir, "policy keeps the target directory");
            return;
        }
        match is_empty_dir(dir).await {
            Ok(true) => match tokio::fs::remove_dir(dir).await {
                Ok(()) => self.emit(AppEvent::Transaction(TransactionEvent::TargetDirRemoved {
                    id: id.to_string(),
                    path: dir.display().to_string(),
                })),
                Err(e) => self.emit_kept(id, dir, &e.to_string()),
            },
            Ok(false) => self.emit_kept(id, dir, "target directory is not empty"),
            Err(e) => debug!(path = %dir.display(), error = %e, "target directory not inspected"),
        }
    }

    fn emit_kept(&self, id: &str, dir: &Path, reason: &str) {
        self.emit(AppEvent::Transaction(TransactionEvent::TargetDirKept {
            id: id.to_string(),
            path: dir.display().to_string(),
            reason: reason.to_string(),
        }));
    }

    fn emit_finished(&self, id: &str, transaction: &Transaction) {
        info!(transaction = %id, status = %transaction.status, "transaction finished");
        self.emit(AppEvent::Transaction(TransactionEvent::Finished {
            id: id.to_string(),
            status: transaction.status.to_string(),
            performed: transaction.performed,
        }));
    }

    /// Forward half of a step: perform for installs, undo for uninstalls
    async fn forward(&self, step: &mut Step, index: usize, remote: bool) -> StepResult {
        let operation = &mut step.operation;
        if !operation.validate_arguments() {
            return failed(operation.state().error());
        }
        let phase = match step.direction {
            Direction::Perform => ExecutePhase::Perform,
            Direction::Revert => ExecutePhase::Undo,
        };
        self.run_phase(step, index, phase, remote).await
    }

    /// Rollback half of a step
    async fn reverse(&self, step: &mut Step, index: usize, remote: bool) -> StepResult {
        let phase = match step.direction {
            Direction::Perform => ExecutePhase::Undo,
            Direction::Revert => ExecutePhase::Perform,
        };
        self.run_phase(step, index, phase, remote).await
    }

    async fn run_phase(
        &self,
        step: &mut Step,
        index: usize,
        phase: ExecutePhase,
        remote: bool,
    ) -> StepResult {
        if remote {
            if let Some(client) = &self.remote {
                return run_remote(client.as_ref(), step, index, phase).await;
            }
        }

        let operation = &mut step.operation;
        operation.state_mut().clear_error();
        let success = match phase {
            ExecutePhase::Perform => {
                operation.backup().await;
                operation.perform_operation().await
            }
            ExecutePhase::Undo => operation.undo_operation().await,
        };
        if success {
            StepResult::Done
        } else {
            failed(operation.state().error())
        }
    }
}

async fn run_remote(
    client: &dyn RemoteExecutor,
    step: &mut Step,
    index: usize,
    phase: ExecutePhase,
) -> StepResult {
    let state = step.operation.state_mut();
    state.clear_error();
    let request = ExecuteRequest {
        kind: state.name().to_string(),
        arguments: state.arguments().to_vec(),
        values: state.values().clone(),
        step: index,
        phase,
    };

    match client.execute(request).await {
        Ok(response) => {
            state.set_values(response.values.clone());
            if response.success {
                state.set_lifecycle(match phase {
                    ExecutePhase::Perform => Lifecycle::Performed,
                    ExecutePhase::Undo => Lifecycle::Undone,
                });
                StepResult::Done
            } else {
                let error = response.error().unwrap_or_else(|| {
                    OperationError::user_defined("remote execution failed without a message")
                });
                state.set_error(error.clone());
                StepResult::Failed(error)
            }
        }
        Err(e) => {
            let error = OperationError::user_defined(e.to_string());
            state.set_error(error.clone());
            StepResult::Failed(error)
        }
    }
}

fn failed(error: Option<&OperationError>) -> StepResult {
    StepResult::Failed(
        error
            .cloned()
            .unwrap_or_else(|| OperationError::user_defined("operation failed without a message")),
    )
}

async fn is_empty_dir(dir: &Path) -> std::io::Result<bool> {
    let mut entries = tokio::fs::read_dir(dir).await?;
    Ok(entries.next_entry().await?.is_none())
}
