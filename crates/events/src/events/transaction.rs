use serde::{Deserialize, Serialize};

/// Transaction executor events
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum TransactionEvent {
    /// Execution of a transaction started
    Started {
        id: String,
        action: String,
        steps: usize,
    },

    /// A step is about to run
    StepStarted {
        id: String,
        step: usize,
        component: String,
        operation: String,
        remote: bool,
    },

    /// A step finished successfully
    StepCompleted {
        id: String,
        step: usize,
        operation: String,
    },

    /// A step failed and rollback will follow
    StepFailed {
        id: String,
        step: usize,
        operation: String,
        failure: super::FailureContext,
    },

    /// Cancellation was observed between steps
    CancellationObserved { id: String, performed: usize },

    /// Rollback of performed steps started
    RollbackStarted { id: String, performed: usize },

    /// Undo of a performed step failed; rollback continues
    UndoFailed {
        id: String,
        step: usize,
        operation: String,
        message: String,
    },

    /// Rollback finished walking every performed step
    RollbackCompleted {
        id: String,
        undone: usize,
        undo_failures: usize,
    },

    /// Empty target directory removed after rollback
    TargetDirRemoved { id: String, path: String },

    /// Target directory kept after rollback
    TargetDirKept {
        id: String,
        path: String,
        reason: String,
    },

    /// Transaction reached a terminal status
    Finished {
        id: String,
        status: String,
        performed: usize,
    },
}

impl TransactionEvent {
    /// Transaction id the event belongs to
    #[must_use]
    pub fn transaction_id(&self) -> &str {
        match self {
            Self::Started { id, .. }
            | Self::StepStarted { id, .. }
            | Self::StepCompleted { id, .. }
            | Self::StepFailed { id, .. }
            | Self::CancellationObserved { id, .. }
            | Self::RollbackStarted { id, .. }
            | Self::UndoFailed { id, .. }
            | Self::RollbackCompleted { id, .. }
            | Self::TargetDirRemoved { id, .. }
            | Self::TargetDirKept { id, .. }
            | Self::Finished { id, .. } => id,
        }
    }
}
