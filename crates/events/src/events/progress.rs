use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Progress of long-running work such as a transaction
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ProgressEvent {
    /// Progress tracking started
    Started {
        id: String,
        operation: String,
        total: Option<u64>,
    },

    /// Progress advanced
    Updated {
        id: String,
        current: u64,
        total: Option<u64>,
    },

    /// Progress completed successfully
    Completed { id: String, duration: Duration },

    /// Progress failed
    Failed {
        id: String,
        failure: super::FailureContext,
    },
}

impl ProgressEvent {
    #[must_use]
    pub fn started(
        id: impl Into<String>,
        operation: impl Into<String>,
        total: Option<u64>,
    ) -> Self {
        Self::Started {
            id: id.into(),
            operation: operation.into(),
            total,
        }
    }

    #[must_use]
    pub fn updated(id: impl Into<String>, current: u64, total: Option<u64>) -> Self {
        Self::Updated {
            id: id.into(),
            current,
            total,
        }
    }

    #[must_use]
    pub fn completed(id: impl Into<String>, duration: Duration) -> Self {
        Self::Completed {
            id: id.into(),
            duration,
        }
    }

    #[must_use]
    pub fn failed(id: impl Into<String>, failure: super::FailureContext) -> Self {
        Self::Failed {
            id: id.into(),
            failure,
        }
    }

    /// Tracker id shared by every event of one piece of work
    #[must_use]
    pub fn id(&self) -> &str {
        match self {
            Self::Started { id, .. }
            | Self::Updated { id, .. }
            | Self::Completed { id, .. }
            | Self::Failed { id, .. } => id,
        }
    }
}
