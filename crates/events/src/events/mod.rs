use serde::{Deserialize, Serialize};

use crate::EventSource;
use rivet_errors::UserFacingError;

/// Structured failure information shared across domains.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailureContext {
    /// Optional stable error code.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    /// Short user-facing message.
    pub message: String,
    /// Optional remediation hint.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
    /// Whether retrying the operation might succeed.
    pub retryable: bool,
}

impl FailureContext {
    /// Construct a new failure context.
    #[must_use]
    pub fn new(
        code: Option<impl Into<String>>,
        message: impl Into<String>,
        hint: Option<impl Into<String>>,
        retryable: bool,
    ) -> Self {
        Self {
            code: code.map(Into::into),
            message: message.into(),
            hint: hint.map(Into::into),
            retryable,
        }
    }

    /// Build failure context from a `UserFacingError` implementation.
    #[must_use]
    pub fn from_error<E: UserFacingError + ?Sized>(error: &E) -> Self {
        Self::new(
            error.user_code(),
            error.user_message().into_owned(),
            error.user_hint(),
            error.is_retryable(),
        )
    }
}

// Declare all domain modules
pub mod general;
pub mod progress;
pub mod remote;
pub mod resolver;
pub mod transaction;

// Re-export all domain events
pub use general::*;
pub use progress::*;
pub use remote::*;
pub use resolver::*;
pub use transaction::*;

/// Top-level application event enum that aggregates all domain-specific events
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "domain", content = "event", rename_all = "snake_case")]
pub enum AppEvent {
    /// General utility events (warnings, errors, operations)
    General(GeneralEvent),

    /// Progress tracking events
    Progress(ProgressEvent),

    /// Dependency resolution events
    Resolver(ResolverEvent),

    /// Transaction execution and rollback events
    Transaction(TransactionEvent),

    /// Remote execution channel events
    Remote(RemoteEvent),
}

impl AppEvent {
    /// Identify the source domain for this event (used for metadata/logging).
    #[must_use]
    pub fn event_source(&self) -> EventSource {
        match self {
            Self::General(_) => EventSource::GENERAL,
            Self::Progress(_) => EventSource::PROGRESS,
            Self::Resolver(_) => EventSource::RESOLVER,
            Self::Transaction(_) => EventSource::TRANSACTION,
            Self::Remote(_) => EventSource::REMOTE,
        }
    }

    /// Key that ties this event to the rest of its transaction or session
    #[must_use]
    pub fn correlation_id(&self) -> Option<String> {
        match self {
            Self::Transaction(event) => Some(event.transaction_id().to_string()),
            Self::Progress(event) => Some(event.id().to_string()),
            Self::Remote(event) => event.session().map(|session| format!("session-{session}")),
            Self::General(_) | Self::Resolver(_) => None,
        }
    }

    /// Determine the appropriate tracing log level for this event
    #[must_use]
    pub fn log_level(&self) -> tracing::Level {
        use tracing::Level;

        match self {
            // Error-level events
            Self::General(GeneralEvent::Error { .. } | GeneralEvent::OperationFailed { .. })
            | Self::Progress(ProgressEvent::Failed { .. })
            | Self::Resolver(
                ResolverEvent::ResolutionFailed { .. } | ResolverEvent::CycleDetected { .. },
            )
            | Self::Transaction(
                TransactionEvent::StepFailed { .. } | TransactionEvent::UndoFailed { .. },
            )
            | Self::Remote(RemoteEvent::ConnectionLost { .. }) => Level::ERROR,

            // Warning-level events
            Self::General(GeneralEvent::Warning { .. } | GeneralEvent::ComponentWarnings { .. })
            | Self::Transaction(
                TransactionEvent::RollbackStarted { .. }
                | TransactionEvent::CancellationObserved { .. },
            )
            | Self::Remote(RemoteEvent::SessionRejected { .. }) => Level::WARN,

            // Debug-level events (progress updates, internal state)
            Self::General(GeneralEvent::DebugLog { .. })
            | Self::Progress(ProgressEvent::Updated { .. })
            | Self::Resolver(ResolverEvent::ResolutionReused { .. })
            | Self::Transaction(
                TransactionEvent::StepStarted { .. } | TransactionEvent::StepCompleted { .. },
            )
            | Self::Remote(RemoteEvent::RequestExecuted { .. }) => Level::DEBUG,

            // Default to INFO for most events
            _ => Level::INFO,
        }
    }

    /// Get the log target for this event (for structured logging)
    #[must_use]
    pub fn log_target(&self) -> &'static str {
        match self {
            Self::General(_) => "rivet::events::general",
            Self::Progress(_) => "rivet::events::progress",
            Self::Resolver(_) => "rivet::events::resolver",
            Self::Transaction(_) => "rivet::events::transaction",
            Self::Remote(_) => "rivet::events::remote",
        }
    }
}
