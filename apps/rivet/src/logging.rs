//! Structured logging integration for events
//!
//! Converts the domain events drained from the event channel into tracing
//! records with structured fields.

use rivet_events::{
    AppEvent, EventMessage, GeneralEvent, ProgressEvent, RemoteEvent, ResolverEvent,
    TransactionEvent,
};
use tracing::{debug, error, info, warn};

/// Log an `EventMessage` at the level its event maps to
pub fn log_event_with_tracing(message: &EventMessage) {
    let meta = &message.meta;
    match &message.event {
        AppEvent::General(event) => log_general(message, event),
        AppEvent::Progress(event) => log_progress(message, event),
        AppEvent::Resolver(event) => log_resolver(message, event),
        AppEvent::Transaction(event) => log_transaction(message, event),
        AppEvent::Remote(event) => log_remote(message, event),
    }
    debug!(
        target: "rivet::events",
        level = %meta.tracing_level(),
        correlation = ?meta.correlation_id,
        labels = ?meta.labels,
        "event processed"
    );
}

fn log_general(message: &EventMessage, event: &GeneralEvent) {
    let meta = &message.meta;
    match event {
        GeneralEvent::Warning { message, context } => {
            warn!(
                source = meta.source.as_str(),
                event_id = %meta.event_id,
                context = ?context,
                "{message}"
            );
        }
        GeneralEvent::Error { message, details } => {
            error!(
                source = meta.source.as_str(),
                event_id = %meta.event_id,
                details = ?details,
                "{message}"
            );
        }
        GeneralEvent::DebugLog { message, context } => {
            debug!(
                source = meta.source.as_str(),
                event_id = %meta.event_id,
                context = ?context,
                "{message}"
            );
        }
        GeneralEvent::OperationStarted { operation } => {
            info!(
                source = meta.source.as_str(),
                event_id = %meta.event_id,
                correlation = ?meta.correlation_id,
                operation = %operation,
                "Operation started"
            );
        }
        GeneralEvent::OperationCompleted { operation, success } => {
            info!(
                source = meta.source.as_str(),
                event_id = %meta.event_id,
                correlation = ?meta.correlation_id,
                operation = %operation,
                success = success,
                "Operation completed"
            );
        }
        GeneralEvent::OperationFailed { operation, error } => {
            error!(
                source = meta.source.as_str(),
                event_id = %meta.event_id,
                correlation = ?meta.correlation_id,
                operation = %operation,
                error = %error,
                "Operation failed"
            );
        }
        GeneralEvent::ComponentWarnings {
            component,
            warnings,
        } => {
            warn!(
                source = meta.source.as_str(),
                event_id = %meta.event_id,
                component = %component,
                warnings = ?warnings,
                "Component configuration warnings"
            );
        }
        GeneralEvent::ConfigurationValidated { source, warnings } => {
            info!(
                source = meta.source.as_str(),
                event_id = %meta.event_id,
                config_source = %source,
                warnings = warnings.len(),
                "Configuration validated"
            );
        }
    }
}

fn log_progress(message: &EventMessage, event: &ProgressEvent) {
    let meta = &message.meta;
    match event {
        ProgressEvent::Started {
            id,
            operation,
            total,
        } => {
            info!(
                source = meta.source.as_str(),
                event_id = %meta.event_id,
                progress_id = %id,
                operation = %operation,
                total = ?total,
                "Progress started"
            );
        }
        ProgressEvent::Updated { id, current, total } => {
            debug!(
                source = meta.source.as_str(),
                progress_id = %id,
                current = current,
                total = ?total,
                "Progress updated"
            );
        }
        ProgressEvent::Completed { id, duration } => {
            info!(
                source = meta.source.as_str(),
                event_id = %meta.event_id,
                progress_id = %id,
                duration_ms = u64::try_from(duration.as_millis()).unwrap_or(u64::MAX),
                "Progress completed"
            );
        }
        ProgressEvent::Failed { id, failure } => {
            error!(
                source = meta.source.as_str(),
                event_id = %meta.event_id,
                progress_id = %id,
                retryable = failure.retryable,
                code = ?failure.code,
                message = %failure.message,
                hint = ?failure.hint,
                "Progress failed"
            );
        }
    }
}

fn log_resolver(message: &EventMessage, event: &ResolverEvent) {
    let meta = &message.meta;
    match event {
        ResolverEvent::ResolutionStarted {
            mode,
            action,
            selected,
        } => {
            info!(
                source = meta.source.as_str(),
                event_id = %meta.event_id,
                mode = %mode,
                action = %action,
                selected = selected,
                "Dependency resolution started"
            );
        }
        ResolverEvent::ResolutionCompleted {
            components,
            operations,
            required_space,
            duration_ms,
        } => {
            info!(
                source = meta.source.as_str(),
                event_id = %meta.event_id,
                components = ?components,
                operations = operations,
                required_space = required_space,
                duration_ms = duration_ms,
                "Dependency resolution completed"
            );
        }
        ResolverEvent::ResolutionReused { components } => {
            debug!(
                source = meta.source.as_str(),
                components = components,
                "Cached resolution reused"
            );
        }
        ResolverEvent::CycleDetected { path } => {
            error!(
                source = meta.source.as_str(),
                event_id = %meta.event_id,
                path = %path.join(" -> "),
                "Dependency cycle detected"
            );
        }
        ResolverEvent::ResolutionFailed { failure } => {
            error!(
                source = meta.source.as_str(),
                event_id = %meta.event_id,
                code = ?failure.code,
                message = %failure.message,
                hint = ?failure.hint,
                "Dependency resolution failed"
            );
        }
    }
}

fn log_transaction(message: &EventMessage, event: &TransactionEvent) {
    let meta = &message.meta;
    match event {
        TransactionEvent::Started { id, action, steps } => {
            info!(
                source = meta.source.as_str(),
                event_id = %meta.event_id,
                transaction = %id,
                action = %action,
                steps = steps,
                "Transaction started"
            );
        }
        TransactionEvent::StepStarted {
            id,
            step,
            component,
            operation,
            remote,
        } => {
            debug!(
                source = meta.source.as_str(),
                transaction = %id,
                step = step,
                component = %component,
                operation = %operation,
                remote = remote,
                "Step started"
            );
        }
        TransactionEvent::StepCompleted {
            id,
            step,
            operation,
        } => {
            debug!(
                source = meta.source.as_str(),
                transaction = %id,
                step = step,
                operation = %operation,
                "Step completed"
            );
        }
        TransactionEvent::StepFailed {
            id,
            step,
            operation,
            failure,
        } => {
            error!(
                source = meta.source.as_str(),
                event_id = %meta.event_id,
                transaction = %id,
                step = step,
                operation = %operation,
                code = ?failure.code,
                message = %failure.message,
                "Step failed"
            );
        }
        TransactionEvent::CancellationObserved { id, performed } => {
            warn!(
                source = meta.source.as_str(),
                transaction = %id,
                performed = performed,
                "Cancellation observed"
            );
        }
        TransactionEvent::RollbackStarted { id, performed } => {
            warn!(
                source = meta.source.as_str(),
                transaction = %id,
                performed = performed,
                "Rollback started"
            );
        }
        TransactionEvent::UndoFailed {
            id,
            step,
            operation,
            message,
        } => {
            error!(
                source = meta.source.as_str(),
                transaction = %id,
                step = step,
                operation = %operation,
                message = %message,
                "Undo failed"
            );
        }
        TransactionEvent::RollbackCompleted {
            id,
            undone,
            undo_failures,
        } => {
            info!(
                source = meta.source.as_str(),
                transaction = %id,
                undone = undone,
                undo_failures = undo_failures,
                "Rollback completed"
            );
        }
        TransactionEvent::TargetDirRemoved { id, path } => {
            info!(
                source = meta.source.as_str(),
                transaction = %id,
                path = %path,
                "Target directory removed"
            );
        }
        TransactionEvent::TargetDirKept { id, path, reason } => {
            info!(
                source = meta.source.as_str(),
                transaction = %id,
                path = %path,
                reason = %reason,
                "Target directory kept"
            );
        }
        TransactionEvent::Finished {
            id,
            status,
            performed,
        } => {
            info!(
                source = meta.source.as_str(),
                event_id = %meta.event_id,
                transaction = %id,
                status = %status,
                performed = performed,
                "Transaction finished"
            );
        }
    }
}

fn log_remote(message: &EventMessage, event: &RemoteEvent) {
    let meta = &message.meta;
    match event {
        RemoteEvent::ServerListening { socket, mode } => {
            info!(
                source = meta.source.as_str(),
                socket = %socket,
                mode = %mode,
                "Server listening"
            );
        }
        RemoteEvent::ServerStopped { socket } => {
            info!(source = meta.source.as_str(), socket = %socket, "Server stopped");
        }
        RemoteEvent::SessionOpened { session } => {
            debug!(source = meta.source.as_str(), session = session, "Session opened");
        }
        RemoteEvent::SessionAuthenticated { session } => {
            info!(source = meta.source.as_str(), session = session, "Session authenticated");
        }
        RemoteEvent::SessionRejected { session, reason } => {
            warn!(
                source = meta.source.as_str(),
                session = session,
                reason = %reason,
                "Session rejected"
            );
        }
        RemoteEvent::SessionClosed { session } => {
            debug!(source = meta.source.as_str(), session = session, "Session closed");
        }
        RemoteEvent::ClientConnected { socket } => {
            info!(source = meta.source.as_str(), socket = %socket, "Connected to remote server");
        }
        RemoteEvent::RequestExecuted {
            session,
            kind,
            step,
            success,
        } => {
            debug!(
                source = meta.source.as_str(),
                session = session,
                kind = %kind,
                step = step,
                success = success,
                "Remote request executed"
            );
        }
        RemoteEvent::ConnectionLost { socket, message } => {
            error!(
                source = meta.source.as_str(),
                event_id = %meta.event_id,
                socket = %socket,
                message = %message,
                "Remote connection lost"
            );
        }
    }
}
