//! Event handling and status display

use crate::logging::log_event_with_tracing;
use console::{style, Term};
use rivet_events::{
    AppEvent, EventMessage, GeneralEvent, ProgressEvent, RemoteEvent, ResolverEvent,
    TransactionEvent,
};

/// Turns drained events into status lines on stderr
pub struct EventHandler {
    term: Term,
    colors_enabled: bool,
    /// Status lines are suppressed in JSON mode
    quiet: bool,
    debug_enabled: bool,
}

impl EventHandler {
    pub fn new(colors_enabled: bool, quiet: bool, debug_enabled: bool) -> Self {
        Self {
            term: Term::stderr(),
            colors_enabled,
            quiet,
            debug_enabled,
        }
    }

    /// Handle incoming event
    pub fn handle_event(&mut self, message: EventMessage) {
        log_event_with_tracing(&message);
        if self.quiet {
            return;
        }
        if let Some(line) = self.status_line(&message.event) {
            let _ = self.term.write_line(&line);
        }
    }

    fn status_line(&self, event: &AppEvent) -> Option<String> {
        match event {
            AppEvent::General(GeneralEvent::Warning { message, context }) => Some(match context {
                Some(context) => self.warning(&format!("{message} ({context})")),
                None => self.warning(message),
            }),
            AppEvent::General(GeneralEvent::Error { message, .. }) => Some(self.failure(message)),
            AppEvent::General(GeneralEvent::DebugLog { message, .. }) if self.debug_enabled => {
                Some(self.dim(message))
            }

            AppEvent::Resolver(ResolverEvent::ResolutionCompleted {
                components,
                required_space,
                ..
            }) => Some(format!(
                "Resolved {} component(s), {} required",
                components.len(),
                format_bytes(*required_space)
            )),
            AppEvent::Resolver(ResolverEvent::CycleDetected { path }) => Some(
                self.failure(&format!("Dependency cycle: {}", path.join(" -> "))),
            ),

            AppEvent::Progress(ProgressEvent::Updated {
                current,
                total: Some(total),
                ..
            }) if self.debug_enabled => Some(self.dim(&format!("[{current}/{total}]"))),

            AppEvent::Transaction(event) => self.transaction_line(event),

            AppEvent::Remote(RemoteEvent::ServerListening { socket, mode }) => {
                Some(format!("Listening on {socket} ({mode} mode)"))
            }
            AppEvent::Remote(RemoteEvent::ClientConnected { socket }) => {
                Some(format!("Connected to elevated server at {socket}"))
            }
            AppEvent::Remote(RemoteEvent::SessionRejected { session, reason }) => {
                Some(self.warning(&format!("Session {session} rejected: {reason}")))
            }
            AppEvent::Remote(RemoteEvent::ConnectionLost { message, .. }) => {
                Some(self.failure(&format!("Lost connection to elevated server: {message}")))
            }
            _ => None,
        }
    }

    fn transaction_line(&self, event: &TransactionEvent) -> Option<String> {
        match event {
            TransactionEvent::Started { action, steps, .. } => {
                Some(format!("Starting {action} ({steps} step(s))"))
            }
            TransactionEvent::StepStarted {
                component,
                operation,
                remote,
                ..
            } => {
                let via = if *remote { " [elevated]" } else { "" };
                Some(self.dim(&format!("  {component}: {operation}{via}")))
            }
            TransactionEvent::StepFailed {
                operation, failure, ..
            } => Some(self.failure(&format!("{operation} failed: {}", failure.message))),
            TransactionEvent::CancellationObserved { .. } => {
                Some(self.warning("Cancellation requested, rolling back"))
            }
            TransactionEvent::RollbackStarted { performed, .. } => {
                Some(self.warning(&format!("Undoing {performed} performed step(s)")))
            }
            TransactionEvent::UndoFailed {
                operation, message, ..
            } => Some(self.failure(&format!("Undo of {operation} failed: {message}"))),
            TransactionEvent::TargetDirKept { path, reason, .. } => {
                Some(self.warning(&format!("Kept {path}: {reason}")))
            }
            TransactionEvent::TargetDirRemoved { path, .. } => Some(format!("Removed {path}")),
            _ => None,
        }
    }

    fn warning(&self, text: &str) -> String {
        if self.colors_enabled {
            format!("{} {text}", style("warning:").yellow().bold())
        } else {
            format!("warning: {text}")
        }
    }

    fn failure(&self, text: &str) -> String {
        if self.colors_enabled {
            format!("{} {text}", style("error:").red().bold())
        } else {
            format!("error: {text}")
        }
    }

    fn dim(&self, text: &str) -> String {
        if self.colors_enabled {
            style(text).dim().to_string()
        } else {
            text.to_string()
        }
    }
}

/// Human readable byte count
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KiB", "MiB", "GiB"];
    let mut unit = 0;
    let mut whole = bytes;
    let mut rem = 0;
    while whole >= 1024 && unit < UNITS.len() - 1 {
        rem = whole % 1024;
        whole /= 1024;
        unit += 1;
    }
    if unit == 0 {
        format!("{bytes} B")
    } else {
        format!("{whole}.{} {}", rem * 10 / 1024, UNITS[unit])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rivet_events::FailureContext;

    fn handler() -> EventHandler {
        EventHandler::new(false, false, false)
    }

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(0), "0 B");
        assert_eq!(format_bytes(1000), "1000 B");
        assert_eq!(format_bytes(1536), "1.5 KiB");
        assert_eq!(format_bytes(3 * 1024 * 1024), "3.0 MiB");
    }

    #[test]
    fn test_step_failure_line() {
        let event = AppEvent::Transaction(TransactionEvent::StepFailed {
            id: "t".into(),
            step: 2,
            operation: "SimpleMoveFile".into(),
            failure: FailureContext::new(None::<String>, "Cannot move", None::<String>, false),
        });
        assert_eq!(
            handler().status_line(&event).as_deref(),
            Some("error: SimpleMoveFile failed: Cannot move")
        );
    }

    #[test]
    fn test_debug_only_lines_hidden() {
        let event = AppEvent::Progress(ProgressEvent::Updated {
            id: "t".into(),
            current: 1,
            total: Some(3),
        });
        assert!(handler().status_line(&event).is_none());
        assert!(EventHandler::new(false, false, true)
            .status_line(&event)
            .is_some());
    }

    #[test]
    fn test_quiet_handler_accepts_events() {
        let mut quiet = EventHandler::new(false, true, false);
        let event = AppEvent::General(GeneralEvent::warning("disk nearly full"));
        quiet.handle_event(EventMessage::from_event(event));
    }
}
