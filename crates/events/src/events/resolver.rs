use serde::{Deserialize, Serialize};

/// Resolver domain events for dependency resolution
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ResolverEvent {
    /// Resolution of a selection started
    ResolutionStarted {
        mode: String,
        action: String,
        selected: usize,
    },

    /// Resolution completed successfully
    ResolutionCompleted {
        components: Vec<String>,
        operations: usize,
        required_space: u64,
        duration_ms: u64,
    },

    /// Cached resolution reused because the selection did not change
    ResolutionReused { components: usize },

    /// Dependency cycle detected
    CycleDetected { path: Vec<String> },

    /// Resolution failed
    ResolutionFailed { failure: super::FailureContext },
}
