//! The reversible operation contract

use async_trait::async_trait;
use rivet_errors::{OperationError, OperationErrorKind};
use std::collections::BTreeMap;
use std::fmt;

/// Where an operation is in its life
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    Created,
    BackedUp,
    Performed,
    Undone,
    Committed,
}

/// Accepted argument counts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    Exactly(usize),
    OneOf(&'static [usize]),
}

impl Arity {
    #[must_use]
    pub fn accepts(self, count: usize) -> bool {
        match self {
            Self::Exactly(n) => count == n,
            Self::OneOf(options) => options.contains(&count),
        }
    }
}

impl fmt::Display for Arity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exactly(n) => write!(f, "exactly {n}"),
            Self::OneOf(options) => match options.split_last() {
                Some((last, [])) => write!(f, "{last}"),
                Some((last, rest)) => {
                    let head: Vec<String> = rest.iter().map(ToString::to_string).collect();
                    write!(f, "{} or {last}", head.join(", "))
                }
                None => write!(f, "none"),
            },
        }
    }
}

/// Name, arguments, value store, lifecycle and error slot of an operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationState {
    name: String,
    arguments: Vec<String>,
    values: BTreeMap<String, String>,
    lifecycle: Lifecycle,
    error: Option<OperationError>,
}

impl OperationState {
    #[must_use]
    pub fn new(name: impl Into<String>, arguments: Vec<String>) -> Self {
        Self {
            name: name.into(),
            arguments,
            values: BTreeMap::new(),
            lifecycle: Lifecycle::Created,
            error: None,
        }
    }

    /// Same name and arguments, nothing else
    #[must_use]
    pub fn fresh(&self) -> Self {
        Self::new(self.name.clone(), self.arguments.clone())
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn arguments(&self) -> &[String] {
        &self.arguments
    }

    #[must_use]
    pub fn argument(&self, index: usize) -> Option<&str> {
        self.arguments.get(index).map(String::as_str)
    }

    #[must_use]
    pub fn value(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    pub fn set_value(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), value.into());
    }

    pub fn remove_value(&mut self, key: &str) -> Option<String> {
        self.values.remove(key)
    }

    #[must_use]
    pub fn values(&self) -> &BTreeMap<String, String> {
        &self.values
    }

    pub fn set_values(&mut self, values: BTreeMap<String, String>) {
        self.values = values;
    }

    pub fn clear_values(&mut self) {
        self.values.clear();
    }

    #[must_use]
    pub fn lifecycle(&self) -> Lifecycle {
        self.lifecycle
    }

    pub fn set_lifecycle(&mut self, lifecycle: Lifecycle) {
        self.lifecycle = lifecycle;
    }

    #[must_use]
    pub fn error(&self) -> Option<&OperationError> {
        self.error.as_ref()
    }

    #[must_use]
    pub fn error_kind(&self) -> Option<OperationErrorKind> {
        self.error.as_ref().map(|e| e.kind)
    }

    pub fn set_error(&mut self, error: OperationError) {
        self.error = Some(error);
    }

    /// Record a `UserDefinedError`
    pub fn fail(&mut self, message: impl Into<String>) {
        self.error = Some(OperationError::user_defined(message));
    }

    pub fn clear_error(&mut self) {
        self.error = None;
    }
}

/// A named, reversible unit of system mutation
///
/// Failures are reported through the error slot in [`OperationState`] and a
/// `false` return; operations never return errors across the executor
/// boundary. `undo_operation` must be safe to call after a partial or
/// failed perform and must be idempotent.
#[async_trait]
pub trait Operation: Send + Sync + fmt::Debug {
    fn state(&self) -> &OperationState;

    fn state_mut(&mut self) -> &mut OperationState;

    /// Argument counts this kind accepts
    fn arity(&self) -> Arity;

    /// Capture whatever undo needs before mutating anything
    async fn backup(&mut self);

    /// Apply the mutation
    async fn perform_operation(&mut self) -> bool;

    /// Reverse a previous perform
    async fn undo_operation(&mut self) -> bool;

    /// Dry-run check
    async fn test_operation(&mut self) -> bool {
        true
    }

    /// Same kind, same arguments, no lifecycle state
    fn clone_fresh(&self) -> Box<dyn Operation>;

    fn name(&self) -> &str {
        self.state().name()
    }

    fn arguments(&self) -> &[String] {
        self.state().arguments()
    }

    /// Check the argument count, recording `InvalidArguments` on mismatch
    fn validate_arguments(&mut self) -> bool {
        let arity = self.arity();
        let given = self.state().arguments().len();
        if arity.accepts(given) {
            return true;
        }
        let message = format!(
            "Invalid arguments in {}: {given} arguments given, {arity} expected.",
            self.state().name()
        );
        self.state_mut()
            .set_error(OperationError::invalid_arguments(message));
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arity_display() {
        assert_eq!(Arity::Exactly(2).to_string(), "exactly 2");
        assert_eq!(Arity::OneOf(&[3, 4, 5]).to_string(), "3, 4 or 5");
        assert_eq!(Arity::OneOf(&[1]).to_string(), "1");
    }

    #[test]
    fn test_arity_accepts() {
        assert!(Arity::Exactly(2).accepts(2));
        assert!(!Arity::Exactly(2).accepts(3));
        assert!(Arity::OneOf(&[3, 4, 5]).accepts(4));
        assert!(!Arity::OneOf(&[3, 4, 5]).accepts(2));
    }

    #[test]
    fn test_fresh_state_drops_history() {
        let mut state = OperationState::new("CreateLink", vec!["a".into(), "b".into()]);
        state.set_value("oldvalue", "x");
        state.set_lifecycle(Lifecycle::Performed);
        state.fail("boom");

        let fresh = state.fresh();
        assert_eq!(fresh.name(), "CreateLink");
        assert_eq!(fresh.arguments(), state.arguments());
        assert!(fresh.values().is_empty());
        assert_eq!(fresh.lifecycle(), Lifecycle::Created);
        assert!(fresh.error().is_none());
    }
}
