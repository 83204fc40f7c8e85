//! Operation specifications and transaction plans
//!
//! These are the plain-data forms that flow from the resolver to the
//! transaction executor. Live operation objects are built from them by the
//! operation registry.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A named operation with its string arguments
///
/// `values` carries the value store recorded when the operation was
/// performed, so an uninstall can replay it with undo semantics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationSpec {
    pub name: String,
    #[serde(default)]
    pub arguments: Vec<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub values: BTreeMap<String, String>,
}

impl OperationSpec {
    #[must_use]
    pub fn new<I, S>(name: impl Into<String>, arguments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            arguments: arguments.into_iter().map(Into::into).collect(),
            values: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn with_values(mut self, values: BTreeMap<String, String>) -> Self {
        self.values = values;
        self
    }
}

impl fmt::Display for OperationSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.name, self.arguments.join(", "))
    }
}

/// Which half of an operation runs as the forward step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Install: perform forward, undo on rollback
    Perform,
    /// Uninstall: undo forward, perform on rollback
    Revert,
}

/// What the plan does to the target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlanAction {
    Install,
    Uninstall,
}

impl fmt::Display for PlanAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Install => write!(f, "install"),
            Self::Uninstall => write!(f, "uninstall"),
        }
    }
}

/// One step of a transaction plan
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlannedOperation {
    pub component: String,
    pub spec: OperationSpec,
    pub direction: Direction,
}

/// Ordered output of dependency resolution
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionPlan {
    pub action: PlanAction,
    /// Component names in execution order
    pub components: Vec<String>,
    pub operations: Vec<PlannedOperation>,
    /// Bytes required by components changing to installed
    pub required_space: u64,
}

impl TransactionPlan {
    #[must_use]
    pub fn empty(action: PlanAction) -> Self {
        Self {
            action,
            components: Vec::new(),
            operations: Vec::new(),
            required_space: 0,
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }
}
