//! Ordered operation steps and their high-water mark

use rivet_errors::Error;
use rivet_operations::{Operation, OperationRegistry};
use rivet_types::{Direction, PlanAction, TransactionPlan};
use std::fmt;
use uuid::Uuid;

/// Where a transaction is in its run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionStatus {
    Idle,
    Running,
    RollingBack,
    Success,
    Canceled,
    Failure,
}

impl TransactionStatus {
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Success | Self::Canceled | Self::Failure)
    }
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Idle => "idle",
            Self::Running => "running",
            Self::RollingBack => "rolling_back",
            Self::Success => "success",
            Self::Canceled => "canceled",
            Self::Failure => "failure",
        };
        write!(f, "{s}")
    }
}

/// One operation of a transaction and the component it belongs to
#[derive(Debug)]
pub struct Step {
    pub component: String,
    pub direction: Direction,
    pub operation: Box<dyn Operation>,
}

/// One install or uninstall run
///
/// Every operation is instantiated up front; `performed` counts the steps
/// that completed and bounds the rollback.
#[derive(Debug)]
pub struct Transaction {
    id: Uuid,
    action: PlanAction,
    pub(crate) steps: Vec<Step>,
    pub(crate) performed: usize,
    pub(crate) status: TransactionStatus,
}

impl Transaction {
    #[must_use]
    pub fn new(action: PlanAction, steps: Vec<Step>) -> Self {
        Self {
            id: Uuid::new_v4(),
            action,
            steps,
            performed: 0,
            status: TransactionStatus::Idle,
        }
    }

    /// Build every operation of a plan
    ///
    /// # Errors
    ///
    /// Returns a registry error for an unknown operation kind; nothing has
    /// run at that point.
    pub fn from_plan(plan: &TransactionPlan, registry: &OperationRegistry) -> Result<Self, Error> {
        let steps = plan
            .operations
            .iter()
            .map(|planned| {
                Ok(Step {
                    component: planned.component.clone(),
                    direction: planned.direction,
                    operation: registry.create_from_spec(&planned.spec)?,
                })
            })
            .collect::<Result<Vec<_>, Error>>()?;
        Ok(Self::new(plan.action, steps))
    }

    #[must_use]
    pub fn id(&self) -> Uuid {
        self.id
    }

    #[must_use]
    pub fn action(&self) -> PlanAction {
        self.action
    }

    #[must_use]
    pub fn status(&self) -> TransactionStatus {
        self.status
    }

    /// Steps completed so far
    #[must_use]
    pub fn performed(&self) -> usize {
        self.performed
    }

    #[must_use]
    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}
