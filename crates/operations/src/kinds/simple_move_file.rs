use crate::fs;
use crate::operation::{Arity, Lifecycle, Operation, OperationState};
use async_trait::async_trait;
use std::path::Path;
use tracing::{debug, warn};

/// `SimpleMoveFile <source> <target>`
#[derive(Debug, Clone)]
pub struct SimpleMoveFile {
    state: OperationState,
}

impl SimpleMoveFile {
    pub const NAME: &'static str = "SimpleMoveFile";

    #[must_use]
    pub fn new(state: OperationState) -> Self {
        Self { state }
    }
}

#[async_trait]
impl Operation for SimpleMoveFile {
    fn state(&self) -> &OperationState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut OperationState {
        &mut self.state
    }

    fn arity(&self) -> Arity {
        Arity::Exactly(2)
    }

    async fn backup(&mut self) {
        self.state.set_lifecycle(Lifecycle::BackedUp);
    }

    async fn perform_operation(&mut self) -> bool {
        if !self.validate_arguments() {
            return false;
        }
        let source = self.state.argument(0).unwrap_or_default().to_string();
        let target = self.state.argument(1).unwrap_or_default().to_string();

        if source.is_empty() || target.is_empty() {
            self.state.fail(format!(
                "None of the arguments can be empty: source '{source}', target '{target}'."
            ));
            return false;
        }

        let target_path = Path::new(&target);
        if fs::exists(target_path).await && tokio::fs::remove_file(target_path).await.is_err() {
            self.state.fail(format!(
                "Cannot move source '{source}' to target '{target}', \
                 because target exists and is not removable."
            ));
            return false;
        }

        if let Err(e) = tokio::fs::rename(&source, &target).await {
            self.state
                .fail(format!("Cannot move source '{source}' to target '{target}': {e}"));
            return false;
        }

        debug!("Move '{source}' to '{target}'.");
        self.state.set_lifecycle(Lifecycle::Performed);
        true
    }

    async fn undo_operation(&mut self) -> bool {
        let (Some(source), Some(target)) = (self.state.argument(0), self.state.argument(1)) else {
            return true;
        };
        let (source, target) = (source.to_string(), target.to_string());

        if !target.is_empty() && fs::exists(Path::new(&target)).await {
            if let Err(e) = tokio::fs::rename(&target, &source).await {
                warn!(source = %source, target = %target, error = %e, "could not move file back");
            } else {
                debug!("Move '{target}' to '{source}'.");
            }
        }
        self.state.set_lifecycle(Lifecycle::Undone);
        true
    }

    fn clone_fresh(&self) -> Box<dyn Operation> {
        Box::new(Self::new(self.state.fresh()))
    }
}
