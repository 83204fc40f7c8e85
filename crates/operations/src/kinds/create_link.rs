use crate::fs;
use crate::operation::{Arity, Lifecycle, Operation, OperationState};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::debug;

/// `CreateLink <link> <target>`
#[derive(Debug, Clone)]
pub struct CreateLink {
    state: OperationState,
}

impl CreateLink {
    pub const NAME: &'static str = "CreateLink";

    #[must_use]
    pub fn new(state: OperationState) -> Self {
        Self { state }
    }

    fn paths(&self) -> Option<(PathBuf, PathBuf)> {
        let link = self.state.argument(0)?;
        let target = self.state.argument(1)?;
        Some((PathBuf::from(link), PathBuf::from(target)))
    }
}

#[async_trait]
impl Operation for CreateLink {
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
        let Some((link, target)) = self.paths() else {
            return false;
        };

        if let Err(e) = fs::symlink(&target, &link).await {
            debug!(
                link = %link.display(),
                target = %target.display(),
                error = %e,
                "symlink failed"
            );
            self.state.fail(format!(
                "Could not create link from {} to {}.",
                link.display(),
                target.display()
            ));
            return false;
        }
        self.state.set_lifecycle(Lifecycle::Performed);
        true
    }

    async fn undo_operation(&mut self) -> bool {
        let Some((link, target)) = self.paths() else {
            return true;
        };
        if !fs::exists(&link).await {
            self.state.set_lifecycle(Lifecycle::Undone);
            return true;
        }
        // only the link we created is ours to remove
        if fs::link_target(&link).await.as_deref() != Some(target.as_path()) {
            self.state.set_lifecycle(Lifecycle::Undone);
            return true;
        }
        if remove_link(&link).await.is_err() {
            self.state.fail(format!(
                "Could not remove link from {} to {}.",
                link.display(),
                target.display()
            ));
            return false;
        }
        self.state.set_lifecycle(Lifecycle::Undone);
        true
    }

    fn clone_fresh(&self) -> Box<dyn Operation> {
        Box::new(Self::new(self.state.fresh()))
    }
}

async fn remove_link(link: &Path) -> std::io::Result<()> {
    match tokio::fs::remove_file(link).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        #[cfg(windows)]
        Err(_) => tokio::fs::remove_dir(link).await,
        #[cfg(not(windows))]
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rivet_errors::OperationErrorKind;

    fn op(args: &[&str]) -> CreateLink {
        CreateLink::new(OperationState::new(
            CreateLink::NAME,
            args.iter().map(ToString::to_string).collect(),
        ))
    }

    #[tokio::test]
    async fn test_wrong_arity() {
        let mut link = op(&["only-one"]);
        assert!(!link.perform_operation().await);
        assert_eq!(
            link.state().error_kind(),
            Some(OperationErrorKind::InvalidArguments)
        );
        assert_eq!(
            link.state().error().unwrap().message,
            "Invalid arguments in CreateLink: 1 arguments given, exactly 2 expected."
        );
    }

    #[tokio::test]
    async fn test_undo_leaves_foreign_link() {
        let dir = tempfile::tempdir().unwrap();
        let link_path = dir.path().join("link");
        let other = dir.path().join("other");
        tokio::fs::write(&other, b"x").await.unwrap();
        fs::symlink(&other, &link_path).await.unwrap();

        let target = dir.path().join("target");
        let mut link = op(&[link_path.to_str().unwrap(), target.to_str().unwrap()]);
        assert!(link.undo_operation().await);
        assert!(fs::exists(&link_path).await);
    }

    #[tokio::test]
    async fn test_existing_link_path_fails() {
        let dir = tempfile::tempdir().unwrap();
        let link_path = dir.path().join("link");
        tokio::fs::write(&link_path, b"occupied").await.unwrap();
        let target = dir.path().join("target");

        let mut link = op(&[link_path.to_str().unwrap(), target.to_str().unwrap()]);
        assert!(!link.perform_operation().await);
        assert_eq!(
            link.state().error_kind(),
            Some(OperationErrorKind::UserDefinedError)
        );
        assert!(link
            .state()
            .error()
            .unwrap()
            .message
            .starts_with("Could not create link from"));
    }
}
