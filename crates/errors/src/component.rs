//! Component graph error types

use std::borrow::Cow;

use crate::UserFacingError;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ComponentError {
    #[error("components cannot have children in updater mode")]
    ChildrenInUpdaterMode { parent: String },

    #[error("component {name} is defined more than once")]
    Duplicate { name: String },

    #[error("component not found: {name}")]
    NotFound { name: String },

    #[error("component {name} is virtual and cannot be selected")]
    NotSelectable { name: String },

    #[error("invalid component manifest: {message}")]
    InvalidManifest { message: String },
}

impl UserFacingError for ComponentError {
    fn user_message(&self) -> Cow<'_, str> {
        Cow::Owned(self.to_string())
    }

    fn user_hint(&self) -> Option<&'static str> {
        match self {
            Self::Duplicate { .. } => Some("Keep a single definition per component name."),
            Self::NotSelectable { .. } => {
                Some("Virtual components are installed through the components that depend on them.")
            }
            _ => None,
        }
    }

    fn user_code(&self) -> Option<&'static str> {
        let code = match self {
            Self::ChildrenInUpdaterMode { .. } => "component.children_in_updater_mode",
            Self::Duplicate { .. } => "component.duplicate",
            Self::NotFound { .. } => "component.not_found",
            Self::NotSelectable { .. } => "component.not_selectable",
            Self::InvalidManifest { .. } => "component.invalid_manifest",
        };
        Some(code)
    }
}
