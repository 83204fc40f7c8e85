//! Dependency resolution error types
//!
//! Every variant here is fatal: it aborts before any operation of a
//! transaction is constructed.

use std::borrow::Cow;

use crate::UserFacingError;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ResolverError {
    #[error("cyclic dependency detected: {}", path.join(" -> "))]
    ConfigurationCycle { path: Vec<String> },

    #[error("component {component} depends on missing component {dependency}")]
    MissingDependency {
        component: String,
        dependency: String,
    },

    #[error("component {component} requires {requirement} but {found} is available")]
    VersionConflict {
        component: String,
        requirement: String,
        found: String,
    },

    #[error("invalid dependency {dependency} on {component}: {message}")]
    InvalidDependency {
        component: String,
        dependency: String,
        message: String,
    },

    #[error("component {name} cannot be uninstalled: {reason}")]
    CannotUninstall { name: String, reason: String },
}

impl UserFacingError for ResolverError {
    fn user_message(&self) -> Cow<'_, str> {
        Cow::Owned(self.to_string())
    }

    fn user_hint(&self) -> Option<&'static str> {
        match self {
            Self::ConfigurationCycle { .. } => {
                Some("Break the dependency cycle in the component definitions.")
            }
            Self::MissingDependency { .. } => {
                Some("Add the missing component to a repository or drop the dependency.")
            }
            Self::VersionConflict { .. } => {
                Some("Ship a component version that satisfies the dependency constraint.")
            }
            _ => None,
        }
    }

    fn user_code(&self) -> Option<&'static str> {
        let code = match self {
            Self::ConfigurationCycle { .. } => "resolver.configuration_cycle",
            Self::MissingDependency { .. } => "resolver.missing_dependency",
            Self::VersionConflict { .. } => "resolver.version_conflict",
            Self::InvalidDependency { .. } => "resolver.invalid_dependency",
            Self::CannotUninstall { .. } => "resolver.cannot_uninstall",
        };
        Some(code)
    }
}
