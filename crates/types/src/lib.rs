#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Core type definitions for the rivet installer
//!
//! This crate provides fundamental types used throughout the system,
//! including version constraints, operation specifications and the modes
//! the installer runs in.

pub mod operation;
pub mod repository;
pub mod version;

// Re-export commonly used types
pub use operation::{Direction, OperationSpec, PlanAction, PlannedOperation, TransactionPlan};
pub use repository::Repository;
pub use semver::Version;
pub use version::{parse_lenient, DependencyRef, VersionConstraint};

use serde::{Deserialize, Serialize};

/// Which kind of run the installer is performing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum InstallerMode {
    /// Fresh install of a selection
    #[default]
    Installer,
    /// Flat list of updates; components cannot have children
    Updater,
    /// Add/remove against an existing installation
    PackageManager,
}

impl std::fmt::Display for InstallerMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Installer => write!(f, "installer"),
            Self::Updater => write!(f, "updater"),
            Self::PackageManager => write!(f, "package-manager"),
        }
    }
}

impl clap::ValueEnum for InstallerMode {
    fn value_variants<'a>() -> &'a [Self] {
        &[Self::Installer, Self::Updater, Self::PackageManager]
    }

    fn to_possible_value(&self) -> Option<clap::builder::PossibleValue> {
        Some(match self {
            Self::Installer => clap::builder::PossibleValue::new("installer"),
            Self::Updater => clap::builder::PossibleValue::new("updater"),
            Self::PackageManager => clap::builder::PossibleValue::new("package-manager"),
        })
    }
}

/// Remote session mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RemoteMode {
    /// Well-known default socket and key are accepted
    Debug,
    /// A non-empty shared key is mandatory
    #[default]
    Production,
}

impl std::fmt::Display for RemoteMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Debug => write!(f, "debug"),
            Self::Production => write!(f, "production"),
        }
    }
}

impl clap::ValueEnum for RemoteMode {
    fn value_variants<'a>() -> &'a [Self] {
        &[Self::Debug, Self::Production]
    }

    fn to_possible_value(&self) -> Option<clap::builder::PossibleValue> {
        Some(match self {
            Self::Debug => clap::builder::PossibleValue::new("debug"),
            Self::Production => clap::builder::PossibleValue::new("production"),
        })
    }
}

/// Output format for CLI commands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Plain,
    #[default]
    Tty,
    Json,
}

/// Color output choice
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ColorChoice {
    Always,
    #[default]
    Auto,
    Never,
}

impl clap::ValueEnum for ColorChoice {
    fn value_variants<'a>() -> &'a [Self] {
        &[Self::Always, Self::Auto, Self::Never]
    }

    fn to_possible_value(&self) -> Option<clap::builder::PossibleValue> {
        Some(match self {
            Self::Always => clap::builder::PossibleValue::new("always"),
            Self::Auto => clap::builder::PossibleValue::new("auto"),
            Self::Never => clap::builder::PossibleValue::new("never"),
        })
    }
}
