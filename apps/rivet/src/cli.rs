//! Command line interface definition

use clap::{Parser, Subcommand};
use rivet_types::{ColorChoice, InstallerMode, RemoteMode};
use std::path::PathBuf;

/// rivet - transactional component installer
#[derive(Parser)]
#[command(name = "rivet")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Resolve, install and uninstall components with rollback")]
#[command(long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[command(flatten)]
    pub global: GlobalArgs,
}

/// Global arguments available for all commands
#[derive(Parser)]
pub struct GlobalArgs {
    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Enable debug logging to stderr
    #[arg(long, global = true)]
    pub debug: bool,

    /// Color output control
    #[arg(long, global = true, value_enum)]
    pub color: Option<ColorChoice>,

    /// Use alternate config file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Installer mode the manifest is loaded in
    #[arg(long, global = true, value_enum)]
    pub mode: Option<InstallerMode>,
}

/// Available commands
#[derive(Subcommand)]
pub enum Commands {
    /// Report configuration warnings for every component in a manifest
    Check {
        /// Component manifest (TOML)
        manifest: PathBuf,
    },

    /// Show the ordered operations an install or uninstall would run
    Plan {
        /// Component manifest (TOML)
        manifest: PathBuf,

        /// Components to check in addition to the defaults
        #[arg(short, long, value_name = "NAME")]
        select: Vec<String>,

        /// Components to uncheck
        #[arg(short, long, value_name = "NAME")]
        deselect: Vec<String>,

        /// Plan the removal of deselected installed components
        #[arg(long)]
        uninstall: bool,
    },

    /// Install the selected components
    #[command(alias = "i")]
    Install {
        /// Component manifest (TOML)
        manifest: PathBuf,

        /// Components to check in addition to the defaults
        #[arg(short, long, value_name = "NAME")]
        select: Vec<String>,

        /// Components to uncheck
        #[arg(short, long, value_name = "NAME")]
        deselect: Vec<String>,

        /// Installation target directory
        #[arg(long, value_name = "DIR")]
        target_dir: Option<PathBuf>,

        /// Remove the target directory if it is empty after a rollback
        #[arg(long)]
        remove_target_dir: bool,
    },

    /// Uninstall installed components
    #[command(alias = "rm")]
    Uninstall {
        /// Component manifest (TOML)
        manifest: PathBuf,

        /// Installed components to remove
        #[arg(required = true)]
        components: Vec<String>,
    },

    /// Serve elevated operations to an installer over a local socket
    StartServer {
        /// Socket name; relative names live in the temp directory
        #[arg(long, value_name = "NAME")]
        socket: Option<String>,

        /// Authorization key clients must present
        #[arg(long, value_name = "KEY")]
        key: Option<String>,

        /// Server mode
        #[arg(long, value_enum)]
        remote_mode: Option<RemoteMode>,
    },
}

impl Commands {
    /// Manifest the command reads, if any
    pub fn manifest(&self) -> Option<&PathBuf> {
        match self {
            Self::Check { manifest }
            | Self::Plan { manifest, .. }
            | Self::Install { manifest, .. }
            | Self::Uninstall { manifest, .. } => Some(manifest),
            Self::StartServer { .. } => None,
        }
    }
}
