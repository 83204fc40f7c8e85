#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Reversible operations for rivet
//!
//! An [`Operation`] is one named, undoable mutation of the system. Kinds are
//! looked up by name in an [`OperationRegistry`] that the transaction
//! executor and the remote server share, so any kind can run locally or in
//! an elevated peer.

mod fs;
pub mod kinds;
pub mod operation;
pub mod registry;

pub use kinds::{AddKitsToSpeedDial, CreateLink, GlobalConfig, SettingsLocation, SimpleMoveFile};
pub use operation::{Arity, Lifecycle, Operation, OperationState};
pub use registry::{OperationEnvironment, OperationFactory, OperationRegistry};
