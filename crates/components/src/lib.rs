#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Component model for rivet
//!
//! Components form a parent/child tree for presentation and a separate
//! dependency graph by name. This crate owns both, the TOML manifest that
//! declares them, and the static checker that flags fragile definitions.

pub mod checker;
pub mod component;
pub mod graph;
pub mod manifest;

pub use checker::{check_all, check_component};
pub use component::{CheckState, Component, ComponentId, DefaultValue};
pub use graph::{ComponentGraph, ComponentType};
pub use manifest::{ComponentDefinition, LoadedGraph, Manifest};
