#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Dependency resolution for rivet
//!
//! Computes the closed set of components to install or uninstall from the
//! current selection, orders it so dependencies run before dependents
//! (reversed for uninstalls) with ties broken by declaration order, and
//! reports the disk space the install needs.

mod graph;
mod resolver;

pub use graph::OrderGraph;
pub use resolver::{Resolution, Resolver};
