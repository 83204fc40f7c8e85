#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Remote execution channel for rivet
//!
//! Operations that need elevated privileges are forwarded from the
//! installer process to a peer started with `start-server`. Transport is a
//! Unix domain socket carrying newline-delimited JSON.

pub mod client;
pub mod protocol;
pub mod server;

pub use client::{RemoteClient, RemoteExecutor};
pub use protocol::{ExecutePhase, ExecuteRequest, ExecuteResponse, Request, Response};
pub use server::{authorize, execute_request, RemoteServer, ServerSettings};
