//! Wire format of the remote execution channel
//!
//! One JSON document per line in each direction. A session starts with
//! `Authenticate`; after `Authenticated` the client sends `Execute`
//! requests one at a time and waits for each `Result`.

use rivet_errors::{OperationError, OperationErrorKind, RemoteError};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::collections::BTreeMap;

/// Which half of an operation the peer should run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutePhase {
    /// `backup` followed by `perform_operation`
    Perform,
    /// `undo_operation`
    Undo,
}

/// Run one operation kind on the peer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecuteRequest {
    pub kind: String,
    pub arguments: Vec<String>,
    #[serde(default)]
    pub values: BTreeMap<String, String>,
    /// Index of the step in the caller's transaction
    pub step: usize,
    pub phase: ExecutePhase,
}

/// Outcome of an [`ExecuteRequest`], including the updated value store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecuteResponse {
    pub success: bool,
    #[serde(default)]
    pub error_kind: Option<OperationErrorKind>,
    #[serde(default)]
    pub error_message: Option<String>,
    #[serde(default)]
    pub values: BTreeMap<String, String>,
}

impl ExecuteResponse {
    #[must_use]
    pub fn error(&self) -> Option<OperationError> {
        let kind = self.error_kind?;
        Some(OperationError {
            kind,
            message: self.error_message.clone().unwrap_or_default(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Request {
    Authenticate { key: String },
    Execute(ExecuteRequest),
    Shutdown,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Response {
    Authenticated,
    Rejected { reason: String },
    Result(ExecuteResponse),
    ShuttingDown,
}

/// Serialize a message as one line, newline included
///
/// # Errors
///
/// Returns `RemoteError::Protocol` if serialization fails.
pub fn encode<T: Serialize>(message: &T) -> Result<String, RemoteError> {
    let mut line = serde_json::to_string(message).map_err(|e| RemoteError::Protocol {
        message: e.to_string(),
    })?;
    line.push('\n');
    Ok(line)
}

/// Parse one line
///
/// # Errors
///
/// Returns `RemoteError::Protocol` for malformed JSON or unknown messages.
pub fn decode<T: DeserializeOwned>(line: &str) -> Result<T, RemoteError> {
    serde_json::from_str(line.trim_end()).map_err(|e| RemoteError::Protocol {
        message: e.to_string(),
    })
}
