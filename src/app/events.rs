//! Defines the message structures exchanged with a driving script.

use serde::{Deserialize, Serialize};

/// Events sent from the engine back to the driver.
#[derive(Debug, Clone, PartialEq)]
pub enum UserEvent {
    /// The outcome of one IPC message, in the order messages arrived.
    Reply(Reply),
}

/// The serialized answer to an [`IpcMessage`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum Reply {
    Ok {
        result: serde_json::Value,
    },
    Error {
        /// A stable identifier such as `name_collision` or `invalid_payload`.
        kind: String,
        message: String,
    },
}

impl Reply {
    pub fn error(kind: &str, message: impl Into<String>) -> Self {
        Reply::Error {
            kind: kind.to_string(),
            message: message.into(),
        }
    }
}

/// A message received from the driver, one JSON object per line.
#[derive(Deserialize, Debug)]
pub struct IpcMessage {
    /// The name of the command to execute.
    pub command: String,
    /// The payload associated with the command, as a JSON value.
    #[serde(default)]
    pub payload: serde_json::Value,
}
