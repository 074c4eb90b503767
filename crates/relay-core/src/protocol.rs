use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;

use crate::patch::{Patch, PatchMode};

/// Messages sent from the server to the client.
///
/// Wire shapes:
/// - `{"position": "<path>", "set": <scalar>}`
/// - `{"position": "<path>", "accumulate": <scalar>}`
/// - `{"status": "done"}`
/// - `{"status": "error", "message": "<text>"}`
#[derive(Clone, Debug, PartialEq)]
pub enum ServerMessage {
    Patch(Patch),
    Done,
    Error { message: String },
}

impl ServerMessage {
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }

    pub fn as_patch(&self) -> Option<&Patch> {
        match self {
            Self::Patch(p) => Some(p),
            _ => None,
        }
    }

    pub fn is_done(&self) -> bool {
        matches!(self, Self::Done)
    }

    /// Serialize to the JSON text frame sent over the socket.
    pub fn to_json(&self) -> String {
        // Every variant is plain strings and JSON values, so this cannot fail.
        serde_json::to_string(self).unwrap_or_default()
    }
}

impl From<Patch> for ServerMessage {
    fn from(patch: Patch) -> Self {
        Self::Patch(patch)
    }
}

#[derive(Serialize)]
#[serde(untagged)]
enum Wire<'a> {
    Set {
        position: &'a str,
        set: &'a Value,
    },
    Accumulate {
        position: &'a str,
        accumulate: &'a Value,
    },
    Status {
        status: &'static str,
        #[serde(skip_serializing_if = "Option::is_none")]
        message: Option<&'a str>,
    },
}

impl Serialize for ServerMessage {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let wire = match self {
            Self::Patch(p) => match p.mode {
                PatchMode::Set => Wire::Set {
                    position: &p.path,
                    set: &p.value,
                },
                PatchMode::Append => Wire::Accumulate {
                    position: &p.path,
                    accumulate: &p.value,
                },
            },
            Self::Done => Wire::Status {
                status: "done",
                message: None,
            },
            Self::Error { message } => Wire::Status {
                status: "error",
                message: Some(message),
            },
        };
        wire.serialize(serializer)
    }
}

/// Messages sent from the client to the server.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ClientMessage {
    Prompt(String),
    Cancel,
}

#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("invalid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),
    #[error("unknown message type: {0}")]
    UnknownType(String),
    #[error("missing prompt")]
    MissingPrompt,
}

#[derive(Deserialize)]
struct RawClientMessage {
    #[serde(default, rename = "type")]
    kind: Option<String>,
    #[serde(default)]
    prompt: Option<String>,
}

impl ClientMessage {
    /// Parse a client text frame. A `type` field takes precedence over `prompt`.
    pub fn parse(raw: &str) -> Result<Self, ProtocolError> {
        let msg: RawClientMessage = serde_json::from_str(raw)?;
        match msg.kind.as_deref() {
            Some("cancel") => Ok(Self::Cancel),
            Some(other) if other != "prompt" => Err(ProtocolError::UnknownType(other.to_string())),
            _ => msg.prompt.map(Self::Prompt).ok_or(ProtocolError::MissingPrompt),
        }
    }
}
