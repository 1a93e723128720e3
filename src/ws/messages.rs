//! Client wire protocol: inbound envelope and the outbound execute command.
//!
//! Inbound frames are strict on the envelope (`op` must be a string) and
//! lenient on the payload: `data` may be anything, and handlers read it
//! through [`InboundMessage::str_field`], which yields `None` for missing
//! or mistyped fields instead of failing.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::Severity;
use crate::error::ProtocolError;

/// Operation names understood by the gateway.
pub mod ops {
    /// Client announces its display name.
    pub const IDENTIFY: &str = "client/identify";
    /// Plain console output.
    pub const CONSOLE_PRINT: &str = "client/console/print";
    /// Informational console output.
    pub const CONSOLE_INFO: &str = "client/console/info";
    /// Warning console output.
    pub const CONSOLE_WARN: &str = "client/console/warn";
    /// Error console output.
    pub const CONSOLE_ERROR: &str = "client/console/error";
    /// Server asks the client to run a script.
    pub const EXECUTE: &str = "client/onDidTextDocumentExecute";
}

/// Routed form of an inbound `op`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op<'a> {
    /// `client/identify`.
    Identify,
    /// One of the `client/console/*` operations.
    Console(Severity),
    /// Anything else.
    Unknown(&'a str),
}

impl<'a> From<&'a str> for Op<'a> {
    fn from(op: &'a str) -> Self {
        match op {
            ops::IDENTIFY => Self::Identify,
            ops::CONSOLE_PRINT => Self::Console(Severity::Print),
            ops::CONSOLE_INFO => Self::Console(Severity::Info),
            ops::CONSOLE_WARN => Self::Console(Severity::Warn),
            ops::CONSOLE_ERROR => Self::Console(Severity::Error),
            other => Self::Unknown(other),
        }
    }
}

/// Inbound message envelope: `{"op": "<string>", "data": ...}`.
#[derive(Debug, Clone, Deserialize)]
pub struct InboundMessage {
    /// Operation name.
    pub op: String,
    /// Operation-specific payload; `Null` when absent.
    #[serde(default)]
    pub data: Value,
}

impl InboundMessage {
    /// Parses a text frame.
    ///
    /// # Errors
    ///
    /// [`ProtocolError::Malformed`] if the frame is not a JSON object with
    /// a string `op`.
    pub fn parse(text: &str) -> Result<Self, ProtocolError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Returns the routed operation.
    #[must_use]
    pub fn op(&self) -> Op<'_> {
        Op::from(self.op.as_str())
    }

    /// Reads a string inside `data` by JSON pointer (e.g. `/player/name`).
    #[must_use]
    pub fn str_field(&self, pointer: &str) -> Option<&str> {
        self.data.pointer(pointer).and_then(Value::as_str)
    }
}

/// `{"text": <script>}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextDocument {
    /// Script source.
    pub text: String,
}

/// `{"textDocument": {...}}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecuteData {
    /// Document to execute.
    #[serde(rename = "textDocument")]
    pub text_document: TextDocument,
}

/// The only frame the gateway sends to clients.
///
/// Wire shape:
/// `{"op":"client/onDidTextDocumentExecute","data":{"textDocument":{"text":"..."}}}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecuteCommand {
    /// Always [`ops::EXECUTE`].
    pub op: String,
    /// Script payload.
    pub data: ExecuteData,
}

impl ExecuteCommand {
    /// Wraps script text. Any string, including an empty one, is accepted.
    #[must_use]
    pub fn new(script: impl Into<String>) -> Self {
        Self {
            op: ops::EXECUTE.to_string(),
            data: ExecuteData {
                text_document: TextDocument {
                    text: script.into(),
                },
            },
        }
    }

    /// Returns the script text.
    #[must_use]
    pub fn script(&self) -> &str {
        &self.data.text_document.text
    }

    /// Serializes to a compact JSON text frame.
    ///
    /// # Errors
    ///
    /// Propagates [`serde_json::Error`]; not expected for string payloads.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
