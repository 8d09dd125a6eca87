//! Server-sent chat stream: record splitting and typed payloads.
//!
//! The chat endpoint answers with records of the form `data: <json>\n\n`, where the
//! JSON is `{"type":"token","data":"..."}` or `{"type":"citations","data":[...]}`,
//! terminated by `data: [DONE]`.

mod decoder;

pub use decoder::{Record, RecordDecoder};

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A reference to a source file or snippet backing part of an answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Citation {
    pub file_name: String,
    #[serde(default)]
    pub text: String,
}

/// One decoded payload of the chat stream.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    /// A text fragment to append to the answer
    Token(String),
    /// The full citation list for the exchange, replacing any earlier one
    Citations(Vec<Citation>),
    /// A well-formed payload of a type this client does not know
    Other(String),
}

/// Raw `{type, data}` envelope before the type-specific `data` is interpreted.
#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    data: Value,
}

/// Why a payload could not be turned into a [`StreamEvent`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MalformedPayload(pub String);

impl std::fmt::Display for MalformedPayload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl StreamEvent {
    /// Decode the JSON payload of a `data:` record.
    pub fn parse(payload: &str) -> Result<Self, MalformedPayload> {
        let envelope: Envelope =
            serde_json::from_str(payload).map_err(|e| MalformedPayload(e.to_string()))?;

        match envelope.kind.as_str() {
            "token" => match envelope.data {
                Value::String(fragment) => Ok(StreamEvent::Token(fragment)),
                other => Err(MalformedPayload(format!(
                    "token data must be a string, got {}",
                    json_type_name(&other)
                ))),
            },
            "citations" => serde_json::from_value::<Vec<Citation>>(envelope.data)
                .map(StreamEvent::Citations)
                .map_err(|e| MalformedPayload(format!("invalid citations: {}", e))),
            _ => Ok(StreamEvent::Other(envelope.kind)),
        }
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Shorten a citation file path to its last two components for display.
pub fn shorten_path(path: &str) -> String {
    let parts: Vec<&str> = path.split('/').filter(|p| !p.is_empty()).collect();
    if parts.len() <= 2 {
        path.to_string()
    } else {
        parts[parts.len() - 2..].join("/")
    }
}
