use serde::{Deserialize, Serialize};

/// Server -> client payload. The relay only ever pushes full history
/// snapshots, both at accept time and after every append.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ServerEnvelope {
    History { messages: Vec<String> },
}

impl ServerEnvelope {
    pub fn history(messages: Vec<String>) -> Self {
        Self::History { messages }
    }
}

/// Client -> server payload: `{"message": "..."}`. Unknown extra fields are
/// tolerated; a missing field decodes as `None`.
#[derive(Debug, Deserialize)]
pub struct ClientEnvelope {
    #[serde(default)]
    pub message: Option<String>,
}

/// Outcome of decoding one well-formed inbound frame.
#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    /// Envelope carried a non-empty message text.
    Chat(String),
    /// Envelope was valid JSON but the message field is absent or empty;
    /// silently dropped, never broadcast.
    Ignored,
}

/// Structured decode of an inbound frame. Invalid JSON (or a JSON value that
/// is not an object) is an error for the caller to report; it never panics
/// and never coerces unexpected shapes.
pub fn decode_inbound(raw: &str) -> Result<Inbound, serde_json::Error> {
    let envelope: ClientEnvelope = serde_json::from_str(raw)?;
    match envelope.message {
        Some(text) if !text.is_empty() => Ok(Inbound::Chat(text)),
        _ => Ok(Inbound::Ignored),
    }
}
