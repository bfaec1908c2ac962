//! Push-channel event model.
//!
//! Every message on the event stream is a JSON envelope
//! `{ kind, sessionId, data }`. The envelope is decoded in two steps: the
//! `kind` discriminant first, then `data` against the payload type that kind
//! selects. Kinds this client does not know are skipped rather than rejected
//! so the server can add new event types without breaking older clients.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    GenerateSucceeded,
    GenerateFailed,
    CompileSucceeded,
    CompileFailed,
}

impl EventKind {
    pub fn from_wire(kind: &str) -> Option<Self> {
        match kind {
            "generate_succeeded" => Some(Self::GenerateSucceeded),
            "generate_failed" => Some(Self::GenerateFailed),
            "compile_succeeded" => Some(Self::CompileSucceeded),
            "compile_failed" => Some(Self::CompileFailed),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::GenerateSucceeded => "generate_succeeded",
            Self::GenerateFailed => "generate_failed",
            Self::CompileSucceeded => "compile_succeeded",
            Self::CompileFailed => "compile_failed",
        }
    }

    /// Events that resolve the script stage.
    pub fn is_generation(&self) -> bool {
        matches!(self, Self::GenerateSucceeded | Self::GenerateFailed)
    }

    /// Events that resolve the video stage.
    pub fn is_compilation(&self) -> bool {
        matches!(self, Self::CompileSucceeded | Self::CompileFailed)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerateSuccess {
    pub script: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerateFailure {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    #[serde(default)]
    pub model: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompileSuccess {
    pub video_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompileFailure {
    pub message: String,
    #[serde(default)]
    pub stdout: String,
    #[serde(default)]
    pub stderr: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum EventPayload {
    GenerateSucceeded(GenerateSuccess),
    GenerateFailed(GenerateFailure),
    CompileSucceeded(CompileSuccess),
    CompileFailed(CompileFailure),
}

impl EventPayload {
    pub fn kind(&self) -> EventKind {
        match self {
            Self::GenerateSucceeded(_) => EventKind::GenerateSucceeded,
            Self::GenerateFailed(_) => EventKind::GenerateFailed,
            Self::CompileSucceeded(_) => EventKind::CompileSucceeded,
            Self::CompileFailed(_) => EventKind::CompileFailed,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServerEvent {
    #[serde(rename = "sessionId")]
    pub session_id: String,
    #[serde(flatten)]
    pub payload: EventPayload,
}

impl ServerEvent {
    pub fn new(session_id: impl Into<String>, payload: EventPayload) -> Self {
        Self {
            session_id: session_id.into(),
            payload,
        }
    }

    pub fn kind(&self) -> EventKind {
        self.payload.kind()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum EventDecodeError {
    #[error("malformed event envelope: {0}")]
    Envelope(#[source] serde_json::Error),
    #[error("invalid payload for {kind}: {source}")]
    Payload {
        kind: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Deserialize)]
struct RawEvent {
    kind: String,
    #[serde(rename = "sessionId", alias = "session_id", default)]
    session_id: String,
    #[serde(default)]
    data: serde_json::Value,
}

/// Decode one push-channel message.
///
/// Returns `Ok(None)` for kinds this client does not recognise.
pub fn decode_event(text: &str) -> Result<Option<ServerEvent>, EventDecodeError> {
    let raw: RawEvent = serde_json::from_str(text).map_err(EventDecodeError::Envelope)?;
    let Some(kind) = EventKind::from_wire(&raw.kind) else {
        return Ok(None);
    };

    let payload_err = |source| EventDecodeError::Payload {
        kind: kind.as_str(),
        source,
    };

    let payload = match kind {
        EventKind::GenerateSucceeded => {
            EventPayload::GenerateSucceeded(serde_json::from_value(raw.data).map_err(payload_err)?)
        }
        EventKind::GenerateFailed => {
            EventPayload::GenerateFailed(serde_json::from_value(raw.data).map_err(payload_err)?)
        }
        EventKind::CompileSucceeded => {
            EventPayload::CompileSucceeded(serde_json::from_value(raw.data).map_err(payload_err)?)
        }
        EventKind::CompileFailed => {
            let mut failure: CompileFailure =
                serde_json::from_value(raw.data).map_err(payload_err)?;
            // The server omits the line (or sends 0) when it could not locate one.
            failure.line = failure.line.filter(|l| *l > 0);
            EventPayload::CompileFailed(failure)
        }
    };

    Ok(Some(ServerEvent {
        session_id: raw.session_id,
        payload,
    }))
}

pub fn encode_event(event: &ServerEvent) -> Result<String, serde_json::Error> {
    serde_json::to_string(event)
}
