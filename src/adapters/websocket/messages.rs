//! WebSocket message types for the support chat protocol.
//!
//! Defines the protocol between server and connected clients:
//! - Server → Client: connection status, answers, relayed text and
//!   signaling frames, pongs, errors
//! - Client → Server: `{type, data, session_id, timestamp}` envelopes

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::foundation::{ConnectionId, SessionId, Timestamp};
use crate::domain::knowledge::{QueryAnswer, SourceSnippet};

// ============================================
// Server → Client Messages
// ============================================

/// All message types that can be sent from server to client.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ServerMessage {
    /// Connection established and registered with the hub.
    Connected(ConnectedMessage),

    /// Answer produced by the query pipeline.
    Answer(AnswerMessage),

    /// Plain text pushed to the session (e.g. by an operator).
    TextMessage(TextMessage),

    /// Relayed signaling frames.
    WebrtcOffer(SignalMessage),
    WebrtcAnswer(SignalMessage),
    WebrtcCandidate(SignalMessage),

    /// Heartbeat response.
    Pong(PongMessage),

    /// Error occurred.
    Error(ErrorMessage),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConnectedMessage {
    pub session_id: String,
    pub connection_id: String,
    pub timestamp: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnswerMessage {
    pub content: String,
    pub strategy: String,
    pub source: String,
    pub confidence: f64,
    pub duration_ms: u64,
    pub sources: Vec<SourceSnippet>,
    pub timestamp: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TextMessage {
    pub content: String,
    pub session_id: String,
    pub timestamp: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SignalMessage {
    pub data: Value,
    pub session_id: String,
    pub from: String,
    pub timestamp: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PongMessage {
    pub timestamp: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorMessage {
    pub code: String,
    pub message: String,
    pub timestamp: String,
}

fn now() -> String {
    Timestamp::now().to_rfc3339()
}

impl ServerMessage {
    pub fn connected(session_id: &SessionId, connection_id: ConnectionId) -> Self {
        Self::Connected(ConnectedMessage {
            session_id: session_id.to_string(),
            connection_id: connection_id.to_string(),
            timestamp: now(),
        })
    }

    pub fn answer(answer: &QueryAnswer) -> Self {
        let sources = if answer.strategy.exposes_sources() {
            answer.sources.clone()
        } else {
            Vec::new()
        };
        Self::Answer(AnswerMessage {
            content: answer.content.clone(),
            strategy: answer.strategy.as_str().to_string(),
            source: answer.source.as_str().to_string(),
            confidence: answer.confidence,
            duration_ms: u64::try_from(answer.duration.as_millis()).unwrap_or(u64::MAX),
            sources,
            timestamp: now(),
        })
    }

    pub fn text(session_id: &SessionId, content: impl Into<String>) -> Self {
        Self::TextMessage(TextMessage {
            content: content.into(),
            session_id: session_id.to_string(),
            timestamp: now(),
        })
    }

    pub fn signal(
        kind: SignalKind,
        session_id: &SessionId,
        from: ConnectionId,
        data: Value,
    ) -> Self {
        let msg = SignalMessage {
            data,
            session_id: session_id.to_string(),
            from: from.to_string(),
            timestamp: now(),
        };
        match kind {
            SignalKind::Offer => Self::WebrtcOffer(msg),
            SignalKind::Answer => Self::WebrtcAnswer(msg),
            SignalKind::Candidate => Self::WebrtcCandidate(msg),
        }
    }

    pub fn pong() -> Self {
        Self::Pong(PongMessage { timestamp: now() })
    }

    pub fn error(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Error(ErrorMessage {
            code: code.into(),
            message: message.into(),
            timestamp: now(),
        })
    }
}

// ============================================
// Client → Server Messages
// ============================================

/// Raw envelope as sent by clients.
#[derive(Debug, Clone, Deserialize)]
pub struct ClientEnvelope {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub data: Value,
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub timestamp: Option<Value>,
}

/// Which signaling frame is being relayed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalKind {
    Offer,
    Answer,
    Candidate,
}

/// Classified inbound frame.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientMessage {
    TextMessage { content: String },
    Signal { kind: SignalKind, data: Value },
    Ping,
    /// Recognized envelope with a type we do not handle.
    Unknown { kind: String },
}

/// Reasons an inbound frame could not be understood.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FrameError {
    #[error("malformed message: {0}")]
    Malformed(String),

    #[error("text-message requires non-empty content")]
    EmptyContent,
}

impl FrameError {
    pub fn code(&self) -> &'static str {
        match self {
            FrameError::Malformed(_) => "malformed_message",
            FrameError::EmptyContent => "empty_content",
        }
    }
}

/// Parses and classifies one text frame.
pub fn parse_client_message(text: &str) -> Result<ClientMessage, FrameError> {
    let envelope: ClientEnvelope =
        serde_json::from_str(text).map_err(|e| FrameError::Malformed(e.to_string()))?;

    let message = match envelope.kind.as_str() {
        "text-message" => {
            let content = match &envelope.data {
                Value::String(s) => s.clone(),
                Value::Object(map) => map
                    .get("content")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string(),
                _ => String::new(),
            };
            if content.trim().is_empty() {
                return Err(FrameError::EmptyContent);
            }
            ClientMessage::TextMessage { content }
        }
        "webrtc-offer" => ClientMessage::Signal {
            kind: SignalKind::Offer,
            data: envelope.data,
        },
        "webrtc-answer" => ClientMessage::Signal {
            kind: SignalKind::Answer,
            data: envelope.data,
        },
        "webrtc-candidate" => ClientMessage::Signal {
            kind: SignalKind::Candidate,
            data: envelope.data,
        },
        "ping" => ClientMessage::Ping,
        other => ClientMessage::Unknown {
            kind: other.to_string(),
        },
    };
    Ok(message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::knowledge::{AnswerSource, Strategy};
    use std::time::Duration;

    #[test]
    fn parses_text_message_with_object_data() {
        let msg = parse_client_message(
            r#"{"type":"text-message","data":{"content":"hello"},"session_id":"s1","timestamp":1}"#,
        )
        .unwrap();
        assert_eq!(
            msg,
            ClientMessage::TextMessage {
                content: "hello".into()
            }
        );
    }

    #[test]
    fn parses_text_message_with_string_data() {
        let msg = parse_client_message(r#"{"type":"text-message","data":"hi"}"#).unwrap();
        assert_eq!(msg, ClientMessage::TextMessage { content: "hi".into() });
    }

    #[test]
    fn empty_text_is_rejected() {
        assert_eq!(
            parse_client_message(r#"{"type":"text-message","data":{"content":"  "}}"#),
            Err(FrameError::EmptyContent)
        );
    }

    #[test]
    fn signaling_frames_keep_payload() {
        let msg =
            parse_client_message(r#"{"type":"webrtc-candidate","data":{"candidate":"c1"}}"#)
                .unwrap();
        match msg {
            ClientMessage::Signal { kind, data } => {
                assert_eq!(kind, SignalKind::Candidate);
                assert_eq!(data["candidate"], "c1");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn unknown_type_is_classified_not_rejected() {
        assert_eq!(
            parse_client_message(r#"{"type":"typing"}"#).unwrap(),
            ClientMessage::Unknown {
                kind: "typing".into()
            }
        );
    }

    #[test]
    fn malformed_json_is_an_error() {
        let err = parse_client_message("{not json").unwrap_err();
        assert_eq!(err.code(), "malformed_message");
        assert!(parse_client_message(r#"{"data":1}"#).is_err());
    }

    #[test]
    fn server_messages_use_kebab_case_tags() {
        let session = SessionId::new("s1").unwrap();
        let json = serde_json::to_value(ServerMessage::signal(
            SignalKind::Offer,
            &session,
            ConnectionId::new(),
            serde_json::json!({"sdp": "x"}),
        ))
        .unwrap();
        assert_eq!(json["type"], "webrtc-offer");
        assert_eq!(json["data"]["sdp"], "x");

        let json = serde_json::to_value(ServerMessage::text(&session, "hi")).unwrap();
        assert_eq!(json["type"], "text-message");
        assert_eq!(serde_json::to_value(ServerMessage::pong()).unwrap()["type"], "pong");
    }

    #[test]
    fn answer_frame_hides_sources_for_fallback() {
        let answer = QueryAnswer {
            content: "c".into(),
            source: AnswerSource::LocalFallback,
            strategy: Strategy::Fallback,
            confidence: 0.65,
            duration: Duration::from_millis(12),
            sources: vec![SourceSnippet {
                document_id: "d".into(),
                title: "t".into(),
                content: "c".into(),
                score: 0.5,
            }],
        };
        let json = serde_json::to_value(ServerMessage::answer(&answer)).unwrap();
        assert_eq!(json["type"], "answer");
        assert_eq!(json["strategy"], "fallback");
        assert_eq!(json["source"], "local-fallback");
        assert_eq!(json["duration_ms"], 12);
        assert_eq!(json["sources"].as_array().unwrap().len(), 0);
    }
}
