//! Client-visible streaming events.
//!
//! A relay produces exactly one `Start`, zero or more `Stream`, and then
//! exactly one terminal event (`End` or `Error`). Serialization matches the
//! wire protocol: `{"type":"start","question":..}`, `{"type":"stream","content":..}`,
//! `{"type":"end"}`, `{"type":"error","error":..}`.

use serde::{Deserialize, Serialize};

/// Events emitted by the streaming relay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    /// The relay accepted the question and is about to answer.
    Start { question: String },

    /// A token fragment, or a whole structured answer for short-circuited turns.
    Stream { content: StreamContent },

    /// The answer is complete.
    End,

    /// The answer failed after `Start` was sent.
    Error {
        #[serde(rename = "error")]
        message: String,
    },
}

impl StreamEvent {
    pub fn token(token: impl Into<String>) -> Self {
        Self::Stream {
            content: StreamContent::Token(token.into()),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }

    /// `End` and `Error` close the sequence.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::End | Self::Error { .. })
    }

    /// Short name used in log fields.
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::Start { .. } => "start",
            Self::Stream { .. } => "stream",
            Self::End => "end",
            Self::Error { .. } => "error",
        }
    }
}

/// Payload of a `stream` event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StreamContent {
    /// A raw token fragment, forwarded verbatim from upstream.
    Token(String),
    /// A complete structured answer (greeting short-circuit).
    Answer(ExtractedAnswer),
}

/// The structured result of one turn.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ExtractedAnswer {
    pub answer: String,
    #[serde(default)]
    pub questions: Vec<String>,
    #[serde(default)]
    pub summary: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn start_wire_shape() {
        let json = serde_json::to_string(&StreamEvent::Start {
            question: "What is the price?".into(),
        })
        .unwrap();
        assert_eq!(json, r#"{"type":"start","question":"What is the price?"}"#);
    }

    #[test]
    fn token_wire_shape() {
        let json = serde_json::to_string(&StreamEvent::token("Hel")).unwrap();
        assert_eq!(json, r#"{"type":"stream","content":"Hel"}"#);
    }

    #[test]
    fn end_wire_shape() {
        let json = serde_json::to_string(&StreamEvent::End).unwrap();
        assert_eq!(json, r#"{"type":"end"}"#);
    }

    #[test]
    fn error_wire_shape() {
        let json = serde_json::to_string(&StreamEvent::error("boom")).unwrap();
        assert_eq!(json, r#"{"type":"error","error":"boom"}"#);
    }

    #[test]
    fn structured_stream_content() {
        let event = StreamEvent::Stream {
            content: StreamContent::Answer(ExtractedAnswer {
                answer: "Welcome!".into(),
                questions: vec!["q1".into(), "q2".into()],
                summary: String::new(),
            }),
        };
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["type"], "stream");
        assert_eq!(value["content"]["answer"], "Welcome!");
        assert_eq!(value["content"]["questions"][1], "q2");
    }

    #[test]
    fn terminal_events() {
        assert!(StreamEvent::End.is_terminal());
        assert!(StreamEvent::error("x").is_terminal());
        assert!(!StreamEvent::token("x").is_terminal());
        assert!(
            !StreamEvent::Start {
                question: "q".into()
            }
            .is_terminal()
        );
    }

    #[test]
    fn event_deserialization() {
        let event: StreamEvent = serde_json::from_str(r#"{"type":"stream","content":"hi"}"#).unwrap();
        assert_eq!(event, StreamEvent::token("hi"));
        let event: StreamEvent = serde_json::from_str(r#"{"type":"error","error":"bad"}"#).unwrap();
        assert_eq!(event.event_type(), "error");
    }
}
