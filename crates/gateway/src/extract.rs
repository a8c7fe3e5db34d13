//! Response extraction.
//!
//! Models are asked to answer with a JSON object, but streamed output often
//! carries prose around it or arrives truncated. Extraction takes the widest
//! `{ ... }` span and falls back to the raw text when that does not parse.

use serde::Deserialize;
use streamgate_core::ExtractedAnswer;

/// Follow-ups offered when the model's answer carried none we could read.
pub const DEFAULT_FOLLOW_UPS: [&str; 2] = [
    "Can you tell me more about your products?",
    "How can I get in touch with your team?",
];

const GREETING_REPLY: &str = "Hello! Welcome. How can I help you today?";

const GREETING_FOLLOW_UPS: [&str; 2] = [
    "What products do you offer?",
    "What are your prices?",
];

/// The structured object embedded in model output.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ExtractedPayload {
    pub answer: String,
    #[serde(default)]
    pub questions: Vec<String>,
    #[serde(default)]
    pub summary: Option<String>,
}

/// Parse the span from the first `{` to the last `}`. Never panics.
pub fn extract(text: &str) -> Option<ExtractedPayload> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end < start {
        return None;
    }
    serde_json::from_str(&text[start..=end]).ok()
}

/// Build the turn's answer from accumulated stream text.
///
/// `previous_summary` is the conversation hint that went upstream with the
/// question; it stands in when the payload carries no summary of its own.
pub fn build_answer(text: &str, previous_summary: &str) -> ExtractedAnswer {
    match extract(text) {
        Some(payload) => ExtractedAnswer {
            answer: payload.answer,
            questions: payload.questions,
            summary: payload
                .summary
                .filter(|s| !s.trim().is_empty())
                .unwrap_or_else(|| previous_summary.to_string()),
        },
        None => ExtractedAnswer {
            answer: text.trim().to_string(),
            questions: DEFAULT_FOLLOW_UPS.iter().map(|q| q.to_string()).collect(),
            summary: previous_summary.to_string(),
        },
    }
}

/// Canned reply for greetings answered without an upstream call.
pub fn greeting_answer() -> ExtractedAnswer {
    ExtractedAnswer {
        answer: GREETING_REPLY.to_string(),
        questions: GREETING_FOLLOW_UPS.iter().map(|q| q.to_string()).collect(),
        summary: String::new(),
    }
}
