//! Line-oriented frame codec for the relay's event stream.
//!
//! Both ends of the relay speak the same three frames, each encoded as a
//! single `data:` line terminated by a blank line:
//!
//! ```text
//! data: {"text": "<fragment>"}
//!
//! data: {"error": "<message>"}
//!
//! data: [DONE]
//! ```
//!
//! The producer emits frames with [`StreamFrame::encode`]; the consumer walks
//! complete lines through [`extract_data_payload`] and [`decode_payload`].
//! Keeping both directions in one module makes the round-trip property a
//! local invariant.

use serde::Deserialize;

/// Sentinel payload marking the end of a successfully completed stream.
pub const DONE_SENTINEL: &str = "[DONE]";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamFrame {
    Text(String),
    Error(String),
    Done,
}

#[derive(Deserialize)]
struct FramePayload {
    text: Option<String>,
    error: Option<String>,
}

impl StreamFrame {
    /// Encode the frame as one wire event, including the trailing blank line.
    pub fn encode(&self) -> String {
        match self {
            StreamFrame::Text(text) => {
                format!("data: {}\n\n", serde_json::json!({ "text": text }))
            }
            StreamFrame::Error(message) => {
                format!("data: {}\n\n", serde_json::json!({ "error": message }))
            }
            StreamFrame::Done => format!("data: {DONE_SENTINEL}\n\n"),
        }
    }
}

/// Strip the `data:` prefix from a line, tolerating both `data:x` and
/// `data: x` spacing.
pub fn extract_data_payload(line: &str) -> Option<&str> {
    line.strip_prefix("data:").map(str::trim_start)
}

/// Decode one `data:` payload into a frame.
///
/// Returns `None` for payloads that are neither the terminal sentinel nor a
/// well-formed frame object; callers skip those lines and keep reading.
pub fn decode_payload(payload: &str) -> Option<StreamFrame> {
    if payload == DONE_SENTINEL {
        return Some(StreamFrame::Done);
    }

    let parsed: FramePayload = serde_json::from_str(payload).ok()?;
    if let Some(message) = parsed.error {
        return Some(StreamFrame::Error(message));
    }
    parsed.text.map(StreamFrame::Text)
}
