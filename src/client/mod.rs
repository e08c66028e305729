//! The stream consumer: issues a relay request and reduces the framed event
//! stream back into a single assistant message.
//!
//! Incoming bytes are accumulated in a trailing-line buffer so a frame split
//! across chunk reads is decoded once complete instead of being dropped.
//! Mid-stream error frames never discard text that already arrived; they are
//! reported alongside the accumulated content.

use futures_util::StreamExt;
use memchr::memchr;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::api::frame::{decode_payload, extract_data_payload, StreamFrame};
use crate::api::{ChatRequest, ChatSettings};
use crate::core::message::Message;
use crate::utils::url::construct_api_url;

#[derive(Clone, Debug)]
pub enum StreamMessage {
    /// One decoded text fragment.
    Chunk(String),
    /// In-band error frame; terminal on the producer side, but any text
    /// received before it remains valid.
    Error(String),
    /// The request itself failed before any stream began.
    Failed(String),
    /// Terminal frame observed, or the transport ended.
    End,
}

pub struct StreamParams {
    pub client: reqwest::Client,
    pub base_url: String,
    pub messages: Vec<Message>,
    pub settings: ChatSettings,
    pub cancel_token: CancellationToken,
}

#[derive(Clone)]
pub struct ChatStreamService {
    tx: mpsc::UnboundedSender<StreamMessage>,
}

impl ChatStreamService {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<StreamMessage>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    pub fn spawn_stream(&self, params: StreamParams) {
        let tx = self.tx.clone();
        let cancel_token = params.cancel_token.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = run_stream(params, tx) => {}
                _ = cancel_token.cancelled() => {}
            }
        });
    }
}

async fn run_stream(params: StreamParams, tx: mpsc::UnboundedSender<StreamMessage>) {
    let StreamParams {
        client,
        base_url,
        messages,
        settings,
        cancel_token,
    } = params;

    let request = ChatRequest {
        messages: messages.iter().map(Message::to_wire).collect(),
        settings,
    };
    let url = construct_api_url(&base_url, "api/chat");

    let response = match client.post(url).json(&request).send().await {
        Ok(response) => response,
        Err(e) => {
            let _ = tx.send(StreamMessage::Failed(e.to_string()));
            return;
        }
    };

    if !response.status().is_success() {
        let _ = tx.send(StreamMessage::Failed(format!(
            "request failed with status {}",
            response.status()
        )));
        return;
    }

    let mut decoder = FrameDecoder::new();
    let mut stream = response.bytes_stream();

    while let Some(chunk) = stream.next().await {
        if cancel_token.is_cancelled() {
            return;
        }
        match chunk {
            Ok(bytes) => {
                for message in decoder.push_chunk(&bytes) {
                    let is_end = matches!(message, StreamMessage::End);
                    let _ = tx.send(message);
                    if is_end {
                        return;
                    }
                }
            }
            Err(e) => {
                tracing::debug!("relay transport interrupted: {e}");
                break;
            }
        }
    }

    // Transport ended without a terminal frame; whatever accumulated so far
    // is a partial, non-committed result.
    if let Some(end) = decoder.finish() {
        tracing::debug!("stream ended without terminal frame");
        let _ = tx.send(end);
    }
}

/// Incremental frame decoder carrying a trailing partial line across reads.
pub(crate) struct FrameDecoder {
    buffer: Vec<u8>,
    finished: bool,
}

impl FrameDecoder {
    pub(crate) fn new() -> Self {
        FrameDecoder {
            buffer: Vec::new(),
            finished: false,
        }
    }

    /// Feed one transport chunk, returning the messages decodable from the
    /// complete lines it finishes. Malformed payload lines are skipped.
    pub(crate) fn push_chunk(&mut self, bytes: &[u8]) -> Vec<StreamMessage> {
        let mut out = Vec::new();
        if self.finished {
            return out;
        }
        self.buffer.extend_from_slice(bytes);

        while let Some(newline_pos) = memchr(b'\n', &self.buffer) {
            let line = match std::str::from_utf8(&self.buffer[..newline_pos]) {
                Ok(s) => s.trim().to_string(),
                Err(e) => {
                    tracing::debug!("invalid UTF-8 in stream: {e}");
                    self.buffer.drain(..=newline_pos);
                    continue;
                }
            };
            self.buffer.drain(..=newline_pos);

            let Some(frame) = extract_data_payload(&line).and_then(decode_payload) else {
                continue;
            };
            match frame {
                StreamFrame::Text(text) => out.push(StreamMessage::Chunk(text)),
                StreamFrame::Error(message) => out.push(StreamMessage::Error(message)),
                StreamFrame::Done => {
                    self.finished = true;
                    out.push(StreamMessage::End);
                    return out;
                }
            }
        }
        out
    }

    /// Signal end-of-transport. Returns a final `End` unless the terminal
    /// frame was already observed.
    pub(crate) fn finish(&mut self) -> Option<StreamMessage> {
        if self.finished {
            None
        } else {
            self.finished = true;
            Some(StreamMessage::End)
        }
    }
}

/// The assembled result of one relay turn.
///
/// `content` always holds everything that arrived, even when `error` is set
/// or the stream ended without a terminal frame; partial output is preserved
/// rather than discarded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StreamOutcome {
    pub content: String,
    pub error: Option<String>,
}

/// Send one conversation turn through the relay and fold the event stream
/// into a [`StreamOutcome`].
///
/// Returns `Err` only when the request fails before any stream begins. Once
/// streaming has started the call always completes, folding a mid-stream
/// error frame into `StreamOutcome::error`.
pub async fn send_chat(
    params: StreamParams,
) -> Result<StreamOutcome, Box<dyn std::error::Error + Send + Sync>> {
    let (service, mut rx) = ChatStreamService::new();
    service.spawn_stream(params);

    let mut outcome = StreamOutcome::default();
    while let Some(message) = rx.recv().await {
        match message {
            StreamMessage::Chunk(text) => outcome.content.push_str(&text),
            StreamMessage::Error(message) => outcome.error = Some(message),
            StreamMessage::Failed(reason) => return Err(reason.into()),
            StreamMessage::End => break,
        }
    }
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::message::Role;
    use crate::provider::testing::FakeProvider;
    use crate::provider::ChatProvider;
    use crate::server::{router, AppState};
    use std::sync::Arc;

    async fn spawn_relay(provider: Option<Arc<dyn ChatProvider>>) -> String {
        let app = router(AppState { provider });
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }

    fn params_for(base_url: String) -> StreamParams {
        StreamParams {
            client: reqwest::Client::new(),
            base_url,
            messages: vec![Message::new(Role::User, "hi")],
            settings: ChatSettings::default(),
            cancel_token: CancellationToken::new(),
        }
    }

    #[tokio::test]
    async fn send_chat_assembles_the_full_message() {
        let provider = Arc::new(FakeProvider::with_fragments(&["Hel", "lo!"]));
        let base_url = spawn_relay(Some(provider)).await;

        let outcome = send_chat(params_for(base_url)).await.unwrap();

        assert_eq!(
            outcome,
            StreamOutcome {
                content: "Hello!".to_string(),
                error: None,
            }
        );
    }

    #[tokio::test]
    async fn send_chat_keeps_partial_text_alongside_a_stream_error() {
        let provider = Arc::new(FakeProvider::failing_after(&["par", "tial"], "upstream fault"));
        let base_url = spawn_relay(Some(provider)).await;

        let outcome = send_chat(params_for(base_url)).await.unwrap();

        assert_eq!(outcome.content, "partial");
        assert_eq!(outcome.error, Some("upstream fault".to_string()));
    }

    #[tokio::test]
    async fn send_chat_errs_when_the_request_is_rejected() {
        // No provider configured: the relay answers with a non-stream 500.
        let base_url = spawn_relay(None).await;

        let err = send_chat(params_for(base_url)).await.unwrap_err();

        assert!(
            err.to_string().contains("500"),
            "expected a request-level failure, got: {err}"
        );
    }

    #[tokio::test]
    async fn send_chat_handles_an_empty_completion() {
        let provider = Arc::new(FakeProvider::with_fragments(&[]));
        let base_url = spawn_relay(Some(provider)).await;

        let outcome = send_chat(params_for(base_url)).await.unwrap();

        assert_eq!(outcome.content, "");
        assert_eq!(outcome.error, None);
    }

    fn decode_all(chunks: &[&[u8]]) -> StreamOutcome {
        let mut decoder = FrameDecoder::new();
        let mut outcome = StreamOutcome::default();
        for chunk in chunks {
            for message in decoder.push_chunk(chunk) {
                match message {
                    StreamMessage::Chunk(text) => outcome.content.push_str(&text),
                    StreamMessage::Error(message) => outcome.error = Some(message),
                    StreamMessage::Failed(_) | StreamMessage::End => return outcome,
                }
            }
        }
        let _ = decoder.finish();
        outcome
    }

    fn producer_bytes(fragments: &[&str]) -> Vec<u8> {
        let mut bytes = Vec::new();
        for fragment in fragments {
            bytes.extend_from_slice(StreamFrame::Text(fragment.to_string()).encode().as_bytes());
        }
        bytes.extend_from_slice(StreamFrame::Done.encode().as_bytes());
        bytes
    }

    #[test]
    fn round_trip_holds_for_every_chunk_boundary() {
        let bytes = producer_bytes(&["Hel", "lo!"]);

        for split in 0..=bytes.len() {
            let (a, b) = bytes.split_at(split);
            let outcome = decode_all(&[a, b]);
            assert_eq!(outcome.content, "Hello!", "split at byte {split}");
            assert_eq!(outcome.error, None);
        }
    }

    #[test]
    fn round_trip_holds_for_single_byte_chunks() {
        let bytes = producer_bytes(&["a", "b", "c"]);
        let chunks: Vec<&[u8]> = bytes.chunks(1).collect();
        assert_eq!(decode_all(&chunks).content, "abc");
    }

    #[test]
    fn decoding_the_same_stream_twice_is_idempotent() {
        let bytes = producer_bytes(&["one ", "two"]);
        let first = decode_all(&[bytes.as_slice()]);
        let second = decode_all(&[bytes.as_slice()]);
        assert_eq!(first, second);
        assert_eq!(first.content, "one two");
    }

    #[test]
    fn zero_fragments_yield_an_empty_message() {
        let bytes = producer_bytes(&[]);
        let outcome = decode_all(&[bytes.as_slice()]);
        assert_eq!(outcome.content, "");
        assert_eq!(outcome.error, None);
    }

    #[test]
    fn error_frame_preserves_prior_text() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(StreamFrame::Text("partial".to_string()).encode().as_bytes());
        bytes.extend_from_slice(
            StreamFrame::Error("upstream fault".to_string())
                .encode()
                .as_bytes(),
        );

        let outcome = decode_all(&[bytes.as_slice()]);
        assert_eq!(outcome.content, "partial");
        assert_eq!(outcome.error, Some("upstream fault".to_string()));
    }

    #[test]
    fn malformed_lines_are_skipped() {
        let bytes = b"data: {\"text\":\"ok\"}\n\ndata: {broken\n\ndata: [DONE]\n\n";
        let outcome = decode_all(&[bytes.as_slice()]);
        assert_eq!(outcome.content, "ok");
        assert_eq!(outcome.error, None);
    }

    #[test]
    fn nothing_is_decoded_after_the_terminal_frame() {
        let mut decoder = FrameDecoder::new();
        let mut bytes = producer_bytes(&["a"]);
        bytes.extend_from_slice(StreamFrame::Text("late".to_string()).encode().as_bytes());

        let messages = decoder.push_chunk(&bytes);
        assert!(matches!(messages.last(), Some(StreamMessage::End)));
        assert_eq!(
            messages
                .iter()
                .filter(|m| matches!(m, StreamMessage::Chunk(_)))
                .count(),
            1
        );
        assert!(decoder.push_chunk(b"data: {\"text\":\"x\"}\n\n").is_empty());
        assert!(decoder.finish().is_none());
    }

    #[test]
    fn unterminated_stream_returns_the_partial_accumulation() {
        let mut decoder = FrameDecoder::new();
        let mut content = String::new();
        for message in decoder.push_chunk(b"data: {\"text\":\"cut \"}\n\ndata: {\"text\":\"off") {
            if let StreamMessage::Chunk(text) = message {
                content.push_str(&text);
            }
        }
        assert_eq!(content, "cut ");
        assert!(matches!(decoder.finish(), Some(StreamMessage::End)));
    }

    #[test]
    fn partial_line_is_buffered_not_discarded() {
        let mut decoder = FrameDecoder::new();
        assert!(decoder.push_chunk(b"data: {\"te").is_empty());
        let messages = decoder.push_chunk(b"xt\":\"whole\"}\n\n");
        assert!(
            matches!(&messages[..], [StreamMessage::Chunk(text)] if text == "whole"),
            "buffered line should decode once complete"
        );
    }
}
