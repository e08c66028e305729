//! The stream producer: accepts a conversation plus generation settings,
//! replays the history into an upstream session, and republishes the
//! provider's token stream as server-sent events.

use std::convert::Infallible;
use std::sync::Arc;

use axum::body::Body;
use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use futures_util::{Stream, StreamExt};
use serde_json::json;

use crate::api::frame::StreamFrame;
use crate::api::{ChatRequest, ChatSettings};
use crate::provider::{ChatProvider, SeedMessage};
use crate::server::AppState;

pub async fn chat(State(state): State<AppState>, Json(request): Json<ChatRequest>) -> Response {
    let Some(provider) = state.provider else {
        tracing::error!("chat request rejected: no API key configured");
        return error_response(StatusCode::INTERNAL_SERVER_ERROR, "API key not configured");
    };

    let ChatRequest {
        mut messages,
        settings,
    } = request;
    let turn = match messages.pop() {
        Some(message) => message.content,
        None => return error_response(StatusCode::BAD_REQUEST, "messages must not be empty"),
    };
    let seed: Vec<SeedMessage> = messages.iter().map(SeedMessage::from_wire).collect();

    tracing::debug!(
        model = %settings.model,
        seed_len = seed.len(),
        "starting relay stream"
    );

    // The stream/no-stream fork ends here; from the first body byte on,
    // failures travel in-band as error frames.
    let frames = frame_stream(provider, seed, turn, settings);
    let body = Body::from_stream(frames.map(|frame| Ok::<_, Infallible>(frame.encode())));

    match Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "text/event-stream")
        .header(header::CACHE_CONTROL, "no-cache, no-transform")
        .header(header::CONNECTION, "keep-alive")
        .body(body)
    {
        Ok(response) => response,
        Err(e) => error_response(StatusCode::INTERNAL_SERVER_ERROR, &e.to_string()),
    }
}

fn error_response(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "error": message }))).into_response()
}

/// Drive one upstream session and emit the framed event sequence.
///
/// Fragments are forwarded in arrival order with no buffering. Exactly one
/// terminal frame is produced: `Done` after the fragment stream is
/// exhausted, or a single `Error` if anything fails once streaming has
/// begun. No frame follows either terminal. Dropping the stream (peer
/// disconnect) stops upstream pulls and releases the session.
pub(crate) fn frame_stream(
    provider: Arc<dyn ChatProvider>,
    seed: Vec<SeedMessage>,
    turn: String,
    settings: ChatSettings,
) -> impl Stream<Item = StreamFrame> {
    async_stream::stream! {
        let session = match provider.start_session(seed, &settings) {
            Ok(session) => session,
            Err(e) => {
                tracing::warn!("failed to open upstream session: {e}");
                yield StreamFrame::Error(e.to_string());
                return;
            }
        };

        let mut fragments = match session.send_streaming(&turn).await {
            Ok(fragments) => fragments,
            Err(e) => {
                tracing::warn!("upstream rejected the turn: {e}");
                yield StreamFrame::Error(e.to_string());
                return;
            }
        };

        while let Some(fragment) = fragments.next().await {
            match fragment {
                Ok(text) => {
                    if !text.is_empty() {
                        yield StreamFrame::Text(text);
                    }
                }
                Err(e) => {
                    tracing::warn!("upstream stream failed: {e}");
                    yield StreamFrame::Error(e.to_string());
                    return;
                }
            }
        }

        yield StreamFrame::Done;
    }
}
