//! POST /api/annotate - streamed lyric annotation
//!
//! Errors before the stream starts are HTTP errors (400 malformed body, 500 setup failure).
//! After that the response is always 200 and problems surface as events.

use axum::{
    body::Body,
    extract::{rejection::JsonRejection, State},
    http::{header, StatusCode},
    response::Response,
    routing::post,
    Json, Router,
};
use futures::StreamExt;
use lyra_common::api::{AnnotateRequest, ANNOTATE_PATH};
use lyra_common::events::ndjson::{encode_line, CONTENT_TYPE};
use lyra_common::StreamEvent;
use std::convert::Infallible;

use crate::error::{ApiError, ApiResult};
use crate::AppState;

/// POST /api/annotate
pub async fn annotate(
    State(state): State<AppState>,
    payload: Result<Json<AnnotateRequest>, JsonRejection>,
) -> ApiResult<Response> {
    let Json(request) = payload.map_err(|rejection| ApiError::BadRequest(rejection.body_text()))?;

    tracing::info!(
        title = ?request.title,
        artist = ?request.artist,
        lines = request.hanzi_lines.as_ref().map_or(0, Vec::len),
        tone = ?request.tone_mode(),
        "Annotation request"
    );

    let events = state
        .pipeline
        .clone()
        .run(request)
        .map(|event| Ok::<_, Infallible>(encode_event(&event)));

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, CONTENT_TYPE)
        .header(header::CACHE_CONTROL, "no-cache")
        .header(header::CONNECTION, "keep-alive")
        .body(Body::from_stream(events))
        .map_err(|e| ApiError::Internal(format!("Failed to build stream response: {e}")))
}

/// Encode an event, substituting an `error` event if it cannot be serialized
fn encode_event(event: &StreamEvent) -> String {
    match encode_line(event) {
        Ok(line) => line,
        Err(e) => {
            tracing::error!(event = event.event_type(), error = %e, "Failed to encode stream event");
            // A plain string message always serializes
            encode_line(&StreamEvent::error(format!("Failed to encode {} event", event.event_type())))
                .unwrap_or_else(|_| "{\"type\":\"error\",\"message\":\"encoding failed\"}\n".to_string())
        }
    }
}

/// Build annotation routes
pub fn annotate_routes() -> Router<AppState> {
    Router::new().route(ANNOTATE_PATH, post(annotate))
}
