//! HTTP request handlers.

use std::convert::Infallible;

use axum::{
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Response,
    },
    Json,
};
use futures::stream::{self, Stream};
use serde::Deserialize;

use super::{AppState, DEFAULT_HISTORY_LIMIT, MAX_HISTORY_LIMIT};
use crate::models::{AnalysisRequest, StreamEvent};

/// Health check endpoint.
pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

/// Run one analysis and stream its events as SSE `data:` frames.
///
/// The stream ends after the terminal `final` or `error` event. If the
/// client goes away first, the pipeline is cancelled.
pub async fn generate_content(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<AnalysisRequest>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let owner = state.identity.resolve(&headers);
    let rx = state.service.start(request, owner);

    let events = stream::unfold(rx, |mut rx| async move {
        let event = rx.recv().await?;
        Some((Ok(to_sse_event(&event)), rx))
    });

    Sse::new(events).keep_alive(KeepAlive::default())
}

fn to_sse_event(event: &StreamEvent) -> Event {
    Event::default().json_data(event).unwrap_or_else(|e| {
        tracing::warn!("Failed to encode stream event: {}", e);
        Event::default().comment("encoding error")
    })
}

/// Query parameters for history listing.
#[derive(Debug, Deserialize)]
pub struct HistoryParams {
    pub limit: Option<usize>,
}

/// List the caller's most recent analyses, newest first.
pub async fn history(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<HistoryParams>,
) -> Response {
    let Some(owner) = state.identity.resolve(&headers) else {
        return (
            StatusCode::UNAUTHORIZED,
            Json(serde_json::json!({ "error": "Sign in to view history." })),
        )
            .into_response();
    };

    let limit = params
        .limit
        .unwrap_or(DEFAULT_HISTORY_LIMIT)
        .clamp(1, MAX_HISTORY_LIMIT);

    match state.service.history().recent(&owner, limit).await {
        Ok(entries) => Json(entries).into_response(),
        Err(e) => {
            tracing::warn!("Failed to read history: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({ "error": "History is unavailable." })),
            )
                .into_response()
        }
    }
}
