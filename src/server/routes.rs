//! HTTP routes.
//!
//! - `POST /api/ai`, `POST /api/chat`: `{"message": "..."}` → [`ChatReply`]
//! - `GET /api/next-events?leagueId=<id>`: `{"events": [...]}`
//! - `GET /health`: `{"status": "ok", "version": "..."}`

use std::any::Any;
use std::sync::Arc;

use axum::{
    Json, Router,
    body::Bytes,
    extract::{DefaultBodyLimit, Query, State, rejection::BytesRejection},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use tower_http::{catch_panic::CatchPanicLayer, trace::TraceLayer};

use super::config::Environment;
use super::error::ApiError;
use super::identity::client_id;
use crate::gateway::RequestOrchestrator;
use crate::providers::ScheduleEvent;
use crate::types::ChatReply;

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    orchestrator: Arc<RequestOrchestrator>,
    environment: Environment,
}

impl AppState {
    pub fn new(orchestrator: Arc<RequestOrchestrator>, environment: Environment) -> Self {
        Self {
            orchestrator,
            environment,
        }
    }

    pub fn orchestrator(&self) -> &Arc<RequestOrchestrator> {
        &self.orchestrator
    }

    fn expose_details(&self) -> bool {
        self.environment.is_development()
    }
}

/// Slack for JSON framing and escapes on top of the message itself.
const BODY_OVERHEAD_BYTES: usize = 1024;

/// Largest chat body accepted: every allowed character at four UTF-8 bytes.
fn chat_body_limit(max_message_chars: usize) -> usize {
    max_message_chars
        .saturating_mul(4)
        .saturating_add(BODY_OVERHEAD_BYTES)
}

/// Build the application router.
pub fn router(state: AppState) -> Router {
    let expose_details = state.expose_details();
    let body_limit = chat_body_limit(state.orchestrator.max_message_chars());
    Router::new()
        .route(
            "/api/ai",
            post(chat).layer(DefaultBodyLimit::max(body_limit)),
        )
        .route(
            "/api/chat",
            post(chat).layer(DefaultBodyLimit::max(body_limit)),
        )
        .route("/api/next-events", get(next_events))
        .route("/health", get(health))
        .layer(CatchPanicLayer::custom(move |panic: Box<dyn Any + Send + 'static>| {
            panic_response(panic, expose_details)
        }))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn chat(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> Result<Json<ChatReply>, ApiError> {
    let client = client_id(&headers);
    let result = match body {
        Ok(body) => state.orchestrator.handle(&client, &body).await,
        Err(rejection) => {
            let reason = if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
                "request body too large".to_owned()
            } else {
                rejection.body_text()
            };
            state.orchestrator.handle_unreadable(&client, &reason).await
        }
    };
    result
        .map(Json)
        .map_err(|e| ApiError::chat(e, state.expose_details()))
}

#[derive(Debug, Deserialize)]
struct NextEventsQuery {
    #[serde(rename = "leagueId")]
    league_id: Option<String>,
}

#[derive(Debug, Serialize)]
struct EventsResponse {
    events: Vec<ScheduleEvent>,
}

async fn next_events(
    State(state): State<AppState>,
    Query(query): Query<NextEventsQuery>,
) -> Result<Json<EventsResponse>, ApiError> {
    state
        .orchestrator
        .next_events(query.league_id.as_deref())
        .await
        .map(|events| Json(EventsResponse { events }))
        .map_err(|e| ApiError::events(e, state.expose_details()))
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    version: String,
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: crate::version::version_string(),
    })
}

fn panic_response(panic: Box<dyn Any + Send + 'static>, expose_details: bool) -> Response {
    let detail = if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_owned()
    } else {
        "handler panicked".to_owned()
    };
    ApiError::unexpected(detail, expose_details).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn body_limit_covers_widest_utf8_message() {
        assert_eq!(chat_body_limit(2000), 9024);
        assert_eq!(chat_body_limit(usize::MAX), usize::MAX);
    }
}
