//! HTTP transport with Server-Sent Events delivery.
//!
//! The HTTP surface splits request submission from response delivery:
//!
//! - `POST /session` creates a session and returns its id (201).
//! - `GET /stream?session_id=..` attaches an SSE stream that carries a
//!   `connected` event, periodic `ping` heartbeats, `message` events with
//!   JSON-RPC response envelopes, and a final `close` event.
//! - `POST /request` submits a JSON-RPC payload against a session. The
//!   HTTP response is only an acknowledgement; the JSON-RPC response
//!   arrives on the stream once dispatch completes.
//!
//! Dispatch runs in a spawned task under a server-side time budget, so a
//! slow resource read never blocks the acknowledgement or other requests
//! on the same session.

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::sse::Event;
use axum::response::{IntoResponse, Response, Sse};
use axum::routing::{get, post};
use axum::{Json, Router};
use futures::Stream;
use serde::Deserialize;
use serde_json::{json, Value};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use super::dispatcher::Dispatcher;
use super::protocol::{parse_message, IncomingMessage, JsonRpcError};
use super::session::{SessionEvent, SessionRegistry};

/// Shared state behind every HTTP handler.
pub struct HttpState {
    sessions: Arc<SessionRegistry>,
    dispatcher: Dispatcher,
    heartbeat: Duration,
    request_timeout: Duration,
}

impl HttpState {
    /// Creates the handler state.
    #[must_use]
    pub fn new(
        sessions: Arc<SessionRegistry>,
        dispatcher: Dispatcher,
        heartbeat: Duration,
        request_timeout: Duration,
    ) -> Self {
        Self {
            sessions,
            dispatcher,
            heartbeat,
            request_timeout,
        }
    }

    /// Returns the session registry behind this transport.
    #[must_use]
    pub fn sessions(&self) -> &Arc<SessionRegistry> {
        &self.sessions
    }
}

/// Builds the HTTP router.
#[must_use]
pub fn router(state: Arc<HttpState>) -> Router {
    Router::new()
        .route("/session", post(create_session))
        .route("/stream", get(open_stream))
        .route("/request", post(submit_request))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Binds the listener and serves the HTTP transport until shutdown.
///
/// # Errors
///
/// Returns an error if the bind fails or the server loop fails.
pub async fn run_http(bind: SocketAddr, state: Arc<HttpState>) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(bind).await?;
    tracing::info!(%bind, "http transport listening");
    axum::serve(listener, router(state)).await
}

/// `POST /session` — creates a session.
async fn create_session(State(state): State<Arc<HttpState>>) -> Response {
    let session_id = state.sessions.create();
    let created_at = state.sessions.created_at(&session_id);
    tracing::info!(session = %session_id, "session created");

    (
        StatusCode::CREATED,
        Json(json!({
            "session_id": session_id,
            "created_at": created_at,
        })),
    )
        .into_response()
}

#[derive(Deserialize)]
struct StreamParams {
    session_id: String,
}

/// `GET /stream` — attaches the SSE delivery stream for a session.
async fn open_stream(
    State(state): State<Arc<HttpState>>,
    Query(params): Query<StreamParams>,
) -> Response {
    let session_id = params.session_id;
    if !state.sessions.is_open(&session_id) {
        return unknown_session(&session_id);
    }

    state.sessions.touch(&session_id);
    tracing::info!(session = %session_id, "stream attached");

    Sse::new(event_stream(state, session_id)).into_response()
}

/// Produces the per-session SSE event sequence.
fn event_stream(
    state: Arc<HttpState>,
    session_id: String,
) -> impl Stream<Item = Result<Event, Infallible>> {
    async_stream::stream! {
        yield Ok(Event::default()
            .event("connected")
            .data(json!({ "session_id": session_id }).to_string()));

        let mut heartbeat = tokio::time::interval(state.heartbeat);
        // The first tick completes immediately; not a heartbeat.
        heartbeat.tick().await;

        loop {
            tokio::select! {
                event = state.sessions.next_event(&session_id) => match event {
                    Some(SessionEvent::Message(msg)) => {
                        yield Ok(Event::default().event("message").data(msg));
                    }
                    Some(SessionEvent::Close { reason }) => {
                        yield Ok(Event::default()
                            .event("close")
                            .data(json!({ "reason": reason }).to_string()));
                        break;
                    }
                    None => break,
                },

                _ = heartbeat.tick() => {
                    state.sessions.touch(&session_id);
                    yield Ok(Event::default().event("ping").data("{}"));
                }
            }
        }

        state.sessions.remove_if_drained(&session_id);
        tracing::info!(session = %session_id, "stream ended");
    }
}

#[derive(Deserialize)]
struct SubmitBody {
    session_id: String,
    request: Value,
}

/// `POST /request` — submits a JSON-RPC payload against a session.
///
/// The body is acknowledged immediately; the response envelope is
/// delivered on the session's stream. Malformed payloads are answered
/// with their JSON-RPC error envelope on the stream as well, so the
/// client observes every outcome in one place.
async fn submit_request(
    State(state): State<Arc<HttpState>>,
    Json(body): Json<SubmitBody>,
) -> Response {
    let session_id = body.session_id;
    if !state.sessions.is_open(&session_id) {
        return unknown_session(&session_id);
    }
    state.sessions.touch(&session_id);

    let raw = body.request.to_string();
    match parse_message(&raw) {
        Ok(IncomingMessage::Request(req)) => {
            let request_id = req.id.clone();
            if !state.sessions.submit(&session_id, request_id.clone(), &req.method) {
                return unknown_session(&session_id);
            }

            let state = state.clone();
            tokio::spawn(async move {
                let outcome =
                    tokio::time::timeout(state.request_timeout, state.dispatcher.dispatch(req))
                        .await;
                let serialized = match outcome {
                    Ok(Ok(response)) => serde_json::to_string(&response),
                    Ok(Err(error)) => serde_json::to_string(&error),
                    Err(_) => serde_json::to_string(&JsonRpcError::application(
                        request_id.clone(),
                        format!(
                            "request exceeded the {}s processing budget",
                            state.request_timeout.as_secs()
                        ),
                    )),
                };
                match serialized {
                    Ok(serialized) => {
                        state.sessions.complete(&session_id, &request_id, serialized);
                    }
                    Err(e) => tracing::error!(error = %e, "failed to serialise response"),
                }
            });
        }
        Ok(IncomingMessage::Notification(notif)) => {
            tracing::debug!(session = %session_id, method = %notif.method, "ignoring notification");
        }
        Err(error) => {
            if let Ok(serialized) = serde_json::to_string(&error) {
                state.sessions.enqueue(&session_id, SessionEvent::Message(serialized));
            }
        }
    }

    (StatusCode::OK, Json(json!({}))).into_response()
}

fn unknown_session(session_id: &str) -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "error": format!("unknown session: {session_id}") })),
    )
        .into_response()
}
