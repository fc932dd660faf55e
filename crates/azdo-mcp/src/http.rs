//! Session-based HTTP binding for the MCP server.
//!
//! `POST /mcp` carries one JSON-RPC message. A session is created by an
//! `initialize` request sent without the `Mcp-Session-Id` header; every other
//! request must carry the id returned in that header.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use azdo_core::{Error, Result};
use dashmap::DashMap;
use serde_json::json;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use uuid::Uuid;

use crate::protocol::{IncomingMessage, JsonRpcResponse, RequestId};
use crate::server::{McpServer, Session};

pub const SESSION_HEADER: &str = "mcp-session-id";

/// Upper bound on how often idle sessions are swept.
const MAX_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

struct HttpSession {
    session: Session,
    last_seen: Instant,
}

/// Shared state behind the HTTP router.
#[derive(Clone)]
pub struct HttpState {
    server: Arc<McpServer>,
    sessions: Arc<DashMap<String, HttpSession>>,
    session_timeout: Duration,
}

impl HttpState {
    pub fn new(server: Arc<McpServer>, session_timeout: Duration) -> Self {
        Self {
            server,
            sessions: Arc::new(DashMap::new()),
            session_timeout,
        }
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    /// Remove sessions idle longer than the timeout. Returns how many went.
    pub fn sweep_expired(&self) -> usize {
        let before = self.sessions.len();
        let now = Instant::now();
        self.sessions
            .retain(|_, s| now.duration_since(s.last_seen) <= self.session_timeout);
        before.saturating_sub(self.sessions.len())
    }

    /// Snapshot of a live session. An expired session is dropped on access.
    fn live_session(&self, id: &str) -> Option<Session> {
        let now = Instant::now();
        match self.sessions.get(id) {
            None => return None,
            Some(entry) if now.duration_since(entry.last_seen) <= self.session_timeout => {
                return Some(entry.session.clone());
            }
            Some(_) => {}
        }
        self.sessions.remove(id);
        None
    }

    /// Write back a session after a request. A session deleted or swept while
    /// the request was in flight stays gone.
    fn store(&self, id: &str, session: Session) -> bool {
        match self.sessions.get_mut(id) {
            Some(mut entry) => {
                entry.session = session;
                entry.last_seen = Instant::now();
                true
            }
            None => false,
        }
    }

    fn open(&self) -> String {
        let id = Uuid::new_v4().to_string();
        self.sessions.insert(
            id.clone(),
            HttpSession {
                session: Session::new(),
                last_seen: Instant::now(),
            },
        );
        id
    }
}

pub fn router(state: HttpState) -> Router {
    Router::new()
        .route("/mcp", post(post_mcp).delete(delete_mcp))
        .route("/health", get(health))
        .with_state(state)
}

/// Periodically drop idle sessions for as long as the returned task runs.
pub fn spawn_sweeper(state: HttpState) -> JoinHandle<()> {
    let period = state
        .session_timeout
        .min(MAX_SWEEP_INTERVAL)
        .max(Duration::from_secs(1));
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        loop {
            ticker.tick().await;
            let removed = state.sweep_expired();
            if removed > 0 {
                tracing::debug!(removed, "Expired idle MCP sessions");
            }
        }
    })
}

/// Serve the HTTP binding on localhost until the listener fails.
pub async fn serve_http(
    server: Arc<McpServer>,
    port: u16,
    session_timeout: Duration,
) -> Result<()> {
    let state = HttpState::new(server, session_timeout);
    let sweeper = spawn_sweeper(state.clone());

    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| Error::Config(format!("Failed to bind {}: {}", addr, e)))?;
    tracing::info!("MCP HTTP server listening on http://{}/mcp", addr);

    let result = axum::serve(listener, router(state)).await;
    sweeper.abort();
    result.map_err(|e| Error::Other(e.into()))
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

async fn post_mcp(State(state): State<HttpState>, headers: HeaderMap, body: String) -> Response {
    let msg = match IncomingMessage::parse(&body) {
        Ok(msg) => msg,
        Err(e) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(JsonRpcResponse::error(RequestId::Null, e)),
            )
                .into_response();
        }
    };

    let (session_id, mut session) = match session_header(&headers) {
        Some(id) => match state.live_session(&id) {
            Some(session) => (id, session),
            None => return (StatusCode::NOT_FOUND, "Unknown or expired session").into_response(),
        },
        None if msg.method() == "initialize" => {
            let id = state.open();
            tracing::info!(session = %id, "Opening MCP session");
            (id, Session::new())
        }
        None => {
            return (StatusCode::BAD_REQUEST, "Missing Mcp-Session-Id header").into_response();
        }
    };

    let response = state.server.handle_message(&mut session, msg).await;
    if !state.store(&session_id, session) {
        tracing::debug!(session = %session_id, "Session ended while a request was in flight");
    }

    let headers = [(SESSION_HEADER, session_id)];
    match response {
        Some(resp) => (headers, Json(resp)).into_response(),
        None => (StatusCode::ACCEPTED, headers).into_response(),
    }
}

async fn delete_mcp(State(state): State<HttpState>, headers: HeaderMap) -> StatusCode {
    let Some(id) = session_header(&headers) else {
        return StatusCode::BAD_REQUEST;
    };
    match state.sessions.remove(&id) {
        Some(_) => {
            tracing::info!(session = %id, "Closed MCP session");
            StatusCode::NO_CONTENT
        }
        None => StatusCode::NOT_FOUND,
    }
}

fn session_header(headers: &HeaderMap) -> Option<String> {
    headers
        .get(SESSION_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
