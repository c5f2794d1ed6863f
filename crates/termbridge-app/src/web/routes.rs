use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{sse::Sse, IntoResponse, Json, Response},
    routing::{delete, get},
    Router,
};
use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;

use termbridge_terminal::{
    CommandChannel, SessionRegistry, ShellConfig, TerminalError, DEFAULT_SESSION_ID,
};

use crate::web::protocol::{CommandAck, CommandBody};
use crate::web::stream::observer_stream;

/// Application state shared across routes
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<SessionRegistry>,
    pub commands: Arc<CommandChannel>,
    /// Defaults applied when a subscription spawns a fresh session.
    pub shell: ShellConfig,
    pub keepalive: Duration,
}

/// Create router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Terminal read path (stream) and write path (commands)
        .route("/api/terminal", get(subscribe_terminal).post(send_command))
        // Session admin
        .route("/api/sessions", get(list_sessions))
        .route("/api/sessions/:id", delete(close_session))
        .route("/api/health", get(health))
        .with_state(state)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscribeParams {
    pub session_id: Option<String>,
    /// Working-directory hint, honored only when this request spawns the
    /// session.
    pub cwd: Option<String>,
}

/// GET /api/terminal - Subscribe to a session's output stream
async fn subscribe_terminal(
    State(state): State<AppState>,
    Query(params): Query<SubscribeParams>,
) -> Result<Response, AppError> {
    let session_id = params
        .session_id
        .unwrap_or_else(|| DEFAULT_SESSION_ID.to_string());

    let mut config = state.shell.clone();
    if let Some(cwd) = params.cwd {
        config.working_dir = Some(PathBuf::from(cwd));
    }

    let session = state.registry.get_or_create(&session_id, &config).await?;

    // For diagnostics only; observers are addressed by their stream, never
    // by this id.
    let connection_id = format!(
        "{}-{}-{}",
        session_id,
        Utc::now().timestamp_millis(),
        &Uuid::new_v4().simple().to_string()[..8]
    );
    log::info!("session '{session_id}': observer connected ({connection_id})");

    let stream = observer_stream(session, session_id, connection_id, state.keepalive);

    Ok((
        [
            (header::CACHE_CONTROL, "no-cache"),
            (header::CONNECTION, "keep-alive"),
        ],
        Sse::new(stream),
    )
        .into_response())
}

/// POST /api/terminal - Send input and/or resize to a session
async fn send_command(
    State(state): State<AppState>,
    Json(body): Json<CommandBody>,
) -> Result<Json<CommandAck>, AppError> {
    let command = body.to_command();
    state.commands.dispatch(&body.session_id, &command).await?;

    Ok(Json(CommandAck {
        success: true,
        session_id: body.session_id,
    }))
}

/// GET /api/sessions - List all active sessions
async fn list_sessions(State(state): State<AppState>) -> Json<serde_json::Value> {
    let sessions = state.registry.list().await;
    Json(serde_json::json!({ "sessions": sessions }))
}

/// DELETE /api/sessions/:id - Stop a session explicitly
async fn close_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    state.registry.remove(&id).await?;

    Ok(Json(serde_json::json!({
        "success": true,
        "message": "Session closed successfully",
    })))
}

/// GET /api/health - Service liveness
async fn health(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "sessions": state.registry.len().await,
    }))
}

/// Error handling
#[derive(Debug)]
pub enum AppError {
    Terminal(TerminalError),
}

impl From<TerminalError> for AppError {
    fn from(err: TerminalError) -> Self {
        AppError::Terminal(err)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            // "session not found" is the one condition the UI treats
            // specially (prompt to reconnect instead of a generic error).
            AppError::Terminal(err) if err.is_not_found() => {
                (StatusCode::NOT_FOUND, "session not found".to_string())
            }
            AppError::Terminal(err) => (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()),
        };

        let body = Json(serde_json::json!({
            "error": message,
            "status": status.as_u16(),
        }));

        (status, body).into_response()
    }
}
