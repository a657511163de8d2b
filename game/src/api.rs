//! HTTP remote control for a headless session.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard};

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::{get, post},
};
use farm_engine::editor::{
    EditorManifest, EditorSnapshot, EditorTimeline, FramesRequest, SeekRequest, StepRequest,
};
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, warn};

use crate::editor_api::{AnswerRequest, EditorApiError, EditorSession};

pub const API_ADDR_ENV: &str = "ZOMBIE_FARM_API_ADDR";
pub const API_PORT_ENV: &str = "ZOMBIE_FARM_API_PORT";

#[derive(Clone)]
pub struct AppState {
    session: Arc<Mutex<EditorSession>>,
}

impl AppState {
    pub fn new(session: EditorSession) -> Self {
        Self {
            session: Arc::new(Mutex::new(session)),
        }
    }

    fn lock(&self) -> MutexGuard<'_, EditorSession> {
        // A handler that panicked mid-step leaves the last recorded frame intact.
        self.session.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

type ApiResult<T> = Result<Json<T>, (StatusCode, String)>;

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/health", get(health))
        .route("/api/manifest", get(manifest))
        .route("/api/agent/state", get(agent_state))
        .route("/api/agent/timeline", get(agent_timeline))
        .route("/api/agent/step", post(agent_step))
        .route("/api/agent/answer", post(agent_answer))
        .route("/api/agent/rewind", post(agent_rewind))
        .route("/api/agent/forward", post(agent_forward))
        .route("/api/agent/seek", post(agent_seek))
        .route("/api/agent/reset", post(agent_reset))
        .with_state(state)
        .layer(cors)
}

/// `ZOMBIE_FARM_API_ADDR`, then `ZOMBIE_FARM_API_PORT` on loopback, then `127.0.0.1:4000`.
pub fn resolve_api_addr<F>(mut get_env: F) -> SocketAddr
where
    F: FnMut(&str) -> Option<String>,
{
    if let Some(raw) = get_env(API_ADDR_ENV) {
        match raw.parse() {
            Ok(addr) => return addr,
            Err(_) => warn!(value = %raw, env = API_ADDR_ENV, "ignoring invalid api address"),
        }
    }

    if let Some(port) = get_env(API_PORT_ENV).and_then(|v| v.parse::<u16>().ok()) {
        return SocketAddr::from(([127, 0, 0, 1], port));
    }

    SocketAddr::from(([127, 0, 0, 1], 4000))
}

fn into_response(result: Result<EditorSnapshot, EditorApiError>) -> ApiResult<EditorSnapshot> {
    match result {
        Ok(snapshot) => Ok(Json(snapshot)),
        Err(err @ EditorApiError::UnknownActionId(_)) => {
            Err((StatusCode::BAD_REQUEST, err.to_string()))
        }
        Err(err) => {
            error!(%err, "agent request failed");
            Err((StatusCode::INTERNAL_SERVER_ERROR, err.to_string()))
        }
    }
}

async fn health() -> &'static str {
    "ok"
}

async fn manifest(State(state): State<AppState>) -> Json<EditorManifest> {
    Json(state.lock().manifest())
}

async fn agent_state(State(state): State<AppState>) -> ApiResult<EditorSnapshot> {
    let snapshot = state.lock().state();
    into_response(snapshot)
}

async fn agent_timeline(State(state): State<AppState>) -> Json<EditorTimeline> {
    Json(state.lock().timeline())
}

async fn agent_step(
    State(state): State<AppState>,
    Json(payload): Json<StepRequest>,
) -> ApiResult<EditorSnapshot> {
    let snapshot = state.lock().step(&payload.action_id);
    into_response(snapshot)
}

async fn agent_answer(
    State(state): State<AppState>,
    Json(payload): Json<AnswerRequest>,
) -> ApiResult<EditorSnapshot> {
    let snapshot = state.lock().answer(&payload.text);
    into_response(snapshot)
}

async fn agent_rewind(
    State(state): State<AppState>,
    Json(payload): Json<FramesRequest>,
) -> ApiResult<EditorSnapshot> {
    let snapshot = state.lock().rewind(payload.frames);
    into_response(snapshot)
}

async fn agent_forward(
    State(state): State<AppState>,
    Json(payload): Json<FramesRequest>,
) -> ApiResult<EditorSnapshot> {
    let snapshot = state.lock().forward(payload.frames);
    into_response(snapshot)
}

async fn agent_seek(
    State(state): State<AppState>,
    Json(payload): Json<SeekRequest>,
) -> ApiResult<EditorSnapshot> {
    let snapshot = state.lock().seek(payload.frame);
    into_response(snapshot)
}

async fn agent_reset(State(state): State<AppState>) -> ApiResult<EditorSnapshot> {
    let snapshot = state.lock().reset();
    into_response(snapshot)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_api_addr_defaults_to_4000() {
        let addr = resolve_api_addr(|_| None);
        assert_eq!(addr, SocketAddr::from(([127, 0, 0, 1], 4000)));
    }

    #[test]
    fn resolve_api_addr_prefers_explicit_addr() {
        let addr = resolve_api_addr(|k| match k {
            API_ADDR_ENV => Some("0.0.0.0:4555".to_string()),
            API_PORT_ENV => Some("4556".to_string()),
            _ => None,
        });
        assert_eq!(addr, SocketAddr::from(([0, 0, 0, 0], 4555)));
    }

    #[test]
    fn resolve_api_addr_ignores_invalid_addr_but_uses_valid_port() {
        let addr = resolve_api_addr(|k| match k {
            API_ADDR_ENV => Some("not-an-addr".to_string()),
            API_PORT_ENV => Some("4557".to_string()),
            _ => None,
        });
        assert_eq!(addr, SocketAddr::from(([127, 0, 0, 1], 4557)));
    }
}
