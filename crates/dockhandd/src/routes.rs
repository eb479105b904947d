//! HTTP API routes
//!
//! Validation failures map to `400 {error}`, engine failures to
//! `500 {error}`; successful responses are plain JSON shapes consumed by
//! the browser UI.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use serde_json::json;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use dockhand_compose as compose;
use dockhand_core::{constants, Error, PowerAction};

use crate::state::AppState;
use crate::ws::ws_logs;

/// Error wrapper choosing the HTTP status from the error taxonomy
pub struct ApiError(pub Error);

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        ApiError(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = if self.0.is_validation() {
            StatusCode::BAD_REQUEST
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        };
        (status, Json(json!({ "error": self.0.to_string() }))).into_response()
    }
}

type ApiResult = Result<Json<serde_json::Value>, ApiError>;

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(health_check))
        .route("/api/services", get(list_services))
        .route("/api/services/:name/status", get(service_status))
        .route("/api/services/:name/power", post(service_power))
        .route("/api/services/:name/config", get(get_config))
        .route("/api/services/:name/config-data", get(get_config_data))
        .route("/api/services/:name/config/env", post(update_env))
        .route("/api/services/:name/logs/files", get(list_log_files))
        .route("/api/services/:name/logs/read", get(read_log))
        .route("/api/services/:name/logs/time-range", get(log_time_range))
        .route("/api/services/:name/logs/search", post(search_logs))
        .route("/ws/logs/:name", get(ws_logs))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Resolve `name` against the enumerator or fail with 400
fn require_service(state: &AppState, name: &str) -> Result<(), ApiError> {
    if compose::service_exists(&state.config.container_dir, name) {
        Ok(())
    } else {
        Err(ApiError(Error::ServiceNotFound(name.to_string())))
    }
}

// === System ===

async fn health_check(State(state): State<AppState>) -> ApiResult {
    Ok(Json(json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
        "containerDir": state.config.container_dir,
        "hostIp": state.config.host_ip,
    })))
}

// === Services ===

async fn list_services(State(state): State<AppState>) -> ApiResult {
    let services = compose::list_services(&state.config.container_dir)?;
    Ok(Json(json!(services)))
}

async fn service_status(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> ApiResult {
    require_service(&state, &name)?;
    let status = compose::service_status(&state.config.container_dir, &name).await?;
    Ok(Json(json!({ "status": status })))
}

#[derive(Deserialize)]
struct PowerRequest {
    action: String,
}

async fn service_power(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Json(req): Json<PowerRequest>,
) -> ApiResult {
    require_service(&state, &name)?;
    let action: PowerAction = req.action.parse()?;

    // the permit serializes actions per service and is released on every
    // exit path by its Drop
    let _permit = state.power_guard.acquire(&name)?;
    let message = compose::power(&state.config.container_dir, &name, action).await?;
    Ok(Json(json!({ "success": true, "message": message })))
}

// === Config ===

async fn get_config(State(state): State<AppState>, Path(name): Path<String>) -> ApiResult {
    require_service(&state, &name)?;
    let path = constants::compose_path(&state.config.container_dir, &name);
    let manifest = compose::read_manifest(&path)?;
    Ok(Json(json!({
        "content": manifest.content,
        "version": manifest.version_string(),
    })))
}

async fn get_config_data(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> ApiResult {
    require_service(&state, &name)?;
    let path = constants::env_path(&state.config.container_dir, &name);
    let env_data = match std::fs::read_to_string(&path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
        Err(e) => return Err(ApiError(e.into())),
    };
    let entries = compose::read_env(&path).unwrap_or_default();
    Ok(Json(json!({
        "envData": env_data,
        "env": entries
            .into_iter()
            .map(|(k, v)| (k, serde_json::Value::String(v)))
            .collect::<serde_json::Map<String, serde_json::Value>>(),
    })))
}

#[derive(Deserialize)]
struct EnvRequest {
    #[serde(rename = "envData")]
    env_data: String,
}

async fn update_env(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Json(req): Json<EnvRequest>,
) -> ApiResult {
    require_service(&state, &name)?;
    let path = constants::env_path(&state.config.container_dir, &name);
    compose::write_env(&path, &req.env_data)?;
    Ok(Json(json!({ "success": true })))
}

// === Logs ===

async fn list_log_files(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> ApiResult {
    let files = state.engine.list_log_files(&name)?;
    Ok(Json(json!(files)))
}

#[derive(Deserialize)]
struct ReadQuery {
    file: String,
    #[serde(default)]
    start: i64,
    #[serde(default = "default_num")]
    num: i64,
}

fn default_num() -> i64 {
    100
}

async fn read_log(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Query(query): Query<ReadQuery>,
) -> ApiResult {
    let lines = state
        .engine
        .read_lines(&name, &query.file, query.start, query.num)?;
    Ok(Json(json!({ "lines": lines })))
}

#[derive(Deserialize)]
struct FileQuery {
    file: String,
}

async fn log_time_range(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Query(query): Query<FileQuery>,
) -> ApiResult {
    let range = state.engine.get_time_range(&name, &query.file)?;
    Ok(Json(json!({ "start": range.start, "end": range.end })))
}

#[derive(Deserialize)]
struct SearchRequest {
    file: String,
    from: Option<String>,
    to: Option<String>,
    #[serde(default = "default_limit")]
    limit: usize,
    #[serde(default)]
    offset: usize,
    #[serde(default)]
    search: String,
}

fn default_limit() -> usize {
    1000
}

async fn search_logs(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Json(req): Json<SearchRequest>,
) -> ApiResult {
    let result = state.engine.read_time_range(
        &name,
        &req.file,
        req.from.as_deref(),
        req.to.as_deref(),
        req.limit,
        req.offset,
        &req.search,
    )?;
    Ok(Json(json!({ "lines": result.lines, "total": result.total })))
}
