use crate::common::error::PanelResult;
use crate::system::{LogEntry, ServiceAction, ServiceActionResult, ServiceStatus, SystemStats};
use axum::extract::{Path, Query, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;

use crate::server::state::AppState;

pub(super) fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/system/stats", get(stats))
        .route("/api/system/services", get(services))
        .route("/api/system/services/:name/restart", post(restart))
        .route("/api/system/services/:name/stop", post(stop))
        .route("/api/system/services/:name/start", post(start))
        .route("/api/system/logs", get(logs))
}

async fn stats(State(state): State<AppState>) -> PanelResult<Json<SystemStats>> {
    Ok(Json(state.registry.system.stats().await?))
}

async fn services(State(state): State<AppState>) -> PanelResult<Json<Vec<ServiceStatus>>> {
    Ok(Json(state.registry.system.services().await?))
}

async fn restart(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> PanelResult<Json<ServiceActionResult>> {
    act(state, name, ServiceAction::Restart).await
}

async fn stop(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> PanelResult<Json<ServiceActionResult>> {
    act(state, name, ServiceAction::Stop).await
}

async fn start(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> PanelResult<Json<ServiceActionResult>> {
    act(state, name, ServiceAction::Start).await
}

async fn act(
    state: AppState,
    name: String,
    action: ServiceAction,
) -> PanelResult<Json<ServiceActionResult>> {
    Ok(Json(
        state.registry.system.service_action(&name, action).await?,
    ))
}

#[derive(Debug, Deserialize)]
struct LogQuery {
    unit: Option<String>,
    lines: Option<u32>,
}

async fn logs(
    State(state): State<AppState>,
    Query(query): Query<LogQuery>,
) -> PanelResult<Json<Vec<LogEntry>>> {
    Ok(Json(
        state
            .registry
            .system
            .logs(query.unit.as_deref(), query.lines)
            .await?,
    ))
}
