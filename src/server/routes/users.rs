use crate::common::error::PanelResult;
use crate::users::{CreateUserArgs, SystemUser, UpdateUserArgs};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post, put};
use axum::{Json, Router};
use serde_json::{json, Value};

use super::status;
use crate::server::error::ApiJson;
use crate::server::state::AppState;

pub(super) fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/users", get(list).post(create))
        .route("/api/users/:username", put(update).delete(remove))
        .route("/api/users/:username/suspend", post(suspend))
        .route("/api/users/:username/activate", post(activate))
}

async fn list(State(state): State<AppState>) -> PanelResult<Json<Vec<SystemUser>>> {
    Ok(Json(state.registry.users.list().await?))
}

async fn create(
    State(state): State<AppState>,
    ApiJson(args): ApiJson<CreateUserArgs>,
) -> PanelResult<(StatusCode, Json<Value>)> {
    let username = state.registry.users.create(args).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({"username": username, "status": "created"})),
    ))
}

async fn update(
    State(state): State<AppState>,
    Path(username): Path<String>,
    ApiJson(args): ApiJson<UpdateUserArgs>,
) -> PanelResult<Json<Value>> {
    state.registry.users.update(&username, args).await?;
    Ok(status("updated"))
}

async fn remove(
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> PanelResult<Json<Value>> {
    state.registry.users.delete(&username).await?;
    Ok(Json(json!({"status": "deleted", "username": username})))
}

async fn suspend(
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> PanelResult<Json<Value>> {
    state.registry.users.suspend(&username).await?;
    Ok(status("suspended"))
}

async fn activate(
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> PanelResult<Json<Value>> {
    state.registry.users.activate(&username).await?;
    Ok(status("active"))
}
