use crate::common::error::PanelResult;
use crate::ftp::{CreateFtpUserArgs, FtpPasswordArgs, FtpUser};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, put};
use axum::{Json, Router};
use serde_json::Value;

use super::status;
use crate::server::error::ApiJson;
use crate::server::state::AppState;

pub(super) fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/ftp", get(list).post(create))
        .route("/api/ftp/:username", put(update_password).delete(remove))
}

async fn list(State(state): State<AppState>) -> PanelResult<Json<Vec<FtpUser>>> {
    Ok(Json(state.registry.ftp.list_users().await?))
}

async fn create(
    State(state): State<AppState>,
    ApiJson(args): ApiJson<CreateFtpUserArgs>,
) -> PanelResult<(StatusCode, Json<FtpUser>)> {
    Ok((
        StatusCode::CREATED,
        Json(state.registry.ftp.create_user(args).await?),
    ))
}

async fn update_password(
    State(state): State<AppState>,
    Path(username): Path<String>,
    ApiJson(args): ApiJson<FtpPasswordArgs>,
) -> PanelResult<Json<Value>> {
    state.registry.ftp.update_password(&username, args).await?;
    Ok(status("updated"))
}

async fn remove(
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> PanelResult<Json<Value>> {
    state.registry.ftp.delete_user(&username).await?;
    Ok(status("deleted"))
}
