use crate::common::error::PanelResult;
use crate::vhosts::{CreateVhostArgs, EnableSslArgs, Vhost};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use serde_json::{json, Value};

use super::status;
use crate::server::error::ApiJson;
use crate::server::state::AppState;

pub(super) fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/vhosts", get(list).post(create))
        .route("/api/vhosts/:domain", delete(remove))
        .route("/api/vhosts/:domain/enable", post(enable))
        .route("/api/vhosts/:domain/disable", post(disable))
        .route("/api/vhosts/:domain/ssl", post(ssl))
}

async fn list(State(state): State<AppState>) -> PanelResult<Json<Vec<Vhost>>> {
    Ok(Json(state.registry.vhosts.list().await?))
}

async fn create(
    State(state): State<AppState>,
    ApiJson(args): ApiJson<CreateVhostArgs>,
) -> PanelResult<(StatusCode, Json<Vhost>)> {
    Ok((
        StatusCode::CREATED,
        Json(state.registry.vhosts.create(args).await?),
    ))
}

async fn remove(
    State(state): State<AppState>,
    Path(domain): Path<String>,
) -> PanelResult<Json<Value>> {
    state.registry.vhosts.delete(&domain).await?;
    Ok(status("deleted"))
}

async fn enable(
    State(state): State<AppState>,
    Path(domain): Path<String>,
) -> PanelResult<Json<Value>> {
    state.registry.vhosts.enable(&domain).await?;
    Ok(status("enabled"))
}

async fn disable(
    State(state): State<AppState>,
    Path(domain): Path<String>,
) -> PanelResult<Json<Value>> {
    state.registry.vhosts.disable(&domain).await?;
    Ok(status("disabled"))
}

/// The body is optional; without one certbot registers without an email
async fn ssl(
    State(state): State<AppState>,
    Path(domain): Path<String>,
    body: Option<Json<EnableSslArgs>>,
) -> PanelResult<Json<Value>> {
    let args = body.map(|Json(args)| args).unwrap_or_default();
    state.registry.vhosts.enable_ssl(&domain, args).await?;
    Ok(Json(json!({"status": "ssl_enabled", "domain": domain})))
}
