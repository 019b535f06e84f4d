use crate::common::error::PanelResult;
use crate::cron::{CronJob, CronJobArgs, RunTriggered};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post, put};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::Value;

use super::status;
use crate::server::error::ApiJson;
use crate::server::state::AppState;

pub(super) fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/cron", get(list).post(create))
        .route("/api/cron/:position", put(update).delete(remove))
        .route("/api/cron/:position/run", post(run_now))
}

/// `?user=`; omitted means every crontab for listing and `root` otherwise
#[derive(Debug, Default, Deserialize)]
struct UserQuery {
    user: Option<String>,
}

async fn list(
    State(state): State<AppState>,
    Query(query): Query<UserQuery>,
) -> PanelResult<Json<Vec<CronJob>>> {
    Ok(Json(state.registry.cron.list_jobs(query.user.as_deref()).await?))
}

async fn create(
    State(state): State<AppState>,
    ApiJson(args): ApiJson<CronJobArgs>,
) -> PanelResult<(StatusCode, Json<CronJob>)> {
    Ok((
        StatusCode::CREATED,
        Json(state.registry.cron.create_job(args).await?),
    ))
}

async fn update(
    State(state): State<AppState>,
    Path(position): Path<usize>,
    ApiJson(args): ApiJson<CronJobArgs>,
) -> PanelResult<Json<CronJob>> {
    Ok(Json(state.registry.cron.update_job(position, args).await?))
}

async fn remove(
    State(state): State<AppState>,
    Path(position): Path<usize>,
    Query(query): Query<UserQuery>,
) -> PanelResult<Json<Value>> {
    state
        .registry
        .cron
        .delete_job(query.user.as_deref(), position)
        .await?;
    Ok(status("deleted"))
}

async fn run_now(
    State(state): State<AppState>,
    Path(position): Path<usize>,
    Query(query): Query<UserQuery>,
) -> PanelResult<Json<RunTriggered>> {
    Ok(Json(
        state
            .registry
            .cron
            .run_job_now(query.user.as_deref(), position)
            .await?,
    ))
}
