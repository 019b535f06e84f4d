use crate::common::error::PanelResult;
use crate::databases::{CreateDatabaseArgs, Database, DatabaseCreated, TableList};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{delete, get};
use axum::{Json, Router};
use serde_json::{json, Value};

use crate::server::error::ApiJson;
use crate::server::state::AppState;

pub(super) fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/databases", get(list).post(create))
        .route("/api/databases/:name", delete(drop_database))
        .route("/api/databases/:name/tables", get(tables))
}

async fn list(State(state): State<AppState>) -> PanelResult<Json<Vec<Database>>> {
    Ok(Json(state.registry.databases.list().await?))
}

async fn create(
    State(state): State<AppState>,
    ApiJson(args): ApiJson<CreateDatabaseArgs>,
) -> PanelResult<(StatusCode, Json<DatabaseCreated>)> {
    Ok((
        StatusCode::CREATED,
        Json(state.registry.databases.create(args).await?),
    ))
}

async fn drop_database(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> PanelResult<Json<Value>> {
    state.registry.databases.drop_database(&name).await?;
    Ok(Json(json!({"status": "dropped", "database": name})))
}

async fn tables(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> PanelResult<Json<TableList>> {
    Ok(Json(state.registry.databases.list_tables(&name).await?))
}
