use crate::common::error::PanelResult;
use crate::dns::{
    AddRecordArgs, CreateZoneArgs, DeleteRecordArgs, DnsZone, RecordChange, ZoneSummary,
};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::Value;

use super::status;
use crate::server::error::ApiJson;
use crate::server::state::AppState;

pub(super) fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/dns", get(list_zones).post(create_zone))
        .route("/api/dns/:domain", get(get_zone).delete(delete_zone))
        .route(
            "/api/dns/:domain/records",
            post(add_record).delete(delete_record),
        )
}

async fn list_zones(State(state): State<AppState>) -> PanelResult<Json<Vec<ZoneSummary>>> {
    Ok(Json(state.registry.dns.list_zones().await?))
}

async fn create_zone(
    State(state): State<AppState>,
    ApiJson(args): ApiJson<CreateZoneArgs>,
) -> PanelResult<(StatusCode, Json<DnsZone>)> {
    Ok((
        StatusCode::CREATED,
        Json(state.registry.dns.create_zone(args).await?),
    ))
}

async fn get_zone(
    State(state): State<AppState>,
    Path(domain): Path<String>,
) -> PanelResult<Json<DnsZone>> {
    Ok(Json(state.registry.dns.get_zone(&domain).await?))
}

async fn delete_zone(
    State(state): State<AppState>,
    Path(domain): Path<String>,
) -> PanelResult<Json<Value>> {
    state.registry.dns.delete_zone(&domain).await?;
    Ok(status("deleted"))
}

async fn add_record(
    State(state): State<AppState>,
    Path(domain): Path<String>,
    ApiJson(args): ApiJson<AddRecordArgs>,
) -> PanelResult<(StatusCode, Json<RecordChange>)> {
    Ok((
        StatusCode::CREATED,
        Json(state.registry.dns.add_record(&domain, args).await?),
    ))
}

async fn delete_record(
    State(state): State<AppState>,
    Path(domain): Path<String>,
    ApiJson(args): ApiJson<DeleteRecordArgs>,
) -> PanelResult<Json<RecordChange>> {
    Ok(Json(state.registry.dns.delete_record(&domain, args).await?))
}
