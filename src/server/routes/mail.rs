use crate::common::error::PanelResult;
use crate::mail::{AddDomainArgs, CreateMailboxArgs, MailDomain, MailQueue, Mailbox};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::Value;

use super::status;
use crate::server::error::ApiJson;
use crate::server::state::AppState;

pub(super) fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/email/domains", get(list_domains).post(add_domain))
        .route("/api/email/domains/:domain", delete(delete_domain))
        .route("/api/email/mailboxes", get(list_mailboxes).post(create_mailbox))
        .route("/api/email/mailboxes/:email", delete(delete_mailbox))
        .route("/api/email/queue", get(queue))
        .route("/api/email/queue/flush", post(flush_queue))
}

async fn list_domains(State(state): State<AppState>) -> PanelResult<Json<Vec<MailDomain>>> {
    Ok(Json(state.registry.mail.list_domains().await?))
}

async fn add_domain(
    State(state): State<AppState>,
    ApiJson(args): ApiJson<AddDomainArgs>,
) -> PanelResult<(StatusCode, Json<MailDomain>)> {
    Ok((
        StatusCode::CREATED,
        Json(state.registry.mail.add_domain(args).await?),
    ))
}

#[derive(Debug, Default, Deserialize)]
struct PurgeQuery {
    /// Also remove the domain's mail storage
    #[serde(default)]
    purge: bool,
}

async fn delete_domain(
    State(state): State<AppState>,
    Path(domain): Path<String>,
    Query(query): Query<PurgeQuery>,
) -> PanelResult<Json<Value>> {
    state
        .registry
        .mail
        .delete_domain(&domain, query.purge)
        .await?;
    Ok(status("deleted"))
}

#[derive(Debug, Default, Deserialize)]
struct DomainQuery {
    domain: Option<String>,
}

async fn list_mailboxes(
    State(state): State<AppState>,
    Query(query): Query<DomainQuery>,
) -> PanelResult<Json<Vec<Mailbox>>> {
    Ok(Json(
        state
            .registry
            .mail
            .list_mailboxes(query.domain.as_deref())
            .await?,
    ))
}

async fn create_mailbox(
    State(state): State<AppState>,
    ApiJson(args): ApiJson<CreateMailboxArgs>,
) -> PanelResult<(StatusCode, Json<Mailbox>)> {
    Ok((
        StatusCode::CREATED,
        Json(state.registry.mail.create_mailbox(args).await?),
    ))
}

async fn delete_mailbox(
    State(state): State<AppState>,
    Path(email): Path<String>,
) -> PanelResult<Json<Value>> {
    state.registry.mail.delete_mailbox(&email).await?;
    Ok(status("deleted"))
}

async fn queue(State(state): State<AppState>) -> PanelResult<Json<MailQueue>> {
    Ok(Json(state.registry.mail.queue().await?))
}

async fn flush_queue(State(state): State<AppState>) -> PanelResult<Json<Value>> {
    state.registry.mail.flush_queue().await?;
    Ok(status("flushed"))
}
