/// Route table under `/api`.
mod cron;
mod databases;
mod dns;
mod files;
mod ftp;
mod mail;
mod system;
mod users;
mod vhosts;

use crate::common::config::ServerConfig;
use axum::extract::DefaultBodyLimit;
use axum::http::{header, HeaderValue, Method};
use axum::routing::{get, post};
use axum::{middleware, Json, Router};
use serde_json::{json, Value};
use std::time::Duration;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use super::auth::{login, require_bearer};
use super::state::AppState;

/// The full panel API: public login and health, everything else behind a bearer token
pub fn router(state: AppState) -> Router {
    let server = state.registry.context().config.server.clone();

    let protected = Router::new()
        .merge(system::routes())
        .merge(users::routes())
        .merge(vhosts::routes())
        .merge(databases::routes())
        .merge(files::routes())
        .merge(mail::routes())
        .merge(dns::routes())
        .merge(cron::routes())
        .merge(ftp::routes())
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            require_bearer,
        ));

    Router::new()
        .route("/api/health", get(health))
        .route("/api/auth/login", post(login))
        .merge(protected)
        .layer(DefaultBodyLimit::max(server.max_body_bytes))
        .layer(TimeoutLayer::new(Duration::from_secs(
            server.request_timeout_secs,
        )))
        .layer(cors_layer(&server))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> Json<Value> {
    Json(json!({"status": "ok"}))
}

/// `{"status": <status>}` acknowledgement body
fn status(status: &'static str) -> Json<Value> {
    Json(json!({ "status": status }))
}

fn cors_layer(server: &ServerConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = server
        .cors_origins
        .iter()
        .filter(|origin| {
            // a wildcard cannot be combined with credentials
            let wildcard = origin.trim() == "*";
            if wildcard {
                tracing::warn!("ignoring wildcard CORS origin");
            }
            !wildcard
        })
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "ignoring unparsable CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::ACCEPT, header::AUTHORIZATION, header::CONTENT_TYPE])
        .allow_credentials(true)
        .max_age(Duration::from_secs(300))
}
