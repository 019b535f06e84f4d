/// The HTTP surface end to end over a sandboxed host.
mod common;

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use common::Sandbox;
use serde_json::{json, Value};
use tower::ServiceExt;
use vpsctl::common::registry::PanelRegistry;
use vpsctl::server::auth::AuthService;
use vpsctl::server::{router, AppState};

fn app(sb: &Sandbox) -> Router {
    let auth = AuthService::from_config(&sb.ctx.config.auth).unwrap();
    router(AppState::new(PanelRegistry::new(sb.ctx.clone()), auth))
}

fn json_request(method: Method, uri: &str, token: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

fn get(uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder.body(Body::empty()).unwrap()
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

async fn login(app: &Router) -> String {
    let (status, body) = send(
        app,
        json_request(
            Method::POST,
            "/api/auth/login",
            None,
            json!({"username": "admin", "password": "changeme"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"], "admin");
    body["token"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_health_is_public() {
    let sb = Sandbox::new();
    let (status, body) = send(&app(&sb), get("/api/health", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"status": "ok"}));
}

#[tokio::test]
async fn test_protected_routes_need_a_token() {
    let sb = Sandbox::new();
    let app = app(&sb);

    let (status, body) = send(&app, get("/api/dns", None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body["error"].as_str().unwrap().contains("authorization header"));

    let (status, _) = send(&app, get("/api/system/services", Some("not.a.jwt"))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(sb.executor.calls().is_empty());
}

#[tokio::test]
async fn test_bad_credentials() {
    let sb = Sandbox::new();
    let (status, body) = send(
        &app(&sb),
        json_request(
            Method::POST,
            "/api/auth/login",
            None,
            json!({"username": "admin", "password": "wrong"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "invalid credentials");
}

#[tokio::test]
async fn test_zone_round_trip_over_http() {
    let sb = Sandbox::new();
    let app = app(&sb);
    let token = login(&app).await;

    let (status, zones) = send(&app, get("/api/dns", Some(&token))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(zones, json!([]));

    let (status, zone) = send(
        &app,
        json_request(
            Method::POST,
            "/api/dns",
            Some(&token),
            json!({"domain": "example.com", "ip": "203.0.113.10"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(zone["domain"], "example.com");

    let (status, change) = send(
        &app,
        json_request(
            Method::POST,
            "/api/dns/example.com/records",
            Some(&token),
            json!({"name": "blog", "type": "CNAME", "value": "example.com."}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(change["affected"], 1);

    let (status, zones) = send(&app, get("/api/dns", Some(&token))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(zones[0]["domain"], "example.com");
}

#[tokio::test]
async fn test_error_shapes() {
    let sb = Sandbox::new();
    let app = app(&sb);
    let token = login(&app).await;

    let malformed = Request::builder()
        .method(Method::POST)
        .uri("/api/dns")
        .header(header::CONTENT_TYPE, "application/json")
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .body(Body::from("{\"domain\": "))
        .unwrap();
    let (status, body) = send(&app, malformed).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());

    let (status, body) = send(&app, get("/api/dns/missing.org", Some(&token))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].as_str().unwrap().contains("missing.org"));

    let (status, _) = send(
        &app,
        get("/api/files/read?path=../../etc/passwd", Some(&token)),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(
        &app,
        json_request(
            Method::POST,
            "/api/system/services/docker/restart",
            Some(&token),
            json!({}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}
