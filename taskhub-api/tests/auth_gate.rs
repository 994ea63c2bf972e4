/// Integration tests for the authentication gate
///
/// These tests exercise the middleware stack in isolation: every request
/// here is rejected (or answered) before any handler touches the
/// database, so the pool is built with `connect_lazy` and no Postgres
/// instance is required.
///
/// Covered:
/// - Public operational endpoints stay open
/// - Protected routes reject missing / malformed / forged / expired tokens
/// - Role and tenant guards map to 401 and 403 respectively
/// - The WebSocket handshake rejects a bad token before upgrading

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use chrono::Duration;
use serde_json::Value;
use sqlx::postgres::PgPoolOptions;
use taskhub_api::app::{build_router, AppState};
use taskhub_api::config::{ApiConfig, Config, DatabaseConfig, JwtConfig, SmtpSettings};
use taskhub_api::middleware::metrics::Metrics;
use taskhub_shared::auth::jwt::{create_token, Claims};
use taskhub_shared::email::{EmailDispatcher, MockMailer};
use taskhub_shared::models::user::UserRole;
use taskhub_shared::relay::ConnectionRegistry;
use tower::Service as _;
use uuid::Uuid;

const JWT_SECRET: &str = "test-secret-key-at-least-32-bytes-long";

fn test_config() -> Config {
    Config {
        api: ApiConfig {
            host: "127.0.0.1".to_string(),
            port: 8080,
            cors_origins: vec!["*".to_string()],
            production: false,
        },
        database: DatabaseConfig {
            url: "postgresql://localhost/taskhub_test".to_string(),
            max_connections: 2,
        },
        jwt: JwtConfig {
            secret: JWT_SECRET.to_string(),
            expires_in_hours: 24,
        },
        smtp: SmtpSettings {
            enabled: false,
            host: "localhost".to_string(),
            port: 587,
            username: String::new(),
            password: String::new(),
            from: "TaskHub <noreply@taskhub.io>".to_string(),
            frontend_url: "http://localhost:3000".to_string(),
            queue_capacity: 16,
        },
    }
}

/// Builds the full router over a lazy pool that never connects
fn test_app() -> axum::Router {
    let config = test_config();
    let db = PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .connect_lazy(&config.database.url)
        .unwrap();
    let relay = Arc::new(ConnectionRegistry::new());
    let (email, _worker) = EmailDispatcher::start(Arc::new(MockMailer::new()), 16);
    let metrics = Metrics::new();

    build_router(AppState::new(db, config, relay, email, metrics))
}

/// Signed token for an arbitrary user, optionally scoped to a tenant
fn token_for(role: UserRole, tenant_id: Option<Uuid>, secret: &str) -> String {
    let claims = Claims::new(
        Uuid::new_v4(),
        "gate@example.com".to_string(),
        role,
        tenant_id,
        Duration::hours(1),
    );
    create_token(&claims, secret).unwrap()
}

async fn send(app: &mut axum::Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.call(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

fn get_with_auth(uri: &str, header: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .header("authorization", header)
        .body(Body::empty())
        .unwrap()
}

#[tokio::test]
async fn test_ready_is_public() {
    let mut app = test_app();

    let (status, body) = send(&mut app, get("/ready")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ready"], true);
}

#[tokio::test]
async fn test_metrics_is_public() {
    let mut app = test_app();

    // A counter vec with no samples encodes to nothing; record one first
    let (status, _) = send(&mut app, get("/ready")).await;
    assert_eq!(status, StatusCode::OK);

    let response = app.call(get("/metrics")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let text = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(text.contains("http_requests_total"));
}

#[tokio::test]
async fn test_missing_token_is_rejected() {
    let mut app = test_app();

    let (status, body) = send(&mut app, get("/api/tasks")).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "unauthorized");
}

#[tokio::test]
async fn test_non_bearer_scheme_is_rejected() {
    let mut app = test_app();

    let request = get_with_auth("/api/tasks", "Basic dXNlcjpwYXNz");
    let (status, _) = send(&mut app, request).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_garbage_token_is_rejected() {
    let mut app = test_app();

    let request = get_with_auth("/api/tasks", "Bearer not-a-jwt");
    let (status, _) = send(&mut app, request).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_forged_token_is_rejected() {
    let mut app = test_app();

    // Signed with a different secret
    let token = token_for(
        UserRole::Admin,
        Some(Uuid::new_v4()),
        "another-secret-key-also-32-bytes-long!!",
    );
    let request = get_with_auth("/api/tasks", &format!("Bearer {}", token));
    let (status, _) = send(&mut app, request).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_expired_token_is_rejected() {
    let mut app = test_app();

    let claims = Claims::new(
        Uuid::new_v4(),
        "gate@example.com".to_string(),
        UserRole::User,
        Some(Uuid::new_v4()),
        Duration::hours(-1),
    );
    let token = create_token(&claims, JWT_SECRET).unwrap();
    let request = get_with_auth("/api/tasks", &format!("Bearer {}", token));
    let (status, _) = send(&mut app, request).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_member_cannot_list_tenants() {
    let mut app = test_app();

    // Valid token, wrong role: the role guard fires before any query
    let token = token_for(UserRole::User, Some(Uuid::new_v4()), JWT_SECRET);
    let request = get_with_auth("/api/tenants", &format!("Bearer {}", token));
    let (status, _) = send(&mut app, request).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_tenantless_user_cannot_create_tasks() {
    let mut app = test_app();

    let token = token_for(UserRole::User, None, JWT_SECRET);
    let request = Request::builder()
        .method("POST")
        .uri("/api/tasks")
        .header("authorization", format!("Bearer {}", token))
        .header("content-type", "application/json")
        .body(Body::from(r#"{"title": "Quarterly report"}"#))
        .unwrap();
    let (status, body) = send(&mut app, request).await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "forbidden");
}

// The upgrade extractor needs hyper's connection state, so this one runs
// over a real listener instead of calling the router as a service.
#[tokio::test]
async fn test_ws_handshake_rejects_bad_token() {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    let app = test_app();
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    let mut stream = tokio::net::TcpStream::connect(addr).await.unwrap();
    let handshake = format!(
        "GET /ws?token=not-a-jwt HTTP/1.1\r\n\
         Host: {addr}\r\n\
         Connection: Upgrade\r\n\
         Upgrade: websocket\r\n\
         Sec-WebSocket-Version: 13\r\n\
         Sec-WebSocket-Key: dGhlIHNhbXBsZSBub25jZQ==\r\n\
         \r\n"
    );
    stream.write_all(handshake.as_bytes()).await.unwrap();

    let mut response = Vec::new();
    let mut buf = [0u8; 1024];
    loop {
        let n = stream.read(&mut buf).await.unwrap();
        if n == 0 {
            break;
        }
        response.extend_from_slice(&buf[..n]);
        if response.windows(4).any(|w| w == b"\r\n\r\n") {
            break;
        }
    }

    let head = String::from_utf8_lossy(&response);
    assert!(
        head.starts_with("HTTP/1.1 401"),
        "expected 401 before upgrade, got: {head}"
    );
}
