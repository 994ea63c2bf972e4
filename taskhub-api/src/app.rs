/// Application state and router builder
///
/// # Router layout
///
/// ```text
/// /
/// ├── /health                    # DB-backed health check (public)
/// ├── /ready                     # Static readiness probe (public)
/// ├── /metrics                   # Prometheus exposition (public)
/// ├── /ws                        # WebSocket channel (token via query)
/// └── /api/
///     ├── /auth/                 # register, login, logout public; me authed
///     ├── /tasks/                # CRUD + comments (JWT required)
///     └── /tenants/              # CRUD + settings + subscription (JWT required)
/// ```
///
/// # Middleware Stack
///
/// Outermost first:
/// 1. Security headers
/// 2. CORS (tower-http CorsLayer)
/// 3. Request timeout (30s, tower-http TimeoutLayer)
/// 4. Logging (tower-http TraceLayer)
/// 5. Metrics (route layer, runs after path matching)
/// 6. Authentication (per-route-group)

use crate::{
    config::Config,
    middleware::{
        metrics::{self, Metrics},
        security::SecurityHeadersLayer,
    },
};
use axum::{
    extract::FromRef,
    http::{header, HeaderValue, Method},
    routing::{delete, get, post, put},
    Router,
};
use sqlx::PgPool;
use std::sync::Arc;
use taskhub_shared::{
    auth::middleware::create_jwt_middleware,
    email::EmailDispatcher,
    relay::ConnectionRegistry,
};
use tower_http::{
    cors::CorsLayer,
    timeout::TimeoutLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

/// Fixed per-request timeout; long-lived WebSocket sessions are not
/// affected because the upgrade response itself completes immediately.
const REQUEST_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(30);

/// Shared application state
///
/// Cloned per request via Axum's `State` extractor; everything inside is
/// an `Arc` or otherwise cheap to clone.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: PgPool,

    /// Application configuration
    pub config: Arc<Config>,

    /// Live WebSocket connections
    pub relay: Arc<ConnectionRegistry>,

    /// Outbound email queue
    pub email: EmailDispatcher,

    /// Prometheus registry and series
    pub metrics: Arc<Metrics>,
}

impl AppState {
    pub fn new(
        db: PgPool,
        config: Config,
        relay: Arc<ConnectionRegistry>,
        email: EmailDispatcher,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            db,
            config: Arc::new(config),
            relay,
            email,
            metrics,
        }
    }

    /// JWT secret for token operations
    pub fn jwt_secret(&self) -> &str {
        &self.config.jwt.secret
    }
}

impl FromRef<AppState> for Arc<Metrics> {
    fn from_ref(state: &AppState) -> Self {
        state.metrics.clone()
    }
}

/// Builds the complete Axum router with all routes and middleware
pub fn build_router(state: AppState) -> Router {
    use crate::routes;

    // Operational endpoints (public, no auth)
    let ops_routes = Router::new()
        .route("/health", get(routes::health::health_check))
        .route("/ready", get(routes::health::ready))
        .route("/metrics", get(metrics::metrics_handler));

    let jwt_layer = axum::middleware::from_fn(create_jwt_middleware(state.jwt_secret().to_owned()));

    // Auth routes: register/login/logout public, me behind the JWT layer
    let auth_routes = Router::new()
        .route("/register", post(routes::auth::register))
        .route("/login", post(routes::auth::login))
        .route("/logout", post(routes::auth::logout))
        .route("/me", get(routes::auth::me).layer(jwt_layer.clone()));

    // Task routes (JWT required; handlers enforce tenant scope)
    let task_routes = Router::new()
        .route("/", post(routes::tasks::create_task))
        .route("/", get(routes::tasks::list_tasks))
        .route("/:id", get(routes::tasks::get_task))
        .route("/:id", put(routes::tasks::update_task))
        .route("/:id", delete(routes::tasks::delete_task))
        .route("/:id/comments", post(routes::tasks::add_comment))
        .layer(jwt_layer.clone());

    // Tenant routes (JWT required; handlers enforce the admin role)
    let tenant_routes = Router::new()
        .route("/", post(routes::tenants::create_tenant))
        .route("/", get(routes::tenants::list_tenants))
        .route("/:id", get(routes::tenants::get_tenant))
        .route("/:id", put(routes::tenants::update_tenant))
        .route("/:id", delete(routes::tenants::delete_tenant))
        .route("/:id/settings", put(routes::tenants::update_settings))
        .route(
            "/:id/subscription",
            put(routes::tenants::update_subscription),
        )
        .layer(jwt_layer);

    let api_routes = Router::new()
        .nest("/auth", auth_routes)
        .nest("/tasks", task_routes)
        .nest("/tenants", tenant_routes);

    // CORS: permissive in development, origin allowlist in production
    let cors = if state.config.api.cors_origins.contains(&"*".to_string()) {
        CorsLayer::permissive()
    } else {
        let origins: Vec<HeaderValue> = state
            .config
            .api
            .cors_origins
            .iter()
            .filter_map(|origin| origin.parse().ok())
            .collect();

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([
                Method::GET,
                Method::POST,
                Method::PUT,
                Method::DELETE,
                Method::OPTIONS,
            ])
            .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
            .allow_credentials(true)
            .max_age(std::time::Duration::from_secs(3600))
    };

    Router::new()
        .merge(ops_routes)
        .route("/ws", get(routes::ws::ws_handler))
        .nest("/api", api_routes)
        // route_layer so MatchedPath is populated; unrouted 404s are not
        // counted
        .route_layer(axum::middleware::from_fn_with_state(
            state.metrics.clone(),
            metrics::track_metrics,
        ))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(TimeoutLayer::new(REQUEST_TIMEOUT))
        .layer(cors)
        .layer(SecurityHeadersLayer::new(state.config.api.production))
        .with_state(state)
}
