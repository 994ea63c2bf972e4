//! # TaskHub API Server
//!
//! Multi-tenant task management backend: REST API, WebSocket notification
//! relay, and best-effort email, backed by PostgreSQL.
//!
//! ## Usage
//!
//! ```bash
//! cargo run -p taskhub-api
//! ```

use std::sync::Arc;

use taskhub_api::{
    app::{build_router, AppState},
    config::Config,
    middleware::metrics::Metrics,
};
use taskhub_shared::{
    db::{migrations, migrations::run_migrations, pool},
    email::{EmailDispatcher, MailTransport, MockMailer, SmtpConfig, SmtpMailer},
    relay::ConnectionRegistry,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "taskhub_api=info,taskhub_shared=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;

    tracing::info!(
        "TaskHub API Server v{} starting",
        env!("CARGO_PKG_VERSION")
    );

    migrations::ensure_database_exists(&config.database.url).await?;

    let db = pool::create_pool(taskhub_shared::db::pool::DatabaseConfig {
        url: config.database.url.clone(),
        max_connections: config.database.max_connections,
        ..Default::default()
    })
    .await?;

    run_migrations(&db).await?;

    let relay = Arc::new(ConnectionRegistry::new());

    // SMTP when enabled; otherwise a recording transport so development
    // runs never send real mail
    let transport: Arc<dyn MailTransport> = if config.smtp.enabled {
        Arc::new(SmtpMailer::new(&SmtpConfig {
            host: config.smtp.host.clone(),
            port: config.smtp.port,
            username: config.smtp.username.clone(),
            password: config.smtp.password.clone(),
            from: config.smtp.from.clone(),
        })?)
    } else {
        tracing::warn!("SMTP disabled; outbound email will not be delivered");
        Arc::new(MockMailer::new())
    };

    let (email, email_worker) = EmailDispatcher::start(transport, config.smtp.queue_capacity);

    let metrics = Metrics::new();
    let bind_address = config.bind_address();
    let state = AppState::new(db.clone(), config, relay, email, metrics);
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&bind_address).await?;
    tracing::info!("Server listening on http://{}", bind_address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // All dispatcher handles dropped with the router; the worker drains
    // what is left in the queue and exits.
    tracing::info!("Server stopped, draining email queue");
    if let Err(e) = email_worker.await {
        tracing::warn!("Email worker ended abnormally: {}", e);
    }
    pool::close_pool(db).await;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
    }
    tracing::info!("Shutdown signal received");
}
