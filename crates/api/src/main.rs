use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use ctrack_api::config::{LogFormat, ServerConfig};
use ctrack_api::realtime::Broadcaster;
use ctrack_api::router::build_app_router;
use ctrack_api::{bootstrap, state, ws};

use state::AppState;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Configuration ---
    let config = ServerConfig::from_env();

    // --- Tracing ---
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "ctrack_api=debug,tower_http=debug".into());
    match config.log_format {
        LogFormat::Text => tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init(),
        LogFormat::Json => tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init(),
    }
    tracing::info!(
        host = %config.host,
        port = %config.port,
        strict_approval = config.strict_approval,
        "Loaded server configuration"
    );

    // --- Database ---
    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");

    let pool = ctrack_db::create_pool(&database_url, config.database_max_connections)
        .await
        .expect("Failed to connect to database");
    tracing::info!("Database connection pool created");

    ctrack_db::health_check(&pool)
        .await
        .expect("Database health check failed");
    tracing::info!("Database health check passed");

    ctrack_db::run_migrations(&pool)
        .await
        .expect("Failed to run database migrations");
    tracing::info!("Database migrations applied");

    if let Some(admin) = &config.bootstrap_admin {
        bootstrap::ensure_admin(&pool, admin)
            .await
            .expect("Failed to seed bootstrap admin");
    }

    // --- Realtime connections ---
    let connections = Arc::new(ws::ConnectionRegistry::new());
    let heartbeat_handle = ws::spawn_heartbeat(Arc::clone(&connections), ws::HEARTBEAT_PERIOD);

    // --- Event bus ---
    let event_bus = Arc::new(ctrack_events::EventBus::default());

    // Spawn the realtime broadcaster (bus -> every WebSocket client).
    let broadcaster = Broadcaster::new(Arc::clone(&connections));
    let broadcaster_handle = tokio::spawn(broadcaster.run(event_bus.subscribe()));
    tracing::info!("Realtime broadcaster started");

    // --- App state ---
    let state = AppState {
        pool,
        config: Arc::new(config.clone()),
        connections: Arc::clone(&connections),
        event_bus: Arc::clone(&event_bus),
    };

    let app = build_app_router(state, &config);

    // --- Start server ---
    let addr = SocketAddr::new(
        config.host.parse().expect("Invalid HOST address"),
        config.port,
    );
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    // --- Post-shutdown cleanup ---
    tracing::info!("Server stopped accepting connections, cleaning up");

    // The router (and with it every other bus handle) is gone; dropping the
    // last sender closes the channel and ends the broadcaster loop.
    drop(event_bus);
    let _ = tokio::time::timeout(Duration::from_secs(5), broadcaster_handle).await;
    tracing::info!("Realtime broadcaster stopped");

    let closed = connections.close_all().await;
    tracing::info!(closed, "Closed remaining WebSocket connections");

    heartbeat_handle.abort();
    tracing::info!("Heartbeat task stopped");

    tracing::info!("Graceful shutdown complete");
}

/// Wait for SIGINT or SIGTERM (Unix) to start graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
