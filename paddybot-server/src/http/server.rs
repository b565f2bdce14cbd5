//! Axum server setup
//!
//! Host sequence:
//! - `on_startup` (database, then cache) before the listener is bound
//! - serve until SIGINT/SIGTERM, draining in-flight requests
//! - `on_shutdown` (database, then cache) once axum has returned

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use paddybot_core::Settings;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use super::routes;
use crate::cache::CacheManager;
use crate::db::DatabasePool;
use crate::lifecycle::{Lifecycle, LifecycleError};

/// Shared application state
pub struct AppState {
    pub settings: Arc<Settings>,
    pub db: Arc<DatabasePool>,
    pub cache: Arc<CacheManager>,
}

impl AppState {
    /// Build both managers, uninitialized.
    pub fn new(settings: Settings) -> Self {
        Self {
            db: Arc::new(DatabasePool::new(settings.database.clone())),
            cache: Arc::new(CacheManager::new(settings.cache.clone())),
            settings: Arc::new(settings),
        }
    }

    /// Lifecycle over this state's resources: database first, then cache.
    pub fn lifecycle(&self) -> Lifecycle {
        Lifecycle::new()
            .with(self.db.clone())
            .with(self.cache.clone())
    }
}

/// Build the application router with all routes
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .merge(routes::health::router())
        .merge(routes::users::router())
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Run the HTTP server until SIGINT or SIGTERM.
pub async fn run_server(settings: Settings) -> Result<(), ServerError> {
    let host = settings.app.host.clone();
    let port = settings.app.port;
    let state = Arc::new(AppState::new(settings));
    let lifecycle = state.lifecycle();

    lifecycle.on_startup().await?;

    let listener = match TcpListener::bind((host.as_str(), port)).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!(%host, port, error = %e, "Failed to bind");
            lifecycle.on_shutdown().await;
            return Err(e.into());
        }
    };

    serve(&lifecycle, build_router(state), listener, shutdown_signal()).await
}

/// Serve on an already bound listener until `shutdown` resolves, then close
/// the lifecycle's resources.
///
/// Resources must already be initialized. They are closed even when axum
/// returns an error.
pub async fn serve<F>(
    lifecycle: &Lifecycle,
    app: Router,
    listener: TcpListener,
    shutdown: F,
) -> Result<(), ServerError>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr: SocketAddr = listener.local_addr()?;
    tracing::info!("Server listening on {}", addr);

    let result = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await;

    tracing::info!("Stopped accepting requests, closing resources");
    lifecycle.on_shutdown().await;

    result?;
    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM).
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, starting shutdown");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, starting shutdown");
        }
    }
}

/// Server error type
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error(transparent)]
    Startup(#[from] LifecycleError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
