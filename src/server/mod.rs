//! The HTTP record store: axum routes over a [`LocalGateway`].

mod bugs;
mod health;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderValue, Method};
use axum::Router;
use tower_http::cors::{AllowMethods, AllowOrigin, Any, CorsLayer};
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::{info, warn, Level};

use crate::config::{CorsConfig, ServerConfig};
use crate::error::{BugError, Result};
use crate::gateway::{BugGateway, LocalGateway};

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub bugs: Arc<dyn BugGateway>,
}

impl AppState {
    pub fn new(gateway: impl BugGateway + 'static) -> Self {
        Self {
            bugs: Arc::new(gateway),
        }
    }
}

/// Build the full application router. Used by [`serve`] and by tests.
pub fn build_router(state: AppState, cors: &CorsConfig) -> Result<Router> {
    let cors = build_cors_layer(cors)?;

    Ok(Router::new()
        .merge(health::router())
        .merge(bugs::router())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors)
        .with_state(state))
}

/// CORS layer from configuration. A `*` origin allows any origin without
/// credentials; an explicit list allows credentials.
pub fn build_cors_layer(config: &CorsConfig) -> Result<CorsLayer> {
    let methods = config
        .methods()
        .into_iter()
        .map(|m| {
            Method::from_bytes(m.to_ascii_uppercase().as_bytes())
                .map_err(|e| BugError::Config(format!("invalid CORS method '{}': {}", m, e)))
        })
        .collect::<Result<Vec<_>>>()?;

    let layer = CorsLayer::new()
        .allow_methods(AllowMethods::list(methods))
        .allow_headers([CONTENT_TYPE])
        .max_age(Duration::from_secs(config.max_age_secs));

    if config.allows_any_origin() {
        return Ok(layer.allow_origin(Any));
    }

    let origins = config
        .origins()
        .into_iter()
        .map(|o| {
            HeaderValue::from_str(o)
                .map_err(|e| BugError::Config(format!("invalid CORS origin '{}': {}", o, e)))
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(layer
        .allow_origin(AllowOrigin::list(origins))
        .allow_credentials(true))
}

/// Open the database and serve until Ctrl-C or SIGTERM.
pub async fn serve(config: &ServerConfig) -> anyhow::Result<()> {
    let gateway = LocalGateway::open(&config.database_path)?;
    let app = build_router(AppState::new(gateway), &config.cors)?;

    let listener = tokio::net::TcpListener::bind(&config.bind)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind))?;
    info!(addr = %listener.local_addr()?, "bug store listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("received Ctrl-C, shutting down"),
        () = terminate => info!("received SIGTERM, shutting down"),
    }
}
