use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use sqlx::PgPool;
use tokio::net::TcpListener;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use grantline_core::TokenEndpoint;
use grantline_core::config::Config;
use grantline_core::store::PgStore;

use crate::routes;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub endpoint: Arc<TokenEndpoint>,
}

impl AppState {
    pub fn new(config: Config, endpoint: TokenEndpoint) -> Self {
        Self {
            config: Arc::new(config),
            endpoint: Arc::new(endpoint),
        }
    }
}

/// Router with all routes and middleware, ready to serve.
pub fn app(state: AppState) -> Router {
    let cors = build_cors(&state.config);
    Router::new()
        .merge(routes::router())
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn serve(config: Config, db: PgPool) -> anyhow::Result<()> {
    let addr = SocketAddr::new(config.server.host.parse()?, config.server.port);

    let store = Arc::new(PgStore::new(db));
    let endpoint = TokenEndpoint::from_config(&config, store.clone(), store)?;
    tracing::info!(grant_types = ?endpoint.registry().grant_types(), "token endpoint ready");

    let app = app(AppState::new(config, endpoint));

    tracing::info!(%addr, "starting server");
    let listener = TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

fn build_cors(config: &Config) -> CorsLayer {
    let origins = &config.server.cors_origins;
    if origins.is_empty() {
        tracing::warn!("no cors_origins configured, using permissive CORS");
        CorsLayer::permissive()
    } else {
        let origins: Vec<_> = origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(origins))
            .allow_methods([axum::http::Method::GET, axum::http::Method::POST])
            .allow_headers([
                axum::http::header::CONTENT_TYPE,
                axum::http::header::AUTHORIZATION,
            ])
    }
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();

    #[cfg(unix)]
    {
        let mut sigterm =
            match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                Ok(signal) => signal,
                Err(e) => {
                    tracing::warn!(error = %e, "failed to install SIGTERM handler");
                    ctrl_c.await.ok();
                    tracing::info!("received CTRL+C");
                    return;
                }
            };

        tokio::select! {
            _ = ctrl_c => tracing::info!("received CTRL+C"),
            _ = sigterm.recv() => tracing::info!("received SIGTERM"),
        }
    }

    #[cfg(not(unix))]
    {
        ctrl_c.await.ok();
        tracing::info!("received CTRL+C");
    }
}
