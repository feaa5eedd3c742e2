use std::sync::Arc;

use axum::routing::get;
use axum::Router;
use tower_http::cors::CorsLayer;

use avrd_avr::Avr;
use avrd_wled::WledClient;

use crate::routes;

/// Server configuration.
pub struct ServerConfig {
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { port: 8080 }
    }
}

/// Shared application state passed to Axum handlers.
#[derive(Clone)]
pub struct AppState {
    pub avr: Arc<Avr>,
    /// Absent when no lighting controller is configured.
    pub wled: Option<Arc<WledClient>>,
}

/// Build the Axum router with all routes.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(routes::hello))
        .route("/health", get(routes::health))
        .route("/avr", get(routes::avr_status))
        .route("/avr/raw", get(routes::avr_raw))
        .route("/avr/volume/{value}", get(routes::set_volume))
        .route("/avr/power/{state}", get(routes::set_power))
        .route("/avr/mute/{command}", get(routes::set_mute))
        .route("/avr/input/{input}", get(routes::set_input))
        .route("/avr/listening-mode/{mode}", get(routes::set_listening_mode))
        .route("/avr/dimmer/{level}", get(routes::set_dimmer))
        .route("/wled/power/{state}", get(routes::wled_power))
        .route("/wled/brightness/{value}", get(routes::wled_brightness))
        .with_state(state)
        .layer(CorsLayer::permissive())
}

/// Create and start the server. Returns a handle that keeps it alive.
pub async fn start(config: ServerConfig, state: AppState) -> Result<ServerHandle, std::io::Error> {
    let router = build_router(state);
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    let local_addr = listener.local_addr()?;

    tracing::info!(port = local_addr.port(), "facade started");

    let server_handle = tokio::spawn(async move {
        axum::serve(listener, router).await.ok();
    });

    Ok(ServerHandle {
        port: local_addr.port(),
        _server: server_handle,
    })
}

/// Handle returned by `start()`.
pub struct ServerHandle {
    pub port: u16,
    _server: tokio::task::JoinHandle<()>,
}
