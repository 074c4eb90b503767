use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use relay_engine::Dispatcher;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::client::{self, ClientRegistry};

/// Server configuration.
#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub heartbeat_interval: Duration,
    /// Directory served under `downloads_prefix`.
    pub downloads_dir: PathBuf,
    pub downloads_prefix: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: 3000,
            heartbeat_interval: Duration::from_secs(30),
            downloads_dir: PathBuf::from("downloads"),
            downloads_prefix: "/downloads".into(),
        }
    }
}

/// Shared application state passed to Axum handlers.
#[derive(Clone)]
pub struct AppState {
    pub dispatcher: Arc<Dispatcher>,
    pub client_registry: Arc<ClientRegistry>,
    pub heartbeat_interval: Duration,
}

/// Build the Axum router with all routes.
///
/// WebSocket upgrades are accepted on both `/` and `/ws`.
pub fn build_router(state: AppState, config: &ServerConfig) -> Router {
    Router::new()
        .route("/", get(ws_handler))
        .route("/ws", get(ws_handler))
        .route("/health", get(health_handler))
        .nest_service(&config.downloads_prefix, ServeDir::new(&config.downloads_dir))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// Create and start the server. Returns a handle to shut it down.
pub async fn start(config: ServerConfig, dispatcher: Arc<Dispatcher>) -> Result<ServerHandle, std::io::Error> {
    let client_registry = Arc::new(ClientRegistry::new());
    let tools = dispatcher.registry().count();

    let app_state = AppState {
        dispatcher,
        client_registry: Arc::clone(&client_registry),
        heartbeat_interval: config.heartbeat_interval,
    };

    let router = build_router(app_state, &config);
    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    let local_addr = listener.local_addr()?;

    tracing::info!(addr = %local_addr, tools, downloads = %config.downloads_dir.display(), "relay server started");

    let shutdown = CancellationToken::new();
    let signal = shutdown.clone();
    let server = tokio::spawn(async move {
        let result = axum::serve(listener, router)
            .with_graceful_shutdown(async move { signal.cancelled().await })
            .await;
        if let Err(e) = result {
            tracing::error!(error = %e, "server terminated");
        }
    });

    Ok(ServerHandle {
        addr: local_addr,
        client_registry,
        shutdown,
        server,
    })
}

/// Handle returned by `start()`; keeps the server task alive.
pub struct ServerHandle {
    addr: SocketAddr,
    client_registry: Arc<ClientRegistry>,
    shutdown: CancellationToken,
    server: tokio::task::JoinHandle<()>,
}

impl ServerHandle {
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    pub fn client_count(&self) -> usize {
        self.client_registry.count()
    }

    /// Stop accepting connections and wait for the server task to exit.
    pub async fn shutdown(self) {
        self.shutdown.cancel();
        let _ = self.server.await;
        tracing::info!("relay server stopped");
    }
}

/// WebSocket upgrade handler.
async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Handle a new WebSocket connection.
async fn handle_socket(socket: WebSocket, state: AppState) {
    let (client_id, slot) = state.client_registry.register();
    tracing::info!(client_id = %client_id, "WebSocket client connected");

    client::handle_ws_connection(
        socket,
        client_id,
        slot,
        state.client_registry,
        state.dispatcher,
        state.heartbeat_interval,
    )
    .await;
}

/// Health check HTTP endpoint.
async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "tools": state.dispatcher.registry().count(),
        "clients": state.client_registry.count(),
    }))
}
