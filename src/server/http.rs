//! HTTP server: routes, shared state and lifecycle.

use axum::{
    Json, Router,
    extract::{Query, State},
    http::{Method, header},
    routing::{get, post},
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::broadcast;
use tower_http::cors::{Any, CorsLayer};

use super::poll::{CHANNEL_CAPACITY, run_poll_loop};
use super::protocol::{
    HealthResponse, KillRequest, KillResponse, LogsRequest, LogsResponse, ServerMessage,
};
use crate::config::Settings;
use crate::snapshot::Collector;
use crate::{Error, Result, commands};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Broadcast channel feeding every websocket client
    pub update_tx: broadcast::Sender<String>,
    pub collector: Collector,
    pub settings: Arc<Settings>,
}

impl AppState {
    pub fn new(collector: Collector, settings: Settings) -> Self {
        let (update_tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self {
            update_tx,
            collector,
            settings: Arc::new(settings),
        }
    }
}

/// All routes, with CORS open to any origin.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE]);

    Router::new()
        .route("/ws", get(super::websocket::ws_handler))
        .route("/api/snapshot", get(get_snapshot))
        .route("/api/logs", get(get_logs))
        .route("/api/kill", post(kill_process))
        .route("/api/health", get(health))
        .layer(cors)
        .with_state(state)
}

/// Run the server until Ctrl+C.
pub async fn start_server(settings: Settings, collector: Collector) -> Result<()> {
    let host_addr: std::net::IpAddr = settings
        .host
        .parse()
        .map_err(|e| {
            Error::InvalidInput(format!(
                "Invalid host address '{}': {}",
                settings.host, e
            ))
        })?;
    let addr = SocketAddr::from((host_addr, settings.port));
    let period = settings.poll_interval();

    let state = AppState::new(collector, settings);

    let poller = tokio::spawn(run_poll_loop(
        state.collector.clone(),
        state.update_tx.clone(),
        period,
    ));

    let app = router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, interval_ms = period.as_millis() as u64, "fishtank listening");
    eprintln!("fishtank serving at http://{} (websocket at /ws)", addr);
    eprintln!("Press Ctrl+C to stop");

    let shutdown = async {
        let _ = tokio::signal::ctrl_c().await;
        tracing::info!("shutting down");
    };

    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await;
    poller.abort();
    served?;

    Ok(())
}

/// One snapshot on demand, in the websocket envelope
async fn get_snapshot(State(state): State<AppState>) -> Json<ServerMessage> {
    Json(ServerMessage::Processes(state.collector.collect().await))
}

async fn get_logs(
    State(state): State<AppState>,
    Query(query): Query<LogsRequest>,
) -> Json<LogsResponse> {
    Json(
        commands::logs(
            &state.collector,
            &query.id,
            &query.kind,
            state.settings.log_tail_lines,
        )
        .await,
    )
}

async fn kill_process(
    State(state): State<AppState>,
    Json(request): Json<KillRequest>,
) -> Json<KillResponse> {
    Json(commands::kill(&state.collector, &request).await)
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse::default())
}
