//! Gateway server: engine construction, HTTP routes, WebSocket upgrade

use crate::auth::ResolvedAuth;
use crate::rpc::{health_json, record_and_broadcast, reset_and_broadcast};
use crate::ws::{handle_connection, WsState};
use axum::{
    extract::{Query, State, WebSocketUpgrade},
    http::{header, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use resonance_core::{EngineConfig, GatewayConfig, MomentInput};
use resonance_engine::{render, ResonanceEngine};
use serde::Deserialize;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

/// Router state.
pub type GatewayState = Arc<WsState>;

/// Everything `start_gateway` needs.
#[derive(Debug, Clone, Default)]
pub struct ServerConfig {
    pub gateway: GatewayConfig,
    pub engine: EngineConfig,
}

pub async fn start_gateway(config: ServerConfig) -> anyhow::Result<()> {
    let auth = ResolvedAuth::from_env(&config.gateway.auth);
    if !auth.is_open() && auth.token.is_none() {
        warn!("Token auth enabled but no token configured; every client will be rejected");
    }

    let engine = Arc::new(ResonanceEngine::new(config.engine)?);
    let state = Arc::new(WsState::new(engine, auth, config.gateway.port));
    let app = build_router(state);

    let bind_addr: SocketAddr =
        format!("{}:{}", config.gateway.bind.to_addr(), config.gateway.port).parse()?;

    info!("Resonance Gateway v{} starting", env!("CARGO_PKG_VERSION"));
    info!("  Listening on: {}", bind_addr);
    info!("  WebSocket: ws://{}/ws", bind_addr);
    info!("  Auth mode: {:?}", config.gateway.auth.mode);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Gateway shutdown complete");
    Ok(())
}

pub fn build_router(state: GatewayState) -> Router {
    Router::new()
        .route("/ws", get(ws_handler))
        .route("/health", get(health_handler))
        .route("/state", get(state_handler))
        .route("/patterns", get(patterns_handler))
        .route("/couplings", get(couplings_handler))
        .route("/synthesis", get(synthesis_handler))
        .route("/harmony", get(harmony_handler))
        .route("/moments", post(record_handler))
        .route("/reset", post(reset_handler))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any))
        .with_state(state)
}

/// Resolves on Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => warn!("Received Ctrl+C, shutting down..."),
        _ = terminate => warn!("Received terminate signal, shutting down..."),
    }
}

async fn ws_handler(ws: WebSocketUpgrade, State(state): State<GatewayState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_connection(socket, state))
}

async fn health_handler(State(state): State<GatewayState>) -> impl IntoResponse {
    let mut body = health_json(&state.engine);
    body["uptime_secs"] = state.started_at.elapsed().as_secs().into();
    body["port"] = state.port.into();
    Json(body)
}

async fn state_handler(State(state): State<GatewayState>) -> impl IntoResponse {
    Json(state.engine.get_state())
}

#[derive(Debug, Deserialize)]
struct PatternQuery {
    min_frequency: Option<usize>,
}

async fn patterns_handler(
    State(state): State<GatewayState>,
    Query(query): Query<PatternQuery>,
) -> impl IntoResponse {
    Json(state.engine.detect_patterns(query.min_frequency))
}

async fn couplings_handler(State(state): State<GatewayState>) -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        state.engine.visualize_couplings(),
    )
}

async fn synthesis_handler(State(state): State<GatewayState>) -> impl IntoResponse {
    Json(state.engine.suggest_synthesis())
}

async fn harmony_handler(State(state): State<GatewayState>) -> impl IntoResponse {
    Json(state.engine.check_harmony())
}

async fn record_handler(
    State(state): State<GatewayState>,
    Json(input): Json<MomentInput>,
) -> impl IntoResponse {
    if input.source.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({ "error": "Missing required field: source" })),
        )
            .into_response();
    }
    let receipt = record_and_broadcast(&state.engine, &state.events_tx, input);
    (StatusCode::CREATED, Json(receipt)).into_response()
}

async fn reset_handler(State(state): State<GatewayState>) -> impl IntoResponse {
    reset_and_broadcast(&state.engine, &state.events_tx);
    info!("Engine reset via HTTP");
    Json(serde_json::json!({
        "ok": true,
        "message": render::RESET_CONFIRMATION,
    }))
}
