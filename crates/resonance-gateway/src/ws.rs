//! WebSocket connection handling with the JSON-RPC protocol
//!
//! Parses IncomingMessage frames, answers RPCs, and forwards engine events
//! (new moments, resets) to every connected client via broadcast.

use crate::auth::ResolvedAuth;
use crate::rpc::{self, ConnectionContext};
use axum::extract::ws::{Message as WsMessage, WebSocket};
use futures::{SinkExt, StreamExt};
use resonance_core::{Error, EventMessage, IncomingMessage, RpcResponse};
use resonance_engine::ResonanceEngine;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{info, warn};

/// Shared state for WebSocket connections.
pub struct WsState {
    pub auth: ResolvedAuth,
    pub engine: Arc<ResonanceEngine>,
    pub port: u16,
    /// Engine events fan out to all WS clients.
    pub events_tx: broadcast::Sender<EventMessage>,
    pub started_at: std::time::Instant,
}

impl WsState {
    pub fn new(engine: Arc<ResonanceEngine>, auth: ResolvedAuth, port: u16) -> Self {
        let (events_tx, _) = broadcast::channel::<EventMessage>(1024);
        Self {
            auth,
            engine,
            port,
            events_tx,
            started_at: std::time::Instant::now(),
        }
    }
}

/// Handle one WebSocket connection until the client goes away.
pub async fn handle_connection(socket: WebSocket, state: Arc<WsState>) {
    let (mut ws_tx, mut ws_rx) = socket.split();
    let mut events_rx = state.events_tx.subscribe();

    let info_event = EventMessage::info(
        env!("CARGO_PKG_VERSION"),
        state.engine.moment_count(),
        state.engine.pattern_count(),
    );
    if let Ok(json) = serde_json::to_string(&info_event) {
        let _ = ws_tx.send(WsMessage::Text(json)).await;
    }

    let mut authenticated = state.auth.is_open();
    info!("Client connected (authenticated={})", authenticated);

    loop {
        tokio::select! {
            msg = ws_rx.next() => {
                match msg {
                    Some(Ok(WsMessage::Text(text))) => {
                        let responses =
                            handle_text_message(&text, &state, &mut authenticated).await;
                        for response_json in responses {
                            if ws_tx.send(WsMessage::Text(response_json)).await.is_err() {
                                return; // Client disconnected
                            }
                        }
                    }
                    Some(Ok(WsMessage::Ping(_))) => {
                        if let Ok(json) = serde_json::to_string(&EventMessage::pong()) {
                            let _ = ws_tx.send(WsMessage::Text(json)).await;
                        }
                    }
                    Some(Ok(WsMessage::Close(_))) => {
                        info!("Client disconnected");
                        return;
                    }
                    Some(Err(e)) => {
                        warn!("WebSocket error: {}", e);
                        return;
                    }
                    None => return,
                    _ => {} // Binary, Pong
                }
            }

            event = events_rx.recv() => {
                match event {
                    Ok(event_msg) => {
                        if !authenticated {
                            continue;
                        }
                        if let Ok(json) = serde_json::to_string(&event_msg) {
                            if ws_tx.send(WsMessage::Text(json)).await.is_err() {
                                return;
                            }
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        warn!("Client lagged, dropped {} events", n);
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        info!("Event broadcast closed");
                        return;
                    }
                }
            }
        }
    }
}

/// Handle a text frame. Returns JSON strings to send back to the client.
pub async fn handle_text_message(
    text: &str,
    state: &WsState,
    authenticated: &mut bool,
) -> Vec<String> {
    let mut responses = Vec::new();

    match serde_json::from_str::<IncomingMessage>(text) {
        Ok(IncomingMessage::Rpc(req)) => {
            if req.method == "auth" {
                let token = req.params["token"].as_str();
                let resp = match state.auth.verify_token(token) {
                    Ok(()) => {
                        *authenticated = true;
                        info!("Client authenticated (RPC)");
                        RpcResponse::ok(&req.id, serde_json::json!({ "ok": true }))
                    }
                    Err(e) => {
                        warn!("Auth failed: {}", e);
                        RpcResponse::error(&req.id, &e)
                    }
                };
                if let Ok(json) = serde_json::to_string(&resp) {
                    responses.push(json);
                }
                return responses;
            }

            let ctx = ConnectionContext {
                authenticated: *authenticated,
                engine: state.engine.clone(),
                events_tx: state.events_tx.clone(),
            };
            let result = rpc::route_rpc(&req.method, req.params, &ctx).await;
            let resp = rpc::to_response(&req.id, result);
            if let Ok(json) = serde_json::to_string(&resp) {
                responses.push(json);
            }
        }

        Ok(IncomingMessage::Auth { token }) => {
            let evt = match state.auth.verify_token(token.as_deref()) {
                Ok(()) => {
                    *authenticated = true;
                    info!("Client authenticated (shorthand)");
                    EventMessage::auth_result(true, None)
                }
                Err(e) => {
                    warn!("Auth failed: {}", e);
                    EventMessage::auth_result(false, Some(&e.to_string()))
                }
            };
            if let Ok(json) = serde_json::to_string(&evt) {
                responses.push(json);
            }
        }

        Err(e) => {
            warn!("Unparseable message: {}", preview(text, 100));
            let resp = RpcResponse::error("", &Error::InvalidMessage(e.to_string()));
            if let Ok(json) = serde_json::to_string(&resp) {
                responses.push(json);
            }
        }
    }

    responses
}

/// At most `max` bytes of `text`, cut on a char boundary.
fn preview(text: &str, max: usize) -> &str {
    if text.len() <= max {
        return text;
    }
    let mut end = max;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preview_respects_char_boundaries() {
        assert_eq!(preview("short", 100), "short");
        assert_eq!(preview("abcdef", 3), "abc");
        assert_eq!(preview("aé", 2), "a");
    }
}
