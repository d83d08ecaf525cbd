//! RPC router — dispatches JSON-RPC method calls to engine operations
//!
//! Every analytic method answers with structured JSON plus a `text` field
//! holding the same rendering the HTTP text endpoints serve.

use resonance_core::{Error, EventMessage, MomentInput, MomentReceipt, RpcResponse};
use resonance_engine::{render, ResonanceEngine};
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, info};

/// Connection context passed to RPC handlers.
pub struct ConnectionContext {
    pub authenticated: bool,
    pub engine: Arc<ResonanceEngine>,
    pub events_tx: broadcast::Sender<EventMessage>,
}

/// Result type for RPC handlers. Errors map to JSON-RPC codes via
/// [`Error::rpc_code`].
pub type RpcResult = resonance_core::Result<Value>;

/// Route an RPC method call to the appropriate handler.
pub async fn route_rpc(method: &str, params: Value, ctx: &ConnectionContext) -> RpcResult {
    if !ctx.authenticated && method != "auth" {
        return Err(Error::auth_failed("not authenticated"));
    }

    debug!("rpc: {}", method);
    match method {
        "moment.record" => handle_moment_record(params, ctx).await,
        "state.get" => handle_state_get(ctx).await,
        "patterns.detect" => handle_patterns_detect(params, ctx).await,
        "couplings.visualize" => handle_couplings_visualize(ctx).await,
        "synthesis.suggest" => handle_synthesis_suggest(ctx).await,
        "harmony.check" => handle_harmony_check(ctx).await,
        "engine.reset" => handle_engine_reset(ctx).await,
        "health" => handle_health(ctx).await,
        "echo" => Ok(params),
        _ => Err(Error::MethodNotFound(method.to_string())),
    }
}

/// Convert an RPC result to an RpcResponse.
pub fn to_response(id: &str, result: RpcResult) -> RpcResponse {
    match result {
        Ok(value) => RpcResponse::ok(id, value),
        Err(e) => RpcResponse::error(id, &e),
    }
}

fn to_json<T: serde::Serialize>(value: &T) -> RpcResult {
    Ok(serde_json::to_value(value)?)
}

/// Ingest one moment and announce it to every connected client.
///
/// Shared by the `moment.record` RPC and `POST /moments`.
pub fn record_and_broadcast(
    engine: &ResonanceEngine,
    events_tx: &broadcast::Sender<EventMessage>,
    input: MomentInput,
) -> MomentReceipt {
    let (moment, receipt) = engine.record(input);
    // No receivers is fine.
    let _ = events_tx.send(EventMessage::moment_recorded(&moment, &receipt));
    receipt
}

/// Clear the engine and tell every connected client.
pub fn reset_and_broadcast(engine: &ResonanceEngine, events_tx: &broadcast::Sender<EventMessage>) {
    engine.reset();
    let _ = events_tx.send(EventMessage::reset());
}

// ---------------------------------------------------------------------------
// moment.record — ingest one moment
// ---------------------------------------------------------------------------

async fn handle_moment_record(params: Value, ctx: &ConnectionContext) -> RpcResult {
    let input: MomentInput = serde_json::from_value(params)
        .map_err(|e| Error::invalid_params(format!("invalid moment: {}", e)))?;
    if input.source.is_empty() {
        return Err(Error::invalid_params("missing required param: source"));
    }

    let receipt = record_and_broadcast(&ctx.engine, &ctx.events_tx, input);
    Ok(serde_json::json!({
        "moment_id": receipt.moment_id,
        "timestamp": receipt.timestamp,
        "summary": receipt.summary,
        "text": receipt.summary,
    }))
}

// ---------------------------------------------------------------------------
// state.get — full aggregate snapshot
// ---------------------------------------------------------------------------

async fn handle_state_get(ctx: &ConnectionContext) -> RpcResult {
    to_json(&ctx.engine.get_state())
}

// ---------------------------------------------------------------------------
// patterns.detect — strongest patterns above a frequency floor
// ---------------------------------------------------------------------------

async fn handle_patterns_detect(params: Value, ctx: &ConnectionContext) -> RpcResult {
    let min_frequency = match &params["min_frequency"] {
        Value::Null => None,
        v => {
            let floor = v.as_u64().ok_or_else(|| {
                Error::invalid_params("min_frequency must be a non-negative integer")
            })?;
            Some(floor as usize)
        }
    };

    let patterns = ctx.engine.detect_patterns(min_frequency);
    Ok(serde_json::json!({
        "patterns": to_json(&patterns)?,
        "text": render::patterns(&patterns),
    }))
}

// ---------------------------------------------------------------------------
// couplings.visualize — recently active couplings as a text graph
// ---------------------------------------------------------------------------

async fn handle_couplings_visualize(ctx: &ConnectionContext) -> RpcResult {
    let active = ctx
        .engine
        .active_couplings(resonance_engine::engine::VISUALIZE_COUPLING_SECS);
    Ok(serde_json::json!({
        "couplings": to_json(&active)?,
        "text": render::coupling_graph(&active),
    }))
}

// ---------------------------------------------------------------------------
// synthesis.suggest — recommended next action, if any
// ---------------------------------------------------------------------------

async fn handle_synthesis_suggest(ctx: &ConnectionContext) -> RpcResult {
    let suggestion = ctx.engine.suggest_synthesis();
    Ok(serde_json::json!({
        "suggestion": to_json(&suggestion)?,
        "text": render::suggestion(suggestion.as_ref()),
    }))
}

// ---------------------------------------------------------------------------
// harmony.check — resonance status and the metrics behind it
// ---------------------------------------------------------------------------

async fn handle_harmony_check(ctx: &ConnectionContext) -> RpcResult {
    let report = ctx.engine.check_harmony();
    let mut value = to_json(&report)?;
    value["text"] = Value::String(render::harmony(&report));
    Ok(value)
}

// ---------------------------------------------------------------------------
// engine.reset — clear every table
// ---------------------------------------------------------------------------

async fn handle_engine_reset(ctx: &ConnectionContext) -> RpcResult {
    reset_and_broadcast(&ctx.engine, &ctx.events_tx);
    info!("Engine reset via RPC");
    Ok(serde_json::json!({
        "ok": true,
        "text": render::RESET_CONFIRMATION,
    }))
}

// ---------------------------------------------------------------------------
// health — gateway health check
// ---------------------------------------------------------------------------

async fn handle_health(ctx: &ConnectionContext) -> RpcResult {
    Ok(health_json(&ctx.engine))
}

/// Body shared by the `health` RPC and `GET /health`.
pub fn health_json(engine: &ResonanceEngine) -> Value {
    serde_json::json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
        "moments": engine.moment_count(),
        "patterns": engine.pattern_count(),
        "couplings": engine.coupling_count(),
        "harmonics": engine.harmonic_count(),
    })
}
