//! WebSocket protocol — JSON-RPC style
//!
//! Wire format:
//!
//! Client → Server (RPC request):
//!   { "id": "req-1", "method": "moment.record", "params": { "source": "creative", "type": "insight", "concepts": ["flow"] } }
//!
//! Server → Client (RPC response):
//!   { "id": "req-1", "result": { "moment_id": "moment-...", "summary": "..." } }
//!   { "id": "req-1", "error": { "code": -32602, "message": "invalid params" } }
//!
//! Server → Client (Event push, no id):
//!   { "event": "moment", "data": { "moment": { ... }, "summary": "..." } }
//!
//! Authentication:
//!   { "token": "secret" }  (shorthand)
//!   { "id": "1", "method": "auth", "params": { "token": "secret" } }  (RPC style)

use crate::error::Error;
use crate::types::{Moment, MomentReceipt};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Client → Server: JSON-RPC style
// ---------------------------------------------------------------------------

/// RPC request from client.
#[derive(Debug, Clone, Deserialize)]
pub struct RpcRequest {
    pub id: String,
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Value,
}

// ---------------------------------------------------------------------------
// Server → Client: RPC response
// ---------------------------------------------------------------------------

/// RPC response to client.
#[derive(Debug, Clone, Serialize)]
pub struct RpcResponse {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcError>,
}

impl RpcResponse {
    /// Successful response with a result value.
    pub fn ok(id: impl Into<String>, result: serde_json::Value) -> Self {
        Self {
            id: id.into(),
            result: Some(result),
            error: None,
        }
    }

    /// Error response.
    pub fn err(id: impl Into<String>, code: i32, message: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            result: None,
            error: Some(RpcError {
                code,
                message: message.into(),
            }),
        }
    }

    /// Error response carrying the code [`Error::rpc_code`] assigns.
    pub fn error(id: impl Into<String>, error: &Error) -> Self {
        Self::err(id, error.rpc_code(), error.to_string())
    }
}

/// RPC error detail.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcError {
    pub code: i32,
    pub message: String,
}

// ---------------------------------------------------------------------------
// Server → Client: Event push
// ---------------------------------------------------------------------------

/// Server-pushed event (no id, no request correlation).
#[derive(Debug, Clone, Serialize)]
pub struct EventMessage {
    pub event: String,
    pub data: serde_json::Value,
}

impl EventMessage {
    pub fn new(event: impl Into<String>, data: serde_json::Value) -> Self {
        Self {
            event: event.into(),
            data,
        }
    }

    /// A moment was ingested.
    pub fn moment_recorded(moment: &Moment, receipt: &MomentReceipt) -> Self {
        Self::new(
            "moment",
            serde_json::json!({
                "moment": moment,
                "moment_id": receipt.moment_id,
                "summary": receipt.summary,
            }),
        )
    }

    /// All engine tables were cleared.
    pub fn reset() -> Self {
        Self::new("reset", serde_json::json!({}))
    }

    /// Auth result event (for shorthand auth without RPC id).
    pub fn auth_result(ok: bool, error: Option<&str>) -> Self {
        Self::new("auth", serde_json::json!({ "ok": ok, "error": error }))
    }

    /// Info event (sent on connection).
    pub fn info(version: &str, moments: usize, patterns: usize) -> Self {
        Self::new(
            "info",
            serde_json::json!({ "version": version, "moments": moments, "patterns": patterns }),
        )
    }

    /// Pong event.
    pub fn pong() -> Self {
        Self::new("pong", serde_json::json!({}))
    }
}

// ---------------------------------------------------------------------------
// Unified incoming message — handles both RPC and auth shorthand
// ---------------------------------------------------------------------------

/// Unified incoming message. Serde tries RPC first, then Auth shorthand.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum IncomingMessage {
    /// Full RPC request: { "id": "...", "method": "...", "params": ... }
    Rpc(RpcRequest),
    /// Auth shorthand: { "token": "..." } or { "token": null }
    Auth { token: Option<String> },
}
