//! Resonance Gateway - JSON-RPC over WebSocket plus a small HTTP surface

pub mod auth;
pub mod rpc;
pub mod server;
pub mod ws;

pub use server::{build_router, start_gateway, GatewayState, ServerConfig};
