//! Resonance Core - Types, protocol, configuration, and error handling

pub mod config;
pub mod error;
pub mod protocol;
pub mod types;

pub use config::{EngineConfig, ResonanceConfig};
pub use error::{Error, Result};
pub use protocol::*;
pub use types::*;
