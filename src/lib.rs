//! Replay tooling shared by the `resonance` binary and its integration tests.

pub mod parser;
pub mod replay;
