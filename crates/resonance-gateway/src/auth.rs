//! Shared-token authentication for WebSocket clients

use resonance_core::{AuthConfig, AuthMode, Error, Result};

/// Environment variable consulted when the config carries no token.
pub const TOKEN_ENV: &str = "RESONANCE_GATEWAY_TOKEN";

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() { return false; }
    let mut diff = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        diff |= x ^ y;
    }
    diff == 0
}

#[derive(Clone, Debug)]
pub struct ResolvedAuth {
    pub mode: AuthMode,
    pub token: Option<String>,
}

impl ResolvedAuth {
    /// Config token wins over the environment.
    pub fn from_config(config: &AuthConfig, env_token: Option<String>) -> Self {
        let token = config.token.clone().or(env_token);
        Self { mode: config.mode.clone(), token }
    }

    pub fn from_env(config: &AuthConfig) -> Self {
        Self::from_config(config, std::env::var(TOKEN_ENV).ok())
    }

    /// Connections start authenticated when no token is required.
    pub fn is_open(&self) -> bool {
        self.mode == AuthMode::None
    }

    pub fn verify_token(&self, provided: Option<&str>) -> Result<()> {
        match self.mode {
            AuthMode::None => Ok(()),
            AuthMode::Token => {
                let expected = self
                    .token
                    .as_deref()
                    .ok_or_else(|| Error::auth_failed("no token configured"))?;
                let provided = provided.ok_or_else(|| Error::auth_failed("token required"))?;
                if !constant_time_eq(expected.as_bytes(), provided.as_bytes()) {
                    return Err(Error::auth_failed("invalid token"));
                }
                Ok(())
            }
        }
    }
}
