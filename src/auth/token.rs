//! Access token providers

use crate::auth::AuthSource;
use crate::error::{Error, Result};
use async_trait::async_trait;
use std::env;

/// Async access token getter injected into every API client
#[async_trait]
pub trait TokenProvider: Send + Sync {
    /// Value for the `Authorization` header, e.g. `Bearer eyJ...`
    async fn access_token(&self) -> Result<String>;
}

/// Provider returning a fixed token
#[derive(Debug, Clone)]
pub struct StaticTokenProvider {
    token: String,
    source: AuthSource,
}

impl StaticTokenProvider {
    /// Wrap a token, adding the `Bearer` scheme when missing
    pub fn new(token: impl Into<String>) -> Self {
        Self::with_source(token.into(), AuthSource::Explicit)
    }

    fn with_source(token: String, source: AuthSource) -> Self {
        let token = token.trim();
        let token = if token.starts_with("Bearer ") || token.starts_with("Basic ") {
            token.to_string()
        } else {
            format!("Bearer {token}")
        };
        Self { token, source }
    }

    /// Where the token was obtained from
    pub const fn source(&self) -> AuthSource {
        self.source
    }
}

#[async_trait]
impl TokenProvider for StaticTokenProvider {
    async fn access_token(&self) -> Result<String> {
        Ok(self.token.clone())
    }
}

/// Get a token from the environment
///
/// Priority:
/// 1. `ITWIN_ACCESS_TOKEN` environment variable
/// 2. `IMJS_ACCESS_TOKEN` environment variable
pub fn get_env_auth() -> Result<StaticTokenProvider> {
    for var in ["ITWIN_ACCESS_TOKEN", "IMJS_ACCESS_TOKEN"] {
        match env::var(var) {
            Ok(token) if !token.trim().is_empty() => {
                return Ok(StaticTokenProvider::with_source(token, AuthSource::EnvVar));
            }
            _ => {}
        }
    }

    Err(Error::Auth(
        "No access token found. Pass --token or set ITWIN_ACCESS_TOKEN".to_string(),
    ))
}
