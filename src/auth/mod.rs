//! Authentication for the iTwin platform APIs
//!
//! Clients never acquire tokens themselves: the caller injects a
//! [`TokenProvider`] that is asked for a token before every request.

mod token;

pub use token::{get_env_auth, StaticTokenProvider, TokenProvider};

/// Source of authentication token
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthSource {
    /// Token passed explicitly (CLI flag or caller code)
    Explicit,
    /// Token from environment variable
    EnvVar,
}
