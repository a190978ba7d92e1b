//! Error types for hubauth.

use thiserror::Error;

use crate::challenge::OtpDelivery;
use crate::host::HostAddress;

/// Normalized authentication errors across hosts.
///
/// `TwoFactorRequired` and `TwoFactorCodeRejected` drive the interactive
/// retry loop inside an exchange and are never returned from
/// [`AuthOrchestrator::login`](crate::orchestrator::AuthOrchestrator::login);
/// `Cancelled` is mapped to
/// [`LoginOutcome::Cancelled`](crate::orchestrator::LoginOutcome) there.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid credentials")]
    InvalidCredentials,
    #[error("Two-factor code required ({delivery})")]
    TwoFactorRequired { delivery: OtpDelivery },
    #[error("Two-factor code rejected")]
    TwoFactorCodeRejected,
    #[error("Login cancelled")]
    Cancelled,
    #[error("Login already in progress for {0}")]
    LoginInProgress(HostAddress),
    #[error("No stored credential for {0}")]
    NoStoredCredential(HostAddress),
    #[error("Invalid host address: {0}")]
    InvalidHost(String),
    #[error("Network error: {0}")]
    Network(String),
    #[error("Storage error: {0}")]
    Storage(String),
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl From<reqwest::Error> for AuthError {
    fn from(error: reqwest::Error) -> Self {
        Self::Network(error.to_string())
    }
}

impl From<std::io::Error> for AuthError {
    fn from(error: std::io::Error) -> Self {
        Self::Storage(error.to_string())
    }
}

impl From<serde_json::Error> for AuthError {
    fn from(error: serde_json::Error) -> Self {
        Self::Storage(error.to_string())
    }
}

impl From<toml::de::Error> for AuthError {
    fn from(error: toml::de::Error) -> Self {
        Self::Storage(error.to_string())
    }
}

impl From<toml::ser::Error> for AuthError {
    fn from(error: toml::ser::Error) -> Self {
        Self::Storage(error.to_string())
    }
}

/// Convenience alias.
pub type Result<T> = std::result::Result<T, AuthError>;
